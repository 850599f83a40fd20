use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::time::Duration;

use super::app::App;
use super::events::Focus;
use super::panels::{lyric_lines, DownloadStatus, LyricsStatus};
use crate::audio::track::format_duration;
use crate::audio::QualityTag;
use crate::playback::PlaybackState;

const ACCENT: Color = Color::Magenta;

pub(super) fn draw(f: &mut Frame, app: &App) {
    let banner = app
        .search
        .banner
        .map(str::to_string)
        .or_else(|| app.controller.error().map(|e| e.message.clone()));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                                   // search box
            Constraint::Length(if banner.is_some() { 1 } else { 0 }), // banner
            Constraint::Min(0),                                      // results + side panel
            Constraint::Length(5),                                   // player bar
            Constraint::Length(1),                                   // key help
        ])
        .split(f.area());

    render_search_box(f, chunks[0], app);
    if let Some(message) = banner {
        let text = format!(" {}  (x to dismiss)", message);
        f.render_widget(
            Paragraph::new(text).style(Style::default().fg(Color::White).bg(Color::Red)),
            chunks[1],
        );
    }

    let side = side_panel(app);
    if let Some(panel) = side {
        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[2]);
        render_results(f, main[0], app);
        match panel {
            Focus::Queue => render_queue(f, main[1], app),
            Focus::Download => render_download(f, main[1], app),
            Focus::Lyrics => render_lyrics(f, main[1], app),
            _ => {}
        }
    } else {
        render_results(f, chunks[2], app);
    }

    render_player(f, chunks[3], app);
    render_help(f, chunks[4], app);

    if app.quality_menu.open {
        render_quality_menu(f, app);
    }
}

/// Which side panel to show, preferring the one that has focus.
fn side_panel(app: &App) -> Option<Focus> {
    match app.focus {
        Focus::Queue | Focus::Download | Focus::Lyrics => return Some(app.focus),
        _ => {}
    }
    if app.download_panel.is_open() {
        Some(Focus::Download)
    } else if app.lyrics_panel.is_open() {
        Some(Focus::Lyrics)
    } else if app.queue_panel.open {
        Some(Focus::Queue)
    } else {
        None
    }
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(ACCENT)
    } else {
        Style::default()
    };
    Block::default().borders(Borders::ALL).title(title).border_style(style)
}

fn render_search_box(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Search;
    let cursor = if focused { "_" } else { "" };
    let text = if app.search.input.is_empty() && !focused {
        Span::styled("Search songs, artists...", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(format!("{}{}", app.search.input, cursor))
    };

    let widget = Paragraph::new(Line::from(text))
        .block(panel_block("Rayyfy - Search".to_string(), focused));
    f.render_widget(widget, area);
}

fn render_results(f: &mut Frame, area: Rect, app: &App) {
    let current_id = app.controller.current_track().map(|t| t.id.as_str());
    let playing = app.controller.is_playing();

    let items: Vec<ListItem> = app
        .search
        .results
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let is_current = current_id == Some(track.id.as_str());
            let marker = match (is_current, playing) {
                (true, true) => "  ▶".to_string(),
                (true, false) => "  ⏸".to_string(),
                _ => format!("{:>3}", i + 1),
            };

            let mut spans = vec![
                Span::raw(format!("{} ", marker)),
                Span::styled(
                    track.display_title().to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(" - {}", track.artist)),
                Span::styled(
                    format!("  {}", track.display_album()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(format!("  {}", track.display_duration())),
            ];
            if !track.has_source() {
                spans.push(Span::styled("  no audio", Style::default().fg(Color::Red)));
            }

            let style = if is_current {
                Style::default().fg(ACCENT)
            } else if !track.has_source() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(spans)).style(style)
        })
        .collect();

    let title = app.search.status_line();
    let focused = matches!(app.focus, Focus::Results | Focus::Search);
    let list = List::new(items)
        .block(panel_block(title, focused))
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut state = ListState::default();
    if !app.search.results.is_empty() {
        state.select(Some(app.search.selected));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn render_queue(f: &mut Frame, area: Rect, app: &App) {
    let queue = app.controller.queue();
    let title = format!("Queue ({} tracks)", queue.len());

    if queue.is_empty() {
        let empty = Paragraph::new("Queue is empty\n\nPress a on a result to add it")
            .style(Style::default().fg(Color::DarkGray))
            .block(panel_block(title, app.focus == Focus::Queue));
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = queue
        .peek_all()
        .enumerate()
        .map(|(i, track)| {
            ListItem::new(format!(
                "{:>2}. {} - {}  {}",
                i + 1,
                track.display_title(),
                track.artist,
                track.display_duration()
            ))
        })
        .collect();

    let list = List::new(items)
        .block(panel_block(title, app.focus == Focus::Queue))
        .highlight_style(Style::default().bg(Color::DarkGray));
    let mut state = ListState::default();
    state.select(Some(app.queue_panel.selected));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_download(f: &mut Frame, area: Rect, app: &App) {
    let panel = &app.download_panel;
    let block = panel_block("Download".to_string(), app.focus == Focus::Download);
    let Some(track) = &panel.track else {
        f.render_widget(block, area);
        return;
    };

    let inner = block.inner(area);
    f.render_widget(block, area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0), Constraint::Length(2)])
        .split(inner);

    f.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled(
                track.display_title().to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(track.artist.clone()),
        ]),
        rows[0],
    );

    match &panel.status {
        DownloadStatus::Loading => {
            f.render_widget(Paragraph::new("Loading download options..."), rows[1]);
        }
        DownloadStatus::Unavailable => {
            f.render_widget(
                Paragraph::new("Download not available for this song")
                    .style(Style::default().fg(Color::DarkGray)),
                rows[1],
            );
        }
        _ => {
            let items: Vec<ListItem> = panel
                .options
                .iter()
                .map(|option| ListItem::new(option.label()))
                .collect();
            let list = List::new(items)
                .highlight_style(Style::default().bg(Color::DarkGray))
                .highlight_symbol("> ");
            let mut state = ListState::default();
            state.select(panel.selected_index());
            f.render_stateful_widget(list, rows[1], &mut state);
        }
    }

    match &panel.status {
        DownloadStatus::Downloading(progress) => {
            let gauge = Gauge::default()
                .gauge_style(Style::default().fg(ACCENT))
                .ratio(progress.ratio().unwrap_or(0.0))
                .label(format!("Downloading... {} KB", progress.received / 1024));
            f.render_widget(gauge, rows[2]);
        }
        DownloadStatus::Done(path) => {
            f.render_widget(
                Paragraph::new(format!("Saved to {}", path.display()))
                    .style(Style::default().fg(Color::Green))
                    .wrap(Wrap { trim: true }),
                rows[2],
            );
        }
        DownloadStatus::Failed(message) => {
            f.render_widget(
                Paragraph::new(format!("Download failed: {}", message))
                    .style(Style::default().fg(Color::Red))
                    .wrap(Wrap { trim: true }),
                rows[2],
            );
        }
        DownloadStatus::Ready => {
            f.render_widget(Paragraph::new("Enter to download"), rows[2]);
        }
        DownloadStatus::Loading | DownloadStatus::Unavailable => {}
    }
}

fn render_lyrics(f: &mut Frame, area: Rect, app: &App) {
    let panel = &app.lyrics_panel;
    let title = format!("Lyrics - {}", panel.title());
    let block = panel_block(title, app.focus == Focus::Lyrics);

    let lines: Vec<Line> = match &panel.status {
        LyricsStatus::Loading => vec![Line::from("Loading lyrics...")],
        LyricsStatus::Unavailable => vec![Line::from(Span::styled(
            "Lyrics not available",
            Style::default().fg(Color::DarkGray),
        ))],
        LyricsStatus::Loaded(lyrics) => {
            let mut lines: Vec<Line> = lyric_lines(&lyrics.text).into_iter().map(Line::from).collect();
            if !lyrics.copyright.is_empty() {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    lyrics.copyright.clone(),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            lines
        }
    };

    let widget = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((panel.scroll, 0));
    f.render_widget(widget, area);
}

fn render_player(f: &mut Frame, area: Rect, app: &App) {
    let controller = &app.controller;
    let block = panel_block("Now Playing".to_string(), false);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let (now_playing, state) = match controller.current_track() {
        Some(track) => (
            format!("{} - {}", track.display_title(), track.artist),
            controller.state().label(),
        ),
        None => ("Nothing playing".to_string(), PlaybackState::Idle.label()),
    };
    let state_style = match controller.state() {
        PlaybackState::Playing => Style::default().fg(Color::Green),
        PlaybackState::Error | PlaybackState::NoSource => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::Yellow),
    };
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!("[{}] ", state), state_style),
            Span::styled(now_playing, Style::default().add_modifier(Modifier::BOLD)),
        ])),
        rows[0],
    );

    let position = controller.position();
    let duration = controller.duration().unwrap_or(Duration::ZERO);
    let ratio = if duration.is_zero() {
        0.0
    } else {
        (position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(ACCENT))
        .ratio(ratio)
        .label(format!("{} / {}", format_duration(position), format_duration(duration)));
    f.render_widget(gauge, rows[1]);

    let volume = if controller.is_muted() {
        "muted".to_string()
    } else {
        format!("{:.0}%", controller.volume() * 100.0)
    };
    let flag = |on: bool| if on { "on" } else { "off" };
    let status = format!(
        "Vol {}  |  Shuffle {}  |  Repeat {}  |  Queue {}  |  {}",
        volume,
        flag(controller.shuffle()),
        flag(controller.repeat()),
        controller.queue().len(),
        controller.quality().label(),
    );
    f.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::Gray)),
        rows[2],
    );
}

fn render_help(f: &mut Frame, area: Rect, app: &App) {
    let skip = if app.can_skip() { "n/p next/prev  " } else { "" };
    let text = match app.focus {
        Focus::Search => "type to search  Enter/Esc done  Ctrl+U clear  Ctrl+C quit".to_string(),
        Focus::Queue => "Enter play  x remove  c clear  Tab/Esc close".to_string(),
        Focus::Download => "↑/↓ quality  Enter download  Esc close".to_string(),
        Focus::Lyrics => "↑/↓ scroll  Esc close".to_string(),
        Focus::QualityMenu => "↑/↓ choose  Enter apply  Esc close".to_string(),
        Focus::Results => format!(
            "/ search  Enter play  Space pause  {}←/→ seek  a queue  Tab queue  d download  l lyrics  Q quality  q quit",
            skip
        ),
    };
    f.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn render_quality_menu(f: &mut Frame, app: &App) {
    let area = centered(f.area(), 30, 6);
    let current = app.controller.quality();
    let items: Vec<ListItem> = QualityTag::PLAYER_MENU
        .iter()
        .map(|tag| {
            let mark = if *tag == current { " *" } else { "" };
            ListItem::new(format!("{}{}", tag.label(), mark))
        })
        .collect();

    let list = List::new(items)
        .block(panel_block("Quality".to_string(), true))
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select(Some(app.quality_menu.selected));

    f.render_widget(Clear, area);
    f.render_stateful_widget(list, area, &mut state);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
