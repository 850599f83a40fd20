use anyhow::Result;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::events::{map_key, Action, AppEvent, EventHandler, Focus};
use super::panels::{DownloadPanel, LyricsPanel, QualityMenu, QueuePanel};
use super::render;
use super::search::SearchState;
use super::TerminalManager;
use crate::audio::Track;
use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::download::Downloader;
use crate::playback::{MediaCommand, MediaEvent, PlaybackController, StreamingResource};

pub struct App {
    config: Config,
    catalog: CatalogClient,
    downloader: Downloader,
    player: Box<dyn StreamingResource>,
    media_events: mpsc::UnboundedReceiver<MediaEvent>,
    event_handler: EventHandler,

    pub(super) controller: PlaybackController,
    pub(super) search: SearchState,
    pub(super) focus: Focus,
    pub(super) queue_panel: QueuePanel,
    pub(super) download_panel: DownloadPanel,
    pub(super) lyrics_panel: LyricsPanel,
    pub(super) quality_menu: QualityMenu,
    pub(super) should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        catalog: CatalogClient,
        player: Box<dyn StreamingResource>,
        media_events: mpsc::UnboundedReceiver<MediaEvent>,
    ) -> Self {
        let controller = PlaybackController::new(config.audio.default_quality, config.audio.volume);
        let downloader = Downloader::new(catalog.stream_http().clone(), config.download_directory.clone());
        let search = SearchState::new(Duration::from_millis(config.ui.search_debounce_ms));

        let mut app = Self {
            config,
            catalog,
            downloader,
            player,
            media_events,
            event_handler: EventHandler::new(),
            controller,
            search,
            focus: Focus::Search,
            queue_panel: QueuePanel::default(),
            download_panel: DownloadPanel::default(),
            lyrics_panel: LyricsPanel::default(),
            quality_menu: QualityMenu::default(),
            should_quit: false,
        };
        let commands = app.controller.set_volume(app.config.audio.volume);
        app.apply(commands);
        app
    }

    pub async fn run(&mut self, terminal: &mut TerminalManager) -> Result<()> {
        self.event_handler
            .spawn_terminal_reader(Duration::from_millis(self.config.ui.tick_ms));
        info!("UI loop started");

        while !self.should_quit {
            terminal.draw(|f| render::draw(f, self))?;

            let deadline = self.search.deadline();
            let wake = deadline
                .map(tokio::time::Instant::from_std)
                .unwrap_or_else(|| tokio::time::Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                Some(event) = self.event_handler.next_event() => self.handle_event(event),
                Some(event) = self.media_events.recv() => self.handle_media_event(event),
                _ = tokio::time::sleep_until(wake), if deadline.is_some() => {}
                else => break,
            }

            self.poll_search(Instant::now());
        }

        info!("UI loop finished");
        Ok(())
    }

    fn apply(&mut self, commands: Vec<MediaCommand>) {
        for command in commands {
            if let Err(e) = self.player.dispatch(command) {
                error!("Media command failed: {:#}", e);
            }
        }
    }

    fn handle_media_event(&mut self, event: MediaEvent) {
        let commands = self.controller.handle_media_event(event, &self.search.results);
        self.apply(commands);
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input(key) => {
                if let Some(action) = map_key(key, self.focus) {
                    self.handle_action(action, Instant::now());
                }
            }
            AppEvent::Resize | AppEvent::Tick => {}
            AppEvent::SearchFinished { generation, result } => {
                self.search.finish(generation, result);
            }
            AppEvent::DownloadOptions { track_id, result } => {
                self.download_panel.options_loaded(&track_id, result);
            }
            AppEvent::DownloadProgress { track_id, progress } => {
                self.download_panel.progress(&track_id, progress);
            }
            AppEvent::DownloadFinished { track_id, result } => {
                self.download_panel.finished(&track_id, result);
            }
            AppEvent::LyricsLoaded { track_id, result } => {
                self.lyrics_panel.loaded(&track_id, result);
            }
        }
    }

    fn poll_search(&mut self, now: Instant) {
        let Some((generation, query)) = self.search.poll(now) else {
            return;
        };
        let catalog = self.catalog.clone();
        let limit = self.config.catalog.search_limit;
        let sender = self.event_handler.sender();
        tokio::spawn(async move {
            let result = catalog.search(&query, limit).await;
            let _ = sender.send(AppEvent::SearchFinished { generation, result });
        });
    }

    pub(super) fn handle_action(&mut self, action: Action, now: Instant) {
        debug!(?action, focus = ?self.focus, "Action");
        match action {
            Action::Quit => self.should_quit = true,

            Action::FocusSearch => self.focus = Focus::Search,
            Action::LeaveSearch => self.focus = Focus::Results,
            Action::SearchInput(c) => self.search.push_char(c, now),
            Action::SearchBackspace => self.search.backspace(now),
            Action::SearchClear => self.search.clear_input(now),

            Action::Up => self.move_selection(-1),
            Action::Down => self.move_selection(1),
            Action::Activate => self.activate(),
            Action::ClosePanel => self.close_panel(),

            Action::TogglePlay => {
                let commands = self.controller.toggle_play_pause();
                self.apply(commands);
            }
            Action::Next => {
                if self.can_skip() {
                    let commands = self.controller.next(&self.search.results);
                    self.apply(commands);
                }
            }
            Action::Previous => {
                if self.can_skip() {
                    let commands = self.controller.previous(&self.search.results);
                    self.apply(commands);
                }
            }
            Action::SeekBack => {
                let commands = self.controller.seek_by(-(self.config.ui.seek_step_secs as i64));
                self.apply(commands);
            }
            Action::SeekForward => {
                let commands = self.controller.seek_by(self.config.ui.seek_step_secs as i64);
                self.apply(commands);
            }
            Action::VolumeUp => {
                let commands = self.controller.adjust_volume(self.config.ui.volume_step);
                self.apply(commands);
            }
            Action::VolumeDown => {
                let commands = self.controller.adjust_volume(-self.config.ui.volume_step);
                self.apply(commands);
            }
            Action::ToggleMute => {
                let commands = self.controller.toggle_mute();
                self.apply(commands);
            }
            Action::ToggleShuffle => {
                self.controller.toggle_shuffle();
            }
            Action::ToggleRepeat => {
                self.controller.toggle_repeat();
            }

            Action::AddToQueue => {
                if let Some(track) = self.search.selected_track().filter(|t| t.has_source()) {
                    self.controller.enqueue(track.clone());
                }
            }
            Action::RemoveFromQueue => {
                if let Some(id) = self.queue_selected_id() {
                    self.controller.remove_from_queue(&id);
                    self.queue_panel.clamp(self.controller.queue().len());
                }
            }
            Action::ClearQueue => {
                self.controller.clear_queue();
                self.queue_panel.clamp(0);
            }

            Action::OpenQualityMenu => {
                self.quality_menu.open(self.controller.quality());
                self.focus = Focus::QualityMenu;
            }
            Action::ToggleQueuePanel => {
                self.focus = if self.queue_panel.toggle() {
                    Focus::Queue
                } else {
                    Focus::Results
                };
            }
            Action::OpenDownloadPanel => self.open_download_panel(),
            Action::OpenLyricsPanel => self.open_lyrics_panel(),
            Action::DismissBanner => {
                self.search.dismiss_banner();
                self.controller.dismiss_error();
            }
        }
    }

    /// Next/previous only make sense with something to move between.
    pub(super) fn can_skip(&self) -> bool {
        self.search.results.len() > 1
    }

    fn move_selection(&mut self, delta: i32) {
        match self.focus {
            Focus::Results | Focus::Search => self.search.move_selection(delta),
            Focus::Queue => {
                let len = self.controller.queue().len();
                self.queue_panel.move_selection(delta, len);
            }
            Focus::Download => self.download_panel.move_selection(delta),
            Focus::Lyrics => self.lyrics_panel.scroll_by(delta),
            Focus::QualityMenu => self.quality_menu.move_selection(delta),
        }
    }

    fn activate(&mut self) {
        match self.focus {
            Focus::Results | Focus::Search => {
                if let Some(track) = self.search.selected_track().cloned() {
                    let commands = self.controller.select_track(track);
                    self.apply(commands);
                }
            }
            Focus::Queue => {
                if let Some(id) = self.queue_selected_id() {
                    let commands = self.controller.play_from_queue(&id);
                    self.apply(commands);
                    self.queue_panel.clamp(self.controller.queue().len());
                }
            }
            Focus::Download => self.start_download(),
            Focus::Lyrics => {}
            Focus::QualityMenu => {
                let commands = self.controller.set_quality(self.quality_menu.chosen());
                self.apply(commands);
                self.quality_menu.close();
                self.focus = Focus::Results;
            }
        }
    }

    fn close_panel(&mut self) {
        match self.focus {
            Focus::Queue => self.queue_panel.open = false,
            Focus::Download => self.download_panel.close(),
            Focus::Lyrics => self.lyrics_panel.close(),
            Focus::QualityMenu => self.quality_menu.close(),
            Focus::Results | Focus::Search => {}
        }
        self.focus = Focus::Results;
    }

    fn queue_selected_id(&self) -> Option<String> {
        self.controller
            .queue()
            .get(self.queue_panel.selected)
            .map(|t| t.id.clone())
    }

    /// The track a panel should act on: the highlighted result, else what is playing.
    fn target_track(&self) -> Option<Track> {
        self.search
            .selected_track()
            .or_else(|| self.controller.current_track())
            .cloned()
    }

    fn open_download_panel(&mut self) {
        let Some(track) = self.target_track().filter(|t| t.has_source()) else {
            return;
        };
        let track_id = track.id.clone();
        self.download_panel.open(track);
        self.focus = Focus::Download;

        let catalog = self.catalog.clone();
        let sender = self.event_handler.sender();
        tokio::spawn(async move {
            let result = catalog.fetch_download_options(&track_id).await;
            let _ = sender.send(AppEvent::DownloadOptions { track_id, result });
        });
    }

    fn start_download(&mut self) {
        if !self.download_panel.can_download() {
            return;
        }
        let (Some(track), Some(option)) = (
            self.download_panel.track.clone(),
            self.download_panel.selected_option().cloned(),
        ) else {
            return;
        };
        self.download_panel.started();

        let downloader = self.downloader.clone();
        let sender = self.event_handler.sender();
        tokio::spawn(async move {
            let track_id = track.id.clone();
            let progress_sender = sender.clone();
            let progress_id = track_id.clone();
            let result = downloader
                .download(&track, &option, move |progress| {
                    let _ = progress_sender.send(AppEvent::DownloadProgress {
                        track_id: progress_id.clone(),
                        progress,
                    });
                })
                .await
                .map_err(|e| e.to_string());
            let _ = sender.send(AppEvent::DownloadFinished { track_id, result });
        });
    }

    fn open_lyrics_panel(&mut self) {
        let Some(track) = self.controller.current_track().cloned().or_else(|| self.target_track()) else {
            return;
        };
        self.lyrics_panel.open(&track);
        self.focus = Focus::Lyrics;

        let catalog = self.catalog.clone();
        let sender = self.event_handler.sender();
        let track_id = track.id;
        tokio::spawn(async move {
            let result = catalog.fetch_lyrics(&track_id).await;
            let _ = sender.send(AppEvent::LyricsLoaded { track_id, result });
        });
    }
}
