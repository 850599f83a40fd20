use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::audio::{StreamUrl, Track};
use crate::catalog::{self, Lyrics};
use crate::download::DownloadProgress;

/// Everything the UI loop reacts to besides media events.
#[derive(Debug)]
pub enum AppEvent {
    // Terminal
    Input(KeyEvent),
    Resize,
    Tick,

    // Background work, tagged with what it was issued for
    SearchFinished {
        generation: u64,
        result: catalog::Result<Vec<Track>>,
    },
    DownloadOptions {
        track_id: String,
        result: catalog::Result<Vec<StreamUrl>>,
    },
    DownloadProgress {
        track_id: String,
        progress: DownloadProgress,
    },
    DownloadFinished {
        track_id: String,
        result: Result<PathBuf, String>,
    },
    LyricsLoaded {
        track_id: String,
        result: catalog::Result<Lyrics>,
    },
}

pub struct EventHandler {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    event_receiver: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        Self {
            event_sender,
            event_receiver,
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.event_sender.clone()
    }

    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.event_receiver.recv().await
    }

    /// Read the terminal on a blocking thread; a quiet `tick` becomes a Tick.
    /// Stops once the receiving side is gone.
    pub fn spawn_terminal_reader(&self, tick: Duration) {
        let sender = self.sender();
        tokio::task::spawn_blocking(move || loop {
            let event = match event::poll(tick) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => AppEvent::Input(key),
                    Ok(Event::Resize(_, _)) => AppEvent::Resize,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Terminal read failed: {}", e);
                        break;
                    }
                },
                Ok(false) => AppEvent::Tick,
                Err(e) => {
                    warn!("Terminal poll failed: {}", e);
                    break;
                }
            };
            if sender.send(event).is_err() {
                debug!("UI loop gone, terminal reader stopping");
                break;
            }
        });
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Which part of the screen owns the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Results,
    Search,
    Queue,
    Download,
    Lyrics,
    QualityMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,

    // Search box
    FocusSearch,
    LeaveSearch,
    SearchInput(char),
    SearchBackspace,
    SearchClear,

    // Navigation
    Up,
    Down,
    Activate,
    ClosePanel,

    // Playback
    TogglePlay,
    Next,
    Previous,
    SeekBack,
    SeekForward,
    VolumeUp,
    VolumeDown,
    ToggleMute,
    ToggleShuffle,
    ToggleRepeat,

    // Queue
    AddToQueue,
    RemoveFromQueue,
    ClearQueue,

    // Panels
    OpenQualityMenu,
    ToggleQueuePanel,
    OpenDownloadPanel,
    OpenLyricsPanel,
    DismissBanner,
}

pub fn map_key(key: KeyEvent, focus: Focus) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }

    match focus {
        Focus::Search => {
            return match key.code {
                KeyCode::Esc | KeyCode::Enter => Some(Action::LeaveSearch),
                KeyCode::Char('u') if ctrl => Some(Action::SearchClear),
                KeyCode::Backspace => Some(Action::SearchBackspace),
                KeyCode::Char(c) if !ctrl => Some(Action::SearchInput(c)),
                KeyCode::Up => Some(Action::Up),
                KeyCode::Down => Some(Action::Down),
                _ => None,
            }
        }
        Focus::Queue => match key.code {
            KeyCode::Delete | KeyCode::Char('x') => return Some(Action::RemoveFromQueue),
            KeyCode::Char('c') => return Some(Action::ClearQueue),
            KeyCode::Tab => return Some(Action::ClosePanel),
            _ => {}
        },
        Focus::Download => {
            if key.code == KeyCode::Char('d') {
                return Some(Action::ClosePanel);
            }
        }
        Focus::Lyrics => {
            if key.code == KeyCode::Char('l') {
                return Some(Action::ClosePanel);
            }
        }
        Focus::QualityMenu => {
            if key.code == KeyCode::Char('Q') {
                return Some(Action::ClosePanel);
            }
        }
        Focus::Results => {}
    }

    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Esc => Some(Action::ClosePanel),
        KeyCode::Char('/') => Some(Action::FocusSearch),

        KeyCode::Up | KeyCode::Char('k') => Some(Action::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::Down),
        KeyCode::Enter => Some(Action::Activate),

        KeyCode::Char(' ') => Some(Action::TogglePlay),
        KeyCode::Char('n') => Some(Action::Next),
        KeyCode::Char('p') => Some(Action::Previous),
        KeyCode::Left => Some(Action::SeekBack),
        KeyCode::Right => Some(Action::SeekForward),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Action::VolumeUp),
        KeyCode::Char('-') => Some(Action::VolumeDown),
        KeyCode::Char('m') => Some(Action::ToggleMute),
        KeyCode::Char('z') => Some(Action::ToggleShuffle),
        KeyCode::Char('r') => Some(Action::ToggleRepeat),

        KeyCode::Char('a') => Some(Action::AddToQueue),
        KeyCode::Char('Q') => Some(Action::OpenQualityMenu),
        KeyCode::Tab => Some(Action::ToggleQueuePanel),
        KeyCode::Char('d') => Some(Action::OpenDownloadPanel),
        KeyCode::Char('l') => Some(Action::OpenLyricsPanel),
        KeyCode::Char('x') => Some(Action::DismissBanner),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn search_focus_captures_letters() {
        assert_eq!(map_key(key(KeyCode::Char('q')), Focus::Search), Some(Action::SearchInput('q')));
        assert_eq!(map_key(key(KeyCode::Char(' ')), Focus::Search), Some(Action::SearchInput(' ')));
        assert_eq!(map_key(key(KeyCode::Esc), Focus::Search), Some(Action::LeaveSearch));
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL), Focus::Search),
            Some(Action::SearchClear)
        );
    }

    #[test]
    fn ctrl_c_always_quits() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        for focus in [Focus::Results, Focus::Search, Focus::Queue, Focus::QualityMenu] {
            assert_eq!(map_key(ctrl_c, focus), Some(Action::Quit));
        }
    }

    #[test]
    fn playback_keys_work_with_panels_open() {
        assert_eq!(map_key(key(KeyCode::Char(' ')), Focus::Queue), Some(Action::TogglePlay));
        assert_eq!(map_key(key(KeyCode::Char('n')), Focus::Lyrics), Some(Action::Next));
        assert_eq!(map_key(key(KeyCode::Right), Focus::Results), Some(Action::SeekForward));
    }

    #[test]
    fn panel_specific_keys() {
        assert_eq!(map_key(key(KeyCode::Char('x')), Focus::Queue), Some(Action::RemoveFromQueue));
        assert_eq!(map_key(key(KeyCode::Char('x')), Focus::Results), Some(Action::DismissBanner));
        assert_eq!(map_key(key(KeyCode::Char('c')), Focus::Queue), Some(Action::ClearQueue));
        assert_eq!(map_key(key(KeyCode::Tab), Focus::Queue), Some(Action::ClosePanel));
        assert_eq!(map_key(key(KeyCode::Tab), Focus::Results), Some(Action::ToggleQueuePanel));
        assert_eq!(map_key(key(KeyCode::Char('d')), Focus::Download), Some(Action::ClosePanel));
        assert_eq!(map_key(key(KeyCode::Char('Q')), Focus::Results), Some(Action::OpenQualityMenu));
    }
}
