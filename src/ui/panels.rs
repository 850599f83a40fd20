// Side panels and popups. Local view state only: which panel is open, what is
// highlighted, what a background fetch returned. Playback decisions stay in
// the controller.

use std::path::PathBuf;
use tracing::debug;

use super::search::step;
use crate::audio::{QualityTag, StreamUrl, Track};
use crate::catalog::{self, Lyrics};
use crate::download::{self, DownloadProgress};

#[derive(Debug, Default)]
pub struct QueuePanel {
    pub open: bool,
    pub selected: usize,
}

impl QueuePanel {
    pub fn toggle(&mut self) -> bool {
        self.open = !self.open;
        self.selected = 0;
        self.open
    }

    pub fn move_selection(&mut self, delta: i32, len: usize) {
        self.selected = step(self.selected, delta, len);
    }

    /// Keep the highlight on a row after the queue shrank.
    pub fn clamp(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadStatus {
    Loading,
    Unavailable,
    Ready,
    Downloading(DownloadProgress),
    Done(PathBuf),
    Failed(String),
}

#[derive(Debug)]
pub struct DownloadPanel {
    pub track: Option<Track>,
    pub options: Vec<StreamUrl>,
    pub selected: Option<String>,
    pub status: DownloadStatus,
}

impl Default for DownloadPanel {
    fn default() -> Self {
        Self {
            track: None,
            options: Vec::new(),
            selected: None,
            status: DownloadStatus::Loading,
        }
    }
}

impl DownloadPanel {
    pub fn is_open(&self) -> bool {
        self.track.is_some()
    }

    pub fn open(&mut self, track: Track) {
        *self = Self {
            track: Some(track),
            ..Self::default()
        };
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    fn is_for(&self, track_id: &str) -> bool {
        self.track.as_ref().is_some_and(|t| t.id == track_id)
    }

    /// Options arrived for `track_id`. Ignored unless the panel still shows it.
    pub fn options_loaded(&mut self, track_id: &str, result: catalog::Result<Vec<StreamUrl>>) -> bool {
        if !self.is_for(track_id) {
            debug!(track_id = %track_id, "Dropping download options for a closed panel");
            return false;
        }
        match result {
            Ok(options) if !options.is_empty() => {
                self.selected = download::default_quality(&options);
                self.options = options;
                self.status = DownloadStatus::Ready;
            }
            Ok(_) | Err(_) => {
                self.options.clear();
                self.selected = None;
                self.status = DownloadStatus::Unavailable;
            }
        }
        true
    }

    pub fn move_selection(&mut self, delta: i32) {
        if self.options.is_empty() {
            return;
        }
        let current = self.selected_index().unwrap_or(0);
        let next = step(current, delta, self.options.len());
        self.selected = Some(self.options[next].quality.clone());
    }

    pub fn selected_index(&self) -> Option<usize> {
        let selected = self.selected.as_deref()?;
        self.options.iter().position(|o| o.quality == selected)
    }

    pub fn selected_option(&self) -> Option<&StreamUrl> {
        self.selected_index().map(|i| &self.options[i])
    }

    /// Whether a download can start right now.
    pub fn can_download(&self) -> bool {
        matches!(
            self.status,
            DownloadStatus::Ready | DownloadStatus::Done(_) | DownloadStatus::Failed(_)
        ) && self.selected_option().is_some()
    }

    pub fn started(&mut self) {
        self.status = DownloadStatus::Downloading(DownloadProgress {
            received: 0,
            total: None,
        });
    }

    pub fn progress(&mut self, track_id: &str, progress: DownloadProgress) {
        if self.is_for(track_id) && matches!(self.status, DownloadStatus::Downloading(_)) {
            self.status = DownloadStatus::Downloading(progress);
        }
    }

    pub fn finished(&mut self, track_id: &str, result: Result<PathBuf, String>) {
        if !self.is_for(track_id) {
            return;
        }
        self.status = match result {
            Ok(path) => DownloadStatus::Done(path),
            Err(message) => DownloadStatus::Failed(message),
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LyricsStatus {
    Loading,
    Loaded(Lyrics),
    Unavailable,
}

#[derive(Debug)]
pub struct LyricsPanel {
    pub track: Option<(String, String)>,
    pub status: LyricsStatus,
    pub scroll: u16,
}

impl Default for LyricsPanel {
    fn default() -> Self {
        Self {
            track: None,
            status: LyricsStatus::Loading,
            scroll: 0,
        }
    }
}

impl LyricsPanel {
    pub fn is_open(&self) -> bool {
        self.track.is_some()
    }

    pub fn open(&mut self, track: &Track) {
        self.track = Some((track.id.clone(), track.display_title().to_string()));
        self.status = LyricsStatus::Loading;
        self.scroll = 0;
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    pub fn title(&self) -> &str {
        self.track.as_ref().map_or("", |(_, title)| title.as_str())
    }

    pub fn loaded(&mut self, track_id: &str, result: catalog::Result<Lyrics>) -> bool {
        if self.track.as_ref().map(|(id, _)| id.as_str()) != Some(track_id) {
            return false;
        }
        self.status = match result {
            Ok(lyrics) => LyricsStatus::Loaded(lyrics),
            Err(_) => LyricsStatus::Unavailable,
        };
        true
    }

    pub fn scroll_by(&mut self, delta: i32) {
        self.scroll = (self.scroll as i32 + delta).max(0) as u16;
    }
}

/// The catalog marks line breaks in lyrics with `<br>`.
pub fn lyric_lines(text: &str) -> Vec<String> {
    text.replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("<br>", "\n")
        .lines()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Default)]
pub struct QualityMenu {
    pub open: bool,
    pub selected: usize,
}

impl QualityMenu {
    pub fn open(&mut self, current: QualityTag) {
        self.open = true;
        self.selected = QualityTag::PLAYER_MENU
            .iter()
            .position(|tag| *tag == current)
            .unwrap_or(0);
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn move_selection(&mut self, delta: i32) {
        self.selected = step(self.selected, delta, QualityTag::PLAYER_MENU.len());
    }

    pub fn chosen(&self) -> QualityTag {
        QualityTag::PLAYER_MENU[self.selected.min(QualityTag::PLAYER_MENU.len() - 1)]
    }
}
