use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bitrate tiers the catalog publishes for every song, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityTag {
    #[serde(rename = "12kbps")]
    Kbps12,
    #[serde(rename = "48kbps")]
    Kbps48,
    #[serde(rename = "96kbps")]
    Kbps96,
    #[serde(rename = "160kbps")]
    Kbps160,
    #[serde(rename = "320kbps")]
    Kbps320,
}

impl QualityTag {
    pub const ALL: [QualityTag; 5] = [
        QualityTag::Kbps12,
        QualityTag::Kbps48,
        QualityTag::Kbps96,
        QualityTag::Kbps160,
        QualityTag::Kbps320,
    ];

    /// What the player's quality menu offers, best first. 12kbps is download-only.
    pub const PLAYER_MENU: [QualityTag; 4] = [
        QualityTag::Kbps320,
        QualityTag::Kbps160,
        QualityTag::Kbps96,
        QualityTag::Kbps48,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QualityTag::Kbps12 => "12kbps",
            QualityTag::Kbps48 => "48kbps",
            QualityTag::Kbps96 => "96kbps",
            QualityTag::Kbps160 => "160kbps",
            QualityTag::Kbps320 => "320kbps",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityTag::Kbps12 => "12 kbps (Low)",
            QualityTag::Kbps48 => "48 kbps (Basic)",
            QualityTag::Kbps96 => "96 kbps (Normal)",
            QualityTag::Kbps160 => "160 kbps (High)",
            QualityTag::Kbps320 => "320 kbps (Best)",
        }
    }

    pub fn highest() -> Self {
        QualityTag::Kbps320
    }
}

impl Default for QualityTag {
    fn default() -> Self {
        Self::highest()
    }
}

impl fmt::Display for QualityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown quality tag '{0}'")]
pub struct UnknownQuality(pub String);

impl FromStr for QualityTag {
    type Err = UnknownQuality;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QualityTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| UnknownQuality(s.to_string()))
    }
}

/// One `(quality, url)` variant exactly as the catalog lists it.
///
/// The tag stays a plain string: the catalog owns that vocabulary and an
/// unexpected tag must not make the whole record unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamUrl {
    pub quality: String,
    pub url: String,
}

impl StreamUrl {
    pub fn new(quality: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            quality: quality.into(),
            url: url.into(),
        }
    }

    pub fn tag(&self) -> Option<QualityTag> {
        self.quality.parse().ok()
    }

    pub fn label(&self) -> String {
        self.tag()
            .map(|tag| tag.label().to_string())
            .unwrap_or_else(|| self.quality.clone())
    }
}

/// Pick the variant tagged `preferred`, else the last entry of the list.
///
/// The fallback is literal: the catalog usually lists variants ascending, so
/// the last entry tends to be the best one, but nothing here re-sorts.
pub fn resolve(urls: &[StreamUrl], preferred: QualityTag) -> Option<&StreamUrl> {
    urls.iter()
        .find(|variant| variant.quality == preferred.as_str())
        .or_else(|| urls.last())
}
