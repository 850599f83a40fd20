use super::quality::{self, QualityTag, StreamUrl};
use crate::catalog::raw::RawSong;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
const ALBUM_ART_QUALITY: &str = "500x500";

/// A catalog song as the player sees it. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub artist_id: String,
    pub album: String,
    pub album_art: String,
    pub duration_ms: u64,
    /// Best-effort source at the default quality; `None` means unplayable.
    pub stream_url: Option<String>,
    pub stream_urls: Vec<StreamUrl>,
    pub catalog_url: String,
}

impl From<RawSong> for Track {
    fn from(song: RawSong) -> Self {
        let primary = song
            .artists
            .and_then(|artists| artists.primary)
            .and_then(|primary| primary.into_iter().next());

        let (artist, artist_id) = match primary {
            Some(artist) => (
                artist
                    .name
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
                artist.id.unwrap_or_default(),
            ),
            None => (UNKNOWN_ARTIST.to_string(), String::new()),
        };

        let images = song.image.unwrap_or_default();
        let album_art = images
            .iter()
            .find(|img| img.quality == ALBUM_ART_QUALITY)
            .or_else(|| images.last())
            .map(|img| img.url.clone())
            .unwrap_or_default();

        let stream_urls = song.download_url.unwrap_or_default();
        let stream_url =
            quality::resolve(&stream_urls, QualityTag::highest()).map(|variant| variant.url.clone());

        // catalog durations are seconds; negative or NaN would be garbage, treat as unknown
        let duration_ms = song
            .duration
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| (secs * 1000.0).round() as u64)
            .unwrap_or(0);

        Self {
            id: song.id,
            title: song.name.unwrap_or_default(),
            artist,
            artist_id,
            album: song.album.and_then(|album| album.name).unwrap_or_default(),
            album_art,
            duration_ms,
            stream_url,
            stream_urls,
            catalog_url: song.url.unwrap_or_default(),
        }
    }
}

impl Track {
    pub fn has_source(&self) -> bool {
        self.stream_url.is_some()
    }

    /// Re-resolve the source for `quality` against this track's own variants.
    pub fn stream_url_for(&self, quality: QualityTag) -> Option<&str> {
        if self.stream_urls.is_empty() {
            return self.stream_url.as_deref();
        }
        quality::resolve(&self.stream_urls, quality).map(|variant| variant.url.as_str())
    }

    pub fn duration(&self) -> Option<Duration> {
        (self.duration_ms > 0).then(|| Duration::from_millis(self.duration_ms))
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "Unknown"
        } else {
            &self.title
        }
    }

    pub fn display_album(&self) -> &str {
        if self.album.is_empty() {
            "Unknown Album"
        } else {
            &self.album
        }
    }

    pub fn display_duration(&self) -> String {
        format_millis(self.duration_ms)
    }
}

/// `m:ss`, the way both the result list and the player bar show time.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}

pub fn format_millis(ms: u64) -> String {
    format_duration(Duration::from_millis(ms))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A track with one variant per tag, canonical URL resolved the catalog way.
    pub fn track(id: &str, tags: &[&str]) -> Track {
        let stream_urls: Vec<StreamUrl> = tags
            .iter()
            .map(|tag| StreamUrl::new(*tag, format!("https://cdn.test/{}/{}.mp4", id, tag)))
            .collect();
        let stream_url =
            quality::resolve(&stream_urls, QualityTag::highest()).map(|variant| variant.url.clone());

        Track {
            id: id.to_string(),
            title: format!("Title {}", id),
            artist: format!("Artist {}", id),
            artist_id: format!("artist-{}", id),
            album: "Album".to_string(),
            album_art: String::new(),
            duration_ms: 180_000,
            stream_url,
            stream_urls,
            catalog_url: format!("https://catalog.test/song/{}", id),
        }
    }

    pub fn playable(id: &str) -> Track {
        track(id, &["96kbps", "160kbps", "320kbps"])
    }

    pub fn silent(id: &str) -> Track {
        track(id, &[])
    }
}
