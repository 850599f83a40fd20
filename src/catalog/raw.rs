// Wire shapes of the catalog API. Everything is optional because the
// service omits or nulls fields freely; the track model decides the fallbacks.

use crate::audio::quality::StreamUrl;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<SearchData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchData {
    #[serde(default)]
    pub results: Option<Vec<RawSong>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSong {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub album: Option<RawAlbum>,
    #[serde(default)]
    pub artists: Option<RawArtists>,
    #[serde(default)]
    pub image: Option<Vec<RawImage>>,
    #[serde(default, rename = "downloadUrl")]
    pub download_url: Option<Vec<StreamUrl>>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAlbum {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawArtists {
    #[serde(default)]
    pub primary: Option<Vec<RawArtist>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawArtist {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawImage {
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SongDetailsEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Vec<SongDetails>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SongDetails {
    #[serde(default, rename = "downloadUrl")]
    pub download_url: Option<Vec<StreamUrl>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LyricsEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<RawLyrics>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLyrics {
    #[serde(default)]
    pub lyrics: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
}
