//! Saving a chosen quality variant of a track to disk.

use futures::StreamExt;
use reqwest::Client;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::audio::{QualityTag, StreamUrl, Track};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DownloadError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub received: u64,
    pub total: Option<u64>,
}

impl DownloadProgress {
    /// 0.0..=1.0 when the size is known.
    pub fn ratio(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some((self.received as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }
}

/// The tag the download panel starts on: 320kbps when offered, else the last option.
pub fn default_quality(options: &[StreamUrl]) -> Option<String> {
    let best = QualityTag::highest().as_str();
    if options.iter().any(|option| option.quality == best) {
        return Some(best.to_string());
    }
    options.last().map(|option| option.quality.clone())
}

#[derive(Debug, Clone)]
pub struct Downloader {
    http: Client,
    directory: PathBuf,
}

impl Downloader {
    pub fn new(http: Client, directory: impl Into<PathBuf>) -> Self {
        Self {
            http,
            directory: directory.into(),
        }
    }

    /// `[Rayyfy] {title} - {artist}.mp4`, with path separators and other
    /// characters filesystems reject replaced.
    pub fn file_name(track: &Track) -> String {
        let raw = format!("[Rayyfy] {} - {}.mp4", track.display_title(), track.artist);
        raw.chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect()
    }

    /// Stream `option` into the download directory, reporting progress per chunk.
    /// The file appears under its final name only once complete.
    pub async fn download<F>(&self, track: &Track, option: &StreamUrl, mut progress: F) -> Result<PathBuf>
    where
        F: FnMut(DownloadProgress),
    {
        let dest = self.directory.join(Self::file_name(track));
        let partial = dest.with_extension("mp4.part");
        debug!(track_id = %track.id, quality = %option.quality, dest = %dest.display(), "Downloading");

        let response = self.http.get(&option.url).send().await?.error_for_status()?;
        let total = response.content_length();

        fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| DownloadError::Io { path: self.directory.clone(), source })?;

        let io_err = |source| DownloadError::Io { path: partial.clone(), source };
        let mut file = File::create(&partial).await.map_err(io_err)?;
        let mut received: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = fs::remove_file(&partial).await;
                    return Err(e.into());
                }
            };
            file.write_all(&chunk).await.map_err(io_err)?;
            received += chunk.len() as u64;
            progress(DownloadProgress { received, total });
        }

        file.flush().await.map_err(io_err)?;
        drop(file);
        fs::rename(&partial, &dest)
            .await
            .map_err(|source| DownloadError::Io { path: dest.clone(), source })?;

        info!(track_id = %track.id, dest = %dest.display(), size = received, "Track downloaded");
        Ok(dest)
    }
}
