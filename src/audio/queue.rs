use std::collections::VecDeque;
use tracing::{debug, info};

use super::track::Track;

/// User-curated pending-play list. Ids are unique; order is insertion order.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    tracks: VecDeque<Track>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `track` unless its id is already queued. Returns whether it was added.
    pub fn enqueue(&mut self, track: Track) -> bool {
        if self.contains(&track.id) {
            debug!(track_id = %track.id, "Track already queued, ignoring");
            return false;
        }
        info!(track_id = %track.id, "Queued '{}'", track.display_title());
        self.tracks.push_back(track);
        true
    }

    pub fn dequeue_front(&mut self) -> Option<Track> {
        self.tracks.pop_front()
    }

    /// Remove the first entry with `track_id`; absent ids are a no-op.
    pub fn remove(&mut self, track_id: &str) -> bool {
        self.take(track_id).is_some()
    }

    /// Remove and hand back the entry with `track_id`.
    pub fn take(&mut self, track_id: &str) -> Option<Track> {
        let pos = self.tracks.iter().position(|t| t.id == track_id)?;
        self.tracks.remove(pos)
    }

    pub fn clear(&mut self) {
        if !self.tracks.is_empty() {
            info!("Cleared {} queued tracks", self.tracks.len());
        }
        self.tracks.clear();
    }

    pub fn peek_all(&self) -> impl ExactSizeIterator<Item = &Track> + '_ {
        self.tracks.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.tracks.iter().any(|t| t.id == track_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
