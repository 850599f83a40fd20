// Playback session - decides what is current, what plays next, and what the
// streaming resource should be doing about it.
// The controller never touches audio itself: it answers every input with the
// MediaCommands to dispatch, and hears back through identity-tagged MediaEvents.

pub mod controller;
pub mod traversal;

pub use controller::PlaybackController;
pub use traversal::{RandomSource, ThreadRandom};

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Identity of one source attachment. A fresh generation is minted for every
/// attach, so a quality swap on the same track is distinguishable too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadId {
    pub track_id: String,
    pub generation: u64,
}

impl fmt::Display for LoadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.track_id, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing selected yet.
    Idle,
    /// A track is selected but has nothing to stream.
    NoSource,
    Loading,
    Playing,
    Paused,
    Error,
}

impl PlaybackState {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::NoSource => "No audio",
            PlaybackState::Loading => "Loading",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
            PlaybackState::Error => "Error",
        }
    }
}

/// Instructions for the streaming resource.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCommand {
    /// Swap in a new source. Anything still attached for an older load goes away.
    Attach { load: LoadId, url: String },
    Play,
    Pause,
    Seek(Duration),
    /// Effective output level, already accounting for mute.
    SetVolume(f32),
    Detach,
}

/// What the streaming resource reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Ready {
        load: LoadId,
        duration: Option<Duration>,
    },
    TimeUpdate {
        load: LoadId,
        position: Duration,
    },
    Ended {
        load: LoadId,
    },
    Error {
        load: LoadId,
        message: String,
    },
}

impl MediaEvent {
    pub fn load(&self) -> &LoadId {
        match self {
            MediaEvent::Ready { load, .. }
            | MediaEvent::TimeUpdate { load, .. }
            | MediaEvent::Ended { load }
            | MediaEvent::Error { load, .. } => load,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PlaybackError {
    pub track_id: String,
    pub message: String,
}

/// The single streaming media resource of a session.
pub trait StreamingResource {
    fn dispatch(&mut self, command: MediaCommand) -> anyhow::Result<()>;
}
