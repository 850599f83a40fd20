// Rayyfy Library - catalog streaming player core
// The playback controller is pure; audio, terminal and network live at the edges

pub mod audio; // track model, quality tiers, queue, rodio streaming
pub mod catalog; // song catalog HTTP client
pub mod config; // settings and preferences
pub mod download; // saving tracks to disk
pub mod playback; // the playback session state machine

#[cfg(feature = "proxy")]
pub mod proxy; // HTTP front for the catalog

#[cfg(feature = "tui")]
pub mod ui; // terminal interface

// Export the stuff other modules actually use
pub use audio::{QualityTag, Queue, StreamUrl, Track};
pub use catalog::{CatalogClient, CatalogError};
pub use config::Config;
pub use playback::{MediaCommand, MediaEvent, PlaybackController, PlaybackState, StreamingResource};
