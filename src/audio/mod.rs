// Audio side of the player: the track model, quality tiers, the queue and
// the rodio-backed streaming resource.

pub mod quality;
pub mod queue;
pub mod track;

#[cfg(feature = "audio")]
pub mod player;

pub use quality::{QualityTag, StreamUrl};
pub use queue::Queue;
pub use track::Track;

#[cfg(feature = "audio")]
pub use player::AudioPlayer;
