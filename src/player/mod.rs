//! Player instances composing the controllers around their collaborators.
//!
//! Every collaborator is opened for one source epoch and reports back by
//! value: the caller hands each notification to `dispatch` together with the
//! epoch the collaborator was opened under. Notifications for an older epoch
//! are discarded.

pub mod audio;
pub mod video;

use crate::preview::PreviewEvent;
use crate::quality::StreamingEvent;

pub use audio::{AudioBackend, AudioPlayer};
pub use video::{VideoBackend, VideoPlayer};

/// Notifications from the primary pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryEvent {
    MetadataLoaded { duration: f64 },
    TimeUpdate { time: f64 },
    /// Enough data is buffered to resume playing from `time`
    CanPlay { time: f64 },
    Ended,
    Error { message: String },
}

/// Any collaborator notification, tagged by origin
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Primary(PrimaryEvent),
    Preview(PreviewEvent),
    Streaming(StreamingEvent),
}

impl PlayerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PlayerEvent::Primary(PrimaryEvent::MetadataLoaded { .. }) => "metadata",
            PlayerEvent::Primary(PrimaryEvent::TimeUpdate { .. }) => "time update",
            PlayerEvent::Primary(PrimaryEvent::CanPlay { .. }) => "can-play",
            PlayerEvent::Primary(PrimaryEvent::Ended) => "ended",
            PlayerEvent::Primary(PrimaryEvent::Error { .. }) => "pipeline error",
            PlayerEvent::Preview(PreviewEvent::FrameReady { .. }) => "preview frame",
            PlayerEvent::Preview(PreviewEvent::SeekFailed { .. }) => "preview failure",
            PlayerEvent::Streaming(StreamingEvent::ManifestParsed { .. }) => "manifest",
            PlayerEvent::Streaming(StreamingEvent::LevelSwitched { .. }) => "level switch",
        }
    }
}

impl From<PrimaryEvent> for PlayerEvent {
    fn from(event: PrimaryEvent) -> Self {
        PlayerEvent::Primary(event)
    }
}

impl From<PreviewEvent> for PlayerEvent {
    fn from(event: PreviewEvent) -> Self {
        PlayerEvent::Preview(event)
    }
}

impl From<StreamingEvent> for PlayerEvent {
    fn from(event: StreamingEvent) -> Self {
        PlayerEvent::Streaming(event)
    }
}

/// What `dispatch` did with a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Applied,
    /// Tagged with a superseded epoch, or the player was unloaded
    Stale,
    /// Not meaningful for this kind of player
    Ignored,
}
