use serde::{Deserialize, Serialize};
use std::fmt;

/// Source generation token.
///
/// Incremented every time a player's source changes or the player is torn
/// down; notifications tagged with an older epoch are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Epoch(pub u64);

impl Epoch {
    pub fn next(self) -> Self {
        Epoch(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A media source reference (URL or local path)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaSource {
    pub url: String,
}

impl MediaSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Whether the source looks like an adaptive streaming manifest
    pub fn is_manifest(&self) -> bool {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        path.to_ascii_lowercase().ends_with(".m3u8")
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Playback state of the primary pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    /// Seconds from the start of the media
    pub current_time: f64,
    /// `None` until the pipeline reports metadata
    pub duration: Option<f64>,
    pub playback_rate: f64,
    /// Output level in `[0, 1]`
    pub volume: f64,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self {
            is_playing: false,
            current_time: 0.0,
            duration: None,
            playback_rate: 1.0,
            volume: 1.0,
        }
    }

    /// Progress as a percentage (0.0 to 100.0); 0 while duration is unknown
    pub fn progress_percent(&self) -> f64 {
        match self.duration {
            Some(duration) if duration > 0.0 => {
                (self.current_time / duration * 100.0).clamp(0.0, 100.0)
            }
            _ => 0.0,
        }
    }

    /// Format position as MM:SS
    pub fn position_formatted(&self) -> String {
        format_seconds(self.current_time)
    }

    /// Format duration as MM:SS, `--:--` while unknown
    pub fn duration_formatted(&self) -> String {
        match self.duration {
            Some(duration) => format_seconds(duration),
            None => "--:--".to_string(),
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

/// Scrub gesture state; only exists while a drag is in progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrubState {
    pub is_dragging: bool,
    pub preview_time: f64,
    pub show_preview: bool,
}

impl ScrubState {
    pub fn started() -> Self {
        Self {
            is_dragging: true,
            preview_time: 0.0,
            show_preview: true,
        }
    }
}

/// One rendition advertised by an adaptive streaming manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    pub index: usize,
    pub label: String,
}

impl QualityLevel {
    pub fn new(index: usize, label: impl Into<String>) -> Self {
        Self {
            index,
            label: label.into(),
        }
    }

    /// Label a rendition by its frame height, e.g. `720p`
    pub fn from_height(index: usize, height: u32) -> Self {
        Self::new(index, format!("{}p", height))
    }
}

/// A selectable control with its enabled flag, as rendered by a UI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlState<T> {
    pub value: T,
    pub enabled: bool,
}

/// Read-only view of a video player for rendering controls
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub source: Option<MediaSource>,
    pub epoch: Epoch,
    pub playback: PlaybackState,
    pub scrub: Option<ScrubState>,
    pub loading: bool,
    /// Position of the scrub bar in `[0, 1]`: the preview position while
    /// dragging, the playback position otherwise
    pub scrub_fraction: f64,
    pub available_levels: Vec<ControlState<QualityLevel>>,
    pub requested_level: Option<usize>,
    pub active_level: Option<usize>,
    pub playback_rates: Vec<ControlState<f64>>,
}

impl PlayerSnapshot {
    pub fn is_dragging(&self) -> bool {
        self.scrub.map(|s| s.is_dragging).unwrap_or(false)
    }

    /// Whether the level with `index` can be selected
    pub fn level_enabled(&self, index: usize) -> bool {
        self.available_levels
            .iter()
            .any(|level| level.value.index == index && level.enabled)
    }
}

/// Format seconds as MM:SS
pub fn format_seconds(seconds: f64) -> String {
    let total_seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
