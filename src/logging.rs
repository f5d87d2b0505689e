use log::{info, warn, debug, trace};
use std::time::{Duration, Instant};
use std::sync::{Arc, Mutex};
use std::collections::VecDeque;
use chrono::{DateTime, Utc};

use crate::models::{Epoch, MediaSource};

/// Environment variable selecting the log level
pub const LOG_LEVEL_ENV: &str = "SCRUBLINE_LOG_LEVEL";

/// Player event for logging and debugging
#[derive(Debug, Clone)]
pub struct LoggedEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: PlayerEventType,
    pub epoch: Option<Epoch>,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEventType {
    SourceLoaded,
    PlaybackStarted,
    PlaybackPaused,
    Seek,
    PreviewDrawn,
    PreviewDropped,
    QualitySwitched,
    DecodeError,
    StaleResult,
}

impl PlayerEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerEventType::SourceLoaded => "SOURCE_LOADED",
            PlayerEventType::PlaybackStarted => "PLAYBACK_STARTED",
            PlayerEventType::PlaybackPaused => "PLAYBACK_PAUSED",
            PlayerEventType::Seek => "SEEK",
            PlayerEventType::PreviewDrawn => "PREVIEW_DRAWN",
            PlayerEventType::PreviewDropped => "PREVIEW_DROPPED",
            PlayerEventType::QualitySwitched => "QUALITY_SWITCHED",
            PlayerEventType::DecodeError => "DECODE_ERROR",
            PlayerEventType::StaleResult => "STALE_RESULT",
        }
    }
}

/// Bounded history of player events, forwarded to the `log` facade
#[derive(Clone)]
pub struct PlayerLogger {
    events: Arc<Mutex<VecDeque<LoggedEvent>>>,
    max_events: usize,
}

impl Default for PlayerLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerLogger {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            max_events: 1000,
        }
    }

    /// Initialize logging with the level from `SCRUBLINE_LOG_LEVEL`, or `default_level`
    pub fn init_with_default(default_level: &str) -> Result<(), Box<dyn std::error::Error>> {
        let log_level = std::env::var(LOG_LEVEL_ENV)
            .unwrap_or_else(|_| default_level.to_string());

        let mut builder = env_logger::Builder::new();

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] [{}:{}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        });

        builder.filter_level(parse_level_filter(&log_level));
        builder.try_init()?;

        info!("Player logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Initialize logging, defaulting to `info`
    pub fn init() -> Result<(), Box<dyn std::error::Error>> {
        Self::init_with_default("info")
    }

    /// Record an event and forward it to the logger
    pub fn log_event(&self, event_type: PlayerEventType, epoch: Option<Epoch>, details: String) {
        let event = LoggedEvent {
            timestamp: Utc::now(),
            event_type,
            epoch,
            details: details.clone(),
        };

        if let Ok(mut events) = self.events.lock() {
            events.push_back(event);
            while events.len() > self.max_events {
                events.pop_front();
            }
        }

        let tag = match epoch {
            Some(epoch) => format!("{} {}", event_type.as_str(), epoch),
            None => event_type.as_str().to_string(),
        };

        match event_type {
            PlayerEventType::SourceLoaded
            | PlayerEventType::PlaybackStarted
            | PlayerEventType::PlaybackPaused
            | PlayerEventType::QualitySwitched => {
                info!("[{}] {}", tag, details);
            }
            PlayerEventType::Seek
            | PlayerEventType::PreviewDrawn
            | PlayerEventType::PreviewDropped
            | PlayerEventType::StaleResult => {
                debug!("[{}] {}", tag, details);
            }
            PlayerEventType::DecodeError => {
                warn!("[{}] {}", tag, details);
            }
        }
    }

    pub fn log_source_loaded(&self, epoch: Epoch, source: &MediaSource) {
        self.log_event(
            PlayerEventType::SourceLoaded,
            Some(epoch),
            format!("Loaded source: {}", source),
        );
    }

    pub fn log_playback_started(&self, epoch: Epoch, position: f64) {
        self.log_event(
            PlayerEventType::PlaybackStarted,
            Some(epoch),
            format!("Playback started at {:.2}s", position),
        );
    }

    pub fn log_playback_paused(&self, epoch: Epoch, position: f64) {
        self.log_event(
            PlayerEventType::PlaybackPaused,
            Some(epoch),
            format!("Playback paused at {:.2}s", position),
        );
    }

    pub fn log_seek(&self, epoch: Epoch, from: f64, to: f64) {
        self.log_event(
            PlayerEventType::Seek,
            Some(epoch),
            format!("Seek from {:.2}s to {:.2}s", from, to),
        );
    }

    pub fn log_preview(&self, epoch: Epoch, time: f64, drawn: bool) {
        let (event_type, verb) = if drawn {
            (PlayerEventType::PreviewDrawn, "drawn")
        } else {
            (PlayerEventType::PreviewDropped, "dropped")
        };
        self.log_event(
            event_type,
            Some(epoch),
            format!("Preview frame at {:.2}s {}", time, verb),
        );
    }

    pub fn log_quality_switched(&self, epoch: Epoch, from: Option<usize>, to: usize) {
        let details = match from {
            Some(from) => format!("Quality level switched from {} to {}", from, to),
            None => format!("Quality level set to {}", to),
        };
        self.log_event(PlayerEventType::QualitySwitched, Some(epoch), details);
    }

    pub fn log_decode_error(&self, epoch: Epoch, source: &MediaSource, error: &str) {
        self.log_event(
            PlayerEventType::DecodeError,
            Some(epoch),
            format!("Decode error for '{}': {}", source, error),
        );
    }

    pub fn log_stale_result(&self, epoch: Epoch, what: &str) {
        self.log_event(
            PlayerEventType::StaleResult,
            Some(epoch),
            format!("Discarded stale {}", what),
        );
    }

    /// Get recent events for debugging, oldest first
    pub fn get_recent_events(&self, count: usize) -> Vec<LoggedEvent> {
        let events = match self.events.lock() {
            Ok(events) => events,
            Err(_) => return Vec::new(),
        };
        let skip = events.len().saturating_sub(count);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn clear_events(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    pub fn get_event_statistics(&self) -> EventStatistics {
        let mut stats = EventStatistics::default();
        let events = match self.events.lock() {
            Ok(events) => events,
            Err(_) => return stats,
        };

        for event in events.iter() {
            match event.event_type {
                PlayerEventType::Seek => stats.seeks += 1,
                PlayerEventType::PreviewDrawn => stats.previews_drawn += 1,
                PlayerEventType::PreviewDropped => stats.previews_dropped += 1,
                PlayerEventType::DecodeError => stats.decode_errors += 1,
                PlayerEventType::StaleResult => stats.stale_results += 1,
                _ => {}
            }
        }

        stats.total_events = events.len();
        stats
    }
}

/// Statistics about logged events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStatistics {
    pub total_events: usize,
    pub seeks: usize,
    pub previews_drawn: usize,
    pub previews_dropped: usize,
    pub decode_errors: usize,
    pub stale_results: usize,
}

fn parse_level_filter(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        "off" => log::LevelFilter::Off,
        _ => log::LevelFilter::Info,
    }
}

/// Timer utility for measuring operation durations
pub struct OperationTimer {
    start_time: Instant,
    operation_name: String,
}

impl OperationTimer {
    pub fn new(operation_name: impl Into<String>) -> Self {
        let operation_name = operation_name.into();
        trace!("Starting operation: {}", operation_name);
        Self {
            start_time: Instant::now(),
            operation_name,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn finish_with_threshold(self, threshold: Duration) -> Duration {
        let duration = self.elapsed();
        if duration > threshold {
            warn!("Operation '{}' took {}ms (threshold: {}ms)",
                self.operation_name, duration.as_millis(), threshold.as_millis());
        } else {
            debug!("Completed operation '{}' in {}ms", self.operation_name, duration.as_millis());
        }
        duration
    }
}
