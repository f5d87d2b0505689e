use log::{debug, info, warn};

use crate::config::DEFAULT_PLAYBACK_RATES;
use crate::error::{PipelineError, PlayerError, QualityError};
use crate::models::{ControlState, QualityLevel};

/// Adaptive streaming source attached to a video player
pub trait StreamingSource {
    /// Ask the source to switch to level `index`; the switch is confirmed later
    /// by [`StreamingEvent::LevelSwitched`]
    fn set_level(&mut self, index: usize) -> Result<(), PipelineError>;

    fn release(&mut self) -> Result<(), PipelineError>;
}

/// Notifications from the streaming source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamingEvent {
    ManifestParsed { levels: Vec<QualityLevel> },
    LevelSwitched { level: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelRequest {
    Sent,
    /// Already the active level; nothing was sent
    Unchanged,
}

/// Quality levels offered by the source, the level asked for and the level
/// actually playing.
///
/// The active level always follows the source's reports; the source may
/// switch on its own or ignore a request.
#[derive(Default)]
pub struct QualityController {
    source: Option<Box<dyn StreamingSource>>,
    levels: Vec<QualityLevel>,
    manifest_parsed: bool,
    requested: Option<usize>,
    active: Option<usize>,
}

impl QualityController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, source: Box<dyn StreamingSource>) {
        self.detach();
        self.source = Some(source);
    }

    /// Release the source and drop the cached levels
    pub fn detach(&mut self) {
        if let Some(mut source) = self.source.take() {
            if let Err(e) = source.release() {
                debug!("Streaming source release failed: {}", e);
            }
        }
        self.levels.clear();
        self.manifest_parsed = false;
        self.requested = None;
        self.active = None;
    }

    pub fn levels(&self) -> &[QualityLevel] {
        &self.levels
    }

    pub fn requested(&self) -> Option<usize> {
        self.requested
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Whether the user can pick a level at all
    pub fn can_switch(&self) -> bool {
        self.source.is_some() && self.levels.len() >= 2
    }

    pub fn is_level_enabled(&self, index: usize) -> bool {
        self.can_switch()
            && self.levels.iter().any(|level| level.index == index)
            && self.active != Some(index)
    }

    /// Levels with their enabled flags, as a UI would render them
    pub fn controls(&self) -> Vec<ControlState<QualityLevel>> {
        self.levels
            .iter()
            .map(|level| ControlState {
                value: level.clone(),
                enabled: self.is_level_enabled(level.index),
            })
            .collect()
    }

    /// Cache the manifest's levels. Only the first manifest is used.
    pub fn on_manifest_parsed(&mut self, levels: Vec<QualityLevel>) -> bool {
        if self.manifest_parsed {
            debug!("Ignoring repeated manifest with {} levels", levels.len());
            return false;
        }
        self.manifest_parsed = true;
        self.active = levels.first().map(|level| level.index);
        info!(
            "Manifest parsed: {}",
            levels.iter().map(|l| l.label.as_str()).collect::<Vec<_>>().join(", ")
        );
        self.levels = levels;
        true
    }

    pub fn request_level(&mut self, index: usize) -> Result<LevelRequest, PlayerError> {
        if !self.can_switch() {
            return Err(QualityError::LevelSwitchUnavailable.into());
        }
        if !self.levels.iter().any(|level| level.index == index) {
            return Err(QualityError::UnknownLevel {
                index,
                available: self.levels.len(),
            }
            .into());
        }
        if self.active == Some(index) {
            return Ok(LevelRequest::Unchanged);
        }

        let source = self
            .source
            .as_deref_mut()
            .ok_or(QualityError::LevelSwitchUnavailable)?;
        source.set_level(index)?;
        self.requested = Some(index);
        Ok(LevelRequest::Sent)
    }

    /// The source switched levels. Returns the previous active level when it changed.
    pub fn on_level_switched(&mut self, level: usize) -> Option<Option<usize>> {
        if !self.levels.is_empty() && !self.levels.iter().any(|l| l.index == level) {
            warn!("Source switched to unknown level {}", level);
        }
        if self.active == Some(level) {
            return None;
        }
        let previous = self.active.replace(level);
        Some(previous)
    }

    /// Route a source notification; returns whether the state changed
    pub fn handle_event(&mut self, event: StreamingEvent) -> bool {
        match event {
            StreamingEvent::ManifestParsed { levels } => self.on_manifest_parsed(levels),
            StreamingEvent::LevelSwitched { level } => self.on_level_switched(level).is_some(),
        }
    }
}

impl Drop for QualityController {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Fixed set of selectable playback rates
#[derive(Debug, Clone, PartialEq)]
pub struct RateSelector {
    rates: Vec<f64>,
}

impl Default for RateSelector {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYBACK_RATES.to_vec())
    }
}

impl RateSelector {
    /// Invalid rates are dropped; an empty set falls back to the defaults
    pub fn new(mut rates: Vec<f64>) -> Self {
        rates.retain(|rate| rate.is_finite() && *rate > 0.0);
        if rates.is_empty() {
            rates = DEFAULT_PLAYBACK_RATES.to_vec();
        }
        Self { rates }
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    fn find(&self, rate: f64) -> Option<f64> {
        self.rates.iter().copied().find(|r| (r - rate).abs() < 1e-9)
    }

    /// Validate a selection against the `active` rate.
    ///
    /// `Ok(None)` when `rate` is already active.
    pub fn select(&self, rate: f64, active: f64) -> Result<Option<f64>, QualityError> {
        let rate = self.find(rate).ok_or(QualityError::UnsupportedRate { rate })?;
        if (rate - active).abs() < 1e-9 {
            return Ok(None);
        }
        Ok(Some(rate))
    }

    pub fn controls(&self, active: f64) -> Vec<ControlState<f64>> {
        self.rates
            .iter()
            .map(|rate| ControlState {
                value: *rate,
                enabled: (rate - active).abs() >= 1e-9,
            })
            .collect()
    }
}
