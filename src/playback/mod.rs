use log::{debug, info, warn};

use crate::config::DEFAULT_SEEK_STEP_SECONDS;
use crate::error::PipelineError;
use crate::models::PlaybackState;

/// The pipeline whose output the user hears or sees
pub trait PrimaryPipeline {
    fn play(&mut self) -> Result<(), PipelineError>;

    fn pause(&mut self) -> Result<(), PipelineError>;

    fn set_current_time(&mut self, time: f64) -> Result<(), PipelineError>;

    fn set_playback_rate(&mut self, rate: f64) -> Result<(), PipelineError>;

    fn set_volume(&mut self, volume: f64) -> Result<(), PipelineError>;

    /// Stop decoding and free the pipeline; called once per pipeline
    fn release(&mut self) -> Result<(), PipelineError>;
}

/// Keys the player reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    ArrowLeft,
    ArrowRight,
    Other(char),
}

/// Element holding keyboard focus when a key is pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusTarget {
    #[default]
    Document,
    Control,
    TextInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub focus: FocusTarget,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            focus: FocusTarget::Document,
        }
    }

    pub fn in_focus(key: Key, focus: FocusTarget) -> Self {
        Self { key, focus }
    }
}

/// Play/pause/position/rate/volume state of the primary pipeline.
///
/// Time only moves when the pipeline reports it; the controller never polls.
pub struct PlaybackController {
    pipeline: Option<Box<dyn PrimaryPipeline>>,
    state: PlaybackState,
    seek_step: f64,
    /// Set when the current source can no longer be played
    disabled: Option<String>,
}

impl PlaybackController {
    pub fn new(seek_step: f64, volume: f64) -> Self {
        let mut state = PlaybackState::new();
        state.volume = clamp_volume(volume).unwrap_or(state.volume);

        Self {
            pipeline: None,
            state,
            disabled: None,
            seek_step: if seek_step.is_finite() && seek_step > 0.0 {
                seek_step
            } else {
                DEFAULT_SEEK_STEP_SECONDS
            },
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_attached(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn seek_step(&self) -> f64 {
        self.seek_step
    }

    /// Why playback of the current source is disabled, if it is
    pub fn disabled_reason(&self) -> Option<&str> {
        self.disabled.as_deref()
    }

    /// Stop treating the current source as playable. The pipeline is paused
    /// and the position kept; play and seek fail with `Unavailable` until
    /// the next `reset`.
    pub fn disable(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Playback disabled: {}", reason);
        if self.state.is_playing {
            if let Some(pipeline) = self.pipeline.as_deref_mut() {
                if let Err(e) = pipeline.pause() {
                    debug!("Pausing disabled pipeline failed: {}", e);
                }
            }
        }
        self.state.is_playing = false;
        self.disabled = Some(reason);
    }

    /// `Unavailable` while the current source is disabled
    pub fn ensure_enabled(&self) -> Result<(), PipelineError> {
        match &self.disabled {
            Some(reason) => Err(PipelineError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    /// Take ownership of a new pipeline and re-apply the volume and rate
    /// preferences to it. Any previous pipeline is released first.
    pub fn attach(&mut self, mut pipeline: Box<dyn PrimaryPipeline>) -> Result<(), PipelineError> {
        self.detach();

        let applied = pipeline
            .set_volume(self.state.volume)
            .and_then(|_| pipeline.set_playback_rate(self.state.playback_rate));
        self.pipeline = Some(pipeline);
        applied
    }

    /// Release the pipeline, if any, and reset the per-source state
    pub fn detach(&mut self) {
        if let Some(mut pipeline) = self.pipeline.take() {
            if let Err(e) = pipeline.release() {
                debug!("Primary pipeline release failed: {}", e);
            }
        }
        self.reset();
    }

    /// Restore the initial per-source state; volume and rate are kept
    pub fn reset(&mut self) {
        self.state = PlaybackState {
            volume: self.state.volume,
            playback_rate: self.state.playback_rate,
            ..PlaybackState::new()
        };
        self.disabled = None;
    }

    fn pipeline(&mut self) -> Result<&mut (dyn PrimaryPipeline + 'static), PipelineError> {
        self.pipeline.as_deref_mut().ok_or(PipelineError::Released)
    }

    pub fn play(&mut self) -> Result<(), PipelineError> {
        if self.state.is_playing {
            return Ok(());
        }
        self.ensure_enabled()?;
        self.pipeline()?.play()?;
        self.state.is_playing = true;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), PipelineError> {
        if !self.state.is_playing {
            return Ok(());
        }
        self.pipeline()?.pause()?;
        self.state.is_playing = false;
        Ok(())
    }

    /// Returns whether playback is running afterwards
    pub fn toggle(&mut self) -> Result<bool, PipelineError> {
        if self.state.is_playing {
            self.pause()?;
        } else {
            self.play()?;
        }
        Ok(self.state.is_playing)
    }

    /// Duration became known; returns false when the value is unusable
    pub fn on_metadata_loaded(&mut self, duration: f64) -> bool {
        if !duration.is_finite() || duration < 0.0 {
            debug!("Ignoring invalid duration {}", duration);
            return false;
        }
        self.state.duration = Some(duration);
        self.state.current_time = self.clamp_time(self.state.current_time);
        true
    }

    pub fn on_time_update(&mut self, time: f64) {
        if !time.is_finite() {
            return;
        }
        self.state.current_time = self.clamp_time(time);
    }

    /// The pipeline reached the end of the stream
    pub fn on_ended(&mut self) {
        self.state.is_playing = false;
        if let Some(duration) = self.state.duration {
            self.state.current_time = duration;
        }
    }

    /// Seek to `time`, clamped into the media. `None` while duration is unknown.
    pub fn seek_to(&mut self, time: f64) -> Result<Option<f64>, PipelineError> {
        self.ensure_enabled()?;
        let Some(duration) = self.state.duration else {
            debug!("Seek ignored: duration unknown");
            return Ok(None);
        };
        if !time.is_finite() {
            return Ok(None);
        }

        let target = time.clamp(0.0, duration);
        self.pipeline()?.set_current_time(target)?;
        self.state.current_time = target;
        Ok(Some(target))
    }

    /// Seek to `fraction` (0..=1) of the duration
    pub fn seek_by_fraction(&mut self, fraction: f64) -> Result<Option<f64>, PipelineError> {
        self.ensure_enabled()?;
        match self.state.duration {
            Some(duration) if fraction.is_finite() => self.seek_to(fraction.clamp(0.0, 1.0) * duration),
            _ => Ok(None),
        }
    }

    /// Seek relative to the current position
    pub fn seek_by(&mut self, delta: f64) -> Result<Option<f64>, PipelineError> {
        self.seek_to(self.state.current_time + delta)
    }

    /// Returns whether the rate changed
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<bool, PipelineError> {
        if !rate.is_finite() || rate <= 0.0 || rate == self.state.playback_rate {
            return Ok(false);
        }
        if let Some(pipeline) = self.pipeline.as_deref_mut() {
            pipeline.set_playback_rate(rate)?;
        }
        self.state.playback_rate = rate;
        info!("Playback rate set to {}x", rate);
        Ok(true)
    }

    /// Returns whether the volume changed
    pub fn set_volume(&mut self, volume: f64) -> Result<bool, PipelineError> {
        let Some(volume) = clamp_volume(volume) else {
            return Ok(false);
        };
        if volume == self.state.volume {
            return Ok(false);
        }
        if let Some(pipeline) = self.pipeline.as_deref_mut() {
            pipeline.set_volume(volume)?;
        }
        self.state.volume = volume;
        Ok(true)
    }

    /// Keyboard shortcuts: space toggles, arrows seek by the step.
    ///
    /// Returns whether the key was consumed. Keys typed into a text input are
    /// never consumed.
    pub fn handle_key(&mut self, input: KeyInput) -> Result<bool, PipelineError> {
        if input.focus == FocusTarget::TextInput {
            return Ok(false);
        }

        match input.key {
            Key::Space => {
                self.toggle()?;
                Ok(true)
            }
            Key::ArrowLeft => {
                self.seek_by(-self.seek_step)?;
                Ok(true)
            }
            Key::ArrowRight => {
                self.seek_by(self.seek_step)?;
                Ok(true)
            }
            Key::Other(_) => Ok(false),
        }
    }

    fn clamp_time(&self, time: f64) -> f64 {
        match self.state.duration {
            Some(duration) => time.clamp(0.0, duration),
            None => time.max(0.0),
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.detach();
    }
}

fn clamp_volume(volume: f64) -> Option<f64> {
    volume.is_finite().then(|| volume.clamp(0.0, 1.0))
}
