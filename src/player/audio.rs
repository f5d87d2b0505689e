use log::{debug, warn};

use crate::config::WaveformOptions;
use crate::decode::DecodedAudio;
use crate::error::{DecodeError, PipelineError, PlayerError};
use crate::logging::PlayerLogger;
use crate::models::{Epoch, MediaSource, PlaybackState};
use crate::playback::{KeyInput, PlaybackController, PrimaryPipeline};
use crate::surface::Surface;
use crate::waveform::{
    map_click_to_time, render, LoadOutcome, LoadTicket, WaveformEngine, WaveformSample, WaveformStyle,
};

use super::{Dispatch, PlayerEvent, PrimaryEvent};

/// Opens the primary pipeline of an audio player
pub trait AudioBackend {
    fn open_primary(
        &mut self,
        source: &MediaSource,
        epoch: Epoch,
    ) -> Result<Box<dyn PrimaryPipeline>, PipelineError>;
}

/// One audio player instance: a primary pipeline plus a waveform drawn on
/// `surface`, colored by playback progress and clickable to seek.
pub struct AudioPlayer<S: Surface> {
    backend: Box<dyn AudioBackend>,
    options: WaveformOptions,
    style: WaveformStyle,
    engine: WaveformEngine,
    /// Waveform after the merge smoothing pass, as drawn
    drawn: Option<WaveformSample>,
    playback: PlaybackController,
    source: Option<MediaSource>,
    surface: S,
    logger: PlayerLogger,
}

impl<S: Surface> AudioPlayer<S> {
    pub fn new(backend: Box<dyn AudioBackend>, surface: S, options: &WaveformOptions) -> Self {
        let options = options.validated();
        Self {
            backend,
            style: WaveformStyle::from(&options),
            engine: WaveformEngine::new(surface.width(), options.samples_divider),
            drawn: None,
            playback: PlaybackController::new(crate::config::DEFAULT_SEEK_STEP_SECONDS, 1.0),
            source: None,
            surface,
            logger: PlayerLogger::new(),
            options,
        }
    }

    pub fn with_logger(mut self, logger: PlayerLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn epoch(&self) -> Epoch {
        self.engine.epoch()
    }

    pub fn source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn playback(&self) -> &PlaybackState {
        self.playback.state()
    }

    pub fn waveform(&self) -> Option<&WaveformSample> {
        self.engine.waveform()
    }

    pub fn options(&self) -> &WaveformOptions {
        &self.options
    }

    /// Switch to `source`. The returned ticket must accompany the decode
    /// result handed to [`AudioPlayer::on_decoded`].
    pub fn load(&mut self, source: MediaSource) -> Result<LoadTicket, PlayerError> {
        self.playback.detach();
        self.drawn = None;
        let ticket = self.engine.begin_load(source.clone());
        self.source = None;
        self.redraw();

        let attached = self
            .backend
            .open_primary(&source, ticket.epoch)
            .and_then(|pipeline| self.playback.attach(pipeline));
        if let Err(e) = attached {
            warn!("Failed to open {}: {}", source, e);
            self.unload();
            return Err(e.into());
        }

        self.logger.log_source_loaded(ticket.epoch, &source);
        self.source = Some(source);
        Ok(ticket)
    }

    /// Release the primary pipeline and forget the waveform
    pub fn unload(&mut self) {
        self.engine.invalidate();
        self.playback.detach();
        self.source = None;
        self.drawn = None;
        self.redraw();
    }

    /// Hand over the decode result for `ticket`
    pub fn on_decoded(
        &mut self,
        ticket: &LoadTicket,
        result: Result<DecodedAudio, DecodeError>,
    ) -> Result<LoadOutcome, PlayerError> {
        if let Err(e) = &result {
            if self.engine.is_current(ticket) {
                self.logger.log_decode_error(ticket.epoch, &ticket.source, &e.to_string());
            }
        }

        let outcome = match self.engine.complete(ticket, result) {
            Ok(outcome) => outcome,
            Err(e) => {
                if let PlayerError::Decode(decode) = &e {
                    self.playback.disable(decode.to_string());
                }
                self.drawn = None;
                self.redraw();
                return Err(e);
            }
        };

        match &outcome {
            LoadOutcome::Ready(waveform) => {
                if self.playback.state().duration.is_none() {
                    if let Some(duration) = self.engine.duration() {
                        self.playback.on_metadata_loaded(duration);
                    }
                }
                self.drawn = Some(waveform.smoothed(self.style.merge_amount));
                self.redraw();
            }
            LoadOutcome::Stale => {
                self.logger.log_stale_result(ticket.epoch, "waveform");
            }
        }
        Ok(outcome)
    }

    /// Apply a primary pipeline notification opened under `epoch`
    pub fn dispatch(&mut self, epoch: Epoch, event: PlayerEvent) -> Result<Dispatch, PlayerError> {
        if epoch != self.engine.epoch() || self.source.is_none() {
            self.logger.log_stale_result(epoch, event.kind());
            return Ok(Dispatch::Stale);
        }

        let PlayerEvent::Primary(event) = event else {
            debug!("Audio player ignoring {}", event.kind());
            return Ok(Dispatch::Ignored);
        };

        match event {
            PrimaryEvent::MetadataLoaded { duration } => {
                self.playback.on_metadata_loaded(duration);
            }
            PrimaryEvent::TimeUpdate { time } => self.playback.on_time_update(time),
            PrimaryEvent::CanPlay { .. } => {}
            PrimaryEvent::Ended => self.playback.on_ended(),
            PrimaryEvent::Error { message } => {
                self.playback.disable(message.clone());
                self.redraw();
                return Err(PipelineError::Unavailable(message).into());
            }
        }
        self.redraw();
        Ok(Dispatch::Applied)
    }

    /// Seek to the time under a click `x` pixels from the waveform's left edge
    pub fn click(&mut self, x: f64) -> Result<Option<f64>, PlayerError> {
        self.playback.ensure_enabled()?;
        let duration = self.playback.state().duration;
        let Some(time) = map_click_to_time(x, self.surface.width(), duration) else {
            return Ok(None);
        };

        let from = self.playback.state().current_time;
        let target = self.playback.seek_to(time)?;
        if let Some(to) = target {
            self.logger.log_seek(self.epoch(), from, to);
            self.redraw();
        }
        Ok(target)
    }

    pub fn play(&mut self) -> Result<(), PlayerError> {
        self.playback.play()?;
        self.logger
            .log_playback_started(self.epoch(), self.playback.state().current_time);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), PlayerError> {
        self.playback.pause()?;
        self.logger
            .log_playback_paused(self.epoch(), self.playback.state().current_time);
        Ok(())
    }

    pub fn toggle_play(&mut self) -> Result<bool, PlayerError> {
        if self.playback.state().is_playing {
            self.pause()?;
        } else {
            self.play()?;
        }
        Ok(self.playback.state().is_playing)
    }

    pub fn set_volume(&mut self, volume: f64) -> Result<bool, PlayerError> {
        Ok(self.playback.set_volume(volume)?)
    }

    pub fn handle_key(&mut self, input: KeyInput) -> Result<bool, PlayerError> {
        let consumed = self.playback.handle_key(input)?;
        if consumed {
            self.redraw();
        }
        Ok(consumed)
    }

    /// Apply new waveform options, recomputing bars from the cached samples
    pub fn set_options(&mut self, options: &WaveformOptions) -> Result<(), PlayerError> {
        let options = options.validated();
        self.style = WaveformStyle::from(&options);
        self.options = options;

        let recomputed = self.engine.set_samples_divider(self.options.samples_divider);
        self.drawn = self
            .engine
            .waveform()
            .map(|waveform| waveform.smoothed(self.style.merge_amount));
        self.redraw();
        Ok(recomputed?)
    }

    /// Redraw the waveform for the current progress
    pub fn redraw(&mut self) {
        let progress = self.playback.state().progress_percent();
        let amplitudes = self.drawn.as_ref().map(|w| w.amplitudes()).unwrap_or(&[]);
        render(&mut self.surface, amplitudes, progress, &self.style);
    }
}

impl<S: Surface> Drop for AudioPlayer<S> {
    fn drop(&mut self) {
        self.unload();
    }
}
