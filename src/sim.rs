//! Simulated collaborators for the interactive CLI.
//!
//! Pipelines run on the tokio runtime and report back through an unbounded
//! channel of `(Epoch, PlayerEvent)` pairs, the way real decoders would call
//! back asynchronously. Preview seeks finish with uneven delays so answers
//! regularly arrive out of order.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, trace};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::error::PipelineError;
use crate::models::{Epoch, MediaSource, QualityLevel};
use crate::player::{AudioBackend, PlayerEvent, PrimaryEvent, VideoBackend};
use crate::playback::PrimaryPipeline;
use crate::preview::{PreviewEvent, PreviewPipeline, SeekRequest};
use crate::quality::{StreamingEvent, StreamingSource};
use crate::surface::{Frame, Rgb};

pub type EventSender = UnboundedSender<(Epoch, PlayerEvent)>;

/// Delays used by the simulated pipelines
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimTiming {
    /// Interval between time updates while playing
    pub tick: Duration,
    /// Delay before metadata, can-play and manifest notifications
    pub startup: Duration,
    /// Base preview seek latency; odd request ids take three times as long
    pub preview: Duration,
    pub level_switch: Duration,
}

impl Default for SimTiming {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(250),
            startup: Duration::from_millis(50),
            preview: Duration::from_millis(80),
            level_switch: Duration::from_millis(300),
        }
    }
}

impl SimTiming {
    fn preview_delay(&self, request: &SeekRequest) -> Duration {
        if request.id.0 % 2 == 1 {
            self.preview * 3
        } else {
            self.preview
        }
    }
}

/// Media described to the simulated backend
#[derive(Debug, Clone, PartialEq)]
pub struct SimMedia {
    pub duration: f64,
    /// Rendition heights advertised by manifests
    pub level_heights: Vec<u32>,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for SimMedia {
    fn default() -> Self {
        Self {
            duration: 120.0,
            level_heights: vec![360, 720, 1080],
            frame_width: 32,
            frame_height: 18,
        }
    }
}

/// Color of the simulated frame shown at `time`
pub fn frame_color(time: f64, duration: f64) -> Rgb {
    let fraction = if duration > 0.0 && time.is_finite() {
        (time / duration).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let red = (fraction * 255.0).round() as u8;
    Rgb::new(red, 64, 255 - red)
}

/// Backend opening simulated pipelines for any source
#[derive(Clone)]
pub struct SimulatedBackend {
    events: EventSender,
    media: SimMedia,
    timing: SimTiming,
}

impl SimulatedBackend {
    pub fn new(events: EventSender, media: SimMedia) -> Self {
        Self {
            events,
            media,
            timing: SimTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: SimTiming) -> Self {
        self.timing = timing;
        self
    }

    fn primary(&self, epoch: Epoch) -> SimPrimary {
        let pipeline = SimPrimary {
            epoch,
            events: self.events.clone(),
            timing: self.timing,
            duration: self.media.duration,
            clock: Arc::new(Mutex::new(Clock::default())),
            ticker: None,
            released: false,
        };
        send_after(
            &self.events,
            epoch,
            self.timing.startup,
            vec![
                PrimaryEvent::MetadataLoaded {
                    duration: self.media.duration,
                }
                .into(),
                PrimaryEvent::CanPlay { time: 0.0 }.into(),
            ],
        );
        pipeline
    }
}

impl VideoBackend for SimulatedBackend {
    fn open_primary(
        &mut self,
        source: &MediaSource,
        epoch: Epoch,
    ) -> Result<Box<dyn PrimaryPipeline>, PipelineError> {
        debug!("Opening simulated primary pipeline for {} ({})", source, epoch);
        Ok(Box::new(self.primary(epoch)))
    }

    fn open_preview(
        &mut self,
        _source: &MediaSource,
        epoch: Epoch,
    ) -> Result<Box<dyn PreviewPipeline>, PipelineError> {
        Ok(Box::new(SimPreview {
            epoch,
            events: self.events.clone(),
            timing: self.timing,
            media: self.media.clone(),
            pending: Vec::new(),
            released: false,
        }))
    }

    fn open_streaming(
        &mut self,
        source: &MediaSource,
        epoch: Epoch,
    ) -> Result<Option<Box<dyn StreamingSource>>, PipelineError> {
        if !source.is_manifest() {
            return Ok(None);
        }

        let levels: Vec<QualityLevel> = self
            .media
            .level_heights
            .iter()
            .enumerate()
            .map(|(index, height)| QualityLevel::from_height(index, *height))
            .collect();
        let level_count = levels.len();
        send_after(
            &self.events,
            epoch,
            self.timing.startup,
            vec![StreamingEvent::ManifestParsed { levels }.into()],
        );

        Ok(Some(Box::new(SimStreaming {
            epoch,
            events: self.events.clone(),
            timing: self.timing,
            level_count,
            pending: None,
            released: false,
        })))
    }
}

impl AudioBackend for SimulatedBackend {
    fn open_primary(
        &mut self,
        source: &MediaSource,
        epoch: Epoch,
    ) -> Result<Box<dyn PrimaryPipeline>, PipelineError> {
        VideoBackend::open_primary(self, source, epoch)
    }
}

fn send_after(events: &EventSender, epoch: Epoch, delay: Duration, batch: Vec<PlayerEvent>) -> JoinHandle<()> {
    let events = events.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        for event in batch {
            if events.send((epoch, event)).is_err() {
                trace!("Event receiver closed");
                return;
            }
        }
    })
}

#[derive(Debug, Clone, Copy)]
struct Clock {
    position: f64,
    rate: f64,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            position: 0.0,
            rate: 1.0,
        }
    }
}

fn lock(clock: &Mutex<Clock>) -> MutexGuard<'_, Clock> {
    clock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Primary pipeline advancing a clock while playing
pub struct SimPrimary {
    epoch: Epoch,
    events: EventSender,
    timing: SimTiming,
    duration: f64,
    clock: Arc<Mutex<Clock>>,
    ticker: Option<JoinHandle<()>>,
    released: bool,
}

impl SimPrimary {
    fn check(&self) -> Result<(), PipelineError> {
        if self.released {
            return Err(PipelineError::Released);
        }
        Ok(())
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl PrimaryPipeline for SimPrimary {
    fn play(&mut self) -> Result<(), PipelineError> {
        self.check()?;
        self.stop_ticker();

        let (epoch, events, clock) = (self.epoch, self.events.clone(), Arc::clone(&self.clock));
        let (tick, duration) = (self.timing.tick, self.duration);
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.tick().await;
            loop {
                interval.tick().await;
                let position = {
                    let mut clock = lock(&clock);
                    clock.position = (clock.position + tick.as_secs_f64() * clock.rate).min(duration);
                    clock.position
                };
                let mut batch = vec![PrimaryEvent::TimeUpdate { time: position }];
                if position >= duration {
                    batch.push(PrimaryEvent::Ended);
                }
                let ended = batch.len() > 1;
                for event in batch {
                    if events.send((epoch, event.into())).is_err() {
                        return;
                    }
                }
                if ended {
                    return;
                }
            }
        }));
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PipelineError> {
        self.check()?;
        self.stop_ticker();
        Ok(())
    }

    fn set_current_time(&mut self, time: f64) -> Result<(), PipelineError> {
        self.check()?;
        let position = time.clamp(0.0, self.duration);
        lock(&self.clock).position = position;
        send_after(
            &self.events,
            self.epoch,
            self.timing.startup,
            vec![
                PrimaryEvent::TimeUpdate { time: position }.into(),
                PrimaryEvent::CanPlay { time: position }.into(),
            ],
        );
        Ok(())
    }

    fn set_playback_rate(&mut self, rate: f64) -> Result<(), PipelineError> {
        self.check()?;
        lock(&self.clock).rate = rate;
        Ok(())
    }

    fn set_volume(&mut self, _volume: f64) -> Result<(), PipelineError> {
        self.check()
    }

    fn release(&mut self) -> Result<(), PipelineError> {
        self.check()?;
        self.stop_ticker();
        self.released = true;
        Ok(())
    }
}

impl Drop for SimPrimary {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

/// Preview pipeline answering each seek with a solid frame
pub struct SimPreview {
    epoch: Epoch,
    events: EventSender,
    timing: SimTiming,
    media: SimMedia,
    pending: Vec<JoinHandle<()>>,
    released: bool,
}

impl PreviewPipeline for SimPreview {
    fn seek(&mut self, request: SeekRequest) -> Result<(), PipelineError> {
        if self.released {
            return Err(PipelineError::Released);
        }
        self.pending.retain(|task| !task.is_finished());

        let event = if request.time > self.media.duration {
            PreviewEvent::SeekFailed {
                request: request.id,
                reason: format!("{:.2}s is past the end", request.time),
            }
        } else {
            PreviewEvent::FrameReady {
                request: request.id,
                frame: Frame::solid(
                    self.media.frame_width,
                    self.media.frame_height,
                    frame_color(request.time, self.media.duration),
                    request.time,
                ),
            }
        };
        let delay = self.timing.preview_delay(&request);
        self.pending
            .push(send_after(&self.events, self.epoch, delay, vec![event.into()]));
        Ok(())
    }

    fn release(&mut self) -> Result<(), PipelineError> {
        if self.released {
            return Err(PipelineError::Released);
        }
        for task in self.pending.drain(..) {
            task.abort();
        }
        self.released = true;
        Ok(())
    }
}

/// Streaming source that confirms every level request after a delay
pub struct SimStreaming {
    epoch: Epoch,
    events: EventSender,
    timing: SimTiming,
    level_count: usize,
    pending: Option<JoinHandle<()>>,
    released: bool,
}

impl StreamingSource for SimStreaming {
    fn set_level(&mut self, index: usize) -> Result<(), PipelineError> {
        if self.released {
            return Err(PipelineError::Released);
        }
        if index >= self.level_count {
            return Err(PipelineError::rejected("switch level", format!("no level {}", index)));
        }
        if let Some(task) = self.pending.take() {
            task.abort();
        }
        self.pending = Some(send_after(
            &self.events,
            self.epoch,
            self.timing.level_switch,
            vec![StreamingEvent::LevelSwitched { level: index }.into()],
        ));
        Ok(())
    }

    fn release(&mut self) -> Result<(), PipelineError> {
        if self.released {
            return Err(PipelineError::Released);
        }
        if let Some(task) = self.pending.take() {
            task.abort();
        }
        self.released = true;
        Ok(())
    }
}
