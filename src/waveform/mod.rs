//! Audio waveform computation.
//!
//! Raw channel samples are downsampled into a fixed number of bars, each the
//! mean absolute amplitude of one block of consecutive samples. The
//! [`WaveformEngine`] owns the current waveform of one player and discards
//! decode results that belong to a superseded source.

pub mod render;

use std::ops::Range;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::decode::DecodedAudio;
use crate::error::{DecodeError, PlayerError, WaveformError};
use crate::models::{Epoch, MediaSource};

pub use render::{bar_at, bar_rect, map_click_to_time, render, WaveformStyle};

/// Smallest usable pixels-per-bar divider
pub const MIN_SAMPLES_DIVIDER: u32 = 2;

/// Number of bars drawn for a surface `render_width` pixels wide
pub fn target_bars(render_width: u32, samples_divider: u32) -> usize {
    (render_width / samples_divider.max(MIN_SAMPLES_DIVIDER)) as usize
}

/// Downsample `raw` into exactly `target_bars` amplitudes.
///
/// Bar `i` is the mean of `|raw[j]|` over `j in [i * block, (i + 1) * block)`
/// with `block = raw.len() / target_bars`. The trailing remainder of the
/// integer division is not read.
pub fn compute_waveform(raw: &[f32], target_bars: usize) -> Result<WaveformSample, WaveformError> {
    if target_bars == 0 {
        return Err(WaveformError::NoBars);
    }

    let block_size = raw.len() / target_bars;
    if block_size == 0 {
        return Err(WaveformError::InsufficientSamples {
            available: raw.len(),
            requested: target_bars,
        });
    }

    let amplitudes: Arc<[f32]> = raw
        .chunks_exact(block_size)
        .take(target_bars)
        .map(|block| {
            let sum: f64 = block.iter().map(|s| s.abs() as f64).sum();
            (sum / block_size as f64) as f32
        })
        .collect();

    Ok(WaveformSample {
        amplitudes,
        block_size,
        source_samples: raw.len(),
    })
}

/// Fixed-length amplitude sequence for one decoded source
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformSample {
    amplitudes: Arc<[f32]>,
    block_size: usize,
    source_samples: usize,
}

impl WaveformSample {
    pub fn amplitudes(&self) -> &[f32] {
        &self.amplitudes
    }

    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }

    /// Samples averaged into each bar
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Length of the channel the waveform was computed from
    pub fn source_samples(&self) -> usize {
        self.source_samples
    }

    /// Visual smoothing: every run of `merge_amount` adjacent bars takes the
    /// run's mean. The length never changes.
    pub fn smoothed(&self, merge_amount: u32) -> WaveformSample {
        let merge = merge_amount as usize;
        if merge <= 1 {
            return self.clone();
        }

        let amplitudes: Arc<[f32]> = self
            .amplitudes
            .chunks(merge)
            .flat_map(|run| {
                let mean = run.iter().sum::<f32>() / run.len() as f32;
                std::iter::repeat(mean).take(run.len())
            })
            .collect();

        WaveformSample {
            amplitudes,
            ..self.clone()
        }
    }

    /// Time range (seconds) of the samples averaged into bar `index`
    pub fn bar_time_range(&self, index: usize, duration: f64) -> Option<Range<f64>> {
        if index >= self.len() || self.source_samples == 0 || !duration.is_finite() {
            return None;
        }
        let to_time = |sample: usize| sample as f64 * duration / self.source_samples as f64;
        Some(to_time(index * self.block_size)..to_time((index + 1) * self.block_size))
    }
}

/// Handle for one in-flight decode; completing it with an older epoch is a no-op
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub epoch: Epoch,
    pub source: MediaSource,
}

/// Result of handing a decode result to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Ready(WaveformSample),
    /// The ticket belongs to a superseded source
    Stale,
}

/// Owner of the current waveform of one audio player
#[derive(Debug)]
pub struct WaveformEngine {
    epoch: Epoch,
    source: Option<MediaSource>,
    channel: Option<Arc<[f32]>>,
    duration: Option<f64>,
    render_width: u32,
    samples_divider: u32,
    waveform: Option<WaveformSample>,
}

impl WaveformEngine {
    pub fn new(render_width: u32, samples_divider: u32) -> Self {
        Self {
            epoch: Epoch::default(),
            source: None,
            channel: None,
            duration: None,
            render_width,
            samples_divider,
            waveform: None,
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn waveform(&self) -> Option<&WaveformSample> {
        self.waveform.as_ref()
    }

    /// Duration of the decoded audio, if any
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn target_bars(&self) -> usize {
        target_bars(self.render_width, self.samples_divider)
    }

    /// Start loading a new source, abandoning any decode still in flight
    pub fn begin_load(&mut self, source: MediaSource) -> LoadTicket {
        self.invalidate();
        self.source = Some(source.clone());
        debug!("Waveform load {} started for {}", self.epoch, source);

        LoadTicket {
            epoch: self.epoch,
            source,
        }
    }

    /// Drop the current waveform and make every outstanding ticket stale
    pub fn invalidate(&mut self) {
        self.epoch = self.epoch.next();
        self.source = None;
        self.channel = None;
        self.duration = None;
        self.waveform = None;
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.epoch == self.epoch && self.source.as_ref() == Some(&ticket.source)
    }

    /// Accept the decode result for `ticket`
    pub fn complete(
        &mut self,
        ticket: &LoadTicket,
        result: Result<DecodedAudio, DecodeError>,
    ) -> Result<LoadOutcome, PlayerError> {
        if !self.is_current(ticket) {
            debug!(
                "Discarding waveform for {} from load {} (current {})",
                ticket.source, ticket.epoch, self.epoch
            );
            return Ok(LoadOutcome::Stale);
        }

        let decoded = match result {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Decode failed for {}: {}", ticket.source, e);
                return Err(e.into());
            }
        };

        self.duration = Some(decoded.duration());
        let channel: Arc<[f32]> = decoded.into_first_channel().into();
        self.channel = Some(channel);

        let waveform = self.recompute()?;
        info!(
            "Waveform ready for {}: {} bars, block size {}",
            ticket.source,
            waveform.len(),
            waveform.block_size()
        );
        Ok(LoadOutcome::Ready(waveform))
    }

    /// Change the pixels-per-bar divider, recomputing from cached samples
    pub fn set_samples_divider(&mut self, samples_divider: u32) -> Result<(), WaveformError> {
        if self.samples_divider == samples_divider {
            return Ok(());
        }
        self.samples_divider = samples_divider;
        self.recompute_cached()
    }

    /// Change the surface width, recomputing from cached samples
    pub fn set_render_width(&mut self, render_width: u32) -> Result<(), WaveformError> {
        if self.render_width == render_width {
            return Ok(());
        }
        self.render_width = render_width;
        self.recompute_cached()
    }

    fn recompute_cached(&mut self) -> Result<(), WaveformError> {
        if self.channel.is_none() {
            return Ok(());
        }
        self.recompute().map(|_| ())
    }

    fn recompute(&mut self) -> Result<WaveformSample, WaveformError> {
        self.waveform = None;
        let channel = self.channel.as_deref().unwrap_or(&[]);
        let waveform = compute_waveform(channel, self.target_bars())?;
        self.waveform = Some(waveform.clone());
        Ok(waveform)
    }
}
