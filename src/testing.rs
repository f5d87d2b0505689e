//! Recording collaborators for unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::PipelineError;
use crate::playback::PrimaryPipeline;
use crate::preview::{PreviewPipeline, SeekRequest};
use crate::quality::StreamingSource;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Play,
    Pause,
    Seek(f64),
    SetRate(f64),
    SetVolume(f64),
    PreviewSeek(SeekRequest),
    SetLevel(usize),
    Release,
}

#[derive(Debug, Default)]
struct Recorder {
    calls: Vec<Call>,
    reject_play: bool,
    reject_seeks: bool,
}

/// Shared call log; clones observe the same calls
#[derive(Debug, Clone, Default)]
struct Log(Rc<RefCell<Recorder>>);

impl Log {
    fn push(&self, call: Call) {
        self.0.borrow_mut().calls.push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.0
            .borrow()
            .calls
            .iter()
            .filter(|call| **call != Call::Release)
            .cloned()
            .collect()
    }

    fn release_count(&self) -> usize {
        self.0.borrow().calls.iter().filter(|call| **call == Call::Release).count()
    }

    fn clear(&self) {
        self.0.borrow_mut().calls.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockPrimary(Log);

impl MockPrimary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls other than `release`
    pub fn calls(&self) -> Vec<Call> {
        self.0.calls()
    }

    pub fn release_count(&self) -> usize {
        self.0.release_count()
    }

    pub fn clear(&self) {
        self.0.clear();
    }

    pub fn reject_next_play(&self) {
        self.0 .0.borrow_mut().reject_play = true;
    }
}

impl PrimaryPipeline for MockPrimary {
    fn play(&mut self) -> Result<(), PipelineError> {
        let rejected = std::mem::take(&mut self.0 .0.borrow_mut().reject_play);
        if rejected {
            return Err(PipelineError::rejected("play", "autoplay blocked"));
        }
        self.0.push(Call::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PipelineError> {
        self.0.push(Call::Pause);
        Ok(())
    }

    fn set_current_time(&mut self, time: f64) -> Result<(), PipelineError> {
        self.0.push(Call::Seek(time));
        Ok(())
    }

    fn set_playback_rate(&mut self, rate: f64) -> Result<(), PipelineError> {
        self.0.push(Call::SetRate(rate));
        Ok(())
    }

    fn set_volume(&mut self, volume: f64) -> Result<(), PipelineError> {
        self.0.push(Call::SetVolume(volume));
        Ok(())
    }

    fn release(&mut self) -> Result<(), PipelineError> {
        self.0.push(Call::Release);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockPreview(Log);

impl MockPreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.calls()
    }

    /// Requests sent through `seek`, oldest first
    pub fn requests(&self) -> Vec<SeekRequest> {
        self.0
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::PreviewSeek(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn release_count(&self) -> usize {
        self.0.release_count()
    }

    pub fn reject_seeks(&self, reject: bool) {
        self.0 .0.borrow_mut().reject_seeks = reject;
    }
}

impl PreviewPipeline for MockPreview {
    fn seek(&mut self, request: SeekRequest) -> Result<(), PipelineError> {
        if self.0 .0.borrow().reject_seeks {
            return Err(PipelineError::rejected("seek", "decoder busy"));
        }
        self.0.push(Call::PreviewSeek(request));
        Ok(())
    }

    fn release(&mut self) -> Result<(), PipelineError> {
        self.0.push(Call::Release);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockStreaming(Log);

impl MockStreaming {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.calls()
    }

    pub fn release_count(&self) -> usize {
        self.0.release_count()
    }
}

impl StreamingSource for MockStreaming {
    fn set_level(&mut self, index: usize) -> Result<(), PipelineError> {
        self.0.push(Call::SetLevel(index));
        Ok(())
    }

    fn release(&mut self) -> Result<(), PipelineError> {
        self.0.push(Call::Release);
        Ok(())
    }
}
