//! Scrub preview on a secondary decode pipeline.
//!
//! While the user drags the scrub bar, every move asks an independent
//! pipeline for the frame at the hovered time. Frames arrive asynchronously
//! and possibly out of order; only the frame for the most recent request is
//! drawn. Releasing the drag commits the time into the primary pipeline,
//! which never moves while dragging.

use std::fmt;

use log::{debug, warn};

use crate::error::PipelineError;
use crate::models::ScrubState;
use crate::surface::{Frame, Rect, Surface};

/// Seconds a can-play position may differ from the committed seek
const COMMIT_TOLERANCE: f64 = 1e-3;

/// Identifier of one preview seek, increasing per coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekRequest {
    pub id: RequestId,
    pub time: f64,
}

/// Secondary pipeline used only to produce preview frames
pub trait PreviewPipeline {
    /// Start seeking; the answer arrives later as a [`PreviewEvent`]
    fn seek(&mut self, request: SeekRequest) -> Result<(), PipelineError>;

    fn release(&mut self) -> Result<(), PipelineError>;
}

/// Notifications from the preview pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewEvent {
    FrameReady { request: RequestId, frame: Frame },
    SeekFailed { request: RequestId, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn,
    /// Superseded by a newer request, or the drag already ended
    Stale,
}

pub struct SeekPreviewCoordinator {
    pipeline: Option<Box<dyn PreviewPipeline>>,
    scrub: Option<ScrubState>,
    scrub_fraction: f64,
    next_id: u64,
    latest: Option<RequestId>,
    /// Time committed by the last `drag_end`, until the pipeline can play there
    pending_commit: Option<f64>,
}

impl Default for SeekPreviewCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SeekPreviewCoordinator {
    pub fn new() -> Self {
        Self {
            pipeline: None,
            scrub: None,
            scrub_fraction: 0.0,
            next_id: 0,
            latest: None,
            pending_commit: None,
        }
    }

    pub fn attach(&mut self, pipeline: Box<dyn PreviewPipeline>) {
        self.detach();
        self.pipeline = Some(pipeline);
    }

    /// Release the pipeline and forget any drag or pending request
    pub fn detach(&mut self) {
        if let Some(mut pipeline) = self.pipeline.take() {
            if let Err(e) = pipeline.release() {
                debug!("Preview pipeline release failed: {}", e);
            }
        }
        self.scrub = None;
        self.scrub_fraction = 0.0;
        self.latest = None;
        self.pending_commit = None;
    }

    pub fn scrub(&self) -> Option<ScrubState> {
        self.scrub
    }

    pub fn is_dragging(&self) -> bool {
        self.scrub.map(|s| s.is_dragging).unwrap_or(false)
    }

    /// Scrub bar position while dragging
    pub fn scrub_fraction(&self) -> Option<f64> {
        self.is_dragging().then_some(self.scrub_fraction)
    }

    /// True between a committed seek and the primary pipeline's can-play
    pub fn is_loading(&self) -> bool {
        self.pending_commit.is_some()
    }

    /// Most recent request whose frame would still be drawn
    pub fn latest_request(&self) -> Option<RequestId> {
        self.latest
    }

    pub fn drag_start(&mut self) {
        if self.is_dragging() {
            return;
        }
        self.scrub = Some(ScrubState::started());
    }

    /// Move the scrub position to `fraction` of `duration` and request a
    /// preview frame for it. No request is issued while the duration is unknown.
    pub fn drag_move(&mut self, fraction: f64, duration: Option<f64>) -> Option<SeekRequest> {
        if !fraction.is_finite() {
            return None;
        }
        self.drag_start();

        let fraction = fraction.clamp(0.0, 1.0);
        self.scrub_fraction = fraction;

        let duration = duration.filter(|d| d.is_finite() && *d >= 0.0)?;
        let time = fraction * duration;
        if let Some(scrub) = self.scrub.as_mut() {
            scrub.preview_time = time;
        }

        let pipeline = self.pipeline.as_deref_mut()?;
        self.next_id += 1;
        let request = SeekRequest {
            id: RequestId(self.next_id),
            time,
        };
        self.latest = Some(request.id);

        match pipeline.seek(request) {
            Ok(()) => Some(request),
            Err(e) => {
                // The last drawn frame stays up
                warn!("Preview seek to {:.2}s failed: {}", time, e);
                None
            }
        }
    }

    /// Finish the drag. Returns the time to commit into the primary pipeline.
    pub fn drag_end(&mut self, fraction: f64, duration: Option<f64>) -> Option<f64> {
        self.scrub = None;
        self.latest = None;

        let duration = duration.filter(|d| d.is_finite() && *d >= 0.0)?;
        if !fraction.is_finite() {
            return None;
        }
        let commit = fraction.clamp(0.0, 1.0) * duration;
        self.pending_commit = Some(commit);
        Some(commit)
    }

    /// The primary pipeline can play from `time`. Ends the loading state when
    /// `time` is the committed position; returns whether it did.
    pub fn on_can_play(&mut self, time: f64) -> bool {
        match self.pending_commit {
            Some(commit) if (time - commit).abs() <= COMMIT_TOLERANCE => {
                self.pending_commit = None;
                true
            }
            _ => false,
        }
    }

    /// Draw `frame` if it answers the latest request of an active drag
    pub fn on_frame_ready(
        &mut self,
        request: RequestId,
        frame: &Frame,
        surface: &mut dyn Surface,
    ) -> FrameOutcome {
        let showing = self.scrub.map(|s| s.show_preview).unwrap_or(false);
        if !showing || self.latest != Some(request) {
            debug!("Dropping stale preview frame for {}", request);
            return FrameOutcome::Stale;
        }

        let full = Rect::full(surface.width(), surface.height());
        surface.clear_rect(full);
        surface.draw_image(frame, full);
        FrameOutcome::Drawn
    }

    /// A preview seek failed; the surface keeps whatever it showed
    pub fn on_seek_failed(&mut self, request: RequestId, reason: &str) {
        warn!("Preview seek {} failed: {}", request, reason);
    }

    /// Route a pipeline notification
    pub fn handle_event(&mut self, event: &PreviewEvent, surface: &mut dyn Surface) -> FrameOutcome {
        match event {
            PreviewEvent::FrameReady { request, frame } => self.on_frame_ready(*request, frame, surface),
            PreviewEvent::SeekFailed { request, reason } => {
                self.on_seek_failed(*request, reason);
                FrameOutcome::Stale
            }
        }
    }
}

impl Drop for SeekPreviewCoordinator {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Bitmap, Rgb};
    use crate::testing::{Call, MockPreview};

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    fn coordinator() -> (SeekPreviewCoordinator, MockPreview) {
        let mock = MockPreview::new();
        let mut coordinator = SeekPreviewCoordinator::new();
        coordinator.attach(Box::new(mock.clone()));
        (coordinator, mock)
    }

    #[test]
    fn test_drag_start_shows_preview() {
        let (mut coordinator, _mock) = coordinator();
        assert!(coordinator.scrub().is_none());

        coordinator.drag_start();

        let scrub = coordinator.scrub().unwrap();
        assert!(scrub.is_dragging);
        assert!(scrub.show_preview);
    }

    #[test]
    fn test_drag_move_issues_increasing_requests() {
        let (mut coordinator, mock) = coordinator();
        coordinator.drag_start();

        let first = coordinator.drag_move(0.25, Some(200.0)).unwrap();
        let second = coordinator.drag_move(1.5, Some(200.0)).unwrap();

        assert_eq!(first.time, 50.0);
        assert_eq!(second.time, 200.0);
        assert!(second.id > first.id);
        assert_eq!(mock.requests(), vec![first, second]);
        assert_eq!(coordinator.scrub().unwrap().preview_time, 200.0);
        assert_eq!(coordinator.scrub_fraction(), Some(1.0));
    }

    #[test]
    fn test_drag_move_without_start_starts_drag() {
        let (mut coordinator, _mock) = coordinator();
        coordinator.drag_move(0.5, Some(10.0));
        assert!(coordinator.is_dragging());
    }

    #[test]
    fn test_drag_move_without_duration_sends_nothing() {
        let (mut coordinator, mock) = coordinator();
        assert_eq!(coordinator.drag_move(0.5, None), None);
        assert!(mock.requests().is_empty());
        assert!(coordinator.is_dragging());
    }

    #[test]
    fn test_only_latest_frame_is_drawn() {
        let (mut coordinator, _mock) = coordinator();
        let mut surface = Bitmap::new(4, 2);
        coordinator.drag_start();

        let t1 = coordinator.drag_move(0.1, Some(100.0)).unwrap();
        let t2 = coordinator.drag_move(0.9, Some(100.0)).unwrap();

        let frame2 = Frame::solid(2, 2, BLUE, t2.time);
        let frame1 = Frame::solid(2, 2, RED, t1.time);

        assert_eq!(coordinator.on_frame_ready(t2.id, &frame2, &mut surface), FrameOutcome::Drawn);
        assert_eq!(coordinator.on_frame_ready(t1.id, &frame1, &mut surface), FrameOutcome::Stale);

        assert_eq!(surface.pixel(0, 0), Some(BLUE));
        assert_eq!(surface.pixel(3, 1), Some(BLUE));
    }

    #[test]
    fn test_stale_frame_arriving_first_is_dropped() {
        let (mut coordinator, _mock) = coordinator();
        let mut surface = Bitmap::new(4, 2);

        let t1 = coordinator.drag_move(0.1, Some(100.0)).unwrap();
        let _t2 = coordinator.drag_move(0.9, Some(100.0)).unwrap();

        let outcome = coordinator.on_frame_ready(t1.id, &Frame::solid(2, 2, RED, t1.time), &mut surface);

        assert_eq!(outcome, FrameOutcome::Stale);
        assert!(surface.is_blank());
    }

    #[test]
    fn test_drag_end_commits_and_invalidates() {
        let (mut coordinator, _mock) = coordinator();
        let mut surface = Bitmap::new(4, 2);
        let request = coordinator.drag_move(0.4, Some(50.0)).unwrap();

        let commit = coordinator.drag_end(0.4, Some(50.0));

        assert_eq!(commit, Some(20.0));
        assert!(coordinator.scrub().is_none());
        assert!(coordinator.is_loading());
        assert_eq!(
            coordinator.on_frame_ready(request.id, &Frame::solid(1, 1, RED, 20.0), &mut surface),
            FrameOutcome::Stale
        );
        assert!(surface.is_blank());

        assert!(coordinator.on_can_play(20.0));
        assert!(!coordinator.is_loading());
    }

    #[test]
    fn test_can_play_from_earlier_seek_keeps_loading() {
        let (mut coordinator, mock) = coordinator();
        let request = coordinator.drag_move(0.5, Some(80.0)).unwrap();
        assert_eq!(mock.calls(), vec![Call::PreviewSeek(request)]);

        assert_eq!(coordinator.drag_end(0.75, Some(80.0)), Some(60.0));

        assert!(!coordinator.on_can_play(40.0));
        assert!(coordinator.is_loading());
        assert!(coordinator.on_can_play(60.0));
        assert!(!coordinator.is_loading());
        assert!(!coordinator.on_can_play(60.0));
    }

    #[test]
    fn test_drag_end_without_duration_commits_nothing() {
        let (mut coordinator, _mock) = coordinator();
        coordinator.drag_start();

        assert_eq!(coordinator.drag_end(0.5, None), None);
        assert!(!coordinator.is_loading());
        assert!(coordinator.scrub().is_none());
    }

    #[test]
    fn test_seek_failure_keeps_last_frame() {
        let (mut coordinator, mock) = coordinator();
        let mut surface = Bitmap::new(2, 2);

        let first = coordinator.drag_move(0.2, Some(10.0)).unwrap();
        coordinator.on_frame_ready(first.id, &Frame::solid(1, 1, RED, 2.0), &mut surface);

        let second = coordinator.drag_move(0.3, Some(10.0)).unwrap();
        let outcome = coordinator.handle_event(
            &PreviewEvent::SeekFailed {
                request: second.id,
                reason: "no keyframe".to_string(),
            },
            &mut surface,
        );
        assert_eq!(outcome, FrameOutcome::Stale);
        assert_eq!(surface.pixel(0, 0), Some(RED));

        mock.reject_seeks(true);
        assert_eq!(coordinator.drag_move(0.4, Some(10.0)), None);
        assert_eq!(surface.pixel(1, 1), Some(RED));
    }

    #[test]
    fn test_rejected_seek_still_supersedes_older_requests() {
        let (mut coordinator, mock) = coordinator();
        let mut surface = Bitmap::new(2, 2);

        let first = coordinator.drag_move(0.2, Some(10.0)).unwrap();
        mock.reject_seeks(true);
        coordinator.drag_move(0.8, Some(10.0));

        let outcome = coordinator.on_frame_ready(first.id, &Frame::solid(1, 1, RED, 2.0), &mut surface);
        assert_eq!(outcome, FrameOutcome::Stale);
    }

    #[test]
    fn test_detach_releases_once() {
        let (mut coordinator, mock) = coordinator();
        coordinator.drag_move(0.5, Some(10.0));

        coordinator.detach();
        assert!(coordinator.scrub().is_none());
        assert_eq!(coordinator.latest_request(), None);

        drop(coordinator);
        assert_eq!(mock.release_count(), 1);
    }

    #[test]
    fn test_move_without_pipeline_updates_scrub_only() {
        let mut coordinator = SeekPreviewCoordinator::new();
        assert_eq!(coordinator.drag_move(0.5, Some(10.0)), None);
        assert_eq!(coordinator.scrub().unwrap().preview_time, 5.0);
    }
}
