use log::{debug, info, warn};

use crate::config::VideoOptions;
use crate::error::{PipelineError, PlayerError};
use crate::logging::PlayerLogger;
use crate::models::{Epoch, MediaSource, PlayerSnapshot};
use crate::playback::{Key, KeyInput, PlaybackController, PrimaryPipeline};
use crate::preview::{FrameOutcome, PreviewEvent, PreviewPipeline, SeekPreviewCoordinator, SeekRequest};
use crate::quality::{LevelRequest, QualityController, RateSelector, StreamingEvent, StreamingSource};
use crate::surface::{Rect, Surface};

use super::{Dispatch, PlayerEvent, PrimaryEvent};

/// Opens the collaborators of a video player for one source
pub trait VideoBackend {
    fn open_primary(
        &mut self,
        source: &MediaSource,
        epoch: Epoch,
    ) -> Result<Box<dyn PrimaryPipeline>, PipelineError>;

    /// A second, independent pipeline on the same source for scrub previews
    fn open_preview(
        &mut self,
        source: &MediaSource,
        epoch: Epoch,
    ) -> Result<Box<dyn PreviewPipeline>, PipelineError>;

    /// `None` when the source is not adaptive; quality switching is then unavailable
    fn open_streaming(
        &mut self,
        source: &MediaSource,
        epoch: Epoch,
    ) -> Result<Option<Box<dyn StreamingSource>>, PipelineError>;
}

/// One video player instance.
///
/// Owns the primary and preview pipelines, the optional streaming source and
/// the preview surface. Dropping the player releases every collaborator once.
pub struct VideoPlayer<S: Surface> {
    backend: Box<dyn VideoBackend>,
    epoch: Epoch,
    source: Option<MediaSource>,
    playback: PlaybackController,
    preview: SeekPreviewCoordinator,
    quality: QualityController,
    rates: RateSelector,
    preview_surface: S,
    logger: PlayerLogger,
}

impl<S: Surface> VideoPlayer<S> {
    pub fn new(backend: Box<dyn VideoBackend>, preview_surface: S, options: &VideoOptions) -> Self {
        let options = options.validated();
        Self {
            backend,
            epoch: Epoch::default(),
            source: None,
            playback: PlaybackController::new(options.seek_step_seconds, options.default_volume),
            preview: SeekPreviewCoordinator::new(),
            quality: QualityController::new(),
            rates: RateSelector::new(options.playback_rates),
            preview_surface,
            logger: PlayerLogger::new(),
        }
    }

    /// Share an event history with other components
    pub fn with_logger(mut self, logger: PlayerLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    pub fn preview_surface(&self) -> &S {
        &self.preview_surface
    }

    pub fn is_loading(&self) -> bool {
        self.preview.is_loading()
    }

    /// Switch to `source`. The previous session is torn down first and every
    /// notification it still produces becomes stale.
    pub fn load(&mut self, source: MediaSource) -> Result<Epoch, PlayerError> {
        self.teardown();
        let epoch = self.epoch;

        if let Err(e) = self.open_session(&source, epoch) {
            warn!("Failed to open {}: {}", source, e);
            self.teardown();
            return Err(e);
        }

        self.logger.log_source_loaded(epoch, &source);
        self.source = Some(source);
        Ok(epoch)
    }

    fn open_session(&mut self, source: &MediaSource, epoch: Epoch) -> Result<(), PlayerError> {
        let primary = self.backend.open_primary(source, epoch)?;
        self.playback.attach(primary)?;

        let preview = self.backend.open_preview(source, epoch)?;
        self.preview.attach(preview);

        if let Some(streaming) = self.backend.open_streaming(source, epoch)? {
            self.quality.attach(streaming);
        } else {
            debug!("{} is not adaptive; quality switching disabled", source);
        }
        Ok(())
    }

    /// Release the current session, if any
    pub fn unload(&mut self) {
        if self.source.is_some() {
            info!("Unloading {}", self.epoch);
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        self.epoch = self.epoch.next();
        self.source = None;
        self.playback.detach();
        self.preview.detach();
        self.quality.detach();
        let full = Rect::full(self.preview_surface.width(), self.preview_surface.height());
        self.preview_surface.clear_rect(full);
    }

    /// Apply a collaborator notification opened under `epoch`
    pub fn dispatch(&mut self, epoch: Epoch, event: PlayerEvent) -> Result<Dispatch, PlayerError> {
        if epoch != self.epoch || self.source.is_none() {
            self.logger.log_stale_result(epoch, event.kind());
            return Ok(Dispatch::Stale);
        }

        match event {
            PlayerEvent::Primary(event) => self.on_primary(event)?,
            PlayerEvent::Preview(event) => self.on_preview(event),
            PlayerEvent::Streaming(event) => self.on_streaming(event),
        }
        Ok(Dispatch::Applied)
    }

    fn on_primary(&mut self, event: PrimaryEvent) -> Result<(), PlayerError> {
        match event {
            PrimaryEvent::MetadataLoaded { duration } => {
                self.playback.on_metadata_loaded(duration);
            }
            PrimaryEvent::TimeUpdate { time } => self.playback.on_time_update(time),
            PrimaryEvent::CanPlay { time } => {
                if !self.preview.on_can_play(time) && self.preview.is_loading() {
                    debug!("Still waiting for the committed seek; can-play at {:.2}s", time);
                }
            }
            PrimaryEvent::Ended => self.playback.on_ended(),
            PrimaryEvent::Error { message } => {
                self.playback.disable(message.clone());
                return Err(PipelineError::Unavailable(message).into());
            }
        }
        Ok(())
    }

    fn on_preview(&mut self, event: PreviewEvent) {
        let time = match &event {
            PreviewEvent::FrameReady { frame, .. } => frame.timestamp,
            PreviewEvent::SeekFailed { .. } => f64::NAN,
        };
        let outcome = self.preview.handle_event(&event, &mut self.preview_surface);
        if let PreviewEvent::FrameReady { .. } = event {
            self.logger
                .log_preview(self.epoch, time, outcome == FrameOutcome::Drawn);
        }
    }

    fn on_streaming(&mut self, event: StreamingEvent) {
        match event {
            StreamingEvent::LevelSwitched { level } => {
                if let Some(previous) = self.quality.on_level_switched(level) {
                    self.logger.log_quality_switched(self.epoch, previous, level);
                }
            }
            event => {
                self.quality.handle_event(event);
            }
        }
    }

    pub fn play(&mut self) -> Result<(), PlayerError> {
        self.playback.play()?;
        self.logger
            .log_playback_started(self.epoch, self.playback.state().current_time);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), PlayerError> {
        self.playback.pause()?;
        self.logger
            .log_playback_paused(self.epoch, self.playback.state().current_time);
        Ok(())
    }

    /// Returns whether playback is running afterwards
    pub fn toggle_play(&mut self) -> Result<bool, PlayerError> {
        if self.playback.state().is_playing {
            self.pause()?;
        } else {
            self.play()?;
        }
        Ok(self.playback.state().is_playing)
    }

    /// Seek the primary pipeline to `fraction` of the duration
    pub fn seek_by_fraction(&mut self, fraction: f64) -> Result<Option<f64>, PlayerError> {
        let from = self.playback.state().current_time;
        let target = self.playback.seek_by_fraction(fraction)?;
        if let Some(to) = target {
            self.logger.log_seek(self.epoch, from, to);
        }
        Ok(target)
    }

    pub fn drag_start(&mut self) {
        self.preview.drag_start();
    }

    /// Update the scrub position; returns the preview request sent, if any
    pub fn drag_move(&mut self, fraction: f64) -> Option<SeekRequest> {
        let duration = self.playback.state().duration;
        self.preview.drag_move(fraction, duration)
    }

    /// Release the scrub bar and commit the position into the primary pipeline
    pub fn drag_end(&mut self, fraction: f64) -> Result<Option<f64>, PlayerError> {
        let duration = self.playback.state().duration;
        let full = Rect::full(self.preview_surface.width(), self.preview_surface.height());
        self.preview_surface.clear_rect(full);

        let Some(commit) = self.preview.drag_end(fraction, duration) else {
            return Ok(None);
        };
        let from = self.playback.state().current_time;
        let target = self.playback.seek_to(commit)?;
        if let Some(to) = target {
            self.logger.log_seek(self.epoch, from, to);
        }
        Ok(target)
    }

    pub fn set_quality_level(&mut self, index: usize) -> Result<LevelRequest, PlayerError> {
        self.quality.request_level(index)
    }

    /// Returns whether the rate changed
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<bool, PlayerError> {
        match self.rates.select(rate, self.playback.state().playback_rate)? {
            Some(rate) => Ok(self.playback.set_playback_rate(rate)?),
            None => Ok(false),
        }
    }

    /// Returns whether the volume changed
    pub fn set_volume(&mut self, volume: f64) -> Result<bool, PlayerError> {
        Ok(self.playback.set_volume(volume)?)
    }

    /// Keyboard shortcuts; returns whether the key was consumed
    pub fn handle_key(&mut self, input: KeyInput) -> Result<bool, PlayerError> {
        let from = self.playback.state().current_time;
        let consumed = self.playback.handle_key(input)?;
        if consumed && matches!(input.key, Key::ArrowLeft | Key::ArrowRight) {
            self.logger
                .log_seek(self.epoch, from, self.playback.state().current_time);
        }
        Ok(consumed)
    }

    /// Step the position by the configured seek step, clamped into the media
    pub fn seek_by_keyboard(&mut self, forward: bool) -> Result<Option<f64>, PlayerError> {
        let step = self.playback.seek_step();
        Ok(self.playback.seek_by(if forward { step } else { -step })?)
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let playback = self.playback.state().clone();
        let scrub_fraction = self
            .preview
            .scrub_fraction()
            .unwrap_or_else(|| playback.progress_percent() / 100.0);

        PlayerSnapshot {
            source: self.source.clone(),
            epoch: self.epoch,
            scrub: self.preview.scrub(),
            loading: self.preview.is_loading(),
            scrub_fraction,
            available_levels: self.quality.controls(),
            requested_level: self.quality.requested(),
            active_level: self.quality.active(),
            playback_rates: self.rates.controls(playback.playback_rate),
            playback,
        }
    }
}

impl<S: Surface> Drop for VideoPlayer<S> {
    fn drop(&mut self) {
        self.unload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QualityError;
    use crate::models::QualityLevel;
    use crate::surface::{Bitmap, Frame, Rgb};
    use crate::testing::{Call, MockPreview, MockPrimary, MockStreaming};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Collaborators opened so far, newest last
    #[derive(Default)]
    struct Opened {
        primaries: Vec<MockPrimary>,
        previews: Vec<MockPreview>,
        streams: Vec<MockStreaming>,
        fail_preview: bool,
    }

    #[derive(Clone, Default)]
    struct MockBackend(Rc<RefCell<Opened>>);

    impl MockBackend {
        fn primary(&self) -> MockPrimary {
            self.0.borrow().primaries.last().cloned().unwrap()
        }

        fn preview(&self) -> MockPreview {
            self.0.borrow().previews.last().cloned().unwrap()
        }

        fn streaming(&self) -> MockStreaming {
            self.0.borrow().streams.last().cloned().unwrap()
        }
    }

    impl VideoBackend for MockBackend {
        fn open_primary(
            &mut self,
            _source: &MediaSource,
            _epoch: Epoch,
        ) -> Result<Box<dyn PrimaryPipeline>, PipelineError> {
            let mock = MockPrimary::new();
            self.0.borrow_mut().primaries.push(mock.clone());
            Ok(Box::new(mock))
        }

        fn open_preview(
            &mut self,
            _source: &MediaSource,
            _epoch: Epoch,
        ) -> Result<Box<dyn PreviewPipeline>, PipelineError> {
            if self.0.borrow().fail_preview {
                return Err(PipelineError::Unavailable("no second decoder".into()));
            }
            let mock = MockPreview::new();
            self.0.borrow_mut().previews.push(mock.clone());
            Ok(Box::new(mock))
        }

        fn open_streaming(
            &mut self,
            source: &MediaSource,
            _epoch: Epoch,
        ) -> Result<Option<Box<dyn StreamingSource>>, PipelineError> {
            if !source.is_manifest() {
                return Ok(None);
            }
            let mock = MockStreaming::new();
            self.0.borrow_mut().streams.push(mock.clone());
            Ok(Some(Box::new(mock)))
        }
    }

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    fn player() -> (VideoPlayer<Bitmap>, MockBackend) {
        let backend = MockBackend::default();
        let player = VideoPlayer::new(
            Box::new(backend.clone()),
            Bitmap::new(6, 3),
            &VideoOptions::default(),
        );
        (player, backend)
    }

    fn loaded(url: &str, duration: f64) -> (VideoPlayer<Bitmap>, MockBackend, Epoch) {
        let (mut player, backend) = player();
        let epoch = player.load(MediaSource::new(url)).unwrap();
        player
            .dispatch(epoch, PrimaryEvent::MetadataLoaded { duration }.into())
            .unwrap();
        (player, backend, epoch)
    }

    fn manifest(levels: Vec<QualityLevel>) -> PlayerEvent {
        StreamingEvent::ManifestParsed { levels }.into()
    }

    #[test]
    fn test_load_opens_all_collaborators() {
        let (player, backend, epoch) = loaded("https://cdn.example.com/master.m3u8", 60.0);

        assert_eq!(player.epoch(), epoch);
        assert_eq!(backend.primary().calls(), vec![Call::SetVolume(1.0), Call::SetRate(1.0)]);
        assert_eq!(backend.0.borrow().previews.len(), 1);
        assert_eq!(backend.0.borrow().streams.len(), 1);
        assert_eq!(player.snapshot().playback.duration, Some(60.0));
    }

    #[test]
    fn test_plain_source_has_no_quality_switching() {
        let (mut player, backend, epoch) = loaded("movie.mp4", 60.0);
        assert!(backend.0.borrow().streams.is_empty());

        player.dispatch(epoch, manifest(vec![
            QualityLevel::new(0, "360p"),
            QualityLevel::new(1, "720p"),
        ])).unwrap();

        assert!(matches!(
            player.set_quality_level(1),
            Err(PlayerError::Quality(QualityError::LevelSwitchUnavailable))
        ));
        assert!(!player.snapshot().level_enabled(1));
    }

    #[test]
    fn test_quality_request_then_switch() {
        let (mut player, backend, epoch) = loaded("live.m3u8", 60.0);
        player.dispatch(epoch, manifest(vec![
            QualityLevel::from_height(0, 360),
            QualityLevel::from_height(1, 720),
        ])).unwrap();

        assert_eq!(player.set_quality_level(1).unwrap(), LevelRequest::Sent);
        player
            .dispatch(epoch, StreamingEvent::LevelSwitched { level: 1 }.into())
            .unwrap();

        let snapshot = player.snapshot();
        assert_eq!(snapshot.active_level, Some(1));
        assert!(snapshot.level_enabled(0));
        assert!(!snapshot.level_enabled(1));
        assert_eq!(backend.streaming().calls(), vec![Call::SetLevel(1)]);

        assert_eq!(player.set_quality_level(1).unwrap(), LevelRequest::Unchanged);
        assert_eq!(backend.streaming().calls().len(), 1);
    }

    #[test]
    fn test_stale_epoch_is_dropped() {
        let (mut player, _backend, first) = loaded("a.mp4", 60.0);
        let second = player.load(MediaSource::new("b.mp4")).unwrap();
        assert!(second > first);

        let dispatch = player
            .dispatch(first, PrimaryEvent::MetadataLoaded { duration: 99.0 }.into())
            .unwrap();

        assert_eq!(dispatch, Dispatch::Stale);
        assert_eq!(player.snapshot().playback.duration, None);
    }

    #[test]
    fn test_source_change_releases_and_keeps_preferences() {
        let (mut player, backend, _epoch) = loaded("a.m3u8", 60.0);
        player.set_volume(0.5).unwrap();
        player.set_playback_rate(2.0).unwrap();
        let (old_primary, old_preview, old_stream) =
            (backend.primary(), backend.preview(), backend.streaming());

        player.load(MediaSource::new("b.m3u8")).unwrap();

        assert_eq!(old_primary.release_count(), 1);
        assert_eq!(old_preview.release_count(), 1);
        assert_eq!(old_stream.release_count(), 1);
        assert_eq!(
            backend.primary().calls(),
            vec![Call::SetVolume(0.5), Call::SetRate(2.0)]
        );

        let snapshot = player.snapshot();
        assert_eq!(snapshot.playback.current_time, 0.0);
        assert_eq!(snapshot.playback.volume, 0.5);
        assert_eq!(snapshot.playback.playback_rate, 2.0);
        assert!(snapshot.available_levels.is_empty());
    }

    #[test]
    fn test_failed_open_releases_partial_session() {
        let (mut player, backend) = player();
        backend.0.borrow_mut().fail_preview = true;

        let result = player.load(MediaSource::new("a.mp4"));

        assert!(matches!(result, Err(PlayerError::Pipeline(PipelineError::Unavailable(_)))));
        assert_eq!(backend.primary().release_count(), 1);
        assert!(player.source().is_none());
        assert!(matches!(player.play(), Err(PlayerError::Pipeline(PipelineError::Released))));
    }

    #[test]
    fn test_scrub_draws_only_latest_frame() {
        let (mut player, backend, epoch) = loaded("a.mp4", 100.0);

        player.drag_start();
        let t1 = player.drag_move(0.1).unwrap();
        let t2 = player.drag_move(0.9).unwrap();
        assert_eq!(backend.preview().requests(), vec![t1, t2]);

        let frame2 = Frame::solid(3, 3, BLUE, t2.time);
        let frame1 = Frame::solid(3, 3, RED, t1.time);
        player.dispatch(epoch, PreviewEvent::FrameReady { request: t2.id, frame: frame2 }.into()).unwrap();
        player.dispatch(epoch, PreviewEvent::FrameReady { request: t1.id, frame: frame1 }.into()).unwrap();

        assert_eq!(player.preview_surface().pixel(0, 0), Some(BLUE));
        assert_eq!(player.preview_surface().pixel(5, 2), Some(BLUE));

        let snapshot = player.snapshot();
        assert!(snapshot.is_dragging());
        assert_eq!(snapshot.scrub_fraction, 0.9);
        // The primary pipeline never moved while dragging
        assert_eq!(snapshot.playback.current_time, 0.0);
        assert!(!backend.primary().calls().iter().any(|c| matches!(c, Call::Seek(_))));
    }

    #[test]
    fn test_drag_end_commits_and_waits_for_can_play() {
        let (mut player, backend, epoch) = loaded("a.mp4", 100.0);
        let request = player.drag_move(0.3).unwrap();

        let committed = player.drag_end(0.4).unwrap();

        assert_eq!(committed, Some(40.0));
        assert!(player.is_loading());
        assert!(player.snapshot().scrub.is_none());
        assert!(backend.primary().calls().contains(&Call::Seek(40.0)));

        // A frame arriving after the drag ended is not drawn
        let late = Frame::solid(1, 1, RED, request.time);
        player.dispatch(epoch, PreviewEvent::FrameReady { request: request.id, frame: late }.into()).unwrap();
        assert!(player.preview_surface().is_blank());

        // Readiness at an older position does not end the wait
        player.dispatch(epoch, PrimaryEvent::CanPlay { time: 0.0 }.into()).unwrap();
        assert!(player.is_loading());

        player.dispatch(epoch, PrimaryEvent::CanPlay { time: 40.0 }.into()).unwrap();
        assert!(!player.is_loading());
    }

    #[test]
    fn test_seek_before_metadata_is_noop() {
        let (mut player, backend) = player();
        player.load(MediaSource::new("a.mp4")).unwrap();

        assert_eq!(player.seek_by_fraction(0.5).unwrap(), None);
        assert_eq!(player.drag_move(0.5), None);
        assert_eq!(player.drag_end(0.5).unwrap(), None);
        assert!(!player.is_loading());
        assert!(!backend.primary().calls().iter().any(|c| matches!(c, Call::Seek(_))));
    }

    #[test]
    fn test_rate_selection() {
        let (mut player, backend, _epoch) = loaded("a.mp4", 10.0);

        assert!(player.set_playback_rate(1.5).unwrap());
        assert!(!player.set_playback_rate(1.5).unwrap());
        assert!(matches!(
            player.set_playback_rate(3.0),
            Err(PlayerError::Quality(QualityError::UnsupportedRate { .. }))
        ));

        let rates = player.snapshot().playback_rates;
        assert!(!rates.iter().find(|r| r.value == 1.5).unwrap().enabled);
        assert_eq!(
            backend.primary().calls().iter().filter(|c| matches!(c, Call::SetRate(_))).count(),
            2
        );
    }

    #[test]
    fn test_keyboard_seek_stays_in_bounds() {
        let (mut player, _backend, _epoch) = loaded("a.mp4", 12.0);

        for forward in [true, true, true, false, false, false, false] {
            let time = player.seek_by_keyboard(forward).unwrap().unwrap();
            assert!((0.0..=12.0).contains(&time));
        }
        assert!(player.handle_key(KeyInput::new(Key::Space)).unwrap());
        assert!(player.snapshot().playback.is_playing);
    }

    #[test]
    fn test_primary_error_is_surfaced_and_stops_playback() {
        let (mut player, _backend, epoch) = loaded("a.mp4", 10.0);
        player.play().unwrap();

        let result = player.dispatch(epoch, PrimaryEvent::Error { message: "network".into() }.into());

        assert!(matches!(result, Err(PlayerError::Pipeline(PipelineError::Unavailable(_)))));
        assert!(!player.snapshot().playback.is_playing);
    }

    #[test]
    fn test_primary_error_keeps_position_and_disables_source() {
        let (mut player, backend, epoch) = loaded("a.mp4", 10.0);
        player.play().unwrap();
        player.dispatch(epoch, PrimaryEvent::TimeUpdate { time: 3.0 }.into()).unwrap();

        let _ = player.dispatch(epoch, PrimaryEvent::Error { message: "net".into() }.into());

        assert_eq!(player.snapshot().playback.current_time, 3.0);
        assert!(matches!(player.play(), Err(PlayerError::Pipeline(PipelineError::Unavailable(_)))));
        assert!(matches!(player.toggle_play(), Err(PlayerError::Pipeline(PipelineError::Unavailable(_)))));
        assert!(matches!(
            player.seek_by_fraction(0.5),
            Err(PlayerError::Pipeline(PipelineError::Unavailable(_)))
        ));
        assert!(player.seek_by_keyboard(true).is_err());
        assert_eq!(backend.primary().calls(), vec![
            Call::SetVolume(1.0),
            Call::SetRate(1.0),
            Call::Play,
            Call::Pause,
        ]);

        // Reloading the source makes it playable again
        player.load(MediaSource::new("a.mp4")).unwrap();
        player.play().unwrap();
        assert!(player.snapshot().playback.is_playing);
    }

    #[test]
    fn test_unload_and_drop_release_once() {
        let (mut player, backend, epoch) = loaded("a.m3u8", 10.0);
        let (primary, preview, stream) = (backend.primary(), backend.preview(), backend.streaming());

        player.unload();
        assert_eq!(
            player.dispatch(epoch, PrimaryEvent::TimeUpdate { time: 3.0 }.into()).unwrap(),
            Dispatch::Stale
        );
        drop(player);

        assert_eq!(primary.release_count(), 1);
        assert_eq!(preview.release_count(), 1);
        assert_eq!(stream.release_count(), 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let (player, _backend, _epoch) = loaded("a.mp4", 10.0);
        let json = serde_json::to_value(player.snapshot()).unwrap();

        assert_eq!(json["playback"]["duration"], 10.0);
        assert_eq!(json["loading"], false);
        assert_eq!(json["playback_rates"].as_array().unwrap().len(), 4);
    }
}
