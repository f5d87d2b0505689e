use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, log, warn};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use scrubline::cli::{CliApp, Commands, ParseError, SessionCommand, StatusDisplay};
use scrubline::config::{ConfigManager, PlayerConfig};
use scrubline::decode::{AudioDecodeBackend, SymphoniaDecoder};
use scrubline::error::{DecodeError, PipelineError, PlayerError};
use scrubline::logging::{OperationTimer, PlayerLogger};
use scrubline::models::{Epoch, MediaSource};
use scrubline::playback::KeyInput;
use scrubline::player::{AudioPlayer, Dispatch, PlayerEvent, PrimaryEvent, VideoPlayer};
use scrubline::preview::PreviewEvent;
use scrubline::quality::{LevelRequest, StreamingEvent};
use scrubline::sim::{SimMedia, SimulatedBackend};
use scrubline::surface::{Bitmap, Surface};
use scrubline::waveform::WaveformStyle;

/// Main application controller that coordinates all components
pub struct AppController {
    config_manager: ConfigManager,
    logger: PlayerLogger,
}

impl AppController {
    /// Create a new application controller
    pub fn new() -> Result<Self, PlayerError> {
        if let Err(e) = PlayerLogger::init_with_default("warn") {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        let config_manager = ConfigManager::new()?;
        info!("Configuration loaded from {}", config_manager.config_path().display());

        Ok(Self {
            config_manager,
            logger: PlayerLogger::new(),
        })
    }

    /// Execute a single command
    pub async fn execute_command(&mut self, command: Commands) -> Result<(), PlayerError> {
        match command {
            Commands::Waveform {
                path,
                width,
                height,
                divider,
                merge,
                progress,
            } => {
                let mut options = self.config_manager.get_config().waveform.clone();
                options.canvas_width = width.unwrap_or(options.canvas_width);
                options.canvas_height = height.unwrap_or(options.canvas_height);
                options.samples_divider = divider.unwrap_or(options.samples_divider);
                options.merge_amount = merge.unwrap_or(options.merge_amount);
                let mut config = self.config_manager.get_config().clone();
                config.waveform = options;
                self.render_waveform(path, &config, progress).await
            }
            Commands::Preview {
                source,
                duration,
                levels,
            } => {
                let media = SimMedia {
                    duration,
                    level_heights: levels,
                    ..SimMedia::default()
                };
                self.run_preview_session(MediaSource::new(source), media).await
            }
        }
    }

    /// Decode `path` off the async runtime and print its waveform
    async fn render_waveform(&mut self, path: PathBuf, config: &PlayerConfig, progress: f64) -> Result<(), PlayerError> {
        let path = CliApp::expand_path(&path.to_string_lossy());
        let options = config.waveform.validated();

        // Playback events are not needed to draw a still waveform
        let (events, _discarded) = unbounded_channel();
        let backend = SimulatedBackend::new(events, SimMedia::default());
        let surface = Bitmap::new(options.canvas_width, options.canvas_height);
        let mut player = AudioPlayer::new(Box::new(backend), surface, &options).with_logger(self.logger.clone());

        let source = MediaSource::new(path.to_string_lossy());
        let ticket = player.load(source)?;

        let bytes = tokio::fs::read(&path).await?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string);

        let timer = OperationTimer::new(format!("decode {}", path.display()));
        let decoded = tokio::task::spawn_blocking(move || {
            SymphoniaDecoder::new().decode(bytes, extension.as_deref())
        })
        .await
        .unwrap_or_else(|e| Err(DecodeError::DecodeFailed(format!("decode task failed: {}", e))));
        timer.finish_with_threshold(Duration::from_millis(500));

        player.on_decoded(&ticket, decoded)?;

        if progress > 0.0 {
            let x = progress.clamp(0.0, 100.0) / 100.0 * f64::from(player.surface().width());
            player.click(x)?;
        }

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let style = WaveformStyle::from(player.options());
        StatusDisplay::display_waveform(&name, player.surface(), &style, player.waveform());
        println!(
            "Duration: {} | Position: {}",
            player.playback().duration_formatted(),
            player.playback().position_formatted()
        );
        Ok(())
    }

    /// Run an interactive session against simulated pipelines
    pub async fn run_preview_session(&mut self, source: MediaSource, media: SimMedia) -> Result<(), PlayerError> {
        let options = self.config_manager.get_config().video.validated();
        let (events_tx, mut events) = unbounded_channel::<(Epoch, PlayerEvent)>();
        let backend = SimulatedBackend::new(events_tx, media);
        let surface = Bitmap::new(options.preview_width, options.preview_height);
        let mut player = VideoPlayer::new(Box::new(backend), surface, &options).with_logger(self.logger.clone());

        let epoch = player.load(source.clone())?;
        println!("scrubline preview v0.1.0 - {} ({})", source, epoch);
        println!("Type 'help' for available commands, 'exit' or 'quit' to quit.");
        println!();

        // Set up graceful shutdown handling
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let shutdown_flag_clone = shutdown_flag.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            println!("\nReceived interrupt signal. Shutting down gracefully...");
            shutdown_flag_clone.store(true, Ordering::Relaxed);
        }) {
            warn!("Could not install Ctrl-C handler: {}", e);
        }

        let mut input = Self::spawn_stdin_reader();
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        let mut awaiting_input = false;

        loop {
            if shutdown_flag.load(Ordering::Relaxed) {
                break;
            }

            if !awaiting_input {
                print!("> ");
                let _ = std::io::Write::flush(&mut std::io::stdout());
                awaiting_input = true;
            }

            tokio::select! {
                biased;

                line = input.recv() => {
                    awaiting_input = false;
                    let Some(line) = line else {
                        // EOF
                        println!();
                        break;
                    };
                    if line.is_empty() {
                        continue;
                    }
                    match CliApp::parse_command(&line) {
                        Ok(SessionCommand::Exit) => {
                            println!("Goodbye!");
                            break;
                        }
                        Ok(command) => {
                            if let Err(e) = self.execute_session_command(&mut player, command) {
                                self.handle_error_with_recovery(&e);
                            }
                        }
                        Err(ParseError::HelpRequested) => CliApp::display_help(),
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            println!("Type 'help' for available commands.");
                        }
                    }
                }

                Some((epoch, event)) = events.recv() => {
                    let announcement = Self::announcement(&event);
                    match player.dispatch(epoch, event) {
                        Ok(Dispatch::Applied) => {
                            if let Some(message) = announcement {
                                println!("\n{}", message);
                                if player.snapshot().is_dragging() {
                                    println!("Preview: {}", StatusDisplay::preview_description(player.preview_surface()));
                                }
                                awaiting_input = false;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            println!();
                            self.handle_error_with_recovery(&e);
                            awaiting_input = false;
                        }
                    }
                }

                _ = interval.tick() => {}
            }
        }

        self.shutdown(&mut player)
    }

    /// Lines from stdin, read on a dedicated thread
    fn spawn_stdin_reader() -> UnboundedReceiver<String> {
        let (tx, rx) = unbounded_channel::<String>();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.send(line.trim().to_string()).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        rx
    }

    /// Notifications worth printing while the session runs
    fn announcement(event: &PlayerEvent) -> Option<String> {
        match event {
            PlayerEvent::Primary(PrimaryEvent::MetadataLoaded { duration }) => {
                Some(format!("Metadata loaded: {:.1}s", duration))
            }
            PlayerEvent::Primary(PrimaryEvent::Ended) => Some("Playback ended".to_string()),
            PlayerEvent::Preview(PreviewEvent::FrameReady { request, frame }) => {
                Some(format!("Preview frame for {} at {:.2}s", request, frame.timestamp))
            }
            PlayerEvent::Streaming(StreamingEvent::ManifestParsed { levels }) => Some(format!(
                "Quality levels: {}",
                levels
                    .iter()
                    .map(|level| format!("{}:{}", level.index, level.label))
                    .collect::<Vec<_>>()
                    .join(" ")
            )),
            PlayerEvent::Streaming(StreamingEvent::LevelSwitched { level }) => {
                Some(format!("Quality switched to level {}", level))
            }
            _ => None,
        }
    }

    /// Execute one interactive command against the player
    fn execute_session_command(
        &mut self,
        player: &mut VideoPlayer<Bitmap>,
        command: SessionCommand,
    ) -> Result<(), PlayerError> {
        match command {
            SessionCommand::Play => {
                player.play()?;
                println!("OK: Playing");
            }
            SessionCommand::Pause => {
                player.pause()?;
                println!("OK: Paused");
            }
            SessionCommand::Toggle => {
                let playing = player.toggle_play()?;
                println!("OK: {}", if playing { "Playing" } else { "Paused" });
            }
            SessionCommand::Seek { percent } => match player.seek_by_fraction(percent)? {
                Some(time) => println!("Seeked to: {:.2}s", time),
                None => println!("Duration unknown; seek ignored"),
            },
            SessionCommand::DragStart => {
                player.drag_start();
                println!("OK: Dragging");
            }
            SessionCommand::DragMove { percent } => match player.drag_move(percent) {
                Some(request) => println!("Requested preview {} at {:.2}s", request.id, request.time),
                None => println!("No preview requested"),
            },
            SessionCommand::DragEnd { percent } => match player.drag_end(percent)? {
                Some(time) => println!("Committed seek to {:.2}s", time),
                None => println!("Drag released without a seek"),
            },
            SessionCommand::Quality { index } => match player.set_quality_level(index)? {
                LevelRequest::Sent => println!("Requested quality level {}", index),
                LevelRequest::Unchanged => println!("Level {} is already active", index),
            },
            SessionCommand::Rate { rate } => {
                if player.set_playback_rate(rate)? {
                    println!("OK: Rate {}x", rate);
                } else {
                    println!("Rate {}x is already active", rate);
                }
            }
            SessionCommand::Volume { level } => {
                let volume = f64::from(level) / 100.0;
                player.set_volume(volume)?;
                self.config_manager.set_volume(volume)?;
                println!("OK: Volume {}%", level);
            }
            SessionCommand::Key { key } => {
                if player.handle_key(KeyInput::new(key))? {
                    StatusDisplay::display_compact_status(&player.snapshot());
                }
            }
            SessionCommand::Status => {
                StatusDisplay::display_full_status(&player.snapshot(), player.preview_surface());
            }
            SessionCommand::Events => {
                StatusDisplay::display_event_statistics(&self.logger.get_event_statistics());
            }
            SessionCommand::Exit => {}
        }
        Ok(())
    }

    /// Tear the player down and persist preferences
    fn shutdown(&mut self, player: &mut VideoPlayer<Bitmap>) -> Result<(), PlayerError> {
        println!("Shutting down...");
        let volume = player.snapshot().playback.volume;
        player.unload();

        if let Err(e) = self.config_manager.set_volume(volume) {
            eprintln!("Warning: Error saving configuration: {}", e);
        }

        println!("Shutdown complete.");
        Ok(())
    }

    /// Log an error at its severity and show it with recovery hints
    fn handle_error_with_recovery(&self, error: &PlayerError) {
        log!(error.severity().log_level(), "{}", error);
        if let PlayerError::Pipeline(PipelineError::Released) = error {
            println!("No source loaded.");
            return;
        }
        StatusDisplay::display_error_with_recovery(error);
    }
}

#[tokio::main]
async fn main() -> Result<(), PlayerError> {
    let cli = CliApp::parse();

    let mut app = match AppController::new() {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            StatusDisplay::display_simple_error(&e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.execute_command(cli.command).await {
        app.handle_error_with_recovery(&e);
        std::process::exit(1);
    }

    info!("Application shutdown complete");
    Ok(())
}
