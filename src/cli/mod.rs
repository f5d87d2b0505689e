use crate::playback::Key;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod status;
pub use status::StatusDisplay;

/// Waveform and scrub-preview player CLI
#[derive(Parser)]
#[command(name = "scrubline")]
#[command(about = "Render audio waveforms and drive scrub-preview video players from the terminal")]
#[command(version = "0.1.0")]
pub struct CliApp {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode an audio file and print its waveform
    Waveform {
        /// Audio file to decode
        path: PathBuf,
        /// Surface width in pixels (defaults to the configured canvas width)
        #[arg(long)]
        width: Option<u32>,
        /// Surface height in pixels (defaults to the configured canvas height)
        #[arg(long)]
        height: Option<u32>,
        /// Pixels per bar
        #[arg(long)]
        divider: Option<u32>,
        /// Adjacent bars merged into one group
        #[arg(long)]
        merge: Option<u32>,
        /// Listened portion in percent (0-100)
        #[arg(long, default_value_t = 0.0)]
        progress: f64,
    },
    /// Interactive scrub-preview session against simulated pipelines
    Preview {
        /// Media URL; `.m3u8` sources get quality levels
        source: String,
        /// Simulated media duration in seconds
        #[arg(long, default_value_t = 120.0)]
        duration: f64,
        /// Rendition heights advertised by the simulated manifest
        #[arg(long, value_delimiter = ',', default_values_t = vec![360, 720, 1080])]
        levels: Vec<u32>,
    },
}

/// Commands accepted inside an interactive preview session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Play,
    Pause,
    Toggle,
    /// Seek to a percentage of the duration
    Seek { percent: f64 },
    DragStart,
    DragMove { percent: f64 },
    DragEnd { percent: f64 },
    Quality { index: usize },
    Rate { rate: f64 },
    Volume { level: u8 },
    Key { key: Key },
    Status,
    /// Event history summary
    Events,
    Exit,
}

impl CliApp {
    /// Parse command line arguments
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Expand tilde (~) in path to home directory
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home_dir) = dirs::home_dir() {
                home_dir.join(rest)
            } else {
                PathBuf::from(path)
            }
        } else if path == "~" {
            dirs::home_dir().unwrap_or_else(|| PathBuf::from(path))
        } else {
            PathBuf::from(path)
        }
    }

    /// Parse command from string (for interactive mode)
    pub fn parse_command(input: &str) -> Result<SessionCommand, ParseError> {
        let args: Vec<&str> = input.split_whitespace().collect();
        if args.is_empty() {
            return Err(ParseError::EmptyCommand);
        }

        match args[0] {
            "play" => Ok(SessionCommand::Play),
            "pause" => Ok(SessionCommand::Pause),
            "toggle" => Ok(SessionCommand::Toggle),
            "seek" => {
                let value = Self::required(&args, 1, "seek", "percent")?;
                Ok(SessionCommand::Seek {
                    percent: Self::parse_percent(value)?,
                })
            }
            "drag" => {
                let action = Self::required(&args, 1, "drag", "action")?;
                match action {
                    "start" => Ok(SessionCommand::DragStart),
                    "move" => {
                        let value = Self::required(&args, 2, "drag move", "percent")?;
                        Ok(SessionCommand::DragMove {
                            percent: Self::parse_percent(value)?,
                        })
                    }
                    "end" => {
                        let value = Self::required(&args, 2, "drag end", "percent")?;
                        Ok(SessionCommand::DragEnd {
                            percent: Self::parse_percent(value)?,
                        })
                    }
                    _ => Err(ParseError::UnknownCommand {
                        command: format!("drag {}", action),
                    }),
                }
            }
            "quality" => {
                let value = Self::required(&args, 1, "quality", "index")?;
                let index = value.parse::<usize>().map_err(|_| ParseError::InvalidArgument {
                    argument: "quality index".to_string(),
                    value: value.to_string(),
                    expected: "a level number".to_string(),
                })?;
                Ok(SessionCommand::Quality { index })
            }
            "rate" => {
                let value = Self::required(&args, 1, "rate", "rate")?;
                let rate = value
                    .trim_end_matches('x')
                    .parse::<f64>()
                    .ok()
                    .filter(|rate| rate.is_finite() && *rate > 0.0)
                    .ok_or_else(|| ParseError::InvalidArgument {
                        argument: "playback rate".to_string(),
                        value: value.to_string(),
                        expected: "a positive number such as 1.5".to_string(),
                    })?;
                Ok(SessionCommand::Rate { rate })
            }
            "volume" => {
                let value = Self::required(&args, 1, "volume", "level")?;
                match value.parse::<u8>() {
                    Ok(level) if level <= 100 => Ok(SessionCommand::Volume { level }),
                    Ok(_) => Err(ParseError::InvalidArgument {
                        argument: "volume level".to_string(),
                        value: value.to_string(),
                        expected: "0-100".to_string(),
                    }),
                    Err(_) => Err(ParseError::InvalidArgument {
                        argument: "volume level".to_string(),
                        value: value.to_string(),
                        expected: "number 0-100".to_string(),
                    }),
                }
            }
            "key" => {
                let value = Self::required(&args, 1, "key", "name")?;
                let key = match value {
                    "space" => Key::Space,
                    "left" => Key::ArrowLeft,
                    "right" => Key::ArrowRight,
                    other => {
                        return Err(ParseError::InvalidArgument {
                            argument: "key".to_string(),
                            value: other.to_string(),
                            expected: "space, left or right".to_string(),
                        })
                    }
                };
                Ok(SessionCommand::Key { key })
            }
            "status" => Ok(SessionCommand::Status),
            "events" => Ok(SessionCommand::Events),
            "exit" | "quit" => Ok(SessionCommand::Exit),
            "help" => Err(ParseError::HelpRequested),
            _ => Err(ParseError::UnknownCommand {
                command: args[0].to_string(),
            }),
        }
    }

    fn required<'a>(args: &[&'a str], position: usize, command: &str, argument: &str) -> Result<&'a str, ParseError> {
        args.get(position).copied().ok_or_else(|| ParseError::MissingArgument {
            command: command.to_string(),
            argument: argument.to_string(),
        })
    }

    /// Parse a percentage such as `40` or `40%` into a fraction in `[0, 1]`
    pub fn parse_percent(value: &str) -> Result<f64, ParseError> {
        let invalid = || ParseError::InvalidArgument {
            argument: "percent".to_string(),
            value: value.to_string(),
            expected: "0-100".to_string(),
        };
        let percent = value
            .trim_end_matches('%')
            .parse::<f64>()
            .map_err(|_| invalid())?;
        if !(0.0..=100.0).contains(&percent) {
            return Err(invalid());
        }
        Ok(percent / 100.0)
    }

    /// Display help information
    pub fn display_help() {
        println!("scrubline preview session - Available Commands:");
        println!();
        println!("Playback Control:");
        println!("  play                 - Start playback");
        println!("  pause                - Pause playback");
        println!("  toggle               - Toggle play/pause");
        println!("  seek <percent>       - Seek to a position (e.g. '40' or '40%')");
        println!("  rate <rate>          - Set playback rate (e.g. '1.5')");
        println!("  volume <0-100>       - Set volume level");
        println!("  key <space|left|right> - Send a keyboard shortcut");
        println!();
        println!("Scrubbing:");
        println!("  drag start           - Start dragging the scrub bar");
        println!("  drag move <percent>  - Move the scrub bar and request a preview frame");
        println!("  drag end <percent>   - Release the scrub bar and seek there");
        println!();
        println!("Quality:");
        println!("  quality <index>      - Switch to a quality level");
        println!();
        println!("Information:");
        println!("  status               - Show current player status");
        println!("  events               - Show event history summary");
        println!();
        println!("General:");
        println!("  help                 - Show this help message");
        println!("  exit, quit           - Exit the session");
    }
}

/// Command parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("Missing argument for {command}: {argument}")]
    MissingArgument { command: String, argument: String },

    #[error("Invalid argument {argument}: got '{value}', expected {expected}")]
    InvalidArgument {
        argument: String,
        value: String,
        expected: String,
    },

    #[error("Help requested")]
    HelpRequested,
}

#[cfg(test)]
mod tests;
