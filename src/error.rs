use thiserror::Error;

/// Main player error type
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Waveform error: {0}")]
    Waveform(#[from] WaveformError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Quality error: {0}")]
    Quality(#[from] QualityError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("CLI parse error: {0}")]
    Parse(#[from] crate::cli::ParseError),
}

impl PlayerError {
    /// Get user-friendly error message with suggested solutions
    pub fn user_message(&self) -> String {
        match self {
            PlayerError::Waveform(err) => err.user_message(),
            PlayerError::Decode(err) => err.user_message(),
            PlayerError::Pipeline(err) => err.user_message(),
            PlayerError::Quality(err) => err.user_message(),
            PlayerError::Config(err) => err.user_message(),
            PlayerError::File(err) => Self::format_file_error(err),
            PlayerError::Parse(err) => format!("Command error: {}", err),
        }
    }

    /// Get suggested recovery actions for the error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PlayerError::Waveform(err) => err.recovery_suggestions(),
            PlayerError::Decode(err) => err.recovery_suggestions(),
            PlayerError::Pipeline(err) => err.recovery_suggestions(),
            PlayerError::Quality(err) => err.recovery_suggestions(),
            PlayerError::Config(err) => err.recovery_suggestions(),
            PlayerError::File(err) => Self::file_error_suggestions(err),
            PlayerError::Parse(_) => vec!["Type 'help' to see available commands".to_string()],
        }
    }

    /// Check if the player can keep going after this error.
    ///
    /// Every failure is scoped to one player instance; the ones reported as
    /// not recoverable need a different source or different input.
    pub fn is_recoverable(&self) -> bool {
        match self {
            PlayerError::Waveform(err) => err.is_recoverable(),
            PlayerError::Decode(err) => err.is_recoverable(),
            PlayerError::Pipeline(err) => err.is_recoverable(),
            PlayerError::Quality(_) => true, // The control is disabled, playback continues
            PlayerError::Config(_) => true,  // Defaults are used
            PlayerError::File(_) => false,
            PlayerError::Parse(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PlayerError::Waveform(_) => ErrorSeverity::Warning,
            PlayerError::Decode(_) => ErrorSeverity::Error,
            PlayerError::Pipeline(PipelineError::Released) => ErrorSeverity::Info,
            PlayerError::Pipeline(_) => ErrorSeverity::Error,
            PlayerError::Quality(_) => ErrorSeverity::Info,
            PlayerError::Config(_) => ErrorSeverity::Warning,
            PlayerError::File(_) => ErrorSeverity::Error,
            PlayerError::Parse(_) => ErrorSeverity::Info,
        }
    }

    fn format_file_error(err: &std::io::Error) -> String {
        match err.kind() {
            std::io::ErrorKind::NotFound => "File or directory not found".to_string(),
            std::io::ErrorKind::PermissionDenied => "Permission denied - cannot access file".to_string(),
            std::io::ErrorKind::UnexpectedEof => "File appears to be truncated".to_string(),
            _ => format!("File system error: {}", err),
        }
    }

    fn file_error_suggestions(err: &std::io::Error) -> Vec<String> {
        match err.kind() {
            std::io::ErrorKind::NotFound => vec![
                "Check that the file path is correct".to_string(),
                "Try using absolute path instead of relative path".to_string(),
            ],
            std::io::ErrorKind::PermissionDenied => vec![
                "Check file permissions".to_string(),
                "Ensure the file is not locked by another application".to_string(),
            ],
            _ => vec!["Try the operation again".to_string()],
        }
    }
}

/// Error severity levels for logging and user feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
        }
    }

    pub fn log_level(&self) -> log::Level {
        match self {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error => log::Level::Error,
        }
    }
}

/// Waveform computation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaveformError {
    #[error("Insufficient samples: {available} samples cannot fill {requested} bars")]
    InsufficientSamples { available: usize, requested: usize },

    #[error("Waveform needs at least one bar")]
    NoBars,
}

impl WaveformError {
    pub fn user_message(&self) -> String {
        match self {
            WaveformError::InsufficientSamples { available, requested } => {
                format!(
                    "The audio is too short to draw {} bars (only {} samples decoded)",
                    requested, available
                )
            }
            WaveformError::NoBars => "The waveform canvas is too narrow to draw any bars".to_string(),
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            WaveformError::InsufficientSamples { .. } => vec![
                "Increase the samples divider to draw fewer bars".to_string(),
                "Use a narrower waveform canvas".to_string(),
            ],
            WaveformError::NoBars => vec![
                "Increase the canvas width".to_string(),
                "Lower the samples divider (minimum 2)".to_string(),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        // Both are configuration problems; playback itself is unaffected
        true
    }
}

/// Audio decoding errors
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    #[error("No audio track found")]
    NoAudioTrack,

    #[error("Decode failed: {0}")]
    DecodeFailed(String),
}

impl DecodeError {
    pub fn user_message(&self) -> String {
        match self {
            DecodeError::UnsupportedFormat { format } => {
                format!("Media format '{}' is not supported by the decode backend", format)
            }
            DecodeError::NoAudioTrack => "The source does not contain an audio track".to_string(),
            DecodeError::DecodeFailed(msg) => {
                format!("Failed to decode audio data: {}", msg)
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            DecodeError::UnsupportedFormat { .. } => vec![
                "Supported formats: FLAC, WAV, MP3, OGG/Vorbis, AAC/M4A".to_string(),
                "Check if the file extension matches the actual format".to_string(),
            ],
            DecodeError::NoAudioTrack => vec![
                "Check that the source is an audio file".to_string(),
            ],
            DecodeError::DecodeFailed(_) => vec![
                "Reload the source".to_string(),
                "Check if the file is completely downloaded".to_string(),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            DecodeError::UnsupportedFormat { .. } => false, // Requires a different source
            DecodeError::NoAudioTrack => false,
            DecodeError::DecodeFailed(_) => true, // Reloading the source may succeed
        }
    }
}

/// Errors reported by a playback, preview or streaming collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("{operation} rejected: {reason}")]
    Rejected { operation: String, reason: String },

    #[error("Pipeline already released")]
    Released,

    #[error("Pipeline unavailable: {0}")]
    Unavailable(String),
}

impl PipelineError {
    pub fn rejected(operation: &str, reason: impl Into<String>) -> Self {
        PipelineError::Rejected {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Rejected { operation, reason } => {
                format!("The player refused to {}: {}", operation, reason)
            }
            PipelineError::Released => "The player has been closed".to_string(),
            PipelineError::Unavailable(msg) => format!("The media pipeline is unavailable: {}", msg),
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PipelineError::Rejected { .. } => vec!["Try the action again".to_string()],
            PipelineError::Released => vec!["Load a source first".to_string()],
            PipelineError::Unavailable(_) => vec![
                "Reload the source".to_string(),
                "Check the network connection".to_string(),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        true
    }
}

/// Quality level and playback rate selection errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QualityError {
    #[error("Quality switching unavailable")]
    LevelSwitchUnavailable,

    #[error("Unknown quality level {index} ({available} levels available)")]
    UnknownLevel { index: usize, available: usize },

    #[error("Unsupported playback rate: {rate}")]
    UnsupportedRate { rate: f64 },
}

impl QualityError {
    pub fn user_message(&self) -> String {
        match self {
            QualityError::LevelSwitchUnavailable => {
                "This source does not offer alternate quality levels".to_string()
            }
            QualityError::UnknownLevel { index, available } => {
                format!("Quality level {} does not exist ({} available)", index, available)
            }
            QualityError::UnsupportedRate { rate } => {
                format!("Playback rate {}x is not offered", rate)
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            QualityError::LevelSwitchUnavailable => vec![
                "Use an adaptive streaming (HLS) source to switch quality".to_string(),
            ],
            QualityError::UnknownLevel { .. } => vec![
                "Use 'status' to see the available quality levels".to_string(),
            ],
            QualityError::UnsupportedRate { .. } => vec![
                "Use 'status' to see the available playback rates".to_string(),
            ],
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::ConfigDirNotFound => {
                "Cannot find or create configuration directory".to_string()
            }
            ConfigError::IoError(err) => {
                format!("Cannot access configuration file: {}", err)
            }
            ConfigError::SerializationError(_) => {
                "Failed to save configuration settings".to_string()
            }
            ConfigError::DeserializationError(_) => {
                "Configuration file is corrupted or has invalid format".to_string()
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ConfigError::ConfigDirNotFound => vec![
                "Check that you have write permissions to your home directory".to_string(),
                "Try creating the directory manually: ~/.config/scrubline/".to_string(),
            ],
            ConfigError::IoError(_) => vec![
                "Check file permissions for the configuration directory".to_string(),
                "Ensure the disk is not full".to_string(),
            ],
            ConfigError::SerializationError(_) => vec![
                "Configuration will use default values".to_string(),
            ],
            ConfigError::DeserializationError(_) => vec![
                "Delete the configuration file to reset to defaults".to_string(),
                "Check the configuration file format manually".to_string(),
            ],
        }
    }
}
