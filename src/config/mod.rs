use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::ConfigError;
use crate::surface::Rgb;
use crate::waveform::MIN_SAMPLES_DIVIDER;

/// Playback rates offered by the rate selector unless configured otherwise
pub const DEFAULT_PLAYBACK_RATES: [f64; 4] = [0.5, 1.0, 1.5, 2.0];

/// Seconds skipped by the left/right keyboard shortcuts
pub const DEFAULT_SEEK_STEP_SECONDS: f64 = 5.0;

/// Options for the audio waveform view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformOptions {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub bar_color: Rgb,
    pub listened_bar_color: Rgb,
    /// Pixels per bar; values below 2 are treated as 2
    pub samples_divider: u32,
    /// Number of adjacent bars merged into one visual group
    pub merge_amount: u32,
}

impl Default for WaveformOptions {
    fn default() -> Self {
        Self {
            canvas_width: 600,
            canvas_height: 300,
            bar_color: Rgb::new(100, 100, 255),
            listened_bar_color: Rgb::new(0, 255, 0),
            samples_divider: 1,
            merge_amount: 5,
        }
    }
}

impl WaveformOptions {
    /// Copy with every field clamped into its usable domain
    pub fn validated(&self) -> Self {
        Self {
            canvas_width: self.canvas_width.max(1),
            canvas_height: self.canvas_height.max(1),
            samples_divider: self.samples_divider.max(MIN_SAMPLES_DIVIDER),
            merge_amount: self.merge_amount.max(1),
            ..self.clone()
        }
    }
}

/// Options for the video player controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoOptions {
    pub seek_step_seconds: f64,
    pub playback_rates: Vec<f64>,
    pub default_volume: f64,
    pub preview_width: u32,
    pub preview_height: u32,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            seek_step_seconds: DEFAULT_SEEK_STEP_SECONDS,
            playback_rates: DEFAULT_PLAYBACK_RATES.to_vec(),
            default_volume: 1.0,
            preview_width: 300,
            preview_height: 150,
        }
    }
}

impl VideoOptions {
    /// Copy with invalid values replaced by defaults
    pub fn validated(&self) -> Self {
        let defaults = Self::default();

        let seek_step_seconds = if self.seek_step_seconds.is_finite() && self.seek_step_seconds > 0.0 {
            self.seek_step_seconds
        } else {
            defaults.seek_step_seconds
        };

        let mut playback_rates: Vec<f64> = self
            .playback_rates
            .iter()
            .copied()
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .collect();
        playback_rates.sort_by(|a, b| a.total_cmp(b));
        playback_rates.dedup();
        if playback_rates.is_empty() {
            playback_rates = defaults.playback_rates;
        }

        let default_volume = if self.default_volume.is_finite() {
            self.default_volume.clamp(0.0, 1.0)
        } else {
            defaults.default_volume
        };

        Self {
            seek_step_seconds,
            playback_rates,
            default_volume,
            preview_width: self.preview_width.max(1),
            preview_height: self.preview_height.max(1),
        }
    }
}

/// Player configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub waveform: WaveformOptions,
    pub video: VideoOptions,
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    config: PlayerConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        let config = Self::load_config(&config_path).unwrap_or_else(|e| {
            log::warn!("Ignoring configuration at {}: {}", config_path.display(), e);
            PlayerConfig::default()
        });

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Manager bound to an explicit file, loading it if it exists
    pub fn with_path(config_path: PathBuf) -> Result<Self, ConfigError> {
        let config = Self::load_config(&config_path)?;
        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn get_config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn update_config<F>(&mut self, updater: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut PlayerConfig),
    {
        updater(&mut self.config);
        self.save_config()
    }

    pub fn set_volume(&mut self, volume: f64) -> Result<(), ConfigError> {
        self.config.video.default_volume = volume.clamp(0.0, 1.0);
        self.save_config()
    }

    pub fn set_samples_divider(&mut self, divider: u32) -> Result<(), ConfigError> {
        self.config.waveform.samples_divider = divider.max(MIN_SAMPLES_DIVIDER);
        self.save_config()
    }

    pub fn set_merge_amount(&mut self, merge_amount: u32) -> Result<(), ConfigError> {
        self.config.waveform.merge_amount = merge_amount.max(1);
        self.save_config()
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.config = PlayerConfig::default();
        self.save_config()
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::home_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join(".config")
            .join("scrubline");

        std::fs::create_dir_all(&config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    fn load_config(path: &Path) -> Result<PlayerConfig, ConfigError> {
        if !path.exists() {
            return Ok(PlayerConfig::default());
        }

        let config_content = std::fs::read_to_string(path)?;
        let config: PlayerConfig = toml::from_str(&config_content)?;

        Ok(config)
    }

    fn save_config(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let config_content = toml::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, config_content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let config_manager = ConfigManager {
            config: PlayerConfig::default(),
            config_path,
        };

        (config_manager, temp_dir)
    }

    #[test]
    fn test_waveform_options_default() {
        let options = WaveformOptions::default();

        assert_eq!(options.canvas_width, 600);
        assert_eq!(options.canvas_height, 300);
        assert_eq!(options.bar_color, Rgb::new(100, 100, 255));
        assert_eq!(options.listened_bar_color, Rgb::new(0, 255, 0));
        assert_eq!(options.samples_divider, 1);
        assert_eq!(options.merge_amount, 5);
    }

    #[test]
    fn test_waveform_options_validated_clamps() {
        let options = WaveformOptions {
            canvas_width: 0,
            canvas_height: 0,
            samples_divider: 0,
            merge_amount: 0,
            ..WaveformOptions::default()
        }
        .validated();

        assert_eq!(options.canvas_width, 1);
        assert_eq!(options.canvas_height, 1);
        assert_eq!(options.samples_divider, 2);
        assert_eq!(options.merge_amount, 1);

        let untouched = WaveformOptions {
            samples_divider: 7,
            ..WaveformOptions::default()
        };
        assert_eq!(untouched.validated().samples_divider, 7);
    }

    #[test]
    fn test_video_options_validated() {
        let options = VideoOptions {
            seek_step_seconds: -1.0,
            playback_rates: vec![2.0, 0.0, 1.0, f64::NAN, 1.0, -0.5],
            default_volume: 4.0,
            preview_width: 0,
            preview_height: 90,
        }
        .validated();

        assert_eq!(options.seek_step_seconds, DEFAULT_SEEK_STEP_SECONDS);
        assert_eq!(options.playback_rates, vec![1.0, 2.0]);
        assert_eq!(options.default_volume, 1.0);
        assert_eq!(options.preview_width, 1);
        assert_eq!(options.preview_height, 90);

        let empty = VideoOptions {
            playback_rates: vec![],
            ..VideoOptions::default()
        };
        assert_eq!(empty.validated().playback_rates, DEFAULT_PLAYBACK_RATES.to_vec());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = PlayerConfig::default();
        config.waveform.bar_color = Rgb::new(1, 2, 3);
        config.waveform.samples_divider = 4;
        config.video.playback_rates = vec![1.0, 1.25];

        let serialized = toml::to_string(&config).unwrap();
        let deserialized: PlayerConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PlayerConfig = toml::from_str(
            r##"
            [waveform]
            bar_color = "#ff0000"
            samples_divider = 3
            "##,
        )
        .unwrap();

        assert_eq!(config.waveform.bar_color, Rgb::new(255, 0, 0));
        assert_eq!(config.waveform.samples_divider, 3);
        assert_eq!(config.waveform.canvas_width, 600);
        assert_eq!(config.video, VideoOptions::default());
    }

    #[test]
    fn test_invalid_color_is_rejected() {
        let result: Result<PlayerConfig, _> = toml::from_str(
            r#"
            [waveform]
            bar_color = "not a color"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load_config() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager.config.waveform.merge_amount = 3;
        config_manager.config.video.seek_step_seconds = 10.0;
        config_manager.save_config().unwrap();

        let loaded_config = ConfigManager::load_config(&config_manager.config_path).unwrap();

        assert_eq!(loaded_config.waveform.merge_amount, 3);
        assert_eq!(loaded_config.video.seek_step_seconds, 10.0);
    }

    #[test]
    fn test_load_nonexistent_config() {
        let temp_dir = TempDir::new().unwrap();
        let nonexistent_path = temp_dir.path().join("nonexistent.toml");

        let config = ConfigManager::load_config(&nonexistent_path).unwrap();

        assert_eq!(config, PlayerConfig::default());
    }

    #[test]
    fn test_load_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");

        fs::write(&config_path, "invalid toml content [[[").unwrap();

        let result = ConfigManager::load_config(&config_path);
        assert!(matches!(result, Err(ConfigError::DeserializationError(_))));
    }

    #[test]
    fn test_with_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("custom.toml");
        fs::write(&config_path, "[video]\nseek_step_seconds = 2.5\n").unwrap();

        let manager = ConfigManager::with_path(config_path.clone()).unwrap();
        assert_eq!(manager.get_config().video.seek_step_seconds, 2.5);
        assert_eq!(manager.config_path(), config_path.as_path());
    }

    #[test]
    fn test_update_config() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager
            .update_config(|config| {
                config.waveform.canvas_width = 800;
                config.video.preview_width = 320;
            })
            .unwrap();

        assert_eq!(config_manager.config.waveform.canvas_width, 800);

        let loaded_config = ConfigManager::load_config(&config_manager.config_path).unwrap();
        assert_eq!(loaded_config.waveform.canvas_width, 800);
        assert_eq!(loaded_config.video.preview_width, 320);
    }

    #[test]
    fn test_set_volume() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager.set_volume(0.7).unwrap();
        assert_eq!(config_manager.config.video.default_volume, 0.7);

        config_manager.set_volume(1.5).unwrap();
        assert_eq!(config_manager.config.video.default_volume, 1.0);

        config_manager.set_volume(-0.5).unwrap();
        assert_eq!(config_manager.config.video.default_volume, 0.0);
    }

    #[test]
    fn test_set_samples_divider_clamps() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager.set_samples_divider(1).unwrap();
        assert_eq!(config_manager.config.waveform.samples_divider, 2);

        config_manager.set_samples_divider(6).unwrap();
        assert_eq!(config_manager.config.waveform.samples_divider, 6);
    }

    #[test]
    fn test_set_merge_amount() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager.set_merge_amount(0).unwrap();
        assert_eq!(config_manager.config.waveform.merge_amount, 1);

        config_manager.set_merge_amount(8).unwrap();
        assert_eq!(config_manager.config.waveform.merge_amount, 8);
    }

    #[test]
    fn test_reset_to_defaults() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager.config.waveform.canvas_height = 10;
        config_manager.config.video.default_volume = 0.1;

        config_manager.reset_to_defaults().unwrap();

        assert_eq!(config_manager.config, PlayerConfig::default());
    }

    #[test]
    fn test_config_path_creation() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("nested").join("config").join("config.toml");

        let config_manager = ConfigManager {
            config: PlayerConfig::default(),
            config_path: nested_path.clone(),
        };

        config_manager.save_config().unwrap();

        assert!(nested_path.exists());
    }

    #[test]
    fn test_toml_format() {
        let config = PlayerConfig::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[waveform]"));
        assert!(toml_string.contains("[video]"));
        assert!(toml_string.contains("bar_color = \"rgb(100, 100, 255)\""));
        assert!(toml_string.contains("samples_divider = 1"));
        assert!(toml_string.contains("seek_step_seconds"));
    }
}
