//! Link configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via VINDISPLAY_CONFIG, or passed to
//!    `Config::load_from`)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vindisplay_protocol::{Tone, DEFAULT_BAUD_RATE};

/// Default read buffer size for transport reads.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 256;

/// Minimum read buffer size.
pub const MIN_READ_BUFFER_SIZE: usize = 16;

/// Maximum read buffer size.
pub const MAX_READ_BUFFER_SIZE: usize = 4096;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial link configuration.
    pub link: LinkConfig,
    /// Input interpretation.
    pub input: InputConfig,
    /// Audible feedback for input events.
    pub feedback: FeedbackConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var("VINDISPLAY_CONFIG") {
            Ok(path) => Self::load_from(path),
            Err(_) => Ok(Self::from_env()),
        }
    }

    /// Loads configuration from `path`, then applies environment variable
    /// overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Self::from_yaml(&content).map_err(|e| match e {
            ConfigError::ParseError(_, msg) => ConfigError::ParseError(path.to_path_buf(), msg),
            other => other,
        })
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(PathBuf::new(), e.to_string()))
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        self.link.apply_env_overrides();
        self.input.apply_env_overrides();
        self.feedback.apply_env_overrides();
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }

    /// Validates the whole configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.link.validate()?;
        self.feedback.validate()
    }
}

/// Serial link configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial device path.
    pub device: String,
    /// Line speed.
    pub baud_rate: u32,
    /// Write timeout in milliseconds.
    pub write_timeout_ms: u64,
    /// Bytes requested per transport read.
    pub read_buffer_size: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyACM0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            write_timeout_ms: 1000,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl LinkConfig {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(device) = std::env::var("VINDISPLAY_DEVICE") {
            if !device.is_empty() {
                self.device = device;
            }
        }

        if let Ok(baud) = std::env::var("VINDISPLAY_BAUD") {
            if let Ok(parsed) = baud.parse() {
                self.baud_rate = parsed;
            }
        }

        if let Ok(timeout) = std::env::var("VINDISPLAY_WRITE_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.write_timeout_ms = ms;
            }
        }
    }

    /// Returns the write timeout as Duration.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Returns the read buffer size clamped to the supported range.
    pub fn read_buffer_len(&self) -> usize {
        self.read_buffer_size
            .clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.device.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "link.device must not be empty".to_string(),
            ));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::ValidationError(
                "link.baud_rate must be positive".to_string(),
            ));
        }
        if self.write_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "link.write_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Input interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Minimum hold time for a long click, in milliseconds (inclusive).
    pub long_click_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            long_click_ms: 1000,
        }
    }
}

impl InputConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(ms) = std::env::var("VINDISPLAY_LONG_CLICK_MS") {
            if let Ok(parsed) = ms.parse() {
                self.long_click_ms = parsed;
            }
        }
    }

    pub fn long_click(&self) -> Duration {
        Duration::from_millis(self.long_click_ms)
    }
}

/// Audible feedback for input events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Beep on knob rotation and short clicks.
    pub enabled: bool,
    /// Knob rotation tone frequency.
    pub knob_tone_hz: f64,
    /// Short click tone frequency.
    pub click_tone_hz: f64,
    /// Tone length in milliseconds.
    pub tone_ms: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            knob_tone_hz: 1000.0,
            click_tone_hz: 400.0,
            tone_ms: 50,
        }
    }
}

impl FeedbackConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(enabled) = std::env::var("VINDISPLAY_FEEDBACK") {
            self.enabled = enabled == "1" || enabled.to_lowercase() == "true";
        }
    }

    pub fn knob_tone(&self) -> Tone {
        Tone::new(self.knob_tone_hz, Duration::from_millis(self.tone_ms))
    }

    pub fn click_tone(&self) -> Tone {
        Tone::new(self.click_tone_hz, Duration::from_millis(self.tone_ms))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for tone in [self.knob_tone(), self.click_tone()] {
            tone.half_period_us()
                .map_err(|e| ConfigError::ValidationError(format!("feedback: {}", e)))?;
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.link.device, "/dev/ttyACM0");
        assert_eq!(config.link.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.link.write_timeout(), Duration::from_secs(1));
        assert_eq!(config.input.long_click(), Duration::from_secs(1));
        assert!(config.feedback.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_tones() {
        let feedback = FeedbackConfig::default();
        assert_eq!(feedback.knob_tone(), Tone::new(1000.0, Duration::from_millis(50)));
        assert_eq!(feedback.click_tone(), Tone::new(400.0, Duration::from_millis(50)));
    }

    #[test]
    fn test_partial_yaml() {
        let config = Config::from_yaml(
            "link:\n  device: /dev/ttyUSB3\ninput:\n  long_click_ms: 750\n",
        )
        .unwrap();
        assert_eq!(config.link.device, "/dev/ttyUSB3");
        assert_eq!(config.link.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.input.long_click(), Duration::from_millis(750));
        assert_eq!(config.feedback.tone_ms, 50);
    }

    #[test]
    fn test_invalid_yaml() {
        let result = Config::from_yaml("link: [1, 2");
        assert!(matches!(result, Err(ConfigError::ParseError(_, _))));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.link.device, config.link.device);
        assert_eq!(parsed.feedback.knob_tone_hz, config.feedback.knob_tone_hz);
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.link.device = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = Config::default();
        config.link.baud_rate = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.link.write_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("write_timeout_ms"));

        let mut config = Config::default();
        config.feedback.click_tone_hz = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("feedback"));
    }

    #[test]
    fn test_buffer_clamping() {
        let link = LinkConfig::new("/dev/null").with_read_buffer_size(1);
        assert_eq!(link.read_buffer_size, MIN_READ_BUFFER_SIZE);

        let link = LinkConfig::new("/dev/null").with_read_buffer_size(1 << 20);
        assert_eq!(link.read_buffer_size, MAX_READ_BUFFER_SIZE);

        let mut link = LinkConfig::default();
        link.read_buffer_size = 0;
        assert_eq!(link.read_buffer_len(), MIN_READ_BUFFER_SIZE);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vindisplay.yaml");

        let mut config = Config::default();
        config.link.device = "/dev/ttyS9".to_string();
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.link.device, "/dev/ttyS9");
    }

    #[test]
    fn test_load_from_applies_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vindisplay.yaml");
        std::fs::write(&path, "input:\n  long_click_ms: 750\n").unwrap();

        std::env::set_var("VINDISPLAY_LONG_CLICK_MS", "1500");
        let loaded = Config::load_from(&path);
        std::env::remove_var("VINDISPLAY_LONG_CLICK_MS");

        assert_eq!(loaded.unwrap().input.long_click_ms, 1500);
        assert_eq!(
            Config::load_from(&path).unwrap().input.long_click_ms,
            750
        );
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/nonexistent/vindisplay.yaml");
        assert!(matches!(result, Err(ConfigError::IoError(_, _))));
    }
}
