//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `scenehub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use chrono::{FixedOffset, NaiveTime};
use serde::Deserialize;

use scenehub_adapter_memory::DEFAULT_CAPACITY;
use scenehub_app::scene_manager::ManagerSettings;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduling settings.
    pub scheduler: SchedulerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Execution history settings.
    pub history: HistoryConfig,
    /// Demo devices and scenes.
    pub demo: DemoConfig,
}

/// Scheduler configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Local time (`HH:MM`) at which the next day's timer firings are queued.
    pub arrange_at: String,
    /// Offset of the hub's local time from UTC, in minutes.
    pub utc_offset_minutes: i32,
    /// Upper bound for a single device request, in seconds.
    pub device_timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Execution history configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of task records kept in memory.
    pub capacity: usize,
}

/// Demo toggle.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Register virtual devices and sample scenes on startup.
    pub enabled: bool,
}

impl Config {
    /// Load configuration from `scenehub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if a
    /// value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("scenehub.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    /// Apply overrides from `lookup`, usually the process environment.
    /// Unparsable numbers and flags are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("SCENEHUB_ARRANGE_AT") {
            self.scheduler.arrange_at = val;
        }
        if let Some(val) = lookup("SCENEHUB_UTC_OFFSET_MINUTES")
            && let Ok(minutes) = val.parse()
        {
            self.scheduler.utc_offset_minutes = minutes;
        }
        if let Some(val) = lookup("SCENEHUB_DEVICE_TIMEOUT_SECS")
            && let Ok(secs) = val.parse()
        {
            self.scheduler.device_timeout_secs = secs;
        }
        if let Some(val) = lookup("SCENEHUB_HISTORY_CAPACITY")
            && let Ok(capacity) = val.parse()
        {
            self.history.capacity = capacity;
        }
        if let Some(val) = lookup("SCENEHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("SCENEHUB_DEMO")
            && let Some(enabled) = parse_flag(&val)
        {
            self.demo.enabled = enabled;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.arrange_at()?;
        self.utc_offset()?;
        if self.scheduler.device_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "device_timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.history.capacity == 0 {
            return Err(ConfigError::Validation(
                "history capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed arrangement time. Accepts `HH:MM` and `HH:MM:SS`.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the value is not a time of day.
    pub fn arrange_at(&self) -> Result<NaiveTime, ConfigError> {
        let raw = self.scheduler.arrange_at.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|_| ConfigError::Validation(format!("arrange_at {raw:?} is not a time of day")))
    }

    /// The hub's UTC offset.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the offset is a day or more.
    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        let minutes = self.scheduler.utc_offset_minutes;
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::Validation(format!("utc_offset_minutes {minutes} is out of range"))
            })
    }

    /// Settings handed to the scene manager.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `arrange_at` cannot be parsed.
    pub fn manager_settings(&self) -> Result<ManagerSettings, ConfigError> {
        Ok(ManagerSettings {
            arrange_at: self.arrange_at()?,
            device_timeout: Duration::from_secs(self.scheduler.device_timeout_secs),
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            arrange_at: "23:55".to_string(),
            utc_offset_minutes: 0,
            device_timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "scenehubd=info,scenehub_app=info,scenehub_adapter_virtual=info".to_string(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
