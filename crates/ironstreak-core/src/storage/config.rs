//! TOML-based application configuration.
//!
//! Stores:
//! - Canonical reference zone (fixed UTC offset) used to resolve "today"
//! - Target creation limits
//! - Evaluation mode (lazy on read, or eager sweep before every command)
//! - Log filter
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::calendar::SystemClock;
use crate::error::ConfigError;
use crate::target::{TargetPolicy, MAX_DURATION_DAYS};

/// When terminal statuses get persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Recompute on every read; nothing runs in between.
    #[default]
    Lazy,
    /// Additionally sweep all active targets before each command.
    Eager,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Offset of the reference zone from UTC, in minutes.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetsConfig {
    #[serde(default = "default_max_duration_days")]
    pub max_duration_days: u32,
    /// Days before today a new target may start.
    #[serde(default)]
    pub start_grace_days: u32,
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` overrides it.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub evaluation: EvaluationMode,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub targets: TargetsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_max_duration_days() -> u32 {
    MAX_DURATION_DAYS
}
fn default_max_text_chars() -> usize {
    500
}
fn default_log_filter() -> String {
    "warn".into()
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
        }
    }
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            max_duration_days: default_max_duration_days(),
            start_grace_days: 0,
            max_text_chars: default_max_text_chars(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            evaluation: EvaluationMode::default(),
            clock: ClockConfig::default(),
            targets: TargetsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// UTC-12:00 .. UTC+14:00, the span of zones in actual use.
const OFFSET_RANGE_MINUTES: std::ops::RangeInclusive<i32> = -720..=840;

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".into(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(invalid("config key is empty".into()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(format!("cannot parse '{value}' as bool: {e}")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as integer")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from the data directory, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if it does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !OFFSET_RANGE_MINUTES.contains(&self.clock.utc_offset_minutes) {
            return Err(ConfigError::InvalidValue {
                key: "clock.utc_offset_minutes".into(),
                message: format!(
                    "{} is outside {}..={}",
                    self.clock.utc_offset_minutes,
                    OFFSET_RANGE_MINUTES.start(),
                    OFFSET_RANGE_MINUTES.end()
                ),
            });
        }
        if !(1..=MAX_DURATION_DAYS).contains(&self.targets.max_duration_days) {
            return Err(ConfigError::InvalidValue {
                key: "targets.max_duration_days".into(),
                message: format!("must be between 1 and {MAX_DURATION_DAYS}"),
            });
        }
        if self.targets.max_text_chars == 0 {
            return Err(ConfigError::InvalidValue {
                key: "targets.max_text_chars".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse or
    /// validate. `self` is left untouched on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a value by key and persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Creation limits derived from `[targets]`.
    pub fn policy(&self) -> TargetPolicy {
        TargetPolicy {
            max_duration_days: self.targets.max_duration_days,
            start_grace_days: self.targets.start_grace_days,
            max_text_chars: self.targets.max_text_chars,
        }
    }

    /// Clock for the configured reference zone.
    pub fn clock(&self) -> Result<SystemClock, ConfigError> {
        SystemClock::with_offset_minutes(self.clock.utc_offset_minutes).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "clock.utc_offset_minutes".into(),
                message: format!("{} is not a valid offset", self.clock.utc_offset_minutes),
            }
        })
    }
}
