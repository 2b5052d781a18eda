//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::telemetry::logger::LogFormat;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub perception: PerceptionConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telemetry link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_recv_timeout_ms")]
    pub recv_timeout_ms: u64,
}

/// Session recording configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RecordingConfig {
    #[serde(default = "default_raw_log_dir")]
    pub raw_log_dir: String,

    #[serde(default = "default_structured_log_dir")]
    pub structured_log_dir: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub structured_scope: LogScope,
}

/// Lifetime of a structured log file
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogScope {
    /// One file per controller run, appended to by every session
    #[default]
    Run,
    /// One file per armed session
    Session,
}

/// Perception subprocess configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerceptionConfig {
    #[serde(default = "default_perception_enabled")]
    pub enabled: bool,

    /// Interpreter placed before `program` (e.g. "python"); empty runs `program` directly
    #[serde(default = "default_launcher")]
    pub launcher: String,

    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default = "default_model_path")]
    pub model_path: String,

    #[serde(default = "default_model_config_path")]
    pub config_path: String,

    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

/// Controller behaviour configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ControllerConfig {
    #[serde(default)]
    pub open_failure_policy: OpenFailurePolicy,
}

/// What the state machine reports when session sinks fail to open on arm
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OpenFailurePolicy {
    /// Report `Armed` without sinks or perception
    #[default]
    StayArmed,
    /// Return to `Disarmed` so the next armed heartbeat retries
    RollBack,
}

/// Application log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_file_enabled")]
    pub file_enabled: bool,

    #[serde(default = "default_controller_log_dir")]
    pub log_dir: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyAMA0".to_string() }
fn default_baud_rate() -> u32 { 921600 }
fn default_recv_timeout_ms() -> u64 { 1000 }

fn default_raw_log_dir() -> String { "./logs/pixhawk_logs".to_string() }
fn default_structured_log_dir() -> String { "./logs/telemetry_logs".to_string() }

fn default_perception_enabled() -> bool { true }
fn default_launcher() -> String { "python".to_string() }
fn default_program() -> String { "./live_inference.py".to_string() }
fn default_model_path() -> String { "./models/best_openvino_2022.1_6shave.blob".to_string() }
fn default_model_config_path() -> String { "./models/best.json".to_string() }
fn default_stop_timeout_ms() -> u64 { 5000 }

fn default_log_level() -> String { "info".to_string() }
fn default_log_file_enabled() -> bool { true }
fn default_controller_log_dir() -> String { "./logs/controller_logs".to_string() }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            recv_timeout_ms: default_recv_timeout_ms(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            raw_log_dir: default_raw_log_dir(),
            structured_log_dir: default_structured_log_dir(),
            format: LogFormat::default(),
            structured_scope: LogScope::default(),
        }
    }
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            enabled: default_perception_enabled(),
            launcher: default_launcher(),
            program: default_program(),
            model_path: default_model_path(),
            config_path: default_model_config_path(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_enabled: default_log_file_enabled(),
            log_dir: default_controller_log_dir(),
        }
    }
}

impl LinkConfig {
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}

impl PerceptionConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use arm_sentry::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use validated defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.link.port.is_empty() {
            return Err(crate::error::ArmSentryError::Config(
                toml::de::Error::custom("serial port cannot be empty")
            ));
        }

        if ![57600, 115200, 230400, 460800, 921600, 1500000].contains(&self.link.baud_rate) {
            return Err(crate::error::ArmSentryError::Config(
                toml::de::Error::custom("baud_rate must be one of: 57600, 115200, 230400, 460800, 921600, 1500000")
            ));
        }

        if self.link.recv_timeout_ms == 0 || self.link.recv_timeout_ms > 10000 {
            return Err(crate::error::ArmSentryError::Config(
                toml::de::Error::custom("recv_timeout_ms must be between 1 and 10000")
            ));
        }

        if self.recording.raw_log_dir.is_empty() {
            return Err(crate::error::ArmSentryError::Config(
                toml::de::Error::custom("raw_log_dir cannot be empty")
            ));
        }

        if self.recording.structured_log_dir.is_empty() {
            return Err(crate::error::ArmSentryError::Config(
                toml::de::Error::custom("structured_log_dir cannot be empty")
            ));
        }

        if self.perception.enabled {
            if self.perception.program.is_empty() {
                return Err(crate::error::ArmSentryError::Config(
                    toml::de::Error::custom("perception program cannot be empty when enabled")
                ));
            }

            if self.perception.model_path.is_empty() || self.perception.config_path.is_empty() {
                return Err(crate::error::ArmSentryError::Config(
                    toml::de::Error::custom("perception model_path and config_path are required when enabled")
                ));
            }
        }

        if self.perception.stop_timeout_ms == 0 || self.perception.stop_timeout_ms > 60000 {
            return Err(crate::error::ArmSentryError::Config(
                toml::de::Error::custom("stop_timeout_ms must be between 1 and 60000")
            ));
        }

        if self.logging.file_enabled && self.logging.log_dir.is_empty() {
            return Err(crate::error::ArmSentryError::Config(
                toml::de::Error::custom("logging log_dir cannot be empty when file logging is enabled")
            ));
        }

        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            return Err(crate::error::ArmSentryError::Config(
                toml::de::Error::custom(format!("invalid log level: {}", self.logging.level))
            ));
        }

        Ok(())
    }
}
