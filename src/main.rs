//! # Arm Sentry
//!
//! Records flight telemetry and runs the perception process while the
//! vehicle is armed.
//!
//! This application listens to the autopilot's MAVLink heartbeat and, on
//! every arm/disarm transition, opens or closes the session recordings and
//! starts or stops the perception program.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{error, info};

use arm_sentry::config::Config;
use arm_sentry::controller::Controller;
use arm_sentry::serial::MavlinkSerial;
use arm_sentry::shutdown::Shutdown;

/// Configuration file used when none is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable naming the configuration file
const CONFIG_ENV_VAR: &str = "ARM_SENTRY_CONFIG";

/// First positional argument, then the environment, then the default
fn config_path(arg: Option<String>, env: Option<String>) -> PathBuf {
    arg.or(env)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Main entry point for Arm Sentry
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (built-in defaults if the file is missing)
///    - Set up console and controller-file logging
///    - Open the autopilot serial link
///
/// 2. **Main Loop**
///    - Receive one MAVLink frame per iteration with a bounded wait
///    - Open sinks and start perception on arm, stop and close on disarm
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C or SIGTERM stops the loop
///    - Perception is stopped and every sink is flushed and closed
///
/// # Errors
///
/// Returns error (non-zero exit) if:
/// - The configuration is invalid
/// - The serial port cannot be opened
/// - The telemetry link fails while running
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO arm_sentry: Arm Sentry v0.1.0 starting...
/// INFO arm_sentry::serial: Opened telemetry link at /dev/ttyAMA0 (921600 baud)
/// INFO arm_sentry::controller::lifecycle: Waiting for heartbeat
/// INFO arm_sentry::controller::lifecycle: Heartbeat received from system ID 1
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path(std::env::args().nth(1), std::env::var(CONFIG_ENV_VAR).ok());
    let config = Config::load_or_default(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;

    let _log_guard = arm_sentry::logging::init(&config.logging).context("failed to initialize logging")?;

    info!("Arm Sentry v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", path.display());

    let link = MavlinkSerial::open(&config.link)?;
    let mut controller = Controller::new(link, &config);

    info!("Press Ctrl+C to exit");
    if let Err(e) = controller.run(Shutdown::listen()).await {
        error!("Exiting after fatal error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_prefers_argument() {
        let path = config_path(Some("a.toml".to_string()), Some("b.toml".to_string()));
        assert_eq!(path, PathBuf::from("a.toml"));
    }

    #[test]
    fn test_config_path_falls_back_to_env() {
        let path = config_path(None, Some("b.toml".to_string()));
        assert_eq!(path, PathBuf::from("b.toml"));
    }

    #[test]
    fn test_config_path_default() {
        assert_eq!(config_path(None, None), PathBuf::from(DEFAULT_CONFIG_PATH));
    }
}
