//! # Arm Sentry Library
//!
//! Arm-state driven flight recording and perception control over MAVLink.
//!
//! This library watches the autopilot heartbeat for arm/disarm transitions
//! and uses them to open and close per-session telemetry recordings and to
//! start and stop an external perception process.

pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod mavlink;
pub mod serial;
pub mod session;
pub mod shutdown;
pub mod telemetry;
