//! # MAVLink Link Layer
//!
//! Minimal MAVLink v1/v2 framing for the autopilot telemetry link.
//!
//! This module handles:
//! - Frame synchronisation on the v1/v2 start markers
//! - X.25 checksum validation with per-message CRC extra
//! - Decoding HEARTBEAT, SYS_STATUS, ATTITUDE, GLOBAL_POSITION_INT and VFR_HUD
//!
//! Other messages are framed but left undecoded.

pub mod protocol;
pub mod decoder;
pub mod crc;
#[cfg(test)]
pub(crate) mod encoder;
