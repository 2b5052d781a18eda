//! # Telemetry Types
//!
//! Typed view of the link traffic the controller routes.

use bytes::Bytes;
use chrono::{DateTime, Local};

use crate::mavlink::protocol::{MavFrame, MavMessage};

/// Arm state carried by one heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatSample {
    pub armed: bool,
    /// MAVLink system id of the sender
    pub source_id: u8,
}

/// Measurement payload of a telemetry sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleKind {
    /// Degrees, degrees, metres above MSL
    Position { lat: f64, lon: f64, alt_m: f64 },
    /// Radians
    Attitude { roll: f32, pitch: f32, yaw: f32 },
    /// m/s
    Speed { ground_speed: f32, climb: f32 },
    Battery { remaining_pct: u8 },
}

/// A non-heartbeat measurement stamped with its capture time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    pub captured_at: DateTime<Local>,
    pub kind: SampleKind,
}

impl TelemetrySample {
    pub fn new(kind: SampleKind) -> Self {
        Self {
            captured_at: Local::now(),
            kind,
        }
    }
}

/// Classified link message
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryMessage {
    Heartbeat(HeartbeatSample),
    Sample(TelemetrySample),
    /// Anything the controller does not route (still raw-recorded)
    Other { message_id: u32 },
}

impl TelemetryMessage {
    /// Classify a decoded MAVLink message
    ///
    /// An unknown battery level (`-1` on the wire) produces no sample.
    pub fn from_mavlink(system_id: u8, message: &MavMessage) -> Self {
        let sample = |kind| TelemetryMessage::Sample(TelemetrySample::new(kind));

        match *message {
            MavMessage::Heartbeat(hb) => TelemetryMessage::Heartbeat(HeartbeatSample {
                armed: crate::controller::tracker::classify(hb.base_mode),
                source_id: system_id,
            }),
            MavMessage::GlobalPositionInt(pos) => sample(SampleKind::Position {
                lat: pos.lat as f64 / 10_000_000.0,
                lon: pos.lon as f64 / 10_000_000.0,
                alt_m: pos.alt as f64 / 1000.0,
            }),
            MavMessage::Attitude(att) => sample(SampleKind::Attitude {
                roll: att.roll,
                pitch: att.pitch,
                yaw: att.yaw,
            }),
            MavMessage::VfrHud(hud) => sample(SampleKind::Speed {
                ground_speed: hud.groundspeed,
                climb: hud.climb,
            }),
            MavMessage::SysStatus(status) if status.battery_remaining >= 0 => {
                sample(SampleKind::Battery {
                    remaining_pct: status.battery_remaining as u8,
                })
            }
            MavMessage::SysStatus(_) => TelemetryMessage::Other {
                message_id: crate::mavlink::protocol::MSG_ID_SYS_STATUS,
            },
            MavMessage::Unknown { message_id } => TelemetryMessage::Other { message_id },
        }
    }
}

/// One message off the link with the bytes it arrived as
#[derive(Debug, Clone)]
pub struct Frame {
    /// Verbatim wire bytes, appended to the raw recording
    pub raw: Bytes,
    pub message: TelemetryMessage,
}

impl Frame {
    pub fn new(raw: Bytes, message: TelemetryMessage) -> Self {
        Self { raw, message }
    }

    /// Build from a checksummed frame and its decoded body
    pub fn from_mavlink(frame: MavFrame, message: &MavMessage) -> Self {
        let message = TelemetryMessage::from_mavlink(frame.system_id, message);
        Self::new(frame.raw, message)
    }
}
