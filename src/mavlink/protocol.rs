//! # MAVLink Protocol Constants and Types
//!
//! Wire-level definitions for the handful of MAVLink common messages the
//! controller consumes. Everything else is carried as an opaque frame.

use bytes::Bytes;

/// MAVLink v1 start marker
pub const MAVLINK_STX_V1: u8 = 0xFE;

/// MAVLink v2 start marker
pub const MAVLINK_STX_V2: u8 = 0xFD;

/// v1 header: stx, len, seq, sysid, compid, msgid
pub const MAVLINK_V1_HEADER_LEN: usize = 6;

/// v2 header: stx, len, incompat, compat, seq, sysid, compid, msgid(3)
pub const MAVLINK_V2_HEADER_LEN: usize = 10;

/// Trailing checksum size
pub const MAVLINK_CHECKSUM_LEN: usize = 2;

/// v2 signature block size (present when the signed flag is set)
pub const MAVLINK_SIGNATURE_LEN: usize = 13;

/// v2 incompatibility flag: frame is signed
pub const MAVLINK_IFLAG_SIGNED: u8 = 0x01;

/// Safety-armed bit of the heartbeat `base_mode` field
pub const MAV_MODE_FLAG_SAFETY_ARMED: u8 = 0x80;

pub const MSG_ID_HEARTBEAT: u32 = 0;
pub const MSG_ID_SYS_STATUS: u32 = 1;
pub const MSG_ID_ATTITUDE: u32 = 30;
pub const MSG_ID_GLOBAL_POSITION_INT: u32 = 33;
pub const MSG_ID_VFR_HUD: u32 = 74;

/// Base (v1) payload sizes; v2 extensions are ignored
pub const HEARTBEAT_PAYLOAD_SIZE: usize = 9;
pub const SYS_STATUS_PAYLOAD_SIZE: usize = 31;
pub const ATTITUDE_PAYLOAD_SIZE: usize = 28;
pub const GLOBAL_POSITION_INT_PAYLOAD_SIZE: usize = 28;
pub const VFR_HUD_PAYLOAD_SIZE: usize = 20;

/// CRC extra seed for a message id, if the message is known
pub fn crc_extra(message_id: u32) -> Option<u8> {
    match message_id {
        MSG_ID_HEARTBEAT => Some(50),
        MSG_ID_SYS_STATUS => Some(124),
        MSG_ID_ATTITUDE => Some(39),
        MSG_ID_GLOBAL_POSITION_INT => Some(104),
        MSG_ID_VFR_HUD => Some(20),
        _ => None,
    }
}

/// Minimum payload length the decoder needs for a known message
pub fn payload_size(message_id: u32) -> Option<usize> {
    match message_id {
        MSG_ID_HEARTBEAT => Some(HEARTBEAT_PAYLOAD_SIZE),
        MSG_ID_SYS_STATUS => Some(SYS_STATUS_PAYLOAD_SIZE),
        MSG_ID_ATTITUDE => Some(ATTITUDE_PAYLOAD_SIZE),
        MSG_ID_GLOBAL_POSITION_INT => Some(GLOBAL_POSITION_INT_PAYLOAD_SIZE),
        MSG_ID_VFR_HUD => Some(VFR_HUD_PAYLOAD_SIZE),
        _ => None,
    }
}

/// Protocol generation of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MavlinkVersion {
    V1,
    V2,
}

/// A checksummed frame lifted off the wire
#[derive(Debug, Clone)]
pub struct MavFrame {
    pub version: MavlinkVersion,
    pub sequence: u8,
    pub system_id: u8,
    pub component_id: u8,
    pub message_id: u32,

    /// Payload, zero-extended to the message's base size when v2 truncated it
    pub payload: Bytes,

    /// Verbatim frame bytes, start marker through checksum (and signature)
    pub raw: Bytes,
}

/// HEARTBEAT (#0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub custom_mode: u32,
    pub mav_type: u8,
    pub autopilot: u8,
    pub base_mode: u8,
    pub system_status: u8,
}

/// SYS_STATUS (#1), battery fields only
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SysStatus {
    /// Battery voltage in volts
    pub voltage: f32,

    /// Remaining battery, 0-100%, -1 when the autopilot does not know
    pub battery_remaining: i8,
}

/// ATTITUDE (#30)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    pub time_boot_ms: u32,
    /// Radians
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// GLOBAL_POSITION_INT (#33)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalPositionInt {
    pub time_boot_ms: u32,
    /// Degrees × 10^7
    pub lat: i32,
    pub lon: i32,
    /// Millimetres above MSL
    pub alt: i32,
    pub relative_alt: i32,
}

/// VFR_HUD (#74)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VfrHud {
    pub airspeed: f32,
    /// m/s
    pub groundspeed: f32,
    pub alt: f32,
    /// m/s
    pub climb: f32,
}

/// Decoded message body
#[derive(Debug, Clone, PartialEq)]
pub enum MavMessage {
    Heartbeat(Heartbeat),
    SysStatus(SysStatus),
    Attitude(Attitude),
    GlobalPositionInt(GlobalPositionInt),
    VfrHud(VfrHud),
    Unknown { message_id: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_constants() {
        assert_eq!(MAVLINK_STX_V1, 0xFE);
        assert_eq!(MAVLINK_STX_V2, 0xFD);
        assert_eq!(MAV_MODE_FLAG_SAFETY_ARMED, 128);
    }

    #[test]
    fn test_known_messages_have_crc_extra_and_size() {
        for id in [
            MSG_ID_HEARTBEAT,
            MSG_ID_SYS_STATUS,
            MSG_ID_ATTITUDE,
            MSG_ID_GLOBAL_POSITION_INT,
            MSG_ID_VFR_HUD,
        ] {
            assert!(crc_extra(id).is_some(), "missing crc extra for {}", id);
            assert!(payload_size(id).is_some(), "missing size for {}", id);
        }
        assert_eq!(crc_extra(MSG_ID_HEARTBEAT), Some(50));
        assert_eq!(crc_extra(MSG_ID_VFR_HUD), Some(20));
    }

    #[test]
    fn test_unknown_message_has_no_crc_extra() {
        assert_eq!(crc_extra(253), None);
        assert_eq!(payload_size(253), None);
    }
}
