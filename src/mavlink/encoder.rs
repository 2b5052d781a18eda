//! # MAVLink Frame Encoder
//!
//! Builds wire frames for the decoder, serial link and controller tests.

use super::crc::frame_checksum;
use super::protocol::*;

/// Component id stamped on every encoded frame
const COMPONENT_ID_AUTOPILOT: u8 = 1;

/// Encode a MAVLink v1 frame
pub fn encode_v1(message_id: u32, system_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(MAVLINK_V1_HEADER_LEN + payload.len() + 2);
    frame.push(MAVLINK_STX_V1);
    frame.push(payload.len() as u8);
    frame.push(0); // sequence
    frame.push(system_id);
    frame.push(COMPONENT_ID_AUTOPILOT);
    frame.push(message_id as u8);
    frame.extend_from_slice(payload);

    let crc = frame_checksum(&frame[1..], crc_extra(message_id).unwrap_or(0));
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

/// Encode a MAVLink v2 frame, truncating trailing zero payload bytes
pub fn encode_v2(message_id: u32, system_id: u8, payload: &[u8]) -> Vec<u8> {
    let keep = payload
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(1);
    let payload = &payload[..keep.min(payload.len())];

    let mut frame = Vec::with_capacity(MAVLINK_V2_HEADER_LEN + payload.len() + 2);
    frame.push(MAVLINK_STX_V2);
    frame.push(payload.len() as u8);
    frame.push(0); // incompat flags
    frame.push(0); // compat flags
    frame.push(0); // sequence
    frame.push(system_id);
    frame.push(COMPONENT_ID_AUTOPILOT);
    frame.extend_from_slice(&message_id.to_le_bytes()[..3]);
    frame.extend_from_slice(payload);

    let crc = frame_checksum(&frame[1..], crc_extra(message_id).unwrap_or(0));
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

/// HEARTBEAT payload for a quadrotor running ArduPilot
pub fn heartbeat_payload(base_mode: u8) -> Vec<u8> {
    let mut p = vec![0u8; HEARTBEAT_PAYLOAD_SIZE];
    p[4] = 2; // MAV_TYPE_QUADROTOR
    p[5] = 3; // MAV_AUTOPILOT_ARDUPILOTMEGA
    p[6] = base_mode;
    p[7] = 4; // MAV_STATE_ACTIVE
    p[8] = 3; // mavlink_version
    p
}

/// GLOBAL_POSITION_INT payload (degE7, mm)
pub fn position_payload(lat: i32, lon: i32, alt_mm: i32) -> Vec<u8> {
    let mut p = vec![0u8; GLOBAL_POSITION_INT_PAYLOAD_SIZE];
    p[4..8].copy_from_slice(&lat.to_le_bytes());
    p[8..12].copy_from_slice(&lon.to_le_bytes());
    p[12..16].copy_from_slice(&alt_mm.to_le_bytes());
    p
}

/// ATTITUDE payload (radians)
pub fn attitude_payload(roll: f32, pitch: f32, yaw: f32) -> Vec<u8> {
    let mut p = vec![0u8; ATTITUDE_PAYLOAD_SIZE];
    p[4..8].copy_from_slice(&roll.to_le_bytes());
    p[8..12].copy_from_slice(&pitch.to_le_bytes());
    p[12..16].copy_from_slice(&yaw.to_le_bytes());
    p
}

/// VFR_HUD payload (m/s)
pub fn vfr_hud_payload(groundspeed: f32, climb: f32) -> Vec<u8> {
    let mut p = vec![0u8; VFR_HUD_PAYLOAD_SIZE];
    p[4..8].copy_from_slice(&groundspeed.to_le_bytes());
    p[12..16].copy_from_slice(&climb.to_le_bytes());
    p
}

/// SYS_STATUS payload with a battery reading
pub fn sys_status_payload(voltage_mv: u16, battery_remaining: i8) -> Vec<u8> {
    let mut p = vec![0u8; SYS_STATUS_PAYLOAD_SIZE];
    p[14..16].copy_from_slice(&voltage_mv.to_le_bytes());
    p[30] = battery_remaining as u8;
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v1_frame_layout() {
        let frame = encode_v1(MSG_ID_HEARTBEAT, 1, &heartbeat_payload(0x80));
        assert_eq!(frame.len(), MAVLINK_V1_HEADER_LEN + HEARTBEAT_PAYLOAD_SIZE + 2);
        assert_eq!(frame[0], MAVLINK_STX_V1);
        assert_eq!(frame[1], HEARTBEAT_PAYLOAD_SIZE as u8);
        assert_eq!(frame[5], MSG_ID_HEARTBEAT as u8);
    }

    #[test]
    fn test_v2_keeps_at_least_one_payload_byte() {
        let frame = encode_v2(MSG_ID_HEARTBEAT, 1, &[0u8; HEARTBEAT_PAYLOAD_SIZE]);
        assert_eq!(frame[1], 1);
        assert_eq!(frame.len(), MAVLINK_V2_HEADER_LEN + 1 + 2);
    }
}
