//! # MAVLink Frame Decoder
//!
//! Lifts MAVLink v1/v2 frames out of a byte buffer and decodes the message
//! bodies the controller cares about.

use bytes::{Buf, BytesMut};
use tracing::trace;

use super::crc::frame_checksum;
use super::protocol::*;
use crate::error::LinkError;

/// Layout of a frame as described by its header
#[derive(Debug, Clone, Copy)]
struct FrameHeader {
    version: MavlinkVersion,
    header_len: usize,
    body_end: usize,
    frame_len: usize,
    sequence: u8,
    system_id: u8,
    component_id: u8,
    message_id: u32,
}

impl FrameHeader {
    /// Parse the header at the start of `buf`, `None` until it is complete
    fn parse(buf: &[u8]) -> Option<Self> {
        let version = match *buf.first()? {
            MAVLINK_STX_V1 => MavlinkVersion::V1,
            MAVLINK_STX_V2 => MavlinkVersion::V2,
            _ => return None,
        };
        let header_len = match version {
            MavlinkVersion::V1 => MAVLINK_V1_HEADER_LEN,
            MavlinkVersion::V2 => MAVLINK_V2_HEADER_LEN,
        };
        if buf.len() < header_len {
            return None;
        }

        let payload_len = buf[1] as usize;
        let (signature_len, sequence, system_id, component_id, message_id) = match version {
            MavlinkVersion::V1 => (0, buf[2], buf[3], buf[4], buf[5] as u32),
            MavlinkVersion::V2 => (
                if buf[2] & MAVLINK_IFLAG_SIGNED != 0 { MAVLINK_SIGNATURE_LEN } else { 0 },
                buf[4],
                buf[5],
                buf[6],
                u32::from_le_bytes([buf[7], buf[8], buf[9], 0]),
            ),
        };

        let body_end = header_len + payload_len;
        Some(Self {
            version,
            header_len,
            body_end,
            frame_len: body_end + MAVLINK_CHECKSUM_LEN + signature_len,
            sequence,
            system_id,
            component_id,
            message_id,
        })
    }

    /// Whether the checksum of the complete frame in `buf` matches
    fn checksum_matches(&self, buf: &[u8], extra: u8) -> bool {
        let received = u16::from_le_bytes([buf[self.body_end], buf[self.body_end + 1]]);
        frame_checksum(&buf[1..self.body_end], extra) == received
    }
}

/// A frame of a known message that may start inside another frame
enum Embedded {
    Verified,
    Incomplete,
    Invalid,
}

fn check_embedded(buf: &[u8]) -> Embedded {
    let Some(header) = FrameHeader::parse(buf) else {
        return Embedded::Incomplete;
    };
    let Some(extra) = crc_extra(header.message_id) else {
        return Embedded::Invalid;
    };
    if buf.len() < header.frame_len {
        Embedded::Incomplete
    } else if header.checksum_matches(buf, extra) {
        Embedded::Verified
    } else {
        Embedded::Invalid
    }
}

/// Take the next complete frame off the front of `buf`
///
/// Leading bytes that cannot start a frame are discarded. Frames of known
/// messages are checksummed with their CRC extra. Frames of unknown
/// messages cannot be verified; one is only passed through when no
/// checksummed frame of a known message starts inside its span.
///
/// # Returns
///
/// * `Ok(Some(frame))` - A complete frame; its bytes are removed from `buf`
/// * `Ok(None)` - More bytes are needed
///
/// # Errors
///
/// Returns `LinkError::Protocol` on checksum mismatch, or when an unknown
/// frame overlaps a verified one. The leading bytes are dropped so the
/// decoder can resynchronise on the next call.
pub fn next_frame(buf: &mut BytesMut) -> Result<Option<MavFrame>, LinkError> {
    match buf
        .iter()
        .position(|&b| b == MAVLINK_STX_V1 || b == MAVLINK_STX_V2)
    {
        Some(0) => {}
        Some(skip) => {
            trace!("Discarding {} bytes before start marker", skip);
            buf.advance(skip);
        }
        None => {
            buf.clear();
            return Ok(None);
        }
    }

    let Some(header) = FrameHeader::parse(buf) else {
        return Ok(None);
    };
    if buf.len() < header.frame_len {
        return Ok(None);
    }

    match crc_extra(header.message_id) {
        Some(extra) => {
            if !header.checksum_matches(buf, extra) {
                let received = u16::from_le_bytes([buf[header.body_end], buf[header.body_end + 1]]);
                buf.advance(1);
                return Err(LinkError::Protocol(format!(
                    "CRC mismatch on message {}: got 0x{:04X}",
                    header.message_id, received
                )));
            }
        }
        None => {
            for offset in 1..header.frame_len {
                if buf[offset] != MAVLINK_STX_V1 && buf[offset] != MAVLINK_STX_V2 {
                    continue;
                }
                match check_embedded(&buf[offset..]) {
                    Embedded::Verified => {
                        buf.advance(offset);
                        return Err(LinkError::Protocol(format!(
                            "unverified message {} overlaps a valid frame at offset {}",
                            header.message_id, offset
                        )));
                    }
                    Embedded::Incomplete => return Ok(None),
                    Embedded::Invalid => {}
                }
            }
        }
    }

    let raw = buf.split_to(header.frame_len).freeze();
    let mut payload = raw.slice(header.header_len..header.body_end);

    // v2 strips trailing zero bytes from the payload
    if let Some(size) = payload_size(header.message_id) {
        if payload.len() < size {
            let mut extended = BytesMut::with_capacity(size);
            extended.extend_from_slice(&payload);
            extended.resize(size, 0);
            payload = extended.freeze();
        }
    }

    Ok(Some(MavFrame {
        version: header.version,
        sequence: header.sequence,
        system_id: header.system_id,
        component_id: header.component_id,
        message_id: header.message_id,
        payload,
        raw,
    }))
}

/// Decode the body of a frame
///
/// # Errors
///
/// Returns `LinkError::Protocol` if the payload is shorter than the
/// message's base size.
pub fn decode_message(frame: &MavFrame) -> Result<MavMessage, LinkError> {
    let p = &frame.payload[..];

    if let Some(size) = payload_size(frame.message_id) {
        if p.len() < size {
            return Err(LinkError::Protocol(format!(
                "Message {} payload too short: {} bytes",
                frame.message_id,
                p.len()
            )));
        }
    }

    let message = match frame.message_id {
        MSG_ID_HEARTBEAT => MavMessage::Heartbeat(Heartbeat {
            custom_mode: read_u32(p, 0),
            mav_type: p[4],
            autopilot: p[5],
            base_mode: p[6],
            system_status: p[7],
        }),
        MSG_ID_SYS_STATUS => MavMessage::SysStatus(SysStatus {
            // millivolts on the wire
            voltage: read_u16(p, 14) as f32 / 1000.0,
            battery_remaining: p[30] as i8,
        }),
        MSG_ID_ATTITUDE => MavMessage::Attitude(Attitude {
            time_boot_ms: read_u32(p, 0),
            roll: read_f32(p, 4),
            pitch: read_f32(p, 8),
            yaw: read_f32(p, 12),
        }),
        MSG_ID_GLOBAL_POSITION_INT => MavMessage::GlobalPositionInt(GlobalPositionInt {
            time_boot_ms: read_u32(p, 0),
            lat: read_i32(p, 4),
            lon: read_i32(p, 8),
            alt: read_i32(p, 12),
            relative_alt: read_i32(p, 16),
        }),
        MSG_ID_VFR_HUD => MavMessage::VfrHud(VfrHud {
            airspeed: read_f32(p, 0),
            groundspeed: read_f32(p, 4),
            alt: read_f32(p, 8),
            climb: read_f32(p, 12),
        }),
        other => MavMessage::Unknown { message_id: other },
    };

    Ok(message)
}

fn read_u16(p: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([p[at], p[at + 1]])
}

fn read_u32(p: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([p[at], p[at + 1], p[at + 2], p[at + 3]])
}

fn read_i32(p: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([p[at], p[at + 1], p[at + 2], p[at + 3]])
}

fn read_f32(p: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([p[at], p[at + 1], p[at + 2], p[at + 3]])
}
