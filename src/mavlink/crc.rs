//! # CRC-16/MCRF4XX (X.25) Implementation
//!
//! Checksum used by MAVLink v1 and v2 frames.
//!
//! **Polynomial**: 0x1021, reflected as 0x8408
//! **Initial Value**: 0xFFFF
//! **Final XOR**: none
//!
//! The checksum covers every byte after the start marker up to the end of
//! the payload, followed by the message's one-byte CRC extra.

/// Reflected X.25 polynomial
const CRC16_POLY_REFLECTED: u16 = 0x8408;

/// Initial accumulator value
pub const CRC16_INIT: u16 = 0xFFFF;

/// Precomputed lookup table
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate CRC16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u16;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY_REFLECTED;
            } else {
                crc >>= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Fold one byte into a running checksum
#[inline]
pub fn accumulate(crc: u16, byte: u8) -> u16 {
    (crc >> 8) ^ CRC16_TABLE[((crc ^ byte as u16) & 0xFF) as usize]
}

/// Calculate the X.25 checksum of a byte slice
///
/// # Examples
///
/// ```
/// use arm_sentry::mavlink::crc::crc16_x25;
///
/// assert_eq!(crc16_x25(b"123456789"), 0x6F91);
/// ```
pub fn crc16_x25(data: &[u8]) -> u16 {
    data.iter().fold(CRC16_INIT, |crc, &byte| accumulate(crc, byte))
}

/// Checksum of a MAVLink frame body seeded with the message's CRC extra
///
/// # Arguments
///
/// * `body` - Frame bytes after the start marker, through the end of the payload
/// * `crc_extra` - Per-message seed byte derived from the message definition
pub fn frame_checksum(body: &[u8], crc_extra: u8) -> u16 {
    accumulate(crc16_x25(body), crc_extra)
}

/// Bitwise accumulate as written in the MAVLink reference C library
///
/// Slower, kept to cross-check the lookup table.
#[cfg(test)]
fn accumulate_slow(crc: u16, byte: u8) -> u16 {
    let mut tmp = byte ^ (crc & 0xFF) as u8;
    tmp ^= tmp << 4;
    let tmp = tmp as u16;
    (crc >> 8) ^ (tmp << 8) ^ (tmp << 3) ^ (tmp >> 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crc16_slow(data: &[u8]) -> u16 {
        data.iter().fold(CRC16_INIT, |crc, &byte| accumulate_slow(crc, byte))
    }

    #[test]
    fn test_crc16_empty() {
        assert_eq!(crc16_x25(&[]), CRC16_INIT);
    }

    #[test]
    fn test_crc16_check_value() {
        // Standard check value for CRC-16/MCRF4XX
        assert_eq!(crc16_x25(b"123456789"), 0x6F91);
    }

    #[test]
    fn test_lookup_table_matches_slow() {
        let test_data = [
            vec![0x09, 0x00, 0x01, 0x01, 0x00],
            vec![0xFF, 0xFE, 0xFD],
            vec![0x00; 28],
            vec![0xFF; 31],
            b"123456789".to_vec(),
        ];

        for data in test_data.iter() {
            assert_eq!(
                crc16_x25(data),
                crc16_slow(data),
                "CRC mismatch for data: {:?}",
                data
            );
        }
    }

    #[test]
    fn test_crc_extra_changes_checksum() {
        let body = [0x09, 0x00, 0x01, 0x01, 0x00];
        assert_ne!(frame_checksum(&body, 50), frame_checksum(&body, 124));
        assert_eq!(frame_checksum(&body, 50), accumulate(crc16_x25(&body), 50));
    }
}
