//! 16-bit frame check value.
//!
//! The peripheral firmware uses a byte-wise feedback variant of CRC-16 seeded
//! with `0xFFFF` (equivalent to CRC-16/MCRF4XX). It is computed over the
//! length byte, command id and payload of a frame and transmitted
//! most-significant byte first.

/// Initial register value.
pub const CRC_INIT: u16 = 0xFFFF;

/// Computes the check value over `data`.
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(CRC_INIT, |crc, &byte| update(crc, byte))
}

/// Computes the check value and returns it in wire order (big-endian).
pub fn crc16_bytes(data: &[u8]) -> [u8; 2] {
    crc16(data).to_be_bytes()
}

#[inline]
fn update(crc: u16, byte: u8) -> u16 {
    let mut data = byte ^ (crc & 0xFF) as u8;
    data ^= (data & 0x0F) << 4;
    let data = data as u16;
    ((data << 8) | (crc >> 8)) ^ (data >> 4) ^ (data << 3)
}
