//! Binary frame format.
//!
//! Frame layout (5 to 128 bytes):
//!
//! ```text
//! +--------+------------+-----------+-----------+--------+
//! | length | command_id | payload   | crc16     | sync   |
//! | 1 byte | 1 byte     | 0..=123 B | 2 bytes   | 0x7E   |
//! +--------+------------+-----------+-----------+--------+
//! ```
//!
//! `length` counts every byte of the frame including itself and the sync
//! terminator. The CRC covers `length`, `command_id` and the payload and is
//! sent big-endian; payload integers are little-endian.

use crate::crc::crc16;
use crate::error::ProtocolError;
use bytes::{BufMut, Bytes, BytesMut};

/// Smallest possible frame (no payload).
pub const MESSAGE_MIN: usize = 5;

/// Largest frame the peripheral accepts.
pub const MESSAGE_MAX: usize = 128;

/// Frame terminator, also tolerated as a separator before a frame.
pub const MESSAGE_SYNC: u8 = 0x7E;

/// Length byte plus command id.
pub const MESSAGE_HEADER_SIZE: usize = 2;

/// CRC plus sync byte.
pub const MESSAGE_TRAILER_SIZE: usize = 3;

/// Largest payload that still fits in a frame.
pub const MAX_PAYLOAD_SIZE: usize = MESSAGE_MAX - MESSAGE_HEADER_SIZE - MESSAGE_TRAILER_SIZE;

/// A complete, CRC-validated frame.
///
/// Holds the raw wire bytes; fields are read through accessors so a frame can
/// be forwarded or logged exactly as it was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// Builds a frame around `payload`.
    ///
    /// Construction order: length byte, command id and payload, then the CRC
    /// over everything so far, then the sync terminator.
    pub fn build(command_id: u8, payload: &[u8]) -> Result<Self, ProtocolError> {
        let size = MESSAGE_HEADER_SIZE + payload.len() + MESSAGE_TRAILER_SIZE;
        if size > MESSAGE_MAX {
            return Err(ProtocolError::FrameTooLarge {
                size,
                max: MESSAGE_MAX,
            });
        }

        let mut buf = BytesMut::with_capacity(size);
        buf.put_u8(size as u8);
        buf.put_u8(command_id);
        buf.put_slice(payload);
        let crc = crc16(&buf);
        buf.put_u16(crc);
        buf.put_u8(MESSAGE_SYNC);

        Ok(Self {
            bytes: buf.freeze(),
        })
    }

    /// Validates a standalone frame.
    ///
    /// `data` must hold exactly one frame; use [`crate::Decoder`] to extract
    /// frames from a stream.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < MESSAGE_MIN {
            return Err(ProtocolError::InvalidFrame("shorter than minimum frame"));
        }
        if data.len() > MESSAGE_MAX {
            return Err(ProtocolError::FrameTooLarge {
                size: data.len(),
                max: MESSAGE_MAX,
            });
        }
        if data[0] as usize != data.len() {
            return Err(ProtocolError::InvalidFrame("length byte does not match frame size"));
        }
        if data[data.len() - 1] != MESSAGE_SYNC {
            return Err(ProtocolError::InvalidFrame("missing sync terminator"));
        }

        let crc_offset = data.len() - MESSAGE_TRAILER_SIZE;
        let expected = u16::from_be_bytes([data[crc_offset], data[crc_offset + 1]]);
        let actual = crc16(&data[..crc_offset]);
        if expected != actual {
            return Err(ProtocolError::CrcMismatch { expected, actual });
        }

        Ok(Self {
            bytes: Bytes::copy_from_slice(data),
        })
    }

    /// Wraps bytes the decoder has already validated.
    pub(crate) fn from_validated(bytes: Bytes) -> Self {
        debug_assert!(bytes.len() >= MESSAGE_MIN && bytes.len() <= MESSAGE_MAX);
        debug_assert_eq!(bytes[bytes.len() - 1], MESSAGE_SYNC);
        Self { bytes }
    }

    /// Total frame size as carried in the length byte.
    pub fn length(&self) -> u8 {
        self.bytes[0]
    }

    pub fn command_id(&self) -> u8 {
        self.bytes[1]
    }

    /// Bytes between the command id and the CRC.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[MESSAGE_HEADER_SIZE..self.bytes.len() - MESSAGE_TRAILER_SIZE]
    }

    /// The transmitted check value.
    pub fn crc(&self) -> u16 {
        let offset = self.bytes.len() - MESSAGE_TRAILER_SIZE;
        u16::from_be_bytes([self.bytes[offset], self.bytes[offset + 1]])
    }

    /// Raw wire bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_knob_frame() {
        let frame = Frame::build(12, &3i16.to_le_bytes()).unwrap();
        assert_eq!(
            frame.as_bytes(),
            &[0x07, 0x0C, 0x03, 0x00, 0xDB, 0xCB, 0x7E]
        );
        assert_eq!(frame.length(), 7);
        assert_eq!(frame.command_id(), 12);
        assert_eq!(frame.payload(), &[0x03, 0x00]);
        assert_eq!(frame.crc(), 0xDBCB);
    }

    #[test]
    fn test_build_empty_payload() {
        let frame = Frame::build(0x42, &[]).unwrap();
        assert_eq!(frame.length() as usize, MESSAGE_MIN);
        assert!(frame.payload().is_empty());
        assert_eq!(frame.as_bytes()[4], MESSAGE_SYNC);
    }

    #[test]
    fn test_build_max_payload() {
        let payload = vec![0xAA; MAX_PAYLOAD_SIZE];
        let frame = Frame::build(10, &payload).unwrap();
        assert_eq!(frame.length() as usize, MESSAGE_MAX);
        assert_eq!(frame.payload(), payload.as_slice());
    }

    #[test]
    fn test_build_too_large() {
        let payload = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        let result = Frame::build(10, &payload);
        assert_eq!(
            result,
            Err(ProtocolError::FrameTooLarge {
                size: MESSAGE_MAX + 1,
                max: MESSAGE_MAX
            })
        );
    }

    #[test]
    fn test_parse_valid() {
        let built = Frame::build(13, &[1]).unwrap();
        let parsed = Frame::parse(built.as_bytes()).unwrap();
        assert_eq!(parsed, built);
        assert_eq!(parsed.as_bytes(), &[0x06, 0x0D, 0x01, 0x4E, 0x1B, 0x7E]);
    }

    #[test]
    fn test_parse_crc_mismatch() {
        let mut bytes = Frame::build(13, &[1]).unwrap().as_bytes().to_vec();
        bytes[2] = 0;
        let result = Frame::parse(&bytes);
        assert!(matches!(
            result,
            Err(ProtocolError::CrcMismatch {
                expected: 0x4E1B,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_missing_sync() {
        let mut bytes = Frame::build(13, &[1]).unwrap().as_bytes().to_vec();
        let last = bytes.len() - 1;
        bytes[last] = 0x00;
        assert_eq!(
            Frame::parse(&bytes),
            Err(ProtocolError::InvalidFrame("missing sync terminator"))
        );
    }

    #[test]
    fn test_parse_length_mismatch() {
        let mut bytes = Frame::build(13, &[1]).unwrap().as_bytes().to_vec();
        bytes.push(0x00);
        assert!(matches!(
            Frame::parse(&bytes),
            Err(ProtocolError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_parse_too_short() {
        assert!(matches!(
            Frame::parse(&[0x04, 0x01, 0x00, 0x7E]),
            Err(ProtocolError::InvalidFrame(_))
        ));
    }
}
