//! Protocol error types.

use thiserror::Error;

/// Errors raised while building, validating or interpreting frames.
///
/// None of these are fatal to a link: the decoder recovers from framing and
/// CRC errors by itself, and the dispatcher discards frames it cannot
/// interpret.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("CRC mismatch: expected {expected:#06x}, got {actual:#06x}")]
    CrcMismatch { expected: u16, actual: u16 },

    #[error("unknown command id: {0}")]
    UnknownCommand(u8),

    #[error("invalid payload for command {command_id}: expected {expected} bytes, got {actual}")]
    InvalidPayload {
        command_id: u8,
        expected: usize,
        actual: usize,
    },

    #[error("invalid frame: {0}")]
    InvalidFrame(&'static str),

    #[error("invalid tone: {0}")]
    InvalidTone(String),
}

impl ProtocolError {
    /// Returns true for errors caused by line noise rather than by a
    /// well-formed but unexpected message.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            ProtocolError::CrcMismatch { .. } | ProtocolError::InvalidFrame(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::FrameTooLarge { size: 200, max: 128 };
        assert!(err.to_string().contains("200"));
        assert!(err.to_string().contains("128"));

        let err = ProtocolError::CrcMismatch {
            expected: 0xABCD,
            actual: 0x1234,
        };
        let msg = err.to_string();
        assert!(msg.contains("0xabcd"));
        assert!(msg.contains("0x1234"));

        let err = ProtocolError::UnknownCommand(99);
        assert!(err.to_string().contains("99"));

        let err = ProtocolError::InvalidPayload {
            command_id: 12,
            expected: 2,
            actual: 1,
        };
        assert!(err.to_string().contains("command 12"));
    }

    #[test]
    fn test_is_corruption() {
        assert!(ProtocolError::CrcMismatch {
            expected: 0,
            actual: 1
        }
        .is_corruption());
        assert!(ProtocolError::InvalidFrame("missing sync").is_corruption());
        assert!(!ProtocolError::UnknownCommand(1).is_corruption());
        assert!(!ProtocolError::InvalidTone("zero".into()).is_corruption());
    }
}
