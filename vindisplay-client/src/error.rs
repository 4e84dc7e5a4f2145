//! Client error types.

use crate::config::ConfigError;
use thiserror::Error;
use vindisplay_protocol::ProtocolError;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("reader thread panicked")]
    ReaderPanicked,
}

impl ClientError {
    /// Returns whether this error ends the link.
    ///
    /// Protocol errors only cost the frame they were raised for.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ClientError::Protocol(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_fatal() {
        assert!(!ClientError::Protocol(ProtocolError::UnknownCommand(3)).is_fatal());
        assert!(ClientError::ConnectionClosed.is_fatal());
        assert!(ClientError::NotConnected.is_fatal());
        assert!(ClientError::Io(std::io::Error::other("boom")).is_fatal());
    }

    #[test]
    fn test_display() {
        let err = ClientError::Protocol(ProtocolError::UnknownCommand(42));
        assert_eq!(err.to_string(), "protocol error: unknown command id: 42");
    }
}
