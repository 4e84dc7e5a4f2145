//! # vindisplay-protocol
//!
//! Wire protocol spoken between a host and a knob/button/buzzer text display
//! over a serial link.
//!
//! This crate provides:
//! - The 16-bit frame check value
//! - Frame construction and validation
//! - A resynchronizing stream decoder
//! - Typed commands for both directions and their encoder
//!
//! It performs no I/O; see `vindisplay-client` for the transport side.

pub mod codec;
pub mod crc;
pub mod error;
pub mod frame;
pub mod message;

pub use codec::{Decoder, DecoderStats, Encoder};
pub use crc::{crc16, crc16_bytes};
pub use error::ProtocolError;
pub use frame::{Frame, MAX_PAYLOAD_SIZE, MESSAGE_MAX, MESSAGE_MIN, MESSAGE_SYNC};
pub use message::{BuzzerStatus, IncomingCommand, OutgoingCommand, Tone};

/// Default serial line speed of the display.
pub const DEFAULT_BAUD_RATE: u32 = 9_600;
