//! Typed commands carried in frames.
//!
//! Commands are split by direction:
//! - Peripheral → host: knob position, button state, buzzer queue status
//! - Host → peripheral: display text, buzzer play, buzzer tone queue

use crate::error::ProtocolError;
use crate::frame::{Frame, MAX_PAYLOAD_SIZE};
use bytes::Bytes;
use serde::Serialize;
use std::time::Duration;

// Command ids: host → peripheral
pub const CMD_DISPLAY_TEXT: u8 = 10;
pub const CMD_BUZZER_PLAY: u8 = 14;
pub const CMD_BUZZER_QUEUE: u8 = 15;

// Command ids: peripheral → host
pub const CMD_KNOB_EVENT: u8 = 12;
pub const CMD_BUTTON_EVENT: u8 = 13;
pub const CMD_BUZZER_EVENT: u8 = 16;

/// Fixed length marker leading a tone queue payload.
pub const BUZZER_QUEUE_PAYLOAD_LEN: u8 = 8;

/// Longest text a single DisplayText frame can carry.
pub const MAX_DISPLAY_TEXT: usize = MAX_PAYLOAD_SIZE - 1;

pub const BUTTON_RELEASED: u8 = 0;
pub const BUTTON_PRESSED: u8 = 1;

/// Peripheral-side buzzer queue status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuzzerStatus {
    /// Playback queue has room for more tones.
    Ready,
    /// Playback queue is full.
    Full,
    Unknown(u8),
}

impl BuzzerStatus {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => BuzzerStatus::Ready,
            2 => BuzzerStatus::Full,
            other => BuzzerStatus::Unknown(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            BuzzerStatus::Ready => 1,
            BuzzerStatus::Full => 2,
            BuzzerStatus::Unknown(other) => other,
        }
    }
}

/// Commands sent by the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingCommand {
    /// Absolute knob position (wraps at the i16 range).
    KnobEvent { position: i16 },
    /// Button state, 0 = released, 1 = pressed.
    ButtonEvent { state: u8 },
    BuzzerEvent { status: BuzzerStatus },
}

impl IncomingCommand {
    /// Interprets a validated frame.
    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        let payload = frame.payload();
        match frame.command_id() {
            CMD_KNOB_EVENT => {
                let bytes = exact::<2>(CMD_KNOB_EVENT, payload)?;
                Ok(IncomingCommand::KnobEvent {
                    position: i16::from_le_bytes(bytes),
                })
            }
            CMD_BUTTON_EVENT => {
                let [state] = exact::<1>(CMD_BUTTON_EVENT, payload)?;
                Ok(IncomingCommand::ButtonEvent { state })
            }
            CMD_BUZZER_EVENT => {
                let [status] = exact::<1>(CMD_BUZZER_EVENT, payload)?;
                Ok(IncomingCommand::BuzzerEvent {
                    status: BuzzerStatus::from_byte(status),
                })
            }
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }

    /// Encodes this command the way the peripheral would (for tests and
    /// simulation).
    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        match self {
            IncomingCommand::KnobEvent { position } => {
                Frame::build(CMD_KNOB_EVENT, &position.to_le_bytes())
            }
            IncomingCommand::ButtonEvent { state } => Frame::build(CMD_BUTTON_EVENT, &[*state]),
            IncomingCommand::BuzzerEvent { status } => {
                Frame::build(CMD_BUZZER_EVENT, &[status.to_byte()])
            }
        }
    }

    pub fn command_id(&self) -> u8 {
        match self {
            IncomingCommand::KnobEvent { .. } => CMD_KNOB_EVENT,
            IncomingCommand::ButtonEvent { .. } => CMD_BUTTON_EVENT,
            IncomingCommand::BuzzerEvent { .. } => CMD_BUZZER_EVENT,
        }
    }
}

/// A square-wave tone for the buzzer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub freq_hz: f64,
    pub duration: Duration,
}

impl Tone {
    pub const fn new(freq_hz: f64, duration: Duration) -> Self {
        Self { freq_hz, duration }
    }

    /// Number of full cycles to play, at least one.
    pub fn cycle_count(&self) -> u32 {
        let cycles = (self.freq_hz * self.duration.as_secs_f64()).floor();
        (cycles as u32).max(1)
    }

    /// Half of one cycle in microseconds (50% duty cycle).
    pub fn half_period_us(&self) -> Result<u16, ProtocolError> {
        if !self.freq_hz.is_finite() || self.freq_hz <= 0.0 {
            return Err(ProtocolError::InvalidTone(format!(
                "frequency must be positive, got {}",
                self.freq_hz
            )));
        }

        let half = (1_000_000.0 / self.freq_hz).floor() as u64 / 2;
        if half == 0 {
            return Err(ProtocolError::InvalidTone(format!(
                "frequency {} Hz is above 500 kHz",
                self.freq_hz
            )));
        }
        u16::try_from(half).map_err(|_| {
            ProtocolError::InvalidTone(format!(
                "frequency {} Hz is too low for a 16-bit half period",
                self.freq_hz
            ))
        })
    }
}

/// Commands sent by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingCommand {
    /// Replace the display contents with raw row bytes.
    DisplayText(Bytes),
    /// Start playback; `cancel_previous` drops whatever is still playing.
    BuzzerPlay { cancel_previous: bool },
    /// Append a tone to the peripheral's playback queue.
    BuzzerToneQueue {
        cycle_count: u32,
        half_period_high: u16,
        half_period_low: u16,
    },
}

impl OutgoingCommand {
    pub fn display_text(text: impl Into<Bytes>) -> Self {
        OutgoingCommand::DisplayText(text.into())
    }

    /// Builds a symmetric tone queue command.
    pub fn tone(tone: &Tone) -> Result<Self, ProtocolError> {
        let half_period = tone.half_period_us()?;
        Ok(OutgoingCommand::BuzzerToneQueue {
            cycle_count: tone.cycle_count(),
            half_period_high: half_period,
            half_period_low: half_period,
        })
    }

    pub fn command_id(&self) -> u8 {
        match self {
            OutgoingCommand::DisplayText(_) => CMD_DISPLAY_TEXT,
            OutgoingCommand::BuzzerPlay { .. } => CMD_BUZZER_PLAY,
            OutgoingCommand::BuzzerToneQueue { .. } => CMD_BUZZER_QUEUE,
        }
    }

    /// Encodes this command into a frame.
    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        match self {
            OutgoingCommand::DisplayText(text) => {
                if text.len() > MAX_DISPLAY_TEXT {
                    return Err(ProtocolError::FrameTooLarge {
                        size: text.len() + 6,
                        max: crate::frame::MESSAGE_MAX,
                    });
                }
                // Payload: [len][bytes...]
                let mut payload = Vec::with_capacity(text.len() + 1);
                payload.push(text.len() as u8);
                payload.extend_from_slice(text);
                Frame::build(CMD_DISPLAY_TEXT, &payload)
            }
            OutgoingCommand::BuzzerPlay { cancel_previous } => {
                Frame::build(CMD_BUZZER_PLAY, &[*cancel_previous as u8])
            }
            OutgoingCommand::BuzzerToneQueue {
                cycle_count,
                half_period_high,
                half_period_low,
            } => {
                // Payload: [8][cycles u32][high u16][low u16]
                let mut payload = [0u8; 9];
                payload[0] = BUZZER_QUEUE_PAYLOAD_LEN;
                payload[1..5].copy_from_slice(&cycle_count.to_le_bytes());
                payload[5..7].copy_from_slice(&half_period_high.to_le_bytes());
                payload[7..9].copy_from_slice(&half_period_low.to_le_bytes());
                Frame::build(CMD_BUZZER_QUEUE, &payload)
            }
        }
    }

    /// Interprets a frame the way the peripheral would (for tests and
    /// simulation).
    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        let payload = frame.payload();
        match frame.command_id() {
            CMD_DISPLAY_TEXT => {
                let (&len, text) = payload
                    .split_first()
                    .ok_or(ProtocolError::InvalidPayload {
                        command_id: CMD_DISPLAY_TEXT,
                        expected: 1,
                        actual: 0,
                    })?;
                if text.len() != len as usize {
                    return Err(ProtocolError::InvalidPayload {
                        command_id: CMD_DISPLAY_TEXT,
                        expected: len as usize + 1,
                        actual: payload.len(),
                    });
                }
                Ok(OutgoingCommand::DisplayText(Bytes::copy_from_slice(text)))
            }
            CMD_BUZZER_PLAY => {
                let [cancel] = exact::<1>(CMD_BUZZER_PLAY, payload)?;
                Ok(OutgoingCommand::BuzzerPlay {
                    cancel_previous: cancel != 0,
                })
            }
            CMD_BUZZER_QUEUE => {
                let bytes = exact::<9>(CMD_BUZZER_QUEUE, payload)?;
                if bytes[0] != BUZZER_QUEUE_PAYLOAD_LEN {
                    return Err(ProtocolError::InvalidFrame("bad tone queue length marker"));
                }
                Ok(OutgoingCommand::BuzzerToneQueue {
                    cycle_count: u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]),
                    half_period_high: u16::from_le_bytes([bytes[5], bytes[6]]),
                    half_period_low: u16::from_le_bytes([bytes[7], bytes[8]]),
                })
            }
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }
}

fn exact<const N: usize>(command_id: u8, payload: &[u8]) -> Result<[u8; N], ProtocolError> {
    payload
        .try_into()
        .map_err(|_| ProtocolError::InvalidPayload {
            command_id,
            expected: N,
            actual: payload.len(),
        })
}
