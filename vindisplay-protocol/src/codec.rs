//! Stream decoder and command encoder.

use crate::crc::crc16;
use crate::error::ProtocolError;
use crate::frame::{Frame, MESSAGE_MAX, MESSAGE_MIN, MESSAGE_SYNC, MESSAGE_TRAILER_SIZE};
use crate::message::{OutgoingCommand, Tone};
use bytes::{Bytes, BytesMut};

/// Consumed bytes are only shifted out of the arena once the read cursor has
/// moved past this many bytes.
pub const COMPACT_THRESHOLD: usize = 4096;

/// Counters kept by a [`Decoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames emitted.
    pub frames: u64,
    /// Candidates whose length and sync looked right but whose CRC failed.
    pub crc_errors: u64,
    /// Bytes dropped while resynchronizing (sync separators included).
    pub discarded: u64,
}

/// Extracts validated frames from a noisy byte stream.
///
/// Bytes are appended at the tail of a single arena and consumed from a read
/// cursor. Whenever the head of the pending data cannot start a valid frame
/// the decoder slides forward by exactly one byte, so a frame that overlaps
/// corrupted data is still found once the corruption has been passed.
pub struct Decoder {
    buffer: Vec<u8>,
    pos: usize,
    stats: DecoderStats,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MESSAGE_MAX * 4),
            pos: 0,
            stats: DecoderStats::default(),
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.compact();
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next frame from the buffer.
    ///
    /// Returns `Ok(None)` when more input is needed. A CRC mismatch is
    /// returned as an error after the offending head byte has already been
    /// dropped; calling again resumes scanning.
    pub fn decode_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        loop {
            let available = self.buffered();
            if available < MESSAGE_MIN {
                return Ok(None);
            }

            let head = self.buffer[self.pos];
            if head == MESSAGE_SYNC {
                self.skip();
                continue;
            }

            let length = head as usize;
            if !(MESSAGE_MIN..=MESSAGE_MAX).contains(&length) {
                self.skip();
                continue;
            }

            if available < length {
                return Ok(None);
            }

            let candidate = &self.buffer[self.pos..self.pos + length];
            if candidate[length - 1] != MESSAGE_SYNC {
                self.skip();
                continue;
            }

            let crc_offset = length - MESSAGE_TRAILER_SIZE;
            let expected = u16::from_be_bytes([candidate[crc_offset], candidate[crc_offset + 1]]);
            let actual = crc16(&candidate[..crc_offset]);
            if expected != actual {
                self.stats.crc_errors += 1;
                self.skip();
                return Err(ProtocolError::CrcMismatch { expected, actual });
            }

            let frame = Frame::from_validated(Bytes::copy_from_slice(candidate));
            self.pos += length;
            self.stats.frames += 1;
            return Ok(Some(frame));
        }
    }

    /// Decodes every frame currently available, logging and skipping CRC
    /// errors.
    pub fn decode_all(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        loop {
            match self.decode_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(e) => tracing::warn!("dropping corrupted frame candidate: {}", e),
            }
        }
        frames
    }

    /// Returns the number of bytes not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buffer.len() - self.pos
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Clears the internal buffer (statistics are kept).
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pos = 0;
    }

    fn skip(&mut self) {
        self.pos += 1;
        self.stats.discarded += 1;
    }

    fn compact(&mut self) {
        if self.pos == self.buffer.len() {
            self.buffer.clear();
            self.pos = 0;
        } else if self.pos >= COMPACT_THRESHOLD {
            self.buffer.drain(..self.pos);
            self.pos = 0;
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes outgoing commands into wire bytes.
pub struct Encoder;

impl Encoder {
    /// Encodes a single command.
    pub fn encode(command: &OutgoingCommand) -> Result<Bytes, ProtocolError> {
        Ok(command.to_frame()?.into_bytes())
    }

    /// Encodes a tone followed by a cancelling play command, so the new tone
    /// preempts anything still queued on the peripheral.
    pub fn encode_beep(tone: &Tone) -> Result<BytesMut, ProtocolError> {
        let queue = OutgoingCommand::tone(tone)?.to_frame()?;
        let play = OutgoingCommand::BuzzerPlay {
            cancel_previous: true,
        }
        .to_frame()?;

        let mut buf = BytesMut::with_capacity(queue.as_bytes().len() + play.as_bytes().len());
        buf.extend_from_slice(queue.as_bytes());
        buf.extend_from_slice(play.as_bytes());
        Ok(buf)
    }
}
