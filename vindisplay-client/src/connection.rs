//! Connection management.
//!
//! A [`Connection`] owns the write half of the link behind a single lock so
//! concurrent callers never interleave bytes of two frames. The read half is
//! driven by [`read_loop`] on a dedicated thread that hands validated frames
//! to a channel.

use crate::error::ClientError;
use crate::transport::BoxedWriter;
use parking_lot::Mutex;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::mpsc;
use vindisplay_protocol::{Decoder, Encoder, Frame, OutgoingCommand, Tone};

/// Capacity of the inbound frame channel.
pub const INBOUND_CHANNEL_CAPACITY: usize = 256;

/// A validated frame and the time its bytes were read.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub frame: Frame,
    pub received_at: Instant,
}

/// Write side of a display link.
pub struct Connection {
    writer: Mutex<Option<BoxedWriter>>,
    connected: AtomicBool,
    frames_sent: AtomicU64,
}

impl Connection {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Some(Box::new(writer))),
            connected: AtomicBool::new(true),
            frames_sent: AtomicU64::new(0),
        }
    }

    /// Encodes and writes a single command.
    pub fn send(&self, command: &OutgoingCommand) -> Result<(), ClientError> {
        let bytes = Encoder::encode(command)?;
        self.write_frames(&bytes, 1)
    }

    /// Replaces the display contents.
    pub fn display_text(&self, text: &[u8]) -> Result<(), ClientError> {
        self.send(&OutgoingCommand::display_text(text.to_vec()))
    }

    pub fn buzzer_play(&self, cancel_previous: bool) -> Result<(), ClientError> {
        self.send(&OutgoingCommand::BuzzerPlay { cancel_previous })
    }

    /// Appends a tone to the buzzer queue without starting playback.
    pub fn buzzer_queue(&self, tone: &Tone) -> Result<(), ClientError> {
        self.send(&OutgoingCommand::tone(tone)?)
    }

    /// Queues `tone` and starts playback, cancelling whatever is still playing.
    ///
    /// Both frames go out under one lock hold.
    pub fn beep(&self, tone: &Tone) -> Result<(), ClientError> {
        let bytes = Encoder::encode_beep(tone)?;
        self.write_frames(&bytes, 2)
    }

    fn write_frames(&self, bytes: &[u8], frames: u64) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let mut guard = self.writer.lock();
        let writer = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let result = writer.write_all(bytes).and_then(|_| writer.flush());
        if let Err(e) = result {
            tracing::error!("write failed: {}", e);
            *guard = None;
            self.connected.store(false, Ordering::SeqCst);
            return Err(ClientError::Io(e));
        }

        self.frames_sent.fetch_add(frames, Ordering::Relaxed);
        tracing::trace!(len = bytes.len(), frames, "frames written");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of frames written so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Drops the write half. The reader thread stops at its next timeout.
    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.writer.lock().take();
    }

    pub(crate) fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// Reads from `reader` until the link ends, forwarding every validated frame.
///
/// Read timeouts and interrupts are retried. Returns `Ok(())` when the
/// connection was closed locally or the receiver was dropped, and
/// `ConnectionClosed` on end of stream.
pub fn read_loop<R: Read>(
    mut reader: R,
    connection: &Connection,
    buffer_size: usize,
    tx: &mpsc::Sender<Inbound>,
) -> Result<(), ClientError> {
    let mut decoder = Decoder::new();
    let mut buf = vec![0u8; buffer_size];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Err(ClientError::ConnectionClosed),
            Ok(n) => n,
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::WouldBlock
                ) =>
            {
                if !connection.is_connected() || tx.is_closed() {
                    return Ok(());
                }
                continue;
            }
            Err(e) => return Err(ClientError::Io(e)),
        };

        let received_at = Instant::now();
        decoder.extend(&buf[..n]);

        for frame in decoder.decode_all() {
            tracing::trace!(command_id = frame.command_id(), len = frame.length(), "frame decoded");
            if tx.blocking_send(Inbound { frame, received_at }).is_err() {
                tracing::debug!("inbound receiver dropped, stopping reader");
                return Ok(());
            }
        }
    }
}

/// Starts [`read_loop`] on a named thread.
///
/// The connection is marked disconnected when the loop ends, whatever the
/// reason.
pub fn spawn_reader<R: Read + Send + 'static>(
    reader: R,
    connection: Arc<Connection>,
    buffer_size: usize,
    tx: mpsc::Sender<Inbound>,
) -> Result<JoinHandle<Result<(), ClientError>>, ClientError> {
    let handle = std::thread::Builder::new()
        .name("vindisplay-reader".to_string())
        .spawn(move || {
            tracing::debug!(buffer_size, "reader started");
            let result = read_loop(reader, &connection, buffer_size, &tx);
            connection.mark_disconnected();
            match &result {
                Ok(()) => tracing::debug!("reader stopped"),
                Err(ClientError::ConnectionClosed) => tracing::info!("link closed by peer"),
                Err(e) => tracing::error!("reader failed: {}", e),
            }
            result
        })?;
    Ok(handle)
}
