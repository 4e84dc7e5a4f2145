//! In-memory stand-ins for the serial link.

use crate::dispatcher::Feedback;
use crate::error::ClientError;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use vindisplay_protocol::Tone;

/// A writer whose output can be inspected from another handle.
#[derive(Clone, Default)]
pub struct SharedWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().clone()
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A writer that fails every call.
pub struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "device unplugged",
        ))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Records every tone instead of playing it.
#[derive(Clone, Default)]
pub struct RecordingFeedback {
    tones: Arc<Mutex<Vec<Tone>>>,
}

impl RecordingFeedback {
    pub fn tones(&self) -> Vec<Tone> {
        self.tones.lock().clone()
    }
}

impl Feedback for RecordingFeedback {
    fn beep(&self, tone: &Tone) -> Result<(), ClientError> {
        self.tones.lock().push(*tone);
        Ok(())
    }
}

/// A reader that never delivers data, like an idle serial port.
pub struct IdleReader;

impl std::io::Read for IdleReader {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        std::thread::sleep(std::time::Duration::from_millis(5));
        Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "operation timed out",
        ))
    }
}
