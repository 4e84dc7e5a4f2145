//! Key events delivered to the UI layer.

use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tokio::sync::broadcast;

/// Semantic input event derived from knob and button reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEvent {
    /// Knob turned towards lower positions.
    Up,
    /// Knob turned towards higher positions.
    Down,
    /// Button released before the long-click threshold.
    Click,
    /// Button held for at least the long-click threshold.
    LongClick,
}

impl KeyEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyEvent::Up => "up",
            KeyEvent::Down => "down",
            KeyEvent::Click => "click",
            KeyEvent::LongClick => "long_click",
        }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives key events as they are derived.
pub trait KeySink: Send {
    fn key_event(&mut self, event: KeyEvent, at: Instant);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullKeySink;

impl KeySink for NullKeySink {
    fn key_event(&mut self, _event: KeyEvent, _at: Instant) {}
}

impl<F> KeySink for F
where
    F: FnMut(KeyEvent, Instant) + Send,
{
    fn key_event(&mut self, event: KeyEvent, at: Instant) {
        (*self)(event, at)
    }
}

/// A key event as seen by broadcast subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyNotification {
    pub event: KeyEvent,
    pub at: Instant,
}

/// Fans key events out to any number of subscribers.
///
/// Events are dropped when nobody is subscribed; slow subscribers see
/// `RecvError::Lagged` as usual for broadcast channels.
#[derive(Debug, Clone)]
pub struct BroadcastKeySink {
    tx: broadcast::Sender<KeyNotification>,
}

impl BroadcastKeySink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<KeyNotification> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastKeySink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl KeySink for BroadcastKeySink {
    fn key_event(&mut self, event: KeyEvent, at: Instant) {
        let _ = self.tx.send(KeyNotification { event, at });
    }
}
