//! Incoming command dispatch.
//!
//! Frames are consumed strictly in arrival order. Knob positions are turned
//! into relative motion and button states into clicks by comparing each
//! report with the previous one.

use crate::config::Config;
use crate::connection::{Connection, Inbound};
use crate::error::ClientError;
use crate::events::{KeyEvent, KeySink, NullKeySink};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use vindisplay_protocol::message::{BUTTON_PRESSED, BUTTON_RELEASED};
use vindisplay_protocol::{BuzzerStatus, Frame, IncomingCommand, Tone};

/// Plays short confirmation tones.
pub trait Feedback: Send + Sync {
    fn beep(&self, tone: &Tone) -> Result<(), ClientError>;
}

impl Feedback for Connection {
    fn beep(&self, tone: &Tone) -> Result<(), ClientError> {
        Connection::beep(self, tone)
    }
}

impl<T: Feedback + ?Sized> Feedback for Arc<T> {
    fn beep(&self, tone: &Tone) -> Result<(), ClientError> {
        (**self).beep(tone)
    }
}

/// Plays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Feedback for Silent {
    fn beep(&self, _tone: &Tone) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Session state carried between input reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputState {
    pub last_knob_position: i16,
    pub last_knob_time: Option<Instant>,
    pub last_button_state: u8,
    pub last_button_time: Option<Instant>,
    /// Last reported buzzer queue status, if any.
    pub buzzer_status: Option<BuzzerStatus>,
}

/// Routes validated frames to their handlers.
pub struct Dispatcher {
    state: InputState,
    sink: Box<dyn KeySink>,
    feedback: Box<dyn Feedback>,
    long_click: Duration,
    knob_tone: Option<Tone>,
    click_tone: Option<Tone>,
}

impl Dispatcher {
    /// Creates a dispatcher with the default thresholds and tones.
    pub fn new(sink: impl KeySink + 'static, feedback: impl Feedback + 'static) -> Self {
        let defaults = Config::default();
        Self {
            state: InputState::default(),
            sink: Box::new(sink),
            feedback: Box::new(feedback),
            long_click: defaults.input.long_click(),
            knob_tone: Some(defaults.feedback.knob_tone()),
            click_tone: Some(defaults.feedback.click_tone()),
        }
    }

    /// A dispatcher that only tracks state.
    pub fn headless() -> Self {
        Self::new(NullKeySink, Silent)
    }

    /// Applies thresholds and tones from `config`.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.long_click = config.input.long_click();
        if config.feedback.enabled {
            self.knob_tone = Some(config.feedback.knob_tone());
            self.click_tone = Some(config.feedback.click_tone());
        } else {
            self.knob_tone = None;
            self.click_tone = None;
        }
        self
    }

    pub fn state(&self) -> &InputState {
        &self.state
    }

    /// Last status the buzzer reported.
    pub fn buzzer_status(&self) -> Option<BuzzerStatus> {
        self.state.buzzer_status
    }

    /// Interprets one frame received at `at`.
    ///
    /// Returns the key event it produced, if any. Unknown or malformed
    /// commands come back as `ClientError::Protocol`; state is left untouched.
    pub fn dispatch(&mut self, frame: &Frame, at: Instant) -> Result<Option<KeyEvent>, ClientError> {
        let command = IncomingCommand::from_frame(frame)?;
        self.handle(command, at)
    }

    /// Applies a decoded command.
    pub fn handle(
        &mut self,
        command: IncomingCommand,
        at: Instant,
    ) -> Result<Option<KeyEvent>, ClientError> {
        match command {
            IncomingCommand::KnobEvent { position } => self.on_knob(position, at),
            IncomingCommand::ButtonEvent { state } => self.on_button(state, at),
            IncomingCommand::BuzzerEvent { status } => {
                tracing::debug!(?status, "buzzer status");
                self.state.buzzer_status = Some(status);
                Ok(None)
            }
        }
    }

    fn on_knob(&mut self, position: i16, at: Instant) -> Result<Option<KeyEvent>, ClientError> {
        let diff = i32::from(position) - i32::from(self.state.last_knob_position);
        self.state.last_knob_position = position;
        self.state.last_knob_time = Some(at);
        tracing::debug!(position, diff, "knob position");

        let event = match diff.cmp(&0) {
            Ordering::Greater => KeyEvent::Down,
            Ordering::Less => KeyEvent::Up,
            Ordering::Equal => return Ok(None),
        };

        self.sink.key_event(event, at);
        if let Some(tone) = self.knob_tone {
            self.feedback.beep(&tone)?;
        }
        Ok(Some(event))
    }

    fn on_button(&mut self, state: u8, at: Instant) -> Result<Option<KeyEvent>, ClientError> {
        let previous = self.state.last_button_state;
        self.state.last_button_state = state;
        tracing::debug!(state, "button state");

        match (previous, state) {
            (BUTTON_RELEASED, BUTTON_PRESSED) => {
                self.state.last_button_time = Some(at);
                Ok(None)
            }
            (BUTTON_PRESSED, BUTTON_RELEASED) => {
                let held = self
                    .state
                    .last_button_time
                    .map(|pressed| at.saturating_duration_since(pressed))
                    .unwrap_or_default();

                if held >= self.long_click {
                    self.sink.key_event(KeyEvent::LongClick, at);
                    Ok(Some(KeyEvent::LongClick))
                } else {
                    self.sink.key_event(KeyEvent::Click, at);
                    if let Some(tone) = self.click_tone {
                        self.feedback.beep(&tone)?;
                    }
                    Ok(Some(KeyEvent::Click))
                }
            }
            _ => Ok(None),
        }
    }

    /// Dispatches frames until the channel closes.
    ///
    /// Protocol errors are logged and the frame skipped; a failed feedback
    /// write ends the loop.
    pub async fn run(&mut self, mut rx: mpsc::Receiver<Inbound>) -> Result<(), ClientError> {
        while let Some(inbound) = rx.recv().await {
            self.dispatch_logged(&inbound)?;
        }
        tracing::debug!("inbound channel closed");
        Ok(())
    }

    /// Dispatches every frame already queued on `rx` without waiting.
    ///
    /// Returns the number of frames consumed.
    pub fn drain(&mut self, rx: &mut mpsc::Receiver<Inbound>) -> Result<usize, ClientError> {
        let mut count = 0;
        while let Ok(inbound) = rx.try_recv() {
            count += 1;
            self.dispatch_logged(&inbound)?;
        }
        Ok(count)
    }

    fn dispatch_logged(&mut self, inbound: &Inbound) -> Result<(), ClientError> {
        match self.dispatch(&inbound.frame, inbound.received_at) {
            Ok(_) => Ok(()),
            Err(e) if !e.is_fatal() => {
                tracing::warn!(
                    command_id = inbound.frame.command_id(),
                    "dropping frame: {}",
                    e
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
