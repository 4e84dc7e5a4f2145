//! # vindisplay-client
//!
//! Host side of the vindisplay serial link.
//!
//! This crate provides:
//! - Serial transport and a write-locked connection
//! - A reader thread feeding validated frames into a channel
//! - Dispatch of knob, button and buzzer reports into key events
//! - Text staging for the 2 x 20 display
//! - Layered configuration (defaults, YAML, environment)

pub mod client;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod display;
pub mod error;
pub mod events;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::Client;
pub use config::{Config, ConfigError};
pub use connection::{Connection, Inbound};
pub use dispatcher::{Dispatcher, Feedback, InputState, Silent};
pub use display::{DisplaySurface, TextDisplay};
pub use error::ClientError;
pub use events::{BroadcastKeySink, KeyEvent, KeyNotification, KeySink, NullKeySink};
