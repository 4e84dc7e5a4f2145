//! High-level client API.

use crate::config::Config;
use crate::connection::{spawn_reader, Connection, Inbound, INBOUND_CHANNEL_CAPACITY};
use crate::dispatcher::Dispatcher;
use crate::display::TextDisplay;
use crate::error::ClientError;
use crate::events::KeySink;
use crate::transport::open_serial;
use std::io::{Read, Write};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;

/// A display link with its reader thread running.
pub struct Client {
    config: Config,
    connection: Arc<Connection>,
    inbound: Option<mpsc::Receiver<Inbound>>,
    reader: Option<JoinHandle<Result<(), ClientError>>>,
}

impl Client {
    /// Opens the configured serial device and starts reading.
    pub fn open(config: Config) -> Result<Self, ClientError> {
        config.validate()?;
        let (reader, writer) = open_serial(&config.link)?;
        Self::from_transport(reader, writer, config)
    }

    /// Wraps an already open reader/writer pair.
    pub fn from_transport<R, W>(reader: R, writer: W, config: Config) -> Result<Self, ClientError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let connection = Arc::new(Connection::new(writer));
        let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let handle = spawn_reader(
            reader,
            connection.clone(),
            config.link.read_buffer_len(),
            tx,
        )?;

        Ok(Self {
            config,
            connection,
            inbound: Some(rx),
            reader: Some(handle),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn connection(&self) -> Arc<Connection> {
        self.connection.clone()
    }

    /// Takes the inbound frame channel. Returns `None` after the first call.
    pub fn take_inbound(&mut self) -> Option<mpsc::Receiver<Inbound>> {
        self.inbound.take()
    }

    /// Creates a dispatcher delivering events to `sink` and feedback tones to
    /// this link.
    pub fn dispatcher(&self, sink: impl KeySink + 'static) -> Dispatcher {
        Dispatcher::new(sink, self.connection.clone()).with_config(&self.config)
    }

    pub fn display(&self) -> TextDisplay {
        TextDisplay::new(self.connection.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Closes the write half; the reader thread stops at its next read timeout.
    pub fn close(&self) {
        self.connection.close();
    }

    /// Waits for the reader thread to finish and returns how it ended.
    pub fn join_reader(&mut self) -> Result<(), ClientError> {
        match self.reader.take() {
            Some(handle) => handle.join().map_err(|_| ClientError::ReaderPanicked)?,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Silent;
    use crate::events::{BroadcastKeySink, KeyEvent};
    use crate::testing::{RecordingFeedback, SharedWriter};
    use std::io::Cursor;
    use std::time::Duration;
    use vindisplay_protocol::{Decoder, IncomingCommand, OutgoingCommand, Tone};

    fn peripheral_stream(commands: &[IncomingCommand]) -> Vec<u8> {
        let mut data = Vec::new();
        for command in commands {
            data.push(0x7E);
            data.extend_from_slice(command.to_frame().unwrap().as_bytes());
        }
        data
    }

    #[test]
    fn test_events_from_transport() {
        let data = peripheral_stream(&[
            IncomingCommand::KnobEvent { position: 2 },
            IncomingCommand::ButtonEvent { state: 1 },
            IncomingCommand::ButtonEvent { state: 0 },
            IncomingCommand::KnobEvent { position: -1 },
        ]);
        let mut client =
            Client::from_transport(Cursor::new(data), SharedWriter::new(), Config::default())
                .unwrap();
        let mut rx = client.take_inbound().unwrap();
        assert!(client.take_inbound().is_none());

        assert!(matches!(
            client.join_reader(),
            Err(ClientError::ConnectionClosed)
        ));
        assert!(!client.is_connected());

        let sink = BroadcastKeySink::new(16);
        let mut events = sink.subscribe();
        let feedback = RecordingFeedback::default();
        let mut dispatcher = Dispatcher::new(sink, feedback.clone());
        assert_eq!(dispatcher.drain(&mut rx).unwrap(), 4);

        let mut seen = Vec::new();
        while let Ok(note) = events.try_recv() {
            seen.push(note.event);
        }
        // Press and release arrive in the same read, well under a second apart.
        assert_eq!(seen, vec![KeyEvent::Down, KeyEvent::Click, KeyEvent::Up]);
        assert_eq!(feedback.tones().len(), 3);
    }

    #[test]
    fn test_feedback_goes_to_link() {
        let writer = SharedWriter::new();
        let client = Client::from_transport(
            crate::testing::IdleReader,
            writer.clone(),
            Config::default(),
        )
        .unwrap();

        let mut dispatcher = client.dispatcher(crate::events::NullKeySink);
        dispatcher
            .handle(
                IncomingCommand::KnobEvent { position: 1 },
                std::time::Instant::now(),
            )
            .unwrap();

        let mut decoder = Decoder::new();
        decoder.extend(&writer.contents());
        let frames = decoder.decode_all();
        assert_eq!(frames.len(), 2);
        assert_eq!(
            OutgoingCommand::from_frame(&frames[0]).unwrap(),
            OutgoingCommand::tone(&Tone::new(1000.0, Duration::from_millis(50))).unwrap()
        );

        client.close();
    }

    #[test]
    fn test_close_stops_reader() {
        let mut client = Client::from_transport(
            crate::testing::IdleReader,
            SharedWriter::new(),
            Config::default(),
        )
        .unwrap();
        client.close();
        assert!(client.join_reader().is_ok());
        assert!(client.join_reader().is_ok());
    }

    #[test]
    fn test_display_flush() {
        let writer = SharedWriter::new();
        let client = Client::from_transport(
            crate::testing::IdleReader,
            writer.clone(),
            Config::default(),
        )
        .unwrap();

        let mut display = client.display();
        display.write_text(0, 0, b"ok");
        display.flush().unwrap();
        assert_eq!(client.connection().frames_sent(), 1);
        assert_eq!(writer.contents()[1], 10);

        client.close();
    }

    #[test]
    fn test_headless_dispatch_without_link() {
        let mut dispatcher = Dispatcher::new(crate::events::NullKeySink, Silent);
        let event = dispatcher
            .handle(
                IncomingCommand::KnobEvent { position: 9 },
                std::time::Instant::now(),
            )
            .unwrap();
        assert_eq!(event, Some(KeyEvent::Down));
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let mut config = Config::default();
        config.link.device = String::new();
        assert!(matches!(Client::open(config), Err(ClientError::Config(_))));
    }
}
