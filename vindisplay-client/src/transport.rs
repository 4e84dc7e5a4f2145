//! Byte transports.
//!
//! The link is split into an owned read half (driven by the reader thread)
//! and an owned write half (shared behind the connection's write lock).

use crate::config::LinkConfig;
use crate::error::ClientError;
use serde::Serialize;
use std::io::{Read, Write};

pub type BoxedReader = Box<dyn Read + Send>;
pub type BoxedWriter = Box<dyn Write + Send>;

/// Opens the serial device named in `config`.
///
/// The port timeout is the configured write timeout. Reads that hit it are
/// retried by the reader loop, so reads are effectively unbounded.
pub fn open_serial(config: &LinkConfig) -> Result<(BoxedReader, BoxedWriter), ClientError> {
    let port = serialport::new(config.device.as_str(), config.baud_rate)
        .timeout(config.write_timeout())
        .open()?;
    let reader = port.try_clone()?;

    tracing::info!(
        device = %config.device,
        baud_rate = config.baud_rate,
        "serial link opened"
    );

    Ok((Box::new(reader), Box::new(port)))
}

/// A serial port visible to the host.
#[derive(Debug, Clone, Serialize)]
pub struct PortInfo {
    pub name: String,
    pub kind: String,
}

/// Lists serial ports present on this host.
pub fn list_ports() -> Result<Vec<PortInfo>, ClientError> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| PortInfo {
            kind: port_kind(&p.port_type).to_string(),
            name: p.port_name,
        })
        .collect())
}

fn port_kind(port_type: &serialport::SerialPortType) -> &'static str {
    match port_type {
        serialport::SerialPortType::UsbPort(_) => "usb",
        serialport::SerialPortType::PciPort => "pci",
        serialport::SerialPortType::BluetoothPort => "bluetooth",
        serialport::SerialPortType::Unknown => "unknown",
    }
}
