//! Command execution.

use crate::{Commands, EncodeCommand};
use colored::Colorize;
use serde::Serialize;
use std::time::{Duration, Instant};
use vindisplay_client::display::DisplaySurface;
use vindisplay_client::{Client, Dispatcher, KeyEvent, NullKeySink, Silent};
use vindisplay_protocol::message::{BUTTON_PRESSED, BUTTON_RELEASED};
use vindisplay_protocol::{crc16, crc16_bytes, Encoder, IncomingCommand, OutgoingCommand, Tone};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Runs commands that need no device. Returns `None` for everything else.
pub fn execute_offline(cmd: &Commands) -> CliResult<Option<String>> {
    match cmd {
        Commands::Crc { hex } => {
            let bytes = parse_hex(hex)?;
            Ok(Some(format!(
                "{} (wire: {})",
                format!("{:#06x}", crc16(&bytes)).green(),
                spaced_hex(&crc16_bytes(&bytes))
            )))
        }

        Commands::Encode { command } => Ok(Some(spaced_hex(&encode(command)?))),

        Commands::Ports => {
            let ports = vindisplay_client::transport::list_ports()?;
            if ports.is_empty() {
                return Ok(Some("No serial ports found".yellow().to_string()));
            }
            let mut output = String::new();
            for port in ports {
                output.push_str(&format!("  {} ({})\n", port.name.cyan(), port.kind));
            }
            Ok(Some(output.trim_end().to_string()))
        }

        _ => Ok(None),
    }
}

/// Executes a command against an open link and returns the formatted output.
pub async fn execute(client: &mut Client, cmd: Commands) -> CliResult<String> {
    match cmd {
        Commands::Text { lines } => {
            let mut display = client.display();
            for (y, line) in lines.iter().enumerate() {
                display.write_text(0, y, line.as_bytes());
            }
            display.flush()?;
            Ok(format!("{} {} line(s)", "Sent".green(), lines.len()))
        }

        Commands::Beep { freq, duration_ms } => {
            let tone = Tone::new(freq, Duration::from_millis(duration_ms));
            client.connection().beep(&tone)?;
            Ok(format!(
                "{} {} Hz for {} ms ({} cycles)",
                "Beeped".green(),
                freq,
                duration_ms,
                tone.cycle_count()
            ))
        }

        Commands::Play { cancel } => {
            client.connection().buzzer_play(cancel)?;
            Ok(format!("{} playback", "Started".green()))
        }

        Commands::Monitor { json, count } => monitor(client, json, count).await,

        Commands::Ports | Commands::Crc { .. } | Commands::Encode { .. } => {
            Err("offline command needs no device, use execute_offline".into())
        }
    }
}

#[derive(Serialize)]
struct MonitorRecord {
    elapsed_ms: u64,
    #[serde(flatten)]
    command: IncomingCommand,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<KeyEvent>,
}

async fn monitor(client: &mut Client, json: bool, count: Option<usize>) -> CliResult<String> {
    let mut rx = client
        .take_inbound()
        .ok_or("inbound channel already taken")?;
    // Watching only, never beep back.
    let mut dispatcher = Dispatcher::new(NullKeySink, Silent).with_config(client.config());
    let started = Instant::now();
    let mut seen = 0usize;

    eprintln!("{}", "Press Ctrl+C to stop...".dimmed());

    loop {
        if count.is_some_and(|n| seen >= n) {
            break;
        }

        tokio::select! {
            inbound = rx.recv() => {
                let Some(inbound) = inbound else {
                    eprintln!("{}", "Link closed".red());
                    break;
                };
                seen += 1;
                let elapsed = inbound.received_at.saturating_duration_since(started);

                match IncomingCommand::from_frame(&inbound.frame) {
                    Ok(command) => {
                        let key = dispatcher.handle(command, inbound.received_at)?;
                        if json {
                            let record = MonitorRecord {
                                elapsed_ms: elapsed.as_millis() as u64,
                                command,
                                key,
                            };
                            println!("{}", serde_json::to_string(&record)?);
                        } else {
                            println!("{}", format_report(elapsed, &command, key));
                        }
                    }
                    Err(e) => eprintln!("{}: {}", "Dropped frame".yellow(), e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    Ok(format!("{} frame(s)", seen).dimmed().to_string())
}

fn format_report(elapsed: Duration, command: &IncomingCommand, key: Option<KeyEvent>) -> String {
    let report = match command {
        IncomingCommand::KnobEvent { position } => {
            format!("{} position={}", "knob".cyan(), position)
        }
        IncomingCommand::ButtonEvent { state } => {
            let state = match *state {
                BUTTON_RELEASED => "released".to_string(),
                BUTTON_PRESSED => "pressed".to_string(),
                other => format!("state={}", other),
            };
            format!("{} {}", "button".cyan(), state)
        }
        IncomingCommand::BuzzerEvent { status } => {
            format!("{} {:?}", "buzzer".cyan(), status)
        }
    };

    let stamp = format!("{:>9.3}s", elapsed.as_secs_f64()).dimmed();
    match key {
        Some(key) => format!("{} {} -> {}", stamp, report, key.as_str().yellow().bold()),
        None => format!("{} {}", stamp, report),
    }
}

/// Lays lines out on the display grid and returns the DisplayText body.
fn text_body(lines: &[String]) -> Vec<u8> {
    let mut surface = DisplaySurface::new();
    for (y, line) in lines.iter().enumerate() {
        surface.write_text(0, y, line.as_bytes());
    }
    surface.take()
}

fn encode(cmd: &EncodeCommand) -> CliResult<Vec<u8>> {
    let bytes = match cmd {
        EncodeCommand::Text { lines } => {
            Encoder::encode(&OutgoingCommand::display_text(text_body(lines)))?.to_vec()
        }
        EncodeCommand::Beep { freq, duration_ms } => {
            let tone = Tone::new(*freq, Duration::from_millis(*duration_ms));
            Encoder::encode_beep(&tone)?.to_vec()
        }
        EncodeCommand::Play { cancel } => Encoder::encode(&OutgoingCommand::BuzzerPlay {
            cancel_previous: *cancel,
        })?
        .to_vec(),
    };
    Ok(bytes)
}

/// Parses hex bytes, ignoring whitespace and an optional `0x` prefix.
fn parse_hex(arg: &str) -> CliResult<Vec<u8>> {
    let compact: String = arg.split_whitespace().collect();
    let digits = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);
    Ok(hex::decode(digits)?)
}

fn spaced_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("07 0C 03 00").unwrap(), vec![7, 12, 3, 0]);
        assert_eq!(parse_hex("0x070c").unwrap(), vec![7, 12]);
        assert!(parse_hex("0g").is_err());
    }

    #[test]
    fn test_encode_play() {
        let bytes = encode(&EncodeCommand::Play { cancel: true }).unwrap();
        assert_eq!(spaced_hex(&bytes), "06 0E 01 64 73 7E");
    }

    #[test]
    fn test_encode_text_is_full_grid() {
        let bytes = encode(&EncodeCommand::Text {
            lines: vec!["a".to_string()],
        })
        .unwrap();
        // 40 grid bytes plus length prefix, header and trailer.
        assert_eq!(bytes.len(), 40 + 1 + 5);
        assert_eq!(bytes[3], b'a');
    }

    #[test]
    fn test_encode_invalid_beep() {
        assert!(encode(&EncodeCommand::Beep {
            freq: 0.0,
            duration_ms: 50
        })
        .is_err());
    }

    #[tokio::test]
    async fn test_execute_rejects_offline_command() {
        let mut client = Client::from_transport(
            std::io::Cursor::new(Vec::new()),
            Vec::<u8>::new(),
            vindisplay_client::Config::default(),
        )
        .unwrap();

        let err = execute(&mut client, Commands::Crc { hex: "00".into() })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("offline"));

        client.close();
        let _ = client.join_reader();
    }
}
