//! vindisplay-cli - Command-line interface for vindisplay
//!
//! Sends one-shot commands to a display, watches its input, and encodes or
//! checks frames offline.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vindisplay_client::{Client, Config};

#[derive(Parser)]
#[command(name = "vindisplay-cli")]
#[command(about = "Command-line interface for the vindisplay serial display")]
#[command(version)]
struct Cli {
    /// Serial device (overrides config and VINDISPLAY_DEVICE)
    #[arg(short, long)]
    device: Option<String>,

    /// Line speed (overrides config and VINDISPLAY_BAUD)
    #[arg(short, long)]
    baud: Option<u32>,

    /// YAML config file
    #[arg(short, long, env = "VINDISPLAY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show up to two lines of text
    Text {
        /// Lines, top to bottom
        #[arg(required = true, num_args = 1..=2)]
        lines: Vec<String>,
    },

    /// Queue a tone and play it immediately
    Beep {
        /// Frequency in Hz
        #[arg(short, long, default_value = "1000")]
        freq: f64,

        /// Length in milliseconds
        #[arg(short = 'm', long, default_value = "50")]
        duration_ms: u64,
    },

    /// Start playback of queued tones
    Play {
        /// Drop whatever is still playing
        #[arg(long)]
        cancel: bool,
    },

    /// Print incoming reports and the key events they produce
    Monitor {
        /// One JSON object per line
        #[arg(long)]
        json: bool,

        /// Stop after this many frames
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// List serial ports
    Ports,

    /// Compute the frame check value of hex bytes
    Crc {
        /// Bytes as hex, whitespace allowed
        hex: String,
    },

    /// Print the wire bytes of a command without a device
    Encode {
        #[command(subcommand)]
        command: EncodeCommand,
    },
}

#[derive(Subcommand)]
pub enum EncodeCommand {
    /// DisplayText frame
    Text {
        #[arg(required = true, num_args = 1..=2)]
        lines: Vec<String>,
    },

    /// BuzzerToneQueue followed by BuzzerPlay
    Beep {
        #[arg(short, long, default_value = "1000")]
        freq: f64,

        #[arg(short = 'm', long, default_value = "50")]
        duration_ms: u64,
    },

    /// BuzzerPlay frame
    Play {
        #[arg(long)]
        cancel: bool,
    },
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::from_env(),
    };
    if let Some(device) = &cli.device {
        config.link.device = device.clone();
    }
    if let Some(baud) = cli.baud {
        config.link.baud_rate = baud;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Offline commands need no device
    if let Some(output) = commands::execute_offline(&cli.command)? {
        println!("{}", output);
        return Ok(());
    }

    let config = load_config(&cli)?;
    let device = config.link.device.clone();
    let mut client = Client::open(config).map_err(|e| {
        eprintln!("{} {}: {}", "Cannot open".red(), device.cyan(), e);
        e
    })?;

    let result = commands::execute(&mut client, cli.command).await;
    client.close();

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}
