//! vindisplay - serial display daemon
//!
//! Drives a knob/button/buzzer text display over a serial link and reports
//! key events.

use std::time::Instant;
use tracing_subscriber::EnvFilter;
use vindisplay_client::{Client, Config, KeyEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if VINDISPLAY_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var("VINDISPLAY_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            // If a config file was explicitly specified, fail on error
            if std::env::var("VINDISPLAY_CONFIG").is_ok() {
                tracing::error!("Failed to load config: {}", e);
                return Err(e.into());
            }
            tracing::info!("Using default configuration");
            Config::default()
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        return Err(e.into());
    }

    tracing::info!("Starting vindisplay");
    tracing::info!("  Device: {}", config.link.device);
    tracing::info!("  Baud rate: {}", config.link.baud_rate);
    tracing::info!("  Long click: {} ms", config.input.long_click_ms);
    if config.feedback.enabled {
        tracing::info!(
            "  Feedback: enabled (knob {} Hz, click {} Hz, {} ms)",
            config.feedback.knob_tone_hz,
            config.feedback.click_tone_hz,
            config.feedback.tone_ms
        );
    } else {
        tracing::info!("  Feedback: disabled");
    }

    let mut client = Client::open(config)?;

    // Greeting
    let mut display = client.display();
    display.write_text(0, 0, b"vindisplay");
    display.write_text(0, 1, concat!("v", env!("CARGO_PKG_VERSION")).as_bytes());
    if let Err(e) = display.flush() {
        tracing::warn!("Failed to show greeting: {}", e);
    }

    let rx = client
        .take_inbound()
        .ok_or("inbound channel already taken")?;
    let mut dispatcher = client.dispatcher(|event: KeyEvent, _at: Instant| {
        tracing::info!(event = %event, "key event");
    });

    let mut dispatch_handle = tokio::spawn(async move { dispatcher.run(rx).await });

    tokio::select! {
        result = &mut dispatch_handle => {
            match result {
                Ok(Ok(())) => tracing::warn!("Link closed, stopping..."),
                Ok(Err(e)) => tracing::error!("Dispatcher failed: {}", e),
                Err(e) => tracing::error!("Dispatcher task failed: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping...");
        }
    }

    client.close();
    dispatch_handle.abort();

    // The reader notices the close at its next read timeout
    if let Err(e) = tokio::task::spawn_blocking(move || client.join_reader()).await? {
        tracing::debug!("Reader ended: {}", e);
    }

    tracing::info!("vindisplay stopped");
    Ok(())
}
