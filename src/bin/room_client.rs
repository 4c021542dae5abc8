//! Headless Room Client
//!
//! Reads server events and UI commands as JSON lines on stdin, writes
//! outbound messages as JSON lines on stdout and plays through a simulated
//! media element.
//!
//! Usage: room-client [ROOM_CODE] [--config PATH] [--mobile] [--require-gesture]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use room_sync_client::{
    config::{AppConfig, DeviceClass},
    player::{SimulatedConfig, SimulatedElement},
    session::{spawn_stdin_reader, spawn_stdout_writer, RoomSession, Subscription, UiCommand},
};

/// Headless client for a synchronized listening room
#[derive(Parser, Debug)]
#[command(name = "room-client", about = "Headless synchronized listening room client", version)]
struct Args {
    /// Room to join, overrides the configured code
    room_code: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use mobile sync tuning
    #[arg(long)]
    mobile: bool,

    /// Block playback until a resume command arrives
    #[arg(long)]
    require_gesture: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries the protocol
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting room client");

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::load_or_default()?,
    };
    if let Some(room_code) = args.room_code {
        config.room.room_code = room_code;
    }
    if args.mobile {
        config.sync.device_class = DeviceClass::Mobile;
    }

    let (element, element_rx) = SimulatedElement::new(SimulatedConfig {
        require_gesture: args.require_gesture,
        ..Default::default()
    });
    let gesture = element.control();

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (transport_tx, transport_rx) = mpsc::unbounded_channel();
    let (input_tx, mut input_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let mut session = RoomSession::new(&config, element, outbound_tx)?;
    let writer = spawn_stdout_writer(outbound_rx);
    session.attach(spawn_stdin_reader(transport_tx, input_tx));

    // A resume command stands in for the user's tap
    let forwarder = tokio::spawn(async move {
        while let Some(command) = input_rx.recv().await {
            if command == UiCommand::Resume {
                gesture.grant_gesture();
            }
            if command_tx.send(command).is_err() {
                break;
            }
        }
    });
    session.attach(Subscription::new("command forwarder", forwarder));

    tracing::info!("Room '{}' via {}", config.room.room_code, config.room.server_url);

    session.run(transport_rx, element_rx, command_rx).await?;

    // Session dropped its sender; let the leave message reach stdout
    if let Err(e) = writer.await {
        tracing::warn!("stdout writer failed: {}", e);
    }

    tracing::info!("Room client stopped");
    Ok(())
}
