//! JSON-lines transport over stdin/stdout
//!
//! Each input line is either a server event (`{"event": ...}`) or a UI
//! command (`{"command": ...}`). Outbound messages are written one per line.

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::command::UiCommand;
use super::subscription::Subscription;
use crate::error::ProtocolError;
use crate::protocol::{OutboundMessage, TransportEvent};

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InputLine {
    Command(UiCommand),
    Transport(TransportEvent),
}

impl InputLine {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(line)?)
    }
}

/// Read lines from stdin, routing events and commands to their channels.
/// Malformed lines are logged and skipped. Dropping the transport sender on
/// EOF ends the session.
pub fn spawn_stdin_reader(
    transport: mpsc::UnboundedSender<TransportEvent>,
    commands: mpsc::UnboundedSender<UiCommand>,
) -> Subscription {
    let handle = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("stdin read error: {}", e);
                    break;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let sent = match InputLine::parse(line) {
                Ok(InputLine::Command(command)) => commands.send(command).is_ok(),
                Ok(InputLine::Transport(event)) => transport.send(event).is_ok(),
                Err(e) => {
                    tracing::warn!("Skipping input line: {}", e);
                    true
                }
            };
            if !sent {
                break;
            }
        }
        tracing::debug!("stdin reader finished");
    });
    Subscription::new("stdin reader", handle)
}

/// Write outbound messages to stdout as JSON lines. The task ends once every
/// sender is dropped, after the queue is drained.
pub fn spawn_stdout_writer(mut outbound: mpsc::UnboundedReceiver<OutboundMessage>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(message) = outbound.recv().await {
            let line = match message.to_json() {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("Dropping outbound message: {}", e);
                    continue;
                }
            };
            if let Err(e) = stdout.write_all(format!("{}\n", line).as_bytes()).await {
                tracing::error!("stdout write error: {}", e);
                break;
            }
            if let Err(e) = stdout.flush().await {
                tracing::error!("stdout flush error: {}", e);
                break;
            }
        }
    })
}
