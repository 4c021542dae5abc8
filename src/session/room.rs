//! Room session
//!
//! Single-threaded event loop tying the transport, the media element and the
//! UI to the reconciler. Inbound snapshots flow through the normalizer into
//! the reconciler; user controls go out as intents and only take effect once
//! the room echoes them back.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::command::UiCommand;
use super::subscription::{Subscription, SubscriptionSet};
use crate::config::AppConfig;
use crate::error::{Error, PlaybackError, ProtocolError, Result};
use crate::player::{DragCommit, ElementEvent, MediaElement, PlayerWatch, Reconciler, ReconcilerSignal, Tick};
use crate::protocol::{ConnectivityEvent, ControlAction, InboundEvent, OutboundMessage, RoomUser, TransportEvent};
use crate::queue::{MediaUrlResolver, QueueManager};
use crate::sync::normalize;

pub struct RoomSession<E: MediaElement> {
    room_code: String,
    user: RoomUser,
    reconciler: Reconciler<E>,
    queue: QueueManager,
    outbound: mpsc::UnboundedSender<OutboundMessage>,
    backup_sync_delay: Duration,
    backup_sync_at: Option<Instant>,
    connected: bool,
    joined: bool,
    left: bool,
    tasks: SubscriptionSet,
}

impl<E: MediaElement> RoomSession<E> {
    pub fn new(config: &AppConfig, element: E, outbound: mpsc::UnboundedSender<OutboundMessage>) -> Result<Self> {
        let tuning = config.sync.tuning();
        tuning.validate()?;

        let user = RoomUser {
            id: config.user_id(),
            name: config.room.user_name.clone(),
            is_host: false,
        };

        tracing::info!(
            "Session for room '{}' as {} ({:?} tuning)",
            config.room.room_code,
            user.id,
            config.sync.device_class
        );

        Ok(Self {
            room_code: config.room.room_code.clone(),
            user,
            backup_sync_delay: tuning.backup_sync_delay,
            reconciler: Reconciler::new(element, tuning),
            queue: QueueManager::new(MediaUrlResolver::new(config.room.server_url.as_str())),
            outbound,
            backup_sync_at: None,
            connected: false,
            joined: false,
            left: false,
            tasks: SubscriptionSet::new(),
        })
    }

    pub fn watch(&self) -> PlayerWatch {
        self.reconciler.watch()
    }

    pub fn reconciler(&self) -> &Reconciler<E> {
        &self.reconciler
    }

    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Keep a background task alive for the lifetime of the session
    pub fn attach(&mut self, subscription: Subscription) {
        self.tasks.push(subscription);
    }

    /// Earliest pending timer
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.backup_sync_at, self.reconciler.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn handle_transport(&mut self, event: TransportEvent, tick: Tick) {
        match event {
            TransportEvent::Inbound(event) => self.handle_inbound(event, tick),
            TransportEvent::Connectivity(event) => self.handle_connectivity(event, tick),
        }
    }

    pub fn handle_connectivity(&mut self, event: ConnectivityEvent, tick: Tick) {
        match event {
            ConnectivityEvent::Connect => {
                tracing::info!("Connected");
                self.connected = true;
                if self.room_code.is_empty() {
                    tracing::warn!("No room configured, not joining");
                    return;
                }

                let join = OutboundMessage::JoinRoom {
                    room_code: self.room_code.clone(),
                    user: self.user.clone(),
                };
                if self.send(join).is_ok() {
                    self.joined = true;
                }
                self.request_sync();
                // The immediate request can race the join on the server
                self.backup_sync_at = Some(tick.at + self.backup_sync_delay);
            }
            ConnectivityEvent::Disconnect { reason } => {
                tracing::warn!("Disconnected: {}", reason);
                self.connected = false;
                self.backup_sync_at = None;
            }
        }
    }

    pub fn handle_inbound(&mut self, event: InboundEvent, tick: Tick) {
        match event {
            InboundEvent::MusicState(raw) => {
                let snapshot = normalize(raw, &mut self.queue);
                self.reconciler.apply(snapshot, tick);
            }
            InboundEvent::QueueUpdated(update) => {
                let resolution = self.queue.update_from_wire(&update.queue, update.current_track_index);
                self.reconciler.on_queue_changed(&resolution);
            }
            InboundEvent::QueueItemProgress {
                queue_item_id,
                progress,
                status,
            } => {
                self.queue.apply_item_progress(&queue_item_id, progress, &status);
            }
            InboundEvent::QueueItemComplete {
                queue_item_id,
                mp3_url,
                status,
            } => {
                if self.queue.apply_item_complete(&queue_item_id, &mp3_url, &status) {
                    tracing::info!("Queue item {} ready", queue_item_id);
                }
            }
            InboundEvent::QueueItemError {
                queue_item_id,
                error,
                status,
            } => {
                self.queue.apply_item_error(&queue_item_id, &error, &status);
            }
            InboundEvent::Error { message } => {
                tracing::warn!("Server error: {}", message);
            }
        }
        self.flush_signals();
    }

    pub fn handle_element(&mut self, event: ElementEvent, tick: Tick) {
        self.reconciler.on_element_event(event, tick);
        self.flush_signals();
    }

    pub fn handle_command(&mut self, command: UiCommand, tick: Tick) -> Result<()> {
        match command {
            UiCommand::TogglePlay => {
                let action = if self.reconciler.state().is_playing {
                    ControlAction::Pause
                } else {
                    ControlAction::Play
                };
                self.send_control(action)?;
            }
            UiCommand::Play => self.send_control(ControlAction::Play)?,
            UiCommand::Pause => self.send_control(ControlAction::Pause)?,
            UiCommand::Seek { time } => self.send_control(ControlAction::Seek { time: time.max(0.0) })?,
            UiCommand::Next => self.send_control(ControlAction::Next)?,
            UiCommand::Previous => self.send_control(ControlAction::Previous)?,
            UiCommand::PlayTrack { track_index } => self.send_control(ControlAction::PlayTrack { track_index })?,
            UiCommand::BeginDrag { dimension } => self.reconciler.begin_drag(dimension)?,
            UiCommand::Preview { dimension, value } => self.reconciler.update_preview(dimension, value)?,
            UiCommand::EndDrag { dimension, commit } => {
                let committed = self.reconciler.end_drag(dimension, commit, tick);
                self.flush_signals();
                if let Some(DragCommit::Seek(time)) = committed? {
                    self.send_control(ControlAction::Seek { time })?;
                }
            }
            UiCommand::SetVolume { volume } => {
                self.reconciler.set_volume(volume);
            }
            UiCommand::ToggleMute => {
                let muted = self.reconciler.toggle_mute();
                tracing::debug!("Muted: {}", muted);
            }
            UiCommand::Resume => self.reconciler.resume()?,
            UiCommand::Sync => self.request_sync(),
            UiCommand::Leave => self.left = true,
        }
        Ok(())
    }

    /// Fire due timers
    pub fn on_deadline(&mut self, tick: Tick) {
        if self.backup_sync_at.is_some_and(|at| tick.at >= at) {
            self.backup_sync_at = None;
            tracing::debug!("Backup sync request");
            self.request_sync();
        }
        self.reconciler.on_timer(tick);
        self.flush_signals();
    }

    /// Drive the session until the transport closes or the user leaves
    pub async fn run(
        mut self,
        mut transport: mpsc::UnboundedReceiver<TransportEvent>,
        mut elements: mpsc::UnboundedReceiver<ElementEvent>,
        mut commands: mpsc::UnboundedReceiver<UiCommand>,
    ) -> Result<()> {
        while !self.left {
            let deadline = self.next_deadline();

            tokio::select! {
                event = transport.recv() => match event {
                    Some(event) => self.handle_transport(event, Tick::now()),
                    None => {
                        tracing::info!("Transport closed");
                        break;
                    }
                },
                Some(event) = elements.recv() => self.handle_element(event, Tick::now()),
                Some(command) = commands.recv() => {
                    if let Err(e) = self.handle_command(command, Tick::now()) {
                        tracing::warn!("Command failed: {}", e);
                    }
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_deadline(Tick::now());
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Leave the room, release the element and cancel background tasks
    pub fn shutdown(&mut self) {
        if self.joined {
            let leave = OutboundMessage::LeaveRoom {
                room_code: self.room_code.clone(),
            };
            if self.send(leave).is_err() {
                tracing::debug!("Outbound closed before leave");
            }
            self.joined = false;
        }
        self.reconciler.shutdown();
        self.tasks.clear();
        tracing::info!("Session closed");
    }

    fn send_control(&self, action: ControlAction) -> Result<()> {
        if self.room_code.is_empty() {
            return Err(ProtocolError::NoRoom.into());
        }
        tracing::debug!("Sending {:?}", action);
        self.send(OutboundMessage::control(&self.room_code, &self.user.id, action))
    }

    fn request_sync(&self) {
        if self.room_code.is_empty() {
            return;
        }
        if let Err(e) = self.send(OutboundMessage::sync_request(&self.room_code)) {
            tracing::warn!("Sync request not sent: {}", e);
        }
    }

    fn send(&self, message: OutboundMessage) -> Result<()> {
        self.outbound
            .send(message)
            .map_err(|_| Error::ChannelClosed("outbound"))
    }

    fn flush_signals(&mut self) {
        for signal in self.reconciler.drain_signals() {
            match signal {
                ReconcilerSignal::RequestSync => self.request_sync(),
                ReconcilerSignal::TrackNotReady { url } => {
                    tracing::warn!("{}", PlaybackError::TrackNotReady(url));
                    self.request_sync();
                }
            }
        }
    }
}
