//! Host surface bridge
//!
//! Connects a host surface (a drawing front end, a script runner) to a running
//! [`WorkspaceSession`]. Inputs travel over a bounded channel and are applied strictly
//! in order by one task; events come back over an unbounded channel.

use crate::commands::WorkspaceInput;
use crate::events::WorkspaceEvent;
use crate::handlers::WorkspaceSession;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Default capacity of the input channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Upper bound on events returned by one [`WorkspaceEvents::drain`]
pub const EVENT_BATCH_LIMIT: usize = 100;

/// Message from the host surface to the session task
#[derive(Debug, Clone)]
pub enum BridgeCommand {
    Input(WorkspaceInput),
    Shutdown,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("Channel closed")]
    ChannelClosed,

    #[error("Channel full")]
    ChannelFull,
}

/// Sending half, cheap to clone
#[derive(Debug, Clone)]
pub struct WorkspaceHandle {
    command_tx: mpsc::Sender<BridgeCommand>,
}

impl WorkspaceHandle {
    pub async fn send(&self, input: impl Into<WorkspaceInput>) -> Result<(), SendError> {
        self.command_tx
            .send(BridgeCommand::Input(input.into()))
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Send without waiting; fails when the channel is full
    pub fn try_send(&self, input: impl Into<WorkspaceInput>) -> Result<(), SendError> {
        self.command_tx
            .try_send(BridgeCommand::Input(input.into()))
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => SendError::ChannelFull,
                mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
            })
    }

    /// Send from a thread outside the runtime
    pub fn blocking_send(&self, input: impl Into<WorkspaceInput>) -> Result<(), SendError> {
        self.command_tx
            .blocking_send(BridgeCommand::Input(input.into()))
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Ask the session task to stop after the inputs already queued
    pub async fn shutdown(&self) -> Result<(), SendError> {
        self.command_tx
            .send(BridgeCommand::Shutdown)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}

/// Receiving half for workspace events
#[derive(Debug)]
pub struct WorkspaceEvents {
    event_rx: mpsc::UnboundedReceiver<WorkspaceEvent>,
}

impl WorkspaceEvents {
    /// Wait for the next event; `None` once the session has stopped and all events are read
    pub async fn next(&mut self) -> Option<WorkspaceEvent> {
        self.event_rx.recv().await
    }

    /// Drain what is available now, at most [`EVENT_BATCH_LIMIT`] events
    pub fn drain(&mut self) -> Vec<WorkspaceEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
            if events.len() >= EVENT_BATCH_LIMIT {
                break;
            }
        }
        events
    }
}

/// Run `session` on its own task. The task hands the session back when it stops,
/// either on [`WorkspaceHandle::shutdown`] or when every handle is dropped.
pub fn spawn(
    mut session: WorkspaceSession,
    capacity: usize,
) -> (WorkspaceHandle, WorkspaceEvents, JoinHandle<WorkspaceSession>) {
    let (command_tx, mut command_rx) = mpsc::channel(capacity.max(1));
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        while let Some(command) = command_rx.recv().await {
            match command {
                BridgeCommand::Input(input) => {
                    debug!(?input, "workspace input");
                    for event in session.process(input).await {
                        // A dropped receiver does not stop the session
                        let _ = event_tx.send(event);
                    }
                }
                BridgeCommand::Shutdown => break,
            }
        }
        info!("workspace session stopped");
        session
    });

    (WorkspaceHandle { command_tx }, WorkspaceEvents { event_rx }, task)
}
