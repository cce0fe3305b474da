//! Hub — the single serialization point for subscriptions and fan-out.
//!
//! ARCHITECTURE
//! ============
//! One spawned task owns `BoardChannels`. Everything else talks to it through
//! a cloneable `Hub` handle that sends commands over a bounded channel:
//!
//! - `Register` / `Unregister` change membership.
//! - `Publish` serializes an event once and fans it out.
//! - `SubscriberCount` / `BoardCount` read membership for diagnostics.
//!
//! Commands are applied strictly one at a time in arrival order, so there is
//! no lock on the membership map and a subscriber that receives both A and B
//! receives them in the order they reached the hub.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here fails the caller. Full or closed connection queues are
//! evicted, events that cannot be serialized are dropped with a warning,
//! and a stopped hub turns every call into a logged no-op.

pub mod channels;
pub mod connection;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::HubConfig;
use crate::event::Event;

use channels::BoardChannels;
pub use connection::{Connection, ConnectionId, Message, Outbox};

// =============================================================================
// COMMANDS
// =============================================================================

#[derive(Debug)]
enum Command {
    Register(Connection),
    Unregister { board_id: i64, id: ConnectionId },
    Publish(Event),
    SubscriberCount { board_id: i64, reply: oneshot::Sender<usize> },
    BoardCount { reply: oneshot::Sender<usize> },
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable handle to the hub task. The task stops once every handle is gone.
#[derive(Clone, Debug)]
pub struct Hub {
    tx: mpsc::Sender<Command>,
    config: HubConfig,
}

impl Hub {
    /// Spawn the hub loop and return a handle to it.
    #[must_use]
    pub fn spawn(config: HubConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.command_capacity.max(1));
        info!(
            queue_capacity = config.queue_capacity,
            command_capacity = config.command_capacity,
            "hub started"
        );
        tokio::spawn(run(rx));
        Self { tx, config }
    }

    #[must_use]
    pub fn config(&self) -> HubConfig {
        self.config
    }

    /// Open a connection sized by the hub's queue capacity. The caller
    /// registers the `Connection` and keeps the `Outbox` for its writer.
    #[must_use]
    pub fn open(&self, board_id: i64, user_id: Uuid) -> (Connection, Outbox) {
        Connection::open(board_id, user_id, self.config.queue_capacity)
    }

    pub async fn register(&self, conn: Connection) {
        self.send(Command::Register(conn)).await;
    }

    /// Remove a connection. Safe to call for connections already evicted.
    pub async fn unregister(&self, board_id: i64, id: ConnectionId) {
        self.send(Command::Unregister { board_id, id }).await;
    }

    /// Fan an event out to its board. Best-effort; never fails the caller.
    pub async fn publish(&self, event: Event) {
        self.send(Command::Publish(event)).await;
    }

    /// Members currently subscribed to `board_id`. Zero if the hub stopped.
    pub async fn subscriber_count(&self, board_id: i64) -> usize {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SubscriberCount { board_id, reply }).await;
        rx.await.unwrap_or(0)
    }

    /// Boards with at least one subscriber.
    pub async fn board_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        self.send(Command::BoardCount { reply }).await;
        rx.await.unwrap_or(0)
    }

    async fn send(&self, command: Command) {
        if self.tx.send(command).await.is_err() {
            warn!("hub stopped; dropping command");
        }
    }
}

// =============================================================================
// LOOP
// =============================================================================

async fn run(mut rx: mpsc::Receiver<Command>) {
    let mut channels = BoardChannels::new();
    while let Some(command) = rx.recv().await {
        apply(&mut channels, command);
    }
    info!(boards = channels.board_count(), "hub stopped");
}

fn apply(channels: &mut BoardChannels, command: Command) {
    match command {
        Command::Register(conn) => {
            if !conn.is_live() {
                debug!(board_id = conn.board_id(), connection_id = %conn.id(), "closed connection not registered");
                return;
            }
            let (board_id, id, user_id) = (conn.board_id(), conn.id(), conn.user_id());
            let members = channels.register(conn);
            info!(%board_id, connection_id = %id, %user_id, members, "connection registered");
        }
        Command::Unregister { board_id, id } => {
            if channels.unregister(board_id, id) {
                info!(%board_id, connection_id = %id, remaining = channels.subscriber_count(board_id), "connection unregistered");
            } else {
                debug!(%board_id, connection_id = %id, "unregister for unknown connection ignored");
            }
        }
        Command::Publish(event) => {
            let board_id = event.board_id();
            let message = match event.to_wire() {
                Ok(wire) => Message::from(wire),
                Err(e) => {
                    warn!(%board_id, kind = event.kind(), error = %e, "dropping unserializable event");
                    return;
                }
            };
            let delivery = channels.publish(board_id, &message);
            debug!(
                %board_id,
                kind = event.kind(),
                fields = event.data().len(),
                delivered = delivery.delivered,
                evicted = delivery.evicted.len(),
                "event published"
            );
        }
        Command::SubscriberCount { board_id, reply } => {
            let _ = reply.send(channels.subscriber_count(board_id));
        }
        Command::BoardCount { reply } => {
            let _ = reply.send(channels.board_count());
        }
    }
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
