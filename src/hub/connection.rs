//! Connection — one live subscriber as seen by the hub.
//!
//! DESIGN
//! ======
//! A connection is split in two. `Connection` (the sending side of a
//! bounded queue) is handed to the hub and owned by it from then on.
//! `Outbox` (the receiving side) stays with the transport writer, which
//! drains it onto the socket. Neither half knows what a board is beyond
//! the id used for routing.
//!
//! Dropping the `Connection` closes the queue. The hub only ever drops it
//! once (on unregister or eviction), so the writer sees end-of-queue
//! exactly once and shuts the transport.

use std::fmt;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;
use uuid::Uuid;

/// One serialized event, shared by every recipient of a fan-out. Cloning
/// bumps a reference count; the text is never copied per recipient.
pub type Message = Utf8Bytes;

/// Opaque, unique connection identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    #[error("outbound queue full")]
    Full,
    #[error("outbound queue closed")]
    Closed,
}

/// Hub-side handle: identity, subscribed board, and the queue sender.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    board_id: i64,
    user_id: Uuid,
    queue: mpsc::Sender<Message>,
}

/// Writer-side handle: drains queued messages in enqueue order.
#[derive(Debug)]
pub struct Outbox {
    rx: mpsc::Receiver<Message>,
}

impl Connection {
    /// Open a connection for `board_id` with a queue of `capacity` messages.
    #[must_use]
    pub fn open(board_id: i64, user_id: Uuid, capacity: usize) -> (Self, Outbox) {
        let (queue, rx) = mpsc::channel(capacity.max(1));
        (Self { id: ConnectionId::new(), board_id, user_id, queue }, Outbox { rx })
    }

    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[must_use]
    pub fn board_id(&self) -> i64 {
        self.board_id
    }

    #[must_use]
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// False once the writer has gone away.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.queue.is_closed()
    }

    /// Queue a message without waiting.
    ///
    /// # Errors
    ///
    /// `Full` when the subscriber is not keeping up, `Closed` when its
    /// writer has already exited. Either way the caller should drop it.
    pub fn enqueue(&self, message: Message) -> Result<(), EnqueueError> {
        self.queue.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }
}

impl Outbox {
    /// Next queued message, or `None` once the hub has dropped the connection
    /// and everything already queued has been drained.
    pub async fn next(&mut self) -> Option<Message> {
        self.rx.recv().await
    }
}
