//! Board channels — membership map and fan-out.
//!
//! DESIGN
//! ======
//! Plain synchronous state, owned by the hub loop and never shared. A board
//! channel exists only while it has members: it is created on the first
//! register and discarded when its last member leaves or is evicted.
//!
//! A publish tries every member once. Members whose queue is full or
//! closed are evicted on the spot, which drops their queue sender and lets
//! their writer shut the transport.

use std::collections::HashMap;

use tracing::{info, warn};

use super::connection::{Connection, ConnectionId, Message};

/// Result of one fan-out.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub evicted: Vec<ConnectionId>,
}

#[derive(Debug, Default)]
pub struct BoardChannels {
    boards: HashMap<i64, HashMap<ConnectionId, Connection>>,
}

impl BoardChannels {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to its board's channel. Returns the member count.
    pub fn register(&mut self, conn: Connection) -> usize {
        let board_id = conn.board_id();
        let members = self.boards.entry(board_id).or_default();
        members.insert(conn.id(), conn);
        members.len()
    }

    /// Remove a connection. Returns false if it was not registered, which is
    /// not an error: the hub may already have evicted it.
    pub fn unregister(&mut self, board_id: i64, id: ConnectionId) -> bool {
        let Some(members) = self.boards.get_mut(&board_id) else {
            return false;
        };
        let removed = members.remove(&id).is_some();
        if members.is_empty() {
            self.boards.remove(&board_id);
        }
        removed
    }

    /// Enqueue `message` on every member of `board_id`'s channel.
    pub fn publish(&mut self, board_id: i64, message: &Message) -> Delivery {
        let mut delivery = Delivery::default();
        let Some(members) = self.boards.get_mut(&board_id) else {
            return delivery;
        };

        for (id, conn) in members.iter() {
            match conn.enqueue(message.clone()) {
                Ok(()) => delivery.delivered += 1,
                Err(e) => {
                    warn!(%board_id, connection_id = %id, user_id = %conn.user_id(), error = %e, "evicting connection");
                    delivery.evicted.push(*id);
                }
            }
        }

        for id in &delivery.evicted {
            members.remove(id);
        }
        if members.is_empty() {
            self.boards.remove(&board_id);
            info!(%board_id, "board channel discarded");
        }
        delivery
    }

    #[must_use]
    pub fn subscriber_count(&self, board_id: i64) -> usize {
        self.boards.get(&board_id).map_or(0, HashMap::len)
    }

    #[must_use]
    pub fn board_count(&self) -> usize {
        self.boards.len()
    }
}
