//! In-memory chat room membership and fan-out.
//!
//! Membership is live connection state only: it is not persisted and a
//! reconnecting client must rejoin its rooms. Delivery to each member
//! goes through that connection's unbounded channel, which preserves a
//! sender's emission order for members joined throughout. Persistence
//! of messages is the websocket handler's concern, not the hub's.

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// Outbound frame for one connection, already serialized.
pub type Frame = String;

#[derive(Default)]
pub struct ChatHub {
    /// Room id -> members and their outbound channels.
    rooms: DashMap<String, HashMap<ConnectionId, mpsc::UnboundedSender<Frame>>>,
    /// Connection id -> rooms it has joined, for cleanup on disconnect.
    memberships: DashMap<ConnectionId, HashSet<String>>,
}

impl ChatHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room's broadcast group. Idempotent; no
    /// capacity limit and no access control at this layer.
    pub fn join(&self, conn: ConnectionId, room_id: &str, tx: mpsc::UnboundedSender<Frame>) {
        self.rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(conn, tx);
        self.memberships
            .entry(conn)
            .or_default()
            .insert(room_id.to_string());
    }

    /// Fan a frame out to every current member of the room, including
    /// the sender's own other connections. Members whose channel has
    /// closed are dropped from the room.
    pub fn broadcast(&self, room_id: &str, frame: &str) {
        let Some(mut members) = self.rooms.get_mut(room_id) else {
            return;
        };
        members.retain(|_, tx| tx.send(frame.to_string()).is_ok());
    }

    /// Remove a connection from every room it joined. No notification
    /// to remaining members.
    pub fn disconnect(&self, conn: ConnectionId) {
        let Some((_, joined)) = self.memberships.remove(&conn) else {
            return;
        };
        for room_id in joined {
            if let Some(mut members) = self.rooms.get_mut(&room_id) {
                members.remove(&conn);
                if members.is_empty() {
                    drop(members);
                    self.rooms.remove_if(&room_id, |_, members| members.is_empty());
                }
            }
        }
    }

    /// Number of live members in a room.
    pub fn room_size(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map(|m| m.len()).unwrap_or(0)
    }
}
