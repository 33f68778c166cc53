//! §4.5 Session Hub: owns the socket/membership maps. Grounded on the
//! original `ConnectionManager` (active_connections/room_players/
//! player_active_room, single-active-connection-per-player semantics on
//! reconnect) but the outbound side sends are pushed through unbounded
//! mpsc channels so the hub's own mutex is never held across a socket write.

use crate::messages::ServerMessage;
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, Mutex};
use tracing::info;

pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

#[derive(Default)]
struct HubState {
    /// username -> outbox of their current socket, if connected.
    sockets: HashMap<String, Outbox>,
    /// room_id -> set of usernames present in that room.
    room_members: HashMap<String, HashSet<String>>,
    /// username -> the single room they're currently attached to.
    active_room: HashMap<String, String>,
}

pub struct SessionHub {
    state: Mutex<HubState>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HubState::default()),
        }
    }

    /// Registers a freshly-authenticated socket for `username` in `room_id`.
    /// If the user already had a socket open (anywhere), it is evicted —
    /// the hub enforces single-active-connection-per-player.
    pub async fn connect(&self, username: &str, room_id: &str, outbox: Outbox) -> Option<Outbox> {
        let mut state = self.state.lock().await;
        let previous = state.sockets.insert(username.to_string(), outbox);
        if let Some(old_tx) = &previous {
            let _ = old_tx.send(ServerMessage::SessionReplaced);
        }
        if let Some(old_room) = state.active_room.get(username).cloned() {
            if old_room != room_id {
                if let Some(members) = state.room_members.get_mut(&old_room) {
                    members.remove(username);
                }
            }
        }
        state
            .room_members
            .entry(room_id.to_string())
            .or_default()
            .insert(username.to_string());
        state
            .active_room
            .insert(username.to_string(), room_id.to_string());
        info!(user = username, room = room_id, "session connected");
        previous
    }

    /// Marks a player disconnected without forgetting their room membership,
    /// so a reconnect can resume without re-joining.
    pub async fn disconnect(&self, username: &str) {
        let mut state = self.state.lock().await;
        state.sockets.remove(username);
        info!(user = username, "session disconnected");
    }

    pub async fn leave_room(&self, username: &str, room_id: &str) {
        let mut state = self.state.lock().await;
        if let Some(members) = state.room_members.get_mut(room_id) {
            members.remove(username);
        }
        if state.active_room.get(username).map(|r| r.as_str()) == Some(room_id) {
            state.active_room.remove(username);
        }
    }

    pub async fn is_connected(&self, username: &str) -> bool {
        self.state.lock().await.sockets.contains_key(username)
    }

    pub async fn send_to_user(&self, username: &str, message: ServerMessage) -> bool {
        let outbox = {
            let state = self.state.lock().await;
            state.sockets.get(username).cloned()
        };
        match outbox {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    pub async fn broadcast_to_room(&self, room_id: &str, message: ServerMessage) {
        let recipients: Vec<Outbox> = {
            let state = self.state.lock().await;
            let Some(members) = state.room_members.get(room_id) else {
                return;
            };
            members
                .iter()
                .filter_map(|user| state.sockets.get(user).cloned())
                .collect()
        };
        for tx in recipients {
            let _ = tx.send(message.clone());
        }
    }

    pub async fn room_members(&self, room_id: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .room_members
            .get(room_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reconnect_to_a_different_room_moves_membership() {
        let hub = SessionHub::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        hub.connect("alice", "room-a", tx1).await;
        assert_eq!(hub.room_members("room-a").await, vec!["alice".to_string()]);

        let evicted = hub.connect("alice", "room-b", tx2).await;
        assert!(evicted.is_some());
        assert!(hub.room_members("room-a").await.is_empty());
        assert_eq!(hub.room_members("room-b").await, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn broadcast_reaches_only_room_members() {
        let hub = SessionHub::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        hub.connect("alice", "room-a", tx_a).await;
        hub.connect("bob", "room-b", tx_b).await;

        hub.broadcast_to_room(
            "room-a",
            ServerMessage::Error {
                message: "hi".into(),
            },
        )
        .await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }
}
