//! §4.4 RoomRegistry: creates/looks up rooms by id, and runs the two
//! background sweeps the original `RoomManager` ran on daemon threads
//! (expiry cleanup, periodic state save) as proper async tasks instead.

use crate::error::RoomError;
use crate::persistence::{RegistrySnapshot, Store};
use crate::room::{Room, RoomMetadata};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub enum ExpiryEvent {
    Warning { room_id: String, members: Vec<String> },
    Expired { room_id: String, members: Vec<String> },
}

pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_room(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        owner: impl Into<String>,
        small_blind: i64,
        big_blind: i64,
        buy_in_min: i64,
        buy_in_max: i64,
        turn_seconds: u64,
    ) -> Result<Arc<Mutex<Room>>, RoomError> {
        let id = id.into();
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&id) {
            return Err(RoomError::AlreadyInRoom);
        }
        let room = Arc::new(Mutex::new(Room::new(
            id.clone(),
            name,
            owner,
            small_blind,
            big_blind,
            buy_in_min,
            buy_in_max,
            turn_seconds,
        )));
        rooms.insert(id, room.clone());
        Ok(room)
    }

    /// Exact match first, then a case-insensitive scan (the original
    /// deployment let a user type a room code with the wrong case).
    pub async fn get_room(&self, id: &str) -> Option<Arc<Mutex<Room>>> {
        let rooms = self.rooms.read().await;
        if let Some(room) = rooms.get(id) {
            return Some(room.clone());
        }
        let lowered = id.to_ascii_lowercase();
        rooms
            .iter()
            .find(|(key, _)| key.to_ascii_lowercase() == lowered)
            .map(|(_, room)| room.clone())
    }

    pub async fn remove_room(&self, id: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.write().await.remove(id)
    }

    pub async fn list_rooms(&self) -> Vec<RoomMetadata> {
        let rooms = self.rooms.read().await;
        let mut out = Vec::with_capacity(rooms.len());
        for room in rooms.values() {
            out.push(room.lock().await.snapshot());
        }
        out
    }

    async fn ids(&self) -> Vec<String> {
        self.rooms.read().await.keys().cloned().collect()
    }

    pub fn spawn_reaper(
        self: &Arc<Self>,
        idle_limit_minutes: i64,
        warning_minutes: i64,
        interval: std::time::Duration,
        events: mpsc::Sender<ExpiryEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry
                    .sweep_once(idle_limit_minutes, warning_minutes, &events)
                    .await;
            }
        })
    }

    async fn sweep_once(
        &self,
        idle_limit_minutes: i64,
        warning_minutes: i64,
        events: &mpsc::Sender<ExpiryEvent>,
    ) {
        for id in self.ids().await {
            let Some(room) = self.get_room(&id).await else {
                continue;
            };
            let (expired, expiring, members) = {
                let guard = room.lock().await;
                let members: Vec<String> = guard.players.keys().cloned().collect();
                (
                    guard.is_expired(idle_limit_minutes),
                    guard.is_expiring(idle_limit_minutes, warning_minutes),
                    members,
                )
            };
            if expired {
                self.remove_room(&id).await;
                info!(room = %id, "reaped expired room");
                let _ = events
                    .send(ExpiryEvent::Expired {
                        room_id: id,
                        members,
                    })
                    .await;
            } else if expiring {
                let _ = events
                    .send(ExpiryEvent::Warning {
                        room_id: id,
                        members,
                    })
                    .await;
            }
        }
    }

    pub fn spawn_snapshotter(
        self: &Arc<Self>,
        store: Arc<Store>,
        interval: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let snapshot = RegistrySnapshot::new(registry.list_rooms().await);
                if let Err(err) = store.save(&snapshot).await {
                    warn!(error = %err, "failed to save registry snapshot");
                }
            }
        })
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get_is_case_insensitive() {
        let registry = RoomRegistry::new();
        registry
            .create_room("AbC123", "table", "alice", 50, 100, 1000, 50_000, 30)
            .await
            .unwrap();
        assert!(registry.get_room("abc123").await.is_some());
    }

    #[tokio::test]
    async fn duplicate_room_id_is_rejected() {
        let registry = RoomRegistry::new();
        registry
            .create_room("r1", "table", "alice", 50, 100, 1000, 50_000, 30)
            .await
            .unwrap();
        let err = registry
            .create_room("r1", "table2", "bob", 50, 100, 1000, 50_000, 30)
            .await
            .unwrap_err();
        assert_eq!(err, RoomError::AlreadyInRoom);
    }
}
