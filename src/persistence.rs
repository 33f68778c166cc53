//! Versioned JSON snapshot of room metadata, written to
//! `{storage_root}/rooms_state.json` with single `.bak` rotation.
//!
//! Grounded on the original `RoomManager.save_state`/`load_state` (periodic
//! background save, copy-before-overwrite for Docker-volume safety) but the
//! on-disk format is an explicit versioned JSON document instead of a pickle.

use crate::room::RoomMetadata;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub format_version: u32,
    pub saved_at_unix: i64,
    pub rooms: Vec<RoomMetadata>,
}

impl RegistrySnapshot {
    pub fn new(rooms: Vec<RoomMetadata>) -> Self {
        let saved_at_unix = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            saved_at_unix,
            rooms,
        }
    }
}

pub struct Store {
    path: PathBuf,
    backup_path: PathBuf,
}

impl Store {
    pub fn new(storage_root: impl AsRef<Path>) -> Self {
        let root = storage_root.as_ref().to_path_buf();
        Self {
            path: root.join("rooms_state.json"),
            backup_path: root.join("rooms_state.json.bak"),
        }
    }

    /// Copies the current file to `.bak` (if present) then overwrites it.
    /// This ordering means a crash mid-write never destroys both copies.
    pub async fn save(&self, snapshot: &RegistrySnapshot) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            tokio::fs::copy(&self.path, &self.backup_path).await?;
        }
        let body = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&self.path, body).await?;
        info!(rooms = snapshot.rooms.len(), "saved registry snapshot");
        Ok(())
    }

    /// Load order: current file, then `.bak`, then an empty snapshot. A
    /// snapshot whose `format_version` we don't recognize is treated as
    /// absent rather than fatally erroring the process.
    pub async fn load(&self) -> RegistrySnapshot {
        if let Some(snap) = self.try_read(&self.path).await {
            return snap;
        }
        warn!("primary snapshot unreadable, falling back to backup");
        if let Some(snap) = self.try_read(&self.backup_path).await {
            return snap;
        }
        warn!("no usable registry snapshot found, starting empty");
        RegistrySnapshot::new(Vec::new())
    }

    async fn try_read(&self, path: &Path) -> Option<RegistrySnapshot> {
        let bytes = tokio::fs::read(path).await.ok()?;
        let snapshot: RegistrySnapshot = serde_json::from_slice(&bytes).ok()?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            warn!(
                found = snapshot.format_version,
                expected = SNAPSHOT_FORMAT_VERSION,
                "snapshot format version mismatch"
            );
            return None;
        }
        Some(snapshot)
    }
}
