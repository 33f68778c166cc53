//! The out-of-scope account/identity collaborator (§4's "external system"
//! boundary). `UserStore` is the seam the rest of the crate is tested
//! against; a real deployment backs it with whatever account service the
//! surrounding platform already runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub balance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResult {
    pub room_id: String,
    pub hand_id: uuid::Uuid,
    pub net_change: i64,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Verifies a bearer token and resolves it to a username.
    async fn verify_user(&self, token: &str) -> Option<String>;

    async fn get_user(&self, username: &str) -> Option<UserRecord>;

    /// Applies a balance delta (may be negative); returns the new balance.
    async fn update_balance(&self, username: &str, delta: i64) -> Option<i64>;

    async fn record_game(&self, username: &str, result: GameResult);
}

/// In-memory fake used by tests and by a standalone deployment with no
/// external account service.
pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, UserRecord>>,
    history: Mutex<Vec<(String, GameResult)>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    pub async fn seed(&self, username: &str, balance: i64) {
        self.users.lock().await.insert(
            username.to_string(),
            UserRecord {
                username: username.to_string(),
                balance,
            },
        );
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn verify_user(&self, token: &str) -> Option<String> {
        // The fake treats the bearer token as the username directly; the
        // real JWT verification happens in `auth`.
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    async fn get_user(&self, username: &str) -> Option<UserRecord> {
        self.users.lock().await.get(username).cloned()
    }

    async fn update_balance(&self, username: &str, delta: i64) -> Option<i64> {
        let mut users = self.users.lock().await;
        let record = users.entry(username.to_string()).or_insert(UserRecord {
            username: username.to_string(),
            balance: 0,
        });
        record.balance += delta;
        Some(record.balance)
    }

    async fn record_game(&self, username: &str, result: GameResult) {
        self.history
            .lock()
            .await
            .push((username.to_string(), result));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_balance_accumulates() {
        let store = InMemoryUserStore::new();
        store.seed("alice", 1000).await;
        let after = store.update_balance("alice", -250).await;
        assert_eq!(after, Some(750));
        let record = store.get_user("alice").await.unwrap();
        assert_eq!(record.balance, 750);
    }
}
