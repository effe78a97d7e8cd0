//! Low-latency key-value store abstraction.
//!
//! The production deployment points this at an external store; the
//! in-memory implementation backs tests and single-node runs. List
//! operations prepend, matching the newest-first layout of the claim
//! history and pending queue.

use crate::errors::{OracleError, OracleResult};
use crate::game::types::{GameRecord, RoomId};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> OracleResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> OracleResult<()>;

    /// Set only if the key is absent (or its previous lease expired).
    /// Returns whether the write won. Used for short-lived advisory locks.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> OracleResult<bool>;

    async fn delete(&self, key: &str) -> OracleResult<()>;

    /// Prepend a value to the list at `key`, creating it if absent.
    async fn list_push(&self, key: &str, value: &str) -> OracleResult<()>;

    /// Inclusive range read; `stop` past the end is clamped.
    async fn list_range(&self, key: &str, start: usize, stop: usize) -> OracleResult<Vec<String>>;
}

// Key layout shared by every store consumer.

pub fn game_record_key(room_id: &RoomId) -> String {
    format!("room:game:{}", room_id)
}

pub fn room_lock_key(room_id: &RoomId) -> String {
    format!("room:lock:{}", room_id)
}

pub fn balance_key(wallet: &str) -> String {
    format!("rewards:balance:{}", wallet)
}

pub fn claim_history_key(wallet: &str) -> String {
    format!("rewards:history:{}", wallet)
}

pub fn claim_key(wallet: &str, claim_id: &str) -> String {
    format!("rewards:claim:{}:{}", wallet, claim_id)
}

pub const PENDING_CLAIMS_KEY: &str = "rewards:queue:pending";

/// Load the off-chain game record for a room, if one exists.
pub async fn load_game_record(store: &dyn KvStore, room_id: &RoomId) -> OracleResult<Option<GameRecord>> {
    let Some(raw) = store.get(&game_record_key(room_id)).await? else {
        return Ok(None);
    };
    let record = serde_json::from_str(&raw)
        .map_err(|e| OracleError::Store(format!("corrupt game record for {}: {}", room_id, e)))?;
    Ok(Some(record))
}

pub async fn store_game_record(store: &dyn KvStore, record: &GameRecord) -> OracleResult<()> {
    let raw = serde_json::to_string(record)
        .map_err(|e| OracleError::Store(format!("failed to encode game record: {}", e)))?;
    store.set(&game_record_key(&record.room_id), &raw).await
}

/// In-memory store. Values and lists are atomic per key via the backing
/// shard locks; leases are checked lazily on the next contender.
#[derive(Default)]
pub struct MemoryStore {
    values: DashMap<String, String>,
    lists: DashMap<String, Vec<String>>,
    leases: DashMap<String, Instant>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> OracleResult<Option<String>> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> OracleResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> OracleResult<bool> {
        let now = Instant::now();
        // Entry API keeps check-and-set atomic for this key.
        let won = match self.leases.entry(key.to_string()) {
            Entry::Occupied(mut held) => {
                if *held.get() <= now {
                    held.insert(now + ttl);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(free) => {
                free.insert(now + ttl);
                true
            }
        };
        if won {
            self.values.insert(key.to_string(), value.to_string());
        }
        Ok(won)
    }

    async fn delete(&self, key: &str) -> OracleResult<()> {
        self.values.remove(key);
        self.leases.remove(key);
        Ok(())
    }

    async fn list_push(&self, key: &str, value: &str) -> OracleResult<()> {
        self.lists
            .entry(key.to_string())
            .or_default()
            .insert(0, value.to_string());
        Ok(())
    }

    async fn list_range(&self, key: &str, start: usize, stop: usize) -> OracleResult<Vec<String>> {
        let Some(list) = self.lists.get(key) else {
            return Ok(Vec::new());
        };
        if start >= list.len() || stop < start {
            return Ok(Vec::new());
        }
        let end = stop.saturating_add(1).min(list.len());
        Ok(list[start..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::Choice;

    #[tokio::test]
    async fn values_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn lists_prepend_newest_first() {
        let store = MemoryStore::new();
        store.list_push("l", "a").await.unwrap();
        store.list_push("l", "b").await.unwrap();
        store.list_push("l", "c").await.unwrap();

        let all = store.list_range("l", 0, 99).await.unwrap();
        assert_eq!(all, vec!["c", "b", "a"]);

        let first_two = store.list_range("l", 0, 1).await.unwrap();
        assert_eq!(first_two, vec!["c", "b"]);

        assert!(store.list_range("l", 5, 9).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_nx_grants_one_holder_until_expiry() {
        let store = MemoryStore::new();
        assert!(store.set_nx("lock", "1", Duration::from_secs(60)).await.unwrap());
        assert!(!store.set_nx("lock", "1", Duration::from_secs(60)).await.unwrap());

        store.delete("lock").await.unwrap();
        assert!(store.set_nx("lock", "1", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn expired_lease_can_be_retaken() {
        let store = MemoryStore::new();
        assert!(store.set_nx("lock", "1", Duration::ZERO).await.unwrap());
        // Zero TTL expires immediately; the next contender wins.
        assert!(store.set_nx("lock", "1", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn game_record_round_trip() {
        let store = MemoryStore::new();
        let room = RoomId([0x0a; 32]);
        assert!(load_game_record(&store, &room).await.unwrap().is_none());

        let mut record = GameRecord::new(room);
        record.player1_choice = Some(Choice::Front);
        record.status = Some("resolved".to_string());
        store_game_record(&store, &record).await.unwrap();

        let loaded = load_game_record(&store, &room).await.unwrap().unwrap();
        assert_eq!(loaded.player1_choice, Some(Choice::Front));
        assert_eq!(loaded.status.as_deref(), Some("resolved"));
    }
}
