//! Refresh-token storage.
//!
//! The store owns [`RefreshTokenRecord`]s exclusively: one live record per
//! token value, created at issuance, consumed exactly once on refresh or
//! logout. Records are never updated in place; rotation always deletes the
//! old record and inserts a new one.
//!
//! Two properties are correctness-critical rather than advisory:
//!
//! - **Expiry is logical.** A record past its `expires_at` is treated as
//!   absent by every lookup, whether or not it has been physically purged.
//! - **Deletion is atomic per key.** When two callers race to delete the
//!   same value, exactly one observes the record present. The session
//!   manager uses this as the serialization point for refresh rotation.
//!
//! [`MemoryRefreshStore`] is the in-process implementation; durable
//! backends implement [`RefreshStore`] behind the same contract.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;

/// A live refresh token: bearer value, owner and validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    /// High-entropy unique value; bearer credential and lookup key.
    pub value: String,
    /// Owning identity id.
    pub identity_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Storage failure.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The token value already exists. Cannot occur under correct random
    /// generation; callers treat it as an integrity violation.
    #[error("refresh token value already present")]
    Conflict { identity_id: String },
    /// Backend infrastructure failure (I/O, connectivity).
    #[error("refresh store backend failure: {0}")]
    Backend(String),
}

/// Durable mapping from refresh-token value to its record.
#[async_trait]
pub trait RefreshStore: Send + Sync {
    /// Insert a new record; `Conflict` if the value already exists.
    async fn put(&self, record: RefreshTokenRecord) -> Result<(), StoreError>;

    /// Fetch the live record for a value. Expired records read as absent.
    async fn find_by_value(&self, value: &str) -> Option<RefreshTokenRecord>;

    /// Remove the record for a value, returning whether a live record was
    /// present. Atomic per key: of two racing callers, exactly one gets
    /// `true`. Removing an expired or absent record returns `false`.
    async fn delete_by_value(&self, value: &str) -> bool;

    /// Remove every record owned by an identity (logout-everywhere,
    /// account deactivation). Returns the number of live records removed.
    async fn delete_all_for_identity(&self, identity_id: &str) -> usize;

    /// Physically drop expired records. Purely housekeeping: lookups
    /// already treat expired records as absent.
    async fn purge_expired(&self) -> usize;
}

/// In-process store backed by a keyed map behind a lock.
///
/// Mutations hold the write lock for the duration of the map operation and
/// never across an await, which is what makes `delete_by_value` the atomic
/// serialization point the refresh flow relies on.
#[derive(Debug, Default)]
pub struct MemoryRefreshStore {
    records: RwLock<HashMap<String, RefreshTokenRecord>>,
}

impl MemoryRefreshStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RefreshStore for MemoryRefreshStore {
    async fn put(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        let mut records = self.records.write();
        if records.contains_key(&record.value) {
            return Err(StoreError::Conflict {
                identity_id: record.identity_id,
            });
        }
        records.insert(record.value.clone(), record);
        Ok(())
    }

    async fn find_by_value(&self, value: &str) -> Option<RefreshTokenRecord> {
        let records = self.records.read();
        let record = records.get(value)?;
        if record.is_expired_at(Utc::now()) {
            return None;
        }
        Some(record.clone())
    }

    async fn delete_by_value(&self, value: &str) -> bool {
        match self.records.write().remove(value) {
            Some(record) => !record.is_expired_at(Utc::now()),
            None => false,
        }
    }

    async fn delete_all_for_identity(&self, identity_id: &str) -> usize {
        let now = Utc::now();
        let mut records = self.records.write();
        let before = records
            .values()
            .filter(|r| r.identity_id == identity_id && !r.is_expired_at(now))
            .count();
        records.retain(|_, r| r.identity_id != identity_id);
        before
    }

    async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, r| !r.is_expired_at(now));
        before - records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: &str, identity: &str, ttl_secs: i64) -> RefreshTokenRecord {
        let now = Utc::now();
        RefreshTokenRecord {
            value: value.to_string(),
            identity_id: identity.to_string(),
            expires_at: now + chrono::Duration::seconds(ttl_secs),
            created_at: now,
        }
    }

    #[tokio::test]
    async fn put_then_find() {
        let store = MemoryRefreshStore::new();
        store.put(record("tok-1", "id-1", 60)).await.unwrap();

        let found = store.find_by_value("tok-1").await.unwrap();
        assert_eq!(found.identity_id, "id-1");
        assert!(store.find_by_value("tok-missing").await.is_none());
    }

    #[tokio::test]
    async fn duplicate_value_conflicts() {
        let store = MemoryRefreshStore::new();
        store.put(record("tok-1", "id-1", 60)).await.unwrap();
        let err = store.put(record("tok-1", "id-2", 60)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn expired_record_reads_as_absent() {
        let store = MemoryRefreshStore::new();
        store.put(record("tok-old", "id-1", -60)).await.unwrap();

        // Physically present, logically gone.
        assert_eq!(store.len(), 1);
        assert!(store.find_by_value("tok-old").await.is_none());
        assert!(!store.delete_by_value("tok-old").await);
    }

    #[tokio::test]
    async fn delete_reports_presence_exactly_once() {
        let store = MemoryRefreshStore::new();
        store.put(record("tok-1", "id-1", 60)).await.unwrap();

        assert!(store.delete_by_value("tok-1").await);
        assert!(!store.delete_by_value("tok-1").await);
        assert!(store.find_by_value("tok-1").await.is_none());
    }

    #[tokio::test]
    async fn deleted_record_never_resurrects() {
        let store = MemoryRefreshStore::new();
        store.put(record("tok-1", "id-1", 60)).await.unwrap();
        store.delete_by_value("tok-1").await;

        assert!(store.find_by_value("tok-1").await.is_none());
        // Re-inserting the same value is a fresh record, not a resurrection.
        store.put(record("tok-1", "id-1", 60)).await.unwrap();
        assert!(store.find_by_value("tok-1").await.is_some());
    }

    #[tokio::test]
    async fn delete_all_for_identity_counts_live_records() {
        let store = MemoryRefreshStore::new();
        store.put(record("tok-1", "id-1", 60)).await.unwrap();
        store.put(record("tok-2", "id-1", 60)).await.unwrap();
        store.put(record("tok-3", "id-1", -60)).await.unwrap();
        store.put(record("tok-4", "id-2", 60)).await.unwrap();

        assert_eq!(store.delete_all_for_identity("id-1").await, 2);
        assert!(store.find_by_value("tok-1").await.is_none());
        assert!(store.find_by_value("tok-2").await.is_none());
        assert!(store.find_by_value("tok-4").await.is_some());
    }

    #[tokio::test]
    async fn purge_drops_only_expired() {
        let store = MemoryRefreshStore::new();
        store.put(record("tok-live", "id-1", 60)).await.unwrap();
        store.put(record("tok-dead", "id-1", -60)).await.unwrap();

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len(), 1);
        assert!(store.find_by_value("tok-live").await.is_some());
    }

    #[tokio::test]
    async fn concurrent_deletes_one_winner() {
        use std::sync::Arc;

        let store = Arc::new(MemoryRefreshStore::new());
        store.put(record("tok-race", "id-1", 60)).await.unwrap();

        let a = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.delete_by_value("tok-race").await })
        };
        let b = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.delete_by_value("tok-race").await })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert!(a ^ b, "exactly one delete must win (got {} and {})", a, b);
    }
}
