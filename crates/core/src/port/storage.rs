// Key/Value Storage Port (local-storage equivalent)
//
// Values are opaque strings; the application layer stores JSON documents
// under fixed keys.

use crate::error::Result;
use async_trait::async_trait;

/// Persistent string-to-string store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value, returns true if it existed
    async fn remove(&self, key: &str) -> Result<bool>;

    /// All keys, sorted
    async fn keys(&self) -> Result<Vec<String>>;

    /// Begin an atomic read-modify-write section
    async fn begin(&self) -> Result<Box<dyn StorageTransaction>>;
}

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// KeyValueStore operations within a transaction
#[async_trait]
pub trait StorageTransaction: Transaction {
    async fn get(&mut self, key: &str) -> Result<Option<String>>;

    async fn set(&mut self, key: &str, value: &str) -> Result<()>;

    async fn remove(&mut self, key: &str) -> Result<bool>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tokio::sync::{Mutex, OwnedMutexGuard};

    /// In-memory store. Transactions hold the lock until commit or rollback.
    #[derive(Clone, Default)]
    pub struct InMemoryKeyValueStore {
        entries: Arc<Mutex<BTreeMap<String, String>>>,
    }

    impl InMemoryKeyValueStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a raw value (e.g. a hand-written JSON array)
        pub async fn insert_raw(&self, key: &str, value: &str) {
            self.entries
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
        }
    }

    #[async_trait]
    impl KeyValueStore for InMemoryKeyValueStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.entries.lock().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            self.entries
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<bool> {
            Ok(self.entries.lock().await.remove(key).is_some())
        }

        async fn keys(&self) -> Result<Vec<String>> {
            Ok(self.entries.lock().await.keys().cloned().collect())
        }

        async fn begin(&self) -> Result<Box<dyn StorageTransaction>> {
            let guard = Arc::clone(&self.entries).lock_owned().await;
            let staged = guard.clone();
            Ok(Box::new(InMemoryTransaction { guard, staged }))
        }
    }

    pub struct InMemoryTransaction {
        guard: OwnedMutexGuard<BTreeMap<String, String>>,
        staged: BTreeMap<String, String>,
    }

    #[async_trait]
    impl Transaction for InMemoryTransaction {
        async fn commit(mut self: Box<Self>) -> Result<()> {
            let staged = std::mem::take(&mut self.staged);
            *self.guard = staged;
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl StorageTransaction for InMemoryTransaction {
        async fn get(&mut self, key: &str) -> Result<Option<String>> {
            Ok(self.staged.get(key).cloned())
        }

        async fn set(&mut self, key: &str, value: &str) -> Result<()> {
            self.staged.insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove(&mut self, key: &str) -> Result<bool> {
            Ok(self.staged.remove(key).is_some())
        }
    }
}
