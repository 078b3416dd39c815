// SQLite KeyValueStore Implementation

use crate::error::map_sqlx_error;
use crate::SqliteStorageTransaction;
use async_trait::async_trait;
use grabgrub_core::error::Result;
use grabgrub_core::port::{KeyValueStore, StorageTransaction, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

pub struct SqliteKeyValueStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteKeyValueStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM local_storage WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO local_storage (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(self.time_provider.now_millis())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(key, bytes = value.len(), "Stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM local_storage WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT key FROM local_storage ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    /// Takes the write lock up front so concurrent read-modify-writes wait
    /// on the busy timeout instead of failing at their first write
    async fn begin(&self) -> Result<Box<dyn StorageTransaction>> {
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteStorageTransaction::new(
            tx,
            self.time_provider.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, open_database, run_migrations};
    use grabgrub_core::port::time_provider::mocks::FixedTimeProvider;
    use grabgrub_core::port::Transaction;
    use std::time::Duration;
    use tokio_test::assert_ok;

    async fn setup() -> (SqlitePool, SqliteKeyValueStore) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let store = SqliteKeyValueStore::new(pool.clone(), Arc::new(FixedTimeProvider::new(42)));
        (pool, store)
    }

    #[tokio::test]
    async fn test_get_set_remove() {
        let (pool, store) = setup().await;
        assert!(store.get("grabgrub_posts").await.unwrap().is_none());

        store.set("grabgrub_posts", "[]").await.unwrap();
        store.set("grabgrub_posts", "[1]").await.unwrap();
        assert_eq!(store.get("grabgrub_posts").await.unwrap().as_deref(), Some("[1]"));

        let updated_at: i64 =
            sqlx::query_scalar("SELECT updated_at FROM local_storage WHERE key = 'grabgrub_posts'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(updated_at, 42);

        store.set("grabgrub_auth", "{}").await.unwrap();
        assert_eq!(
            store.keys().await.unwrap(),
            vec!["grabgrub_auth".to_string(), "grabgrub_posts".to_string()]
        );

        assert!(store.remove("grabgrub_posts").await.unwrap());
        assert!(!store.remove("grabgrub_posts").await.unwrap());
    }

    #[tokio::test]
    async fn test_transaction_commit_and_rollback() {
        let (_pool, store) = setup().await;
        store.set("a", "1").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.set("a", "2").await.unwrap();
        assert_eq!(tx.get("a").await.unwrap().as_deref(), Some("2"));
        tx.rollback().await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));

        let mut tx = store.begin().await.unwrap();
        tx.set("b", "3").await.unwrap();
        assert!(tx.remove("a").await.unwrap());
        tx.commit().await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_overlapping_transactions_serialize_across_pools() {
        let dir = std::env::temp_dir().join(format!("grabgrub_kv_{}", std::process::id()));
        let path = dir.join("storage.db");
        let _ = std::fs::remove_dir_all(&dir);
        let first = assert_ok!(open_database(&path).await);
        let second = assert_ok!(open_database(&path).await);
        let time = Arc::new(FixedTimeProvider::new(42));
        let a = SqliteKeyValueStore::new(first.clone(), time.clone());
        let b = Arc::new(SqliteKeyValueStore::new(second.clone(), time));
        assert_ok!(a.set("counter", "0").await);

        // Read first, write later, while another pool tries the same
        let mut tx = assert_ok!(a.begin().await);
        let seen: i64 = assert_ok!(tx.get("counter").await).unwrap().parse().unwrap();

        let other = {
            let b = b.clone();
            tokio::spawn(async move {
                let mut tx = b.begin().await?;
                let seen: i64 = tx.get("counter").await?.unwrap().parse().unwrap();
                tx.set("counter", &(seen + 1).to_string()).await?;
                tx.commit().await
            })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_ok!(tx.set("counter", &(seen + 1).to_string()).await);
        assert_ok!(tx.commit().await);
        assert_ok!(assert_ok!(other.await));

        assert_eq!(assert_ok!(b.get("counter").await).as_deref(), Some("2"));

        first.close().await;
        second.close().await;
        let _ = std::fs::remove_dir_all(&dir);
    }
}
