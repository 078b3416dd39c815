// GrabGrub Infrastructure - SQLite Adapter
// Implements: KeyValueStore with atomic StorageTransaction

mod connection;
mod error;
mod kv_store;
mod migration;
mod transaction;

pub use connection::{create_pool, database_url, open_database};
pub use kv_store::SqliteKeyValueStore;
pub use migration::run_migrations;
pub use transaction::SqliteStorageTransaction;
