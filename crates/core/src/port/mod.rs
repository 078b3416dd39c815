// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod storage;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use storage::{KeyValueStore, StorageTransaction, Transaction};
pub use time_provider::TimeProvider;
