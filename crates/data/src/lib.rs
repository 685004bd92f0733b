//! Persistence for the obsolete-escrow registry.
//!
//! The registry is a flat string-keyed map. This crate provides the
//! `RegistryStore` seam and three backends:
//! - in-memory, for tests and single-process use
//! - a JSON file, for local agents
//! - PostgreSQL, for shared deployments

/// Registry store backends.
pub mod stores;

pub use stores::{FileStore, MemoryStore, PgStore};

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by registry stores.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Filesystem failure.
    #[error("registry io error: {0}")]
    Io(#[from] std::io::Error),
    /// Stored data could not be (de)serialized.
    #[error("registry data is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Database failure.
    #[error("registry database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Flat key-value storage with last-writer-wins semantics.
///
/// No operation is transactional with anything else; callers treat the
/// contents as a recovery hint.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Reads a value.
    async fn get(&self, key: &str) -> Result<Option<String>, RegistryError>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), RegistryError>;

    /// Removes a key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), RegistryError>;

    /// All entries, ordered by key.
    async fn entries(&self) -> Result<Vec<(String, String)>, RegistryError>;
}
