//! PostgreSQL registry store.

use crate::{RegistryError, RegistryStore};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;

/// Registry store backed by the `escrow_registry` table.
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    /// Creates a store from an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connects to the database.
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    ///
    /// # Errors
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, RegistryError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Creates the registry table if missing.
    ///
    /// # Errors
    /// Returns an error if the migration fails.
    pub async fn migrate(&self) -> Result<(), RegistryError> {
        sqlx::query(include_str!("../../migrations/001_escrow_registry.sql"))
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RegistryStore for PgStore {
    async fn get(&self, key: &str) -> Result<Option<String>, RegistryError> {
        let row = sqlx::query("SELECT value FROM escrow_registry WHERE key = $1")
            .bind(key)
            .fetch_optional(self.pool.as_ref())
            .await?;
        Ok(row.map(|r| r.try_get("value")).transpose()?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        sqlx::query(
            r#"
            INSERT INTO escrow_registry (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), RegistryError> {
        sqlx::query("DELETE FROM escrow_registry WHERE key = $1")
            .bind(key)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<(String, String)>, RegistryError> {
        let rows = sqlx::query("SELECT key, value FROM escrow_registry ORDER BY key")
            .fetch_all(self.pool.as_ref())
            .await?;
        rows.iter()
            .map(|row| -> Result<(String, String), RegistryError> {
                Ok((row.try_get("key")?, row.try_get("value")?))
            })
            .collect()
    }
}
