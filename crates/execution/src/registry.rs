//! Obsolete escrow registry.
//!
//! Every escrow is recorded as `prefix + escrow address -> owner address`
//! before it is funded and forgotten once it is merged back. Entries that
//! survive a crash let the owner find and dispose its leftover escrows.

use crate::error::EscrowError;
use mediator_data::RegistryStore;
use mediator_domain::AccountId;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Persistent record of escrows whose disposal has not completed.
#[derive(Clone)]
pub struct ObsoleteEscrowRegistry {
    store: Arc<dyn RegistryStore>,
    prefix: String,
}

impl fmt::Debug for ObsoleteEscrowRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObsoleteEscrowRegistry")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl ObsoleteEscrowRegistry {
    /// Registry over `store`, keying entries as `<prefix><escrow address>`.
    pub fn new(store: Arc<dyn RegistryStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn key(&self, escrow: &AccountId) -> String {
        format!("{}{escrow}", self.prefix)
    }

    /// Records `owner` as the owner of `escrow`, replacing any earlier entry.
    pub async fn register(&self, escrow: &AccountId, owner: &AccountId) -> Result<(), EscrowError> {
        debug!(escrow = %escrow, owner = %owner, "Registering escrow");
        self.store
            .set(&self.key(escrow), &owner.to_string())
            .await?;
        Ok(())
    }

    /// Drops the entry for `escrow`. Missing entries are not an error.
    pub async fn unregister(&self, escrow: &AccountId) -> Result<(), EscrowError> {
        debug!(escrow = %escrow, "Unregistering escrow");
        self.store.remove(&self.key(escrow)).await?;
        Ok(())
    }

    /// Owner recorded for `escrow`. Unparseable values read as absent.
    pub async fn owner_of(&self, escrow: &AccountId) -> Result<Option<AccountId>, EscrowError> {
        let value = self.store.get(&self.key(escrow)).await?;
        Ok(value.and_then(|raw| AccountId::parse(&raw).ok()))
    }

    /// Escrows recorded for `owner`, ordered by address.
    pub async fn escrows_of(&self, owner: &AccountId) -> Result<Vec<AccountId>, EscrowError> {
        let mut escrows = Vec::new();
        for (key, value) in self.store.entries().await? {
            let Some(address) = key.strip_prefix(&self.prefix) else {
                continue;
            };
            if AccountId::parse(&value).ok().as_ref() != Some(owner) {
                continue;
            }
            match AccountId::parse(address) {
                Ok(escrow) => escrows.push(escrow),
                Err(e) => warn!(key = %key, error = %e, "Skipping malformed registry key"),
            }
        }
        Ok(escrows)
    }

    /// Whether any escrow is still recorded for `owner`.
    pub async fn has_escrows_of(&self, owner: &AccountId) -> Result<bool, EscrowError> {
        Ok(!self.escrows_of(owner).await?.is_empty())
    }
}
