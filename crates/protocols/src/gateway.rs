//! Ledger gateway trait.

use crate::transaction::TransactionEnvelope;
use async_trait::async_trait;
use mediator_domain::{AccountId, AccountSnapshot};
use thiserror::Error;

/// Transport-level gateway failures. A rejected transaction is not an error
/// here; it is reported through [`SubmitResult::successful`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The ledger could not be reached or answered garbage.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a transaction submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResult {
    /// Whether the ledger applied the transaction.
    pub successful: bool,
    /// Hex transaction hash.
    pub hash: String,
    /// Ledger-reported reason when rejected.
    pub error: Option<String>,
}

impl SubmitResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(hash: String) -> Self {
        Self {
            successful: true,
            hash,
            error: None,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failure(hash: String, error: String) -> Self {
        Self {
            successful: false,
            hash,
            error: Some(error),
        }
    }
}

/// Account lookup and transaction submission.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Loads an account; `None` when it does not exist.
    async fn load_account(
        &self,
        address: &AccountId,
    ) -> Result<Option<AccountSnapshot>, GatewayError>;

    /// Submits a signed envelope.
    async fn submit_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SubmitResult, GatewayError>;
}
