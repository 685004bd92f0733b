//! Lifecycle events for escrow tracking.

use mediator_domain::{AccountId, Amount, Asset};
use serde::{Deserialize, Serialize};

/// Type of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowEventType {
    /// Escrow address recorded in the registry.
    Registered,
    /// Escrow funded and configured on the ledger.
    Initialized,
    /// Initialization transaction rejected.
    InitFailed,
    /// Assets returned and escrow merged into its owner.
    Disposed,
    /// Disposal transaction rejected.
    DisposeFailed,
    /// Escrow already gone from the ledger; registry entry dropped.
    Vanished,
}

/// A lifecycle event for an escrow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowEvent {
    /// Event ID.
    pub id: String,
    /// Event type.
    pub event_type: EscrowEventType,
    /// Escrow address.
    pub escrow: AccountId,
    /// Owner address.
    pub owner: AccountId,
    /// Transaction hash.
    pub tx_hash: Option<String>,
    /// Timestamp.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Event-specific data.
    pub data: EventData,
}

impl EscrowEvent {
    /// Creates a new lifecycle event.
    pub fn new(
        event_type: EscrowEventType,
        escrow: AccountId,
        owner: AccountId,
        data: EventData,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            escrow,
            owner,
            tx_hash: None,
            timestamp: chrono::Utc::now(),
            data,
        }
    }

    /// Sets the transaction hash.
    #[must_use]
    pub fn with_tx_hash(mut self, hash: impl Into<String>) -> Self {
        self.tx_hash = Some(hash.into());
        self
    }
}

/// Event-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventData {
    /// No extra data.
    None,
    /// Funding data.
    Funding(FundingData),
    /// Disposal data.
    Disposal(DisposalData),
    /// Failure reason.
    Failure(String),
}

/// Data for initialization events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingData {
    /// Asset handed to the escrow.
    pub selling_asset: Asset,
    /// Asset the escrow will receive.
    pub buying_asset: Asset,
    /// Amount handed to the escrow.
    pub selling_amount: Amount,
    /// Native amount locked for reserves and fees.
    pub reserve_amount: Amount,
    /// Signers replicated from the owner.
    pub signer_count: usize,
}

/// Data for disposal events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisposalData {
    /// Issued balances returned to the owner.
    pub returned: Vec<(Asset, Amount)>,
    /// Whether the owner paid the fees because no escrow key was held.
    pub owner_sourced: bool,
}
