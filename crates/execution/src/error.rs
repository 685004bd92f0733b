//! Errors raised by the escrow lifecycle.

use mediator_data::RegistryError;
use mediator_domain::{AccountId, AmountError, InvalidParameter, KeyError};
use mediator_protocols::prelude::{BuildError, CodecError, GatewayError};
use thiserror::Error;

/// Every failure the escrow lifecycle can report.
#[derive(Debug, Error)]
pub enum EscrowError {
    /// Malformed owner, asset or amount.
    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameter),

    /// The owner cannot cover what the escrow needs.
    #[error("insufficient balance: {0}")]
    InsufficientBalance(&'static str),

    /// The owner account does not exist.
    #[error("owner account {0} not found")]
    OwnerNotFound(AccountId),

    /// The escrow account does not exist.
    #[error("escrow account {0} not found")]
    EscrowNotFound(AccountId),

    /// The owner is not a signer of the escrow.
    #[error("escrow is not a mediator for {0}")]
    NotMediatorFor(AccountId),

    /// The ledger rejected a transaction.
    #[error("{purpose} transaction {hash} failed: {reason}")]
    SubmissionFailed {
        purpose: &'static str,
        hash: String,
        reason: String,
    },

    /// The authorization provider returned nothing usable.
    #[error("failed to sign: {0}")]
    FailedToSign(String),

    /// The authorization provider was constructed with bad arguments.
    #[error("invalid authorization parameter: {0}")]
    InvalidAuthorizationParam(String),

    /// A lifecycle call was made in the wrong state.
    #[error("invalid escrow state: {0}")]
    InvalidState(String),

    /// An externally built transaction contains an operation that is not a swap.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl EscrowError {
    /// Stable numeric code.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidParameter(_) => 1001,
            Self::InsufficientBalance(_) => 1002,
            Self::OwnerNotFound(_) => 1003,
            Self::EscrowNotFound(_) => 1004,
            Self::NotMediatorFor(_) => 1005,
            Self::SubmissionFailed { .. } => 1006,
            Self::FailedToSign(_) => 1007,
            Self::InvalidAuthorizationParam(_) => 1008,
            Self::InvalidState(_) => 1009,
            Self::UnsupportedOperation(_) => 1010,
            Self::Registry(_) => 1011,
            Self::Gateway(_) => 1012,
            Self::Codec(_) => 1013,
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter(InvalidParameter::new(field, reason))
    }

    pub(crate) fn amount(field: &str, error: AmountError) -> Self {
        Self::invalid(field, error.to_string())
    }

    pub(crate) fn account(field: &str, error: KeyError) -> Self {
        Self::invalid(field, error.to_string())
    }
}

impl From<BuildError> for EscrowError {
    fn from(error: BuildError) -> Self {
        Self::InvalidState(error.to_string())
    }
}
