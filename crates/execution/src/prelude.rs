//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use mediator_execution::prelude::*;
//! ```

// Authorization
pub use crate::authorization::{
    AuthorizationProvider, CallbackOutput, SignCallback, SignPayload, SignedPayload,
};

// Authorizer
pub use crate::authorizer::TransactionAuthorizer;

// Config
pub use crate::config::{DEFAULT_HOME_DOMAIN, DEFAULT_REGISTRY_PREFIX, EscrowConfig};

// Errors
pub use crate::error::EscrowError;

// Lifecycle
pub use crate::lifecycle::{
    DisposalData, DisposalOutcome, EscrowAccount, EscrowEvent, EscrowEventType, EscrowRequest,
    EscrowState, EventData, FundingData, SUBENTRY_RESERVE, dispose_obsolete_escrows,
    escrow_reserve,
};

// Registry
pub use crate::registry::ObsoleteEscrowRegistry;
