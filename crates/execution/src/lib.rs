//! Escrow custody for exchange brokers.
//!
//! This crate provides the lifecycle of ephemeral escrow accounts:
//! - Validation, funding and signer replication from the owner
//! - Authorization through a local key or an external signer
//! - Co-signing of externally built swaps, wrapped in a fee bump
//! - Disposal back into the owner
//! - Recovery of escrows left behind by earlier runs

/// Prelude module for convenient imports.
pub mod prelude;

/// Owner authorization.
pub mod authorization;
/// Transaction building, signing and submission.
pub mod authorizer;
/// Environment-driven configuration.
pub mod config;
/// Error types.
pub mod error;
/// Escrow lifecycle.
pub mod lifecycle;
/// Registry of escrows awaiting disposal.
pub mod registry;
