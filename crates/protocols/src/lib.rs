//! Ledger protocol model for escrow custody.
//!
//! This crate provides:
//! - Operations and transactions as submitted to the ledger
//! - Network identifiers and transaction hashing
//! - Contract-invocation authorization entries and their signing hashes
//! - The wire codec used to exchange envelopes with external signers
//! - The `LedgerGateway` seam for account lookup and submission

/// Transaction builder.
pub mod builder;
/// Wire encoding of envelopes.
pub mod codec;
/// Ledger gateway trait.
pub mod gateway;
/// Network passphrases and ids.
pub mod network;
/// Ledger operations.
pub mod operation;
/// Prelude module for convenient imports.
pub mod prelude;
/// Contract invocation authorization.
pub mod soroban;
/// Transactions, envelopes and signatures.
pub mod transaction;

use borsh::BorshSerialize;

/// Canonical byte form used for hashing and the wire codec.
pub(crate) fn canonical_bytes<T: BorshSerialize>(value: &T) -> Vec<u8> {
    borsh::to_vec(value).expect("serializing into a Vec cannot fail")
}
