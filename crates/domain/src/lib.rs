//! Core value types for ephemeral escrow accounts.
//!
//! - Fixed-point amounts with exact decimal conversion
//! - Asset references (native and issued)
//! - Account identifiers, secret seeds and signing keypairs
//! - Read-only account snapshots as reported by the ledger

pub mod account;
pub mod amount;
pub mod asset;
pub mod error;
pub mod keys;

pub use account::{AccountSnapshot, Balance, Signer, Thresholds};
pub use amount::{Amount, AmountCodec, AmountError};
pub use asset::Asset;
pub use error::{InvalidParameter, KeyError};
pub use keys::{AccountId, Keypair, SecretSeed};
