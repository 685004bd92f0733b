//! Escrow lifecycle.
//!
//! Tracks the complete lifecycle of an escrow account:
//! - Validation and funding
//! - Signer replication from the owner
//! - Disposal back into the owner
//! - Recovery of escrows left behind by earlier runs

mod escrow;
mod events;
mod recovery;
#[cfg(test)]
mod testing;

pub use escrow::*;
pub use events::*;
pub use recovery::*;
