//! In-memory ledger for offline runs and tests.
//!
//! `MemoryLedger` implements `LedgerGateway` and applies submitted
//! transactions the way the real ledger does for the operations escrow
//! custody uses:
//! - sequence numbers and per-transaction fees
//! - minimum balances from sub-entry counts
//! - trustline limits and issuer semantics
//! - signature weights against low/medium/high thresholds
//!
//! A transaction applies atomically or not at all.

mod apply;

/// Prelude module for convenient imports.
pub mod prelude;

/// Ledger gateway implementation.
pub mod ledger;
/// Simulated account state.
pub mod state;
