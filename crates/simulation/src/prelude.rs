//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust
//! use mediator_simulation::prelude::*;
//! ```

pub use crate::ledger::{MemoryLedger, NEW_ACCOUNT_SEQUENCE};
pub use crate::state::{AccountEntry, Trustline};
