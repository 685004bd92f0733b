//! Transaction builder.

use crate::operation::Operation;
use crate::transaction::{Memo, Transaction};
use mediator_domain::AccountId;
use thiserror::Error;

/// Maximum operations per transaction.
pub const MAX_OPERATIONS: usize = 100;

/// Errors raised while assembling a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// No operations were added.
    #[error("transaction has no operations")]
    Empty,
    /// Too many operations for one transaction.
    #[error("transaction has {0} operations, at most {MAX_OPERATIONS} allowed")]
    TooManyOperations(usize),
    /// Fee does not fit the fee field.
    #[error("fee overflow for {0} operations")]
    FeeOverflow(usize),
}

/// Builds transactions with a flat per-operation fee and no time bounds.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    source: AccountId,
    sequence: i64,
    fee_per_operation: u32,
    memo: Memo,
    operations: Vec<Operation>,
}

impl TransactionBuilder {
    /// Starts a transaction for `source` whose current sequence is `current_sequence`.
    #[must_use]
    pub fn new(source: AccountId, current_sequence: i64, fee_per_operation: u32) -> Self {
        Self {
            source,
            sequence: current_sequence + 1,
            fee_per_operation,
            memo: Memo::None,
            operations: Vec::new(),
        }
    }

    /// Appends an operation.
    #[must_use]
    pub fn add_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Appends several operations, keeping their order.
    #[must_use]
    pub fn add_operations(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.operations.extend(operations);
        self
    }

    /// Sets the memo.
    #[must_use]
    pub fn memo(mut self, memo: Memo) -> Self {
        self.memo = memo;
        self
    }

    /// Finishes the transaction.
    pub fn build(self) -> Result<Transaction, BuildError> {
        let count = self.operations.len();
        if count == 0 {
            return Err(BuildError::Empty);
        }
        if count > MAX_OPERATIONS {
            return Err(BuildError::TooManyOperations(count));
        }
        let fee = u32::try_from(count)
            .ok()
            .and_then(|n| n.checked_mul(self.fee_per_operation))
            .ok_or(BuildError::FeeOverflow(count))?;

        Ok(Transaction {
            source: self.source,
            fee,
            sequence: self.sequence,
            time_bounds: None,
            memo: self.memo,
            operations: self.operations,
        })
    }
}
