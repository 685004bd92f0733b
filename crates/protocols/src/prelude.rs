//! Prelude module for convenient imports.
//!
//! ```rust
//! use mediator_protocols::prelude::*;
//! ```

pub use crate::builder::{BuildError, TransactionBuilder};
pub use crate::codec::{CodecError, decode_envelope, encode_envelope};
pub use crate::gateway::{GatewayError, LedgerGateway, SubmitResult};
pub use crate::network::Network;
pub use crate::operation::{Operation, OperationBody, Price, SetOptions, ThresholdLevel};
pub use crate::soroban::{
    AddressCredentials, AuthSignature, AuthorizedInvocation, ContractId, Credentials,
    InvokeContractArgs, SorobanAuthorizationEntry,
};
pub use crate::transaction::{
    DecoratedSignature, FeeBumpEnvelope, FeeBumpTransaction, Memo, SignedTransaction,
    Transaction, TransactionEnvelope,
};
