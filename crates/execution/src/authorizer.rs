//! Transaction building, signing and submission.

use crate::authorization::AuthorizationProvider;
use crate::config::EscrowConfig;
use crate::error::EscrowError;
use mediator_domain::{AccountId, AccountSnapshot, Keypair};
use mediator_protocols::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Contract functions accepted in externally built transactions.
const SWAP_FUNCTION_PREFIX: &str = "swap";

/// Turns operation batches into signed, submitted transactions.
#[derive(Clone)]
pub struct TransactionAuthorizer {
    /// Network every signature commits to.
    network: Network,
    /// Fee per operation in stroops.
    fee_per_operation: u32,
    /// Minimum fee-bump fee in stroops.
    fee_bump_fee: i64,
    /// Owner authorization.
    provider: AuthorizationProvider,
    /// Ledger access.
    gateway: Arc<dyn LedgerGateway>,
}

impl TransactionAuthorizer {
    /// Creates a new authorizer.
    pub fn new(
        config: &EscrowConfig,
        provider: AuthorizationProvider,
        gateway: Arc<dyn LedgerGateway>,
    ) -> Self {
        Self {
            network: config.network(),
            fee_per_operation: config.fee_per_operation,
            fee_bump_fee: config.fee_bump_fee,
            provider,
            gateway,
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn provider(&self) -> &AuthorizationProvider {
        &self.provider
    }

    pub fn gateway(&self) -> &Arc<dyn LedgerGateway> {
        &self.gateway
    }

    /// Builds a transaction for `source` with the flat per-operation fee.
    pub fn build(
        &self,
        source: &AccountSnapshot,
        operations: Vec<Operation>,
        memo: Memo,
    ) -> Result<Transaction, EscrowError> {
        Ok(
            TransactionBuilder::new(source.account_id, source.sequence, self.fee_per_operation)
                .add_operations(operations)
                .memo(memo)
                .build()?,
        )
    }

    /// Signs with the ephemeral key when held, then with the owner's
    /// provider when the owner is the transaction source.
    pub async fn sign(
        &self,
        tx: Transaction,
        owner: &AccountId,
        ephemeral: Option<&Keypair>,
    ) -> Result<TransactionEnvelope, EscrowError> {
        let mut envelope = TransactionEnvelope::new(tx);
        if let Some(keypair) = ephemeral {
            envelope.sign(keypair, &self.network);
        }
        if envelope.source() == owner {
            envelope = self
                .provider
                .authorize_transaction(envelope, &self.network)
                .await?;
        }
        Ok(envelope)
    }

    /// Submits an envelope and returns its hash.
    pub async fn submit(
        &self,
        envelope: &TransactionEnvelope,
        purpose: &'static str,
    ) -> Result<String, EscrowError> {
        debug!(purpose, hash = %envelope.hash_hex(&self.network), "Submitting transaction");
        let result = self.gateway.submit_transaction(envelope).await?;
        if result.successful {
            info!(purpose, hash = %result.hash, "Transaction submitted");
            return Ok(result.hash);
        }

        let reason = result.error.unwrap_or_else(|| "unknown error".to_string());
        warn!(purpose, hash = %result.hash, reason = %reason, "Transaction rejected");
        Err(EscrowError::SubmissionFailed {
            purpose,
            hash: result.hash,
            reason,
        })
    }

    /// Co-signs an externally built swap transaction for `owner`.
    ///
    /// Auth entries bound to the owner get detached signatures, the
    /// transaction is signed, and the result is wrapped in a fee bump paid
    /// and signed by the owner. Returns the wire form of the fee bump.
    pub async fn authorize_external(
        &self,
        wire: &str,
        owner: &AccountId,
    ) -> Result<String, EscrowError> {
        let TransactionEnvelope::Tx(mut signed) = decode_envelope(wire)? else {
            return Err(EscrowError::UnsupportedOperation(
                "fee-bump envelopes cannot be co-signed".into(),
            ));
        };

        let tx_source = signed.tx.source;
        for op in &signed.tx.operations {
            check_swap(op, &tx_source, owner)?;
        }

        let mut attached = 0usize;
        for op in &mut signed.tx.operations {
            let OperationBody::InvokeHostFunction { auth, .. } = &mut op.body else {
                continue;
            };
            for entry in auth.iter_mut() {
                if entry.address() != Some(owner) || entry.is_signed() {
                    continue;
                }
                let Some(hash) = entry.signing_hash(&self.network) else {
                    continue;
                };
                let signature = self.provider.authorize_hash(hash).await?;
                if signature.public_key != *owner {
                    return Err(EscrowError::FailedToSign(format!(
                        "auth entry for {owner} signed by {}",
                        signature.public_key
                    )));
                }
                entry.attach_signature(signature);
                attached += 1;
            }
        }

        let operations = signed.tx.operations.len();
        let envelope = self
            .provider
            .authorize_transaction(TransactionEnvelope::Tx(signed), &self.network)
            .await?;
        let TransactionEnvelope::Tx(inner) = envelope else {
            return Err(EscrowError::FailedToSign(
                "signer wrapped the transaction itself".into(),
            ));
        };

        let minimum = (operations as i64 + 1) * i64::from(self.fee_per_operation);
        let bump = TransactionEnvelope::FeeBump(FeeBumpEnvelope {
            tx: FeeBumpTransaction {
                fee_source: *owner,
                fee: self.fee_bump_fee.max(minimum),
                inner,
            },
            signatures: Vec::new(),
        });
        let bump = self
            .provider
            .authorize_transaction(bump, &self.network)
            .await?;

        info!(
            owner = %owner,
            operations,
            auth_entries = attached,
            hash = %bump.hash_hex(&self.network),
            "External transaction co-signed"
        );
        Ok(encode_envelope(&bump))
    }
}

fn check_swap(op: &Operation, tx_source: &AccountId, owner: &AccountId) -> Result<(), EscrowError> {
    let source = op.effective_source(tx_source);
    if source != *owner {
        return Err(EscrowError::UnsupportedOperation(format!(
            "{} acts for {source}, not the owner",
            op.kind()
        )));
    }

    let destination = match &op.body {
        OperationBody::PathPaymentStrictSend { destination, .. }
        | OperationBody::PathPaymentStrictReceive { destination, .. } => Some(destination),
        OperationBody::ManageSellOffer { .. } | OperationBody::ManageBuyOffer { .. } => None,
        OperationBody::InvokeHostFunction { call, .. }
            if call.function.starts_with(SWAP_FUNCTION_PREFIX) =>
        {
            None
        }
        _ => {
            return Err(EscrowError::UnsupportedOperation(format!(
                "{} is not a swap",
                op.kind()
            )));
        }
    };

    match destination {
        Some(destination) if destination != owner => Err(EscrowError::UnsupportedOperation(
            format!("{} pays {destination}, not the owner", op.kind()),
        )),
        _ => Ok(()),
    }
}
