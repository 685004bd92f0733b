//! Disposal of escrows, including ones left behind by earlier runs.

use super::{DisposalData, EscrowEvent, EscrowEventType, EventData};
use crate::authorization::AuthorizationProvider;
use crate::authorizer::TransactionAuthorizer;
use crate::config::EscrowConfig;
use crate::error::EscrowError;
use crate::registry::ObsoleteEscrowRegistry;
use mediator_domain::{AccountId, Amount, Keypair};
use mediator_protocols::prelude::*;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of disposing one registered escrow.
#[derive(Debug)]
pub struct DisposalOutcome {
    /// Escrow address.
    pub escrow: AccountId,
    /// Transaction hash on success.
    pub result: Result<String, EscrowError>,
}

impl DisposalOutcome {
    /// Whether the escrow is gone, either merged now or already absent.
    pub fn is_cleared(&self) -> bool {
        matches!(self.result, Ok(_) | Err(EscrowError::EscrowNotFound(_)))
    }
}

/// Disposes every escrow the registry records for `owner`, one at a time.
///
/// No live escrow instance is needed: escrow keys are not held, so each
/// disposal is sourced by the owner and authorized through its signers,
/// which every escrow carries. A failed disposal does not stop the rest.
pub async fn dispose_obsolete_escrows(
    owner: &AccountId,
    authorization: AuthorizationProvider,
    registry: &ObsoleteEscrowRegistry,
    gateway: Arc<dyn LedgerGateway>,
    config: &EscrowConfig,
) -> Result<Vec<DisposalOutcome>, EscrowError> {
    let authorizer = TransactionAuthorizer::new(config, authorization, gateway);
    let mut events = Vec::new();
    dispose_registered(&authorizer, registry, owner, None, &mut events).await
}

pub(crate) async fn dispose_registered(
    authorizer: &TransactionAuthorizer,
    registry: &ObsoleteEscrowRegistry,
    owner: &AccountId,
    held: Option<&Keypair>,
    events: &mut Vec<EscrowEvent>,
) -> Result<Vec<DisposalOutcome>, EscrowError> {
    let escrows = registry.escrows_of(owner).await?;
    info!(owner = %owner, count = escrows.len(), "Disposing obsolete escrows");

    let mut outcomes = Vec::with_capacity(escrows.len());
    for escrow in escrows {
        let key = held.filter(|k| k.public_key() == escrow);
        let result = dispose_escrow(authorizer, registry, owner, &escrow, key, events).await;
        if let Err(e) = &result {
            warn!(escrow = %escrow, owner = %owner, error = %e, "Escrow disposal failed");
        }
        outcomes.push(DisposalOutcome { escrow, result });
    }

    info!(
        owner = %owner,
        total = outcomes.len(),
        cleared = outcomes.iter().filter(|o| o.is_cleared()).count(),
        "Obsolete escrow disposal completed"
    );
    Ok(outcomes)
}

/// Returns every issued balance of `escrow` to `owner`, removes its
/// trustlines and merges it into `owner`.
///
/// With the escrow key the escrow is the source. Without it the owner is
/// the source and every operation names the escrow explicitly.
pub(crate) async fn dispose_escrow(
    authorizer: &TransactionAuthorizer,
    registry: &ObsoleteEscrowRegistry,
    owner: &AccountId,
    escrow: &AccountId,
    key: Option<&Keypair>,
    events: &mut Vec<EscrowEvent>,
) -> Result<String, EscrowError> {
    let gateway = authorizer.gateway();
    let Some(account) = gateway.load_account(escrow).await? else {
        registry.unregister(escrow).await?;
        events.push(EscrowEvent::new(
            EscrowEventType::Vanished,
            *escrow,
            *owner,
            EventData::None,
        ));
        return Err(EscrowError::EscrowNotFound(*escrow));
    };
    if !account.has_signer(owner) {
        return Err(EscrowError::NotMediatorFor(*owner));
    }

    let mut operations = Vec::new();
    let mut returned = Vec::new();
    for balance in account.issued_balances() {
        let amount = balance
            .amount()
            .map_err(|e| EscrowError::amount("balance", e))?;
        if amount.is_positive() {
            operations.push(Operation::payment(*owner, balance.asset.clone(), amount));
            returned.push((balance.asset.clone(), amount));
        }
        operations.push(Operation::change_trust(balance.asset.clone(), Amount::ZERO));
    }
    operations.push(Operation::account_merge(*owner));

    let source = match key {
        Some(_) => account,
        None => {
            operations = operations
                .into_iter()
                .map(|op| op.with_source(*escrow))
                .collect();
            gateway
                .load_account(owner)
                .await?
                .ok_or(EscrowError::OwnerNotFound(*owner))?
        }
    };

    let tx = authorizer.build(&source, operations, Memo::None)?;
    let envelope = authorizer.sign(tx, owner, key).await?;
    let data = EventData::Disposal(DisposalData {
        returned,
        owner_sourced: key.is_none(),
    });
    match authorizer.submit(&envelope, "dispose").await {
        Ok(hash) => {
            // The merge already landed; a stale entry clears on the next attempt.
            if let Err(e) = registry.unregister(escrow).await {
                warn!(escrow = %escrow, error = %e, "Failed to unregister disposed escrow");
            }
            info!(escrow = %escrow, owner = %owner, hash = %hash, "Escrow disposed");
            events.push(
                EscrowEvent::new(EscrowEventType::Disposed, *escrow, *owner, data)
                    .with_tx_hash(hash.clone()),
            );
            Ok(hash)
        }
        Err(e) => {
            events.push(EscrowEvent::new(
                EscrowEventType::DisposeFailed,
                *escrow,
                *owner,
                EventData::Failure(e.to_string()),
            ));
            Err(e)
        }
    }
}
