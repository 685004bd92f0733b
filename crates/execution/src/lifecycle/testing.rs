//! Shared fixtures for lifecycle tests.

use super::{EscrowAccount, EscrowRequest};
use crate::authorization::{AuthorizationProvider, CallbackOutput, SignPayload};
use crate::config::EscrowConfig;
use crate::registry::ObsoleteEscrowRegistry;
use mediator_data::MemoryStore;
use mediator_domain::{AccountId, Amount, Asset, Keypair, Signer, Thresholds};
use mediator_protocols::prelude::*;
use mediator_simulation::prelude::*;
use std::sync::Arc;

pub(crate) struct Harness {
    pub ledger: MemoryLedger,
    pub store: MemoryStore,
    pub registry: ObsoleteEscrowRegistry,
    pub config: EscrowConfig,
    pub aqua: Asset,
}

impl Harness {
    pub async fn new() -> Self {
        let config = EscrowConfig::default();
        let ledger = MemoryLedger::new(config.network());
        let issuer = Keypair::random();
        ledger
            .fund_account(issuer.public_key(), Amount::from_units(1_000))
            .await;
        let store = MemoryStore::new();
        let registry =
            ObsoleteEscrowRegistry::new(Arc::new(store.clone()), config.registry_prefix.clone());
        Self {
            ledger,
            store,
            registry,
            config,
            aqua: Asset::issued("AQUA", issuer.public_key()).unwrap(),
        }
    }

    pub fn gateway(&self) -> Arc<dyn LedgerGateway> {
        Arc::new(self.ledger.clone())
    }

    /// Single-key owner holding `xlm` and an empty AQUA trustline.
    pub async fn owner(&self, xlm: i64) -> Keypair {
        let owner = Keypair::random();
        self.ledger
            .fund_account(owner.public_key(), Amount::from_units(xlm))
            .await;
        self.ledger
            .set_trustline(&owner.public_key(), self.aqua.clone(), Amount::ZERO)
            .await;
        owner
    }

    /// Owner whose master key weighs 0, with two weight-2 cosigners and
    /// thresholds 2/3/4.
    pub async fn multisig_owner(&self, xlm: i64) -> (AccountId, Vec<Keypair>) {
        let owner = self.owner(xlm).await.public_key();
        let cosigners = vec![Keypair::random(), Keypair::random()];
        let signers: Vec<Signer> = cosigners
            .iter()
            .map(|k| Signer {
                key: k.public_key(),
                weight: 2,
            })
            .collect();
        self.ledger
            .update_account(&owner, |entry| {
                entry.master_weight = 0;
                entry.thresholds = Thresholds::new(2, 3, 4);
                entry.signers = signers;
            })
            .await;
        (owner, cosigners)
    }

    pub fn escrow(
        &self,
        owner: &Keypair,
        selling: &str,
        buying: &str,
        amount: &str,
    ) -> EscrowAccount {
        self.escrow_with(
            EscrowRequest::new(owner.public_key().to_string(), selling, buying, amount),
            AuthorizationProvider::from_keypair(owner.clone()),
        )
    }

    pub fn escrow_with(
        &self,
        request: EscrowRequest,
        provider: AuthorizationProvider,
    ) -> EscrowAccount {
        EscrowAccount::create(
            request,
            provider,
            self.gateway(),
            self.registry.clone(),
            &self.config,
        )
        .unwrap()
    }

    pub async fn last_operations(&self) -> Vec<Operation> {
        let submissions = self.ledger.submissions().await;
        submissions
            .last()
            .map(|e| e.inner().tx.operations.clone())
            .unwrap_or_default()
    }
}

/// External signer that signs transactions with every key in `keys`.
pub(crate) fn cosigning_provider(keys: Vec<Keypair>) -> AuthorizationProvider {
    AuthorizationProvider::from_callback(move |payload: SignPayload| {
        let keys = keys.clone();
        async move {
            match payload {
                SignPayload::Transaction {
                    mut envelope,
                    network,
                } => {
                    for key in &keys {
                        envelope.sign(key, &network);
                    }
                    Some(CallbackOutput::Envelope(envelope))
                }
                SignPayload::Hash(_) => None,
            }
        }
    })
}
