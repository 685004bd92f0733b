//! In-memory ledger implementing [`LedgerGateway`].
//!
//! Submissions are validated and applied on a working copy of the account
//! set; the copy replaces the live state only when every check passes, so a
//! failed transaction leaves no trace apart from the recorded attempt.

use crate::apply::Applier;
use crate::state::{AccountEntry, Trustline};
use async_trait::async_trait;
use mediator_domain::{AccountId, AccountSnapshot, Amount, Asset};
use mediator_protocols::prelude::*;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Sequence number given to accounts created by a transaction.
pub const NEW_ACCOUNT_SEQUENCE: i64 = 1 << 32;

#[derive(Debug, Default)]
struct LedgerState {
    accounts: BTreeMap<AccountId, AccountEntry>,
    submissions: Vec<TransactionEnvelope>,
    rejections: VecDeque<String>,
}

/// Shared in-memory ledger. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    network: Network,
    base_reserve: Amount,
    state: Arc<RwLock<LedgerState>>,
}

impl MemoryLedger {
    /// Empty ledger with a 0.5 unit base reserve.
    #[must_use]
    pub fn new(network: Network) -> Self {
        Self {
            network,
            base_reserve: Amount::from_minor(5_000_000),
            state: Arc::new(RwLock::new(LedgerState::default())),
        }
    }

    /// Overrides the per-entry reserve.
    #[must_use]
    pub fn with_base_reserve(mut self, base_reserve: Amount) -> Self {
        self.base_reserve = base_reserve;
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn base_reserve(&self) -> Amount {
        self.base_reserve
    }

    /// Creates a single-key account holding `native`, replacing any existing one.
    pub async fn fund_account(&self, id: AccountId, native: Amount) {
        let mut state = self.state.write().await;
        state.accounts.insert(id, AccountEntry::new(native, 0));
    }

    /// Mutates an account in place. Returns false when it does not exist.
    pub async fn update_account<F>(&self, id: &AccountId, f: F) -> bool
    where
        F: FnOnce(&mut AccountEntry),
    {
        let mut state = self.state.write().await;
        match state.accounts.get_mut(id) {
            Some(entry) => {
                f(entry);
                true
            }
            None => false,
        }
    }

    /// Sets an unlimited trustline holding `balance`.
    pub async fn set_trustline(&self, id: &AccountId, asset: Asset, balance: Amount) -> bool {
        self.update_account(id, |entry| {
            entry.trustlines.insert(
                asset,
                Trustline {
                    balance: balance.minor(),
                    limit: Amount::MAX.minor(),
                },
            );
        })
        .await
    }

    /// Raw ledger entry for `id`.
    pub async fn account(&self, id: &AccountId) -> Option<AccountEntry> {
        self.state.read().await.accounts.get(id).cloned()
    }

    pub async fn exists(&self, id: &AccountId) -> bool {
        self.state.read().await.accounts.contains_key(id)
    }

    /// Every envelope submitted so far, accepted or not.
    pub async fn submissions(&self) -> Vec<TransactionEnvelope> {
        self.state.read().await.submissions.clone()
    }

    /// Makes the next submission fail with `reason` without applying it.
    pub async fn reject_next_submission(&self, reason: impl Into<String>) {
        self.state.write().await.rejections.push_back(reason.into());
    }
}

#[async_trait]
impl LedgerGateway for MemoryLedger {
    async fn load_account(&self, id: &AccountId) -> Result<Option<AccountSnapshot>, GatewayError> {
        let state = self.state.read().await;
        Ok(state.accounts.get(id).map(|entry| entry.snapshot(id)))
    }

    async fn submit_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SubmitResult, GatewayError> {
        let hash = envelope.hash_hex(&self.network);
        let mut state = self.state.write().await;
        state.submissions.push(envelope.clone());

        if let Some(reason) = state.rejections.pop_front() {
            debug!(%hash, %reason, "Submission rejected");
            return Ok(SubmitResult::failure(hash, reason));
        }

        let mut working = state.accounts.clone();
        match Applier::new(&mut working, &self.network, self.base_reserve).apply(envelope) {
            Ok(()) => {
                state.accounts = working;
                info!(%hash, source = %envelope.source(), "Transaction applied");
                Ok(SubmitResult::success(hash))
            }
            Err(e) => {
                let reason = format!("{e:#}");
                debug!(%hash, %reason, "Transaction failed");
                Ok(SubmitResult::failure(hash, reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediator_domain::{Keypair, Signer, Thresholds};

    fn ledger() -> MemoryLedger {
        MemoryLedger::new(Network::testnet())
    }

    async fn signed(
        ledger: &MemoryLedger,
        source: &Keypair,
        operations: Vec<Operation>,
        signers: &[&Keypair],
    ) -> TransactionEnvelope {
        let snapshot = ledger
            .load_account(&source.public_key())
            .await
            .unwrap()
            .unwrap();
        let tx = TransactionBuilder::new(source.public_key(), snapshot.sequence, 100)
            .add_operations(operations)
            .build()
            .unwrap();
        let mut envelope = TransactionEnvelope::new(tx);
        for signer in signers {
            envelope.sign(signer, ledger.network());
        }
        envelope
    }

    #[tokio::test]
    async fn test_create_account_and_pay() {
        let ledger = ledger();
        let alice = Keypair::random();
        let bob = Keypair::random();
        ledger.fund_account(alice.public_key(), Amount::from_units(100)).await;

        let envelope = signed(
            &ledger,
            &alice,
            vec![Operation::create_account(bob.public_key(), Amount::from_units(10))],
            &[&alice],
        )
        .await;
        let result = ledger.submit_transaction(&envelope).await.unwrap();
        assert!(result.successful, "{:?}", result.error);

        let bob_entry = ledger.account(&bob.public_key()).await.unwrap();
        assert_eq!(bob_entry.native, Amount::from_units(10).minor());
        assert_eq!(bob_entry.sequence, NEW_ACCOUNT_SEQUENCE);

        let alice_entry = ledger.account(&alice.public_key()).await.unwrap();
        assert_eq!(alice_entry.native, Amount::from_units(90).minor() - 100);
        assert_eq!(alice_entry.sequence, 1);
    }

    #[tokio::test]
    async fn test_unsigned_transaction_fails_without_side_effects() {
        let ledger = ledger();
        let alice = Keypair::random();
        let bob = Keypair::random();
        ledger.fund_account(alice.public_key(), Amount::from_units(100)).await;

        let envelope = signed(
            &ledger,
            &alice,
            vec![Operation::create_account(bob.public_key(), Amount::from_units(10))],
            &[&bob],
        )
        .await;
        let result = ledger.submit_transaction(&envelope).await.unwrap();
        assert!(!result.successful);
        assert!(!ledger.exists(&bob.public_key()).await);
        assert_eq!(
            ledger.account(&alice.public_key()).await.unwrap().native,
            Amount::from_units(100).minor()
        );
        assert_eq!(ledger.submissions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_bad_sequence_fails() {
        let ledger = ledger();
        let alice = Keypair::random();
        ledger.fund_account(alice.public_key(), Amount::from_units(100)).await;

        let envelope = signed(
            &ledger,
            &alice,
            vec![Operation::payment(
                alice.public_key(),
                Asset::Native,
                Amount::from_units(1),
            )],
            &[&alice],
        )
        .await;
        assert!(ledger.submit_transaction(&envelope).await.unwrap().successful);

        let replay = ledger.submit_transaction(&envelope).await.unwrap();
        assert!(!replay.successful);
        assert!(replay.error.unwrap().contains("bad sequence"));
    }

    #[tokio::test]
    async fn test_reserve_is_enforced() {
        let ledger = ledger();
        let alice = Keypair::random();
        let bob = Keypair::random();
        ledger.fund_account(alice.public_key(), Amount::from_units(2)).await;

        let envelope = signed(
            &ledger,
            &alice,
            vec![Operation::create_account(bob.public_key(), Amount::from_units(1))],
            &[&alice],
        )
        .await;
        let result = ledger.submit_transaction(&envelope).await.unwrap();
        assert!(!result.successful);
        assert!(result.error.unwrap().contains("minimum balance"));
    }

    #[tokio::test]
    async fn test_merge_requires_empty_trustlines() {
        let ledger = ledger();
        let issuer = Keypair::random();
        let alice = Keypair::random();
        let bob = Keypair::random();
        let aqua = Asset::issued("AQUA", issuer.public_key()).unwrap();
        ledger.fund_account(alice.public_key(), Amount::from_units(10)).await;
        ledger.fund_account(bob.public_key(), Amount::from_units(10)).await;
        ledger.set_trustline(&alice.public_key(), aqua.clone(), Amount::ZERO).await;

        let merge = signed(
            &ledger,
            &alice,
            vec![Operation::account_merge(bob.public_key())],
            &[&alice],
        )
        .await;
        assert!(!ledger.submit_transaction(&merge).await.unwrap().successful);

        let merge = signed(
            &ledger,
            &alice,
            vec![
                Operation::change_trust(aqua, Amount::ZERO),
                Operation::account_merge(bob.public_key()),
            ],
            &[&alice],
        )
        .await;
        let result = ledger.submit_transaction(&merge).await.unwrap();
        assert!(result.successful, "{:?}", result.error);
        assert!(!ledger.exists(&alice.public_key()).await);
        assert_eq!(
            ledger.account(&bob.public_key()).await.unwrap().native,
            Amount::from_units(20).minor() - 200
        );
    }

    #[tokio::test]
    async fn test_multisig_weights() {
        let ledger = ledger();
        let escrow = Keypair::random();
        let mediator = Keypair::random();
        let owner = Keypair::random();
        ledger.fund_account(escrow.public_key(), Amount::from_units(10)).await;
        ledger
            .update_account(&escrow.public_key(), |entry| {
                entry.master_weight = 0;
                entry.thresholds = Thresholds::new(2, 2, 2);
                entry.signers = vec![
                    Signer {
                        key: mediator.public_key(),
                        weight: 1,
                    },
                    Signer {
                        key: owner.public_key(),
                        weight: 1,
                    },
                ];
            })
            .await;
        let pay = || {
            vec![Operation::payment(
                owner.public_key(),
                Asset::Native,
                Amount::from_units(1),
            )]
        };
        ledger.fund_account(owner.public_key(), Amount::from_units(10)).await;

        let one = signed(&ledger, &escrow, pay(), &[&mediator]).await;
        assert!(!ledger.submit_transaction(&one).await.unwrap().successful);

        let master = signed(&ledger, &escrow, pay(), &[&escrow, &mediator]).await;
        assert!(!ledger.submit_transaction(&master).await.unwrap().successful);

        let both = signed(&ledger, &escrow, pay(), &[&mediator, &owner]).await;
        let result = ledger.submit_transaction(&both).await.unwrap();
        assert!(result.successful, "{:?}", result.error);
    }

    #[tokio::test]
    async fn test_issuer_mints_into_trustline() {
        let ledger = ledger();
        let issuer = Keypair::random();
        let holder = Keypair::random();
        let aqua = Asset::issued("AQUA", issuer.public_key()).unwrap();
        ledger.fund_account(issuer.public_key(), Amount::from_units(10)).await;
        ledger.fund_account(holder.public_key(), Amount::from_units(10)).await;

        let pay = || vec![Operation::payment(holder.public_key(), aqua.clone(), Amount::from_units(5))];
        let envelope = signed(&ledger, &issuer, pay(), &[&issuer]).await;
        assert!(!ledger.submit_transaction(&envelope).await.unwrap().successful);

        ledger
            .set_trustline(&holder.public_key(), aqua.clone(), Amount::ZERO)
            .await;
        let envelope = signed(&ledger, &issuer, pay(), &[&issuer]).await;
        assert!(ledger.submit_transaction(&envelope).await.unwrap().successful);
        let line = ledger.account(&holder.public_key()).await.unwrap().trustlines[&aqua];
        assert_eq!(line.balance, Amount::from_units(5).minor());
    }

    #[tokio::test]
    async fn test_forced_rejection() {
        let ledger = ledger();
        let alice = Keypair::random();
        ledger.fund_account(alice.public_key(), Amount::from_units(10)).await;
        ledger.reject_next_submission("tx_too_late").await;

        let envelope = signed(
            &ledger,
            &alice,
            vec![Operation::payment(
                alice.public_key(),
                Asset::Native,
                Amount::from_units(1),
            )],
            &[&alice],
        )
        .await;
        let result = ledger.submit_transaction(&envelope).await.unwrap();
        assert_eq!(result.error.as_deref(), Some("tx_too_late"));
        assert!(ledger.submit_transaction(&envelope).await.unwrap().successful);
    }
}
