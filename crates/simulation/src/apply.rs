//! Transaction application against a working copy of the ledger.

use crate::ledger::NEW_ACCOUNT_SEQUENCE;
use crate::state::{AccountEntry, Trustline};
use anyhow::{Context, Result, bail, ensure};
use mediator_domain::{AccountId, Amount, Asset};
use mediator_protocols::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Most additional signers an account may carry.
const MAX_SIGNERS: usize = 20;

pub(crate) struct Applier<'a> {
    accounts: &'a mut BTreeMap<AccountId, AccountEntry>,
    network: &'a Network,
    base_reserve: Amount,
    touched: BTreeSet<AccountId>,
}

impl<'a> Applier<'a> {
    pub(crate) fn new(
        accounts: &'a mut BTreeMap<AccountId, AccountEntry>,
        network: &'a Network,
        base_reserve: Amount,
    ) -> Self {
        Self {
            accounts,
            network,
            base_reserve,
            touched: BTreeSet::new(),
        }
    }

    pub(crate) fn apply(mut self, envelope: &TransactionEnvelope) -> Result<()> {
        match envelope {
            TransactionEnvelope::Tx(signed) => self.apply_signed(signed, true)?,
            TransactionEnvelope::FeeBump(bump) => {
                let fee_source = bump.tx.fee_source;
                let hash = bump.tx.hash(self.network);
                self.require_weight(&fee_source, &bump.signatures, &hash, ThresholdLevel::Low)
                    .context("fee bump")?;
                self.charge_fee(&fee_source, bump.tx.fee)?;
                self.apply_signed(&bump.tx.inner, false)?;
            }
        }
        self.check_reserves()
    }

    fn apply_signed(&mut self, signed: &SignedTransaction, charge_fee: bool) -> Result<()> {
        let tx = &signed.tx;
        let hash = tx.hash(self.network);

        let current = self.account(&tx.source)?.sequence;
        ensure!(
            tx.sequence == current + 1,
            "bad sequence {} for {}, expected {}",
            tx.sequence,
            tx.source,
            current + 1
        );
        self.require_weight(&tx.source, &signed.signatures, &hash, ThresholdLevel::Low)?;
        if charge_fee {
            self.charge_fee(&tx.source, i64::from(tx.fee))?;
        }
        self.account_mut(&tx.source)?.sequence = tx.sequence;

        for (index, op) in tx.operations.iter().enumerate() {
            let source = op.effective_source(&tx.source);
            self.require_weight(&source, &signed.signatures, &hash, op.threshold_level())
                .and_then(|()| self.apply_operation(&source, op))
                .with_context(|| format!("operation {index} ({})", op.kind()))?;
        }
        Ok(())
    }

    fn apply_operation(&mut self, source: &AccountId, op: &Operation) -> Result<()> {
        self.touched.insert(*source);
        match &op.body {
            OperationBody::CreateAccount {
                destination,
                starting_balance,
            } => {
                ensure!(
                    !self.accounts.contains_key(destination),
                    "account {destination} already exists"
                );
                ensure!(starting_balance.is_positive(), "starting balance must be positive");
                self.debit(source, &Asset::Native, *starting_balance)?;
                self.accounts.insert(
                    *destination,
                    AccountEntry::new(*starting_balance, NEW_ACCOUNT_SEQUENCE),
                );
                self.touched.insert(*destination);
            }
            OperationBody::Payment {
                destination,
                asset,
                amount,
            } => self.transfer(source, destination, asset, *amount)?,
            OperationBody::PathPaymentStrictSend {
                send_asset,
                send_amount,
                destination,
                dest_asset,
                dest_min,
                ..
            } => {
                ensure!(send_asset == dest_asset, "no liquidity for {send_asset} -> {dest_asset}");
                ensure!(send_amount >= dest_min, "strict send under destination minimum");
                self.transfer(source, destination, send_asset, *send_amount)?;
            }
            OperationBody::PathPaymentStrictReceive {
                send_asset,
                send_max,
                destination,
                dest_asset,
                dest_amount,
                ..
            } => {
                ensure!(send_asset == dest_asset, "no liquidity for {send_asset} -> {dest_asset}");
                ensure!(dest_amount <= send_max, "strict receive over send maximum");
                self.transfer(source, destination, dest_asset, *dest_amount)?;
            }
            OperationBody::ManageSellOffer { .. } | OperationBody::ManageBuyOffer { .. } => {
                bail!("the order book is not simulated")
            }
            OperationBody::ChangeTrust { asset, limit } => self.change_trust(source, asset, *limit)?,
            OperationBody::SetOptions(options) => self.set_options(source, options)?,
            OperationBody::AccountMerge { destination } => {
                ensure!(destination != source, "cannot merge an account into itself");
                self.account(destination)?;
                let merged = self
                    .accounts
                    .remove(source)
                    .with_context(|| format!("account {source} does not exist"))?;
                ensure!(
                    merged.trustlines.is_empty(),
                    "account {source} still has {} trustlines",
                    merged.trustlines.len()
                );
                let target = self.account_mut(destination)?;
                target.native = target
                    .native
                    .checked_add(merged.native)
                    .context("native balance overflow")?;
                self.touched.remove(source);
            }
            OperationBody::InvokeHostFunction { auth, .. } => {
                for entry in auth {
                    ensure!(
                        entry.verify(self.network),
                        "authorization entry for {:?} is not signed",
                        entry.address()
                    );
                }
            }
        }
        Ok(())
    }

    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        asset: &Asset,
        amount: Amount,
    ) -> Result<()> {
        ensure!(amount.is_positive(), "payment amount must be positive");
        self.account(to)?;
        self.debit(from, asset, amount)?;
        self.credit(to, asset, amount)?;
        self.touched.insert(*to);
        Ok(())
    }

    fn debit(&mut self, id: &AccountId, asset: &Asset, amount: Amount) -> Result<()> {
        if asset.issuer() == Some(id) {
            return Ok(());
        }
        let entry = self.account_mut(id)?;
        let balance = match asset {
            Asset::Native => &mut entry.native,
            Asset::Issued { .. } => {
                &mut entry
                    .trustlines
                    .get_mut(asset)
                    .with_context(|| format!("{id} has no trustline for {asset}"))?
                    .balance
            }
        };
        ensure!(*balance >= amount.minor(), "{id} has insufficient {asset}");
        *balance -= amount.minor();
        Ok(())
    }

    fn credit(&mut self, id: &AccountId, asset: &Asset, amount: Amount) -> Result<()> {
        if asset.issuer() == Some(id) {
            return Ok(());
        }
        let entry = self.account_mut(id)?;
        match asset {
            Asset::Native => {
                entry.native = entry
                    .native
                    .checked_add(amount.minor())
                    .context("native balance overflow")?;
            }
            Asset::Issued { .. } => {
                let line = entry
                    .trustlines
                    .get_mut(asset)
                    .with_context(|| format!("{id} has no trustline for {asset}"))?;
                let updated = line
                    .balance
                    .checked_add(amount.minor())
                    .context("trustline balance overflow")?;
                ensure!(updated <= line.limit, "{id} trustline limit exceeded for {asset}");
                line.balance = updated;
            }
        }
        Ok(())
    }

    fn change_trust(&mut self, id: &AccountId, asset: &Asset, limit: Amount) -> Result<()> {
        ensure!(!asset.is_native(), "cannot trust the native asset");
        ensure!(asset.issuer() != Some(id), "issuer cannot trust its own asset");
        ensure!(limit.minor() >= 0, "negative trustline limit");

        let entry = self.account_mut(id)?;
        if limit == Amount::ZERO {
            let line = entry
                .trustlines
                .get(asset)
                .with_context(|| format!("{id} has no trustline for {asset}"))?;
            ensure!(line.balance == 0, "{id} still holds {asset}");
            entry.trustlines.remove(asset);
            return Ok(());
        }

        match entry.trustlines.get_mut(asset) {
            Some(line) => {
                ensure!(limit.minor() >= line.balance, "limit below current balance");
                line.limit = limit.minor();
            }
            None => {
                entry.trustlines.insert(
                    asset.clone(),
                    Trustline {
                        balance: 0,
                        limit: limit.minor(),
                    },
                );
            }
        }
        Ok(())
    }

    fn set_options(&mut self, id: &AccountId, options: &SetOptions) -> Result<()> {
        let entry = self.account_mut(id)?;
        if let Some(dest) = options.inflation_dest {
            entry.inflation_dest = Some(dest);
        }
        if let Some(weight) = options.master_weight {
            entry.master_weight = weight;
        }
        if let Some(low) = options.low_threshold {
            entry.thresholds.low = low;
        }
        if let Some(med) = options.med_threshold {
            entry.thresholds.med = med;
        }
        if let Some(high) = options.high_threshold {
            entry.thresholds.high = high;
        }
        if let Some(domain) = &options.home_domain {
            entry.home_domain = Some(domain.clone());
        }
        if let Some(signer) = options.signer {
            ensure!(signer.key != *id, "master key weight is set through master_weight");
            entry.signers.retain(|s| s.key != signer.key);
            if signer.weight > 0 {
                entry.signers.push(signer);
            }
            ensure!(entry.signers.len() <= MAX_SIGNERS, "too many signers on {id}");
        }
        Ok(())
    }

    fn charge_fee(&mut self, id: &AccountId, fee: i64) -> Result<()> {
        let entry = self.account_mut(id)?;
        ensure!(entry.native >= fee, "{id} cannot pay fee {fee}");
        entry.native -= fee;
        self.touched.insert(*id);
        Ok(())
    }

    fn require_weight(
        &self,
        id: &AccountId,
        signatures: &[DecoratedSignature],
        hash: &[u8; 32],
        level: ThresholdLevel,
    ) -> Result<()> {
        let entry = self.account(id)?;
        let weight: u32 = entry
            .all_signers(id)
            .iter()
            .filter(|s| s.weight > 0)
            .filter(|s| signatures.iter().any(|sig| sig.is_from(&s.key, hash)))
            .map(|s| s.weight)
            .sum();
        let needed = level.of(&entry.thresholds).max(1);
        ensure!(
            weight >= needed,
            "{id}: signature weight {weight} below {level:?} threshold {needed}"
        );
        Ok(())
    }

    fn check_reserves(&self) -> Result<()> {
        for id in &self.touched {
            if let Some(entry) = self.accounts.get(id) {
                let min = entry.min_balance(self.base_reserve);
                ensure!(
                    entry.native >= min,
                    "{id} below minimum balance: {} < {}",
                    Amount::from_minor(entry.native),
                    Amount::from_minor(min)
                );
            }
        }
        Ok(())
    }

    fn account(&self, id: &AccountId) -> Result<&AccountEntry> {
        self.accounts
            .get(id)
            .with_context(|| format!("account {id} does not exist"))
    }

    fn account_mut(&mut self, id: &AccountId) -> Result<&mut AccountEntry> {
        self.accounts
            .get_mut(id)
            .with_context(|| format!("account {id} does not exist"))
    }
}
