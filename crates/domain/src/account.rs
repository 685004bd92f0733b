use crate::amount::{Amount, AmountError};
use crate::asset::Asset;
use crate::keys::AccountId;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// One balance line as reported by the ledger. Amounts stay in their
/// decimal string form until a caller needs exact arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: Asset,
    pub balance: String,
    pub limit: Option<String>,
}

impl Balance {
    /// Exact balance in minor units.
    pub fn amount(&self) -> Result<Amount, AmountError> {
        Amount::parse(&self.balance)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
/// Key allowed to sign for an account, with its weight.
pub struct Signer {
    pub key: AccountId,
    pub weight: u32,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
/// Signature weight needed per threshold level.
pub struct Thresholds {
    pub low: u32,
    pub med: u32,
    pub high: u32,
}

impl Thresholds {
    pub const fn new(low: u32, med: u32, high: u32) -> Self {
        Self { low, med, high }
    }
}

/// Point-in-time view of a ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account_id: AccountId,
    pub sequence: i64,
    pub balances: Vec<Balance>,
    /// All signers including the master key, which is listed with its
    /// master weight.
    pub signers: Vec<Signer>,
    pub thresholds: Thresholds,
    pub home_domain: Option<String>,
}

impl AccountSnapshot {
    /// Balance line for `asset`, if any.
    pub fn balance_of(&self, asset: &Asset) -> Option<&Balance> {
        self.balances.iter().find(|b| &b.asset == asset)
    }

    /// Balance of `asset`, zero when the account has no trustline for it.
    pub fn amount_of(&self, asset: &Asset) -> Result<Amount, AmountError> {
        match self.balance_of(asset) {
            Some(balance) => balance.amount(),
            None => Ok(Amount::ZERO),
        }
    }

    /// Native balance in minor units.
    pub fn native_balance(&self) -> Result<Amount, AmountError> {
        self.amount_of(&Asset::Native)
    }

    /// Native always counts as trusted.
    pub fn has_trustline(&self, asset: &Asset) -> bool {
        asset.is_native() || self.balance_of(asset).is_some()
    }

    /// Every non-native balance line.
    pub fn issued_balances(&self) -> impl Iterator<Item = &Balance> {
        self.balances.iter().filter(|b| !b.asset.is_native())
    }

    pub fn has_signer(&self, key: &AccountId) -> bool {
        self.signers.iter().any(|s| &s.key == key)
    }

    /// Number of signers, master key included.
    pub fn signer_count(&self) -> usize {
        self.signers.len()
    }

    /// More than one signer, master key included.
    pub fn is_multisig(&self) -> bool {
        self.signers.len() > 1
    }
}
