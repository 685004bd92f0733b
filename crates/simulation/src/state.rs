//! Simulated account state.
//!
//! Account entries hold raw minor-unit balances; snapshots convert them to
//! the decimal strings a ledger API reports.

use mediator_domain::{
    AccountId, AccountSnapshot, Amount, AmountCodec, Asset, Balance, Signer, Thresholds,
};
use std::collections::BTreeMap;

/// Balance line for an issued asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trustline {
    /// Balance in minor units.
    pub balance: i64,
    /// Maximum balance in minor units.
    pub limit: i64,
}

/// A simulated ledger account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEntry {
    /// Native balance in minor units.
    pub native: i64,
    /// Issued-asset balance lines.
    pub trustlines: BTreeMap<Asset, Trustline>,
    /// Weight of the account's own key.
    pub master_weight: u32,
    /// Additional signers.
    pub signers: Vec<Signer>,
    /// Signature thresholds.
    pub thresholds: Thresholds,
    /// Current sequence number.
    pub sequence: i64,
    /// Home domain tag.
    pub home_domain: Option<String>,
    /// Inflation destination.
    pub inflation_dest: Option<AccountId>,
}

impl AccountEntry {
    /// A fresh single-key account.
    #[must_use]
    pub fn new(native: Amount, sequence: i64) -> Self {
        Self {
            native: native.minor(),
            trustlines: BTreeMap::new(),
            master_weight: 1,
            signers: Vec::new(),
            thresholds: Thresholds::default(),
            sequence,
            home_domain: None,
            inflation_dest: None,
        }
    }

    /// Trustlines plus additional signers.
    #[must_use]
    pub fn subentries(&self) -> i64 {
        (self.trustlines.len() + self.signers.len()) as i64
    }

    /// Native balance the account must keep.
    #[must_use]
    pub fn min_balance(&self, base_reserve: Amount) -> i64 {
        (2 + self.subentries()).saturating_mul(base_reserve.minor())
    }

    /// Weight `key` carries on this account.
    #[must_use]
    pub fn weight_of(&self, id: &AccountId, key: &AccountId) -> u32 {
        if key == id {
            return self.master_weight;
        }
        self.signers
            .iter()
            .find(|s| &s.key == key)
            .map_or(0, |s| s.weight)
    }

    /// Every key that can sign for the account, master first.
    #[must_use]
    pub fn all_signers(&self, id: &AccountId) -> Vec<Signer> {
        let mut signers = vec![Signer {
            key: *id,
            weight: self.master_weight,
        }];
        signers.extend(self.signers.iter().copied());
        signers
    }

    /// Ledger-API view of the account.
    #[must_use]
    pub fn snapshot(&self, id: &AccountId) -> AccountSnapshot {
        let mut balances = vec![Balance {
            asset: Asset::Native,
            balance: render(self.native),
            limit: None,
        }];
        balances.extend(self.trustlines.iter().map(|(asset, line)| Balance {
            asset: asset.clone(),
            balance: render(line.balance),
            limit: Some(render(line.limit)),
        }));

        AccountSnapshot {
            account_id: *id,
            sequence: self.sequence,
            balances,
            signers: self.all_signers(id),
            thresholds: self.thresholds,
            home_domain: self.home_domain.clone(),
        }
    }
}

fn render(units: i64) -> String {
    AmountCodec::decode(units).unwrap_or_else(|_| "0".to_string())
}
