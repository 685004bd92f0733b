//! Ledger operations.
//!
//! An operation acts on behalf of its source account. When `source` is
//! unset the transaction's source account is used.

use crate::soroban::{InvokeContractArgs, SorobanAuthorizationEntry};
use borsh::{BorshDeserialize, BorshSerialize};
use mediator_domain::{AccountId, Amount, Asset, Signer, Thresholds};

/// Offer price as a rational number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Price {
    /// Numerator.
    pub n: i32,
    /// Denominator.
    pub d: i32,
}

/// Account configuration changes. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SetOptions {
    /// Inflation destination, used here to record escrow provenance.
    pub inflation_dest: Option<AccountId>,
    /// Weight of the account's own key.
    pub master_weight: Option<u32>,
    /// Low threshold.
    pub low_threshold: Option<u32>,
    /// Medium threshold.
    pub med_threshold: Option<u32>,
    /// High threshold.
    pub high_threshold: Option<u32>,
    /// Home domain tag.
    pub home_domain: Option<String>,
    /// Signer to add, update, or remove (weight 0).
    pub signer: Option<Signer>,
}

impl SetOptions {
    /// Sets all three thresholds at once.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.low_threshold = Some(thresholds.low);
        self.med_threshold = Some(thresholds.med);
        self.high_threshold = Some(thresholds.high);
        self
    }

    /// Whether the change touches account governance (weights, thresholds, signers).
    #[must_use]
    pub fn changes_governance(&self) -> bool {
        self.master_weight.is_some()
            || self.low_threshold.is_some()
            || self.med_threshold.is_some()
            || self.high_threshold.is_some()
            || self.signer.is_some()
    }
}

/// Operation payloads.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum OperationBody {
    /// Creates and funds a new account.
    CreateAccount {
        destination: AccountId,
        starting_balance: Amount,
    },
    /// Sends an asset.
    Payment {
        destination: AccountId,
        asset: Asset,
        amount: Amount,
    },
    /// Sends an exact amount, receiving at least `dest_min`.
    PathPaymentStrictSend {
        send_asset: Asset,
        send_amount: Amount,
        destination: AccountId,
        dest_asset: Asset,
        dest_min: Amount,
        path: Vec<Asset>,
    },
    /// Receives an exact amount, spending at most `send_max`.
    PathPaymentStrictReceive {
        send_asset: Asset,
        send_max: Amount,
        destination: AccountId,
        dest_asset: Asset,
        dest_amount: Amount,
        path: Vec<Asset>,
    },
    /// Creates, updates or deletes a sell offer.
    ManageSellOffer {
        selling: Asset,
        buying: Asset,
        amount: Amount,
        price: Price,
        offer_id: i64,
    },
    /// Creates, updates or deletes a buy offer.
    ManageBuyOffer {
        selling: Asset,
        buying: Asset,
        buy_amount: Amount,
        price: Price,
        offer_id: i64,
    },
    /// Creates, updates or (limit 0) removes a trustline.
    ChangeTrust { asset: Asset, limit: Amount },
    /// Changes account configuration.
    SetOptions(SetOptions),
    /// Moves the native balance to `destination` and removes the source account.
    AccountMerge { destination: AccountId },
    /// Invokes a contract function.
    InvokeHostFunction {
        call: InvokeContractArgs,
        auth: Vec<SorobanAuthorizationEntry>,
    },
}

/// Which account threshold an operation must meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ThresholdLevel {
    /// Low threshold.
    Low,
    /// Medium threshold.
    Medium,
    /// High threshold.
    High,
}

impl ThresholdLevel {
    /// Picks the matching weight from a threshold set.
    #[must_use]
    pub fn of(&self, thresholds: &Thresholds) -> u32 {
        match self {
            Self::Low => thresholds.low,
            Self::Medium => thresholds.med,
            Self::High => thresholds.high,
        }
    }
}

/// A ledger operation with an optional explicit source.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Operation {
    /// Source account; defaults to the transaction source.
    pub source: Option<AccountId>,
    /// Payload.
    pub body: OperationBody,
}

impl Operation {
    /// Wraps a body with the transaction's source.
    #[must_use]
    pub fn new(body: OperationBody) -> Self {
        Self { source: None, body }
    }

    /// Sets an explicit source account.
    #[must_use]
    pub fn with_source(mut self, source: AccountId) -> Self {
        self.source = Some(source);
        self
    }

    /// Creates and funds `destination`.
    #[must_use]
    pub fn create_account(destination: AccountId, starting_balance: Amount) -> Self {
        Self::new(OperationBody::CreateAccount {
            destination,
            starting_balance,
        })
    }

    /// Pays `amount` of `asset` to `destination`.
    #[must_use]
    pub fn payment(destination: AccountId, asset: Asset, amount: Amount) -> Self {
        Self::new(OperationBody::Payment {
            destination,
            asset,
            amount,
        })
    }

    /// Trustline with the maximum limit.
    #[must_use]
    pub fn trust(asset: Asset) -> Self {
        Self::change_trust(asset, Amount::MAX)
    }

    /// Trustline with an explicit limit; zero removes it.
    #[must_use]
    pub fn change_trust(asset: Asset, limit: Amount) -> Self {
        Self::new(OperationBody::ChangeTrust { asset, limit })
    }

    /// Account configuration change.
    #[must_use]
    pub fn set_options(options: SetOptions) -> Self {
        Self::new(OperationBody::SetOptions(options))
    }

    /// Merges the source account into `destination`.
    #[must_use]
    pub fn account_merge(destination: AccountId) -> Self {
        Self::new(OperationBody::AccountMerge { destination })
    }

    /// The account this operation acts for.
    #[must_use]
    pub fn effective_source(&self, tx_source: &AccountId) -> AccountId {
        self.source.unwrap_or(*tx_source)
    }

    /// Threshold the source account's signers must reach.
    #[must_use]
    pub fn threshold_level(&self) -> ThresholdLevel {
        match &self.body {
            OperationBody::AccountMerge { .. } => ThresholdLevel::High,
            OperationBody::SetOptions(options) if options.changes_governance() => {
                ThresholdLevel::High
            }
            _ => ThresholdLevel::Medium,
        }
    }

    /// Short name for logs and error tags.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match &self.body {
            OperationBody::CreateAccount { .. } => "create_account",
            OperationBody::Payment { .. } => "payment",
            OperationBody::PathPaymentStrictSend { .. } => "path_payment_strict_send",
            OperationBody::PathPaymentStrictReceive { .. } => "path_payment_strict_receive",
            OperationBody::ManageSellOffer { .. } => "manage_sell_offer",
            OperationBody::ManageBuyOffer { .. } => "manage_buy_offer",
            OperationBody::ChangeTrust { .. } => "change_trust",
            OperationBody::SetOptions(_) => "set_options",
            OperationBody::AccountMerge { .. } => "account_merge",
            OperationBody::InvokeHostFunction { .. } => "invoke_host_function",
        }
    }
}
