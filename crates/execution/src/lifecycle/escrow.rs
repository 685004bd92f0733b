//! Escrow account lifecycle manager.

use super::recovery::{DisposalOutcome, dispose_escrow, dispose_registered};
use super::{EscrowEvent, EscrowEventType, EventData, FundingData};
use crate::authorization::AuthorizationProvider;
use crate::authorizer::TransactionAuthorizer;
use crate::config::EscrowConfig;
use crate::error::EscrowError;
use crate::registry::ObsoleteEscrowRegistry;
use mediator_domain::{
    AccountId, AccountSnapshot, Amount, AmountCodec, Asset, Keypair, SecretSeed, Signer,
    Thresholds,
};
use mediator_protocols::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

/// Reserve each sub-entry adds to an account's minimum balance.
pub const SUBENTRY_RESERVE: Amount = Amount::from_minor(5_000_000);

/// Lifecycle state of an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowState {
    /// Parameters validated, nothing on the ledger.
    Uninitialized,
    /// Keypair generated.
    Created,
    /// Recorded in the registry; funded once `init` succeeded.
    Registered,
    /// Merged back into the owner.
    Disposed,
}

/// Caller-supplied escrow parameters in their text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowRequest {
    /// Owner account address.
    pub owner: String,
    /// Asset handed to the escrow.
    pub selling_asset: String,
    /// Asset the escrow trades into.
    pub buying_asset: String,
    /// Decimal amount of the selling asset.
    pub selling_amount: String,
    /// Overrides the configured reserve base.
    pub reserve_base: Option<String>,
}

impl EscrowRequest {
    pub fn new(
        owner: impl Into<String>,
        selling_asset: impl Into<String>,
        buying_asset: impl Into<String>,
        selling_amount: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            selling_asset: selling_asset.into(),
            buying_asset: buying_asset.into(),
            selling_amount: selling_amount.into(),
            reserve_base: None,
        }
    }

    /// Overrides the configured reserve base for this escrow.
    #[must_use]
    pub fn with_reserve_base(mut self, reserve_base: impl Into<String>) -> Self {
        self.reserve_base = Some(reserve_base.into());
        self
    }
}

/// Native amount an escrow needs on top of what it sells.
///
/// `reserve_base + 0.5 * (2 + (owner_signers - 1) + issued_assets)`
pub fn escrow_reserve(
    reserve_base: Amount,
    owner_signers: usize,
    issued_assets: usize,
) -> Option<Amount> {
    let subentries = 2 + owner_signers.saturating_sub(1) + issued_assets;
    SUBENTRY_RESERVE
        .checked_mul(i64::try_from(subentries).ok()?)?
        .checked_add(reserve_base)
}

/// An ephemeral account holding an owner's funds during automated trading.
pub struct EscrowAccount {
    /// Owner address.
    owner: AccountId,
    /// Asset handed to the escrow.
    selling_asset: Asset,
    /// Asset the escrow trades into.
    buying_asset: Asset,
    /// Amount of the selling asset.
    selling_amount: Amount,
    /// Flat part of the reserve.
    reserve_base: Amount,
    /// Native amount locked for reserves, set by `init`.
    reserve_amount: Option<Amount>,
    /// Ephemeral key, generated by `init`.
    keypair: Option<Keypair>,
    /// Signers replicated from the owner.
    signers: Vec<Signer>,
    /// Current state.
    state: EscrowState,
    /// Whether the funding transaction was applied.
    funded: bool,
    /// Builds, signs and submits transactions.
    authorizer: TransactionAuthorizer,
    /// Recovery registry.
    registry: ObsoleteEscrowRegistry,
    /// Home domain tag.
    home_domain: String,
    /// Recorded lifecycle events.
    events: Vec<EscrowEvent>,
}

impl std::fmt::Debug for EscrowAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowAccount")
            .field("address", &self.address())
            .field("owner", &self.owner)
            .field("selling_asset", &self.selling_asset)
            .field("buying_asset", &self.buying_asset)
            .field("selling_amount", &self.selling_amount)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl EscrowAccount {
    /// Validates the request. Nothing touches the ledger until [`EscrowAccount::init`].
    pub fn create(
        request: EscrowRequest,
        authorization: AuthorizationProvider,
        gateway: Arc<dyn LedgerGateway>,
        registry: ObsoleteEscrowRegistry,
        config: &EscrowConfig,
    ) -> Result<Self, EscrowError> {
        let owner = AccountId::parse(request.owner.trim())
            .map_err(|e| EscrowError::account("owner", e))?;
        let selling_asset = Asset::parse_field(request.selling_asset.trim(), "selling_asset")?;
        let buying_asset = Asset::parse_field(request.buying_asset.trim(), "buying_asset")?;
        if selling_asset == buying_asset {
            return Err(EscrowError::invalid(
                "buying_asset",
                "must differ from the selling asset",
            ));
        }

        let selling_amount = AmountCodec::encode(request.selling_amount.trim(), true)
            .map(Amount::from_minor)
            .map_err(|e| EscrowError::amount("selling_amount", e))?;
        if !selling_amount.is_positive() {
            return Err(EscrowError::invalid("selling_amount", "must be positive"));
        }

        let reserve_base = match &request.reserve_base {
            Some(raw) => Amount::parse(raw.trim())
                .map_err(|e| EscrowError::amount("reserve_base", e))?,
            None => config.reserve_base()?,
        };
        if reserve_base.minor() < 0 {
            return Err(EscrowError::invalid("reserve_base", "must not be negative"));
        }

        Ok(Self {
            owner,
            selling_asset,
            buying_asset,
            selling_amount,
            reserve_base,
            reserve_amount: None,
            keypair: None,
            signers: Vec::new(),
            state: EscrowState::Uninitialized,
            funded: false,
            authorizer: TransactionAuthorizer::new(config, authorization, gateway),
            registry,
            home_domain: config.home_domain.clone(),
            events: Vec::new(),
        })
    }

    /// Escrow account address, once a key has been generated.
    pub fn address(&self) -> Option<AccountId> {
        self.keypair.as_ref().map(Keypair::public_key)
    }

    /// Account that funds the escrow and receives its balances back.
    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    /// Asset the escrow holds for the swap.
    pub fn selling_asset(&self) -> &Asset {
        &self.selling_asset
    }

    /// Asset the escrow expects to receive.
    pub fn buying_asset(&self) -> &Asset {
        &self.buying_asset
    }

    /// Amount of the selling asset moved into the escrow.
    pub fn selling_amount(&self) -> Amount {
        self.selling_amount
    }

    /// Native reserve locked in the escrow. Set by `init`.
    pub fn reserve_amount(&self) -> Option<Amount> {
        self.reserve_amount
    }

    /// Owner signers replicated onto the escrow.
    pub fn signers(&self) -> &[Signer] {
        &self.signers
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EscrowState {
        self.state
    }

    /// Lifecycle events recorded so far, oldest first.
    pub fn events(&self) -> &[EscrowEvent] {
        &self.events
    }

    /// Funds and configures the escrow in one owner-sourced transaction.
    ///
    /// Returns the escrow secret. A rejected transaction leaves the escrow
    /// registered with the same key, so `init` may be called again.
    pub async fn init(&mut self) -> Result<SecretSeed, EscrowError> {
        if self.funded || self.state == EscrowState::Disposed {
            return Err(EscrowError::InvalidState(format!(
                "cannot initialize a {:?} escrow",
                self.state
            )));
        }

        let owner = self
            .authorizer
            .gateway()
            .load_account(&self.owner)
            .await?
            .ok_or(EscrowError::OwnerNotFound(self.owner))?;

        let issued_assets = [&self.selling_asset, &self.buying_asset]
            .into_iter()
            .filter(|a| !a.is_native())
            .count();
        let reserve = escrow_reserve(self.reserve_base, owner.signer_count(), issued_assets)
            .ok_or_else(|| EscrowError::invalid("reserve_base", "reserve overflows"))?;

        let keypair = self.keypair.get_or_insert_with(Keypair::random).clone();
        let escrow = keypair.public_key();
        if self.state == EscrowState::Uninitialized {
            self.state = EscrowState::Created;
        }
        debug!(escrow = %escrow, owner = %self.owner, reserve = %reserve, "Preparing escrow");

        let operations = self.funding_operations(&owner, &escrow, reserve)?;

        self.registry.register(&escrow, &self.owner).await?;
        if self.state == EscrowState::Created {
            self.state = EscrowState::Registered;
            self.record(EscrowEventType::Registered, EventData::None, None);
        }
        self.reserve_amount = Some(reserve);

        let tx = self.authorizer.build(&owner, operations, Memo::None)?;
        let envelope = self
            .authorizer
            .sign(tx, &self.owner, Some(&keypair))
            .await?;
        match self.authorizer.submit(&envelope, "init").await {
            Ok(hash) => {
                self.funded = true;
                info!(escrow = %escrow, owner = %self.owner, hash = %hash, "Escrow initialized");
                let data = EventData::Funding(FundingData {
                    selling_asset: self.selling_asset.clone(),
                    buying_asset: self.buying_asset.clone(),
                    selling_amount: self.selling_amount,
                    reserve_amount: reserve,
                    signer_count: self.signers.len(),
                });
                self.record(EscrowEventType::Initialized, data, Some(hash));
                Ok(keypair.secret())
            }
            Err(e) => {
                self.record(
                    EscrowEventType::InitFailed,
                    EventData::Failure(e.to_string()),
                    None,
                );
                Err(e)
            }
        }
    }

    fn funding_operations(
        &mut self,
        owner: &AccountSnapshot,
        escrow: &AccountId,
        reserve: Amount,
    ) -> Result<Vec<Operation>, EscrowError> {
        let native = owner
            .native_balance()
            .map_err(|e| EscrowError::amount("owner balance", e))?;
        let mut operations = Vec::new();

        if self.selling_asset.is_native() {
            let funding = self
                .selling_amount
                .checked_add(reserve)
                .ok_or_else(|| EscrowError::invalid("selling_amount", "amount overflows"))?;
            if native < funding {
                return Err(EscrowError::InsufficientBalance("selling+fees"));
            }
            operations.push(Operation::create_account(*escrow, funding));
        } else {
            if native < reserve {
                return Err(EscrowError::InsufficientBalance("fees"));
            }
            operations.push(Operation::create_account(*escrow, reserve));

            let issuer = self.selling_asset.issuer() == Some(&self.owner);
            let held = owner
                .amount_of(&self.selling_asset)
                .map_err(|e| EscrowError::amount("owner balance", e))?;
            if !issuer && held < self.selling_amount {
                return Err(EscrowError::InsufficientBalance("selling asset"));
            }
            operations.push(Operation::trust(self.selling_asset.clone()).with_source(*escrow));
            operations.push(Operation::payment(
                *escrow,
                self.selling_asset.clone(),
                self.selling_amount,
            ));
        }

        if !self.buying_asset.is_native() {
            operations.push(Operation::trust(self.buying_asset.clone()).with_source(*escrow));
            let issuer = self.buying_asset.issuer() == Some(&self.owner);
            if !issuer && !owner.has_trustline(&self.buying_asset) {
                operations.push(Operation::trust(self.buying_asset.clone()));
            }
        }

        operations.extend(
            self.signer_operations(owner)
                .into_iter()
                .map(|op| op.with_source(*escrow)),
        );
        Ok(operations)
    }

    fn signer_operations(&mut self, owner: &AccountSnapshot) -> Vec<Operation> {
        if !owner.is_multisig() {
            let signer = Signer {
                key: self.owner,
                weight: 1,
            };
            self.signers = vec![signer];
            return vec![Operation::set_options(
                SetOptions {
                    master_weight: Some(1),
                    home_domain: Some(self.home_domain.clone()),
                    signer: Some(signer),
                    ..Default::default()
                }
                .with_thresholds(Thresholds::new(1, 1, 1)),
            )];
        }

        let thresholds = owner.thresholds;
        self.signers = owner
            .signers
            .iter()
            .map(|s| Signer {
                key: s.key,
                weight: s.weight.max(1),
            })
            .collect();

        let mut operations = Vec::with_capacity(self.signers.len());
        let mut signers = self.signers.iter().copied();
        operations.push(Operation::set_options(
            SetOptions {
                inflation_dest: Some(self.owner),
                master_weight: Some(thresholds.high.max(thresholds.med).max(1)),
                home_domain: Some(self.home_domain.clone()),
                signer: signers.next(),
                ..Default::default()
            }
            .with_thresholds(thresholds),
        ));
        operations.extend(signers.map(|signer| {
            Operation::set_options(SetOptions {
                signer: Some(signer),
                ..Default::default()
            })
        }));
        operations
    }

    /// Returns every asset to the owner and merges the escrow into it.
    pub async fn dispose(&mut self) -> Result<String, EscrowError> {
        let Some(keypair) = self.keypair.clone() else {
            return Err(EscrowError::InvalidState(
                "escrow was never initialized".into(),
            ));
        };
        if self.state == EscrowState::Disposed {
            return Err(EscrowError::InvalidState("escrow already disposed".into()));
        }

        let escrow = keypair.public_key();
        let result = dispose_escrow(
            &self.authorizer,
            &self.registry,
            &self.owner,
            &escrow,
            Some(&keypair),
            &mut self.events,
        )
        .await;
        if matches!(result, Ok(_) | Err(EscrowError::EscrowNotFound(_))) {
            self.state = EscrowState::Disposed;
        }
        result
    }

    /// Disposes another escrow of the same owner, e.g. one found in the registry.
    pub async fn dispose_foreign(&mut self, escrow: &AccountId) -> Result<String, EscrowError> {
        if self.address().as_ref() == Some(escrow) {
            return self.dispose().await;
        }
        dispose_escrow(
            &self.authorizer,
            &self.registry,
            &self.owner,
            escrow,
            None,
            &mut self.events,
        )
        .await
    }

    /// Whether the registry holds escrows of this owner.
    pub async fn has_obsolete_escrows(&self) -> Result<bool, EscrowError> {
        self.registry.has_escrows_of(&self.owner).await
    }

    /// Disposes every escrow the registry records for this owner, in order.
    pub async fn dispose_obsolete_escrows(&mut self) -> Result<Vec<DisposalOutcome>, EscrowError> {
        let own = self.address();
        let outcomes = dispose_registered(
            &self.authorizer,
            &self.registry,
            &self.owner,
            self.keypair.as_ref(),
            &mut self.events,
        )
        .await?;
        if outcomes
            .iter()
            .any(|o| Some(o.escrow) == own && o.is_cleared())
        {
            self.state = EscrowState::Disposed;
        }
        Ok(outcomes)
    }

    /// Co-signs an externally built swap for the owner; see
    /// [`TransactionAuthorizer::authorize_external`].
    pub async fn authorize_external(&self, wire: &str) -> Result<String, EscrowError> {
        self.authorizer.authorize_external(wire, &self.owner).await
    }

    fn record(&mut self, event_type: EscrowEventType, data: EventData, hash: Option<String>) {
        let Some(escrow) = self.address() else {
            return;
        };
        let mut event = EscrowEvent::new(event_type, escrow, self.owner, data);
        if let Some(hash) = hash {
            event = event.with_tx_hash(hash);
        }
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::testing::{Harness, cosigning_provider};

    fn units(raw: &str) -> Amount {
        Amount::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_create_rejects_bad_parameters() {
        let h = Harness::new().await;
        let owner = Keypair::random().public_key().to_string();
        let aqua = h.aqua.to_string();
        let cases = vec![
            EscrowRequest::new("GNOTANACCOUNT", "XLM", aqua.clone(), "10"),
            EscrowRequest::new(owner.clone(), "DOGE", aqua.clone(), "10"),
            EscrowRequest::new(owner.clone(), "XLM", "TOOLONGASSETCODE-GABC", "10"),
            EscrowRequest::new(owner.clone(), "XLM", aqua.clone(), "0"),
            EscrowRequest::new(owner.clone(), "XLM", aqua.clone(), "-1"),
            EscrowRequest::new(owner.clone(), "XLM", aqua.clone(), "1.2.3"),
            EscrowRequest::new(owner.clone(), "XLM", aqua.clone(), "922337203685.4775808"),
            EscrowRequest::new(owner.clone(), "XLM", "native", "10"),
            EscrowRequest::new(owner.clone(), "XLM", aqua.clone(), "10").with_reserve_base("x"),
        ];
        for request in cases {
            let result = EscrowAccount::create(
                request.clone(),
                AuthorizationProvider::from_keypair(Keypair::random()),
                h.gateway(),
                h.registry.clone(),
                &h.config,
            );
            let err = result.expect_err(&format!("{request:?} should be rejected"));
            assert_eq!(err.code(), 1001, "{request:?}: {err}");
        }
    }

    #[tokio::test]
    async fn test_create_accepts_colon_form_and_truncates() {
        let h = Harness::new().await;
        let owner = h.owner(100).await;
        let colon = format!("AQUA:{}", h.aqua.issuer().unwrap());
        let escrow = h.escrow(&owner, "xlm", &colon, "1.123456789");

        assert_eq!(escrow.selling_asset(), &Asset::Native);
        assert_eq!(escrow.buying_asset(), &h.aqua);
        assert_eq!(escrow.selling_amount(), Amount::from_minor(11_234_567));
        assert_eq!(escrow.state(), EscrowState::Uninitialized);
        assert!(escrow.address().is_none());
    }

    #[test]
    fn test_reserve_formula() {
        let base = Amount::from_units(5);
        assert_eq!(escrow_reserve(base, 1, 1), Some(units("6.5")));
        assert_eq!(escrow_reserve(base, 1, 2), Some(units("7")));
        assert_eq!(escrow_reserve(base, 3, 1), Some(units("7.5")));
        assert_eq!(escrow_reserve(Amount::ZERO, 1, 0), Some(units("1")));
        assert_eq!(escrow_reserve(Amount::MAX, 1, 0), None);
    }

    #[tokio::test]
    async fn test_init_native_selling() {
        let h = Harness::new().await;
        let owner = h.owner(100).await;
        let mut escrow = h.escrow(&owner, "XLM", &h.aqua.to_string(), "10");

        let secret = escrow.init().await.unwrap();
        let address = escrow.address().unwrap();
        assert_eq!(Keypair::from_seed(&secret).public_key(), address);
        assert_eq!(escrow.state(), EscrowState::Registered);
        assert_eq!(escrow.reserve_amount(), Some(units("6.5")));

        let ops = h.last_operations().await;
        assert_eq!(
            ops[0],
            Operation::create_account(address, units("16.5"))
        );
        assert!(ops.contains(&Operation::trust(h.aqua.clone()).with_source(address)));
        assert_eq!(ops.iter().filter(|op| op.kind() == "set_options").count(), 1);
        assert_eq!(ops.len(), 3);

        let entry = h.ledger.account(&address).await.unwrap();
        assert_eq!(entry.native, units("16.5").minor());
        assert_eq!(entry.trustlines[&h.aqua].limit, Amount::MAX.minor());
        assert_eq!(entry.master_weight, 1);
        assert_eq!(entry.thresholds, Thresholds::new(1, 1, 1));
        assert_eq!(entry.weight_of(&address, &owner.public_key()), 1);
        assert_eq!(entry.home_domain.as_deref(), Some(h.config.home_domain.as_str()));

        let owner_entry = h.ledger.account(&owner.public_key()).await.unwrap();
        assert_eq!(owner_entry.native, units("83.47").minor());

        assert_eq!(
            h.registry.owner_of(&address).await.unwrap(),
            Some(owner.public_key())
        );
        let types: Vec<_> = escrow.events().iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![EscrowEventType::Registered, EscrowEventType::Initialized]
        );
    }

    #[tokio::test]
    async fn test_init_insufficient_native() {
        let h = Harness::new().await;
        for xlm in [5, 11] {
            let owner = h.owner(xlm).await;
            let mut escrow = h.escrow(&owner, "XLM", &h.aqua.to_string(), "10");
            let err = escrow.init().await.unwrap_err();
            assert!(
                matches!(err, EscrowError::InsufficientBalance("selling+fees")),
                "{err}"
            );
            assert!(!escrow.has_obsolete_escrows().await.unwrap());
        }
        assert!(h.ledger.submissions().await.is_empty());
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_init_missing_owner() {
        let h = Harness::new().await;
        let ghost = Keypair::random();
        let mut escrow = h.escrow(&ghost, "XLM", &h.aqua.to_string(), "10");
        let err = escrow.init().await.unwrap_err();
        assert!(matches!(err, EscrowError::OwnerNotFound(id) if id == ghost.public_key()));
    }

    #[tokio::test]
    async fn test_init_issued_selling() {
        let h = Harness::new().await;
        let owner = h.owner(20).await;
        h.ledger
            .set_trustline(&owner.public_key(), h.aqua.clone(), Amount::from_units(50))
            .await;

        let mut short = h.escrow(&owner, &h.aqua.to_string(), "XLM", "51");
        let err = short.init().await.unwrap_err();
        assert!(matches!(err, EscrowError::InsufficientBalance("selling asset")));

        let mut escrow = h.escrow(&owner, &h.aqua.to_string(), "XLM", "20");
        escrow.init().await.unwrap();
        let address = escrow.address().unwrap();

        let ops = h.last_operations().await;
        assert_eq!(ops[0], Operation::create_account(address, units("6.5")));
        assert_eq!(ops[1], Operation::trust(h.aqua.clone()).with_source(address));
        assert_eq!(
            ops[2],
            Operation::payment(address, h.aqua.clone(), Amount::from_units(20))
        );

        let entry = h.ledger.account(&address).await.unwrap();
        assert_eq!(entry.trustlines[&h.aqua].balance, Amount::from_units(20).minor());
        let owner_entry = h.ledger.account(&owner.public_key()).await.unwrap();
        assert_eq!(
            owner_entry.trustlines[&h.aqua].balance,
            Amount::from_units(30).minor()
        );
    }

    #[tokio::test]
    async fn test_init_issued_selling_needs_reserve() {
        let h = Harness::new().await;
        let owner = h.owner(6).await;
        h.ledger
            .set_trustline(&owner.public_key(), h.aqua.clone(), Amount::from_units(50))
            .await;
        let mut escrow = h.escrow(&owner, &h.aqua.to_string(), "XLM", "20");
        let err = escrow.init().await.unwrap_err();
        assert!(matches!(err, EscrowError::InsufficientBalance("fees")));
    }

    #[tokio::test]
    async fn test_init_adds_missing_owner_trustline() {
        let h = Harness::new().await;
        let owner = h.owner(100).await;
        let usdc = Asset::issued("USDC", Keypair::random().public_key()).unwrap();
        let mut escrow = h.escrow(&owner, "XLM", &usdc.to_string(), "10");
        escrow.init().await.unwrap();

        let ops = h.last_operations().await;
        assert!(ops.contains(&Operation::trust(usdc.clone())));
        let owner_entry = h.ledger.account(&owner.public_key()).await.unwrap();
        assert!(owner_entry.trustlines.contains_key(&usdc));
    }

    #[tokio::test]
    async fn test_init_multisig_owner() {
        let h = Harness::new().await;
        let (owner, cosigners) = h.multisig_owner(100).await;
        let mut escrow = h.escrow_with(
            EscrowRequest::new(owner.to_string(), "XLM", h.aqua.to_string(), "10"),
            cosigning_provider(cosigners.clone()),
        );

        escrow.init().await.unwrap();
        let address = escrow.address().unwrap();
        assert_eq!(escrow.reserve_amount(), Some(units("7.5")));

        let ops = h.last_operations().await;
        let set_options: Vec<_> = ops.iter().filter(|op| op.kind() == "set_options").collect();
        assert_eq!(set_options.len(), 3);
        for op in &set_options {
            let OperationBody::SetOptions(options) = &op.body else {
                unreachable!()
            };
            assert!(options.signer.unwrap().weight >= 1);
        }

        let entry = h.ledger.account(&address).await.unwrap();
        assert_eq!(entry.master_weight, 4);
        assert_eq!(entry.thresholds, Thresholds::new(2, 3, 4));
        assert_eq!(entry.inflation_dest, Some(owner));
        assert_eq!(entry.weight_of(&address, &owner), 1);
        for cosigner in &cosigners {
            assert_eq!(entry.weight_of(&address, &cosigner.public_key()), 2);
        }
        assert_eq!(escrow.signers().len(), 3);
    }

    #[tokio::test]
    async fn test_dispose_returns_assets() {
        let h = Harness::new().await;
        let owner = h.owner(100).await;
        let mut escrow = h.escrow(&owner, "XLM", &h.aqua.to_string(), "10");
        escrow.init().await.unwrap();
        let address = escrow.address().unwrap();
        h.ledger
            .set_trustline(&address, h.aqua.clone(), Amount::from_units(1_000))
            .await;

        escrow.dispose().await.unwrap();

        let ops = h.last_operations().await;
        assert_eq!(
            ops,
            vec![
                Operation::payment(owner.public_key(), h.aqua.clone(), Amount::from_units(1_000)),
                Operation::change_trust(h.aqua.clone(), Amount::ZERO),
                Operation::account_merge(owner.public_key()),
            ]
        );
        assert!(!h.ledger.exists(&address).await);
        let owner_entry = h.ledger.account(&owner.public_key()).await.unwrap();
        assert_eq!(
            owner_entry.trustlines[&h.aqua].balance,
            Amount::from_units(1_000).minor()
        );
        assert!(h.store.is_empty().await);
        assert_eq!(escrow.state(), EscrowState::Disposed);
        assert_eq!(
            escrow.events().last().map(|e| e.event_type),
            Some(EscrowEventType::Disposed)
        );

        let err = escrow.dispose().await.unwrap_err();
        assert_eq!(err.code(), 1009);
    }

    #[tokio::test]
    async fn test_dispose_rejects_foreign_mediator() {
        let h = Harness::new().await;
        let owner = h.owner(100).await;
        let mut escrow = h.escrow(&owner, "XLM", &h.aqua.to_string(), "10");
        escrow.init().await.unwrap();
        let address = escrow.address().unwrap();
        h.ledger
            .update_account(&address, |entry| entry.signers.clear())
            .await;

        let before = h.ledger.submissions().await.len();
        let err = escrow.dispose().await.unwrap_err();
        assert!(matches!(err, EscrowError::NotMediatorFor(id) if id == owner.public_key()));
        assert_eq!(h.ledger.submissions().await.len(), before);
        assert!(h.ledger.exists(&address).await);
        assert!(escrow.has_obsolete_escrows().await.unwrap());
    }

    #[tokio::test]
    async fn test_dispose_missing_escrow_cleans_registry() {
        let h = Harness::new().await;
        let owner = h.owner(100).await;
        let ghost = Keypair::random().public_key();
        h.registry.register(&ghost, &owner.public_key()).await.unwrap();

        let mut escrow = h.escrow(&owner, "XLM", &h.aqua.to_string(), "10");
        let err = escrow.dispose_foreign(&ghost).await.unwrap_err();
        assert!(matches!(err, EscrowError::EscrowNotFound(id) if id == ghost));
        assert!(!escrow.has_obsolete_escrows().await.unwrap());
        assert_eq!(
            escrow.events().last().map(|e| e.event_type),
            Some(EscrowEventType::Vanished)
        );
    }

    #[tokio::test]
    async fn test_rejected_init_keeps_registry_and_retries() {
        let h = Harness::new().await;
        let owner = h.owner(100).await;
        let mut escrow = h.escrow(&owner, "XLM", &h.aqua.to_string(), "10");
        h.ledger.reject_next_submission("tx_insufficient_fee").await;

        let err = escrow.init().await.unwrap_err();
        assert_eq!(err.code(), 1006);
        assert_eq!(escrow.state(), EscrowState::Registered);
        let address = escrow.address().unwrap();
        assert!(!h.ledger.exists(&address).await);
        assert_eq!(
            h.registry.escrows_of(&owner.public_key()).await.unwrap(),
            vec![address]
        );

        escrow.init().await.unwrap();
        assert_eq!(escrow.address(), Some(address));
        assert!(h.ledger.exists(&address).await);

        let err = escrow.init().await.unwrap_err();
        assert_eq!(err.code(), 1009);
    }

    #[tokio::test]
    async fn test_dispose_after_failed_init_clears_registry() {
        let h = Harness::new().await;
        let owner = h.owner(100).await;
        let mut escrow = h.escrow(&owner, "XLM", &h.aqua.to_string(), "10");

        let err = escrow.dispose().await.unwrap_err();
        assert_eq!(err.code(), 1009);

        h.ledger.reject_next_submission("tx_failed").await;
        escrow.init().await.unwrap_err();
        let err = escrow.dispose().await.unwrap_err();
        assert_eq!(err.code(), 1004);
        assert_eq!(escrow.state(), EscrowState::Disposed);
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_multisig_escrow_round_trip() {
        let h = Harness::new().await;
        let (owner, cosigners) = h.multisig_owner(100).await;
        let mut escrow = h.escrow_with(
            EscrowRequest::new(owner.to_string(), "XLM", h.aqua.to_string(), "10"),
            cosigning_provider(cosigners),
        );
        escrow.init().await.unwrap();
        let address = escrow.address().unwrap();

        escrow.dispose().await.unwrap();
        assert!(!h.ledger.exists(&address).await);
        let owner_entry = h.ledger.account(&owner).await.unwrap();
        assert!(owner_entry.native > units("99").minor());
    }
}
