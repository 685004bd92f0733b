//! Transactions, envelopes and signatures.

use crate::canonical_bytes;
use crate::network::Network;
use crate::operation::Operation;
use borsh::{BorshDeserialize, BorshSerialize};
use mediator_domain::{AccountId, Keypair};
use sha2::{Digest, Sha256};

/// Envelope type tag for plain transactions.
pub const ENVELOPE_TYPE_TX: u32 = 2;

/// Envelope type tag for fee-bump transactions.
pub const ENVELOPE_TYPE_TX_FEE_BUMP: u32 = 5;

/// Transaction memo.
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Memo {
    /// No memo.
    #[default]
    None,
    /// Up to 28 bytes of text.
    Text(String),
    /// Numeric id.
    Id(u64),
    /// 32-byte hash.
    Hash([u8; 32]),
}

/// Validity window in unix seconds; zero means unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TimeBounds {
    /// Earliest close time.
    pub min_time: u64,
    /// Latest close time.
    pub max_time: u64,
}

/// An ordered batch of operations applied atomically.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    /// Account paying the fee and consuming the sequence number.
    pub source: AccountId,
    /// Total fee in stroops.
    pub fee: u32,
    /// Sequence number; must be the source's current sequence plus one.
    pub sequence: i64,
    /// Optional validity window.
    pub time_bounds: Option<TimeBounds>,
    /// Memo.
    pub memo: Memo,
    /// Operations.
    pub operations: Vec<Operation>,
}

fn hash_payload(network: &Network, envelope_type: u32, body: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(network.id());
    hasher.update(envelope_type.to_be_bytes());
    hasher.update(body);
    hasher.finalize().into()
}

impl Transaction {
    /// Hash every signer of this transaction signs.
    #[must_use]
    pub fn hash(&self, network: &Network) -> [u8; 32] {
        hash_payload(network, ENVELOPE_TYPE_TX, &canonical_bytes(self))
    }

    /// Distinct accounts the operations act for, in first-use order.
    #[must_use]
    pub fn operation_sources(&self) -> Vec<AccountId> {
        let mut sources = Vec::new();
        for op in &self.operations {
            let source = op.effective_source(&self.source);
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        sources
    }
}

/// Signature tagged with the last four bytes of the signer's key.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DecoratedSignature {
    /// Signer hint.
    pub hint: [u8; 4],
    /// Ed25519 signature bytes.
    pub signature: Vec<u8>,
}

impl DecoratedSignature {
    /// Signs a transaction hash.
    #[must_use]
    pub fn sign(keypair: &Keypair, hash: &[u8; 32]) -> Self {
        Self {
            hint: keypair.public_key().hint(),
            signature: keypair.sign(hash).to_vec(),
        }
    }

    /// Whether this signature was made by `signer` over `hash`.
    #[must_use]
    pub fn is_from(&self, signer: &AccountId, hash: &[u8; 32]) -> bool {
        self.hint == signer.hint() && signer.verify(hash, &self.signature)
    }
}

/// A transaction with its signatures.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignedTransaction {
    /// Transaction.
    pub tx: Transaction,
    /// Signatures over the transaction hash.
    pub signatures: Vec<DecoratedSignature>,
}

/// Fee-sponsorship wrapper around a signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FeeBumpTransaction {
    /// Account paying the fee.
    pub fee_source: AccountId,
    /// Total fee in stroops.
    pub fee: i64,
    /// Wrapped transaction.
    pub inner: SignedTransaction,
}

impl FeeBumpTransaction {
    /// Hash the fee source signs.
    #[must_use]
    pub fn hash(&self, network: &Network) -> [u8; 32] {
        hash_payload(network, ENVELOPE_TYPE_TX_FEE_BUMP, &canonical_bytes(self))
    }
}

/// A fee-bump transaction with its signatures.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FeeBumpEnvelope {
    /// Fee-bump transaction.
    pub tx: FeeBumpTransaction,
    /// Fee source signatures.
    pub signatures: Vec<DecoratedSignature>,
}

/// Anything the ledger accepts for submission.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum TransactionEnvelope {
    /// Plain transaction.
    Tx(SignedTransaction),
    /// Fee-sponsored transaction.
    FeeBump(FeeBumpEnvelope),
}

impl TransactionEnvelope {
    /// Wraps an unsigned transaction.
    #[must_use]
    pub fn new(tx: Transaction) -> Self {
        Self::Tx(SignedTransaction {
            tx,
            signatures: Vec::new(),
        })
    }

    /// Hash of the outermost transaction.
    #[must_use]
    pub fn hash(&self, network: &Network) -> [u8; 32] {
        match self {
            Self::Tx(signed) => signed.tx.hash(network),
            Self::FeeBump(envelope) => envelope.tx.hash(network),
        }
    }

    /// Hex form of [`TransactionEnvelope::hash`].
    #[must_use]
    pub fn hash_hex(&self, network: &Network) -> String {
        hex::encode(self.hash(network))
    }

    /// Account whose signature authorizes the outermost transaction.
    #[must_use]
    pub fn source(&self) -> &AccountId {
        match self {
            Self::Tx(signed) => &signed.tx.source,
            Self::FeeBump(envelope) => &envelope.tx.fee_source,
        }
    }

    /// Signatures on the outermost transaction.
    #[must_use]
    pub fn signatures(&self) -> &[DecoratedSignature] {
        match self {
            Self::Tx(signed) => &signed.signatures,
            Self::FeeBump(envelope) => &envelope.signatures,
        }
    }

    /// Appends a signature to the outermost transaction.
    pub fn add_signature(&mut self, signature: DecoratedSignature) {
        match self {
            Self::Tx(signed) => signed.signatures.push(signature),
            Self::FeeBump(envelope) => envelope.signatures.push(signature),
        }
    }

    /// Signs the outermost transaction in place.
    pub fn sign(&mut self, keypair: &Keypair, network: &Network) {
        let hash = self.hash(network);
        self.add_signature(DecoratedSignature::sign(keypair, &hash));
    }

    /// Whether `signer` has signed the outermost transaction.
    #[must_use]
    pub fn is_signed_by(&self, signer: &AccountId, network: &Network) -> bool {
        let hash = self.hash(network);
        self.signatures().iter().any(|s| s.is_from(signer, &hash))
    }

    /// The plain transaction, unwrapping a fee bump.
    #[must_use]
    pub fn inner(&self) -> &SignedTransaction {
        match self {
            Self::Tx(signed) => signed,
            Self::FeeBump(envelope) => &envelope.tx.inner,
        }
    }
}
