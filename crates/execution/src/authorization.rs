//! Authorization provider.
//!
//! Owners authorize escrow transactions either with a raw signing key or
//! through an external signer reached by an async callback. Both sit behind
//! [`AuthorizationProvider::authorize`].

use crate::error::EscrowError;
use async_trait::async_trait;
use mediator_domain::{AccountId, Keypair};
use mediator_protocols::prelude::*;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// What the owner is asked to authorize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignPayload {
    /// A transaction to sign in place.
    Transaction {
        envelope: TransactionEnvelope,
        network: Network,
    },
    /// A 32-byte hash needing a detached signature.
    Hash([u8; 32]),
}

/// What an external signer may hand back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutput {
    Envelope(TransactionEnvelope),
    /// Wire-encoded envelope.
    Wire(String),
    Signature(AuthSignature),
}

/// Normalized result of [`AuthorizationProvider::authorize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedPayload {
    Transaction(TransactionEnvelope),
    Signature(AuthSignature),
}

impl SignedPayload {
    /// Unwraps a signed transaction, failing with `FailedToSign` otherwise.
    pub fn into_envelope(self) -> Result<TransactionEnvelope, EscrowError> {
        match self {
            Self::Transaction(envelope) => Ok(envelope),
            Self::Signature(_) => Err(EscrowError::FailedToSign(
                "expected a signed transaction".into(),
            )),
        }
    }

    /// Unwraps a detached signature, failing with `FailedToSign` otherwise.
    pub fn into_signature(self) -> Result<AuthSignature, EscrowError> {
        match self {
            Self::Signature(signature) => Ok(signature),
            Self::Transaction(_) => Err(EscrowError::FailedToSign(
                "expected a detached signature".into(),
            )),
        }
    }
}

/// External signer. `None` means the signer declined or produced nothing.
#[async_trait]
pub trait SignCallback: Send + Sync {
    async fn sign(&self, payload: SignPayload) -> Option<CallbackOutput>;
}

#[async_trait]
impl<F, Fut> SignCallback for F
where
    F: Fn(SignPayload) -> Fut + Send + Sync,
    Fut: Future<Output = Option<CallbackOutput>> + Send,
{
    async fn sign(&self, payload: SignPayload) -> Option<CallbackOutput> {
        self(payload).await
    }
}

/// Owner authorization: a held key or an external signer.
#[derive(Clone)]
pub enum AuthorizationProvider {
    Key(Keypair),
    Callback(Arc<dyn SignCallback>),
}

impl fmt::Debug for AuthorizationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(keypair) => f.debug_tuple("Key").field(&keypair.public_key()).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl AuthorizationProvider {
    /// Builds a provider from exactly one of a secret seed or a callback.
    pub fn try_new(
        secret: Option<&str>,
        callback: Option<Arc<dyn SignCallback>>,
    ) -> Result<Self, EscrowError> {
        match (secret, callback) {
            (Some(secret), None) => Keypair::from_secret(secret.trim())
                .map(Self::Key)
                .map_err(|e| EscrowError::InvalidAuthorizationParam(e.to_string())),
            (None, Some(callback)) => Ok(Self::Callback(callback)),
            (Some(_), Some(_)) => Err(EscrowError::InvalidAuthorizationParam(
                "both a secret and a callback were given".into(),
            )),
            (None, None) => Err(EscrowError::InvalidAuthorizationParam(
                "either a secret or a callback is required".into(),
            )),
        }
    }

    /// Signs locally with `keypair`.
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self::Key(keypair)
    }

    /// Delegates signing to an external callback.
    pub fn from_callback(callback: impl SignCallback + 'static) -> Self {
        Self::Callback(Arc::new(callback))
    }

    /// Signer public key when key-backed.
    #[must_use]
    pub fn public_key(&self) -> Option<AccountId> {
        match self {
            Self::Key(keypair) => Some(keypair.public_key()),
            Self::Callback(_) => None,
        }
    }

    /// Signs `payload` and returns the normalized result.
    ///
    /// Callback output is verified against the payload before it is accepted.
    pub async fn authorize(&self, payload: SignPayload) -> Result<SignedPayload, EscrowError> {
        match self {
            Self::Key(keypair) => Ok(sign_with_key(keypair, payload)),
            Self::Callback(callback) => {
                debug!("Requesting external signature");
                let output = callback.sign(payload.clone()).await.ok_or_else(|| {
                    EscrowError::FailedToSign("signer returned nothing".into())
                })?;
                normalize(payload, output)
            }
        }
    }

    /// Signs an envelope and returns it.
    pub async fn authorize_transaction(
        &self,
        envelope: TransactionEnvelope,
        network: &Network,
    ) -> Result<TransactionEnvelope, EscrowError> {
        self.authorize(SignPayload::Transaction {
            envelope,
            network: network.clone(),
        })
        .await?
        .into_envelope()
    }

    /// Detached signature over `hash`.
    pub async fn authorize_hash(&self, hash: [u8; 32]) -> Result<AuthSignature, EscrowError> {
        self.authorize(SignPayload::Hash(hash))
            .await?
            .into_signature()
    }
}

fn sign_with_key(keypair: &Keypair, payload: SignPayload) -> SignedPayload {
    match payload {
        SignPayload::Transaction {
            mut envelope,
            network,
        } => {
            envelope.sign(keypair, &network);
            SignedPayload::Transaction(envelope)
        }
        SignPayload::Hash(hash) => SignedPayload::Signature(AuthSignature {
            public_key: keypair.public_key(),
            signature: keypair.sign(&hash).to_vec(),
        }),
    }
}

fn normalize(payload: SignPayload, output: CallbackOutput) -> Result<SignedPayload, EscrowError> {
    match (payload, output) {
        (SignPayload::Transaction { envelope, network }, output) => {
            let expected = envelope.hash(&network);
            let before = envelope.signatures().len();
            let signed = match output {
                CallbackOutput::Envelope(signed) => signed,
                CallbackOutput::Wire(wire) => {
                    if wire.trim().is_empty() {
                        return Err(EscrowError::FailedToSign("signer returned nothing".into()));
                    }
                    decode_envelope(&wire)?
                }
                CallbackOutput::Signature(signature) => {
                    if !signature.public_key.verify(&expected, &signature.signature) {
                        return Err(EscrowError::FailedToSign(
                            "signature does not match the transaction".into(),
                        ));
                    }
                    let mut envelope = envelope;
                    envelope.add_signature(DecoratedSignature {
                        hint: signature.public_key.hint(),
                        signature: signature.signature,
                    });
                    envelope
                }
            };
            if signed.hash(&network) != expected {
                return Err(EscrowError::FailedToSign(
                    "signer returned a different transaction".into(),
                ));
            }
            if signed.signatures().len() <= before {
                return Err(EscrowError::FailedToSign("no signature was added".into()));
            }
            Ok(SignedPayload::Transaction(signed))
        }
        (SignPayload::Hash(hash), CallbackOutput::Signature(signature)) => {
            if signature.signature.is_empty()
                || !signature.public_key.verify(&hash, &signature.signature)
            {
                return Err(EscrowError::FailedToSign(
                    "detached signature does not verify".into(),
                ));
            }
            Ok(SignedPayload::Signature(signature))
        }
        (SignPayload::Hash(_), _) => Err(EscrowError::FailedToSign(
            "expected a detached signature".into(),
        )),
    }
}
