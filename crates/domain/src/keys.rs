//! Account identifiers and ed25519 signing keys.
//!
//! Addresses and secrets use the ledger's strkey text form: `G...` for
//! public keys, `S...` for secret seeds.

use crate::error::KeyError;
use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use stellar_strkey::ed25519::{PrivateKey as StrkeySecret, PublicKey as StrkeyPublic};
use zeroize::Zeroize;

/// Ed25519 public key identifying a ledger account.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub struct AccountId([u8; 32]);

impl AccountId {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parses a `G...` strkey, checking version byte and checksum.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        StrkeyPublic::from_string(raw)
            .map(|key| Self(key.0))
            .map_err(|_| KeyError::InvalidAccountId(raw.to_string()))
    }

    /// Last four key bytes, used to match signatures to signers.
    pub fn hint(&self) -> [u8; 4] {
        [self.0[28], self.0[29], self.0[30], self.0[31]]
    }

    /// Checks an ed25519 signature made by this account's key.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
            return false;
        };
        key.verify(message, &signature).is_ok()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", StrkeyPublic(self.0).to_string())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({self})")
    }
}

impl FromStr for AccountId {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <String as Deserialize>::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// 32-byte ed25519 seed. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretSeed([u8; 32]);

impl SecretSeed {
    /// Parses an `S...` strkey.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        StrkeySecret::from_string(raw)
            .map(|key| Self(key.0))
            .map_err(|_| KeyError::InvalidSecretSeed)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Strkey form. Callers own the returned copy of the secret.
    pub fn to_strkey(&self) -> String {
        StrkeySecret(self.0).to_string()
    }
}

impl Drop for SecretSeed {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SecretSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretSeed(<redacted>)")
    }
}

/// Signing keypair for an account.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a fresh keypair from the thread-local CSPRNG.
    pub fn random() -> Self {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        let keypair = Self {
            signing_key: SigningKey::from_bytes(&seed),
        };
        seed.zeroize();
        keypair
    }

    /// Keypair derived from a raw seed.
    pub fn from_seed(seed: &SecretSeed) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed.as_bytes()),
        }
    }

    /// Keypair from an `S...` strkey.
    pub fn from_secret(raw: &str) -> Result<Self, KeyError> {
        SecretSeed::parse(raw).map(|seed| Self::from_seed(&seed))
    }

    /// Account id of this keypair.
    pub fn public_key(&self) -> AccountId {
        AccountId(self.signing_key.verifying_key().to_bytes())
    }

    /// Copy of the seed. Zeroized when dropped.
    pub fn secret(&self) -> SecretSeed {
        SecretSeed(self.signing_key.to_bytes())
    }

    /// Raw ed25519 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}
