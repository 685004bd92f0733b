//! Network passphrases and ids.

use sha2::{Digest, Sha256};

/// Public network passphrase.
pub const PUBLIC_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

/// Test network passphrase.
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// A ledger network, identified by the hash of its passphrase.
///
/// Every signature commits to the network id, so a transaction signed for one
/// network can never be replayed on another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    passphrase: String,
}

impl Network {
    /// Creates a network from its passphrase.
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }

    /// The public network.
    #[must_use]
    pub fn public() -> Self {
        Self::new(PUBLIC_PASSPHRASE)
    }

    /// The test network.
    #[must_use]
    pub fn testnet() -> Self {
        Self::new(TESTNET_PASSPHRASE)
    }

    /// Returns the passphrase.
    #[must_use]
    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// SHA-256 of the passphrase.
    #[must_use]
    pub fn id(&self) -> [u8; 32] {
        Sha256::digest(self.passphrase.as_bytes()).into()
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::testnet()
    }
}
