//! Contract invocation authorization.
//!
//! A contract call that moves an account's funds carries authorization
//! entries. Entries bound to an address are signed detached from the
//! transaction: the signature covers a preimage of the network id, a nonce,
//! an expiration ledger and the authorized invocation tree.

use crate::canonical_bytes;
use crate::network::Network;
use borsh::{BorshDeserialize, BorshSerialize};
use mediator_domain::AccountId;
use sha2::{Digest, Sha256};
use std::fmt;

/// Envelope type tag for authorization preimages.
pub const ENVELOPE_TYPE_SOROBAN_AUTHORIZATION: u32 = 9;

/// Contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct ContractId(pub [u8; 32]);

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractId({self})")
    }
}

/// A contract function call.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InvokeContractArgs {
    pub contract: ContractId,
    pub function: String,
    /// Encoded arguments, opaque to this crate.
    pub args: Vec<Vec<u8>>,
}

/// A node in the authorized call tree.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AuthorizedInvocation {
    pub function: InvokeContractArgs,
    pub sub_invocations: Vec<AuthorizedInvocation>,
}

/// Detached signature over an authorization preimage.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AuthSignature {
    pub public_key: AccountId,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AddressCredentials {
    pub address: AccountId,
    pub nonce: i64,
    pub signature_expiration_ledger: u32,
    pub signature: Option<AuthSignature>,
}

/// How a contract authorization entry is authorized.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Credentials {
    /// Authorized by the transaction's source account signature.
    SourceAccount,
    /// Authorized by a detached signature of `address`.
    Address(AddressCredentials),
}

/// One contract call tree and the credentials that authorize it.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SorobanAuthorizationEntry {
    pub credentials: Credentials,
    pub root_invocation: AuthorizedInvocation,
}

impl SorobanAuthorizationEntry {
    /// Address the entry is bound to, if it needs a detached signature.
    pub fn address(&self) -> Option<&AccountId> {
        match &self.credentials {
            Credentials::Address(credentials) => Some(&credentials.address),
            Credentials::SourceAccount => None,
        }
    }

    /// Source-account entries need no detached signature.
    pub fn is_signed(&self) -> bool {
        match &self.credentials {
            Credentials::Address(credentials) => credentials.signature.is_some(),
            Credentials::SourceAccount => true,
        }
    }

    /// Hash the bound address must sign. `None` for source-account entries.
    pub fn signing_hash(&self, network: &Network) -> Option<[u8; 32]> {
        let Credentials::Address(credentials) = &self.credentials else {
            return None;
        };
        let mut preimage = Vec::with_capacity(128);
        preimage.extend_from_slice(&ENVELOPE_TYPE_SOROBAN_AUTHORIZATION.to_be_bytes());
        preimage.extend_from_slice(&network.id());
        preimage.extend_from_slice(&credentials.nonce.to_le_bytes());
        preimage.extend_from_slice(&credentials.signature_expiration_ledger.to_le_bytes());
        preimage.extend_from_slice(&canonical_bytes(&self.root_invocation));
        Some(Sha256::digest(&preimage).into())
    }

    /// Attaches a detached signature. Source-account entries are left as is.
    pub fn attach_signature(&mut self, signature: AuthSignature) {
        if let Credentials::Address(credentials) = &mut self.credentials {
            credentials.signature = Some(signature);
        }
    }

    /// Checks the attached signature against the entry's address.
    pub fn verify(&self, network: &Network) -> bool {
        let Credentials::Address(credentials) = &self.credentials else {
            return true;
        };
        let (Some(signature), Some(hash)) = (&credentials.signature, self.signing_hash(network))
        else {
            return false;
        };
        signature.public_key == credentials.address
            && credentials.address.verify(&hash, &signature.signature)
    }
}
