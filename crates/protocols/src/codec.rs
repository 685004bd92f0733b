//! Wire encoding of envelopes.
//!
//! Envelopes travel to external signers and back as lowercase hex of their
//! canonical borsh bytes.

use crate::canonical_bytes;
use crate::transaction::TransactionEnvelope;
use borsh::BorshDeserialize;
use thiserror::Error;

/// Errors raised while decoding a wire envelope.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The input was empty.
    #[error("empty envelope")]
    Empty,
    /// The input was not valid hex.
    #[error("envelope is not hex: {0}")]
    Hex(#[from] hex::FromHexError),
    /// The bytes did not describe an envelope.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] std::io::Error),
}

/// Encodes an envelope for the wire.
#[must_use]
pub fn encode_envelope(envelope: &TransactionEnvelope) -> String {
    hex::encode(canonical_bytes(envelope))
}

/// Decodes a wire envelope. Surrounding whitespace is ignored.
pub fn decode_envelope(wire: &str) -> Result<TransactionEnvelope, CodecError> {
    let wire = wire.trim();
    if wire.is_empty() {
        return Err(CodecError::Empty);
    }
    let bytes = hex::decode(wire)?;
    Ok(TransactionEnvelope::try_from_slice(&bytes)?)
}
