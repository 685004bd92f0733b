use thiserror::Error;

/// A caller-supplied value failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid parameter `{field}`: {reason}")]
pub struct InvalidParameter {
    pub field: String,
    pub reason: String,
}

impl InvalidParameter {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Strkey decoding failures.
pub enum KeyError {
    #[error("malformed account id: {0}")]
    InvalidAccountId(String),
    #[error("malformed secret seed")]
    InvalidSecretSeed,
}
