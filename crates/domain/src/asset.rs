use crate::error::InvalidParameter;
use crate::keys::AccountId;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Display code of the native asset.
pub const NATIVE_CODE: &str = "XLM";

const MAX_CODE_LEN: usize = 12;

/// The network-native asset or an issued asset identified by code and issuer.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub enum Asset {
    Native,
    Issued { code: String, issuer: AccountId },
}

impl Asset {
    /// Issued asset with a validated code.
    pub fn issued(code: impl Into<String>, issuer: AccountId) -> Result<Self, InvalidParameter> {
        let code = code.into();
        validate_code(&code, "asset")?;
        Ok(Self::Issued { code, issuer })
    }

    /// Parses `XLM`/`xlm`/`native`, `CODE-ISSUER` or `CODE:ISSUER`.
    pub fn parse(raw: &str) -> Result<Self, InvalidParameter> {
        Self::parse_field(raw, "asset")
    }

    /// Same as [`Asset::parse`], reporting failures against `field`.
    pub fn parse_field(raw: &str, field: &str) -> Result<Self, InvalidParameter> {
        if raw == "XLM" || raw == "xlm" || raw == "native" {
            return Ok(Self::Native);
        }

        let Some((code, issuer)) = raw.split_once(['-', ':']) else {
            return Err(InvalidParameter::new(
                field,
                format!("{raw:?} is neither native nor CODE-ISSUER"),
            ));
        };
        validate_code(code, field)?;
        let issuer = AccountId::parse(issuer)
            .map_err(|_| InvalidParameter::new(field, format!("bad issuer {issuer:?}")))?;

        Ok(Self::Issued {
            code: code.to_string(),
            issuer,
        })
    }

    /// True for the ledger's native asset.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    /// Asset code. `XLM` for the native asset.
    pub fn code(&self) -> &str {
        match self {
            Self::Native => NATIVE_CODE,
            Self::Issued { code, .. } => code,
        }
    }

    /// Issuing account. `None` for the native asset.
    pub fn issuer(&self) -> Option<&AccountId> {
        match self {
            Self::Native => None,
            Self::Issued { issuer, .. } => Some(issuer),
        }
    }
}

fn validate_code(code: &str, field: &str) -> Result<(), InvalidParameter> {
    if code.is_empty() || code.len() > MAX_CODE_LEN {
        return Err(InvalidParameter::new(
            field,
            format!("asset code {code:?} must be 1-{MAX_CODE_LEN} characters"),
        ));
    }
    if !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(InvalidParameter::new(
            field,
            format!("asset code {code:?} must be alphanumeric"),
        ));
    }
    Ok(())
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str(NATIVE_CODE),
            Self::Issued { code, issuer } => write!(f, "{code}-{issuer}"),
        }
    }
}

impl FromStr for Asset {
    type Err = InvalidParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <String as Deserialize>::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
