//! Escrow configuration.

use crate::error::EscrowError;
use mediator_domain::Amount;
use mediator_protocols::network::TESTNET_PASSPHRASE;
use mediator_protocols::prelude::Network;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Home domain tag written on every escrow account.
pub const DEFAULT_HOME_DOMAIN: &str = "mediator.stellar.broker";

/// Registry key prefix.
pub const DEFAULT_REGISTRY_PREFIX: &str = "mediator:";

/// Configuration shared by every escrow of a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscrowConfig {
    /// Network passphrase; every signature commits to it.
    pub network_passphrase: String,
    /// Flat amount kept on top of the per-entry reserve, in display units.
    pub reserve_base: Decimal,
    /// Fee per operation in stroops.
    pub fee_per_operation: u32,
    /// Minimum total fee for fee-bump wrappers in stroops.
    pub fee_bump_fee: i64,
    /// Home domain tag.
    pub home_domain: String,
    /// Prefix prepended to escrow addresses in the registry.
    pub registry_prefix: String,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            network_passphrase: TESTNET_PASSPHRASE.to_string(),
            reserve_base: Decimal::new(5, 0),
            fee_per_operation: 100_000, // 0.01 XLM
            fee_bump_fee: 1_000_000,    // 0.1 XLM
            home_domain: DEFAULT_HOME_DOMAIN.to_string(),
            registry_prefix: DEFAULT_REGISTRY_PREFIX.to_string(),
        }
    }
}

impl EscrowConfig {
    /// Defaults overridden by `MEDIATOR_*` variables, reading `.env` first.
    pub fn from_env() -> Result<Self, EscrowError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `MEDIATOR_*` key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EscrowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(passphrase) = lookup("MEDIATOR_NETWORK_PASSPHRASE") {
            config.network_passphrase = passphrase;
        }
        if let Some(value) = lookup("MEDIATOR_RESERVE_BASE") {
            config.reserve_base = parse_var("MEDIATOR_RESERVE_BASE", &value)?;
        }
        if let Some(value) = lookup("MEDIATOR_FEE_PER_OPERATION") {
            config.fee_per_operation = parse_var("MEDIATOR_FEE_PER_OPERATION", &value)?;
        }
        if let Some(value) = lookup("MEDIATOR_FEE_BUMP_FEE") {
            config.fee_bump_fee = parse_var("MEDIATOR_FEE_BUMP_FEE", &value)?;
        }
        if let Some(domain) = lookup("MEDIATOR_HOME_DOMAIN") {
            config.home_domain = domain;
        }
        if let Some(prefix) = lookup("MEDIATOR_REGISTRY_PREFIX") {
            config.registry_prefix = prefix;
        }
        config.reserve_base()?;
        Ok(config)
    }

    /// Network derived from the configured passphrase.
    #[must_use]
    pub fn network(&self) -> Network {
        Network::new(self.network_passphrase.clone())
    }

    /// Reserve base as a ledger amount.
    pub fn reserve_base(&self) -> Result<Amount, EscrowError> {
        let amount = Amount::from_decimal(self.reserve_base)
            .map_err(|e| EscrowError::amount("reserve_base", e))?;
        if amount.minor() < 0 {
            return Err(EscrowError::invalid("reserve_base", "must not be negative"));
        }
        Ok(amount)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, EscrowError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| EscrowError::invalid(key, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EscrowConfig::default();
        assert_eq!(config.reserve_base, dec!(5));
        assert_eq!(config.fee_per_operation, 100_000);
        assert_eq!(config.registry_prefix, "mediator:");
        assert_eq!(config.reserve_base().unwrap(), Amount::from_units(5));
        assert_eq!(config.network(), Network::testnet());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("MEDIATOR_RESERVE_BASE", "2.5"),
            ("MEDIATOR_FEE_PER_OPERATION", "200"),
            ("MEDIATOR_REGISTRY_PREFIX", "escrow/"),
        ]);
        let config = EscrowConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.reserve_base, dec!(2.5));
        assert_eq!(config.fee_per_operation, 200);
        assert_eq!(config.registry_prefix, "escrow/");
        assert_eq!(config.home_domain, DEFAULT_HOME_DOMAIN);
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let err = EscrowConfig::from_lookup(|k| {
            (k == "MEDIATOR_FEE_PER_OPERATION").then(|| "lots".to_string())
        })
        .unwrap_err();
        assert_eq!(err.code(), 1001);

        let err = EscrowConfig::from_lookup(|k| {
            (k == "MEDIATOR_RESERVE_BASE").then(|| "-1".to_string())
        })
        .unwrap_err();
        assert_eq!(err.code(), 1001);
    }

    #[test]
    fn test_deserializes_partial_json() {
        let config: EscrowConfig =
            serde_json::from_str(r#"{"home_domain": "example.org"}"#).unwrap();
        assert_eq!(config.home_domain, "example.org");
        assert_eq!(config.fee_per_operation, 100_000);
    }
}
