//! Configuration for the rail gateway
//!
//! Amounts are decimal strings because TOML integers stop at `i64::MAX` and
//! the rail works in `u128` minor units.

use crate::{Error, Result};
use ed25519_dalek::VerifyingKey;
use message_bus::{AmountBounds, FeeSchedule};
use protocol_core::{Address, DomainId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Labels whose derived addresses are the default principals
const DEFAULT_ADMIN_LABEL: &str = "admin";
const DEFAULT_RELAY_LABEL: &str = "relay";

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Local routing domain
    pub domain: u32,

    /// Genesis administrator (hex address)
    pub admin: String,

    /// Delivery service principal allowed to hand over inbound deliveries (hex address)
    pub relay: String,

    /// Credit-transfer amount bounds
    pub amounts: AmountsConfig,

    /// Actor configuration
    pub actor: ActorConfig,

    /// Delivery configuration
    pub delivery: DeliveryConfig,

    /// Initial liquidity pool reserves
    pub reserves: Vec<ReserveConfig>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "rail-gateway".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            domain: 1,
            admin: Address::derive(DEFAULT_ADMIN_LABEL).to_hex(),
            relay: Address::derive(DEFAULT_RELAY_LABEL).to_hex(),
            amounts: AmountsConfig::default(),
            actor: ActorConfig::default(),
            delivery: DeliveryConfig::default(),
            reserves: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Amount bounds (decimal strings, minor units)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountsConfig {
    /// Minimum accepted amount
    pub minimum: String,

    /// Maximum accepted amount
    pub maximum: String,
}

impl Default for AmountsConfig {
    fn default() -> Self {
        let bounds = AmountBounds::default();
        Self {
            minimum: bounds.min.to_string(),
            maximum: bounds.max.to_string(),
        }
    }
}

/// Actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Mailbox capacity (bounded for backpressure)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

/// Delivery service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Flat fee per delivery
    pub base_fee: u64,

    /// Fee per transported byte
    pub per_byte_fee: u64,

    /// Relay Ed25519 public key (hex). Without it every relay proof is accepted.
    pub relay_public_key: Option<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        let fees = FeeSchedule::default();
        Self {
            base_fee: fees.base_fee as u64,
            per_byte_fee: fees.per_byte_fee as u64,
            relay_public_key: None,
        }
    }
}

/// Initial reserve for one asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveConfig {
    /// Asset: `0x`-prefixed hex address, or a symbol hashed into one
    pub asset: String,

    /// Reserve amount (decimal string, minor units)
    pub amount: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,

    /// Default filter when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults overridden by `GATEWAY_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(domain) = var("GATEWAY_DOMAIN") {
            self.domain = parse_number("GATEWAY_DOMAIN", &domain)?;
        }
        if let Some(admin) = var("GATEWAY_ADMIN") {
            self.admin = admin;
        }
        if let Some(relay) = var("GATEWAY_RELAY") {
            self.relay = relay;
        }
        if let Some(minimum) = var("GATEWAY_MIN_AMOUNT") {
            self.amounts.minimum = minimum;
        }
        if let Some(maximum) = var("GATEWAY_MAX_AMOUNT") {
            self.amounts.maximum = maximum;
        }
        if let Some(capacity) = var("GATEWAY_MAILBOX_CAPACITY") {
            self.actor.mailbox_capacity = parse_number("GATEWAY_MAILBOX_CAPACITY", &capacity)?;
        }
        if let Some(fee) = var("GATEWAY_BASE_FEE") {
            self.delivery.base_fee = parse_number("GATEWAY_BASE_FEE", &fee)?;
        }
        if let Some(fee) = var("GATEWAY_PER_BYTE_FEE") {
            self.delivery.per_byte_fee = parse_number("GATEWAY_PER_BYTE_FEE", &fee)?;
        }
        if let Some(key) = var("GATEWAY_RELAY_PUBLIC_KEY") {
            self.delivery.relay_public_key = Some(key);
        }
        if let Some(json) = var("GATEWAY_LOG_JSON") {
            self.logging.json = matches!(json.as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    /// Check every derived value
    pub fn validate(&self) -> Result<()> {
        if self.actor.mailbox_capacity == 0 {
            return Err(Error::Config("actor.mailbox_capacity must be positive".into()));
        }
        self.admin_address()?;
        self.relay_address()?;
        self.amount_bounds()?;
        self.relay_key()?;
        self.initial_reserves()?;
        Ok(())
    }

    /// Local domain
    pub fn domain_id(&self) -> DomainId {
        DomainId(self.domain)
    }

    /// Genesis administrator
    pub fn admin_address(&self) -> Result<Address> {
        parse_address("admin", &self.admin)
    }

    /// Delivery service principal
    pub fn relay_address(&self) -> Result<Address> {
        parse_address("relay", &self.relay)
    }

    /// Principals still set to their well-known default address. Anyone can
    /// derive those, so a deployment must override them.
    pub fn default_principals(&self) -> Vec<&'static str> {
        let mut defaults = Vec::new();
        if self.admin_address().ok() == Some(Address::derive(DEFAULT_ADMIN_LABEL)) {
            defaults.push("admin");
        }
        if self.relay_address().ok() == Some(Address::derive(DEFAULT_RELAY_LABEL)) {
            defaults.push("relay");
        }
        defaults
    }

    /// Credit-transfer amount bounds
    pub fn amount_bounds(&self) -> Result<AmountBounds> {
        let min = parse_amount("amounts.minimum", &self.amounts.minimum)?;
        let max = parse_amount("amounts.maximum", &self.amounts.maximum)?;
        AmountBounds::new(min, max).map_err(|e| Error::Config(e.to_string()))
    }

    /// Delivery fee schedule
    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule {
            base_fee: u128::from(self.delivery.base_fee),
            per_byte_fee: u128::from(self.delivery.per_byte_fee),
        }
    }

    /// Relay verification key, if configured
    pub fn relay_key(&self) -> Result<Option<VerifyingKey>> {
        let Some(key) = &self.delivery.relay_public_key else {
            return Ok(None);
        };
        let bytes = hex::decode(key.trim_start_matches("0x"))
            .map_err(|e| Error::Config(format!("relay_public_key: {}", e)))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::Config("relay_public_key must be 32 bytes".into()))?;
        VerifyingKey::from_bytes(&bytes)
            .map(Some)
            .map_err(|e| Error::Config(format!("relay_public_key: {}", e)))
    }

    /// Initial reserves as (asset, amount)
    pub fn initial_reserves(&self) -> Result<Vec<(Address, u128)>> {
        self.reserves
            .iter()
            .map(|r| {
                let asset = if r.asset.starts_with("0x") {
                    parse_address("reserves.asset", &r.asset)?
                } else {
                    Address::derive(&r.asset)
                };
                Ok((asset, parse_amount("reserves.amount", &r.amount)?))
            })
            .collect()
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address> {
    Address::from_hex(value)
        .ok_or_else(|| Error::Config(format!("{}: invalid address {:?}", field, value)))
}

fn parse_amount(field: &str, value: &str) -> Result<u128> {
    value
        .trim()
        .replace('_', "")
        .parse()
        .map_err(|e| Error::Config(format!("{}: {}", field, e)))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| Error::Config(format!("{}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.amount_bounds().unwrap(), AmountBounds::default());
        assert!(config.relay_key().unwrap().is_none());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
domain = 7

[amounts]
minimum = "100"
maximum = "1_000_000"

[delivery]
base_fee = 5
per_byte_fee = 0

[[reserves]]
asset = "USD"
amount = "1000000000000000000000"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.domain_id(), DomainId(7));
        assert_eq!(config.amount_bounds().unwrap(), AmountBounds::new(100, 1_000_000).unwrap());
        assert_eq!(config.fee_schedule().fee_for(180), 5);
        assert_eq!(
            config.initial_reserves().unwrap(),
            vec![(Address::derive("USD"), 1_000_000_000_000_000_000_000)]
        );
        assert_eq!(config.actor.mailbox_capacity, 1000);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GATEWAY_DOMAIN", "3"),
            ("GATEWAY_MAILBOX_CAPACITY", "16"),
            ("GATEWAY_LOG_JSON", "true"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.domain, 3);
        assert_eq!(config.actor.mailbox_capacity, 16);
        assert!(config.logging.json);

        let mut config = Config::default();
        let err = config
            .apply_env(|key| (key == "GATEWAY_DOMAIN").then(|| "not-a-number".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_default_principals_reported() {
        let mut config = Config::default();
        assert_eq!(config.default_principals(), vec!["admin", "relay"]);

        let ops = Address::derive("ops-multisig").to_hex();
        config
            .apply_env(|key| (key == "GATEWAY_ADMIN").then(|| ops.clone()))
            .unwrap();
        assert_eq!(config.default_principals(), vec!["relay"]);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let mut config = Config::default();
        config.amounts.minimum = "0".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.amounts.maximum = "abc".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.delivery.relay_public_key = Some("00ff".into());
        assert!(config.validate().is_err());
    }
}
