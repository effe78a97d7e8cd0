//! Service configuration with validation and environment overrides.
//!
//! Every security-critical value (signing key, shared secret, contract
//! address, endpoint pool) is required: `validate()` fails closed rather
//! than letting an operation proceed with a missing credential.

use crate::errors::{OracleError, OracleResult};
use crate::game::types::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub chain: ChainConfig,
    pub signer: SignerConfig,
    pub api: ApiConfig,
    pub enumeration: EnumerationConfig,
}

/// RPC pool and transaction parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Ordered provider list; earlier entries are preferred.
    pub rpc_endpoints: Vec<String>,
    pub contract_address: String,
    pub chain_id: u64,
    pub max_retries_per_endpoint: u32,
    pub backoff_base_ms: u64,
    pub request_timeout_ms: u64,
    pub gas_limit: u64,
    /// Used when the gas price lookup itself fails.
    pub gas_price_fallback_wei: u64,
    pub confirm_timeout_ms: u64,
    pub confirm_poll_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_endpoints: vec![],
            contract_address: String::new(),
            chain_id: 0,
            max_retries_per_endpoint: 3,
            backoff_base_ms: 250,
            request_timeout_ms: 10_000,
            gas_limit: 300_000,
            gas_price_fallback_wei: 1_000_000_000,
            confirm_timeout_ms: 90_000,
            confirm_poll_ms: 2_000,
        }
    }
}

/// Oracle identity and the shared authorization secret.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Hex-encoded secp256k1 private key. Signs attestations and
    /// resolution transactions.
    pub signing_key: String,
    /// Static capability token checked on every settlement invocation.
    pub shared_secret: String,
    pub lock_ttl_ms: u64,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            signing_key: String::new(),
            shared_secret: String::new(),
            lock_ttl_ms: 30_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 120,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumerationConfig {
    /// Hard cap on the index walk.
    pub max_rooms: usize,
    /// Pause between detail fetches.
    pub fetch_delay_ms: u64,
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        Self {
            max_rooms: 100,
            fetch_delay_ms: 150,
        }
    }
}

impl OracleConfig {
    pub fn from_file(path: &Path) -> OracleResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OracleError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw).map_err(|e| {
            OracleError::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Overlay environment variables onto the loaded configuration.
    /// Secrets are usually supplied this way rather than from disk.
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var("ARBITER_SIGNING_KEY") {
            self.signer.signing_key = value;
        }
        if let Ok(value) = std::env::var("ARBITER_SHARED_SECRET") {
            self.signer.shared_secret = value;
        }
        if let Ok(value) = std::env::var("ARBITER_CONTRACT_ADDRESS") {
            self.chain.contract_address = value;
        }
        if let Ok(value) = std::env::var("ARBITER_RPC_ENDPOINTS") {
            self.chain.rpc_endpoints = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(value) = env_parse::<u64>("ARBITER_CHAIN_ID") {
            self.chain.chain_id = value;
        }
        if let Some(value) = env_parse::<u16>("ARBITER_PORT") {
            self.api.port = value;
        }
    }

    pub fn validate(&self) -> OracleResult<()> {
        if self.signer.signing_key.is_empty() {
            return Err(missing("signer.signing_key"));
        }
        if self.signer.shared_secret.is_empty() {
            return Err(missing("signer.shared_secret"));
        }
        if self.chain.contract_address.is_empty() {
            return Err(missing("chain.contract_address"));
        }
        Address::from_hex(&self.chain.contract_address).map_err(|e| {
            OracleError::Configuration(format!("chain.contract_address: {}", e))
        })?;
        if self.chain.rpc_endpoints.is_empty() {
            return Err(missing("chain.rpc_endpoints"));
        }
        if self.chain.chain_id == 0 {
            return Err(missing("chain.chain_id"));
        }
        if self.enumeration.max_rooms == 0 {
            return Err(OracleError::Configuration(
                "enumeration.max_rooms must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn contract_address(&self) -> OracleResult<Address> {
        Address::from_hex(&self.chain.contract_address)
            .map_err(OracleError::Configuration)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.chain.request_timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.chain.backoff_base_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.chain.confirm_timeout_ms)
    }

    pub fn confirm_poll(&self) -> Duration {
        Duration::from_millis(self.chain.confirm_poll_ms)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_millis(self.signer.lock_ttl_ms)
    }

    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.enumeration.fetch_delay_ms)
    }
}

fn missing(field: &str) -> OracleError {
    OracleError::Configuration(format!("missing required value: {}", field))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> OracleConfig {
        let mut config = OracleConfig::default();
        config.signer.signing_key = "01".repeat(32);
        config.signer.shared_secret = "secret".to_string();
        config.chain.contract_address = format!("0x{}", "ab".repeat(20));
        config.chain.rpc_endpoints = vec!["http://rpc-1".to_string()];
        config.chain.chain_id = 1;
        config
    }

    #[test]
    fn default_config_fails_closed() {
        assert!(OracleConfig::default().validate().is_err());
    }

    #[test]
    fn complete_config_validates() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn each_required_field_is_enforced() {
        let mut config = valid_config();
        config.signer.signing_key.clear();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.signer.shared_secret.clear();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.chain.rpc_endpoints.clear();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.chain.chain_id = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.chain.contract_address = "not-hex".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn duration_conversions() {
        let config = valid_config();
        assert_eq!(config.backoff_base(), Duration::from_millis(250));
        assert_eq!(config.confirm_timeout(), Duration::from_millis(90_000));
        assert_eq!(config.lock_ttl(), Duration::from_millis(30_000));
    }
}
