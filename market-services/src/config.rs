//! Service configuration from environment variables

use alloy_primitives::{Address, U256};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::aggregator::{AggregatorSettings, MarketMetadata, DEFAULT_QUESTION, DEFAULT_VOLUME_ESTIMATE};
use crate::watcher::DEFAULT_REFRESH_INTERVAL;

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_CHAIN_ID: u64 = 31337;
const DEFAULT_SERVER_PORT: u16 = 3001;
const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 15;

/// Runtime configuration of the market service
#[derive(Clone)]
pub struct ServiceConfig {
    pub rpc_url: Url,
    /// Chain the node is expected to serve
    pub chain_id: u64,
    /// Market maker to read; `None` runs in demo mode
    pub market_maker: Option<Address>,
    pub oracle_controller: Option<Address>,
    pub oracle_private_key: Option<String>,
    pub question: String,
    /// Creation time of the market; `None` uses process start
    pub created_at: Option<i64>,
    pub volume_estimate: U256,
    pub refresh_interval: Duration,
    pub refresh_timeout: Duration,
    pub server_port: u16,
}

impl ServiceConfig {
    /// Load configuration from the process environment
    ///
    /// Reads:
    /// - RPC_URL, CHAIN_ID
    /// - MARKET_MAKER_ADDRESS (unset or empty: demo mode)
    /// - ORACLE_CONTROLLER_ADDRESS, ORACLE_PRIVATE_KEY (admin trigger)
    /// - MARKET_QUESTION, MARKET_CREATED_AT, MARKET_VOLUME_ESTIMATE
    /// - REFRESH_INTERVAL_SECS, REFRESH_TIMEOUT_SECS, SERVER_PORT
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Empty values count as unset
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let rpc_url = match parse_opt::<Url>(&var, "RPC_URL")? {
            Some(url) => url,
            None => Url::parse(DEFAULT_RPC_URL).map_err(|e| ConfigError::Invalid {
                var: "RPC_URL",
                reason: e.to_string(),
            })?,
        };
        let chain_id = parse_or(&var, "CHAIN_ID", DEFAULT_CHAIN_ID)?;
        let market_maker = parse_opt::<Address>(&var, "MARKET_MAKER_ADDRESS")?;
        let oracle_controller = parse_opt::<Address>(&var, "ORACLE_CONTROLLER_ADDRESS")?;
        let created_at = parse_opt::<i64>(&var, "MARKET_CREATED_AT")?;
        let volume_estimate = parse_or(
            &var,
            "MARKET_VOLUME_ESTIMATE",
            U256::from(DEFAULT_VOLUME_ESTIMATE),
        )?;
        let refresh_interval = parse_or(
            &var,
            "REFRESH_INTERVAL_SECS",
            DEFAULT_REFRESH_INTERVAL.as_secs(),
        )?;
        let refresh_timeout = parse_or(&var, "REFRESH_TIMEOUT_SECS", DEFAULT_REFRESH_TIMEOUT_SECS)?;
        let server_port = parse_or(&var, "SERVER_PORT", DEFAULT_SERVER_PORT)?;

        if refresh_interval == 0 {
            return Err(ConfigError::Invalid {
                var: "REFRESH_INTERVAL_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if refresh_timeout == 0 {
            return Err(ConfigError::Invalid {
                var: "REFRESH_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            rpc_url,
            chain_id,
            market_maker,
            oracle_controller,
            oracle_private_key: var("ORACLE_PRIVATE_KEY"),
            question: var("MARKET_QUESTION").unwrap_or_else(|| DEFAULT_QUESTION.to_string()),
            created_at,
            volume_estimate,
            refresh_interval: Duration::from_secs(refresh_interval),
            refresh_timeout: Duration::from_secs(refresh_timeout),
            server_port,
        })
    }

    /// Whether the admin oracle trigger can be enabled
    pub fn admin_enabled(&self) -> bool {
        self.oracle_controller.is_some() && self.oracle_private_key.is_some()
    }

    /// Aggregator settings; `started_at` stands in for a missing creation time
    pub fn aggregator_settings(&self, started_at: i64) -> AggregatorSettings {
        AggregatorSettings {
            metadata: MarketMetadata {
                question: self.question.clone(),
                created_at: self.created_at.unwrap_or(started_at),
            },
            volume_estimate: self.volume_estimate,
            timeout: self.refresh_timeout,
        }
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("chain_id", &self.chain_id)
            .field("market_maker", &self.market_maker)
            .field("oracle_controller", &self.oracle_controller)
            .field("oracle_private_key", &self.oracle_private_key.as_ref().map(|_| "<redacted>"))
            .field("question", &self.question)
            .field("created_at", &self.created_at)
            .field("volume_estimate", &self.volume_estimate)
            .field("refresh_interval", &self.refresh_interval)
            .field("refresh_timeout", &self.refresh_timeout)
            .field("server_port", &self.server_port)
            .finish()
    }
}

fn parse_opt<T>(var: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(key)
        .map(|value| {
            value.parse::<T>().map_err(|e| ConfigError::Invalid {
                var: key,
                reason: format!("{:?}: {}", value, e),
            })
        })
        .transpose()
}

fn parse_or<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(var, key)?.unwrap_or(default))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.rpc_url.as_str(), "http://127.0.0.1:8545/");
        assert_eq!(config.chain_id, 31337);
        assert!(config.market_maker.is_none());
        assert!(!config.admin_enabled());
        assert_eq!(config.question, DEFAULT_QUESTION);
        assert_eq!(config.volume_estimate, U256::from(DEFAULT_VOLUME_ESTIMATE));
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.refresh_timeout, Duration::from_secs(15));
        assert_eq!(config.server_port, 3001);
    }

    #[test]
    fn test_empty_address_is_demo_mode() {
        let config = config(&[("MARKET_MAKER_ADDRESS", "  ")]).unwrap();
        assert!(config.market_maker.is_none());
    }

    #[test]
    fn test_parses_values() {
        let config = config(&[
            ("MARKET_MAKER_ADDRESS", "0x1234567890123456789012345678901234567890"),
            ("ORACLE_CONTROLLER_ADDRESS", "0x2345678901234567890123456789012345678901"),
            ("ORACLE_PRIVATE_KEY", "0xabc"),
            ("MARKET_CREATED_AT", "1700000000"),
            ("MARKET_VOLUME_ESTIMATE", "42"),
            ("SERVER_PORT", "8080"),
        ])
        .unwrap();

        assert!(config.market_maker.is_some());
        assert!(config.admin_enabled());
        assert_eq!(config.created_at, Some(1_700_000_000));
        assert_eq!(config.volume_estimate, U256::from(42u8));
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.aggregator_settings(5).metadata.created_at, 1_700_000_000);
    }

    #[test]
    fn test_invalid_address_rejected() {
        let err = config(&[("MARKET_MAKER_ADDRESS", "not-an-address")]).unwrap_err();
        assert!(err.to_string().contains("MARKET_MAKER_ADDRESS"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(config(&[("REFRESH_INTERVAL_SECS", "0")]).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = config(&[("REFRESH_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(err.to_string().contains("REFRESH_TIMEOUT_SECS"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = config(&[("ORACLE_PRIVATE_KEY", "0xdeadbeef")]).unwrap();
        assert!(!format!("{:?}", config).contains("deadbeef"));
    }
}
