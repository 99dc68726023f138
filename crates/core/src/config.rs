//! Application configuration, stored at `~/.vantage/vantage.json`.
//!
//! Every field has a serde default so a partial (or absent) file still
//! yields a working configuration. Tuning knobs — cache TTLs, rate
//! limiter shape, analyzer thresholds — live here rather than in code.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use vantage_common::error::{VantageError, VantageResult};
use vantage_common::types::ChainId;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Per-chain RPC endpoint overrides (ordered, primary first). Chains
    /// without an entry use the built-in endpoints.
    #[serde(default)]
    pub rpc_overrides: HashMap<ChainId, Vec<String>>,

    #[serde(default)]
    pub price: PriceConfig,

    #[serde(default)]
    pub portfolio: PortfolioConfig,

    #[serde(default)]
    pub analyzer: AnalyzerSettings,
}

/// Price resolution knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceConfig {
    /// Price cache TTL in seconds.
    #[serde(default = "default_price_ttl")]
    pub cache_ttl_secs: u64,

    /// Token bucket gating remote price reads.
    #[serde(default = "default_bucket_capacity")]
    pub bucket_capacity: f64,
    #[serde(default = "default_bucket_refill")]
    pub bucket_refill_per_sec: f64,
}

impl PriceConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Aggregation knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Portfolio snapshot cache TTL in seconds.
    #[serde(default = "default_snapshot_ttl")]
    pub snapshot_ttl_secs: u64,

    /// Whole-request timeout in seconds; on expiry partial results are
    /// discarded.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl PortfolioConfig {
    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Yield analyzer thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerSettings {
    #[serde(default = "default_min_value")]
    pub min_position_value_usd: Decimal,
    #[serde(default = "default_min_improvement")]
    pub min_apy_improvement: Decimal,
}

fn default_price_ttl() -> u64 {
    300
}
fn default_bucket_capacity() -> f64 {
    10.0
}
fn default_bucket_refill() -> f64 {
    0.5
}
fn default_snapshot_ttl() -> u64 {
    120
}
fn default_request_timeout() -> u64 {
    30
}
fn default_min_value() -> Decimal {
    dec!(100)
}
fn default_min_improvement() -> Decimal {
    dec!(0.005)
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_price_ttl(),
            bucket_capacity: default_bucket_capacity(),
            bucket_refill_per_sec: default_bucket_refill(),
        }
    }
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl_secs: default_snapshot_ttl(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            min_position_value_usd: default_min_value(),
            min_apy_improvement: default_min_improvement(),
        }
    }
}

impl AppConfig {
    /// Config file location: `$HOME/.vantage/vantage.json`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".vantage").join("vantage.json"))
    }

    /// Load from disk, falling back to defaults when the file is absent.
    /// A present-but-malformed file is a configuration error.
    pub fn load() -> VantageResult<Self> {
        let Some(path) = Self::path() else {
            return Ok(Self::default());
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::from_json_str(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(VantageError::Config(format!(
                "read {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(s: &str) -> VantageResult<Self> {
        serde_json::from_str(s).map_err(|e| VantageError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.price.cache_ttl_secs, 300);
        assert_eq!(config.price.bucket_capacity, 10.0);
        assert_eq!(config.price.bucket_refill_per_sec, 0.5);
        assert_eq!(config.portfolio.snapshot_ttl_secs, 120);
        assert_eq!(config.portfolio.request_timeout_secs, 30);
        assert_eq!(config.analyzer.min_position_value_usd, dec!(100));
        assert_eq!(config.analyzer.min_apy_improvement, dec!(0.005));
        assert!(config.rpc_overrides.is_empty());
    }

    #[test]
    fn test_config_roundtrip_json() {
        let mut config = AppConfig::default();
        config
            .rpc_overrides
            .insert(ChainId::Base, vec!["http://127.0.0.1:8545".into()]);
        let json = config.to_json_string().unwrap();
        let parsed = AppConfig::from_json_str(&json).unwrap();
        assert_eq!(
            parsed.rpc_overrides[&ChainId::Base],
            vec!["http://127.0.0.1:8545".to_string()]
        );
        assert_eq!(parsed.price.cache_ttl_secs, config.price.cache_ttl_secs);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed =
            AppConfig::from_json_str(r#"{ "price": { "cache_ttl_secs": 60 } }"#).unwrap();
        assert_eq!(parsed.price.cache_ttl_secs, 60);
        // untouched knobs fall back
        assert_eq!(parsed.price.bucket_capacity, 10.0);
        assert_eq!(parsed.portfolio.request_timeout_secs, 30);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        assert!(AppConfig::from_json_str("{ nope").is_err());
    }
}
