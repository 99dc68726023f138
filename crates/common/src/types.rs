//! Universal types shared across all protocol modules.
//!
//! Every module converts its protocol-specific data into these types.
//! CLI and downstream consumers see only these — never protocol-specific
//! structs.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{VantageError, VantageResult};

/// Chain identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainId {
    Ethereum,
    Arbitrum,
    Base,
    Solana,
    // Future: Optimism, Polygon, etc.
}

impl ChainId {
    /// All chains supported at startup.
    pub fn all() -> &'static [ChainId] {
        &[
            ChainId::Ethereum,
            ChainId::Arbitrum,
            ChainId::Base,
            ChainId::Solana,
        ]
    }

    /// Which address/client family this chain belongs to.
    pub fn family(self) -> NetworkFamily {
        match self {
            ChainId::Solana => NetworkFamily::Svm,
            _ => NetworkFamily::Evm,
        }
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainId::Ethereum => write!(f, "ethereum"),
            ChainId::Arbitrum => write!(f, "arbitrum"),
            ChainId::Base => write!(f, "base"),
            ChainId::Solana => write!(f, "solana"),
        }
    }
}

impl FromStr for ChainId {
    type Err = VantageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ethereum" | "eth" => Ok(ChainId::Ethereum),
            "arbitrum" | "arb" => Ok(ChainId::Arbitrum),
            "base" => Ok(ChainId::Base),
            "solana" | "sol" => Ok(ChainId::Solana),
            other => Err(VantageError::UnsupportedChain(other.to_string())),
        }
    }
}

/// Network family — determines address format and client type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkFamily {
    /// EVM chains: 0x-prefixed 20-byte hex addresses.
    Evm,
    /// Solana-style chains: base58 32-byte account ids.
    Svm,
}

/// A syntactically validated wallet address.
///
/// Validation happens before any remote call; a malformed address is a
/// client error, not a pipeline failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAddress {
    raw: String,
    family: NetworkFamily,
}

impl WalletAddress {
    /// Parse and validate an address, inferring its network family.
    pub fn parse(s: &str) -> VantageResult<Self> {
        let s = s.trim();
        if s.starts_with("0x") || s.starts_with("0X") {
            let addr: alloy::primitives::Address = s
                .parse()
                .map_err(|_| VantageError::InvalidAddress(s.to_string()))?;
            return Ok(Self {
                raw: format!("{addr:#x}"),
                family: NetworkFamily::Evm,
            });
        }
        match bs58::decode(s).into_vec() {
            Ok(bytes) if bytes.len() == 32 => Ok(Self {
                raw: s.to_string(),
                family: NetworkFamily::Svm,
            }),
            _ => Err(VantageError::InvalidAddress(s.to_string())),
        }
    }

    pub fn family(&self) -> NetworkFamily {
        self.family
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The address as an EVM `Address`. Errors for base58 addresses.
    pub fn evm(&self) -> VantageResult<alloy::primitives::Address> {
        if self.family != NetworkFamily::Evm {
            return Err(VantageError::InvalidAddress(format!(
                "{} is not an EVM address",
                self.raw
            )));
        }
        self.raw
            .parse()
            .map_err(|_| VantageError::InvalidAddress(self.raw.clone()))
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// A known token on a chain — catalog entry used to scope balance checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Contract address (mint address on Solana).
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    /// Optional id in an external price catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
}

/// A valued token holding, produced fresh each fetch cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBalance {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    /// Raw integer balance in base units, as a decimal string.
    pub raw_balance: String,
    /// Human-formatted balance (raw / 10^decimals).
    pub balance: Decimal,
    pub price_usd: Decimal,
    /// balance × price_usd.
    pub value_usd: Decimal,
}

/// Protocol category — which adapter family a protocol belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolCategory {
    Lending,
    LiquidStaking,
    Restaking,
    ConcentratedLiquidity,
}

impl std::fmt::Display for ProtocolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolCategory::Lending => write!(f, "lending"),
            ProtocolCategory::LiquidStaking => write!(f, "liquid-staking"),
            ProtocolCategory::Restaking => write!(f, "restaking"),
            ProtocolCategory::ConcentratedLiquidity => write!(f, "concentrated-liquidity"),
        }
    }
}

/// Protocol descriptor carried on every position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolInfo {
    /// Stable id, e.g. "aave-v3".
    pub id: String,
    /// Display name, e.g. "Aave V3".
    pub name: String,
    pub category: ProtocolCategory,
    /// Whether positions in this protocol earn yield.
    pub earns_yield: bool,
}

/// Position type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionType {
    Supply,
    Borrow,
    Stake,
    Restake,
    Liquidity,
    Collateral,
}

impl std::fmt::Display for PositionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionType::Supply => write!(f, "supply"),
            PositionType::Borrow => write!(f, "borrow"),
            PositionType::Stake => write!(f, "stake"),
            PositionType::Restake => write!(f, "restake"),
            PositionType::Liquidity => write!(f, "liquidity"),
            PositionType::Collateral => write!(f, "collateral"),
        }
    }
}

/// A structured DeFi position discovered by a protocol adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Stable id — repeated fetches of unchanged state produce the same id.
    pub id: String,
    pub protocol: ProtocolInfo,
    pub chain: ChainId,
    pub position_type: PositionType,
    pub tokens: Vec<TokenBalance>,
    /// Signed: positive for assets, negative for liabilities.
    pub value_usd: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apy: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apr: Option<Decimal>,
    /// Liquidation-risk ratio; absent when not applicable or out of sane range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_factor: Option<Decimal>,
    /// Protocol-specific extras: tick range, vault name, delegation target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Position {
    /// Derive the stable position id from its identity components.
    pub fn derive_id(
        protocol_id: &str,
        chain: ChainId,
        market: &str,
        position_type: PositionType,
    ) -> String {
        format!("{protocol_id}:{chain}:{market}:{position_type}")
    }

    /// The position's primary token symbol (first entry), if any.
    pub fn primary_symbol(&self) -> Option<&str> {
        self.tokens.first().map(|t| t.symbol.as_str())
    }
}

/// Wallet-level (non-protocol) balances, grouped per chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletBalances {
    pub by_chain: HashMap<ChainId, Vec<TokenBalance>>,
    pub total_value_usd: Decimal,
}

/// A grouping bucket in the portfolio read model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionGroup {
    pub total_value_usd: Decimal,
    pub positions: Vec<Position>,
}

/// The assembled portfolio — a pure, immutable read model built once per
/// request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub address: String,
    /// Sum of all position values plus wallet token values.
    pub total_value_usd: Decimal,
    pub positions: Vec<Position>,
    /// Contains an entry for every requested chain, even when empty.
    pub by_chain: HashMap<ChainId, PositionGroup>,
    pub by_protocol: HashMap<String, PositionGroup>,
    pub by_type: HashMap<PositionType, PositionGroup>,
    pub wallet: WalletBalances,
    pub fetched_at: DateTime<Utc>,
}

/// A protocol-wide yield rate fact, scraped fresh per analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldRate {
    pub protocol_id: String,
    pub protocol_name: String,
    pub chain: ChainId,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub position_type: PositionType,
    pub apy: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apr: Option<Decimal>,
}

/// Where a resolved price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Cache,
    Oracle,
    Synthetic,
    Unknown,
}

/// A resolved USD price. Price 0 with source `Unknown` means "value
/// unknown", not "value is zero".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price_usd: Decimal,
    pub source: PriceSource,
}

/// Hand-curated protocol maturity classification — a heuristic, not a
/// risk model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::Low => write!(f, "low"),
            RiskTier::Medium => write!(f, "medium"),
            RiskTier::High => write!(f, "high"),
        }
    }
}

/// A better-rate alternative for a held position or idle asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldAlternative {
    pub protocol_id: String,
    pub protocol_name: String,
    pub chain: ChainId,
    pub symbol: String,
    pub apy: Decimal,
    /// apy − current apy (0 baseline for idle assets).
    pub apy_improvement: Decimal,
    /// apy_improvement × position value.
    pub annual_gain_usd: Decimal,
    pub risk: RiskTier,
}

/// A yield-bearing position together with its ranked better alternatives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldOpportunity {
    pub position: Position,
    pub current_apy: Decimal,
    /// Ranked descending by APY.
    pub better_alternatives: Vec<YieldAlternative>,
    /// Top alternative's annual USD gain.
    pub potential_gain_usd: Decimal,
}

/// A non-yielding holding with its top ranked yield suggestions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdleAsset {
    pub chain: ChainId,
    pub symbol: String,
    pub value_usd: Decimal,
    /// Top-3 by APY across all known rates for an equivalent asset.
    pub suggestions: Vec<YieldAlternative>,
}

/// The yield analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldAnalysis {
    pub address: String,
    /// Annual USD earned at current rates.
    pub total_current_yield_usd: Decimal,
    /// Annual USD if every opportunity's best alternative were taken.
    pub total_potential_yield_usd: Decimal,
    /// Sorted descending by potential annual USD gain.
    pub opportunities: Vec<YieldOpportunity>,
    pub idle_assets: Vec<IdleAsset>,
    pub analyzed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_family() {
        assert_eq!(ChainId::Ethereum.family(), NetworkFamily::Evm);
        assert_eq!(ChainId::Base.family(), NetworkFamily::Evm);
        assert_eq!(ChainId::Solana.family(), NetworkFamily::Svm);
    }

    #[test]
    fn test_chain_from_str() {
        assert_eq!("ethereum".parse::<ChainId>().unwrap(), ChainId::Ethereum);
        assert_eq!("ARB".parse::<ChainId>().unwrap(), ChainId::Arbitrum);
        assert!("near".parse::<ChainId>().is_err());
    }

    #[test]
    fn test_parse_evm_address() {
        let addr = WalletAddress::parse("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045").unwrap();
        assert_eq!(addr.family(), NetworkFamily::Evm);
        assert!(addr.evm().is_ok());
    }

    #[test]
    fn test_parse_base58_address() {
        // 32-byte base58 account id
        let addr = WalletAddress::parse("4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T").unwrap();
        assert_eq!(addr.family(), NetworkFamily::Svm);
        assert!(addr.evm().is_err());
    }

    #[test]
    fn test_parse_invalid_address() {
        assert!(WalletAddress::parse("0x1234").is_err());
        assert!(WalletAddress::parse("not-an-address!").is_err());
        assert!(WalletAddress::parse("").is_err());
    }

    #[test]
    fn test_position_id_stable() {
        let a = Position::derive_id("aave-v3", ChainId::Ethereum, "USDC", PositionType::Supply);
        let b = Position::derive_id("aave-v3", ChainId::Ethereum, "USDC", PositionType::Supply);
        assert_eq!(a, b);
        assert_eq!(a, "aave-v3:ethereum:USDC:supply");

        let c = Position::derive_id("aave-v3", ChainId::Ethereum, "USDC", PositionType::Borrow);
        assert_ne!(a, c);
    }

    #[test]
    fn test_chain_map_serializes_with_string_keys() {
        let mut by_chain: HashMap<ChainId, PositionGroup> = HashMap::new();
        by_chain.insert(ChainId::Arbitrum, PositionGroup::default());
        let json = serde_json::to_value(&by_chain).unwrap();
        assert!(json.get("arbitrum").is_some());
    }
}
