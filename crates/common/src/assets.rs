//! Asset classification tables: stablecoin pegs, derivative premiums,
//! equivalence classes, and protocol risk tiers.
//!
//! All of these are hand-maintained heuristics, not computed facts. They
//! are configuration inputs to the pipeline; keeping them current is an
//! operational task. Premiums reflect that auto-compounding derivatives
//! trade structurally above their base asset.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::RiskTier;

/// Fixed peg for allow-listed stablecoins. Almost all pegs are $1; EURC
/// tracks the euro and uses a fixed approximation instead.
pub fn stablecoin_peg(symbol: &str) -> Option<Decimal> {
    match symbol.to_ascii_uppercase().as_str() {
        "USDC" | "USDT" | "DAI" | "FRAX" | "LUSD" | "USDE" | "GUSD" | "USDP" => Some(dec!(1)),
        "EURC" => Some(dec!(1.08)),
        _ => None,
    }
}

pub fn is_stablecoin(symbol: &str) -> bool {
    stablecoin_peg(symbol).is_some()
}

/// Known wrapped/liquid-staking/restaked derivatives: (base asset, fixed
/// premium factor over the base price).
pub fn derivative_premium(symbol: &str) -> Option<(&'static str, Decimal)> {
    match symbol.to_ascii_uppercase().as_str() {
        // Wrappers track the base 1:1.
        "WETH" => Some(("ETH", dec!(1))),
        "WBTC" => Some(("BTC", dec!(1))),
        "WSOL" => Some(("SOL", dec!(1))),
        // Rebasing LST: redemption value tracks the base.
        "STETH" => Some(("ETH", dec!(1))),
        // Value-accruing derivatives.
        "WSTETH" => Some(("ETH", dec!(1.18))),
        "RETH" => Some(("ETH", dec!(1.12))),
        "CBETH" => Some(("ETH", dec!(1.09))),
        "WEETH" => Some(("ETH", dec!(1.04))),
        "MSOL" => Some(("SOL", dec!(1.13))),
        "JITOSOL" => Some(("SOL", dec!(1.16))),
        _ => None,
    }
}

/// Equivalence class of a symbol, when it belongs to one.
///
/// Classes group symbols treated as fungible for yield comparison: the
/// stablecoin class plus one class per major base asset and its
/// derivatives. The same classes back the price-resolution fallbacks.
pub fn asset_class(symbol: &str) -> Option<&'static str> {
    let upper = symbol.to_ascii_uppercase();
    if is_stablecoin(&upper) {
        return Some("USD");
    }
    match upper.as_str() {
        "ETH" | "WETH" | "STETH" | "WSTETH" | "RETH" | "CBETH" | "WEETH" => Some("ETH"),
        "BTC" | "WBTC" => Some("BTC"),
        "SOL" | "WSOL" | "MSOL" | "JITOSOL" => Some("SOL"),
        _ => None,
    }
}

/// Whether two symbols are interchangeable for yield comparison: exact
/// match, or members of the same equivalence class. Symmetric by
/// construction.
pub fn is_equivalent_asset(a: &str, b: &str) -> bool {
    if a.eq_ignore_ascii_case(b) {
        return true;
    }
    match (asset_class(a), asset_class(b)) {
        (Some(class_a), Some(class_b)) => class_a == class_b,
        _ => false,
    }
}

/// Hand-curated protocol maturity tier. Not derived from any on-chain
/// signal; unknown protocols default to medium.
pub fn protocol_risk_tier(protocol_id: &str) -> RiskTier {
    match protocol_id {
        "aave-v3" | "lido" => RiskTier::Low,
        "uniswap-v3" => RiskTier::Medium,
        "eigenlayer" => RiskTier::High,
        _ => RiskTier::Medium,
    }
}
