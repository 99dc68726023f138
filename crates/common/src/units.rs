//! Conversions between on-chain integer encodings and `Decimal`.
//!
//! On-chain values arrive as fixed-point integers: token base units,
//! WAD (1e18) health factors, RAY (1e27) interest rates, and oracle
//! answers scaled by the feed's declared decimals.

use std::str::FromStr;

use alloy::primitives::U256;
use rust_decimal::Decimal;

/// 10^-decimals as a `Decimal`. Scale is capped at `Decimal`'s maximum
/// (28); no catalogued token comes close.
fn unit_scale(decimals: u8) -> Decimal {
    Decimal::from_i128_with_scale(1, u32::from(decimals).min(28))
}

/// Convert a raw token amount (base units) to a human amount.
///
/// Values beyond `Decimal` precision (28 significant digits) degrade to
/// zero rather than erroring; no real wallet balance gets near that.
pub fn format_units(raw: U256, decimals: u8) -> Decimal {
    let raw = Decimal::from_str(&raw.to_string()).unwrap_or_default();
    raw * unit_scale(decimals)
}

/// Same as [`format_units`] for amounts already held as `u128`.
pub fn format_units_u128(raw: u128, decimals: u8) -> Decimal {
    let raw = Decimal::from_str(&raw.to_string()).unwrap_or_default();
    raw * unit_scale(decimals)
}

/// Convert an on-chain WAD (1e18) value to `Decimal`.
pub fn wad_to_decimal(wad: U256) -> Decimal {
    format_units(wad, 18)
}

/// Convert an on-chain RAY (1e27) value to `Decimal`. Used for interest
/// rates, which arrive as fractions (0.03 = 3%).
pub fn ray_to_decimal(ray: U256) -> Decimal {
    format_units(ray, 27)
}

/// Normalize a price-feed answer by the feed's declared decimal precision.
pub fn feed_price_to_decimal(answer: i128, feed_decimals: u8) -> Decimal {
    let raw = Decimal::from_str(&answer.to_string()).unwrap_or_default();
    raw * unit_scale(feed_decimals)
}
