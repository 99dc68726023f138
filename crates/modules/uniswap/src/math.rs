//! Concentrated-liquidity math.
//!
//! Token amounts for a position are a function of its liquidity, its tick
//! range, and the pool's current sqrt price. Amounts here are point-in-time
//! estimates in raw base units; f64 precision is ample for valuation.

/// 2^96, the fixed-point scale of `sqrtPriceX96`.
const Q96: f64 = 79_228_162_514_264_337_593_543_950_336.0;

/// sqrt(1.0001^tick) — the pool's price coordinate for a tick.
pub fn tick_to_sqrt_price(tick: i32) -> f64 {
    1.0001f64.powf(f64::from(tick) / 2.0)
}

/// Decode a raw `sqrtPriceX96` into a plain sqrt price.
pub fn sqrt_price_from_x96(sqrt_price_x96: &str) -> f64 {
    sqrt_price_x96.parse::<f64>().unwrap_or(0.0) / Q96
}

/// Raw (amount0, amount1) owed for `liquidity` over [lower, upper] at the
/// current sqrt price. Out-of-range positions sit entirely in one token.
pub fn amounts_for_liquidity(
    liquidity: u128,
    sqrt_current: f64,
    sqrt_lower: f64,
    sqrt_upper: f64,
) -> (f64, f64) {
    if liquidity == 0 || sqrt_lower <= 0.0 || sqrt_upper <= sqrt_lower {
        return (0.0, 0.0);
    }
    let l = liquidity as f64;

    if sqrt_current <= sqrt_lower {
        // Price below range: all token0.
        (l * (sqrt_upper - sqrt_lower) / (sqrt_lower * sqrt_upper), 0.0)
    } else if sqrt_current >= sqrt_upper {
        // Price above range: all token1.
        (0.0, l * (sqrt_upper - sqrt_lower))
    } else {
        (
            l * (sqrt_upper - sqrt_current) / (sqrt_current * sqrt_upper),
            l * (sqrt_current - sqrt_lower),
        )
    }
}

/// Whether the current tick sits inside the position's range.
pub fn in_range(current_tick: i32, tick_lower: i32, tick_upper: i32) -> bool {
    current_tick >= tick_lower && current_tick < tick_upper
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, rel: f64) -> bool {
        (a - b).abs() <= rel * b.abs().max(1.0)
    }

    #[test]
    fn test_tick_zero_is_unit_price() {
        assert!(close(tick_to_sqrt_price(0), 1.0, 1e-12));
    }

    #[test]
    fn test_tick_doubling_price() {
        // 1.0001^6931.8 ≈ 2, so sqrt price ≈ √2.
        let sqrt = tick_to_sqrt_price(6932);
        assert!(close(sqrt, std::f64::consts::SQRT_2, 1e-3), "got {sqrt}");
    }

    #[test]
    fn test_negative_tick_inverts() {
        let up = tick_to_sqrt_price(1000);
        let down = tick_to_sqrt_price(-1000);
        assert!(close(up * down, 1.0, 1e-9));
    }

    #[test]
    fn test_sqrt_price_from_x96_unit() {
        // sqrtPriceX96 == 2^96 encodes a sqrt price of exactly 1.
        assert!(close(
            sqrt_price_from_x96("79228162514264337593543950336"),
            1.0,
            1e-12
        ));
    }

    #[test]
    fn test_amounts_in_range() {
        // L = 6e18, range [1.0, 2.0], current 1.5:
        // amount0 = L(2 − 1.5)/(1.5·2) = L/6, amount1 = L·0.5.
        let l = 6_000_000_000_000_000_000u128;
        let (amount0, amount1) = amounts_for_liquidity(l, 1.5, 1.0, 2.0);
        assert!(close(amount0, 1e18, 1e-9), "got {amount0}");
        assert!(close(amount1, 3e18, 1e-9), "got {amount1}");
    }

    #[test]
    fn test_amounts_below_range_all_token0() {
        let (amount0, amount1) = amounts_for_liquidity(1_000_000, 0.5, 1.0, 2.0);
        assert!(amount0 > 0.0);
        assert_eq!(amount1, 0.0);
    }

    #[test]
    fn test_amounts_above_range_all_token1() {
        let (amount0, amount1) = amounts_for_liquidity(1_000_000, 3.0, 1.0, 2.0);
        assert_eq!(amount0, 0.0);
        assert!(amount1 > 0.0);
    }

    #[test]
    fn test_zero_liquidity_zero_amounts() {
        assert_eq!(amounts_for_liquidity(0, 1.5, 1.0, 2.0), (0.0, 0.0));
    }

    #[test]
    fn test_degenerate_range_zero_amounts() {
        assert_eq!(amounts_for_liquidity(1_000, 1.5, 2.0, 2.0), (0.0, 0.0));
    }

    #[test]
    fn test_in_range_boundaries() {
        assert!(in_range(0, -100, 100));
        assert!(in_range(-100, -100, 100));
        // Upper bound is exclusive.
        assert!(!in_range(100, -100, 100));
        assert!(!in_range(101, -100, 100));
    }
}
