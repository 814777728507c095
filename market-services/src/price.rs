//! Fixed-point price normalization

use alloy_primitives::U256;

/// Fixed-point scale of market maker prices (1e18 = probability 1)
pub const PRICE_SCALE: u128 = 1_000_000_000_000_000_000;

/// Convert a raw marginal price to a probability in [0, 1]
///
/// Values too large for `u128` are far above the scale and clamp to 1.
pub fn normalize_price(raw: U256) -> f64 {
    let raw = match u128::try_from(raw) {
        Ok(raw) => raw,
        Err(_) => return 1.0,
    };

    (raw as f64 / PRICE_SCALE as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert_eq!(normalize_price(U256::ZERO), 0.0);
        assert_eq!(normalize_price(U256::from(PRICE_SCALE)), 1.0);
    }

    #[test]
    fn test_sixty_five_percent() {
        let price = normalize_price(U256::from(650_000_000_000_000_000u128));
        assert!((price - 0.65).abs() < 1e-12);
    }

    #[test]
    fn test_above_scale_clamps() {
        assert_eq!(normalize_price(U256::from(PRICE_SCALE * 3)), 1.0);
        assert_eq!(normalize_price(U256::MAX), 1.0);
    }

    #[test]
    fn test_always_in_unit_interval() {
        for raw in [1u128, 7, 999_999_999_999_999_999, PRICE_SCALE + 1, u128::MAX] {
            let price = normalize_price(U256::from(raw));
            assert!((0.0..=1.0).contains(&price), "{} -> {}", raw, price);
        }
    }
}
