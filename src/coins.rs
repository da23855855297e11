// =============================================================================
// TIDESWAP v1.2 - Coin Units
// =============================================================================
//
// Conversions between whole-coin values (what callers and fee rates are
// expressed in) and the chain's indivisible base units (what transaction
// outputs carry). All supported chains use 8 decimal places.
//
// =============================================================================

/// Base units per whole coin (10^8 for 8-decimal chains).
pub const COIN: u64 = 100_000_000;

/// Convert a whole-coin value to base units, rounded to the nearest unit.
pub fn to_base_units(value: f64) -> u64 {
    (value * COIN as f64).round() as u64
}

/// Convert base units to a whole-coin value.
pub fn from_base_units(base_units: u64) -> f64 {
    base_units as f64 / COIN as f64
}

/// Round a whole-coin value to base-unit precision.
pub fn round_to_base_unit(value: f64) -> f64 {
    (value * COIN as f64).round() / COIN as f64
}

/// Format a whole-coin value with its symbol, e.g. "0.70000000 BTC".
pub fn format_coins(value: f64, symbol: &str) -> String {
    format!("{:.8} {}", value, symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        assert_eq!(to_base_units(0.7), 70_000_000);
        assert_eq!(to_base_units(0.78956946), 78_956_946);
        assert_eq!(from_base_units(70_000_000), 0.7);
    }

    #[test]
    fn test_rounding() {
        // 0.1 + 0.2 is not representable exactly; rounding must absorb it
        assert_eq!(to_base_units(0.1 + 0.2), 30_000_000);
        assert_eq!(round_to_base_unit(0.300000004), 0.3);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_coins(0.7, "BTC"), "0.70000000 BTC");
        assert_eq!(format_coins(12.5, "LTC"), "12.50000000 LTC");
    }
}
