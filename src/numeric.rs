use alloy::primitives::U256;

use crate::constants::{MANTISSA_DECIMALS, VTOKEN_DECIMALS};

/// 10^decimals as a U256.
pub fn exponent_to_u256(decimals: u32) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

/// Renders a 10^decimals scaled integer as a decimal string.
///
/// Truncates toward zero at `decimals` fractional digits and strips
/// trailing fractional zeros. `decimals == 0` yields the plain integer.
pub fn mantissa_to_decimal(value: U256, decimals: u32) -> String {
    if decimals == 0 {
        return value.to_string();
    }

    let scale = exponent_to_u256(decimals);
    let integer = value / scale;
    let remainder = value % scale;

    if remainder.is_zero() {
        return integer.to_string();
    }

    let mut frac = format!("{:0>width$}", remainder, width = decimals as usize);
    while frac.ends_with('0') {
        frac.pop();
    }

    format!("{}.{}", integer, frac)
}

/// Decimal scale of a market's stored exchange rate:
/// 18 + underlying decimals - vToken decimals.
pub fn exchange_rate_scale(underlying_decimals: u32) -> u32 {
    MANTISSA_DECIMALS + underlying_decimals - VTOKEN_DECIMALS
}

/// Converts a vToken amount to underlying wei at the given stored
/// exchange rate mantissa.
pub fn vtoken_to_underlying_wei(amount: U256, exchange_rate_mantissa: U256) -> U256 {
    amount * exchange_rate_mantissa / exponent_to_u256(MANTISSA_DECIMALS - VTOKEN_DECIMALS)
}
