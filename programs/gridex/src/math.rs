//! Checked fixed-point helpers.
//!
//! Every product of two `u64` operands is formed in a `u128` intermediate before
//! dividing, so `a * b / denom` never loses the high half. Results that do not
//! fit back into `u64` fail with [`GridError::MathOverflow`] instead of wrapping.

use crate::constants::{FEE_DENOMINATOR, PRICE_SCALE};
use crate::error::{GridError, Result};

pub fn u128_to_u64(v: u128) -> Result<u64> {
    u64::try_from(v).map_err(|_| GridError::MathOverflow)
}

/// `floor(a * b / denom)`.
pub fn mul_div(a: u64, b: u64, denom: u64) -> Result<u64> {
    if denom == 0 {
        return Err(GridError::MathOverflow);
    }
    let n = (a as u128)
        .checked_mul(b as u128)
        .ok_or(GridError::MathOverflow)?;
    u128_to_u64(n / denom as u128)
}

/// `ceil(a * b / denom)`.
pub fn mul_div_up(a: u64, b: u64, denom: u64) -> Result<u64> {
    if denom == 0 {
        return Err(GridError::MathOverflow);
    }
    let n = (a as u128)
        .checked_mul(b as u128)
        .ok_or(GridError::MathOverflow)?;
    let d = denom as u128;
    u128_to_u64(n.div_ceil(d))
}

/// Quote value of `base` at `price`, rounded down.
pub fn quote_for(base: u64, price: u64) -> Result<u64> {
    mul_div(base, price, PRICE_SCALE)
}

/// Quote value of `base` at `price`, rounded up.
pub fn quote_for_up(base: u64, price: u64) -> Result<u64> {
    mul_div_up(base, price, PRICE_SCALE)
}

/// Fee on a quote notional, rounded down.
pub fn calc_fee(amount: u64, fee_ppm: u32) -> Result<u64> {
    mul_div(amount, fee_ppm as u64, FEE_DENOMINATOR)
}

pub fn checked_sum(values: impl IntoIterator<Item = u64>) -> Result<u64> {
    values
        .into_iter()
        .try_fold(0u64, |acc, x| acc.checked_add(x).ok_or(GridError::MathOverflow))
}

/// `ratio^exp` in `PRICE_SCALE` fixed point by binary exponentiation.
///
/// Each multiply truncates back to the scale, which bounds both the number of
/// steps (`log2(exp)`) and the accumulated rounding.
pub fn pow_ratio(ratio: u64, mut exp: u32) -> Result<u128> {
    let scale = PRICE_SCALE as u128;
    let mut result = scale;
    let mut base = ratio as u128;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.checked_mul(base).ok_or(GridError::MathOverflow)? / scale;
        }
        exp >>= 1;
        if exp > 0 {
            base = base.checked_mul(base).ok_or(GridError::MathOverflow)? / scale;
        }
    }
    Ok(result)
}

/// `price0 * ratio^exp`, failing when the result leaves the `u64` range.
pub fn scale_by_ratio_pow(price0: u64, ratio: u64, exp: u32) -> Result<u64> {
    let factor = pow_ratio(ratio, exp)?;
    let n = (price0 as u128)
        .checked_mul(factor)
        .ok_or(GridError::MathOverflow)?;
    u128_to_u64(n / PRICE_SCALE as u128)
}
