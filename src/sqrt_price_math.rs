//! Sqrt-price movement and token-delta arithmetic, widened from this lineage's
//! Q32.32/u64 precursor to the Q64.96/u160 domain. Function shapes (add/remove
//! branches for each token, rounding direction threaded through every call)
//! are unchanged; only the fixed-point width and the backing `mul_div` move to
//! `U256`.

use ethnum::U256;

use crate::error::{PoolError, PoolResult};
use crate::fixed_point::{mul_div, mul_div_rounding_up};

const Q96: u32 = 96;

fn q96() -> U256 {
    U256::ONE << Q96
}

fn div_rounding_up(a: U256, b: U256) -> PoolResult<U256> {
    if b == U256::ZERO {
        return Err(PoolError::DivByZero { divisor: b });
    }
    let q = a / b;
    let r = a % b;
    if r == U256::ZERO {
        Ok(q)
    } else {
        q.checked_add(U256::ONE)
            .ok_or(PoolError::MulDivOverflow { a, b, d: b })
    }
}

/// Sqrt price after adding or removing `amount` of token0 at constant liquidity.
pub fn get_next_sqrt_price_from_amount0_rounding_up(
    sqrt_price: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> PoolResult<U256> {
    if amount == U256::ZERO {
        return Ok(sqrt_price);
    }
    let numerator1 = U256::from(liquidity) << Q96;

    if add {
        let product = amount * sqrt_price;
        if product / amount == sqrt_price {
            let denominator = numerator1 + product;
            if denominator >= numerator1 {
                return mul_div_rounding_up(numerator1, sqrt_price, denominator);
            }
        }
        div_rounding_up(numerator1, numerator1 / sqrt_price + amount)
    } else {
        let product = amount * sqrt_price;
        if product / amount != sqrt_price || numerator1 <= product {
            return Err(PoolError::MulDivOverflow {
                a: numerator1,
                b: sqrt_price,
                d: amount,
            });
        }
        let denominator = numerator1 - product;
        mul_div_rounding_up(numerator1, sqrt_price, denominator)
    }
}

/// Sqrt price after adding or removing `amount` of token1 at constant liquidity.
pub fn get_next_sqrt_price_from_amount1_rounding_down(
    sqrt_price: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> PoolResult<U256> {
    let liquidity = U256::from(liquidity);
    if add {
        let quotient = mul_div(amount, q96(), liquidity)?;
        Ok(sqrt_price + quotient)
    } else {
        let quotient = mul_div_rounding_up(amount, q96(), liquidity)?;
        if sqrt_price <= quotient {
            return Err(PoolError::MulDivOverflow {
                a: sqrt_price,
                b: quotient,
                d: liquidity,
            });
        }
        Ok(sqrt_price - quotient)
    }
}

/// Sqrt price reached after swapping `amount_in` of the input token in.
pub fn get_next_sqrt_price_from_input(
    sqrt_price: U256,
    liquidity: u128,
    amount_in: U256,
    zero_for_one: bool,
) -> PoolResult<U256> {
    if zero_for_one {
        get_next_sqrt_price_from_amount0_rounding_up(sqrt_price, liquidity, amount_in, true)
    } else {
        get_next_sqrt_price_from_amount1_rounding_down(sqrt_price, liquidity, amount_in, true)
    }
}

/// Sqrt price reached after swapping `amount_out` of the output token out.
pub fn get_next_sqrt_price_from_output(
    sqrt_price: U256,
    liquidity: u128,
    amount_out: U256,
    zero_for_one: bool,
) -> PoolResult<U256> {
    if zero_for_one {
        get_next_sqrt_price_from_amount1_rounding_down(sqrt_price, liquidity, amount_out, false)
    } else {
        get_next_sqrt_price_from_amount0_rounding_up(sqrt_price, liquidity, amount_out, false)
    }
}

/// Token0 owed/returned for holding `liquidity` between two sqrt prices.
pub fn get_amount0_delta(
    sqrt_ratio_a: U256,
    sqrt_ratio_b: U256,
    liquidity: u128,
    round_up: bool,
) -> PoolResult<U256> {
    let (lo, hi) = if sqrt_ratio_a > sqrt_ratio_b {
        (sqrt_ratio_b, sqrt_ratio_a)
    } else {
        (sqrt_ratio_a, sqrt_ratio_b)
    };
    if lo == U256::ZERO {
        return Err(PoolError::DivByZero { divisor: lo });
    }
    let numerator1 = U256::from(liquidity) << Q96;
    let numerator2 = hi - lo;

    if round_up {
        div_rounding_up(mul_div_rounding_up(numerator1, numerator2, hi)?, lo)
    } else {
        Ok(mul_div(numerator1, numerator2, hi)? / lo)
    }
}

/// Token1 owed/returned for holding `liquidity` between two sqrt prices.
pub fn get_amount1_delta(
    sqrt_ratio_a: U256,
    sqrt_ratio_b: U256,
    liquidity: u128,
    round_up: bool,
) -> PoolResult<U256> {
    let (lo, hi) = if sqrt_ratio_a > sqrt_ratio_b {
        (sqrt_ratio_b, sqrt_ratio_a)
    } else {
        (sqrt_ratio_a, sqrt_ratio_b)
    };
    let diff = hi - lo;
    if round_up {
        mul_div_rounding_up(U256::from(liquidity), diff, q96())
    } else {
        mul_div(U256::from(liquidity), diff, q96())
    }
}
