//! Single swap-step computation: how far a swap moves the price within one
//! tick range and how much fee it accrues along the way. Same four-branch
//! shape (exact-in vs exact-out, crossed-target vs not) as this lineage's
//! Q32.32 precursor, carried over to the Q64.96 domain.

use ethnum::{I256, U256};

use crate::error::PoolResult;
use crate::fixed_point::{mul_div, mul_div_rounding_up};
use crate::sqrt_price_math::{
    get_amount0_delta, get_amount1_delta, get_next_sqrt_price_from_input,
    get_next_sqrt_price_from_output,
};

pub const FEE_PIPS_DENOMINATOR: u32 = 1_000_000;

pub struct SwapStepResult {
    pub sqrt_ratio_next: U256,
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee_amount: U256,
}

/// Computes the result of swapping within a single tick range, stopping at
/// `sqrt_ratio_target` if the step would otherwise overshoot it.
///
/// `amount_remaining` is positive for an exact-input swap (more of the input
/// token available to spend) and negative for an exact-output swap (more of
/// the output token still owed).
pub fn compute_swap_step(
    sqrt_ratio_current: U256,
    sqrt_ratio_target: U256,
    liquidity: u128,
    amount_remaining: I256,
    fee_pips: u32,
) -> PoolResult<SwapStepResult> {
    let zero_for_one = sqrt_ratio_current >= sqrt_ratio_target;
    let exact_in = amount_remaining >= I256::ZERO;

    let mut sqrt_ratio_next;
    let mut amount_in = U256::ZERO;
    let mut amount_out = U256::ZERO;

    if exact_in {
        let amount_remaining_abs = amount_remaining.unsigned_abs();
        let amount_remaining_less_fee = mul_div(
            amount_remaining_abs,
            U256::from(FEE_PIPS_DENOMINATOR - fee_pips),
            U256::from(FEE_PIPS_DENOMINATOR),
        )?;
        amount_in = if zero_for_one {
            get_amount0_delta(sqrt_ratio_target, sqrt_ratio_current, liquidity, true)?
        } else {
            get_amount1_delta(sqrt_ratio_current, sqrt_ratio_target, liquidity, true)?
        };
        sqrt_ratio_next = if amount_remaining_less_fee >= amount_in {
            sqrt_ratio_target
        } else {
            get_next_sqrt_price_from_input(
                sqrt_ratio_current,
                liquidity,
                amount_remaining_less_fee,
                zero_for_one,
            )?
        };
    } else {
        let amount_remaining_abs = amount_remaining.unsigned_abs();
        amount_out = if zero_for_one {
            get_amount1_delta(sqrt_ratio_target, sqrt_ratio_current, liquidity, false)?
        } else {
            get_amount0_delta(sqrt_ratio_current, sqrt_ratio_target, liquidity, false)?
        };
        sqrt_ratio_next = if amount_remaining_abs >= amount_out {
            sqrt_ratio_target
        } else {
            get_next_sqrt_price_from_output(
                sqrt_ratio_current,
                liquidity,
                amount_remaining_abs,
                zero_for_one,
            )?
        };
    }

    let max = sqrt_ratio_next == sqrt_ratio_target;

    if zero_for_one {
        amount_in = if max && exact_in {
            amount_in
        } else {
            get_amount0_delta(sqrt_ratio_next, sqrt_ratio_current, liquidity, true)?
        };
        amount_out = if max && !exact_in {
            amount_out
        } else {
            get_amount1_delta(sqrt_ratio_next, sqrt_ratio_current, liquidity, false)?
        };
    } else {
        amount_in = if max && exact_in {
            amount_in
        } else {
            get_amount1_delta(sqrt_ratio_current, sqrt_ratio_next, liquidity, true)?
        };
        amount_out = if max && !exact_in {
            amount_out
        } else {
            get_amount0_delta(sqrt_ratio_current, sqrt_ratio_next, liquidity, false)?
        };
    }

    if !exact_in {
        let cap = amount_remaining.unsigned_abs();
        if amount_out > cap {
            amount_out = cap;
        }
    }

    let fee_amount = if exact_in && sqrt_ratio_next != sqrt_ratio_target {
        amount_remaining.unsigned_abs() - amount_in
    } else {
        mul_div_rounding_up(
            amount_in,
            U256::from(fee_pips),
            U256::from(FEE_PIPS_DENOMINATOR - fee_pips),
        )?
    };

    Ok(SwapStepResult {
        sqrt_ratio_next,
        amount_in,
        amount_out,
        fee_amount,
    })
}
