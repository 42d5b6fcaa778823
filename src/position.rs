//! Position accounting: liquidity owned by (owner, tick_lower, tick_upper)
//! and the fees it has accrued since its last touch.
//!
//! Keyed the same way the source addresses a position PDA — by the triple
//! (owner, tick_lower, tick_upper) — but as a plain ordered-map key instead
//! of a derived account address.

use std::collections::BTreeMap;

use ethnum::U256;

use crate::error::{PoolError, PoolResult};
use crate::fixed_point::mul_div;
use crate::liquidity_math::add_delta;
use crate::tick::Tick;

pub type PositionKey = (String, i32, i32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub liquidity: u128,
    #[serde(with = "crate::snapshot::u256_decimal")]
    pub fee_growth_inside_0_last: U256,
    #[serde(with = "crate::snapshot::u256_decimal")]
    pub fee_growth_inside_1_last: U256,
    pub tokens_owed_0: u128,
    pub tokens_owed_1: u128,
}

#[derive(Clone, Debug, Default)]
pub struct PositionTable {
    positions: BTreeMap<PositionKey, Position>,
}

impl PositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(positions: BTreeMap<PositionKey, Position>) -> Self {
        Self { positions }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&PositionKey, &Position)> {
        self.positions.iter()
    }

    pub fn get(&self, key: &PositionKey) -> Option<&Position> {
        self.positions.get(key)
    }

    /// Rolls forward accrued fees and applies a liquidity delta. `ΔL = 0`
    /// against a never-minted key is a poke and fails rather than silently
    /// creating an empty position.
    pub fn update_position(
        &mut self,
        key: &PositionKey,
        liquidity_delta: i128,
        fee_growth_inside_0: U256,
        fee_growth_inside_1: U256,
    ) -> PoolResult<Position> {
        let existing = self.positions.get(key).copied();
        if liquidity_delta == 0 && existing.is_none() {
            return Err(PoolError::UninitializedPositionPoke {
                owner: key.0.clone(),
                tick_lower: key.1,
                tick_upper: key.2,
            });
        }

        let mut position = existing.unwrap_or_default();
        let liquidity_before = position.liquidity;

        let delta_fees_0 =
            fee_growth_inside_0.wrapping_sub(position.fee_growth_inside_0_last);
        let delta_fees_1 =
            fee_growth_inside_1.wrapping_sub(position.fee_growth_inside_1_last);

        let fees_0 = mul_div(delta_fees_0, U256::from(liquidity_before), U256::ONE << 128)?
            .as_u128();
        let fees_1 = mul_div(delta_fees_1, U256::from(liquidity_before), U256::ONE << 128)?
            .as_u128();

        let liquidity_new = add_delta(liquidity_before, liquidity_delta).ok_or(
            PoolError::LiquidityOverflow {
                tick: key.1,
                max: u128::MAX,
            },
        )?;

        position.liquidity = liquidity_new;
        position.tokens_owed_0 = position.tokens_owed_0.wrapping_add(fees_0);
        position.tokens_owed_1 = position.tokens_owed_1.wrapping_add(fees_1);
        position.fee_growth_inside_0_last = fee_growth_inside_0;
        position.fee_growth_inside_1_last = fee_growth_inside_1;

        self.positions.insert(key.clone(), position);
        Ok(position)
    }

    /// Adds principal token amounts released by a committed burn onto a
    /// position's owed balances, separately from the fee accrual that
    /// `update_position` already folded in.
    pub fn credit_tokens_owed(
        &mut self,
        key: &PositionKey,
        amount_0: u128,
        amount_1: u128,
    ) -> PoolResult<Position> {
        let position = self
            .positions
            .get_mut(key)
            .ok_or_else(|| PoolError::UninitializedPositionPoke {
                owner: key.0.clone(),
                tick_lower: key.1,
                tick_upper: key.2,
            })?;
        position.tokens_owed_0 = position.tokens_owed_0.wrapping_add(amount_0);
        position.tokens_owed_1 = position.tokens_owed_1.wrapping_add(amount_1);
        Ok(*position)
    }
}

/// Fee growth accrued strictly inside [tick_lower, tick_upper] given the two
/// boundary ticks' "outside" accumulators and the pool's global accumulators.
/// `lower`/`upper` default to zeroed ticks when the boundary has never been
/// initialized, matching the convention that an unset tick contributes zero.
pub fn fee_growth_inside(
    lower: &Tick,
    upper: &Tick,
    tick_lower: i32,
    tick_upper: i32,
    tick_current: i32,
    fee_growth_global_0: U256,
    fee_growth_global_1: U256,
) -> (U256, U256) {
    let (below_0, below_1) = if tick_current >= tick_lower {
        (lower.fee_growth_outside_0, lower.fee_growth_outside_1)
    } else {
        (
            fee_growth_global_0.wrapping_sub(lower.fee_growth_outside_0),
            fee_growth_global_1.wrapping_sub(lower.fee_growth_outside_1),
        )
    };
    let (above_0, above_1) = if tick_current < tick_upper {
        (upper.fee_growth_outside_0, upper.fee_growth_outside_1)
    } else {
        (
            fee_growth_global_0.wrapping_sub(upper.fee_growth_outside_0),
            fee_growth_global_1.wrapping_sub(upper.fee_growth_outside_1),
        )
    };
    (
        fee_growth_global_0.wrapping_sub(below_0).wrapping_sub(above_0),
        fee_growth_global_1.wrapping_sub(below_1).wrapping_sub(above_1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    mod update_position {
        use super::*;

        #[test]
        fn poke_on_uninitialized_position_fails() {
            let mut table = PositionTable::new();
            let key = ("alice".to_string(), -60, 60);
            let err = table
                .update_position(&key, 0, U256::ZERO, U256::ZERO)
                .unwrap_err();
            assert!(matches!(err, PoolError::UninitializedPositionPoke { .. }));
        }

        #[test]
        fn first_mint_creates_position() {
            let mut table = PositionTable::new();
            let key = ("alice".to_string(), -60, 60);
            let p = table
                .update_position(&key, 1_000, U256::ZERO, U256::ZERO)
                .unwrap();
            assert_eq!(p.liquidity, 1_000);
            assert_eq!(p.tokens_owed_0, 0);
        }

        #[test]
        fn accrues_fees_proportional_to_liquidity_before_delta() {
            let mut table = PositionTable::new();
            let key = ("alice".to_string(), -60, 60);
            table
                .update_position(&key, 1_000, U256::ZERO, U256::ZERO)
                .unwrap();
            let growth = U256::ONE << 128; // one full unit of fee-per-liquidity
            let p = table.update_position(&key, 0, growth, U256::ZERO).unwrap();
            assert_eq!(p.tokens_owed_0, 1_000);
        }

        #[test]
        fn burning_all_liquidity_keeps_position_with_owed_fees() {
            let mut table = PositionTable::new();
            let key = ("alice".to_string(), -60, 60);
            table
                .update_position(&key, 1_000, U256::ZERO, U256::ZERO)
                .unwrap();
            let p = table
                .update_position(&key, -1_000, U256::ONE << 128, U256::ZERO)
                .unwrap();
            assert_eq!(p.liquidity, 0);
            assert_eq!(p.tokens_owed_0, 1_000);
        }
    }

    mod fee_growth_inside {
        use super::*;

        #[test]
        fn current_tick_inside_range_subtracts_both_outsides() {
            let lower = Tick {
                fee_growth_outside_0: U256::from(10u32),
                ..Default::default()
            };
            let upper = Tick {
                fee_growth_outside_0: U256::from(5u32),
                ..Default::default()
            };
            let (inside_0, _) =
                fee_growth_inside(&lower, &upper, -60, 60, 0, U256::from(100u32), U256::ZERO);
            assert_eq!(inside_0, U256::from(85u32));
        }
    }
}
