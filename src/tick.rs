//! Sparse tick map: per-tick liquidity and fee-growth-outside bookkeeping.
//!
//! The source's bitmap-sharded, per-PDA tick representation exists only to
//! fit Solana's per-account storage limits; an in-memory engine has no such
//! constraint, so this keeps the ordered-map alternative the design allows —
//! a plain `BTreeMap` answering successor/predecessor queries via `range`.

use std::collections::BTreeMap;

use ethnum::U256;

use crate::error::{PoolError, PoolResult};
use crate::tick_math::{MAX_TICK, MIN_TICK};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Tick {
    pub liquidity_gross: u128,
    pub liquidity_net: i128,
    #[serde(with = "crate::snapshot::u256_decimal")]
    pub fee_growth_outside_0: U256,
    #[serde(with = "crate::snapshot::u256_decimal")]
    pub fee_growth_outside_1: U256,
    pub tick_cumulative_outside: i64,
    #[serde(with = "crate::snapshot::u256_decimal")]
    pub seconds_per_liquidity_outside: U256,
    pub seconds_outside: u32,
}

#[derive(Clone, Debug, Default)]
pub struct TickTable {
    ticks: BTreeMap<i32, Tick>,
}

impl TickTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(ticks: BTreeMap<i32, Tick>) -> Self {
        Self { ticks }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&i32, &Tick)> {
        self.ticks.iter()
    }

    pub fn get(&self, tick: i32) -> Option<&Tick> {
        self.ticks.get(&tick)
    }

    pub fn set(&mut self, tick: i32, value: Tick) {
        self.ticks.insert(tick, value);
    }

    pub fn clear(&mut self, tick: i32) {
        self.ticks.remove(&tick);
    }

    /// The greatest initialized tick `<= current` when `zero_for_one`, else
    /// the least initialized tick `> current`. Falls back to MIN_TICK/MAX_TICK
    /// (no further crossings) when nothing qualifies.
    pub fn next_initialized_tick(&self, current: i32, zero_for_one: bool) -> i32 {
        if zero_for_one {
            self.ticks
                .range(..=current)
                .next_back()
                .map(|(t, _)| *t)
                .unwrap_or(MIN_TICK)
        } else {
            self.ticks
                .range((current + 1)..)
                .next()
                .map(|(t, _)| *t)
                .unwrap_or(MAX_TICK)
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_tick(
        &mut self,
        tick: i32,
        tick_current: i32,
        liquidity_delta: i128,
        fee_growth_global_0: U256,
        fee_growth_global_1: U256,
        seconds_per_liquidity_cumulative: U256,
        tick_cumulative: i64,
        time: u32,
        is_upper: bool,
        max_liquidity_per_tick: u128,
    ) -> PoolResult<bool> {
        let mut entry = self.ticks.get(&tick).copied().unwrap_or_default();
        let gross_before = entry.liquidity_gross;

        let gross_after = if liquidity_delta < 0 {
            gross_before
                .checked_sub(liquidity_delta.unsigned_abs())
                .ok_or(PoolError::UpdateUnderflow { tick })?
        } else {
            gross_before
                .checked_add(liquidity_delta as u128)
                .ok_or(PoolError::LiquidityOverflow {
                    tick,
                    max: max_liquidity_per_tick,
                })?
        };

        if gross_after > max_liquidity_per_tick {
            return Err(PoolError::LiquidityOverflow {
                tick,
                max: max_liquidity_per_tick,
            });
        }

        let flipped = (gross_before == 0) != (gross_after == 0);

        if gross_before == 0 && tick <= tick_current {
            entry.fee_growth_outside_0 = fee_growth_global_0;
            entry.fee_growth_outside_1 = fee_growth_global_1;
            entry.seconds_per_liquidity_outside = seconds_per_liquidity_cumulative;
            entry.tick_cumulative_outside = tick_cumulative;
            entry.seconds_outside = time;
        }

        entry.liquidity_gross = gross_after;
        entry.liquidity_net = if is_upper {
            entry.liquidity_net.wrapping_sub(liquidity_delta)
        } else {
            entry.liquidity_net.wrapping_add(liquidity_delta)
        };

        self.ticks.insert(tick, entry);
        Ok(flipped)
    }

    /// Inverts the tick's "outside" accumulators in place and returns the
    /// stored `liquidity_net`. Called once per crossing during a swap.
    pub fn cross_tick(
        &mut self,
        tick: i32,
        fee_growth_global_0: U256,
        fee_growth_global_1: U256,
        seconds_per_liquidity_cumulative: U256,
        tick_cumulative: i64,
        time: u32,
    ) -> PoolResult<i128> {
        let entry = self
            .ticks
            .get_mut(&tick)
            .ok_or(PoolError::UpdateUnderflow { tick })?;
        entry.fee_growth_outside_0 = fee_growth_global_0.wrapping_sub(entry.fee_growth_outside_0);
        entry.fee_growth_outside_1 = fee_growth_global_1.wrapping_sub(entry.fee_growth_outside_1);
        entry.seconds_per_liquidity_outside =
            seconds_per_liquidity_cumulative.wrapping_sub(entry.seconds_per_liquidity_outside);
        entry.tick_cumulative_outside = tick_cumulative.wrapping_sub(entry.tick_cumulative_outside);
        entry.seconds_outside = time.wrapping_sub(entry.seconds_outside);
        Ok(entry.liquidity_net)
    }
}
