//! The pool engine: owns `Slot0`, `PoolState`, the tick/position tables and
//! the oracle ring, and exposes the three externally visible operations.
//! Every method follows this lineage's `_modify_position`/`swap_internal`
//! shape — compute into local variables, commit to `self` only once every
//! fallible step has returned `Ok`.

use std::collections::BTreeMap;

use ethnum::{I256, U256};

use crate::error::{PoolError, PoolResult};
use crate::liquidity_math::add_delta;
use crate::oracle::OracleRing;
use crate::position::{fee_growth_inside, Position, PositionTable};
use crate::snapshot::{
    format_position_key, parse_position_key, ImmutablesSnapshot, PoolSnapshot, Slot0Snapshot,
    StateSnapshot, TokenInfo,
};
use crate::sqrt_price_math::{get_amount0_delta, get_amount1_delta};
use crate::swap_math::compute_swap_step;
use crate::tick::TickTable;
use crate::tick_math::{get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio, max_sqrt_ratio, min_sqrt_ratio, MAX_TICK, MIN_TICK};

/// Reinterprets a non-negative `U256` magnitude as `I256`. Safe for every
/// amount this engine produces: token deltas never approach `2^255`.
fn u256_to_i256(x: U256) -> I256 {
    I256::from_le_bytes(x.to_le_bytes())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot0 {
    pub sqrt_price: U256,
    pub tick: i32,
    pub observation_index: u16,
    pub observation_cardinality: u16,
    pub observation_cardinality_next: u16,
    pub fee_protocol: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolState {
    pub liquidity: u128,
    pub fee_growth_global_0: U256,
    pub fee_growth_global_1: U256,
    pub balance_0: I256,
    pub balance_1: I256,
    pub protocol_fee_0: u128,
    pub protocol_fee_1: u128,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolImmutables {
    pub pool_address: String,
    pub fee: u32,
    pub tick_spacing: i32,
    pub max_liquidity_per_tick: u128,
    pub token_0: TokenInfo,
    pub token_1: TokenInfo,
}

/// Returns the conventional tick spacing for a standard fee tier, or `None`
/// for an arbitrary fee the caller must supply spacing for explicitly.
pub fn standard_tick_spacing(fee: u32) -> Option<i32> {
    match fee {
        100 => Some(1),
        500 => Some(10),
        3000 => Some(60),
        10000 => Some(200),
        _ => None,
    }
}

fn max_liquidity_per_tick(tick_spacing: i32) -> u128 {
    let max_tick_usable = (MAX_TICK / tick_spacing) * tick_spacing;
    let num_ticks = ((2 * max_tick_usable) / tick_spacing + 1) as u128;
    u128::MAX / num_ticks
}

pub struct PoolEngine {
    immutables: PoolImmutables,
    slot0: Slot0,
    state: PoolState,
    ticks: TickTable,
    positions: PositionTable,
    oracle: OracleRing,
    last_block_timestamp: u32,
}

struct SwapState {
    remaining: I256,
    calculated: I256,
    sqrt_price: U256,
    tick: i32,
    fee_growth_global: U256,
    protocol_fee: u128,
    liquidity: u128,
}

impl PoolEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool_address: String,
        fee: u32,
        tick_spacing: Option<i32>,
        initial_sqrt_price: Option<U256>,
        initial_time: u32,
        token_0: TokenInfo,
        token_1: TokenInfo,
    ) -> PoolResult<Self> {
        let tick_spacing = tick_spacing.or_else(|| standard_tick_spacing(fee)).ok_or(
            PoolError::TicksNotSpaced {
                tick: 0,
                tick_spacing: 0,
            },
        )?;
        let sqrt_price = initial_sqrt_price.unwrap_or(U256::ONE << 96);
        let tick = get_tick_at_sqrt_ratio(sqrt_price)?;

        let mut oracle = OracleRing::new();
        let (observation_index, observation_cardinality) = oracle.initialize(initial_time);

        Ok(Self {
            immutables: PoolImmutables {
                pool_address,
                fee,
                tick_spacing,
                max_liquidity_per_tick: max_liquidity_per_tick(tick_spacing),
                token_0,
                token_1,
            },
            slot0: Slot0 {
                sqrt_price,
                tick,
                observation_index,
                observation_cardinality,
                observation_cardinality_next: observation_cardinality,
                fee_protocol: 0,
            },
            state: PoolState {
                liquidity: 0,
                fee_growth_global_0: U256::ZERO,
                fee_growth_global_1: U256::ZERO,
                balance_0: I256::ZERO,
                balance_1: I256::ZERO,
                protocol_fee_0: 0,
                protocol_fee_1: 0,
            },
            ticks: TickTable::new(),
            positions: PositionTable::new(),
            oracle,
            last_block_timestamp: initial_time,
        })
    }

    pub fn slot0(&self) -> &Slot0 {
        &self.slot0
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub fn immutables(&self) -> &PoolImmutables {
        &self.immutables
    }

    pub fn ticks(&self) -> &TickTable {
        &self.ticks
    }

    pub fn positions(&self) -> &PositionTable {
        &self.positions
    }

    pub fn last_block_timestamp(&self) -> u32 {
        self.last_block_timestamp
    }

    /// Advances the engine's notion of "now" without otherwise touching
    /// state. The engine has no clock of its own; every timestamp-dependent
    /// computation uses whatever was last recorded here.
    pub fn advance_time(&mut self, now: u32) {
        self.last_block_timestamp = now;
    }

    pub fn set_fee_protocol(&mut self, fee_protocol_0: u8, fee_protocol_1: u8) {
        self.slot0.fee_protocol = (fee_protocol_0 & 0x0F) | ((fee_protocol_1 & 0x0F) << 4);
    }

    pub fn increase_observation_cardinality_next(&mut self, new_cardinality_next: u16) -> u16 {
        let old = self.slot0.observation_cardinality_next;
        if new_cardinality_next <= old {
            return old;
        }
        let grown = self.oracle.grow(old, new_cardinality_next);
        self.slot0.observation_cardinality_next = grown;
        tracing::debug!(
            old_cardinality_next = old,
            new_cardinality_next = grown,
            "oracle observation cardinality grown"
        );
        grown
    }

    fn current_cumulatives(&self) -> PoolResult<(i64, U256)> {
        self.oracle.observe_single(
            self.last_block_timestamp,
            0,
            self.slot0.tick,
            self.slot0.observation_index,
            self.state.liquidity,
            self.slot0.observation_cardinality,
        )
    }

    fn write_oracle_observation(&mut self) {
        let (index, cardinality) = self.oracle.write(
            self.slot0.observation_index,
            self.last_block_timestamp,
            self.slot0.tick,
            self.state.liquidity,
            self.slot0.observation_cardinality,
            self.slot0.observation_cardinality_next,
        );
        self.slot0.observation_index = index;
        self.slot0.observation_cardinality = cardinality;
    }

    pub fn mint(
        &mut self,
        recipient: &str,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    ) -> PoolResult<(U256, U256)> {
        if amount == 0 {
            return Err(PoolError::ZeroLiquidity);
        }
        let liquidity_delta = i128::try_from(amount).map_err(|_| PoolError::LiquidityOverflow {
            tick: tick_lower,
            max: self.immutables.max_liquidity_per_tick,
        })?;
        let (_, amount_0, amount_1) =
            self.modify_position(recipient, tick_lower, tick_upper, liquidity_delta, true)?;
        self.state.balance_0 = self.state.balance_0.wrapping_add(u256_to_i256(amount_0));
        self.state.balance_1 = self.state.balance_1.wrapping_add(u256_to_i256(amount_1));
        Ok((amount_0, amount_1))
    }

    pub fn burn(
        &mut self,
        owner: &str,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
        commit: bool,
    ) -> PoolResult<(U256, U256)> {
        let liquidity_delta = -i128::try_from(amount).map_err(|_| PoolError::LiquidityOverflow {
            tick: tick_lower,
            max: self.immutables.max_liquidity_per_tick,
        })?;
        let (_, amount_0, amount_1) =
            self.modify_position(owner, tick_lower, tick_upper, liquidity_delta, commit)?;
        if commit {
            let key = (owner.to_string(), tick_lower, tick_upper);
            self.positions
                .credit_tokens_owed(&key, amount_0.as_u128(), amount_1.as_u128())?;
            self.state.balance_0 = self.state.balance_0.wrapping_sub(u256_to_i256(amount_0));
            self.state.balance_1 = self.state.balance_1.wrapping_sub(u256_to_i256(amount_1));
        }
        Ok((amount_0, amount_1))
    }

    fn modify_position(
        &mut self,
        owner: &str,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
        commit: bool,
    ) -> PoolResult<(Position, U256, U256)> {
        if tick_lower >= tick_upper {
            return Err(PoolError::InvalidTickRange {
                tick_lower,
                tick_upper,
            });
        }
        if tick_lower < MIN_TICK || tick_upper > MAX_TICK {
            return Err(PoolError::InvalidTickRange {
                tick_lower,
                tick_upper,
            });
        }
        if tick_lower % self.immutables.tick_spacing != 0 {
            return Err(PoolError::TicksNotSpaced {
                tick: tick_lower,
                tick_spacing: self.immutables.tick_spacing,
            });
        }
        if tick_upper % self.immutables.tick_spacing != 0 {
            return Err(PoolError::TicksNotSpaced {
                tick: tick_upper,
                tick_spacing: self.immutables.tick_spacing,
            });
        }

        let tick_current = self.slot0.tick;

        let (position, lower_flipped, upper_flipped) = if commit {
            let (tick_cumulative, spl_cumulative) = self.current_cumulatives()?;
            let time = self.last_block_timestamp;

            let lower_flipped = self.ticks.update_tick(
                tick_lower,
                tick_current,
                liquidity_delta,
                self.state.fee_growth_global_0,
                self.state.fee_growth_global_1,
                spl_cumulative,
                tick_cumulative,
                time,
                false,
                self.immutables.max_liquidity_per_tick,
            )?;
            let upper_flipped = self.ticks.update_tick(
                tick_upper,
                tick_current,
                liquidity_delta,
                self.state.fee_growth_global_0,
                self.state.fee_growth_global_1,
                spl_cumulative,
                tick_cumulative,
                time,
                true,
                self.immutables.max_liquidity_per_tick,
            )?;

            let lower_tick = self.ticks.get(tick_lower).copied().unwrap_or_default();
            let upper_tick = self.ticks.get(tick_upper).copied().unwrap_or_default();
            let (fgi0, fgi1) = fee_growth_inside(
                &lower_tick,
                &upper_tick,
                tick_lower,
                tick_upper,
                tick_current,
                self.state.fee_growth_global_0,
                self.state.fee_growth_global_1,
            );

            let key = (owner.to_string(), tick_lower, tick_upper);
            let position = self
                .positions
                .update_position(&key, liquidity_delta, fgi0, fgi1)?;
            (position, lower_flipped, upper_flipped)
        } else {
            let lower_tick = self.ticks.get(tick_lower).copied().unwrap_or_default();
            let upper_tick = self.ticks.get(tick_upper).copied().unwrap_or_default();
            let (fgi0, fgi1) = fee_growth_inside(
                &lower_tick,
                &upper_tick,
                tick_lower,
                tick_upper,
                tick_current,
                self.state.fee_growth_global_0,
                self.state.fee_growth_global_1,
            );

            let key = (owner.to_string(), tick_lower, tick_upper);
            let existing = self.positions.get(&key).copied();
            if liquidity_delta == 0 && existing.is_none() {
                return Err(PoolError::UninitializedPositionPoke {
                    owner: owner.to_string(),
                    tick_lower,
                    tick_upper,
                });
            }
            let mut position = existing.unwrap_or_default();
            let liquidity_before = position.liquidity;

            let delta_fees_0 = fgi0.wrapping_sub(position.fee_growth_inside_0_last);
            let delta_fees_1 = fgi1.wrapping_sub(position.fee_growth_inside_1_last);
            let fees_0 = crate::fixed_point::mul_div(
                delta_fees_0,
                U256::from(liquidity_before),
                U256::ONE << 128,
            )?
            .as_u128();
            let fees_1 = crate::fixed_point::mul_div(
                delta_fees_1,
                U256::from(liquidity_before),
                U256::ONE << 128,
            )?
            .as_u128();
            let liquidity_new = add_delta(liquidity_before, liquidity_delta).ok_or(
                PoolError::LiquidityOverflow {
                    tick: tick_lower,
                    max: u128::MAX,
                },
            )?;

            position.liquidity = liquidity_new;
            position.tokens_owed_0 = position.tokens_owed_0.wrapping_add(fees_0);
            position.tokens_owed_1 = position.tokens_owed_1.wrapping_add(fees_1);
            position.fee_growth_inside_0_last = fgi0;
            position.fee_growth_inside_1_last = fgi1;
            (position, false, false)
        };

        let sp_lower = get_sqrt_ratio_at_tick(tick_lower)?;
        let sp_upper = get_sqrt_ratio_at_tick(tick_upper)?;
        let round_up = liquidity_delta > 0;
        let magnitude = liquidity_delta.unsigned_abs();

        let (amount_0, amount_1) = if tick_current < tick_lower {
            (
                get_amount0_delta(sp_lower, sp_upper, magnitude, round_up)?,
                U256::ZERO,
            )
        } else if tick_current < tick_upper {
            if commit {
                self.write_oracle_observation();
            }
            let a0 = get_amount0_delta(self.slot0.sqrt_price, sp_upper, magnitude, round_up)?;
            let a1 = get_amount1_delta(sp_lower, self.slot0.sqrt_price, magnitude, round_up)?;
            if commit {
                self.state.liquidity = add_delta(self.state.liquidity, liquidity_delta).ok_or(
                    PoolError::LiquidityOverflow {
                        tick: tick_current,
                        max: u128::MAX,
                    },
                )?;
            }
            (a0, a1)
        } else {
            (U256::ZERO, get_amount1_delta(sp_lower, sp_upper, magnitude, round_up)?)
        };

        if liquidity_delta < 0 && commit {
            if lower_flipped {
                self.ticks.clear(tick_lower);
            }
            if upper_flipped {
                self.ticks.clear(tick_upper);
            }
        }

        Ok((position, amount_0, amount_1))
    }

    pub fn swap(
        &mut self,
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit: U256,
    ) -> PoolResult<(I256, I256)> {
        if amount_specified == I256::ZERO {
            return Err(PoolError::ZeroSwapAmount);
        }
        let sqrt_price_start = self.slot0.sqrt_price;
        if sqrt_price_limit <= min_sqrt_ratio() || sqrt_price_limit >= max_sqrt_ratio() {
            return Err(PoolError::PriceLimitOutOfBounds { sqrt_price_limit });
        }
        if zero_for_one {
            if sqrt_price_limit >= sqrt_price_start {
                return Err(PoolError::InvalidPriceLimit {
                    sqrt_price_limit,
                    zero_for_one,
                });
            }
        } else if sqrt_price_limit <= sqrt_price_start {
            return Err(PoolError::InvalidPriceLimit {
                sqrt_price_limit,
                zero_for_one,
            });
        }

        let exact_input = amount_specified > I256::ZERO;
        let tick_before = self.slot0.tick;
        let liquidity_before = self.state.liquidity;
        let time = self.last_block_timestamp;

        let fee_protocol_share = if zero_for_one {
            self.slot0.fee_protocol & 0x0F
        } else {
            self.slot0.fee_protocol >> 4
        };

        let mut st = SwapState {
            remaining: amount_specified,
            calculated: I256::ZERO,
            sqrt_price: sqrt_price_start,
            tick: tick_before,
            fee_growth_global: if zero_for_one {
                self.state.fee_growth_global_0
            } else {
                self.state.fee_growth_global_1
            },
            protocol_fee: 0,
            liquidity: liquidity_before,
        };

        let mut cached_cumulatives: Option<(i64, U256)> = None;

        while st.remaining != I256::ZERO && st.sqrt_price != sqrt_price_limit {
            let tick_next = self.ticks.next_initialized_tick(st.tick, zero_for_one);
            let sp_next_tick = get_sqrt_ratio_at_tick(tick_next)?;
            let target_is_tick = if zero_for_one {
                sp_next_tick >= sqrt_price_limit
            } else {
                sp_next_tick <= sqrt_price_limit
            };
            let sp_target = if target_is_tick {
                sp_next_tick
            } else {
                sqrt_price_limit
            };

            let step =
                compute_swap_step(st.sqrt_price, sp_target, st.liquidity, st.remaining, self.immutables.fee)?;

            if exact_input {
                st.remaining = st.remaining - u256_to_i256(step.amount_in + step.fee_amount);
                st.calculated = st.calculated - u256_to_i256(step.amount_out);
            } else {
                st.remaining = st.remaining + u256_to_i256(step.amount_out);
                st.calculated = st.calculated + u256_to_i256(step.amount_in + step.fee_amount);
            }

            let mut fee_amount = step.fee_amount;
            if fee_protocol_share > 0 {
                let delta = fee_amount / U256::from(fee_protocol_share);
                fee_amount -= delta;
                st.protocol_fee = st.protocol_fee.wrapping_add(delta.as_u128());
                tracing::trace!(delta = %delta, "protocol fee carved out");
            }

            if st.liquidity > 0 {
                st.fee_growth_global = st
                    .fee_growth_global
                    .wrapping_add((fee_amount << 128) / U256::from(st.liquidity));
            }

            if step.sqrt_ratio_next == sp_target && target_is_tick {
                if cached_cumulatives.is_none() {
                    cached_cumulatives = Some(self.oracle.observe_single(
                        time,
                        0,
                        tick_before,
                        self.slot0.observation_index,
                        liquidity_before,
                        self.slot0.observation_cardinality,
                    )?);
                }
                let (tick_cumulative, spl_cumulative) = cached_cumulatives.unwrap();
                let (gg0, gg1) = if zero_for_one {
                    (st.fee_growth_global, self.state.fee_growth_global_1)
                } else {
                    (self.state.fee_growth_global_0, st.fee_growth_global)
                };
                let liquidity_net = self.ticks.cross_tick(
                    tick_next,
                    gg0,
                    gg1,
                    spl_cumulative,
                    tick_cumulative,
                    time,
                )?;
                tracing::trace!(tick = tick_next, "tick crossed");
                let signed_net = if zero_for_one {
                    -liquidity_net
                } else {
                    liquidity_net
                };
                st.liquidity = add_delta(st.liquidity, signed_net).ok_or(
                    PoolError::LiquidityOverflow {
                        tick: tick_next,
                        max: u128::MAX,
                    },
                )?;
                st.tick = if zero_for_one { tick_next - 1 } else { tick_next };
            } else if step.sqrt_ratio_next != st.sqrt_price {
                st.tick = get_tick_at_sqrt_ratio(step.sqrt_ratio_next)?;
            }
            st.sqrt_price = step.sqrt_ratio_next;
        }

        if st.tick != tick_before {
            let (index, cardinality) = self.oracle.write(
                self.slot0.observation_index,
                time,
                tick_before,
                liquidity_before,
                self.slot0.observation_cardinality,
                self.slot0.observation_cardinality_next,
            );
            self.slot0.observation_index = index;
            self.slot0.observation_cardinality = cardinality;
            self.slot0.tick = st.tick;
        }
        self.slot0.sqrt_price = st.sqrt_price;

        if st.liquidity != liquidity_before {
            self.state.liquidity = st.liquidity;
        }
        if zero_for_one {
            self.state.fee_growth_global_0 = st.fee_growth_global;
            self.state.protocol_fee_0 = self.state.protocol_fee_0.wrapping_add(st.protocol_fee);
        } else {
            self.state.fee_growth_global_1 = st.fee_growth_global;
            self.state.protocol_fee_1 = self.state.protocol_fee_1.wrapping_add(st.protocol_fee);
        }

        let (amount_0, amount_1) = if zero_for_one == exact_input {
            (amount_specified - st.remaining, st.calculated)
        } else {
            (st.calculated, amount_specified - st.remaining)
        };

        self.state.balance_0 = self.state.balance_0.wrapping_add(amount_0);
        self.state.balance_1 = self.state.balance_1.wrapping_add(amount_1);

        Ok((amount_0, amount_1))
    }

    pub fn to_snapshot(&self, block_number: u64) -> PoolSnapshot {
        let ticks = self
            .ticks
            .entries()
            .map(|(t, tick)| (t.to_string(), *tick))
            .collect();
        let positions = self
            .positions
            .entries()
            .map(|(k, p)| (format_position_key(k), *p))
            .collect();
        let observations = self.oracle.as_slice().to_vec();

        PoolSnapshot {
            block_timestamp: self.last_block_timestamp,
            block_number,
            protocol_fee_0: self.state.protocol_fee_0,
            protocol_fee_1: self.state.protocol_fee_1,
            immutables: ImmutablesSnapshot {
                pool_address: self.immutables.pool_address.clone(),
                fee: self.immutables.fee,
                tick_spacing: self.immutables.tick_spacing,
                max_liquidity_per_tick: self.immutables.max_liquidity_per_tick,
                token_0: self.immutables.token_0.clone(),
                token_1: self.immutables.token_1.clone(),
            },
            state: StateSnapshot {
                liquidity: self.state.liquidity,
                fee_growth_global_0: self.state.fee_growth_global_0,
                fee_growth_global_1: self.state.fee_growth_global_1,
                balance_0: self.state.balance_0,
                balance_1: self.state.balance_1,
            },
            slot0: Slot0Snapshot {
                sqrt_price: self.slot0.sqrt_price,
                tick: self.slot0.tick,
                observation_index: self.slot0.observation_index,
                observation_cardinality: self.slot0.observation_cardinality,
                observation_cardinality_next: self.slot0.observation_cardinality_next,
                fee_protocol: self.slot0.fee_protocol,
            },
            ticks,
            positions,
            observations,
        }
    }

    pub fn from_snapshot(snapshot: PoolSnapshot) -> PoolResult<Self> {
        if snapshot.slot0.tick < MIN_TICK || snapshot.slot0.tick > MAX_TICK {
            return Err(PoolError::InvalidSnapshot {
                reason: "slot0.tick out of range".to_string(),
            });
        }
        if snapshot.immutables.tick_spacing <= 0 {
            return Err(PoolError::InvalidSnapshot {
                reason: "tick_spacing must be positive".to_string(),
            });
        }
        if snapshot.observations.is_empty() {
            return Err(PoolError::InvalidSnapshot {
                reason: "observations must not be empty".to_string(),
            });
        }

        let mut ticks = BTreeMap::new();
        for (key, tick) in snapshot.ticks {
            let idx: i32 = key.parse().map_err(|_| PoolError::InvalidSnapshot {
                reason: format!("malformed tick key {key:?}"),
            })?;
            if idx % snapshot.immutables.tick_spacing != 0 {
                return Err(PoolError::InvalidSnapshot {
                    reason: format!("tick {idx} is not aligned to tick_spacing"),
                });
            }
            ticks.insert(idx, tick);
        }

        let mut positions = BTreeMap::new();
        for (key, position) in snapshot.positions {
            let parsed = parse_position_key(&key)?;
            if parsed.1 >= parsed.2 {
                return Err(PoolError::InvalidSnapshot {
                    reason: format!("position {key:?} has tick_lower >= tick_upper"),
                });
            }
            positions.insert(parsed, position);
        }

        Ok(Self {
            immutables: PoolImmutables {
                pool_address: snapshot.immutables.pool_address,
                fee: snapshot.immutables.fee,
                tick_spacing: snapshot.immutables.tick_spacing,
                max_liquidity_per_tick: snapshot.immutables.max_liquidity_per_tick,
                token_0: snapshot.immutables.token_0,
                token_1: snapshot.immutables.token_1,
            },
            slot0: Slot0 {
                sqrt_price: snapshot.slot0.sqrt_price,
                tick: snapshot.slot0.tick,
                observation_index: snapshot.slot0.observation_index,
                observation_cardinality: snapshot.slot0.observation_cardinality,
                observation_cardinality_next: snapshot.slot0.observation_cardinality_next,
                fee_protocol: snapshot.slot0.fee_protocol,
            },
            state: PoolState {
                liquidity: snapshot.state.liquidity,
                fee_growth_global_0: snapshot.state.fee_growth_global_0,
                fee_growth_global_1: snapshot.state.fee_growth_global_1,
                balance_0: snapshot.state.balance_0,
                balance_1: snapshot.state.balance_1,
                protocol_fee_0: snapshot.protocol_fee_0,
                protocol_fee_1: snapshot.protocol_fee_1,
            },
            ticks: TickTable::from_map(ticks),
            positions: PositionTable::from_map(positions),
            oracle: OracleRing::from_vec(snapshot.observations),
            last_block_timestamp: snapshot.block_timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(symbol: &str) -> TokenInfo {
        TokenInfo {
            address: format!("0x{symbol}"),
            name: symbol.to_string(),
            symbol: symbol.to_string(),
            decimals: 18,
        }
    }

    fn new_pool() -> PoolEngine {
        PoolEngine::new(
            "pool".to_string(),
            3000,
            None,
            None,
            0,
            token("USDC"),
            token("ETH"),
        )
        .unwrap()
    }

    mod mint {
        use super::*;

        #[test]
        fn requires_nonzero_amount() {
            let mut pool = new_pool();
            let err = pool.mint("alice", -60, 60, 0).unwrap_err();
            assert!(matches!(err, PoolError::ZeroLiquidity));
        }

        #[test]
        fn requires_ordered_ticks() {
            let mut pool = new_pool();
            let err = pool.mint("alice", 60, -60, 1_000).unwrap_err();
            assert!(matches!(err, PoolError::InvalidTickRange { .. }));
        }

        #[test]
        fn first_mint_moves_both_tokens_when_in_range() {
            let mut pool = new_pool();
            let (a0, a1) = pool.mint("alice", -60, 60, 1_000_000).unwrap();
            assert!(a0 > U256::ZERO);
            assert!(a1 > U256::ZERO);
            assert_eq!(pool.state().liquidity, 1_000_000);
        }

        #[test]
        fn exceeding_max_liquidity_per_tick_fails() {
            let mut pool = new_pool();
            let max = pool.immutables().max_liquidity_per_tick;
            let err = pool.mint("alice", -60, 60, max + 1).unwrap_err();
            assert!(matches!(err, PoolError::LiquidityOverflow { .. }));
            assert_eq!(pool.state().liquidity, 0);
        }
    }

    mod burn {
        use super::*;

        #[test]
        fn poke_on_never_minted_position_fails() {
            let mut pool = new_pool();
            let err = pool.burn("alice", -60, 60, 0, true).unwrap_err();
            assert!(matches!(err, PoolError::UninitializedPositionPoke { .. }));
        }

        #[test]
        fn mint_then_burn_round_trips_within_one_wei() {
            let mut pool = new_pool();
            let (m0, m1) = pool.mint("alice", -60, 60, 1_000_000_000).unwrap();
            let (b0, b1) = pool.burn("alice", -60, 60, 1_000_000_000, true).unwrap();
            assert!(m0.as_u128() >= b0.as_u128() && m0.as_u128() - b0.as_u128() <= 1);
            assert!(m1.as_u128() >= b1.as_u128() && m1.as_u128() - b1.as_u128() <= 1);
            assert_eq!(pool.state().liquidity, 0);
        }

        #[test]
        fn dry_run_does_not_mutate_position() {
            let mut pool = new_pool();
            pool.mint("alice", -60, 60, 1_000_000_000).unwrap();
            let before = *pool.positions().get(&("alice".to_string(), -60, 60)).unwrap();
            pool.burn("alice", -60, 60, 1_000_000_000, false).unwrap();
            let after = *pool.positions().get(&("alice".to_string(), -60, 60)).unwrap();
            assert_eq!(before, after);
        }
    }

    mod swap {
        use super::*;

        #[test]
        fn rejects_zero_amount() {
            let mut pool = new_pool();
            pool.mint("alice", -887220, 887220, 2_000_000_000_000_000_000).unwrap();
            let err = pool
                .swap(true, I256::ZERO, min_sqrt_ratio() + U256::ONE)
                .unwrap_err();
            assert!(matches!(err, PoolError::ZeroSwapAmount));
        }

        #[test]
        fn exact_input_zero_for_one_consumes_full_input() {
            let mut pool = new_pool();
            pool.mint("alice", -887220, 887220, 2_000_000_000_000_000_000).unwrap();
            let (amount_0, amount_1) = pool
                .swap(
                    true,
                    I256::from(1_000_000_000_000_000_000i128),
                    min_sqrt_ratio() + U256::ONE,
                )
                .unwrap();
            assert_eq!(amount_0, I256::from(1_000_000_000_000_000_000i128));
            assert!(amount_1 < I256::ZERO);
        }

        #[test]
        fn price_limit_clamps_the_move() {
            let mut pool = new_pool();
            pool.mint("alice", -887220, 887220, 2_000_000_000_000_000_000).unwrap();
            let limit = pool.slot0().sqrt_price - (pool.slot0().sqrt_price >> 10);
            let (amount_0, _) = pool
                .swap(true, I256::from(1_000_000_000_000_000_000i128), limit)
                .unwrap();
            assert_eq!(pool.slot0().sqrt_price, limit);
            assert!(amount_0 < I256::from(1_000_000_000_000_000_000i128));
        }
    }

    mod snapshot_round_trip {
        use super::*;

        #[test]
        fn to_snapshot_then_from_snapshot_preserves_state() {
            let mut pool = new_pool();
            pool.mint("alice", -60, 60, 1_000_000_000).unwrap();
            pool.swap(true, I256::from(1_000_000i128), min_sqrt_ratio() + U256::ONE)
                .unwrap();
            let snapshot = pool.to_snapshot(42);
            let reloaded = PoolEngine::from_snapshot(snapshot).unwrap();
            assert_eq!(reloaded.slot0().sqrt_price, pool.slot0().sqrt_price);
            assert_eq!(reloaded.slot0().tick, pool.slot0().tick);
            assert_eq!(reloaded.state().liquidity, pool.state().liquidity);
        }
    }
}
