//! Time-weighted price oracle: a fixed-capacity ring of cumulative
//! observations, grown in place exactly as the source's
//! `increase_observation_cardinality_next` instruction grows its PDA array
//! one account at a time — a `Vec<Observation>` pre-sized and pushed into,
//! never reallocated-and-shifted.

use ethnum::U256;

use crate::error::{PoolError, PoolResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Observation {
    pub block_timestamp: u32,
    pub tick_cumulative: i64,
    #[serde(with = "crate::snapshot::u256_decimal")]
    pub seconds_per_liquidity_cumulative: U256,
    pub initialized: bool,
}

#[derive(Clone, Debug, Default)]
pub struct OracleRing {
    observations: Vec<Observation>,
}

fn transform(prev: &Observation, now_ts: u32, tick: i32, liquidity: u128) -> Observation {
    let delta = now_ts.wrapping_sub(prev.block_timestamp) as i64;
    let effective_liquidity = liquidity.max(1);
    Observation {
        block_timestamp: now_ts,
        tick_cumulative: prev
            .tick_cumulative
            .wrapping_add((tick as i64).wrapping_mul(delta)),
        seconds_per_liquidity_cumulative: prev.seconds_per_liquidity_cumulative.wrapping_add(
            (U256::from(delta as u64) << 128) / U256::from(effective_liquidity),
        ),
        initialized: true,
    }
}

impl OracleRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn as_slice(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Seeds slot 0 at pool construction time. Returns `(index, cardinality)`.
    pub fn initialize(&mut self, time: u32) -> (u16, u16) {
        self.observations = vec![Observation {
            block_timestamp: time,
            tick_cumulative: 0,
            seconds_per_liquidity_cumulative: U256::ZERO,
            initialized: true,
        }];
        (0, 1)
    }

    /// Appends uninitialized slots up to `next`, as the source grows its
    /// observation account array one slot at a time. No-op if `next <= current`.
    pub fn grow(&mut self, current: u16, next: u16) -> u16 {
        if next <= current {
            return current;
        }
        self.observations
            .resize((next as usize).max(self.observations.len()), Observation::default());
        next
    }

    /// Writes a new observation if `now_ts` has advanced past the latest
    /// slot's timestamp. Returns the (possibly unchanged) `(index, cardinality)`.
    pub fn write(
        &mut self,
        index: u16,
        now_ts: u32,
        tick_before: i32,
        liquidity_before: u128,
        cardinality: u16,
        cardinality_next: u16,
    ) -> (u16, u16) {
        let last = self.observations[index as usize];
        if last.block_timestamp == now_ts {
            return (index, cardinality);
        }

        let cardinality_updated = if cardinality_next > cardinality && index == cardinality - 1 {
            cardinality_next
        } else {
            cardinality
        };
        let index_updated = (index + 1) % cardinality_updated;
        self.observations[index_updated as usize] =
            transform(&last, now_ts, tick_before, liquidity_before);
        (index_updated, cardinality_updated)
    }

    /// Tick-cumulative and seconds-per-liquidity-cumulative `secs_ago` seconds
    /// before `now_ts`, interpolating between the two bracketing observations.
    pub fn observe_single(
        &self,
        now_ts: u32,
        secs_ago: u32,
        tick: i32,
        index: u16,
        liquidity: u128,
        cardinality: u16,
    ) -> PoolResult<(i64, U256)> {
        if secs_ago == 0 {
            let last = self.observations[index as usize];
            if last.block_timestamp != now_ts {
                let t = transform(&last, now_ts, tick, liquidity);
                return Ok((t.tick_cumulative, t.seconds_per_liquidity_cumulative));
            }
            return Ok((last.tick_cumulative, last.seconds_per_liquidity_cumulative));
        }

        let target = now_ts.wrapping_sub(secs_ago);
        let (before, after) = self.bracket(target, index, cardinality)?;

        if target == before.block_timestamp {
            return Ok((before.tick_cumulative, before.seconds_per_liquidity_cumulative));
        }
        if target == after.block_timestamp {
            return Ok((after.tick_cumulative, after.seconds_per_liquidity_cumulative));
        }

        let observation_time_delta = after.block_timestamp.wrapping_sub(before.block_timestamp);
        let target_delta = target.wrapping_sub(before.block_timestamp);

        let tick_diff = after.tick_cumulative.wrapping_sub(before.tick_cumulative);
        let tick_cumulative = before.tick_cumulative.wrapping_add(
            (tick_diff as i128 * target_delta as i128 / observation_time_delta as i128) as i64,
        );

        let spl_diff = after
            .seconds_per_liquidity_cumulative
            .wrapping_sub(before.seconds_per_liquidity_cumulative);
        let seconds_per_liquidity_cumulative = before.seconds_per_liquidity_cumulative.wrapping_add(
            (spl_diff * U256::from(target_delta)) / U256::from(observation_time_delta),
        );

        Ok((tick_cumulative, seconds_per_liquidity_cumulative))
    }

    /// Modular binary search over `[index+1, index+1+cardinality)` for the two
    /// adjacent initialized observations bracketing `target`.
    fn bracket(
        &self,
        target: u32,
        index: u16,
        cardinality: u16,
    ) -> PoolResult<(Observation, Observation)> {
        let cardinality = cardinality as u32;
        let mut l = (index as u32 + 1) % cardinality;
        let mut r = l + cardinality - 1;

        loop {
            if l > r {
                return Err(PoolError::StaleOracle);
            }
            let i = (l + r) / 2;
            let before = self.observations[(i % cardinality) as usize];
            if !before.initialized {
                l = i + 1;
                continue;
            }
            let after = self.observations[((i + 1) % cardinality) as usize];

            let target_at_or_after_before = before.block_timestamp <= target;
            let target_at_or_before_after = target <= after.block_timestamp;

            if target_at_or_after_before && target_at_or_before_after {
                return Ok((before, after));
            }
            if !target_at_or_after_before {
                if i == 0 {
                    return Err(PoolError::StaleOracle);
                }
                r = i - 1;
            } else {
                l = i + 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod write {
        use super::*;

        #[test]
        fn same_timestamp_is_a_no_op() {
            let mut ring = OracleRing::new();
            let (index, cardinality) = ring.initialize(100);
            let (i2, c2) = ring.write(index, 100, 0, 1_000, cardinality, cardinality);
            assert_eq!((i2, c2), (index, cardinality));
        }

        #[test]
        fn advancing_timestamp_appends_when_grown() {
            let mut ring = OracleRing::new();
            let (index, cardinality) = ring.initialize(100);
            let cardinality_next = ring.grow(cardinality, 2);
            let (i2, c2) = ring.write(index, 112, 5, 1_000, cardinality, cardinality_next);
            assert_eq!(i2, 1);
            assert_eq!(c2, 2);
            assert_eq!(ring.as_slice()[1].block_timestamp, 112);
        }
    }

    mod observe_single {
        use super::*;

        #[test]
        fn zero_seconds_ago_returns_transformed_latest() {
            let mut ring = OracleRing::new();
            let (index, cardinality) = ring.initialize(100);
            let (tick_cum, _) = ring
                .observe_single(110, 0, 5, index, 1_000, cardinality)
                .unwrap();
            assert_eq!(tick_cum, 50);
        }

        #[test]
        fn interpolates_between_two_observations() {
            let mut ring = OracleRing::new();
            let (mut index, mut cardinality) = ring.initialize(0);
            let cardinality_next = ring.grow(cardinality, 2);
            let (i2, c2) = ring.write(index, 10, 0, 1_000, cardinality, cardinality_next);
            index = i2;
            cardinality = c2;
            let (tick_cum, _) = ring
                .observe_single(10, 5, 0, index, 1_000, cardinality)
                .unwrap();
            assert_eq!(tick_cum, 0);
        }

        #[test]
        fn target_older_than_earliest_observation_is_stale() {
            let mut ring = OracleRing::new();
            let (index, cardinality) = ring.initialize(100);
            let err = ring
                .observe_single(100, 50, 0, index, 1_000, cardinality)
                .unwrap_err();
            assert!(matches!(err, PoolError::StaleOracle));
        }
    }
}
