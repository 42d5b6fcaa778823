//! Conversions between a tick index and the Q64.96 sqrt-price it represents.
//!
//! Ported from this lineage's Q32.32/u64 `tick_math.rs` precursor, widened to the
//! Q64.96/u160 domain: the bit-decomposition shape (19 precomputed ratio
//! factors keyed by the bits of `|tick|`) and the log2-refinement shape of
//! `get_tick_at_sqrt_ratio` (most-significant-bit seed, 14 rounds of squaring)
//! carry over unchanged; only the magic constants and bit widths change to match
//! the wider fixed-point format.

use ethnum::{I256, U256};

use crate::bit_math::most_significant_bit;
use crate::error::{PoolError, PoolResult};

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = 887272;

/// `get_sqrt_ratio_at_tick(MIN_TICK)`.
pub fn min_sqrt_ratio() -> U256 {
    U256::new(4295128739)
}

/// `get_sqrt_ratio_at_tick(MAX_TICK)`.
pub fn max_sqrt_ratio() -> U256 {
    U256::from_str_radix(
        "1461446703485210103287273052203988822378723970342",
        10,
    )
    .unwrap()
}

const RATIO_FACTORS: [u128; 19] = [
    0xfffcb933bd6fad37aa2d162d1a594001,
    0xfff97272373d413259a46990580e213a,
    0xfff2e50f5f656932ef12357cf3c7fdcc,
    0xffe5caca7e10e4e61c3624eaa0941cd0,
    0xffcb9843d60f6159c9db58835c926644,
    0xff973b41fa98c081472e6896dfb254c0,
    0xff2ea16466c96a3843ec78b326b52861,
    0xfe5dee046a99a2a811c461f1969c3053,
    0xfcbe86c7900a88aedcffc83b479aa3a4,
    0xf987a7253ac413176f2b074cf7815e54,
    0xf3392b0822b70005940c7a398e4b70f3,
    0xe7159475a2c29b7443b29c7fa6e889d9,
    0xd097f3bdfd2022b8845ad8f792aa5825,
    0xa9f746462d870fdf8a65dc1f90e061e5,
    0x70d869a156d2a1b890bb3df62baf32f7,
    0x31be135f97d08fd981231505542fcfa6,
    0x9aa508b5b7a84e1c677de54f3e99bc9,
    0x5d6af8dedb81196699c329225ee604,
    0x2216e584f5fa1ea926041bedfe98,
];

/// Returns `floor(sqrt(1.0001^tick) * 2^96)` as a Q64.96 value.
pub fn get_sqrt_ratio_at_tick(tick: i32) -> PoolResult<U256> {
    let abs_tick = tick.unsigned_abs();
    if abs_tick > MAX_TICK as u32 {
        return Err(PoolError::OutOfRangeTick { tick });
    }

    let mut ratio: U256 = if abs_tick & 0x1 != 0 {
        U256::new(0xfffcb933bd6fad37aa2d162d1a594001)
    } else {
        U256::ONE << 128
    };

    for (i, factor) in RATIO_FACTORS.iter().enumerate().skip(1) {
        if abs_tick & (1 << i) != 0 {
            ratio = (ratio * U256::new(*factor)) >> 128;
        }
    }

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Round up and truncate from Q128.128 to Q64.96.
    let shifted = ratio >> 32;
    let rounded = if ratio & ((U256::ONE << 32) - U256::ONE) != U256::ZERO {
        shifted + U256::ONE
    } else {
        shifted
    };
    Ok(rounded)
}

/// Returns the greatest tick whose sqrt ratio is less than or equal to `sqrt_price`.
pub fn get_tick_at_sqrt_ratio(sqrt_price: U256) -> PoolResult<i32> {
    if sqrt_price < min_sqrt_ratio() || sqrt_price >= max_sqrt_ratio() {
        return Err(PoolError::OutOfRangeSqrtPrice {
            sqrt_price,
        });
    }

    let ratio = sqrt_price << 32;
    let msb = most_significant_bit(ratio) as u32;

    let mut r: U256 = if msb >= 128 {
        ratio >> (msb - 127)
    } else {
        ratio << (127 - msb)
    };

    let mut log_2: I256 = I256::from(msb as i64 - 128) << 64;

    for shift in (50..=63).rev() {
        r = (r * r) >> 127;
        let f = (r >> 128u32).as_u8();
        log_2 |= I256::from(f) << shift;
        r >>= f;
    }

    let log_sqrt10001 = log_2 * I256::from(255738958999603826347141i128);

    let tick_low = ((log_sqrt10001
        - I256::from_str_radix("3402992956809132418596140100660247210", 10).unwrap())
        >> 128u32)
        .as_i32();
    let tick_high = ((log_sqrt10001
        + I256::from_str_radix("291339464771989622907027621153398088495", 10).unwrap())
        >> 128u32)
        .as_i32();

    let tick = if tick_low == tick_high {
        tick_low
    } else if get_sqrt_ratio_at_tick(tick_high)? <= sqrt_price {
        tick_high
    } else {
        tick_low
    };
    Ok(tick)
}

#[cfg(test)]
mod tests {
    use super::*;

    mod get_sqrt_ratio_at_tick {
        use super::*;

        #[test]
        fn fails_above_max_tick() {
            assert!(matches!(
                get_sqrt_ratio_at_tick(MAX_TICK + 1),
                Err(PoolError::OutOfRangeTick { .. })
            ));
        }

        #[test]
        fn fails_below_min_tick() {
            assert!(matches!(
                get_sqrt_ratio_at_tick(MIN_TICK - 1),
                Err(PoolError::OutOfRangeTick { .. })
            ));
        }

        #[test]
        fn min_tick_matches_reference() {
            assert_eq!(get_sqrt_ratio_at_tick(MIN_TICK).unwrap(), min_sqrt_ratio());
        }

        #[test]
        fn max_tick_matches_reference() {
            assert_eq!(get_sqrt_ratio_at_tick(MAX_TICK).unwrap(), max_sqrt_ratio());
        }

        #[test]
        fn tick_zero_is_one_in_q64_96() {
            assert_eq!(get_sqrt_ratio_at_tick(0).unwrap(), U256::ONE << 96);
        }

        #[test]
        fn is_monotonic_increasing() {
            let mut prev = get_sqrt_ratio_at_tick(MIN_TICK).unwrap();
            for t in [-500000, -1, 1, 500000, MAX_TICK] {
                let cur = get_sqrt_ratio_at_tick(t).unwrap();
                assert!(cur > prev);
                prev = cur;
            }
        }
    }

    mod get_tick_at_sqrt_ratio {
        use super::*;

        #[test]
        fn fails_below_min_sqrt_ratio() {
            assert!(matches!(
                get_tick_at_sqrt_ratio(min_sqrt_ratio() - U256::ONE),
                Err(PoolError::OutOfRangeSqrtPrice { .. })
            ));
        }

        #[test]
        fn fails_at_max_sqrt_ratio() {
            assert!(matches!(
                get_tick_at_sqrt_ratio(max_sqrt_ratio()),
                Err(PoolError::OutOfRangeSqrtPrice { .. })
            ));
        }

        #[test]
        fn round_trips_at_fixture_ticks() {
            for t in [
                MIN_TICK,
                MIN_TICK + 1,
                -500000,
                -1,
                0,
                1,
                500000,
                MAX_TICK - 1,
                MAX_TICK,
            ] {
                let sp = get_sqrt_ratio_at_tick(t).unwrap();
                assert_eq!(get_tick_at_sqrt_ratio(sp).unwrap(), t);
            }
        }

        #[test]
        fn tick_zero_at_one_in_q64_96() {
            assert_eq!(get_tick_at_sqrt_ratio(U256::ONE << 96).unwrap(), 0);
        }
    }

    mod round_trip_quickcheck {
        use super::*;

        use quickcheck::{quickcheck, Arbitrary, Gen};

        #[derive(Debug, Clone, Copy)]
        struct ValidTick(i32);

        impl Arbitrary for ValidTick {
            fn arbitrary<G: Gen>(g: &mut G) -> Self {
                let raw = i32::arbitrary(g);
                let span = (MAX_TICK as i64 - MIN_TICK as i64) + 1;
                let tick = MIN_TICK as i64 + (raw as i64).rem_euclid(span);
                ValidTick(tick as i32)
            }
        }

        quickcheck! {
            fn any_tick_in_range_round_trips(tick: ValidTick) -> bool {
                let sp = get_sqrt_ratio_at_tick(tick.0).unwrap();
                get_tick_at_sqrt_ratio(sp).unwrap() == tick.0
            }
        }
    }
}
