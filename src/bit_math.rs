//! Most/least significant bit helpers, widened from this lineage's `u64`
//! precursor to `ethnum::U256`. `most_significant_bit` backs
//! `tick_math::get_tick_at_sqrt_ratio`'s log2 seed.

use ethnum::U256;

/// Index (0-255) of the most significant set bit. Panics on zero, same as the
/// lineage's `u64`-width precursor.
pub fn most_significant_bit(x: U256) -> u8 {
    assert!(x != U256::ZERO, "most_significant_bit of zero");
    (255 - x.leading_zeros()) as u8
}

/// Index (0-255) of the least significant set bit. Panics on zero.
pub fn least_significant_bit(x: U256) -> u8 {
    assert!(x != U256::ZERO, "least_significant_bit of zero");
    x.trailing_zeros() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    mod most_significant_bit {
        use super::*;

        #[test]
        fn one_is_bit_zero() {
            assert_eq!(most_significant_bit(U256::ONE), 0);
        }

        #[test]
        fn power_of_two_is_its_own_exponent() {
            assert_eq!(most_significant_bit(U256::ONE << 200), 200);
        }

        #[test]
        fn max_is_bit_255() {
            assert_eq!(most_significant_bit(U256::MAX), 255);
        }

        #[test]
        #[should_panic]
        fn zero_panics() {
            most_significant_bit(U256::ZERO);
        }
    }

    mod least_significant_bit {
        use super::*;

        #[test]
        fn one_is_bit_zero() {
            assert_eq!(least_significant_bit(U256::ONE), 0);
        }

        #[test]
        fn power_of_two_is_its_own_exponent() {
            assert_eq!(least_significant_bit(U256::ONE << 200), 200);
        }

        #[test]
        fn max_is_bit_zero() {
            assert_eq!(least_significant_bit(U256::MAX), 0);
        }

        #[test]
        #[should_panic]
        fn zero_panics() {
            least_significant_bit(U256::ZERO);
        }
    }
}
