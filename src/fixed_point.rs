//! Full-precision `(a * b) / c` with explicit rounding.
//!
//! The pool's fee-growth accumulators are 256-bit, so a plain `U256::checked_mul`
//! is not enough headroom for the intermediate product: `a * b` can itself need
//! up to 512 bits before the division by `d` brings it back down. This module
//! builds that 512-bit intermediate from four 128-bit partial products (the same
//! halving trick this lineage's `ethnum`-based sibling module uses for `u128`
//! operands, generalized here to full `U256` operands) and then divides it back
//! down with a textbook binary long division.

use ethnum::U256;

use crate::error::{PoolError, PoolResult};

const MASK_128: U256 = U256::new(u128::MAX);

fn lo128(x: U256) -> u128 {
    (x & MASK_128).as_u128()
}

fn hi128(x: U256) -> u128 {
    (x >> 128u32).as_u128()
}

/// A 512-bit unsigned value, represented as two 256-bit halves. Exists only to
/// carry the intermediate product of `mul_div`; never exposed publicly.
#[derive(Clone, Copy)]
struct Wide512 {
    hi: U256,
    lo: U256,
}

fn mul_wide(a: U256, b: U256) -> Wide512 {
    let (a0, a1) = (lo128(a), hi128(a));
    let (b0, b1) = (lo128(b), hi128(b));

    let t0 = U256::from(a0) * U256::from(b0);
    let t1 = U256::from(a0) * U256::from(b1);
    let t2 = U256::from(a1) * U256::from(b0);
    let t3 = U256::from(a1) * U256::from(b1);

    let (cross, cross_carry) = t1.overflowing_add(t2);
    let cross_lo = lo128(cross);
    let cross_hi = cross >> 128;

    let (lo, lo_carry) = t0.overflowing_add(U256::from(cross_lo) << 128);
    let mut hi = t3 + cross_hi;
    if cross_carry {
        hi += U256::ONE << 128;
    }
    if lo_carry {
        hi += U256::ONE;
    }
    Wide512 { hi, lo }
}

fn bit512(w: &Wide512, i: u32) -> bool {
    if i >= 256 {
        (w.hi >> (i - 256)) & U256::ONE == U256::ONE
    } else {
        (w.lo >> i) & U256::ONE == U256::ONE
    }
}

/// Divides a 512-bit dividend by a 256-bit divisor, returning `(quotient, remainder)`.
/// `quotient` is only meaningful if `overflow` comes back false; a true quotient
/// wider than 256 bits sets it instead of wrapping.
fn div_wide(num: Wide512, d: U256) -> (U256, U256, bool) {
    let mut r = U256::ZERO;
    let mut q = U256::ZERO;
    let mut overflow = false;
    for i in (0..512u32).rev() {
        r = (r << 1) | U256::from(bit512(&num, i) as u8);
        if r >= d {
            r -= d;
            if i >= 256 {
                overflow = true;
            } else {
                q |= U256::ONE << i;
            }
        }
    }
    (q, r, overflow)
}

/// `⌊(a · b) / d⌋`, computed with a full 512-bit intermediate product.
pub fn mul_div(a: U256, b: U256, d: U256) -> PoolResult<U256> {
    if d == U256::ZERO {
        return Err(PoolError::DivByZero { divisor: d });
    }
    let product = mul_wide(a, b);
    let (q, _r, overflow) = div_wide(product, d);
    if overflow {
        return Err(PoolError::MulDivOverflow { a, b, d });
    }
    Ok(q)
}

/// `⌈(a · b) / d⌉`, computed with a full 512-bit intermediate product.
pub fn mul_div_rounding_up(a: U256, b: U256, d: U256) -> PoolResult<U256> {
    if d == U256::ZERO {
        return Err(PoolError::DivByZero { divisor: d });
    }
    let product = mul_wide(a, b);
    let (q, r, overflow) = div_wide(product, d);
    if overflow {
        return Err(PoolError::MulDivOverflow { a, b, d });
    }
    if r == U256::ZERO {
        return Ok(q);
    }
    q.checked_add(U256::ONE)
        .ok_or(PoolError::MulDivOverflow { a, b, d })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(x: u128) -> U256 {
        U256::from(x)
    }

    mod mul_div {
        use super::*;

        #[test]
        fn matches_spec_fixture_one() {
            // mul_div(2^128, 35*2^128, 8*2^128) = floor(4375*2^128/1000)
            let a = U256::ONE << 128;
            let b = u(35) << 128;
            let d = u(8) << 128;
            let expected = (u(4375) << 128) / u(1000);
            assert_eq!(mul_div(a, b, d).unwrap(), expected);
        }

        #[test]
        fn matches_spec_fixture_two() {
            let a = U256::ONE << 128;
            let b = u(1000) << 128;
            let d = u(3000) << 128;
            let expected = U256::from_str_radix(
                "113427455640312821154458202477256070485",
                10,
            )
            .unwrap();
            assert_eq!(mul_div(a, b, d).unwrap(), expected);
        }

        #[test]
        fn fails_div_by_zero() {
            assert_eq!(
                mul_div(u(1), u(1), U256::ZERO),
                Err(PoolError::DivByZero {
                    divisor: U256::ZERO
                })
            );
        }

        #[test]
        fn overflows_when_quotient_exceeds_u256_max() {
            let a = U256::ONE << 128;
            let b = U256::ONE << 128;
            let d = U256::ONE;
            assert!(matches!(
                mul_div(a, b, d),
                Err(PoolError::MulDivOverflow { .. })
            ));
        }
    }

    mod mul_div_rounding_up {
        use super::*;

        #[test]
        fn matches_spec_fixture() {
            let a = U256::ONE << 128;
            let b = u(50) << 128;
            let d = u(150) << 128;
            let expected = U256::from_str_radix(
                "113427455640312821154458202477256070486",
                10,
            )
            .unwrap();
            assert_eq!(mul_div_rounding_up(a, b, d).unwrap(), expected);
        }

        #[test]
        fn exact_division_does_not_round() {
            assert_eq!(mul_div_rounding_up(u(10), u(10), u(10)).unwrap(), u(10));
        }

        #[test]
        fn rounds_up_on_remainder() {
            assert_eq!(mul_div_rounding_up(u(1), u(1), u(2)).unwrap(), u(1));
        }
    }

    mod muldiv_u128_quickcheck {
        use super::*;

        use quickcheck::{quickcheck, Arbitrary, Gen};

        #[derive(Debug, Clone, Copy)]
        struct NonZero(U256);

        impl Arbitrary for NonZero {
            fn arbitrary<G: Gen>(g: &mut G) -> Self {
                loop {
                    let v = u128::arbitrary(g);
                    if v != 0 {
                        return NonZero(U256::from(v));
                    }
                }
            }
        }

        quickcheck! {
            fn floor_matches_widened_division(a: u128, b: u128, d: NonZero) -> bool {
                let (a, b) = (U256::from(a), U256::from(b));
                let expected = (a * b) / d.0;
                mul_div(a, b, d.0).unwrap() == expected
            }
        }

        quickcheck! {
            fn ceil_matches_widened_division(a: u128, b: u128, d: NonZero) -> bool {
                let (a, b) = (U256::from(a), U256::from(b));
                let product = a * b;
                let mut expected = product / d.0;
                if product % d.0 != U256::ZERO {
                    expected += U256::ONE;
                }
                mul_div_rounding_up(a, b, d.0).unwrap() == expected
            }
        }
    }
}
