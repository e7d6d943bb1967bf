//! Integer helpers shared by the automaton stages.
//!
//! Everything on the per-cell hot path stays in `i64`; fractions are
//! expressed as fixed-point factors and rounded stochastically from the
//! cell's entropy so that repeated small moves are unbiased on average.

/// Absolute value, saturating at `i64::MAX`.
#[inline]
pub fn mag(n: i64) -> i64 {
    n.saturating_abs()
}

/// Clamp into `[min, max]`. Unlike `Ord::clamp` this never panics when
/// `min > max`; the lower bound wins.
#[inline]
pub fn clamp(n: i64, min: i64, max: i64) -> i64 {
    if n > max {
        return max.max(min);
    }
    if n < min {
        return min;
    }
    n
}

/// Multiply `num` by the fixed-point `factor` with `fractional_bits` bits
/// after the point.
///
/// The discarded fraction rounds up when the low bits of `entropy` fall
/// under it, so `mul_frac(1, 1, 1, e)` is 0 or 1 depending on the low bit
/// of `e`. Rounding is applied to the magnitude, making the result
/// symmetric in sign.
pub fn mul_frac(num: i64, factor: i64, fractional_bits: u32, entropy: u64) -> i64 {
    let negative = (num < 0) != (factor < 0);
    let product = num.unsigned_abs() as u128 * factor.unsigned_abs() as u128;
    let mask = (1u128 << fractional_bits) - 1;
    let mut whole = product >> fractional_bits;
    if (entropy as u128 & mask) < (product & mask) {
        whole += 1;
    }
    let whole = whole.min(i64::MAX as u128) as i64;
    if negative {
        -whole
    } else {
        whole
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_frac_table() {
        let cases: &[(i64, i64, u32, u64, i64)] = &[
            (1, 1, 0, 0, 1),
            (1, 0, 0, 0, 0),
            // no fraction left over, entropy is irrelevant
            (2, 1, 1, 0, 1),
            (2, 1, 1, 1, 1),
            // half of one depends on the low bit
            (1, 1, 1, 0, 1),
            (1, 1, 1, 1, 0),
            // half of one with two bits of precision
            (1, 2, 2, 0, 1),
            (1, 2, 2, 1, 1),
            (1, 2, 2, 2, 0),
            (1, 2, 2, 3, 0),
        ];
        for &(num, factor, bits, entropy, want) in cases {
            assert_eq!(
                mul_frac(num, factor, bits, entropy),
                want,
                "mul_frac({num}, {factor}, {bits}, {entropy})"
            );
        }
    }

    #[test]
    fn test_mul_frac_sign_symmetric() {
        for entropy in 0..8 {
            assert_eq!(mul_frac(-5, 3, 2, entropy), -mul_frac(5, 3, 2, entropy));
            assert_eq!(mul_frac(5, -3, 2, entropy), -mul_frac(5, 3, 2, entropy));
            assert_eq!(mul_frac(-5, -3, 2, entropy), mul_frac(5, 3, 2, entropy));
        }
    }

    #[test]
    fn test_mul_frac_unbiased_over_entropy() {
        // 7/8 of 1 over every 3-bit entropy value totals exactly 7
        let total: i64 = (0..8).map(|e| mul_frac(1, 7, 3, e)).sum();
        assert_eq!(total, 7);
    }

    #[test]
    fn test_clamp_and_mag() {
        assert_eq!(clamp(5, -1, 1), 1);
        assert_eq!(clamp(-5, -1, 1), -1);
        assert_eq!(clamp(0, -1, 1), 0);
        assert_eq!(clamp(3, 2, 1), 2);
        assert_eq!(mag(-4), 4);
        assert_eq!(mag(i64::MIN), i64::MAX);
    }
}
