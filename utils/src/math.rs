//! Integer fixed-point helpers.

/// `a * b / denominator`, truncated toward zero.
///
/// Exact even when `a * b` does not fit in `u128`: the product is then split
/// as `(a / d) * b + (a % d) * b / d`. Returns `None` on a zero denominator
/// or when the split terms themselves overflow.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    if let Some(product) = a.checked_mul(b) {
        return Some(product / denominator);
    }
    let whole = (a / denominator).checked_mul(b)?;
    let part = (a % denominator).checked_mul(b)? / denominator;
    whole.checked_add(part)
}

/// `floor(amount * bps / 10_000)` without overflow for any `amount`.
///
/// Splits `amount` into whole and remainder parts of the denominator so the
/// product never exceeds `amount`. `bps` above 10_000 is clamped.
pub fn apply_bps(amount: u128, bps: u32) -> u128 {
    const DENOMINATOR: u128 = 10_000;
    let bps = (bps as u128).min(DENOMINATOR);
    (amount / DENOMINATOR) * bps + (amount % DENOMINATOR) * bps / DENOMINATOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_bps_matches_naive_formula() {
        for amount in [0u128, 1, 99, 100, 999, 1_000, 10_001, 123_456_789] {
            assert_eq!(apply_bps(amount, 100), amount * 100 / 10_000);
            assert_eq!(apply_bps(amount, 2_500), amount * 2_500 / 10_000);
        }
    }

    #[test]
    fn apply_bps_does_not_overflow() {
        assert_eq!(apply_bps(u128::MAX, 10_000), u128::MAX);
        assert_eq!(apply_bps(u128::MAX, 0), 0);
        assert!(apply_bps(u128::MAX, 100) < u128::MAX / 99);
    }

    #[test]
    fn truncates_toward_zero() {
        assert_eq!(mul_div(999, 100, 10_000), Some(9));
        assert_eq!(mul_div(1_000, 100, 10_000), Some(10));
        assert_eq!(mul_div(99, 100, 10_000), Some(0));
    }

    #[test]
    fn zero_denominator_is_none() {
        assert_eq!(mul_div(1, 1, 0), None);
    }

    #[test]
    fn wide_product_is_exact() {
        assert_eq!(mul_div(u128::MAX, 2, 2), Some(u128::MAX));
        assert_eq!(mul_div(u128::MAX, 3, 4), Some(u128::MAX / 4 * 3 + 2));
        assert_eq!(mul_div(1u128 << 100, 1u128 << 60, 1u128 << 64), Some(1u128 << 96));
    }

    #[test]
    fn overflow_is_none() {
        assert_eq!(mul_div(u128::MAX, 2, 1), None);
        assert_eq!(mul_div(u128::MAX, 1, 1), Some(u128::MAX));
    }
}
