//! Left and right partial sums of a single series term.
//!
//! Every term of both formulas has the shape
//!
//! ```text
//!   Σ_k  c · (±1)^k · R^(s·n + l − d·k) / (m·k + j)
//! ```
//!
//! where `n` is the digit offset. For `k` below the term's bound the power of
//! `R` is a non-negative integer, so only its residue mod `m·k + j` matters
//! for the fractional part; that is the exact left sum. From the bound on the
//! exponent drops below `d` and keeps falling, so the quotients shrink
//! geometrically; that is the convergent tail.

use crate::extended::ExtFloat;
use crate::modpow::Barrett;
use hexpi_core::TailLimits;
use num_integer::Integer;

/// One term `c · (±1)^k · R^(s·n + l − d·k) / (m·k + j)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    /// `c`, always a signed power of two so scaling by it is exact.
    pub coefficient: f64,
    /// Whether the sign flips with every `k`.
    pub alternating: bool,
    /// `m`
    pub stride: u64,
    /// `j`
    pub rest: u64,
    /// `log2(R)`: 4 for base 16, 1 for base 2.
    pub radix_log2: u32,
    /// `s`
    pub offset_scale: u64,
    /// `l`
    pub shift: i64,
    /// `d`
    pub decay: u64,
}

impl Term {
    /// `s·n + l`.
    #[inline]
    fn lead(&self, offset: u64) -> i128 {
        self.offset_scale as i128 * offset as i128 + self.shift as i128
    }

    /// Exponent of `R` for index `k`.
    #[inline]
    pub fn exponent(&self, offset: u64, k: u64) -> i128 {
        self.lead(offset) - self.decay as i128 * k as i128
    }

    /// First index of the tail, `⌊(s·n + l) / d⌋`, never below zero.
    pub fn bound(&self, offset: u64) -> u64 {
        let bound = Integer::div_floor(&self.lead(offset), &(self.decay as i128)).max(0);
        u64::try_from(bound).unwrap_or(u64::MAX)
    }

    /// `m·k + j`, or `None` once it no longer fits in 64 bits.
    #[inline]
    pub fn denominator(&self, k: u64) -> Option<u64> {
        self.stride.checked_mul(k)?.checked_add(self.rest)
    }

    /// `c · (±1)^k`.
    #[inline]
    pub fn signed_coefficient(&self, k: u64) -> f64 {
        if self.alternating && k.is_odd() {
            -self.coefficient
        } else {
            self.coefficient
        }
    }
}

/// Tail of one term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TailSum {
    /// Sum of the evaluated terms, reduced into `[0, 1)`.
    pub value: ExtFloat,
    /// Number of terms added.
    pub terms: u64,
    /// `false` when the hard cap stopped the loop before epsilon did.
    pub converged: bool,
}

/// Exact part of `term` for `k` in `[start, start + batch)` clamped to
/// `bound`, reduced into `[0, 1)` after every index.
pub fn left_sum(term: &Term, offset: u64, bound: u64, start: u64, batch: u64) -> ExtFloat {
    let end = start.saturating_add(batch).min(bound);
    let radix = 1u64 << term.radix_log2;
    let mut sum = ExtFloat::ZERO;

    for k in start..end {
        // k < bound keeps both of these in range.
        let Some(denominator) = term.denominator(k) else {
            break;
        };
        let exponent = term.exponent(offset, k) as u64;

        let residue = Barrett::new(denominator).pow(radix, exponent);
        sum += ExtFloat::from_ratio(residue, denominator).mul_f64(term.signed_coefficient(k));
        sum = sum.fract();
    }

    sum
}

/// Tail of `term` from `bound` on, evaluated in floating point.
///
/// Stops at the first quotient `R^e / (m·k + j)` whose magnitude is below
/// `limits.epsilon`, or after index `bound + limits.max_extra_terms`.
pub fn right_sum(term: &Term, offset: u64, bound: u64, limits: &TailLimits) -> TailSum {
    let last = bound.saturating_add(limits.max_extra_terms);
    let mut value = ExtFloat::ZERO;
    let mut terms = 0;

    for k in bound..=last {
        let Some(denominator) = term.denominator(k) else {
            break;
        };
        let bits = term.exponent(offset, k) * term.radix_log2 as i128;
        let bits = i64::try_from(bits).unwrap_or(i64::MIN);
        let magnitude = ExtFloat::from_ratio(1, denominator).mul_pow2(bits);

        if magnitude.hi() < limits.epsilon {
            return TailSum {
                value: value.fract(),
                terms,
                converged: true,
            };
        }

        value += magnitude.mul_f64(term.signed_coefficient(k));
        terms += 1;
    }

    TailSum {
        value: value.fract(),
        terms,
        converged: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `+4 · 16^(n−k) / (8k + 1)`
    const FOUR_OVER_8K1: Term = Term {
        coefficient: 4.0,
        alternating: false,
        stride: 8,
        rest: 1,
        radix_log2: 4,
        offset_scale: 1,
        shift: 0,
        decay: 1,
    };

    /// `−(−1)^k · 2^(4n − 1 − 10k) / (4k + 1)`
    const BELLARD_4K1: Term = Term {
        coefficient: -1.0,
        alternating: true,
        stride: 4,
        rest: 1,
        radix_log2: 1,
        offset_scale: 4,
        shift: -1,
        decay: 10,
    };

    fn circular_distance(a: ExtFloat, b: ExtFloat) -> f64 {
        let d = (a - b).fract().to_f64();
        d.min(1.0 - d)
    }

    #[test]
    fn test_bounds() {
        assert_eq!(FOUR_OVER_8K1.bound(0), 0);
        assert_eq!(FOUR_OVER_8K1.bound(1234), 1234);
        // ⌊(4·0 − 1) / 10⌋ = −1 clamps to 0
        assert_eq!(BELLARD_4K1.bound(0), 0);
        assert_eq!(BELLARD_4K1.bound(5), 1);
        assert_eq!(BELLARD_4K1.bound(1000), 399);
        assert_eq!(
            BELLARD_4K1.bound(hexpi_core::MAX_OFFSET),
            ((4 * hexpi_core::MAX_OFFSET) - 1) / 10
        );
    }

    #[test]
    fn test_exponent_at_bound_is_below_decay() {
        for offset in [1u64, 5, 17, 1000, 123_457] {
            let bound = BELLARD_4K1.bound(offset);
            let e = BELLARD_4K1.exponent(offset, bound);
            assert!((0..10).contains(&e), "offset {offset}: exponent {e}");
            if bound > 0 {
                assert!(BELLARD_4K1.exponent(offset, bound - 1) >= 10);
            }
        }
    }

    #[test]
    fn test_signed_coefficient() {
        assert_eq!(BELLARD_4K1.signed_coefficient(0), -1.0);
        assert_eq!(BELLARD_4K1.signed_coefficient(1), 1.0);
        assert_eq!(FOUR_OVER_8K1.signed_coefficient(7), 4.0);
    }

    #[test]
    fn test_left_sum_matches_direct_evaluation() {
        let offset = 12;
        let mut expected = 0.0f64;
        for k in 0..offset {
            let m = 8 * k + 1;
            let r = crate::modpow::mod_pow(16, offset - k, m);
            expected = (expected + 4.0 * r as f64 / m as f64).rem_euclid(1.0);
        }
        let got = left_sum(&FOUR_OVER_8K1, offset, offset, 0, 100).to_f64();
        assert!((got - expected).abs() < 1e-12, "{got} vs {expected}");
    }

    #[test]
    fn test_left_sum_splits_across_batches() {
        let offset = 1000;
        let bound = BELLARD_4K1.bound(offset);
        let whole = left_sum(&BELLARD_4K1, offset, bound, 0, bound);
        let mut pieces = ExtFloat::ZERO;
        let mut start = 0;
        while start < bound {
            pieces = (pieces + left_sum(&BELLARD_4K1, offset, bound, start, 37)).fract();
            start += 37;
        }
        assert!(circular_distance(whole, pieces) < 1e-25);
    }

    #[test]
    fn test_left_sum_past_bound_is_zero() {
        assert_eq!(left_sum(&FOUR_OVER_8K1, 10, 10, 10, 100), ExtFloat::ZERO);
        assert_eq!(left_sum(&FOUR_OVER_8K1, 0, 0, 0, 1), ExtFloat::ZERO);
    }

    #[test]
    fn test_right_sum_converges() {
        let limits = TailLimits::default();
        let tail = right_sum(&FOUR_OVER_8K1, 1000, 1000, &limits);
        assert!(tail.converged);
        // 16^-k falls below 1e-17 within 15 terms.
        assert!(tail.terms > 0 && tail.terms <= 15, "terms = {}", tail.terms);

        let tail = right_sum(&BELLARD_4K1, 1000, BELLARD_4K1.bound(1000), &limits);
        assert!(tail.converged);
        assert!(tail.terms <= 7, "terms = {}", tail.terms);
    }

    #[test]
    fn test_right_sum_hits_cap() {
        let limits = TailLimits {
            epsilon: 1e-300,
            max_extra_terms: 2,
        };
        let tail = right_sum(&FOUR_OVER_8K1, 50, 50, &limits);
        assert!(!tail.converged);
        assert_eq!(tail.terms, 3);
        assert!(tail.value >= ExtFloat::ZERO && tail.value < ExtFloat::ONE);
    }

    #[test]
    fn test_whole_term_at_offset_zero() {
        // Σ 4 / ((8k + 1) 16^k) has no left part at offset zero.
        let tail = right_sum(&FOUR_OVER_8K1, 0, 0, &TailLimits::default());
        let mut expected = 0.0f64;
        for k in 0..20 {
            expected += 4.0 / ((8 * k + 1) as f64 * 16f64.powi(k as i32));
        }
        assert!((tail.value.to_f64() - expected.fract()).abs() < 1e-14);
    }
}
