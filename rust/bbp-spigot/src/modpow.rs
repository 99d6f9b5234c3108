//! Exact modular exponentiation for 64-bit moduli using Barrett reduction.
//!
//! Products of two residues are formed in `u128` and reduced by multiplying
//! with a precomputed reciprocal of the modulus instead of dividing. Moduli
//! below 2^32 keep products under 2^64 and use the 64-bit reciprocal
//! `⌊(2^64-1)/m⌋`; larger moduli use the 128-bit reciprocal `⌊(2^128-1)/m⌋`.
//! In both cases the estimated quotient undershoots by at most a few units,
//! which a short correction loop removes.

/// Precomputed reciprocal of the modulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reciprocal {
    /// `⌊(2^64-1)/m⌋`, valid while `m < 2^32`.
    Narrow(u64),
    /// `⌊(2^128-1)/m⌋`.
    Wide(u128),
}

/// Barrett reducer for a fixed modulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Barrett {
    modulus: u64,
    reciprocal: Reciprocal,
}

impl Barrett {
    /// Precompute the reciprocal for `modulus`.
    ///
    /// # Panics
    /// If `modulus` is zero.
    pub fn new(modulus: u64) -> Self {
        assert!(modulus > 0, "Barrett modulus must be non-zero");
        let reciprocal = if modulus <= u32::MAX as u64 {
            Reciprocal::Narrow(u64::MAX / modulus)
        } else {
            Reciprocal::Wide(u128::MAX / modulus as u128)
        };
        Self {
            modulus,
            reciprocal,
        }
    }

    /// Whether the 64-bit reciprocal path is in use.
    pub fn is_narrow(&self) -> bool {
        matches!(self.reciprocal, Reciprocal::Narrow(_))
    }

    /// `x mod m` for any `x < m^2`.
    #[inline]
    pub fn reduce(&self, x: u128) -> u64 {
        let m = self.modulus as u128;
        let q = match self.reciprocal {
            Reciprocal::Narrow(factor) => {
                // x < m^2 < 2^64 here, so the product fits in u128.
                (x * factor as u128) >> 64
            }
            Reciprocal::Wide(factor) => mul_high(x, factor),
        };
        // q never exceeds the true quotient, so this cannot underflow.
        let mut r = x - q * m;
        while r >= m {
            r -= m;
        }
        r as u64
    }

    /// `a * b mod m` for residues `a, b < m`.
    #[inline]
    pub fn mul(&self, a: u64, b: u64) -> u64 {
        self.reduce(a as u128 * b as u128)
    }

    /// `base^exp mod m` by right-to-left binary exponentiation.
    pub fn pow(&self, base: u64, mut exp: u64) -> u64 {
        let mut result = 1 % self.modulus;
        let mut base = base % self.modulus;
        while exp > 0 {
            if exp & 1 == 1 {
                result = self.mul(result, base);
            }
            base = self.mul(base, base);
            exp >>= 1;
        }
        result
    }
}

/// Modular exponentiation: `base^exp mod modulus`.
///
/// # Panics
/// If `modulus` is zero.
pub fn mod_pow(base: u64, exp: u64, modulus: u64) -> u64 {
    Barrett::new(modulus).pow(base, exp)
}

/// High 128 bits of the 256-bit product `a * b`.
#[inline]
fn mul_high(a: u128, b: u128) -> u128 {
    const LOW: u128 = u64::MAX as u128;
    let (a_hi, a_lo) = (a >> 64, a & LOW);
    let (b_hi, b_lo) = (b >> 64, b & LOW);

    let lo_lo = a_lo * b_lo;
    let lo_hi = a_lo * b_hi;
    let hi_lo = a_hi * b_lo;
    let hi_hi = a_hi * b_hi;

    let carry = (lo_lo >> 64) + (lo_hi & LOW) + (hi_lo & LOW);
    hi_hi + (lo_hi >> 64) + (hi_lo >> 64) + (carry >> 64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;
    use num_traits::ToPrimitive;
    use proptest::prelude::*;

    fn reference_pow(base: u64, exp: u64, modulus: u64) -> u64 {
        BigUint::from(base)
            .modpow(&BigUint::from(exp), &BigUint::from(modulus))
            .to_u64()
            .unwrap()
    }

    fn reference_mul(a: u64, b: u64, modulus: u64) -> u64 {
        ((a as u128 * b as u128) % modulus as u128) as u64
    }

    #[test]
    fn test_small_known_values() {
        assert_eq!(mod_pow(2, 10, 1000), 24);
        assert_eq!(mod_pow(16, 3, 9), 1); // 4096 = 455 * 9 + 1
        assert_eq!(mod_pow(3, 0, 7), 1);
        assert_eq!(mod_pow(0, 5, 7), 0);
        assert_eq!(mod_pow(10, 1, 7), 3);
    }

    #[test]
    fn test_modulus_one() {
        // Everything is congruent to zero mod 1, including x^0.
        assert_eq!(mod_pow(16, 0, 1), 0);
        assert_eq!(mod_pow(16, 12345, 1), 0);
        assert_eq!(Barrett::new(1).mul(0, 0), 0);
    }

    #[test]
    fn test_path_selection() {
        assert!(Barrett::new(8 * 1_000_000 + 1).is_narrow());
        assert!(Barrett::new(u32::MAX as u64).is_narrow());
        assert!(!Barrett::new(u32::MAX as u64 + 1).is_narrow());
        assert!(!Barrett::new(u64::MAX).is_narrow());
    }

    #[test]
    fn test_extreme_moduli() {
        for &m in &[u64::MAX, u64::MAX - 58, (1u64 << 63) + 1, 1u64 << 63, 1u64 << 32] {
            let barrett = Barrett::new(m);
            let a = m - 1;
            assert_eq!(barrett.mul(a, a), reference_mul(a, a, m), "m = {m}");
            assert_eq!(barrett.pow(a, 1 << 40), reference_pow(a, 1 << 40, m), "m = {m}");
        }
    }

    #[test]
    fn test_fermat_little_theorem() {
        // 2^61 - 1 is a Mersenne prime.
        let p = (1u64 << 61) - 1;
        for base in [2u64, 3, 16, 123_456_789] {
            assert_eq!(mod_pow(base, p - 1, p), 1);
        }
    }

    #[test]
    fn test_mul_high_matches_wide_product() {
        let a = u128::MAX;
        let b = u128::MAX;
        // (2^128 - 1)^2 = 2^256 - 2^129 + 1, high half is 2^128 - 2.
        assert_eq!(mul_high(a, b), u128::MAX - 1);
        assert_eq!(mul_high(1 << 64, 1 << 64), 1);
        assert_eq!(mul_high(12345, 67890), 0);
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn test_zero_modulus_panics() {
        Barrett::new(0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]

        #[test]
        fn proptest_mul_matches_reference(
            m in 1u64..=(1u64 << 63),
            a_seed in any::<u64>(),
            b_seed in any::<u64>(),
        ) {
            let (a, b) = (a_seed % m, b_seed % m);
            prop_assert_eq!(Barrett::new(m).mul(a, b), reference_mul(a, b, m));
        }

        #[test]
        fn proptest_narrow_mul_matches_reference(
            m in 1u64..=(u32::MAX as u64),
            a_seed in any::<u64>(),
            b_seed in any::<u64>(),
        ) {
            let (a, b) = (a_seed % m, b_seed % m);
            prop_assert_eq!(Barrett::new(m).mul(a, b), reference_mul(a, b, m));
        }

        #[test]
        fn proptest_pow_matches_bigint(
            m in 2u64..=(1u64 << 63),
            base in any::<u64>(),
            exp in 0u64..=(1u64 << 40),
        ) {
            prop_assert_eq!(mod_pow(base, exp, m), reference_pow(base, exp, m));
        }

        #[test]
        fn proptest_series_shaped_moduli(k in 1u64..50_000_000, j in 1u64..=9, exp in 1u64..=(1u64 << 40)) {
            // The moduli the spigot actually uses: 8k + j and 10k + j.
            let m = 8 * k + j;
            prop_assert_eq!(mod_pow(16, exp, m), reference_pow(16, exp, m));
            let m = 10 * k + j;
            prop_assert_eq!(mod_pow(2, exp, m), reference_pow(2, exp, m));
        }
    }
}
