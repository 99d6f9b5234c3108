//! Double-double floating point: an unevaluated sum `hi + lo` of two `f64`
//! values with `|lo| <= ulp(hi) / 2`, giving roughly 106 bits of significand.
//!
//! Only the operations the spigot needs are provided. Error-free transforms
//! follow Dekker and Knuth; the products use fused multiply-add.

use std::ops::{Add, AddAssign, Neg, Sub};

/// Extended-precision real number.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct ExtFloat {
    hi: f64,
    lo: f64,
}

/// `a + b` as a rounded sum and its exact error.
#[inline]
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let bb = s - a;
    let err = (a - (s - bb)) + (b - bb);
    (s, err)
}

/// Like [`two_sum`], valid only when `|a| >= |b|`.
#[inline]
fn quick_two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let err = b - (s - a);
    (s, err)
}

/// `a * b` as a rounded product and its exact error.
#[inline]
fn two_prod(a: f64, b: f64) -> (f64, f64) {
    let p = a * b;
    let err = a.mul_add(b, -p);
    (p, err)
}

/// Exact `2^e` as an `f64`, saturating to zero or infinity outside the
/// representable range.
pub fn pow2(e: i64) -> f64 {
    if e > 1023 {
        f64::INFINITY
    } else if e >= -1022 {
        f64::from_bits(((e + 1023) as u64) << 52)
    } else if e >= -1074 {
        // Subnormal: a single mantissa bit.
        f64::from_bits(1u64 << (e + 1074))
    } else {
        0.0
    }
}

impl ExtFloat {
    pub const ZERO: ExtFloat = ExtFloat { hi: 0.0, lo: 0.0 };
    pub const ONE: ExtFloat = ExtFloat { hi: 1.0, lo: 0.0 };

    #[inline]
    pub const fn from_f64(x: f64) -> Self {
        Self { hi: x, lo: 0.0 }
    }

    /// Exact conversion: every `u64` fits in 106 bits.
    #[inline]
    pub fn from_u64(x: u64) -> Self {
        let hi = x as f64;
        let lo = (x as i128 - hi as i128) as f64;
        Self { hi, lo }
    }

    /// `num / den` correctly to about 2^-104 relative error.
    pub fn from_ratio(num: u64, den: u64) -> Self {
        Self::from_u64(num).div(Self::from_u64(den))
    }

    #[inline]
    pub fn hi(self) -> f64 {
        self.hi
    }

    #[inline]
    pub fn lo(self) -> f64 {
        self.lo
    }

    /// Nearest `f64`.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.hi + self.lo
    }

    /// Multiply by a single `f64`.
    #[inline]
    pub fn mul_f64(self, b: f64) -> Self {
        let (p, e) = two_prod(self.hi, b);
        let (hi, lo) = quick_two_sum(p, e + self.lo * b);
        Self { hi, lo }
    }

    /// Multiply by `2^e`. Exact unless the result leaves the normal range.
    #[inline]
    pub fn mul_pow2(self, e: i64) -> Self {
        let scale = pow2(e);
        Self {
            hi: self.hi * scale,
            lo: self.lo * scale,
        }
    }

    pub fn floor(self) -> Self {
        let hi = self.hi.floor();
        if hi == self.hi {
            // hi is already integral, the fractional part lives in lo.
            let (hi, lo) = quick_two_sum(hi, self.lo.floor());
            Self { hi, lo }
        } else {
            Self { hi, lo: 0.0 }
        }
    }

    /// Reduce mod 1 into `[0, 1)`. Negative values wrap upward.
    pub fn fract(self) -> Self {
        let mut r = self - self.floor();
        if r < Self::ZERO {
            r += Self::ONE;
        } else if r >= Self::ONE {
            r = r - Self::ONE;
        }
        r
    }

    fn div(self, rhs: Self) -> Self {
        let q1 = self.hi / rhs.hi;
        let r = self - rhs.mul_f64(q1);
        let q2 = r.hi / rhs.hi;
        let r = r - rhs.mul_f64(q2);
        let q3 = r.hi / rhs.hi;
        let (hi, lo) = quick_two_sum(q1, q2);
        Self { hi, lo } + Self::from_f64(q3)
    }
}

impl Add for ExtFloat {
    type Output = ExtFloat;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        let (s, e) = two_sum(self.hi, rhs.hi);
        let (t, f) = two_sum(self.lo, rhs.lo);
        let (s, e) = quick_two_sum(s, e + t);
        let (hi, lo) = quick_two_sum(s, e + f);
        Self { hi, lo }
    }
}

impl AddAssign for ExtFloat {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Neg for ExtFloat {
    type Output = ExtFloat;

    #[inline]
    fn neg(self) -> Self {
        Self {
            hi: -self.hi,
            lo: -self.lo,
        }
    }
}

impl Sub for ExtFloat {
    type Output = ExtFloat;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}
