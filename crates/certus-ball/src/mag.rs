//! Non-negative magnitude bounds.
//!
//! A [`Mag`] is an upper bound for a non-negative real number, stored as a
//! 30-bit mantissa and a binary exponent. Every operation rounds *up* unless
//! its name ends in `_lower`, in which case it rounds down and the result is
//! a lower bound. This is the type used for ball radii, error terms and
//! tolerances: monotone operations on upper bounds stay upper bounds.

use std::cmp::Ordering;
use std::fmt;

/// Number of mantissa bits in a [`Mag`].
pub const MAG_BITS: u32 = 30;

const MAN_HALF: u64 = 1 << (MAG_BITS - 1);
const MAN_LIMIT: u64 = 1 << MAG_BITS;

/// Largest exponent of a finite [`Mag`]; larger upper bounds become +∞.
pub const MAG_MAX_EXP: i64 = 1 << 60;
/// Smallest exponent of a nonzero [`Mag`].
pub const MAG_MIN_EXP: i64 = -(1 << 60);

const INF_EXP: i64 = i64::MAX;

/// An upper bound `man · 2^(exp − 30)` for a non-negative real, or +∞.
///
/// Nonzero finite values have `man ∈ [2^29, 2^30)`, so the value lies in
/// `[2^(exp−1), 2^exp)`. Zero is `man = 0, exp = 0`; infinity is
/// `man = 0, exp = i64::MAX`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Mag {
    man: u64,
    exp: i64,
}

impl Mag {
    /// Zero.
    pub const ZERO: Self = Self { man: 0, exp: 0 };

    /// One (exact).
    pub const ONE: Self = Self {
        man: MAN_HALF,
        exp: 1,
    };

    /// Positive infinity.
    pub const INF: Self = Self {
        man: 0,
        exp: INF_EXP,
    };

    /// Returns zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self::ZERO
    }

    /// Returns +∞.
    #[must_use]
    pub const fn inf() -> Self {
        Self::INF
    }

    /// Returns true if this is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.man == 0 && self.exp == 0
    }

    /// Returns true if this is +∞.
    #[must_use]
    pub const fn is_inf(&self) -> bool {
        self.man == 0 && self.exp == INF_EXP
    }

    /// Returns true if this is finite.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        !self.is_inf()
    }

    /// Returns true if this is zero or +∞.
    #[must_use]
    pub const fn is_special(&self) -> bool {
        self.man == 0
    }

    /// Exactly `2^e`.
    #[must_use]
    pub fn pow2(e: i64) -> Self {
        Self::finite_up(MAN_HALF, e.saturating_add(1))
    }

    /// The exponent `E` such that the value lies in `[2^(E−1), 2^E)`.
    ///
    /// Returns `None` for zero and infinity.
    #[must_use]
    pub fn exponent(&self) -> Option<i64> {
        if self.is_special() {
            None
        } else {
            Some(self.exp)
        }
    }

    /// Exact decomposition `value = man · 2^exp` of a finite nonzero bound.
    #[must_use]
    pub fn to_parts(&self) -> Option<(u64, i64)> {
        if self.is_special() {
            None
        } else {
            Some((self.man, self.exp - i64::from(MAG_BITS)))
        }
    }

    fn finite_up(man: u64, exp: i64) -> Self {
        if exp > MAG_MAX_EXP {
            Self::INF
        } else if exp < MAG_MIN_EXP {
            Self {
                man: MAN_HALF,
                exp: MAG_MIN_EXP,
            }
        } else {
            Self { man, exp }
        }
    }

    fn finite_down(man: u64, exp: i64) -> Self {
        if exp > MAG_MAX_EXP {
            Self {
                man: MAN_LIMIT - 1,
                exp: MAG_MAX_EXP,
            }
        } else if exp < MAG_MIN_EXP {
            Self::ZERO
        } else {
            Self { man, exp }
        }
    }

    /// Upper bound for `m · 2^e`.
    #[must_use]
    pub fn from_parts_up(m: u128, e: i64) -> Self {
        if m == 0 {
            return Self::ZERO;
        }
        let bits = i64::from(128 - m.leading_zeros());
        let shift = bits - i64::from(MAG_BITS);
        let (man, shift) = if shift > 0 {
            let mut q = (m >> shift) as u64;
            if m & ((1u128 << shift) - 1) != 0 {
                q += 1;
            }
            if q == MAN_LIMIT {
                (q >> 1, shift + 1)
            } else {
                (q, shift)
            }
        } else {
            ((m << (-shift)) as u64, shift)
        };
        Self::finite_up(man, e.saturating_add(shift + i64::from(MAG_BITS)))
    }

    /// Lower bound for `m · 2^e`.
    #[must_use]
    pub fn from_parts_lower(m: u128, e: i64) -> Self {
        if m == 0 {
            return Self::ZERO;
        }
        let bits = i64::from(128 - m.leading_zeros());
        let shift = bits - i64::from(MAG_BITS);
        let man = if shift > 0 {
            (m >> shift) as u64
        } else {
            (m << (-shift)) as u64
        };
        Self::finite_down(man, e.saturating_add(shift + i64::from(MAG_BITS)))
    }

    /// Upper bound for an unsigned integer.
    #[must_use]
    pub fn from_u64(x: u64) -> Self {
        Self::from_parts_up(u128::from(x), 0)
    }

    /// Lower bound for an unsigned integer.
    #[must_use]
    pub fn from_u64_lower(x: u64) -> Self {
        Self::from_parts_lower(u128::from(x), 0)
    }

    /// Upper bound for `|d|`. NaN maps to +∞.
    #[must_use]
    pub fn from_f64(d: f64) -> Self {
        match decompose_f64(d) {
            F64Parts::Nan | F64Parts::Inf => Self::INF,
            F64Parts::Finite(m, e) => Self::from_parts_up(u128::from(m), e),
        }
    }

    /// Lower bound for `|d|`. NaN maps to zero.
    #[must_use]
    pub fn from_f64_lower(d: f64) -> Self {
        match decompose_f64(d) {
            F64Parts::Nan => Self::ZERO,
            F64Parts::Inf => Self::INF,
            F64Parts::Finite(m, e) => Self::from_parts_lower(u128::from(m), e),
        }
    }

    /// Upper bound for `|d| · 2^e`.
    #[must_use]
    pub fn from_f64_2exp(d: f64, e: i64) -> Self {
        Self::from_f64(d).mul_2exp(e)
    }

    /// Exact multiplication by `2^e`.
    #[must_use]
    pub fn mul_2exp(&self, e: i64) -> Self {
        if self.is_special() {
            *self
        } else {
            Self::finite_up(self.man, self.exp.saturating_add(e))
        }
    }

    /// Upper bound for `self + other`.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        if self.is_inf() || other.is_inf() {
            return Self::INF;
        }
        if self.is_zero() {
            return *other;
        }
        if other.is_zero() {
            return *self;
        }
        let (hi, lo) = if self.exp >= other.exp {
            (self, other)
        } else {
            (other, self)
        };
        let shift = hi.exp - lo.exp;
        if shift <= 90 {
            let m = (u128::from(hi.man) << shift) + u128::from(lo.man);
            Self::from_parts_up(m, lo.exp - i64::from(MAG_BITS))
        } else {
            let m = (u128::from(hi.man) << 2) + 1;
            Self::from_parts_up(m, hi.exp - i64::from(MAG_BITS) - 2)
        }
    }

    /// Lower bound for `self + other`.
    #[must_use]
    pub fn add_lower(&self, other: &Self) -> Self {
        if self.is_inf() || other.is_inf() {
            return Self::INF;
        }
        if self.is_zero() {
            return *other;
        }
        if other.is_zero() {
            return *self;
        }
        let (hi, lo) = if self.exp >= other.exp {
            (self, other)
        } else {
            (other, self)
        };
        let shift = hi.exp - lo.exp;
        if shift <= 90 {
            let m = (u128::from(hi.man) << shift) + u128::from(lo.man);
            Self::from_parts_lower(m, lo.exp - i64::from(MAG_BITS))
        } else {
            *hi
        }
    }

    /// Upper bound for `max(self − other, 0)`.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        if self.is_inf() {
            return Self::INF;
        }
        if other.is_zero() {
            return *self;
        }
        if *self <= *other {
            return Self::ZERO;
        }
        let shift = self.exp - other.exp;
        if shift <= 90 {
            let m = (u128::from(self.man) << shift) - u128::from(other.man);
            Self::from_parts_up(m, other.exp - i64::from(MAG_BITS))
        } else {
            *self
        }
    }

    /// Lower bound for `max(self − other, 0)`.
    #[must_use]
    pub fn sub_lower(&self, other: &Self) -> Self {
        if other.is_zero() {
            return *self;
        }
        if other.is_inf() || *self <= *other {
            return Self::ZERO;
        }
        if self.is_inf() {
            return Self::INF;
        }
        let shift = self.exp - other.exp;
        if shift <= 90 {
            let m = (u128::from(self.man) << shift) - u128::from(other.man);
            Self::from_parts_lower(m, other.exp - i64::from(MAG_BITS))
        } else {
            let m = (u128::from(self.man) << 2) - 1;
            Self::from_parts_lower(m, self.exp - i64::from(MAG_BITS) - 2)
        }
    }

    /// Upper bound for `self · other`. Zero times infinity is infinity.
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        if self.is_inf() || other.is_inf() {
            return Self::INF;
        }
        if self.is_zero() || other.is_zero() {
            return Self::ZERO;
        }
        let m = u128::from(self.man) * u128::from(other.man);
        Self::from_parts_up(m, self.exp + other.exp - 2 * i64::from(MAG_BITS))
    }

    /// Lower bound for `self · other`.
    #[must_use]
    pub fn mul_lower(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            return Self::ZERO;
        }
        if self.is_inf() || other.is_inf() {
            return Self::INF;
        }
        let m = u128::from(self.man) * u128::from(other.man);
        Self::from_parts_lower(m, self.exp + other.exp - 2 * i64::from(MAG_BITS))
    }

    /// Upper bound for `self / other`; division by zero gives +∞.
    #[must_use]
    pub fn div(&self, other: &Self) -> Self {
        if self.is_zero() {
            return Self::ZERO;
        }
        if self.is_inf() || other.is_zero() {
            return Self::INF;
        }
        if other.is_inf() {
            return Self::ZERO;
        }
        let num = u128::from(self.man) << 64;
        let den = u128::from(other.man);
        let q = num.div_ceil(den);
        Self::from_parts_up(q, self.exp - other.exp - 64)
    }

    /// Lower bound for `self / other`.
    #[must_use]
    pub fn div_lower(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_inf() {
            return Self::ZERO;
        }
        if self.is_inf() || other.is_zero() {
            return Self::INF;
        }
        let num = u128::from(self.man) << 64;
        let q = num / u128::from(other.man);
        Self::from_parts_lower(q, self.exp - other.exp - 64)
    }

    fn sqrt_parts(&self) -> (u128, i64) {
        let mut m = u128::from(self.man) << 64;
        let mut e = self.exp - i64::from(MAG_BITS) - 64;
        if e.rem_euclid(2) == 1 {
            m <<= 1;
            e -= 1;
        }
        (m, e / 2)
    }

    /// Upper bound for `√self`.
    #[must_use]
    pub fn sqrt(&self) -> Self {
        if self.is_special() {
            return *self;
        }
        let (m, e) = self.sqrt_parts();
        let s = isqrt_u128(m);
        let s = if s * s == m { s } else { s + 1 };
        Self::from_parts_up(s, e)
    }

    /// Lower bound for `√self`.
    #[must_use]
    pub fn sqrt_lower(&self) -> Self {
        if self.is_special() {
            return *self;
        }
        let (m, e) = self.sqrt_parts();
        Self::from_parts_lower(isqrt_u128(m), e)
    }

    /// Upper bound for `self^n`.
    #[must_use]
    pub fn pow(&self, n: u64) -> Self {
        let mut result = Self::ONE;
        let mut base = *self;
        let mut n = n;
        while n > 0 {
            if n & 1 == 1 {
                result = result.mul(&base);
            }
            n >>= 1;
            if n > 0 {
                base = base.mul(&base);
            }
        }
        result
    }

    /// Lower bound for `self^n`.
    #[must_use]
    pub fn pow_lower(&self, n: u64) -> Self {
        let mut result = Self::ONE;
        let mut base = *self;
        let mut n = n;
        while n > 0 {
            if n & 1 == 1 {
                result = result.mul_lower(&base);
            }
            n >>= 1;
            if n > 0 {
                base = base.mul_lower(&base);
            }
        }
        result
    }

    /// Compares with `2^e`.
    #[must_use]
    pub fn cmp_2exp(&self, e: i64) -> Ordering {
        self.cmp(&Self::pow2(e))
    }

    /// Upper bound for `1 / (1 − self)`, or +∞ if `self ≥ 1`.
    #[must_use]
    pub fn geom_series(&self) -> Self {
        if *self >= Self::ONE {
            return Self::INF;
        }
        Self::ONE.div(&Self::ONE.sub_lower(self))
    }

    /// Upper bound for the exponential series tail `Σ_{k≥n} x^k / k!`.
    #[must_use]
    pub fn exp_tail(&self, n: u64) -> Self {
        if n == 0 {
            return Self::INF;
        }
        if self.is_zero() {
            return Self::ZERO;
        }
        // x^n / n! · 1 / (1 − x/(n+1)), valid when x < n + 1.
        let ratio = self.div(&Self::from_u64_lower(n + 1));
        if ratio >= Self::ONE {
            return Self::INF;
        }
        let mut factorial = Self::ONE;
        for k in 2..=n {
            factorial = factorial.mul_lower(&Self::from_u64_lower(k));
        }
        self.pow(n).div(&factorial).mul(&ratio.geom_series())
    }

    /// An upper bound for `self · 2^−e` as a double. Exact whenever the
    /// result is a normal double; subnormal results are bumped up one ulp.
    #[must_use]
    pub fn to_f64_fixed(&self, e: i64) -> f64 {
        if self.is_zero() {
            return 0.0;
        }
        if self.is_inf() {
            return f64::INFINITY;
        }
        let d = ldexp(self.man as f64, self.exp - i64::from(MAG_BITS) - e);
        if d < f64::MIN_POSITIVE {
            f64::from_bits(d.to_bits() + 1)
        } else {
            d
        }
    }

    /// An upper bound as a double (possibly +∞).
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.to_f64_fixed(0)
    }

    /// The larger of two bounds.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        std::cmp::max(self, other)
    }

    /// The smaller of two bounds.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        std::cmp::min(self, other)
    }
}

impl Ord for Mag {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_inf(), other.is_inf()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }
        match (self.is_zero(), other.is_zero()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .exp
                .cmp(&other.exp)
                .then_with(|| self.man.cmp(&other.man)),
        }
    }
}

impl PartialOrd for Mag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Mag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_inf() {
            write!(f, "Mag(inf)")
        } else {
            write!(f, "Mag({} * 2^{})", self.man, self.exp - i64::from(MAG_BITS))
        }
    }
}

impl fmt::Display for Mag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_inf() {
            write!(f, "inf")
        } else if let Some(digits) = f.precision() {
            write!(f, "{:.*e}", digits, self.to_f64())
        } else {
            write!(f, "{:e}", self.to_f64())
        }
    }
}

/// Floor of the square root.
fn isqrt_u128(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut x = (n as f64).sqrt() as u128;
    while x.checked_mul(x).map_or(true, |sq| sq > n) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).is_some_and(|sq| sq <= n) {
        x += 1;
    }
    x
}

/// `x · 2^k` without intermediate overflow or underflow for normal results.
#[must_use]
pub fn ldexp(x: f64, k: i64) -> f64 {
    let mut x = x;
    let mut k = k;
    while k > 1000 {
        x *= 2f64.powi(1000);
        k -= 1000;
        if x.is_infinite() {
            return x;
        }
    }
    while k < -1000 {
        x *= 2f64.powi(-1000);
        k += 1000;
        if x == 0.0 {
            return x;
        }
    }
    // |k| <= 1000 here, so the cast is lossless.
    x * 2f64.powi(k as i32)
}

pub(crate) enum F64Parts {
    Nan,
    Inf,
    /// `|d| = m · 2^e`
    Finite(u64, i64),
}

pub(crate) fn decompose_f64(d: f64) -> F64Parts {
    if d.is_nan() {
        return F64Parts::Nan;
    }
    if d.is_infinite() {
        return F64Parts::Inf;
    }
    let bits = d.to_bits();
    let exp_bits = ((bits >> 52) & 0x7ff) as i64;
    let frac = bits & ((1u64 << 52) - 1);
    if exp_bits == 0 {
        F64Parts::Finite(frac, -1074)
    } else {
        F64Parts::Finite(frac | (1u64 << 52), exp_bits - 1075)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow2_and_exponent() {
        let m = Mag::pow2(10);
        assert_eq!(m.to_f64(), 1024.0);
        assert_eq!(m.exponent(), Some(11));
        assert_eq!(Mag::ONE.to_f64(), 1.0);
        assert_eq!(Mag::ZERO.exponent(), None);
    }

    #[test]
    fn test_add_rounds_up() {
        let a = Mag::from_f64(1.0);
        let b = Mag::from_f64(1e-30);
        let s = a.add(&b);
        assert!(s.to_f64() > 1.0);
        assert!(a.add_lower(&b) == a);
        assert_eq!(Mag::from_f64(3.0).add(&Mag::from_f64(5.0)).to_f64(), 8.0);
    }

    #[test]
    fn test_mul_div_bounds() {
        let third_up = Mag::ONE.div(&Mag::from_u64(3));
        let third_lo = Mag::ONE.div_lower(&Mag::from_u64(3));
        assert!(third_lo < third_up);
        assert!(third_up.mul(&Mag::from_u64(3)) >= Mag::ONE);
        assert!(third_lo.mul_lower(&Mag::from_u64(3)) <= Mag::ONE);
        assert_eq!(Mag::from_u64(6).mul(&Mag::from_u64(7)).to_f64(), 42.0);
    }

    #[test]
    fn test_sub_lower() {
        let a = Mag::from_u64(10);
        let b = Mag::from_u64(3);
        assert_eq!(a.sub_lower(&b).to_f64(), 7.0);
        assert_eq!(b.sub_lower(&a), Mag::ZERO);
        assert_eq!(a.sub(&b).to_f64(), 7.0);
    }

    #[test]
    fn test_sqrt() {
        let four = Mag::from_u64(4);
        assert_eq!(four.sqrt().to_f64(), 2.0);
        assert_eq!(four.sqrt_lower().to_f64(), 2.0);
        let two = Mag::from_u64(2);
        assert!(two.sqrt().to_f64() >= std::f64::consts::SQRT_2);
        assert!(two.sqrt_lower().to_f64() <= std::f64::consts::SQRT_2);
    }

    #[test]
    fn test_special_values() {
        assert!(Mag::INF.add(&Mag::ONE).is_inf());
        assert!(Mag::ZERO.mul(&Mag::INF).is_inf());
        assert!(Mag::ONE.div(&Mag::ZERO).is_inf());
        assert!(Mag::ZERO < Mag::pow2(-1000));
        assert!(Mag::pow2(1000) < Mag::INF);
    }

    #[test]
    fn test_geom_series_and_exp_tail() {
        let half = Mag::pow2(-1);
        assert!(half.geom_series().to_f64() >= 2.0);
        assert!(Mag::ONE.geom_series().is_inf());
        // Σ_{k≥3} 1/k! = e − 2.5
        let tail = Mag::ONE.exp_tail(3);
        assert!(tail.to_f64() >= std::f64::consts::E - 2.5);
        assert!(tail.to_f64() < 0.3);
    }

    #[test]
    fn test_from_f64_brackets() {
        let x = 0.1f64;
        assert!(Mag::from_f64_lower(x) <= Mag::from_f64(x));
        assert!(Mag::from_f64(x).to_f64() >= x);
        assert!(Mag::from_f64(f64::NAN).is_inf());
    }

    #[test]
    fn test_to_f64_fixed() {
        let m = Mag::from_u64(96);
        assert_eq!(m.to_f64_fixed(5), 3.0);
        assert_eq!(ldexp(3.0, -1100 + 1100), 3.0);
    }

    #[test]
    fn test_to_f64_subnormal_rounds_up() {
        let full = (1u64 << MAG_BITS) - 1;
        let m = Mag::from_u64(full);
        let d = m.to_f64_fixed(1090);
        assert!(d < f64::MIN_POSITIVE);
        assert!(ldexp(d, 1090) >= full as f64);
        assert!(Mag::ONE.to_f64_fixed(3000) > 0.0);
        assert!(Mag::pow2(-1070).to_f64() >= ldexp(1.0, -1071));
    }
}
