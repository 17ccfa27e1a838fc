//! Arbitrary-precision binary floating-point numbers.
//!
//! An [`Arf`] is a dyadic number `±m · 2^e` with an odd `UBig` mantissa.
//! Exact operations (`*_exact`) never round; the rounded operations take a
//! precision in bits and a [`Round`] mode and report how the result was
//! rounded, so that callers can turn the rounding error into a radius.

use std::cmp::Ordering;
use std::fmt;

use dashu::base::{BitTest, UnsignedAbs};
use dashu::integer::{IBig, UBig};
use dashu::rational::RBig;

use crate::mag::{decompose_f64, ldexp, F64Parts, Mag};

/// Rounding direction for [`Arf`] operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Round {
    /// Toward zero.
    Down,
    /// Away from zero.
    Up,
    /// Toward −∞.
    Floor,
    /// Toward +∞.
    Ceil,
    /// To nearest, ties to even.
    Near,
}

/// Outcome of a rounded operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    /// The result is the exact value.
    Exact,
    /// The result differs from the exact value by less than `2^ulp_exp`.
    Inexact {
        /// Exponent of the last retained bit.
        ulp_exp: i64,
    },
}

impl Rounding {
    /// Returns true if no rounding occurred.
    #[must_use]
    pub fn is_exact(self) -> bool {
        matches!(self, Rounding::Exact)
    }

    /// Upper bound for the rounding error.
    #[must_use]
    pub fn error(self) -> Mag {
        match self {
            Rounding::Exact => Mag::ZERO,
            Rounding::Inexact { ulp_exp } => Mag::pow2(ulp_exp),
        }
    }
}

/// Exponents of an [`Arf`] saturate at `±ARF_MAX_EXP`. A value whose
/// exponent reached the bound has overflowed and is no longer finite.
pub const ARF_MAX_EXP: i64 = 1 << 61;

/// `a + b` saturated to `[−ARF_MAX_EXP, ARF_MAX_EXP]`.
fn exp_add(a: i64, b: i64) -> i64 {
    a.saturating_add(b).clamp(-ARF_MAX_EXP, ARF_MAX_EXP)
}

/// A dyadic floating-point number `(−1)^neg · man · 2^exp`.
///
/// Invariant: `man` is odd, or `man = 0` with `neg = false` and `exp = 0`.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Arf {
    neg: bool,
    man: UBig,
    exp: i64,
}

/// Low 64 bits of a value known to fit.
fn low_u64(x: &UBig) -> u64 {
    u64::try_from(x.clone()).unwrap_or(u64::MAX)
}

/// Floor of the square root of a big integer.
pub(crate) fn isqrt(n: &UBig) -> UBig {
    if n.is_zero() {
        return UBig::ZERO;
    }
    let mut x = UBig::ONE << n.bit_len().div_ceil(2);
    loop {
        let y = (&x + n / &x) >> 1;
        if y >= x {
            return x;
        }
        x = y;
    }
}

impl Arf {
    /// Zero.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// One.
    #[must_use]
    pub fn one() -> Self {
        Self {
            neg: false,
            man: UBig::ONE,
            exp: 0,
        }
    }

    fn from_parts(neg: bool, man: UBig, exp: i64) -> Self {
        match man.trailing_zeros() {
            None => Self::zero(),
            Some(tz) => Self {
                neg,
                man: man >> tz,
                exp: exp_add(exp, tz as i64),
            },
        }
    }

    /// `±man · 2^exp`.
    #[must_use]
    pub fn from_ubig_2exp(neg: bool, man: UBig, exp: i64) -> Self {
        Self::from_parts(neg, man, exp)
    }

    /// `m · 2^exp` for a signed integer `m`.
    #[must_use]
    pub fn from_ibig_2exp(m: &IBig, exp: i64) -> Self {
        let neg = *m < IBig::ZERO;
        Self::from_parts(neg, m.clone().unsigned_abs(), exp)
    }

    /// Exact conversion from an integer.
    #[must_use]
    pub fn from_i64(x: i64) -> Self {
        Self::from_parts(x < 0, UBig::from(x.unsigned_abs()), 0)
    }

    /// Exact conversion from an unsigned integer.
    #[must_use]
    pub fn from_u64(x: u64) -> Self {
        Self::from_parts(false, UBig::from(x), 0)
    }

    /// Exact conversion from a finite double.
    #[must_use]
    pub fn from_f64(d: f64) -> Option<Self> {
        match decompose_f64(d) {
            F64Parts::Finite(m, e) => Some(Self::from_parts(
                d.is_sign_negative(),
                UBig::from(m),
                e,
            )),
            F64Parts::Nan | F64Parts::Inf => None,
        }
    }

    /// Exact value of a finite magnitude bound.
    #[must_use]
    pub fn from_mag(m: &Mag) -> Option<Self> {
        if m.is_inf() {
            return None;
        }
        Some(match m.to_parts() {
            None => Self::zero(),
            Some((man, exp)) => Self::from_parts(false, UBig::from(man), exp),
        })
    }

    /// `2^e`.
    #[must_use]
    pub fn pow2(e: i64) -> Self {
        Self {
            neg: false,
            man: UBig::ONE,
            exp: e.clamp(-ARF_MAX_EXP, ARF_MAX_EXP),
        }
    }

    /// Returns true if this is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.man.is_zero()
    }

    /// Returns false if an exponent computation saturated at
    /// `±ARF_MAX_EXP`.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.is_zero() || (-ARF_MAX_EXP < self.exp && self.exp < ARF_MAX_EXP)
    }

    /// `neg · man · 2^exp` where `exp` saturates at the bound whenever an
    /// input already had.
    fn with_exp(neg: bool, man: UBig, exp: i64, saturated: bool) -> Self {
        let exp = if saturated {
            if exp >= 0 {
                ARF_MAX_EXP
            } else {
                -ARF_MAX_EXP
            }
        } else {
            exp
        };
        Self { neg, man, exp }
    }

    /// Returns true if this is strictly negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.neg
    }

    /// Returns true if this is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        !self.neg && !self.is_zero()
    }

    /// Sign relative to zero.
    #[must_use]
    pub fn sign(&self) -> Ordering {
        if self.is_zero() {
            Ordering::Equal
        } else if self.neg {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }

    /// The odd mantissa (zero for zero).
    #[must_use]
    pub fn mantissa(&self) -> &UBig {
        &self.man
    }

    /// Number of bits in the odd mantissa.
    #[must_use]
    pub fn bits(&self) -> u64 {
        self.man.bit_len() as u64
    }

    /// Top exponent `E` with `2^(E−1) ≤ |x| < 2^E`; zero for zero.
    #[must_use]
    pub fn exponent(&self) -> i64 {
        if self.is_zero() {
            0
        } else {
            self.exp + self.bits() as i64
        }
    }

    /// Exponent of the lowest set bit.
    #[must_use]
    pub fn bottom_exponent(&self) -> i64 {
        self.exp
    }

    /// Negation.
    #[must_use]
    pub fn neg(&self) -> Self {
        if self.is_zero() {
            return Self::zero();
        }
        Self {
            neg: !self.neg,
            man: self.man.clone(),
            exp: self.exp,
        }
    }

    /// Absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        Self {
            neg: false,
            man: self.man.clone(),
            exp: self.exp,
        }
    }

    /// Exact multiplication by `2^k`.
    #[must_use]
    pub fn mul_2exp(&self, k: i64) -> Self {
        if self.is_zero() {
            return Self::zero();
        }
        Self::with_exp(
            self.neg,
            self.man.clone(),
            exp_add(self.exp, k),
            !self.is_finite(),
        )
    }

    /// Signed mantissa as a big integer.
    fn signed_man(&self) -> IBig {
        let m = IBig::from(self.man.clone());
        if self.neg {
            -m
        } else {
            m
        }
    }

    /// Exact sum.
    #[must_use]
    pub fn add_exact(&self, other: &Self) -> Self {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() || !self.is_finite() {
            return self.clone();
        }
        if !other.is_finite() {
            return other.clone();
        }
        let e = self.exp.min(other.exp);
        let a = &self.man << (self.exp - e) as usize;
        let b = &other.man << (other.exp - e) as usize;
        if self.neg == other.neg {
            Self::from_parts(self.neg, a + b, e)
        } else {
            match a.cmp(&b) {
                Ordering::Equal => Self::zero(),
                Ordering::Greater => Self::from_parts(self.neg, a - b, e),
                Ordering::Less => Self::from_parts(other.neg, b - a, e),
            }
        }
    }

    /// Exact difference.
    #[must_use]
    pub fn sub_exact(&self, other: &Self) -> Self {
        self.add_exact(&other.neg())
    }

    /// Exact product.
    #[must_use]
    pub fn mul_exact(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            return Self::zero();
        }
        Self::with_exp(
            self.neg != other.neg,
            &self.man * &other.man,
            exp_add(self.exp, other.exp),
            !self.is_finite() || !other.is_finite(),
        )
    }

    /// Rounds to `prec` bits.
    #[must_use]
    pub fn round(&self, prec: u64, rnd: Round) -> (Self, Rounding) {
        let prec = prec.max(2);
        let bits = self.bits();
        if bits <= prec || !self.is_finite() {
            return (self.clone(), Rounding::Exact);
        }
        let shift = (bits - prec) as usize;
        let q = &self.man >> shift;
        // The mantissa is odd, so everything below the cut is nonzero and a
        // tie can only happen when exactly one bit is dropped.
        let away = match rnd {
            Round::Down => false,
            Round::Up => true,
            Round::Floor => self.neg,
            Round::Ceil => !self.neg,
            Round::Near => {
                if !self.man.bit(shift - 1) {
                    false
                } else if shift >= 2 {
                    true
                } else {
                    q.bit(0)
                }
            }
        };
        let q = if away { q + UBig::ONE } else { q };
        let ulp_exp = self.exp + shift as i64;
        (
            Self::from_parts(self.neg, q, ulp_exp),
            Rounding::Inexact { ulp_exp },
        )
    }

    /// Rounded sum.
    ///
    /// An addend far below the precision window of the other is replaced by
    /// a sticky bit of the same sign, which rounds identically.
    #[must_use]
    pub fn add(&self, other: &Self, prec: u64, rnd: Round) -> (Self, Rounding) {
        if other.is_zero() {
            return self.round(prec, rnd);
        }
        if self.is_zero() {
            return other.round(prec, rnd);
        }
        let (big, small) = if self.exponent() >= other.exponent() {
            (self, other)
        } else {
            (other, self)
        };
        let floor = big.exp.min(big.exponent() - prec.max(2) as i64 - 4);
        if small.exponent() < floor - 1 {
            let sticky = Self::pow2(floor - 2);
            let sticky = if small.neg { sticky.neg() } else { sticky };
            return big.add_exact(&sticky).round(prec, rnd);
        }
        self.add_exact(other).round(prec, rnd)
    }

    /// Rounded difference.
    #[must_use]
    pub fn sub(&self, other: &Self, prec: u64, rnd: Round) -> (Self, Rounding) {
        self.add(&other.neg(), prec, rnd)
    }

    /// Rounded product.
    #[must_use]
    pub fn mul(&self, other: &Self, prec: u64, rnd: Round) -> (Self, Rounding) {
        self.mul_exact(other).round(prec, rnd)
    }

    /// Rounded quotient.
    ///
    /// # Panics
    ///
    /// Panics if `other` is zero.
    #[must_use]
    pub fn div(&self, other: &Self, prec: u64, rnd: Round) -> (Self, Rounding) {
        assert!(!other.is_zero(), "Arf division by zero");
        if self.is_zero() {
            return (Self::zero(), Rounding::Exact);
        }
        div_ubig(
            self.neg != other.neg,
            &self.man,
            self.exp,
            &other.man,
            other.exp,
            prec,
            rnd,
        )
    }

    /// Rounded square root.
    ///
    /// # Panics
    ///
    /// Panics if `self` is negative.
    #[must_use]
    pub fn sqrt(&self, prec: u64, rnd: Round) -> (Self, Rounding) {
        assert!(!self.neg, "square root of a negative Arf");
        if self.is_zero() {
            return (Self::zero(), Rounding::Exact);
        }
        let prec = prec.max(2);
        let bits = self.bits() as i64;
        let mut t = (2 * (prec as i64 + 2) - bits + 2).max(0);
        if (self.exp - t).rem_euclid(2) == 1 {
            t += 1;
        }
        let n = &self.man << t as usize;
        let s = isqrt(&n);
        let exp = (self.exp - t) / 2;
        if &s * &s == n {
            Self::from_parts(false, s, exp).round(prec, rnd)
        } else {
            Self::from_parts(false, (s << 1) + UBig::ONE, exp - 1).round(prec, rnd)
        }
    }

    /// Compares absolute values.
    #[must_use]
    pub fn cmp_abs(&self, other: &Self) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        let (ta, tb) = (self.exponent(), other.exponent());
        if ta != tb {
            return ta.cmp(&tb);
        }
        let e = self.exp.min(other.exp);
        let a = &self.man << (self.exp - e) as usize;
        let b = &other.man << (other.exp - e) as usize;
        a.cmp(&b)
    }

    /// Compares `|self|` with a magnitude bound.
    #[must_use]
    pub fn cmp_abs_mag(&self, m: &Mag) -> Ordering {
        match Self::from_mag(m) {
            None => Ordering::Less,
            Some(m) => self.cmp_abs(&m),
        }
    }

    /// Top 64 (or fewer) bits of the mantissa, their exponent, and whether
    /// any bits were dropped.
    fn top_bits(&self) -> (u128, i64, bool) {
        let bits = self.man.bit_len();
        if bits <= 64 {
            (u128::from(low_u64(&self.man)), self.exp, false)
        } else {
            let shift = bits - 64;
            (
                u128::from(low_u64(&(&self.man >> shift))),
                self.exp + shift as i64,
                true,
            )
        }
    }

    /// Upper bound for `|self|`.
    #[must_use]
    pub fn mag(&self) -> Mag {
        if self.is_zero() {
            return Mag::ZERO;
        }
        let (m, e, inexact) = self.top_bits();
        Mag::from_parts_up(m + u128::from(inexact), e)
    }

    /// Lower bound for `|self|`.
    #[must_use]
    pub fn mag_lower(&self) -> Mag {
        if self.is_zero() {
            return Mag::ZERO;
        }
        let (m, e, _) = self.top_bits();
        Mag::from_parts_lower(m, e)
    }

    /// Nearest double (approximately).
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        if self.is_zero() {
            return 0.0;
        }
        let (m, e, _) = self.top_bits();
        let d = ldexp(m as f64, e);
        if self.neg {
            -d
        } else {
            d
        }
    }

    /// The integer `self · 2^−e`, if it is one.
    #[must_use]
    pub fn to_fixed(&self, e: i64) -> Option<IBig> {
        if self.is_zero() {
            return Some(IBig::ZERO);
        }
        if self.exp < e {
            return None;
        }
        let m = IBig::from(&self.man << (self.exp - e) as usize);
        Some(if self.neg { -m } else { m })
    }

    /// Exact rational value.
    #[must_use]
    pub fn to_rational(&self) -> RBig {
        if self.exp >= 0 {
            let m = IBig::from(&self.man << self.exp as usize);
            RBig::from(if self.neg { -m } else { m })
        } else {
            RBig::from_parts(self.signed_man(), UBig::ONE << (-self.exp) as usize)
        }
    }

    /// Rounds a rational to `prec` bits.
    #[must_use]
    pub fn from_rational(q: &RBig, prec: u64, rnd: Round) -> (Self, Rounding) {
        let num = q.numerator();
        if *num == IBig::ZERO {
            return (Self::zero(), Rounding::Exact);
        }
        let neg = *num < IBig::ZERO;
        let a = num.clone().unsigned_abs();
        div_ubig(neg, &a, 0, q.denominator(), 0, prec, rnd)
    }

    /// Midpoint-style dot product: `init ± Σ aᵢ·bᵢ` rounded to `prec` bits,
    /// with no error bound.
    #[must_use]
    pub fn dot_approx<'a, I>(init: Option<&Self>, subtract: bool, terms: I, prec: u64) -> Self
    where
        I: IntoIterator<Item = (&'a Self, &'a Self)>,
    {
        let wp = prec + 32;
        let mut acc = init.cloned().unwrap_or_default();
        for (a, b) in terms {
            let p = a.mul_exact(b);
            let p = if subtract { p.neg() } else { p };
            acc = acc.add(&p, wp, Round::Down).0;
        }
        acc.round(prec, Round::Down).0
    }
}

/// Rounds `±(a · 2^ea) / (b · 2^eb)` to `prec` bits.
fn div_ubig(
    neg: bool,
    a: &UBig,
    ea: i64,
    b: &UBig,
    eb: i64,
    prec: u64,
    rnd: Round,
) -> (Arf, Rounding) {
    let prec = prec.max(2);
    let abits = a.bit_len() as i64;
    let bbits = b.bit_len() as i64;
    let s = (prec as i64 + 3 + bbits - abits).max(0) as usize;
    let num = a << s;
    let q = &num / b;
    let r = &num - &q * b;
    let exp = ea - eb - s as i64;
    if r.is_zero() {
        Arf::from_parts(neg, q, exp).round(prec, rnd)
    } else {
        // Sticky bit below the rounding position.
        Arf::from_parts(neg, (q << 1) + UBig::ONE, exp - 1).round(prec, rnd)
    }
}

impl Ord for Arf {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.sign(), other.sign()) {
            (Ordering::Equal, s) => s.reverse(),
            (s, Ordering::Equal) => s,
            (Ordering::Greater, Ordering::Less) => Ordering::Greater,
            (Ordering::Less, Ordering::Greater) => Ordering::Less,
            (Ordering::Greater, _) => self.cmp_abs(other),
            (Ordering::Less, _) => other.cmp_abs(self),
        }
    }
}

impl PartialOrd for Arf {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Arf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            write!(f, "Arf(0)")
        } else {
            let sign = if self.neg { "-" } else { "" };
            write!(f, "Arf({sign}{} * 2^{})", self.man, self.exp)
        }
    }
}

impl fmt::Display for Arf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            write!(f, "0")
        } else if let Some(digits) = f.precision() {
            write!(f, "{:.*e}", digits, self.to_f64())
        } else {
            write!(f, "{:e}", self.to_f64())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat(p: i64, q: i64) -> RBig {
        RBig::from_parts(IBig::from(p), UBig::from(q.unsigned_abs()))
    }

    #[test]
    fn test_normalization() {
        let x = Arf::from_i64(12);
        assert_eq!(x.mantissa(), &UBig::from(3u64));
        assert_eq!(x.bottom_exponent(), 2);
        assert_eq!(x.exponent(), 4);
        assert_eq!(Arf::from_i64(0), Arf::zero());
    }

    #[test]
    fn test_exact_arithmetic() {
        let a = Arf::from_f64(0.75).unwrap();
        let b = Arf::from_f64(-2.5).unwrap();
        assert_eq!(a.add_exact(&b), Arf::from_f64(-1.75).unwrap());
        assert_eq!(a.mul_exact(&b), Arf::from_f64(-1.875).unwrap());
        assert_eq!(a.sub_exact(&a), Arf::zero());
    }

    #[test]
    fn test_round_modes() {
        // 11 = 0b1011 rounded to 2 bits
        let x = Arf::from_i64(11);
        assert_eq!(x.round(2, Round::Down).0, Arf::from_i64(8));
        assert_eq!(x.round(2, Round::Up).0, Arf::from_i64(12));
        assert_eq!(x.round(2, Round::Near).0, Arf::from_i64(12));
        let y = Arf::from_i64(-11);
        assert_eq!(y.round(2, Round::Floor).0, Arf::from_i64(-12));
        assert_eq!(y.round(2, Round::Ceil).0, Arf::from_i64(-8));
        // tie: 5 = 0b101 → 4 (even) at 2 bits; 7 = 0b111 → 8
        assert_eq!(Arf::from_i64(5).round(2, Round::Near).0, Arf::from_i64(4));
        assert_eq!(Arf::from_i64(7).round(2, Round::Near).0, Arf::from_i64(8));
        assert!(Arf::from_i64(5).round(3, Round::Down).1.is_exact());
    }

    #[test]
    fn test_rounding_error_bound() {
        let x = Arf::from_i64(1_000_003);
        let (r, rounding) = x.round(8, Round::Down);
        let diff = x.sub_exact(&r).abs();
        assert_eq!(diff.cmp_abs_mag(&rounding.error()), Ordering::Less);
    }

    #[test]
    fn test_div_brackets_third() {
        let one = Arf::one();
        let three = Arf::from_i64(3);
        let (lo, _) = one.div(&three, 64, Round::Floor);
        let (hi, _) = one.div(&three, 64, Round::Ceil);
        let third = rat(1, 3);
        assert!(lo.to_rational() < third);
        assert!(hi.to_rational() > third);
        let (exact, r) = Arf::from_i64(6).div(&three, 10, Round::Down);
        assert!(r.is_exact());
        assert_eq!(exact, Arf::from_i64(2));
    }

    #[test]
    fn test_sqrt() {
        let (s, r) = Arf::from_i64(49).sqrt(10, Round::Down);
        assert!(r.is_exact());
        assert_eq!(s, Arf::from_i64(7));
        let (lo, _) = Arf::from_i64(2).sqrt(53, Round::Floor);
        let (hi, _) = Arf::from_i64(2).sqrt(53, Round::Ceil);
        assert!(lo.mul_exact(&lo) < Arf::from_i64(2));
        assert!(hi.mul_exact(&hi) > Arf::from_i64(2));
    }

    #[test]
    fn test_add_far_apart() {
        let big = Arf::pow2(200);
        let tiny = Arf::pow2(-200);
        let (down, r) = big.add(&tiny, 64, Round::Down);
        assert_eq!(down, big);
        assert!(!r.is_exact());
        let (up, _) = big.add(&tiny, 64, Round::Up);
        assert!(up > big);
        let (below, _) = big.sub(&tiny, 64, Round::Down);
        assert!(below < big);
    }

    #[test]
    fn test_ordering() {
        let mut v = vec![
            Arf::from_i64(3),
            Arf::from_i64(-7),
            Arf::zero(),
            Arf::from_f64(0.5).unwrap(),
        ];
        v.sort();
        assert_eq!(v[0], Arf::from_i64(-7));
        assert_eq!(v[1], Arf::zero());
        assert_eq!(v[3], Arf::from_i64(3));
    }

    #[test]
    fn test_rational_round_trip() {
        let q = rat(-22, 7);
        let (lo, _) = Arf::from_rational(&q, 40, Round::Floor);
        let (hi, _) = Arf::from_rational(&q, 40, Round::Ceil);
        assert!(lo.to_rational() <= q && q <= hi.to_rational());
        assert_eq!(Arf::from_i64(-5).mul_2exp(-3).to_rational(), rat(-5, 8));
    }

    #[test]
    fn test_mag_bounds() {
        let x = Arf::from_rational(&rat(1, 3), 200, Round::Down).0;
        assert!(x.mag_lower() <= x.mag());
        assert_eq!(x.cmp_abs_mag(&x.mag()), Ordering::Less);
        assert_ne!(x.cmp_abs_mag(&x.mag_lower()), Ordering::Less);
    }

    #[test]
    fn test_to_fixed() {
        let x = Arf::from_i64(-6);
        assert_eq!(x.to_fixed(1), Some(IBig::from(-3)));
        assert_eq!(x.to_fixed(-2), Some(IBig::from(-24)));
        assert_eq!(x.to_fixed(2), None);
    }

    #[test]
    fn test_exponent_saturates() {
        let big = Arf::pow2(1 << 60);
        assert!(big.is_finite());
        let sq = big.mul_exact(&big);
        assert!(!sq.is_finite());
        assert!(sq.mag().is_inf());
        // once saturated, scaling back down does not return to the range
        assert!(!sq.mul_exact(&Arf::pow2(-(1 << 60))).is_finite());
        assert!(!sq.mul_2exp(-1000).is_finite());
        assert!(!sq.add_exact(&Arf::one()).is_finite());
        assert!(!Arf::one().add_exact(&sq).is_finite());
        assert!(!sq.round(10, Round::Near).0.is_finite());
        assert!(Arf::pow2(1 << 59).mul_exact(&Arf::pow2(1 << 59)).is_finite());
        assert!(!Arf::pow2(-(1 << 60)).mul_exact(&Arf::pow2(-(1 << 60))).is_finite());
    }
}
