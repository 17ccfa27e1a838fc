//! Real balls.
//!
//! An [`Arb`] is a midpoint [`Arf`] together with a radius [`Mag`] and
//! represents every real number within the radius of the midpoint. All
//! arithmetic is rigorous: the output ball contains every result obtainable
//! from members of the input balls.

use std::cmp::Ordering;
use std::fmt;

use dashu::rational::RBig;

use crate::arf::{Arf, Round};
use crate::mag::Mag;

/// Balls whose midpoint and radius exponents stay within `±LAGOM_EXP` are
/// "lagom": safe to convert to fixed point.
pub const LAGOM_EXP: i64 = 1 << 40;

/// A real ball `[mid ± rad]`.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Arb {
    mid: Arf,
    rad: Mag,
}

/// Radius of the product of `[ma ± ra]` and `[mb ± rb]`, excluding the
/// rounding of the midpoint product.
fn product_rad(ma: &Arf, ra: &Mag, mb: &Arf, rb: &Mag) -> Mag {
    let mut e = Mag::ZERO;
    if !rb.is_zero() && !ma.is_zero() {
        e = e.add(&ma.mag().mul(rb));
    }
    if !ra.is_zero() && !mb.is_zero() {
        e = e.add(&mb.mag().mul(ra));
    }
    if !ra.is_zero() && !rb.is_zero() {
        e = e.add(&ra.mul(rb));
    }
    e
}

impl Arb {
    /// Exact zero.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Exact one.
    #[must_use]
    pub fn one() -> Self {
        Self::from_arf(Arf::one())
    }

    /// The ball `[0 ± ∞]`, which contains every real.
    #[must_use]
    pub fn indeterminate() -> Self {
        Self {
            mid: Arf::zero(),
            rad: Mag::INF,
        }
    }

    /// Exact ball around a floating-point value.
    #[must_use]
    pub fn from_arf(mid: Arf) -> Self {
        Self {
            mid,
            rad: Mag::ZERO,
        }
    }

    /// The ball `[mid ± rad]`.
    #[must_use]
    pub fn from_mid_rad(mid: Arf, rad: Mag) -> Self {
        Self { mid, rad }
    }

    /// `[mid ± rad]`, or `[0 ± ∞]` if the midpoint exponent overflowed.
    fn checked(mid: Arf, rad: Mag) -> Self {
        if mid.is_finite() {
            Self { mid, rad }
        } else {
            Self::indeterminate()
        }
    }

    /// The ball `[0 ± rad]`.
    #[must_use]
    pub fn zero_pm(rad: Mag) -> Self {
        Self {
            mid: Arf::zero(),
            rad,
        }
    }

    /// Exact integer.
    #[must_use]
    pub fn from_i64(x: i64) -> Self {
        Self::from_arf(Arf::from_i64(x))
    }

    /// Exact value of a double; NaN and infinities give an indeterminate ball.
    #[must_use]
    pub fn from_f64(d: f64) -> Self {
        Arf::from_f64(d).map_or_else(Self::indeterminate, Self::from_arf)
    }

    /// Exactly `2^e`.
    #[must_use]
    pub fn pow2(e: i64) -> Self {
        Self::from_arf(Arf::pow2(e))
    }

    /// Encloses a rational number at `prec` bits.
    #[must_use]
    pub fn from_rational(q: &RBig, prec: u64) -> Self {
        let (mid, r) = Arf::from_rational(q, prec, Round::Down);
        Self { mid, rad: r.error() }
    }

    /// Rounds the midpoint `m` of `[m ± rad]` to `prec` bits.
    #[must_use]
    pub fn from_mid_rad_round(mid: &Arf, rad: Mag, prec: u64) -> Self {
        let (mid, r) = mid.round(prec, Round::Down);
        Self::checked(mid, rad.add(&r.error()))
    }

    /// The midpoint.
    #[must_use]
    pub fn mid(&self) -> &Arf {
        &self.mid
    }

    /// The radius.
    #[must_use]
    pub fn rad(&self) -> &Mag {
        &self.rad
    }

    /// The midpoint as an exact ball.
    #[must_use]
    pub fn mid_arb(&self) -> Self {
        Self::from_arf(self.mid.clone())
    }

    /// Splits into midpoint and radius.
    #[must_use]
    pub fn into_parts(self) -> (Arf, Mag) {
        (self.mid, self.rad)
    }

    /// Rounds the midpoint to `prec` bits, widening the radius.
    #[must_use]
    pub fn round(&self, prec: u64) -> Self {
        Self::from_mid_rad_round(&self.mid, self.rad, prec)
    }

    /// Widens the radius by `err`.
    pub fn add_error(&mut self, err: &Mag) {
        self.rad = self.rad.add(err);
    }

    /// Returns true for the exact ball `0`.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.mid.is_zero() && self.rad.is_zero()
    }

    /// Returns true for the exact ball `1`.
    #[must_use]
    pub fn is_one(&self) -> bool {
        self.rad.is_zero() && self.mid == Arf::one()
    }

    /// Returns true if the radius is zero.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.rad.is_zero()
    }

    /// Returns true if the radius is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.rad.is_finite()
    }

    /// Returns true if the radius is finite and the midpoint and radius
    /// exponents lie within `±LAGOM_EXP`.
    #[must_use]
    pub fn is_lagom(&self) -> bool {
        let lagom = |e: i64| (-LAGOM_EXP..=LAGOM_EXP).contains(&e);
        if !self.rad.is_finite() {
            return false;
        }
        if !self.mid.is_zero()
            && !(lagom(self.mid.exponent()) && lagom(self.mid.bottom_exponent()))
        {
            return false;
        }
        self.rad.exponent().map_or(true, lagom)
    }

    /// Returns true if the ball contains zero.
    #[must_use]
    pub fn contains_zero(&self) -> bool {
        self.mid.cmp_abs_mag(&self.rad) != Ordering::Greater
    }

    /// Returns true if every member of the ball is nonzero.
    #[must_use]
    pub fn is_nonzero(&self) -> bool {
        !self.contains_zero()
    }

    /// Returns true if every member is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.mid.is_positive() && self.is_nonzero()
    }

    /// Returns true if every member is strictly negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.mid.is_negative() && self.is_nonzero()
    }

    /// Returns true if every member is non-negative.
    #[must_use]
    pub fn is_nonnegative(&self) -> bool {
        !self.mid.is_negative() && self.mid.cmp_abs_mag(&self.rad) != Ordering::Less
    }

    /// Exact endpoints, or `None` for an infinite radius.
    #[must_use]
    pub fn endpoints(&self) -> Option<(Arf, Arf)> {
        let r = Arf::from_mag(&self.rad)?;
        Some((self.mid.sub_exact(&r), self.mid.add_exact(&r)))
    }

    /// Returns true if `other` is a subset of `self`.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        let Some((lo, hi)) = self.endpoints() else {
            return true;
        };
        let Some((olo, ohi)) = other.endpoints() else {
            return false;
        };
        lo <= olo && ohi <= hi
    }

    /// Returns true if `x` lies in the ball.
    #[must_use]
    pub fn contains_arf(&self, x: &Arf) -> bool {
        x.sub_exact(&self.mid).cmp_abs_mag(&self.rad) != Ordering::Greater
    }

    /// Returns true if the rational `q` lies in the ball.
    #[must_use]
    pub fn contains_rational(&self, q: &RBig) -> bool {
        match self.endpoints() {
            None => true,
            Some((lo, hi)) => lo.to_rational() <= *q && *q <= hi.to_rational(),
        }
    }

    /// Returns true if the balls intersect.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let (Some(r), Some(s)) = (Arf::from_mag(&self.rad), Arf::from_mag(&other.rad)) else {
            return true;
        };
        self.mid.sub_exact(&other.mid).cmp_abs(&r.add_exact(&s)) != Ordering::Greater
    }

    /// Upper bound for the absolute value of every member.
    #[must_use]
    pub fn mag(&self) -> Mag {
        self.mid.mag().add(&self.rad)
    }

    /// Lower bound for the absolute value of every member.
    #[must_use]
    pub fn mag_lower(&self) -> Mag {
        self.mid.mag_lower().sub_lower(&self.rad)
    }

    /// Approximate relative accuracy in bits; `i64::MAX` for exact balls.
    #[must_use]
    pub fn rel_accuracy_bits(&self) -> i64 {
        match self.rad.exponent() {
            None if self.rad.is_zero() => i64::MAX,
            None => i64::MIN,
            Some(re) if self.mid.is_zero() => -re,
            Some(re) => self.mid.exponent() - re,
        }
    }

    /// Negation.
    #[must_use]
    pub fn neg(&self) -> Self {
        Self {
            mid: self.mid.neg(),
            rad: self.rad,
        }
    }

    /// Encloses `|x|` for members `x`.
    #[must_use]
    pub fn abs(&self) -> Self {
        Self {
            mid: self.mid.abs(),
            rad: self.rad,
        }
    }

    /// Exact multiplication by `2^k`.
    #[must_use]
    pub fn mul_2exp(&self, k: i64) -> Self {
        let rad = if self.rad.is_zero() {
            self.rad
        } else {
            self.rad.mul_2exp(k)
        };
        Self::checked(self.mid.mul_2exp(k), rad)
    }

    /// `self + other`.
    #[must_use]
    pub fn add(&self, other: &Self, prec: u64) -> Self {
        let (mid, r) = self.mid.add(&other.mid, prec, Round::Down);
        Self::checked(mid, self.rad.add(&other.rad).add(&r.error()))
    }

    /// `self − other`.
    #[must_use]
    pub fn sub(&self, other: &Self, prec: u64) -> Self {
        let (mid, r) = self.mid.sub(&other.mid, prec, Round::Down);
        Self::checked(mid, self.rad.add(&other.rad).add(&r.error()))
    }

    /// `self · other`.
    #[must_use]
    pub fn mul(&self, other: &Self, prec: u64) -> Self {
        let (mid, r) = self.mid.mul(&other.mid, prec, Round::Down);
        let rad = product_rad(&self.mid, &self.rad, &other.mid, &other.rad);
        Self::checked(mid, rad.add(&r.error()))
    }

    /// `self · x` for an exact floating-point factor.
    #[must_use]
    pub fn mul_arf(&self, x: &Arf, prec: u64) -> Self {
        let (mid, r) = self.mid.mul(x, prec, Round::Down);
        let rad = if x.is_zero() {
            Mag::ZERO
        } else {
            self.rad.mul(&x.mag())
        };
        Self::checked(mid, rad.add(&r.error()))
    }

    /// `self · k`.
    #[must_use]
    pub fn mul_si(&self, k: i64, prec: u64) -> Self {
        self.mul_arf(&Arf::from_i64(k), prec)
    }

    /// `self / k`; indeterminate for `k = 0`.
    #[must_use]
    pub fn div_si(&self, k: i64, prec: u64) -> Self {
        self.div(&Self::from_i64(k), prec)
    }

    /// `self²`.
    #[must_use]
    pub fn sqr(&self, prec: u64) -> Self {
        let (mid, r) = self.mid.mul(&self.mid, prec, Round::Down);
        let rad = product_rad(&self.mid, &self.rad, &self.mid, &self.rad);
        Self::checked(mid, rad.add(&r.error()))
    }

    /// `self + a · b`.
    pub fn addmul(&mut self, a: &Self, b: &Self, prec: u64) {
        *self = Self::dot(Some(self), false, [(a, b)], prec);
    }

    /// `self − a · b`.
    pub fn submul(&mut self, a: &Self, b: &Self, prec: u64) {
        *self = Self::dot(Some(self), true, [(a, b)], prec);
    }

    /// `self / other`; indeterminate if `other` contains zero.
    #[must_use]
    pub fn div(&self, other: &Self, prec: u64) -> Self {
        if other.contains_zero() || !self.is_finite() {
            return Self::indeterminate();
        }
        let (mid, r) = self.mid.div(&other.mid, prec, Round::Down);
        let rad = if self.rad.is_zero() && other.rad.is_zero() {
            Mag::ZERO
        } else {
            let mut num = Mag::ZERO;
            if !other.rad.is_zero() {
                num = num.add(&self.mid.mag().mul(&other.rad));
            }
            if !self.rad.is_zero() {
                num = num.add(&other.mid.mag().mul(&self.rad));
            }
            let b = other.mid.mag_lower();
            num.div(&b.mul_lower(&b.sub_lower(&other.rad)))
        };
        Self::checked(mid, rad.add(&r.error()))
    }

    /// `1 / self`.
    #[must_use]
    pub fn inv(&self, prec: u64) -> Self {
        Self::one().div(self, prec)
    }

    /// `√self`; indeterminate if the ball contains negative numbers.
    #[must_use]
    pub fn sqrt(&self, prec: u64) -> Self {
        if self.is_zero() {
            return Self::zero();
        }
        if !self.is_finite() || !self.is_nonnegative() {
            return Self::indeterminate();
        }
        let (mid, r) = self.mid.sqrt(prec, Round::Down);
        let rad = if self.rad.is_zero() {
            Mag::ZERO
        } else {
            // |√x − √m| ≤ r / (√(m − r) + √m)
            let m = self.mid.mag_lower();
            let den = m.sub_lower(&self.rad).sqrt_lower().add_lower(&m.sqrt_lower());
            self.rad.div(&den)
        };
        Self::checked(mid, rad.add(&r.error()))
    }

    /// `√max(x, 0)` over members `x`.
    #[must_use]
    pub fn sqrtpos(&self, prec: u64) -> Self {
        if !self.is_finite() {
            return Self::indeterminate();
        }
        if self.is_nonnegative() {
            return self.sqrt(prec);
        }
        if !self.mid.is_positive() && self.mid.cmp_abs_mag(&self.rad) != Ordering::Less {
            return Self::zero();
        }
        // The ball straddles zero: enclose [0, √upper].
        let upper = self.mid.mag().add(&self.rad);
        let h = upper.sqrt();
        let half = h.mul_2exp(-1);
        match Arf::from_mag(&half) {
            Some(mid) => Self { mid, rad: half },
            None => Self::indeterminate(),
        }
    }

    /// Smallest ball (at `prec` bits) containing both inputs.
    #[must_use]
    pub fn union(&self, other: &Self, prec: u64) -> Self {
        let (Some((alo, ahi)), Some((blo, bhi))) = (self.endpoints(), other.endpoints()) else {
            return Self::indeterminate();
        };
        let lo = alo.min(blo);
        let hi = ahi.max(bhi);
        let (mid, _) = lo.add_exact(&hi).mul_2exp(-1).round(prec, Round::Down);
        let rad = hi.sub_exact(&mid).mag().max(mid.sub_exact(&lo).mag());
        Self { mid, rad }
    }

    /// `init ± Σ aᵢ·bᵢ`, accumulating the midpoint with a few guard bits
    /// and rounding once at the end.
    #[must_use]
    pub fn dot<'a, I>(init: Option<&Self>, subtract: bool, terms: I, prec: u64) -> Self
    where
        I: IntoIterator<Item = (&'a Self, &'a Self)>,
    {
        let wp = prec + 32;
        let (mut mid, mut rad) = match init {
            Some(x) => (x.mid.clone(), x.rad),
            None => (Arf::zero(), Mag::ZERO),
        };
        for (a, b) in terms {
            rad = rad.add(&product_rad(&a.mid, &a.rad, &b.mid, &b.rad));
            if a.mid.is_zero() || b.mid.is_zero() {
                continue;
            }
            let p = a.mid.mul_exact(&b.mid);
            let p = if subtract { p.neg() } else { p };
            let (sum, r) = mid.add(&p, wp, Round::Down);
            mid = sum;
            rad = rad.add(&r.error());
        }
        Self::from_mid_rad_round(&mid, rad, prec)
    }

    /// Approximate value of the midpoint.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.mid.to_f64()
    }
}

impl fmt::Debug for Arb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?} +/- {:?}]", self.mid, self.rad)
    }
}

impl fmt::Display for Arb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = f.precision().unwrap_or(15);
        if self.rad.is_zero() {
            write!(f, "{:.*}", digits, self.mid)
        } else if self.rad.is_inf() {
            write!(f, "[+/- inf]")
        } else {
            write!(f, "[{:.*} +/- {:.3}]", digits, self.mid, self.rad)
        }
    }
}
