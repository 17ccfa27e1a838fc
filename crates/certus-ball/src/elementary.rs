//! Elementary functions on balls.
//!
//! The logarithm is evaluated through the argument-reduced series
//! `log u = 2·atanh((u − 1)/(u + 1))`, the exponential by a Taylor series
//! at `x / 2^s` followed by `s` squarings.

use std::f64::consts::FRAC_1_SQRT_2;

use crate::arb::Arb;
use crate::arf::Arf;
use crate::mag::{Mag, MAG_MIN_EXP};

/// `atanh(t) = Σ t^(2j+1)/(2j+1)` for a ball with `|t| ≤ 1/2`, including a
/// bound for the truncated tail.
fn atanh_series(t: &Arb, prec: u64) -> Arb {
    let wp = prec + 16;
    let tm = t.mag();
    if tm.is_zero() {
        return Arb::zero();
    }
    let bits_per_power = (-tm.to_f64().log2()).max(1.0);
    let n = ((wp as f64 + 8.0) / (2.0 * bits_per_power)).ceil() as u64 + 1;

    let t2 = t.sqr(wp);
    let mut power = t.clone();
    let mut sum = t.clone();
    for j in 1..n {
        power = power.mul(&t2, wp);
        let denom = Arb::from_i64(2 * j as i64 + 1);
        sum = sum.add(&power.div(&denom, wp), wp);
    }
    // |Σ_{j≥n} t^(2j+1)/(2j+1)| ≤ |t|^(2n+1) / (1 − t²)
    let tail = tm.pow(2 * n + 1).mul(&tm.mul(&tm).geom_series());
    sum.add_error(&tail);
    sum
}

impl Arb {
    /// `log 2`.
    #[must_use]
    pub fn const_log2(prec: u64) -> Self {
        let third = Self::one().div(&Self::from_i64(3), prec + 16);
        atanh_series(&third, prec).mul_2exp(1).round(prec)
    }

    /// Exponential.
    ///
    /// Midpoints of magnitude `2^62` or more give `[0 ± ∞]`, or a tiny
    /// ball around zero when the whole ball is that far below zero.
    #[must_use]
    pub fn exp(&self, prec: u64) -> Self {
        if !self.is_finite() {
            return Self::indeterminate();
        }
        if self.is_zero() {
            return Self::one();
        }
        let m = self.mid();
        let e = m.exponent();
        if e > 62 {
            // the upper endpoint is at most m/2 ≤ −2^61
            if m.is_negative() && self.rad().cmp_2exp(e - 2).is_lt() {
                return Self::zero_pm(Mag::pow2(MAG_MIN_EXP));
            }
            return Self::indeterminate();
        }
        let mut result = if m.is_zero() {
            Self::one()
        } else {
            exp_arf(m, prec)
        };
        if !self.rad().is_zero() {
            // e^(m ± r) ⊂ e^m · (1 ± (e^r − 1))
            let spread = self.rad().exp_tail(1);
            let err = result.mag().mul(&spread);
            result.add_error(&err);
        }
        result.round(prec)
    }

    /// Natural logarithm; indeterminate unless every member is positive.
    #[must_use]
    pub fn log(&self, prec: u64) -> Self {
        if !self.is_finite() || !self.is_positive() {
            return Self::indeterminate();
        }
        if self.is_one() {
            return Self::zero();
        }
        let wp = prec + 16;
        let mut result = log_arf(self.mid(), wp);
        if !self.rad().is_zero() {
            // |log x − log m| ≤ r / (m − r)
            let lower = self.mid().mag_lower().sub_lower(self.rad());
            result.add_error(&self.rad().div(&lower));
        }
        result.round(prec)
    }
}

/// Exponential of a nonzero floating-point number with `|m| < 2^62`.
fn exp_arf(m: &Arf, prec: u64) -> Arb {
    // t = m / 2^s with |t| < 2^−8
    let s = (m.exponent() + 8).max(0) as u64;
    let wp = prec + s + 2 * u64::from(64 - prec.leading_zeros()) + 16;
    let t = Arb::from_arf(m.mul_2exp(-(s as i64)));
    let log2_t = t.mag().to_f64().log2();
    let target = -(wp as f64);
    let mut log_term = 0.0;
    let mut terms = 1u64;
    loop {
        log_term += log2_t - (terms as f64).log2();
        if log_term < target {
            break;
        }
        terms += 1;
    }

    let one = Arb::one();
    let mut sum = one.clone();
    for k in (1..terms).rev() {
        sum = one.add(&t.mul(&sum, wp).div_si(k as i64, wp), wp);
    }
    sum.add_error(&t.mag().exp_tail(terms));
    for _ in 0..s {
        sum = sum.sqr(wp);
    }
    sum
}

/// Logarithm of a positive floating-point number.
fn log_arf(m: &Arf, wp: u64) -> Arb {
    // m = u · 2^k with u ∈ [1/√2, √2)
    let mut k = m.exponent();
    let mut u = m.mul_2exp(-k);
    if u.to_f64() < FRAC_1_SQRT_2 {
        u = u.mul_2exp(1);
        k -= 1;
    }
    let u = Arb::from_arf(u);
    let one = Arb::one();
    let t = u.sub(&one, wp).div(&u.add(&one, wp), wp);
    let mut log_u = atanh_series(&t, wp).mul_2exp(1);
    if k != 0 {
        let k_ln2 = Arb::const_log2(wp).mul(&Arb::from_i64(k), wp);
        log_u = log_u.add(&k_ln2, wp);
    }
    log_u
}
