//! Fast upper bounds for products of magnitude matrices.
//!
//! Radius propagation in block multiplication needs `C += A·B` where every
//! entry is a [`Mag`] upper bound. Exact `Mag` arithmetic is slow, so
//! blocks of the shared dimension whose exponents are close enough are
//! shifted into double range and multiplied with plain `f64` arithmetic;
//! the floating-point error is then absorbed by a relative inflation.

use certus_ball::Mag;

/// Tuning knobs for [`addmul_rad_mag_fast`].
#[derive(Clone, Debug)]
pub struct RadMagConfig {
    /// Tile size of the double-precision product.
    pub block_size: usize,
    /// Blocks of at most this many shared columns use `Mag` arithmetic.
    pub min_d_block_size: usize,
    /// Largest exponent spread inside one row or column of a block.
    pub double_max_offset: i64,
}

impl Default for RadMagConfig {
    fn default() -> Self {
        Self {
            block_size: 32,
            min_d_block_size: 5,
            double_max_offset: 900,
        }
    }
}

/// Running exponent range `[lo, hi]` of the nonzero entries seen so far.
#[derive(Clone, Copy)]
struct ExpRange {
    lo: i64,
    hi: i64,
}

impl ExpRange {
    const EMPTY: Self = Self {
        lo: i64::MAX,
        hi: i64::MIN,
    };

    fn admits(self, m: &Mag, max_offset: i64) -> bool {
        match m.exponent() {
            None => true,
            Some(e) => self.hi.max(e) - self.lo.min(e) <= max_offset,
        }
    }

    fn include(&mut self, m: &Mag) {
        if let Some(e) = m.exponent() {
            self.lo = self.lo.min(e);
            self.hi = self.hi.max(e);
        }
    }

    fn center(self) -> i64 {
        if self.lo > self.hi {
            0
        } else {
            self.lo + (self.hi - self.lo) / 2
        }
    }
}

/// Unrolled double dot product.
fn dot8(x: &[f64], y: &[f64]) -> f64 {
    let mut acc = [0.0f64; 8];
    let chunks = x.len() / 8;
    for c in 0..chunks {
        let (xs, ys) = (&x[8 * c..8 * c + 8], &y[8 * c..8 * c + 8]);
        for l in 0..8 {
            acc[l] += xs[l] * ys[l];
        }
    }
    let mut s: f64 = acc.iter().sum();
    for k in chunks * 8..x.len() {
        s += x[k] * y[k];
    }
    s
}

/// `c[i][j] += Σ_k a[i][k]·b[k][j]` in `Mag` arithmetic over `k ∈ range`.
#[allow(clippy::too_many_arguments)]
fn addmul_direct(
    c: &mut [Mag],
    a: &[Mag],
    bt: &[Mag],
    m: usize,
    n: usize,
    p: usize,
    range: std::ops::Range<usize>,
) {
    for i in 0..m {
        let arow = &a[i * n..(i + 1) * n];
        for j in 0..p {
            let brow = &bt[j * n..(j + 1) * n];
            let mut s = c[i * p + j];
            for k in range.clone() {
                if !arow[k].is_zero() && !brow[k].is_zero() {
                    s = s.add(&arow[k].mul(&brow[k]));
                }
            }
            c[i * p + j] = s;
        }
    }
}

/// `C += A·B` for non-negative upper bounds, with `A` given as an `m × n`
/// row-major slice and `B` as its transpose `Bᵀ`, a `p × n` row-major
/// slice. `C` is `m × p` row-major. Every output entry stays an upper
/// bound for the exact product sum.
///
/// # Panics
///
/// Panics if the slice lengths do not match the dimensions.
pub fn addmul_rad_mag_fast(
    c: &mut [Mag],
    a: &[Mag],
    bt: &[Mag],
    m: usize,
    n: usize,
    p: usize,
    config: &RadMagConfig,
) {
    assert_eq!(c.len(), m * p, "output size mismatch");
    assert_eq!(a.len(), m * n, "left operand size mismatch");
    assert_eq!(bt.len(), p * n, "right operand size mismatch");
    if m == 0 || n == 0 || p == 0 {
        return;
    }
    if a.iter().chain(bt).any(Mag::is_inf) {
        addmul_direct(c, a, bt, m, n, p, 0..n);
        return;
    }

    let mut start = 0;
    while start < n {
        let mut a_range = vec![ExpRange::EMPTY; m];
        let mut b_range = vec![ExpRange::EMPTY; p];
        let mut end = start;
        while end < n {
            let fits = (0..m).all(|i| a_range[i].admits(&a[i * n + end], config.double_max_offset))
                && (0..p).all(|j| b_range[j].admits(&bt[j * n + end], config.double_max_offset));
            if !fits && end > start {
                break;
            }
            for i in 0..m {
                a_range[i].include(&a[i * n + end]);
            }
            for j in 0..p {
                b_range[j].include(&bt[j * n + end]);
            }
            end += 1;
        }

        let len = end - start;
        if len <= config.min_d_block_size {
            // a short run takes the following columns along with it
            end = (start + config.min_d_block_size.max(1)).min(n);
            addmul_direct(c, a, bt, m, n, p, start..end);
        } else {
            addmul_block_f64(c, a, bt, (m, n, p), start..end, &a_range, &b_range, config);
        }
        start = end;
    }
}

#[allow(clippy::too_many_arguments)]
fn addmul_block_f64(
    c: &mut [Mag],
    a: &[Mag],
    bt: &[Mag],
    (m, n, p): (usize, usize, usize),
    range: std::ops::Range<usize>,
    a_range: &[ExpRange],
    b_range: &[ExpRange],
    config: &RadMagConfig,
) {
    let len = range.len();
    let a_center: Vec<i64> = a_range.iter().map(|r| r.center()).collect();
    let b_center: Vec<i64> = b_range.iter().map(|r| r.center()).collect();

    let mut ad = Vec::with_capacity(m * len);
    for i in 0..m {
        for k in range.clone() {
            ad.push(a[i * n + k].to_f64_fixed(a_center[i]));
        }
    }
    let mut bd = Vec::with_capacity(p * len);
    for j in 0..p {
        for k in range.clone() {
            bd.push(bt[j * n + k].to_f64_fixed(b_center[j]));
        }
    }

    let mut d = vec![0.0f64; m * p];
    let bs = config.block_size.max(1);
    for ib in (0..m).step_by(bs) {
        for jb in (0..p).step_by(bs) {
            for i in ib..(ib + bs).min(m) {
                let arow = &ad[i * len..(i + 1) * len];
                for j in jb..(jb + bs).min(p) {
                    d[i * p + j] = dot8(arow, &bd[j * len..(j + 1) * len]);
                }
            }
        }
    }

    // Recursive summation of len non-negative terms loses at most
    // (len + 1) units in the last place.
    let inflation = 1.0 + 2.01 * (len as f64 + 1.0) * f64::EPSILON;
    for i in 0..m {
        for j in 0..p {
            let x = d[i * p + j];
            if x > 0.0 {
                let bound = Mag::from_f64_2exp(x * inflation, a_center[i] + b_center[j]);
                c[i * p + j] = c[i * p + j].add(&bound);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn naive(a: &[Mag], bt: &[Mag], m: usize, n: usize, p: usize) -> Vec<Mag> {
        let mut c = vec![Mag::ZERO; m * p];
        addmul_direct(&mut c, a, bt, m, n, p, 0..n);
        c
    }

    #[test]
    fn test_matches_direct_within_tolerance() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (m, n, p) = (7, 40, 9);
        let a: Vec<Mag> = (0..m * n)
            .map(|_| Mag::from_u64(rng.gen_range(0..1_000_000)).mul_2exp(rng.gen_range(-40..40)))
            .collect();
        let bt: Vec<Mag> = (0..p * n)
            .map(|_| Mag::from_u64(rng.gen_range(0..1_000_000)).mul_2exp(rng.gen_range(-40..40)))
            .collect();
        let mut fast = vec![Mag::ZERO; m * p];
        addmul_rad_mag_fast(&mut fast, &a, &bt, m, n, p, &RadMagConfig::default());
        let exact = naive(&a, &bt, m, n, p);
        for (f, e) in fast.iter().zip(&exact) {
            // both are upper bounds of the same sum, and the fast one is tight
            let ratio = f.to_f64() / e.to_f64();
            assert!(ratio > 0.999_999 && ratio < 1.000_001, "ratio {ratio}");
        }
    }

    #[test]
    fn test_wide_exponent_spread_splits_blocks() {
        let n = 12;
        let a: Vec<Mag> = (0..n)
            .map(|k| if k % 2 == 0 { Mag::pow2(2000) } else { Mag::pow2(-2000) })
            .collect();
        let bt = vec![Mag::ONE; n];
        let mut c = vec![Mag::ZERO];
        addmul_rad_mag_fast(&mut c, &a, &bt, 1, n, 1, &RadMagConfig::default());
        assert!(c[0] >= Mag::pow2(2000).mul_lower(&Mag::from_u64_lower(6)));
    }

    #[test]
    fn test_short_run_extends_to_minimum_block() {
        // column 0 is far from the rest, so the first run has length one and
        // the direct product must cover columns 0..5; the remaining two
        // columns then form another short run
        let (m, n, p) = (2, 7, 3);
        let a: Vec<Mag> = (0..m * n)
            .map(|x| {
                let e = if x % n == 0 { 2000 } else { (x % 5) as i64 };
                Mag::from_u64(1_000_003 + 7 * x as u64).mul_2exp(e)
            })
            .collect();
        let bt: Vec<Mag> = (0..p * n).map(|x| Mag::from_u64(999_983 + 11 * x as u64)).collect();
        let mut fast = vec![Mag::ZERO; m * p];
        addmul_rad_mag_fast(&mut fast, &a, &bt, m, n, p, &RadMagConfig::default());
        assert_eq!(fast, naive(&a, &bt, m, n, p));
    }

    #[test]
    fn test_infinite_entries() {
        let a = vec![Mag::INF, Mag::ONE];
        let bt = vec![Mag::ONE, Mag::ONE];
        let mut c = vec![Mag::ZERO];
        addmul_rad_mag_fast(&mut c, &a, &bt, 1, 2, 1, &RadMagConfig::default());
        assert!(c[0].is_inf());
    }
}
