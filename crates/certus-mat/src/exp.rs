//! Matrix exponential by scaling and squaring.

use tracing::debug;

use crate::dense::ArbMat;
use crate::mul::{mul, sqr};

/// Longest walk between two vertices of the graph whose edges are the
/// entries that are not exactly zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Walk {
    /// No walk exists.
    None,
    /// Every walk has at most this many edges.
    Finite(usize),
    /// Walks pass through a cycle and have unbounded length.
    Unbounded,
}

/// All-pairs longest walks of the boolean pattern `p`.
fn longest_walks(p: &[Vec<bool>]) -> Vec<Vec<Walk>> {
    let n = p.len();

    // transitive closure, then cycles through each vertex
    let mut reach: Vec<Vec<bool>> = p.to_vec();
    for k in 0..n {
        for i in 0..n {
            if reach[i][k] {
                for j in 0..n {
                    if reach[k][j] {
                        reach[i][j] = true;
                    }
                }
            }
        }
    }
    let on_cycle: Vec<bool> = (0..n).map(|v| reach[v][v]).collect();
    let reaches = |i: usize, j: usize| i == j || reach[i][j];

    let mut walks = vec![vec![Walk::None; n]; n];
    // walks avoiding cycles have fewer than n edges
    let mut power: Vec<Vec<bool>> = (0..n).map(|i| (0..n).map(|j| i == j).collect()).collect();
    for k in 0..n {
        for i in 0..n {
            for j in 0..n {
                if power[i][j] {
                    walks[i][j] = Walk::Finite(k);
                }
            }
        }
        power = (0..n)
            .map(|i| (0..n).map(|j| (0..n).any(|l| power[i][l] && p[l][j])).collect())
            .collect();
    }
    for i in 0..n {
        for j in 0..n {
            if (0..n).any(|v| on_cycle[v] && reaches(i, v) && reaches(v, j)) {
                walks[i][j] = Walk::Unbounded;
            }
        }
    }
    walks
}

/// Smallest `d` with `P^d = 0`, if the pattern is nilpotent.
fn nilpotency_degree(walks: &[Vec<Walk>]) -> Option<usize> {
    let mut longest = 0;
    for walk in walks.iter().flatten() {
        match *walk {
            Walk::Unbounded => return None,
            Walk::Finite(k) => longest = longest.max(k),
            Walk::None => {}
        }
    }
    Some(longest + 1)
}

/// Number of Taylor terms needed for `x^N / N! < 2^−wp`, where `x` is
/// given by its base-2 logarithm.
fn taylor_terms(log2_norm: f64, wp: u64) -> u64 {
    let target = -(wp as f64);
    let mut log_term = 0.0;
    let mut k = 1u64;
    loop {
        log_term += log2_norm - (k as f64).log2();
        if log_term < target || k >= 4 * wp + 4 {
            return k;
        }
        k += 1;
    }
}

/// Encloses `exp(A)`.
///
/// A matrix whose pattern of nonzero entries is diagonal is exponentiated
/// entrywise. Otherwise the matrix is scaled by `2^−r` so its norm is
/// small, the Taylor series is summed by Horner's rule, and the result is
/// squared `r` times. The series stops at the nilpotency degree of the
/// pattern when there is one, and the bound for the truncated tail only
/// goes to entries reachable by walks at least as long as the series.
///
/// # Panics
///
/// Panics if the matrix is not square.
#[must_use]
pub fn exp(a: &ArbMat, prec: u64) -> ArbMat {
    assert!(a.is_square(), "exponential of a non-square matrix");
    let n = a.num_rows();
    if n == 0 {
        return ArbMat::zeros(0, 0);
    }
    if n == 1 {
        return ArbMat::from_rows(vec![vec![a[(0, 0)].exp(prec)]]);
    }
    if a.is_zero() {
        return ArbMat::identity(n);
    }

    let pattern: Vec<Vec<bool>> = a
        .entrywise_is_zero()
        .into_iter()
        .map(|row| row.into_iter().map(|z| !z).collect())
        .collect();
    let diagonal = (0..n).all(|i| (0..n).all(|j| i == j || !pattern[i][j]));
    if diagonal {
        let mut e = ArbMat::zeros(n, n);
        for i in 0..n {
            e[(i, i)] = a[(i, i)].exp(prec);
        }
        return e;
    }

    let wp = prec + 3 * u64::from(64 - prec.leading_zeros());
    let norm = a.bound_inf_norm();
    // no finite enclosure has an exponent in range
    if !norm.is_finite() || norm.cmp_2exp(2 * wp as i64).is_gt() {
        debug!(n, prec, "norm too large for the exponential");
        return ArbMat::indeterminate(n, n);
    }

    let q = (wp as f64).powf(0.25).floor() as i64;
    let r: i64 = if norm.cmp_2exp(-q).is_lt() {
        0
    } else {
        (q + norm.exponent().unwrap_or(0)).max(0)
    };

    let t = a.mul_2exp(-r);
    let t_norm = norm.mul_2exp(-r);
    let walks = longest_walks(&pattern);
    let mut terms = taylor_terms(t_norm.to_f64().log2(), wp);
    if let Some(d) = nilpotency_degree(&walks) {
        terms = terms.min(d as u64);
    }
    debug!(n, prec, r, terms, "matrix exponential");

    // S = I + T·S/k for k = N−1, …, 1
    let id = ArbMat::identity(n);
    let mut s = id.clone();
    for k in (1..terms).rev() {
        s = id.add(&mul(&t, &s, wp).div_si(k as i64, wp), wp);
    }

    let tail = t_norm.exp_tail(terms);
    for i in 0..n {
        for j in 0..n {
            let truncated = match walks[i][j] {
                Walk::None => false,
                Walk::Finite(k) => k as u64 >= terms,
                Walk::Unbounded => true,
            };
            if truncated {
                s[(i, j)].add_error(&tail);
            }
        }
    }

    for _ in 0..r {
        s = sqr(&s, wp);
    }
    s.round(prec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mul::mul_classical;
    use certus_ball::{Arb, Arf, Mag};

    fn walks_of(a: &ArbMat) -> Vec<Vec<Walk>> {
        let pattern: Vec<Vec<bool>> = a
            .entrywise_is_zero()
            .into_iter()
            .map(|row| row.into_iter().map(|z| !z).collect())
            .collect();
        longest_walks(&pattern)
    }

    #[test]
    fn test_zero_and_empty() {
        assert_eq!(exp(&ArbMat::zeros(3, 3), 64), ArbMat::identity(3));
        assert!(exp(&ArbMat::zeros(0, 0), 64).is_empty());
    }

    #[test]
    fn test_nilpotent_is_exact() {
        let a = ArbMat::from_i64_rows(&[vec![0, 1], vec![0, 0]]);
        let e = exp(&a, 100);
        assert_eq!(e, ArbMat::from_i64_rows(&[vec![1, 1], vec![0, 1]]));
        assert_eq!(nilpotency_degree(&walks_of(&a)), Some(2));
        assert_eq!(nilpotency_degree(&walks_of(&ArbMat::identity(2))), None);

        let b = ArbMat::from_i64_rows(&[vec![0, 2, 0], vec![0, 0, 3], vec![0, 0, 0]]);
        // exp(B) = I + B + B²/2
        let expected = ArbMat::from_i64_rows(&[vec![1, 2, 3], vec![0, 1, 3], vec![0, 0, 1]]);
        assert_eq!(exp(&b, 64), expected);
    }

    #[test]
    fn test_longest_walks() {
        let a = ArbMat::from_i64_rows(&[vec![0, 1, 1], vec![0, 0, 1], vec![0, 0, 0]]);
        let w = walks_of(&a);
        assert_eq!(w[0][2], Walk::Finite(2));
        assert_eq!(w[0][1], Walk::Finite(1));
        assert_eq!(w[1][1], Walk::Finite(0));
        assert_eq!(w[2][0], Walk::None);
        assert_eq!(nilpotency_degree(&w), Some(3));

        // a self loop at vertex 1 makes every walk through it unbounded
        let b = ArbMat::from_i64_rows(&[vec![0, 1, 0], vec![0, 1, 1], vec![0, 0, 0]]);
        let w = walks_of(&b);
        assert_eq!(w[0][0], Walk::Finite(0));
        assert_eq!(w[0][2], Walk::Unbounded);
        assert_eq!(w[1][1], Walk::Unbounded);
        assert_eq!(w[2][2], Walk::Finite(0));
        assert_eq!(w[2][1], Walk::None);
    }

    #[test]
    fn test_diagonal_is_entrywise() {
        let a = ArbMat::from_fn(3, 3, |i, j| {
            if i == j {
                Arb::from_mid_rad(Arf::from_i64(i as i64 + 1), Mag::pow2(-40))
            } else {
                Arb::zero()
            }
        });
        let e = exp(&a, 128);
        for i in 0..3 {
            assert_eq!(e[(i, i)], a[(i, i)].exp(128));
            for j in 0..3 {
                if i != j {
                    assert!(e[(i, j)].is_zero());
                }
            }
        }
        let one = ArbMat::from_i64_rows(&[vec![2]]);
        assert_eq!(exp(&one, 64)[(0, 0)], Arb::from_i64(2).exp(64));
    }

    #[test]
    fn test_diagonal_exponential() {
        let a = ArbMat::from_i64_rows(&[vec![1, 0], vec![0, 2]]);
        let e = exp(&a, 128);
        assert!((e[(0, 0)].to_f64() - std::f64::consts::E).abs() < 1e-14);
        assert!((e[(1, 1)].to_f64() - std::f64::consts::E.powi(2)).abs() < 1e-13);
        assert!(e[(0, 0)].rel_accuracy_bits() > 100);
        assert!(e[(0, 1)].is_zero());
    }

    #[test]
    fn test_unreachable_entries_stay_exact() {
        let a = ArbMat::from_i64_rows(&[vec![1, 1], vec![0, 1]]);
        let e = exp(&a, 128);
        // exp(A) = e·[[1, 1], [0, 1]]
        assert!(e[(1, 0)].is_zero());
        assert!(e[(0, 1)].overlaps(&e[(0, 0)]));
        assert!((e[(1, 1)].to_f64() - std::f64::consts::E).abs() < 1e-14);
    }

    #[test]
    fn test_exp_times_exp_neg_contains_identity() {
        let a = ArbMat::from_fn(4, 4, |i, j| Arb::from_i64((i as i64 - j as i64) * 3 + 1));
        let product = mul_classical(&exp(&a, 128), &exp(&a.neg(), 128), 128);
        assert!(product.contains(&ArbMat::identity(4)));
    }

    #[test]
    fn test_huge_norm_is_indeterminate() {
        let scaled = ArbMat::identity(2).mul_2exp(200);
        assert!(!exp(&scaled, 64).is_finite());

        let mut coupled = scaled.clone();
        coupled[(0, 1)] = Arb::one();
        assert!(!exp(&coupled, 64).is_finite());

        // in range for scaling, but the squarings overflow the exponent
        let b = ArbMat::from_fn(2, 2, |i, j| if i == j { Arb::pow2(80) } else { Arb::one() });
        let e = exp(&b, 64);
        assert!(!e[(0, 0)].is_finite());
    }

    #[test]
    fn test_taylor_terms_grow_with_precision() {
        assert!(taylor_terms(-4.0, 200) > taylor_terms(-4.0, 50));
        assert_eq!(taylor_terms(-100.0, 50), 1);
    }
}
