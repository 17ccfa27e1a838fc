//! LU factorization with partial pivoting.
//!
//! Factorizations are returned packed: the unit lower factor `L` below the
//! diagonal and `U` on and above it, together with a permutation `perm`
//! such that `A = P·L·U` with `P[perm[i], i] = 1`.

use std::cmp::Ordering;

use certus_ball::{Arb, Mag, Round};
use tracing::{debug, trace};

use crate::dense::ArbMat;
use crate::error::{MatError, Result};
use crate::mul::{approx_mul, mul};
use crate::perm::{identity_perm, permute_rows};
use crate::triangular::{approx_solve_tril, solve_tril};

/// Classical elimination is used below this size.
const LU_RECURSIVE_CUTOFF: usize = 8;

/// Row in `start..end` whose entry in column `col` excludes zero and has
/// the largest midpoint magnitude.
#[must_use]
pub fn find_pivot_partial(a: &ArbMat, start: usize, end: usize, col: usize) -> Option<usize> {
    let mut best: Option<usize> = None;
    for i in start..end {
        let x = &a[(i, col)];
        if !x.is_nonzero() {
            continue;
        }
        if best.map_or(true, |b| x.mid().cmp_abs(a[(b, col)].mid()) == Ordering::Greater) {
            best = Some(i);
        }
    }
    best
}

/// Pivot among the exactly representable midpoints: the row whose midpoint
/// in column `col` has the largest magnitude, unless all are zero.
fn find_pivot_approx(a: &ArbMat, start: usize, end: usize, col: usize) -> Option<usize> {
    let mut best: Option<usize> = None;
    for i in start..end {
        let x = a[(i, col)].mid();
        if x.is_zero() {
            continue;
        }
        if best.map_or(true, |b| x.cmp_abs(a[(b, col)].mid()) == Ordering::Greater) {
            best = Some(i);
        }
    }
    best
}

/// Arithmetic of one elimination flavor.
trait LuKernel {
    fn pivot(&self, a: &ArbMat, start: usize, end: usize, col: usize) -> Option<usize>;

    fn quotient(&self, x: &Arb, pivot: &Arb, prec: u64) -> Arb;

    /// `x − e·u`.
    fn submul(&self, x: &Arb, e: &Arb, u: &Arb, prec: u64) -> Arb;

    fn solve_unit_tril(&self, l: &ArbMat, b: &ArbMat, prec: u64) -> ArbMat;

    /// `a − b·c`.
    fn schur(&self, a: &ArbMat, b: &ArbMat, c: &ArbMat, prec: u64) -> ArbMat;

    fn prepare(&self, a: &ArbMat) -> ArbMat;

    fn failure(&self, prec: u64) -> MatError {
        MatError::Singular { prec }
    }
}

struct Rigorous;

struct Approx;

impl LuKernel for Rigorous {
    fn pivot(&self, a: &ArbMat, start: usize, end: usize, col: usize) -> Option<usize> {
        find_pivot_partial(a, start, end, col)
    }

    fn quotient(&self, x: &Arb, pivot: &Arb, prec: u64) -> Arb {
        x.div(pivot, prec)
    }

    fn submul(&self, x: &Arb, e: &Arb, u: &Arb, prec: u64) -> Arb {
        let mut r = x.clone();
        r.submul(e, u, prec);
        r
    }

    fn solve_unit_tril(&self, l: &ArbMat, b: &ArbMat, prec: u64) -> ArbMat {
        solve_tril(l, b, true, prec)
    }

    fn schur(&self, a: &ArbMat, b: &ArbMat, c: &ArbMat, prec: u64) -> ArbMat {
        a.sub(&mul(b, c, prec), prec)
    }

    fn prepare(&self, a: &ArbMat) -> ArbMat {
        a.clone()
    }
}

impl LuKernel for Approx {
    fn pivot(&self, a: &ArbMat, start: usize, end: usize, col: usize) -> Option<usize> {
        find_pivot_approx(a, start, end, col)
    }

    fn quotient(&self, x: &Arb, pivot: &Arb, prec: u64) -> Arb {
        Arb::from_arf(x.mid().div(pivot.mid(), prec, Round::Near).0)
    }

    fn submul(&self, x: &Arb, e: &Arb, u: &Arb, prec: u64) -> Arb {
        let p = e.mid().mul_exact(u.mid());
        Arb::from_arf(x.mid().sub(&p, prec, Round::Near).0)
    }

    fn solve_unit_tril(&self, l: &ArbMat, b: &ArbMat, prec: u64) -> ArbMat {
        approx_solve_tril(l, b, true, prec)
    }

    fn schur(&self, a: &ArbMat, b: &ArbMat, c: &ArbMat, prec: u64) -> ArbMat {
        a.sub(&approx_mul(b, c, prec), prec).get_mid()
    }

    fn prepare(&self, a: &ArbMat) -> ArbMat {
        a.get_mid()
    }
}

/// Eliminates below the pivot `(row, col)` of `lu`, storing multipliers in
/// column `col`.
fn eliminate_below<K: LuKernel>(kernel: &K, lu: &mut ArbMat, row: usize, col: usize, prec: u64) {
    let (m, n) = (lu.num_rows(), lu.num_cols());
    for i in row + 1..m {
        let (pivot_row, target) = lu.row_pair(row, i);
        let e = kernel.quotient(&target[col], &pivot_row[col], prec);
        for j in col + 1..n {
            target[j] = kernel.submul(&target[j], &e, &pivot_row[j], prec);
        }
        target[col] = e;
    }
}

fn lu_classical_with<K: LuKernel>(kernel: &K, a: &ArbMat, prec: u64) -> Result<(Vec<usize>, ArbMat)> {
    let (m, n) = (a.num_rows(), a.num_cols());
    let mut lu = kernel.prepare(a);
    let mut perm = identity_perm(m);
    for col in 0..m.min(n) {
        let Some(r) = kernel.pivot(&lu, col, m, col) else {
            trace!(col, prec, "no certified pivot");
            return Err(kernel.failure(prec));
        };
        lu.swap_rows(Some(perm.as_mut_slice()), col, r);
        eliminate_below(kernel, &mut lu, col, col, prec);
    }
    Ok((perm, lu))
}

fn lu_recursive_with<K: LuKernel>(kernel: &K, a: &ArbMat, prec: u64) -> Result<(Vec<usize>, ArbMat)> {
    let (m, n) = (a.num_rows(), a.num_cols());
    if m < n || n < LU_RECURSIVE_CUTOFF / 2 {
        return lu_classical_with(kernel, a, prec);
    }
    let r1 = n / 2;
    debug!(m, n, r1, "recursive lu split");

    // left panel [A00; A10] = P1·[L00; L10]·U00
    let left = a.window(0, 0, m, r1).to_mat();
    let (p1, lu1) = lu_recursive_with(kernel, &left, prec)?;
    let a_perm = permute_rows(&kernel.prepare(a), &p1);

    let a00 = lu1.window(0, 0, r1, r1).to_mat();
    let l10 = lu1.window(r1, 0, m, r1).to_mat();
    let a01 = a_perm.window(0, r1, r1, n).to_mat();
    let a11 = a_perm.window(r1, r1, m, n).to_mat();

    let u01 = kernel.solve_unit_tril(&a00, &a01, prec);
    let s = kernel.schur(&a11, &l10, &u01, prec);
    let (p2, lu2) = lu_recursive_with(kernel, &s, prec)?;
    let l10 = permute_rows(&l10, &p2);

    let perm: Vec<usize> = (0..m)
        .map(|i| if i < r1 { p1[i] } else { p1[r1 + p2[i - r1]] })
        .collect();
    let lu = ArbMat::from_fn(m, n, |i, j| match (i < r1, j < r1) {
        (true, true) => a00[(i, j)].clone(),
        (true, false) => u01[(i, j - r1)].clone(),
        (false, true) => l10[(i - r1, j)].clone(),
        (false, false) => lu2[(i - r1, j - r1)].clone(),
    });
    Ok((perm, lu))
}

/// Doolittle elimination with partial pivoting; works on rectangular
/// matrices, factoring the leading `min(m, n)` columns.
///
/// # Errors
///
/// Returns [`MatError::Singular`] if some column has no pivot that is
/// certified nonzero.
pub fn lu_classical(a: &ArbMat, prec: u64) -> Result<(Vec<usize>, ArbMat)> {
    lu_classical_with(&Rigorous, a, prec)
}

/// Recursive LU: factor the left half of the columns, update the Schur
/// complement, and factor it.
///
/// # Errors
///
/// Returns [`MatError::Singular`] if some pivot is not certified nonzero.
pub fn lu_recursive(a: &ArbMat, prec: u64) -> Result<(Vec<usize>, ArbMat)> {
    lu_recursive_with(&Rigorous, a, prec)
}

/// LU factorization, choosing the algorithm by size.
///
/// # Errors
///
/// Returns [`MatError::Singular`] if some pivot is not certified nonzero.
pub fn lu(a: &ArbMat, prec: u64) -> Result<(Vec<usize>, ArbMat)> {
    if a.num_rows() < LU_RECURSIVE_CUTOFF || a.num_cols() < LU_RECURSIVE_CUTOFF {
        lu_classical(a, prec)
    } else {
        lu_recursive(a, prec)
    }
}

/// Midpoint-only LU. The factors carry zero radii and no guarantee.
///
/// # Errors
///
/// Returns [`MatError::Singular`] if every pivot candidate in some column
/// is exactly zero.
pub fn approx_lu(a: &ArbMat, prec: u64) -> Result<(Vec<usize>, ArbMat)> {
    if a.num_rows() < LU_RECURSIVE_CUTOFF || a.num_cols() < LU_RECURSIVE_CUTOFF {
        lu_classical_with(&Approx, a, prec)
    } else {
        lu_recursive_with(&Approx, a, prec)
    }
}

/// Gaussian elimination to row echelon form in place.
///
/// Elimination stops at the first column without a certified pivot. The
/// return value is the number of pivots found, negated if the row swaps
/// form an odd permutation. The multipliers below the diagonal are zeroed.
#[must_use]
pub fn gauss_partial(a: &mut ArbMat, prec: u64) -> isize {
    let (m, n) = (a.num_rows(), a.num_cols());
    let mut odd = false;
    let mut rank = 0usize;
    for col in 0..m.min(n) {
        let Some(r) = find_pivot_partial(a, col, m, col) else {
            break;
        };
        if r != col {
            a.swap_rows(None, col, r);
            odd = !odd;
        }
        eliminate_below(&Rigorous, a, col, col, prec);
        for i in col + 1..m {
            a[(i, col)] = Arb::zero();
        }
        rank += 1;
    }
    let rank = rank as isize;
    if odd {
        -rank
    } else {
        rank
    }
}

/// Upper bound for `|det|` of the square block `a[k.., k..]` by the
/// product of row 2-norms.
pub(crate) fn hadamard_bound(a: &ArbMat, k: usize) -> Mag {
    let n = a.num_rows();
    (k..n).fold(Mag::ONE, |acc, i| {
        let row_norm = a.row(i)[k..]
            .iter()
            .fold(Mag::ZERO, |s, x| {
                let m = x.mag();
                s.add(&m.mul(&m))
            })
            .sqrt();
        acc.mul(&row_norm)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mul::mul_classical;
    use crate::perm::to_matrix;
    use certus_exact::RatMat;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn unpack(lu: &ArbMat) -> (ArbMat, ArbMat) {
        let (m, n) = (lu.num_rows(), lu.num_cols());
        let l = ArbMat::from_fn(m, m.min(n), |i, j| match i.cmp(&j) {
            Ordering::Greater => lu[(i, j)].clone(),
            Ordering::Equal => Arb::one(),
            Ordering::Less => Arb::zero(),
        });
        let u = ArbMat::from_fn(m.min(n), n, |i, j| if i <= j { lu[(i, j)].clone() } else { Arb::zero() });
        (l, u)
    }

    fn check_factorization(q: &RatMat, prec: u64, f: fn(&ArbMat, u64) -> Result<(Vec<usize>, ArbMat)>) {
        let a = ArbMat::from_rat_mat(q, prec);
        let (perm, lu) = f(&a, prec).unwrap();
        let (l, u) = unpack(&lu);
        let plu = mul_classical(&to_matrix(&perm), &mul_classical(&l, &u, prec), prec);
        assert!(plu.contains_rat_mat(q));
    }

    #[test]
    fn test_lu_classical_reconstructs() {
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        let q = RatMat::random_integer(&mut rng, 6, 6, 8);
        check_factorization(&q, 200, lu_classical);
    }

    #[test]
    fn test_lu_recursive_reconstructs() {
        let mut rng = ChaCha8Rng::seed_from_u64(32);
        let q = RatMat::random_integer(&mut rng, 17, 17, 8);
        check_factorization(&q, 300, lu_recursive);
        check_factorization(&q, 300, lu);
    }

    #[test]
    fn test_lu_rectangular() {
        let mut rng = ChaCha8Rng::seed_from_u64(33);
        let tall = RatMat::random_integer(&mut rng, 7, 4, 8);
        check_factorization(&tall, 200, lu_classical);
    }

    #[test]
    fn test_lu_singular_fails() {
        let a = ArbMat::from_i64_rows(&[vec![1, 2, 3], vec![2, 4, 6], vec![1, 0, 1]]);
        assert_eq!(lu(&a, 64), Err(MatError::Singular { prec: 64 }));
        let z = ArbMat::zeros(9, 9);
        assert!(lu(&z, 64).is_err());
        assert!(approx_lu(&z, 64).is_err());
    }

    #[test]
    fn test_pivot_selection() {
        let a = ArbMat::from_i64_rows(&[vec![1], vec![-5], vec![3], vec![5]]);
        assert_eq!(find_pivot_partial(&a, 0, 4, 0), Some(1));
        assert_eq!(find_pivot_partial(&a, 2, 4, 0), Some(3));
        let mut b = ArbMat::zeros(2, 1);
        b[(1, 0)] = Arb::zero_pm(Mag::ONE);
        assert_eq!(find_pivot_partial(&b, 0, 2, 0), None);
    }

    #[test]
    fn test_approx_lu_reconstructs_approximately() {
        let mut rng = ChaCha8Rng::seed_from_u64(34);
        let q = RatMat::random_integer(&mut rng, 12, 12, 8);
        let a = ArbMat::from_rat_mat(&q, 128);
        let (perm, lu_approx) = approx_lu(&a, 128).unwrap();
        assert!(lu_approx.is_exact());
        let (l, u) = unpack(&lu_approx);
        let plu = mul_classical(&to_matrix(&perm), &mul_classical(&l, &u, 256), 256);
        for (x, y) in plu.iter().zip(a.iter()) {
            assert!((x.to_f64() - y.to_f64()).abs() <= 1e-20 * y.to_f64().abs().max(1.0));
        }
    }

    #[test]
    fn test_gauss_partial_rank_and_sign() {
        let mut a = ArbMat::from_i64_rows(&[vec![0, 1], vec![1, 0]]);
        assert_eq!(gauss_partial(&mut a, 64), -2);
        let mut b = ArbMat::from_i64_rows(&[vec![1, 2], vec![2, 4]]);
        assert_eq!(gauss_partial(&mut b, 64).abs(), 1);
        let q = RatMat::from_i64_rows(&[vec![2, 1, 0], vec![4, 3, 1], vec![0, 1, 5]]);
        let mut c = ArbMat::from_rat_mat(&q, 64);
        let rank = gauss_partial(&mut c, 64);
        assert_eq!(rank.abs(), 3);
        assert!(c.is_triu());
    }

    #[test]
    fn test_hadamard_bound() {
        let a = ArbMat::from_i64_rows(&[vec![3, 4], vec![0, 2]]);
        let h = hadamard_bound(&a, 0);
        // 5 · 2
        assert!(h >= Mag::from_u64_lower(10));
        assert!(h.to_f64() <= 10.0001);
    }
}
