//! Cholesky factorization and symmetric positive definite systems.
//!
//! Only the lower triangle of the input is read.

use certus_ball::Arb;
use tracing::trace;

use crate::charpoly::diag_prod;
use crate::dense::ArbMat;
use crate::error::{MatError, Result};
use crate::mul::mul;
use crate::triangular::{solve_tril, solve_triu};

/// Blocked factorization falls back to [`cho`] below this size.
const CHO_BLOCK_CUTOFF: usize = 8;

/// Lower triangular `L` with `A = L·Lᵀ`, computed row by row.
///
/// # Errors
///
/// Returns [`MatError::NotPositiveDefinite`] if a pivot is not certified
/// positive.
///
/// # Panics
///
/// Panics if the matrix is not square.
pub fn cho(a: &ArbMat, prec: u64) -> Result<ArbMat> {
    assert!(a.is_square(), "cholesky of a non-square matrix");
    let n = a.num_rows();
    let mut l = ArbMat::zeros(n, n);
    for i in 0..n {
        for j in 0..=i {
            let terms = l.row(i)[..j].iter().zip(&l.row(j)[..j]);
            let s = Arb::dot(Some(&a[(i, j)]), true, terms, prec);
            let v = if i == j {
                if !s.is_positive() {
                    trace!(i, prec, "pivot not certified positive");
                    return Err(MatError::NotPositiveDefinite { prec });
                }
                s.sqrtpos(prec)
            } else {
                s.div(&l[(j, j)], prec)
            };
            l[(i, j)] = v;
        }
    }
    Ok(l)
}

/// Blocked Cholesky factorization through the Schur complement of the
/// leading block.
///
/// # Errors
///
/// Returns [`MatError::NotPositiveDefinite`] if a pivot is not certified
/// positive.
///
/// # Panics
///
/// Panics if the matrix is not square.
pub fn cho_blocked(a: &ArbMat, prec: u64) -> Result<ArbMat> {
    assert!(a.is_square(), "cholesky of a non-square matrix");
    let n = a.num_rows();
    if n < CHO_BLOCK_CUTOFF {
        return cho(a, prec);
    }
    let r = n / 2;
    let l11 = cho_blocked(&a.window(0, 0, r, r).to_mat(), prec)?;
    // L21 = A21·L11⁻ᵀ
    let a21 = a.window(r, 0, n, r).to_mat();
    let l21 = solve_tril(&l11, &a21.transpose(), false, prec).transpose();
    let schur = a
        .window(r, r, n, n)
        .to_mat()
        .sub(&mul(&l21, &l21.transpose(), prec), prec);
    let l22 = cho_blocked(&schur, prec)?;
    Ok(ArbMat::from_fn(n, n, |i, j| match (i < r, j < r) {
        (true, true) => l11[(i, j)].clone(),
        (false, true) => l21[(i - r, j)].clone(),
        (false, false) => l22[(i - r, j - r)].clone(),
        (true, false) => Arb::zero(),
    }))
}

/// Solves `L·Lᵀ·X = B`.
///
/// # Panics
///
/// Panics if the dimensions do not match.
#[must_use]
pub fn solve_cho_precomp(l: &ArbMat, b: &ArbMat, prec: u64) -> ArbMat {
    let y = solve_tril(l, b, false, prec);
    solve_triu(&l.transpose(), &y, false, prec)
}

/// Encloses `(L·Lᵀ)⁻¹`, filling the symmetric result from the bottom
/// right corner.
///
/// # Panics
///
/// Panics if `l` is not square.
#[must_use]
pub fn inv_cho_precomp(l: &ArbMat, prec: u64) -> ArbMat {
    assert!(l.is_square(), "cholesky factor must be square");
    let n = l.num_rows();
    let u: Vec<Arb> = (0..n).map(|i| Arb::one().div(&l[(i, i)], prec)).collect();
    let mut x = ArbMat::zeros(n, n);
    for i in (0..n).rev() {
        for j in (i..n).rev() {
            let init = if i == j { u[i].clone() } else { Arb::zero() };
            let terms = (i + 1..n).map(|k| (&l[(k, i)], &x[(k, j)]));
            let s = Arb::dot(Some(&init), true, terms, prec).mul(&u[i], prec);
            x[(j, i)] = s.clone();
            x[(i, j)] = s;
        }
    }
    x
}

/// Solves `A·X = B` for symmetric positive definite `A`.
///
/// # Errors
///
/// Returns [`MatError::NotPositiveDefinite`] if `A` is not certified
/// positive definite.
///
/// # Panics
///
/// Panics if the dimensions do not match.
pub fn spd_solve(a: &ArbMat, b: &ArbMat, prec: u64) -> Result<ArbMat> {
    assert_eq!(a.num_rows(), b.num_rows(), "right-hand side row count mismatch");
    let l = cho_blocked(a, prec)?;
    Ok(solve_cho_precomp(&l, b, prec))
}

/// Encloses `A⁻¹` for symmetric positive definite `A`.
///
/// # Errors
///
/// Returns [`MatError::NotPositiveDefinite`] if `A` is not certified
/// positive definite.
///
/// # Panics
///
/// Panics if the matrix is not square.
pub fn spd_inv(a: &ArbMat, prec: u64) -> Result<ArbMat> {
    let l = cho_blocked(a, prec)?;
    Ok(inv_cho_precomp(&l, prec))
}

/// Encloses `det A` for symmetric positive definite `A`.
///
/// # Errors
///
/// Returns [`MatError::NotPositiveDefinite`] if `A` is not certified
/// positive definite.
///
/// # Panics
///
/// Panics if the matrix is not square.
pub fn spd_det(a: &ArbMat, prec: u64) -> Result<Arb> {
    let l = cho_blocked(a, prec)?;
    Ok(diag_prod(&l, prec).sqr(prec))
}

/// Encloses `log det A` for symmetric positive definite `A`.
///
/// # Errors
///
/// Returns [`MatError::NotPositiveDefinite`] if `A` is not certified
/// positive definite.
///
/// # Panics
///
/// Panics if the matrix is not square.
pub fn spd_logdet(a: &ArbMat, prec: u64) -> Result<Arb> {
    let l = cho_blocked(a, prec)?;
    let sum = (0..l.num_rows()).fold(Arb::zero(), |acc, i| acc.add(&l[(i, i)].log(prec), prec));
    Ok(sum.mul_2exp(1))
}
