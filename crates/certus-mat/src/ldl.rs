//! `L·D·Lᵀ` factorization of symmetric positive definite matrices.
//!
//! The factorization is stored packed: the strictly lower part holds the
//! unit lower factor `L` and the diagonal holds `D`. Only the lower triangle
//! of the input is read.

use certus_ball::Arb;
use tracing::trace;

use crate::dense::ArbMat;
use crate::error::{MatError, Result};
use crate::triangular::{solve_tril, solve_triu};

fn check_pivot(d: &Arb, i: usize, prec: u64) -> Result<()> {
    if d.is_positive() {
        Ok(())
    } else {
        trace!(i, prec, "ldl pivot not certified positive");
        Err(MatError::NotPositiveDefinite { prec })
    }
}

/// Row-oriented `L·D·Lᵀ` factorization.
///
/// # Errors
///
/// Returns [`MatError::NotPositiveDefinite`] if some `D_i` is not
/// certified positive.
///
/// # Panics
///
/// Panics if the matrix is not square.
pub fn ldl_inplace(a: &ArbMat, prec: u64) -> Result<ArbMat> {
    assert!(a.is_square(), "ldl of a non-square matrix");
    let n = a.num_rows();
    let mut ld = ArbMat::zeros(n, n);
    for i in 0..n {
        // w_j = L_ij·D_j
        let mut w: Vec<Arb> = Vec::with_capacity(i);
        for j in 0..i {
            let terms = w.iter().zip(&ld.row(j)[..j]);
            let s = Arb::dot(Some(&a[(i, j)]), true, terms, prec);
            ld[(i, j)] = s.div(&ld[(j, j)], prec);
            w.push(s);
        }
        let d = Arb::dot(Some(&a[(i, i)]), true, w.iter().zip(&ld.row(i)[..i]), prec);
        check_pivot(&d, i, prec)?;
        ld[(i, i)] = d;
    }
    Ok(ld)
}

/// Column-oriented `L·D·Lᵀ` factorization.
///
/// # Errors
///
/// Returns [`MatError::NotPositiveDefinite`] if some `D_j` is not
/// certified positive.
///
/// # Panics
///
/// Panics if the matrix is not square.
pub fn ldl_golub_van_loan(a: &ArbMat, prec: u64) -> Result<ArbMat> {
    assert!(a.is_square(), "ldl of a non-square matrix");
    let n = a.num_rows();
    let mut ld = ArbMat::zeros(n, n);
    for j in 0..n {
        // v_k = L_jk·D_k
        let v: Vec<Arb> = (0..j).map(|k| ld[(j, k)].mul(&ld[(k, k)], prec)).collect();
        let d = Arb::dot(Some(&a[(j, j)]), true, ld.row(j)[..j].iter().zip(&v), prec);
        check_pivot(&d, j, prec)?;
        for i in j + 1..n {
            let s = Arb::dot(Some(&a[(i, j)]), true, ld.row(i)[..j].iter().zip(&v), prec);
            ld[(i, j)] = s.div(&d, prec);
        }
        ld[(j, j)] = d;
    }
    Ok(ld)
}

/// `L·D·Lᵀ` factorization with the column-oriented algorithm.
///
/// # Errors
///
/// Returns [`MatError::NotPositiveDefinite`] if some `D_j` is not
/// certified positive.
///
/// # Panics
///
/// Panics if the matrix is not square.
pub fn ldl(a: &ArbMat, prec: u64) -> Result<ArbMat> {
    ldl_golub_van_loan(a, prec)
}

/// Solves `L·D·Lᵀ·X = B` from a packed factorization.
///
/// # Panics
///
/// Panics if the dimensions do not match.
#[must_use]
pub fn solve_ldl_precomp(ld: &ArbMat, b: &ArbMat, prec: u64) -> ArbMat {
    let mut y = solve_tril(ld, b, true, prec);
    for i in 0..y.num_rows() {
        let d = ld[(i, i)].clone();
        for x in y.row_mut(i) {
            *x = x.div(&d, prec);
        }
    }
    solve_triu(&ld.transpose(), &y, true, prec)
}

/// Encloses `(L·D·Lᵀ)⁻¹` from a packed factorization, filling the
/// symmetric result from the bottom right corner.
///
/// # Panics
///
/// Panics if `ld` is not square.
#[must_use]
pub fn inv_ldl_precomp(ld: &ArbMat, prec: u64) -> ArbMat {
    assert!(ld.is_square(), "ldl factor must be square");
    let n = ld.num_rows();
    let mut x = ArbMat::zeros(n, n);
    for i in (0..n).rev() {
        for j in (i..n).rev() {
            let init = if i == j { Arb::one().div(&ld[(i, i)], prec) } else { Arb::zero() };
            let terms = (i + 1..n).map(|k| (&ld[(k, i)], &x[(k, j)]));
            let s = Arb::dot(Some(&init), true, terms, prec);
            x[(j, i)] = s.clone();
            x[(i, j)] = s;
        }
    }
    x
}
