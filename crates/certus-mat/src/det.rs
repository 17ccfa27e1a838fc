//! Determinants.

use std::iter;

use certus_ball::Arb;
use tracing::debug;

use crate::charpoly::diag_prod;
use crate::dense::ArbMat;
use crate::lu::{approx_lu, gauss_partial, hadamard_bound};
use crate::mul::mul;
use crate::perm::{parity, permute_rows};
use crate::triangular::{approx_solve_tril, approx_solve_triu};

/// Determinant by Gaussian elimination.
///
/// If elimination stalls at rank `r < n`, the product of the `r` pivots is
/// multiplied by `[0 ± h]`, where `h` is the Hadamard bound of the trailing
/// unreduced block. The result is always a valid enclosure.
///
/// # Panics
///
/// Panics if the matrix is not square.
#[must_use]
pub fn det_lu(a: &ArbMat, prec: u64) -> Arb {
    assert!(a.is_square(), "determinant of a non-square matrix");
    let n = a.num_rows();
    if n == 0 {
        return Arb::one();
    }
    let mut t = a.clone();
    let rank = gauss_partial(&mut t, prec);
    let r = rank.unsigned_abs();
    let mut d = diag_prod(&t.window(0, 0, r, r).to_mat(), prec);
    if r < n {
        debug!(n, r, "elimination stalled, bounding trailing block");
        d = d.mul(&Arb::zero_pm(hadamard_bound(&t, r)), prec);
    }
    if rank < 0 {
        d.neg()
    } else {
        d
    }
}

/// Determinant by approximate LU preconditioning.
///
/// With approximate inverses `L⁻¹` and `U⁻¹` of the factors of `A = P·L·U`,
/// `det(A) = ±det(L⁻¹·Pᵀ·A·U⁻¹) / det(U⁻¹)`; the preconditioned matrix is
/// close to the identity and its determinant is computed with [`det_lu`].
/// A result containing zero is compared with the direct [`det_lu`] and the
/// narrower one is kept.
///
/// # Panics
///
/// Panics if the matrix is not square.
#[must_use]
pub fn det_precond(a: &ArbMat, prec: u64) -> Arb {
    assert!(a.is_square(), "determinant of a non-square matrix");
    let n = a.num_rows();
    if n == 0 {
        return Arb::one();
    }
    let Ok((perm, lu)) = approx_lu(a, prec) else {
        debug!(n, prec, "approximate lu failed, using elimination");
        return det_lu(a, prec);
    };
    let id = ArbMat::identity(n);
    let l_inv = approx_solve_tril(&lu, &id, true, prec);
    let u_inv = approx_solve_triu(&lu, &id, false, prec);

    let m = mul(&mul(&l_inv, &permute_rows(a, &perm), prec), &u_inv, prec);
    let mut d = det_lu(&m, prec).div(&diag_prod(&u_inv, prec), prec);
    if parity(&perm) {
        d = d.neg();
    }
    if d.contains_zero() {
        let direct = det_lu(a, prec);
        if direct.rad() < d.rad() {
            d = direct;
        }
    }
    d
}

/// `a·d − b·c` with the first product kept exact for `prec`-bit inputs.
fn det2(a: &Arb, b: &Arb, c: &Arb, d: &Arb, prec: u64) -> Arb {
    let ad = Arb::dot(None, false, iter::once((a, d)), 2 * prec + 64);
    Arb::dot(Some(&ad), true, iter::once((b, c)), prec)
}

fn det3(a: &ArbMat, prec: u64) -> Arb {
    let wp = prec + 32;
    let m0 = det2(&a[(1, 1)], &a[(1, 2)], &a[(2, 1)], &a[(2, 2)], wp);
    let m1 = det2(&a[(1, 0)], &a[(1, 2)], &a[(2, 0)], &a[(2, 2)], wp);
    let m2 = det2(&a[(1, 0)], &a[(1, 1)], &a[(2, 0)], &a[(2, 1)], wp);
    let plus = Arb::dot(None, false, [(&a[(0, 0)], &m0), (&a[(0, 2)], &m2)], wp);
    Arb::dot(Some(&plus), true, iter::once((&a[(0, 1)], &m1)), prec)
}

/// Encloses the determinant, choosing a method by size and precision.
///
/// # Panics
///
/// Panics if the matrix is not square.
#[must_use]
pub fn det(a: &ArbMat, prec: u64) -> Arb {
    assert!(a.is_square(), "determinant of a non-square matrix");
    let n = a.num_rows();
    match n {
        0 => return Arb::one(),
        1 => return a[(0, 0)].round(prec),
        2 => return det2(&a[(0, 0)], &a[(0, 1)], &a[(1, 0)], &a[(1, 1)], prec),
        _ => {}
    }
    if !a.is_finite() {
        return Arb::indeterminate();
    }
    if a.is_tril() || a.is_triu() {
        return diag_prod(a, prec);
    }
    if n == 3 {
        return det3(a, prec);
    }
    if n <= 10 || prec > 10 * n as u64 {
        det_lu(a, prec)
    } else {
        debug!(n, prec, "preconditioned determinant");
        det_precond(a, prec)
    }
}
