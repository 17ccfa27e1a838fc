//! Linear systems and inverses.
//!
//! Two routes are available. The direct route factors `A` rigorously and
//! substitutes. The preconditioned route computes an approximate inverse
//! `R` and approximate solution `T` with midpoint arithmetic, then either
//! certifies `T` with a residual bound or solves the better conditioned
//! system `R·A·X = R·B` rigorously.

use certus_ball::Arb;
use tracing::debug;

use crate::dense::ArbMat;
use crate::error::{MatError, Result};
use crate::lu::{approx_lu, lu};
use crate::mul::mul;
use crate::perm::permute_rows;
use crate::triangular::{approx_solve_tril, approx_solve_triu, solve_tril, solve_triu};

fn check_system(a: &ArbMat, b: &ArbMat) {
    assert!(a.is_square(), "coefficient matrix must be square");
    assert_eq!(a.num_rows(), b.num_rows(), "right-hand side row count mismatch");
}

/// Solves `A·X = B` from a packed factorization `A = P·L·U`.
///
/// # Panics
///
/// Panics if the dimensions do not match.
#[must_use]
pub fn solve_lu_precomp(perm: &[usize], lu: &ArbMat, b: &ArbMat, prec: u64) -> ArbMat {
    check_system(lu, b);
    let pb = permute_rows(b, perm);
    let y = solve_tril(lu, &pb, true, prec);
    solve_triu(lu, &y, false, prec)
}

/// Solves `A·X = B` by rigorous LU factorization.
///
/// # Errors
///
/// Returns [`MatError::Singular`] if `A` could not be certified
/// invertible at this precision.
///
/// # Panics
///
/// Panics if the dimensions do not match.
pub fn solve_lu(a: &ArbMat, b: &ArbMat, prec: u64) -> Result<ArbMat> {
    check_system(a, b);
    if a.is_empty() {
        return Ok(ArbMat::zeros(0, b.num_cols()));
    }
    let (perm, lu) = lu(a, prec)?;
    Ok(solve_lu_precomp(&perm, &lu, b, prec))
}

/// Certifies an approximate solution `T` of `A·X = B` using an
/// approximate inverse `R`.
///
/// With `E = I − R·A` and `‖E‖∞ < 1`, column `j` of the result is the
/// midpoint of `T_j` widened by `‖R·(B − A·T)_j‖∞ / (1 − ‖E‖∞)`.
///
/// # Errors
///
/// Returns [`MatError::NotCertified`] if `‖E‖∞` is not below one.
///
/// # Panics
///
/// Panics if the dimensions do not match.
pub fn solve_preapprox(
    a: &ArbMat,
    b: &ArbMat,
    r: &ArbMat,
    t: &ArbMat,
    prec: u64,
) -> Result<ArbMat> {
    check_system(a, b);
    let n = a.num_rows();
    assert_eq!((r.num_rows(), r.num_cols()), (n, n), "preconditioner shape mismatch");
    assert_eq!((t.num_rows(), t.num_cols()), (n, b.num_cols()), "approximate solution shape mismatch");

    let e = ArbMat::identity(n).sub(&mul(r, a, prec), prec);
    let e_norm = e.bound_inf_norm();
    let contraction = e_norm.geom_series();
    if !contraction.is_finite() {
        debug!(e_norm = e_norm.to_f64(), "preconditioner does not contract");
        return Err(MatError::NotCertified { prec });
    }

    let t_mid = t.get_mid();
    let residual = b.sub(&mul(a, &t_mid, prec), prec);
    let u = mul(r, &residual, prec);
    let mut x = t_mid;
    for j in 0..b.num_cols() {
        let col_norm = (0..n).map(|i| u[(i, j)].mag()).max().unwrap_or_default();
        let err = col_norm.mul(&contraction);
        for i in 0..n {
            x[(i, j)].add_error(&err);
        }
    }
    Ok(x)
}

/// Solves `A·X = B` through an approximate factorization and a residual
/// certificate, falling back to rigorous elimination.
///
/// # Errors
///
/// Returns [`MatError::Singular`] if every route fails.
///
/// # Panics
///
/// Panics if the dimensions do not match.
pub fn solve_precond(a: &ArbMat, b: &ArbMat, prec: u64) -> Result<ArbMat> {
    check_system(a, b);
    let n = a.num_rows();
    if n == 0 {
        return Ok(ArbMat::zeros(0, b.num_cols()));
    }
    let Ok((perm, lu)) = approx_lu(a, prec) else {
        debug!(n, prec, "approximate lu failed, solving directly");
        return solve_lu(a, b, prec);
    };
    let t = approx_solve_lu_precomp(&perm, &lu, b, prec);
    let r = approx_solve_lu_precomp(&perm, &lu, &ArbMat::identity(n), prec);
    match solve_preapprox(a, b, &r, &t, prec) {
        Ok(x) => Ok(x),
        Err(err) => {
            debug!(n, prec, %err, "residual certificate failed, preconditioning");
            solve_lu(&mul(&r, a, prec), &mul(&r, b, prec), prec)
        }
    }
}

/// Solves `A·X = B`, choosing between direct and preconditioned solving.
///
/// # Errors
///
/// Returns a [`MatError`] if the solution could not be certified at this
/// precision.
///
/// # Panics
///
/// Panics if the dimensions do not match.
pub fn solve(a: &ArbMat, b: &ArbMat, prec: u64) -> Result<ArbMat> {
    let n = a.num_rows();
    if n <= 4 || prec > 10 * n as u64 {
        solve_lu(a, b, prec)
    } else {
        solve_precond(a, b, prec)
    }
}

/// `B ← A⁻¹·B`. On failure `B` is left unchanged.
///
/// # Errors
///
/// Propagates the failure of [`solve`].
pub fn solve_in_place(a: &ArbMat, b: &mut ArbMat, prec: u64) -> Result<()> {
    *b = solve(a, b, prec)?;
    Ok(())
}

/// Midpoint-only substitution with a packed approximate factorization.
///
/// # Panics
///
/// Panics if the dimensions do not match.
#[must_use]
pub fn approx_solve_lu_precomp(perm: &[usize], lu: &ArbMat, b: &ArbMat, prec: u64) -> ArbMat {
    check_system(lu, b);
    let pb = permute_rows(&b.get_mid(), perm);
    let y = approx_solve_tril(lu, &pb, true, prec);
    approx_solve_triu(lu, &y, false, prec)
}

/// Midpoint-only solution of `A·X = B`, with no error bound.
///
/// # Errors
///
/// Returns [`MatError::Singular`] if a column has no nonzero midpoint
/// pivot.
///
/// # Panics
///
/// Panics if the dimensions do not match.
pub fn approx_solve(a: &ArbMat, b: &ArbMat, prec: u64) -> Result<ArbMat> {
    check_system(a, b);
    if a.is_empty() {
        return Ok(ArbMat::zeros(0, b.num_cols()));
    }
    let (perm, lu) = approx_lu(a, prec)?;
    Ok(approx_solve_lu_precomp(&perm, &lu, b, prec))
}

/// Midpoint-only inverse.
///
/// # Errors
///
/// Returns [`MatError::Singular`] if a column has no nonzero midpoint
/// pivot.
///
/// # Panics
///
/// Panics if `a` is not square.
pub fn approx_inv(a: &ArbMat, prec: u64) -> Result<ArbMat> {
    approx_solve(a, &ArbMat::identity(a.num_rows()), prec)
}

/// Encloses `A⁻¹`.
///
/// # Errors
///
/// Returns a [`MatError`] if `A` could not be certified invertible.
///
/// # Panics
///
/// Panics if `a` is not square.
pub fn inv(a: &ArbMat, prec: u64) -> Result<ArbMat> {
    assert!(a.is_square(), "cannot invert a non-square matrix");
    let n = a.num_rows();
    if n == 1 {
        let x = &a[(0, 0)];
        if !x.is_nonzero() {
            return Err(MatError::Singular { prec });
        }
        return Ok(ArbMat::from_rows(vec![vec![Arb::one().div(x, prec)]]));
    }
    solve(a, &ArbMat::identity(n), prec)
}

/// `A ← A⁻¹`. On failure `A` is left unchanged.
///
/// # Errors
///
/// Propagates the failure of [`inv`].
pub fn inv_in_place(a: &mut ArbMat, prec: u64) -> Result<()> {
    *a = inv(a, prec)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use certus_exact::RatMat;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_solve_lu_contains_exact() {
        let mut rng = ChaCha8Rng::seed_from_u64(41);
        let qa = RatMat::random_integer(&mut rng, 6, 6, 10);
        let qb = RatMat::random_integer(&mut rng, 6, 2, 10);
        let exact = qa.solve(&qb).unwrap();
        let a = ArbMat::from_rat_mat(&qa, 128);
        let b = ArbMat::from_rat_mat(&qb, 128);
        let x = solve_lu(&a, &b, 128).unwrap();
        assert!(x.contains_rat_mat(&exact));
    }

    #[test]
    fn test_preapprox_certifies() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let qa = RatMat::random_integer(&mut rng, 15, 15, 10);
        let qb = RatMat::random_integer(&mut rng, 15, 3, 10);
        let exact = qa.solve(&qb).unwrap();
        let a = ArbMat::from_rat_mat(&qa, 100);
        let b = ArbMat::from_rat_mat(&qb, 100);
        let r = approx_inv(&a, 100).unwrap();
        let t = approx_solve(&a, &b, 100).unwrap();
        let x = solve_preapprox(&a, &b, &r, &t, 100).unwrap();
        assert!(x.contains_rat_mat(&exact));
    }

    #[test]
    fn test_preapprox_rejects_bad_preconditioner() {
        let a = ArbMat::from_i64_rows(&[vec![2, 1], vec![1, 3]]);
        let b = ArbMat::identity(2);
        let r = ArbMat::zeros(2, 2);
        assert_eq!(
            solve_preapprox(&a, &b, &r, &b, 64),
            Err(MatError::NotCertified { prec: 64 })
        );
    }

    #[test]
    fn test_solve_precond_contains_exact() {
        let mut rng = ChaCha8Rng::seed_from_u64(43);
        let qa = RatMat::random_integer(&mut rng, 20, 20, 8);
        let qb = RatMat::random_integer(&mut rng, 20, 1, 8);
        let exact = qa.solve(&qb).unwrap();
        let a = ArbMat::from_rat_mat(&qa, 64);
        let b = ArbMat::from_rat_mat(&qb, 64);
        assert!(solve_precond(&a, &b, 64).unwrap().contains_rat_mat(&exact));
        assert!(solve(&a, &b, 64).unwrap().contains_rat_mat(&exact));
    }

    #[test]
    fn test_singular_never_solved() {
        let a = ArbMat::from_i64_rows(&[vec![1, 2], vec![2, 4]]);
        let b = ArbMat::identity(2);
        for prec in [32, 128, 1024] {
            assert!(solve(&a, &b, prec).is_err());
            assert!(inv(&a, prec).is_err());
        }
        let big = ArbMat::ones(12, 12);
        assert!(solve_precond(&big, &ArbMat::identity(12), 64).is_err());
    }

    #[test]
    fn test_inverse_of_inverse() {
        let mut rng = ChaCha8Rng::seed_from_u64(44);
        let q = RatMat::random_integer(&mut rng, 5, 5, 6);
        let a = ArbMat::from_rat_mat(&q, 256);
        let ai = inv(&a, 256).unwrap();
        assert!(ai.contains_rat_mat(&q.inverse().unwrap()));
        assert!(inv(&ai, 256).unwrap().overlaps(&a));
    }

    #[test]
    fn test_scalar_and_empty() {
        let x = ArbMat::from_i64_rows(&[vec![4]]);
        let xi = inv(&x, 64).unwrap();
        assert!(xi[(0, 0)].contains(&Arb::pow2(-2)));
        assert!(inv(&ArbMat::zeros(1, 1), 64).is_err());
        assert!(inv(&ArbMat::zeros(0, 0), 64).unwrap().is_empty());
    }

    #[test]
    fn test_in_place() {
        let a = ArbMat::from_i64_rows(&[vec![2, 0], vec![0, 4]]);
        let mut m = a.clone();
        inv_in_place(&mut m, 64).unwrap();
        let mut b = ArbMat::from_i64_rows(&[vec![2], vec![4]]);
        solve_in_place(&a, &mut b, 64).unwrap();
        assert!(b.contains(&ArbMat::ones(2, 1)));
        assert!(m[(1, 1)].contains(&Arb::pow2(-2)));
    }
}
