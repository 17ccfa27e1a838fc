//! Trace, diagonal products, characteristic polynomials and companion
//! matrices.

use certus_ball::Arb;

use crate::dense::ArbMat;

/// Sum of the diagonal entries.
///
/// # Panics
///
/// Panics if the matrix is not square.
#[must_use]
pub fn trace(a: &ArbMat, prec: u64) -> Arb {
    assert!(a.is_square(), "trace of a non-square matrix");
    (0..a.num_rows()).fold(Arb::zero(), |acc, i| acc.add(&a[(i, i)], prec))
}

fn product_tree(xs: &[Arb], prec: u64) -> Arb {
    match xs {
        [] => Arb::one(),
        [x] => x.clone(),
        [x, y] => x.mul(y, prec),
        _ => {
            let (lo, hi) = xs.split_at(xs.len() / 2);
            product_tree(lo, prec).mul(&product_tree(hi, prec), prec)
        }
    }
}

/// Product of the diagonal entries by a balanced product tree.
///
/// # Panics
///
/// Panics if the matrix is not square.
#[must_use]
pub fn diag_prod(a: &ArbMat, prec: u64) -> Arb {
    assert!(a.is_square(), "diagonal product of a non-square matrix");
    let diag: Vec<Arb> = (0..a.num_rows()).map(|i| a[(i, i)].clone()).collect();
    product_tree(&diag, prec).round(prec)
}

/// Characteristic polynomial `det(x·I − A)` with coefficients from low to
/// high degree, computed division-free by the Berkowitz algorithm. The
/// leading coefficient is exactly one.
///
/// # Panics
///
/// Panics if the matrix is not square.
#[must_use]
pub fn charpoly(a: &ArbMat, prec: u64) -> Vec<Arb> {
    assert!(a.is_square(), "charpoly of a non-square matrix");
    let n = a.num_rows();
    // high-to-low coefficients for the leading r×r block
    let mut c = vec![Arb::one()];
    for r in 0..n {
        // Toeplitz column: 1, −a_rr, −R·C, −R·A·C, …
        let mut t = Vec::with_capacity(r + 2);
        t.push(Arb::one());
        t.push(a[(r, r)].neg());
        let mut v: Vec<Arb> = (0..r).map(|i| a[(i, r)].clone()).collect();
        for k in 0..r {
            let row = &a.row(r)[..r];
            t.push(Arb::dot(None, true, row.iter().zip(&v), prec));
            if k + 1 < r {
                v = (0..r)
                    .map(|i| Arb::dot(None, false, a.row(i)[..r].iter().zip(&v), prec))
                    .collect();
            }
        }
        c = (0..r + 2)
            .map(|i| {
                let terms = (0..=i.min(r)).map(|j| (&t[i - j], &c[j]));
                Arb::dot(None, false, terms, prec)
            })
            .collect();
    }
    c.reverse();
    c
}

/// Companion matrix of `c_0 + c_1·x + … + c_n·x^n`, whose characteristic
/// polynomial is the monic polynomial `poly / c_n`.
///
/// # Panics
///
/// Panics if the polynomial is constant.
#[must_use]
pub fn companion(poly: &[Arb], prec: u64) -> ArbMat {
    assert!(poly.len() >= 2, "companion matrix needs a nonconstant polynomial");
    let n = poly.len() - 1;
    let lead = &poly[n];
    let mut c = ArbMat::zeros(n, n);
    for i in 0..n - 1 {
        c[(i, i + 1)] = Arb::one();
    }
    for (j, coeff) in poly[..n].iter().enumerate() {
        c[(n - 1, j)] = coeff.div(lead, prec).neg();
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mul::mul_classical;
    use certus_exact::RatMat;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_trace_and_diag_prod() {
        let a = ArbMat::from_i64_rows(&[vec![1, 9, 9], vec![0, 2, 9], vec![0, 0, 3]]);
        assert_eq!(trace(&a, 64), Arb::from_i64(6));
        assert_eq!(diag_prod(&a, 64), Arb::from_i64(6));
        assert!(diag_prod(&ArbMat::zeros(0, 0), 64).is_one());
        let big = ArbMat::from_fn(9, 9, |i, j| if i == j { Arb::from_i64(i as i64 + 1) } else { Arb::zero() });
        assert_eq!(diag_prod(&big, 64), Arb::from_i64(362_880));
    }

    #[test]
    fn test_charpoly_contains_exact() {
        let mut rng = ChaCha8Rng::seed_from_u64(51);
        let q = RatMat::random(&mut rng, 6, 6, 8);
        let exact = q.charpoly();
        let a = ArbMat::from_rat_mat(&q, 128);
        let cp = charpoly(&a, 128);
        assert_eq!(cp.len(), 7);
        assert!(cp[6].is_one());
        for (x, e) in cp.iter().zip(&exact) {
            assert!(x.contains_rational(e));
        }
    }

    #[test]
    fn test_charpoly_of_product_commutes() {
        let mut rng = ChaCha8Rng::seed_from_u64(52);
        let a = ArbMat::randtest(&mut rng, 4, 4, 100, 4);
        let b = ArbMat::randtest(&mut rng, 4, 4, 100, 4);
        let ab = charpoly(&mul_classical(&a, &b, 100), 100);
        let ba = charpoly(&mul_classical(&b, &a, 100), 100);
        for (x, y) in ab.iter().zip(&ba) {
            assert!(x.overlaps(y));
        }
    }

    #[test]
    fn test_companion_roundtrip() {
        // 2·(x − 1)(x − 2)(x − 3) = 2x³ − 12x² + 22x − 12
        let poly: Vec<Arb> = [-12, 22, -12, 2].iter().map(|&c| Arb::from_i64(c)).collect();
        let c = companion(&poly, 64);
        let cp = charpoly(&c, 64);
        let monic: Vec<Arb> = [-6, 11, -6, 1].iter().map(|&c| Arb::from_i64(c)).collect();
        assert_eq!(cp, monic);
    }
}
