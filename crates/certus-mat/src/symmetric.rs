//! Eigenvalues and eigenvectors of real symmetric matrices.
//!
//! Jacobi rotations run on the midpoints until the off-diagonal part is
//! negligible. The approximate eigenpairs `(μ, p)` are then certified from
//! their residuals `(A − μ)·p`: some eigenvalue lies within
//! `‖(A − μ)p‖ / ‖p‖` of `μ`, and once the eigenvalue balls are disjoint
//! the angle between `p` and its eigenvector is at most the residual over
//! the gap to the other eigenvalues.

use certus_ball::{Arb, Arf, Mag};
use tracing::debug;

use crate::dense::ArbMat;
use crate::mul::mul;

/// Sweeps over all `n(n−1)/2` pivot positions before the rotations stop.
const MAX_SWEEPS: usize = 64;

/// Eigendecomposition `A = P·diag(D)·Pᵀ` of a symmetric matrix.
#[derive(Clone, Debug)]
pub struct SymmetricEig {
    /// Eigenvalue enclosures `D`.
    pub values: Vec<Arb>,
    /// `P`, whose column `j` encloses a unit eigenvector for `values[j]`.
    pub vectors: ArbMat,
    /// True if the eigenvalue balls are pairwise disjoint, so each contains
    /// exactly one eigenvalue. Otherwise the eigenvector radii are infinite.
    pub isolated: bool,
}

/// Rotation `U = [[c, s], [−s, c]]` for which `Uᵀ·[[a, b], [b, d]]·U` is
/// diagonal; returns `(c, s)`.
#[must_use]
pub fn twobytwo_diag(a: &Arb, b: &Arb, d: &Arb, prec: u64) -> (Arb, Arb) {
    if b.is_zero() {
        return (Arb::one(), Arb::zero());
    }
    // v = ρ − h with h = (a − d)/2 and ρ = √(b² + h²)
    let h = a.sub(d, prec).mul_2exp(-1);
    let b2 = b.sqr(prec);
    let rho = b2.add(&h.sqr(prec), prec).sqrtpos(prec);
    let v = if h.mid().is_positive() {
        b2.div(&rho.add(&h, prec), prec)
    } else {
        rho.sub(&h, prec)
    };
    let x = v.sqr(prec).add(&b2, prec).sqrtpos(prec);
    (b.div(&x, prec).neg(), v.div(&x, prec))
}

/// `(c·x − s·y, s·x + c·y)` at `prec` bits, with `ms = −s`.
fn rotate(c: &Arf, s: &Arf, ms: &Arf, x: &Arf, y: &Arf, prec: u64) -> (Arf, Arf) {
    (
        Arf::dot_approx(None, false, [(c, x), (ms, y)], prec),
        Arf::dot_approx(None, false, [(s, x), (c, y)], prec),
    )
}

/// Approximate eigenvalues and orthogonal eigenvector matrix of the
/// midpoint matrix by classical Jacobi rotations on the largest
/// off-diagonal entry.
fn rotate_to_diagonal(a: &ArbMat, prec: u64) -> (Vec<Arf>, Vec<Vec<Arf>>) {
    let n = a.num_rows();
    let mut b: Vec<Vec<Arf>> = (0..n)
        .map(|i| a.row(i).iter().map(|x| x.mid().clone()).collect())
        .collect();
    let mut p: Vec<Vec<Arf>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { Arf::one() } else { Arf::zero() }).collect())
        .collect();

    let scale = b
        .iter()
        .flatten()
        .filter(|x| !x.is_zero())
        .map(Arf::exponent)
        .max()
        .unwrap_or(0);
    let cutoff = scale - (prec as f64 * 0.9) as i64;
    let max_rotations = MAX_SWEEPS * n * (n - 1) / 2;

    let mut rotations = 0;
    while rotations < max_rotations {
        let mut pivot: Option<(usize, usize)> = None;
        for i in 0..n {
            for j in i + 1..n {
                if b[i][j].is_zero() {
                    continue;
                }
                if pivot.map_or(true, |(pi, pj)| b[i][j].cmp_abs(&b[pi][pj]).is_gt()) {
                    pivot = Some((i, j));
                }
            }
        }
        let Some((i, j)) = pivot else { break };
        if b[i][j].exponent() < cutoff {
            break;
        }

        let (c, s) = twobytwo_diag(
            &Arb::from_arf(b[i][i].clone()),
            &Arb::from_arf(b[i][j].clone()),
            &Arb::from_arf(b[j][j].clone()),
            2 * prec,
        );
        let (c, s) = (c.mid().clone(), s.mid().clone());
        if s.is_zero() {
            break;
        }
        let ms = s.neg();

        // B ← Gᵀ·B·G and P ← P·G, G acting on coordinates i and j
        for k in 0..n {
            let (x, y) = rotate(&c, &s, &ms, &b[i][k], &b[j][k], prec);
            b[i][k] = x;
            b[j][k] = y;
        }
        for row in b.iter_mut().chain(p.iter_mut()) {
            let (x, y) = rotate(&c, &s, &ms, &row[i], &row[j], prec);
            row[i] = x;
            row[j] = y;
        }
        rotations += 1;
    }
    debug!(n, prec, rotations, "jacobi rotations");

    let d = (0..n).map(|i| b[i][i].clone()).collect();
    (d, p)
}

/// Encloses eigenvalues and unit eigenvectors of a symmetric matrix.
///
/// Every symmetric member of `a` has an eigendecomposition `Q·Λ·Qᵀ` with
/// `Λ` in `values`, and when `isolated` holds also with `Q` in `vectors`.
///
/// # Panics
///
/// Panics if the matrix is not square or not symmetric.
#[must_use]
pub fn jacobi(a: &ArbMat, prec: u64) -> SymmetricEig {
    assert!(a.is_square(), "eigendecomposition of a non-square matrix");
    assert!(*a == a.transpose(), "jacobi rotations need a symmetric matrix");
    let n = a.num_rows();
    if n <= 1 {
        return SymmetricEig {
            values: (0..n).map(|i| a[(i, i)].clone()).collect(),
            vectors: ArbMat::identity(n),
            isolated: true,
        };
    }

    let (d, p) = rotate_to_diagonal(a, prec);
    let mut vectors = ArbMat::from_fn(n, n, |i, j| Arb::from_arf(p[i][j].clone()));

    let mut values = Vec::with_capacity(n);
    let mut residuals = Vec::with_capacity(n);
    let mut lengths = Vec::with_capacity(n);
    for (j, mu) in d.iter().enumerate() {
        let mu = Arb::from_arf(mu.clone());
        let shifted = ArbMat::from_fn(n, n, |r, c| {
            if r == c {
                a[(r, c)].sub(&mu, prec)
            } else {
                a[(r, c)].clone()
            }
        });
        let col = ArbMat::from_fn(n, 1, |r, _| vectors[(r, j)].clone());
        let residual = mul(&shifted, &col, prec).frobenius_norm(prec);
        let length = col.frobenius_norm(prec);
        let mut value = mu;
        value.add_error(&residual.div(&length, prec).mag());
        values.push(value);
        residuals.push(residual.mag());
        lengths.push(length);
    }

    let isolated = (0..n).all(|j| (j + 1..n).all(|k| !values[j].overlaps(&values[k])));
    debug!(n, prec, isolated, "certified symmetric eigenpairs");
    for j in 0..n {
        let err = if isolated {
            let mu = Arb::from_arf(d[j].clone());
            let gap = (0..n)
                .filter(|&k| k != j)
                .map(|k| mu.sub(&values[k], prec).mag_lower())
                .min()
                .unwrap_or(Mag::INF);
            // ‖p − q‖ ≤ |‖p‖ − 1| + √2·‖(A − μ)p‖ / (‖p‖·gap)
            let angle = residuals[j]
                .mul_2exp(1)
                .div(&lengths[j].mag_lower().mul_lower(&gap));
            lengths[j].sub(&Arb::one(), prec).mag().add(&angle)
        } else {
            Mag::INF
        };
        for i in 0..n {
            vectors[(i, j)].add_error(&err);
        }
    }

    SymmetricEig {
        values,
        vectors,
        isolated,
    }
}
