//! Row permutations.
//!
//! A permutation is a vector `perm` with `perm[i]` the original index of
//! row `i`. Factorizations return it so that `A = P·L·U` where
//! `P[perm[i], i] = 1`.

use crate::dense::ArbMat;

/// The identity permutation of length `n`.
#[must_use]
pub fn identity_perm(n: usize) -> Vec<usize> {
    (0..n).collect()
}

/// Returns true if the permutation is odd.
#[must_use]
pub fn parity(perm: &[usize]) -> bool {
    let mut seen = vec![false; perm.len()];
    let mut odd = false;
    for start in 0..perm.len() {
        if seen[start] {
            continue;
        }
        let mut len = 0usize;
        let mut i = start;
        while !seen[i] {
            seen[i] = true;
            i = perm[i];
            len += 1;
        }
        if len % 2 == 0 {
            odd = !odd;
        }
    }
    odd
}

/// The inverse permutation.
#[must_use]
pub fn inverse(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        inv[p] = i;
    }
    inv
}

/// `Pᵀ·A`: row `i` of the result is row `perm[i]` of `a`.
///
/// # Panics
///
/// Panics if the lengths differ.
#[must_use]
pub fn permute_rows(a: &ArbMat, perm: &[usize]) -> ArbMat {
    assert_eq!(perm.len(), a.num_rows(), "permutation length mismatch");
    ArbMat::from_fn(a.num_rows(), a.num_cols(), |i, j| a[(perm[i], j)].clone())
}

/// The permutation matrix `P` with `P[perm[i], i] = 1`.
#[must_use]
pub fn to_matrix(perm: &[usize]) -> ArbMat {
    let n = perm.len();
    let mut p = ArbMat::zeros(n, n);
    for (i, &pi) in perm.iter().enumerate() {
        p[(pi, i)] = certus_ball::Arb::one();
    }
    p
}
