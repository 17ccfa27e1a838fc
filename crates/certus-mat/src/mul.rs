//! Ball matrix multiplication.
//!
//! Three strategies compute the same enclosure with different costs:
//! the classical triple loop of ball dot products, a rayon fork-join over
//! contiguous output chunks, and the exponent-aware block algorithm in
//! [`crate::mul_block`]. [`mul`] picks one from the shape and precision.

use certus_ball::{Arb, Arf};
use rayon::prelude::*;
use tracing::debug;

use crate::dense::{with_scratch, ArbMat};
use crate::mul_block::mul_block_with;
use crate::rad_mag::RadMagConfig;

/// Configuration for multiplication dispatch and block multiplication.
#[derive(Clone, Debug)]
pub struct MulConfig {
    /// Shared-dimension blocks shorter than this use midpoint dot products.
    pub min_block_size: usize,
    /// Inputs with longer midpoint mantissas use classical multiplication.
    pub max_bits: u64,
    /// Density below which sparse inputs may avoid block multiplication.
    pub density_cutoff: f64,
    /// Height above which sparse inputs avoid block multiplication.
    pub height_cutoff: f64,
    /// Memory budget in bytes for one block's fixed-point copies.
    pub memory_cutoff: f64,
    /// `rows·inner·cols·prec` above which small products are threaded.
    pub threaded_cost_threshold: f64,
    /// Dimension at or below which block multiplication is skipped, for
    /// precisions up to 128 bits, up to 1024 bits, and beyond.
    pub block_cutoffs: [usize; 3],
    /// Worker count for threaded multiplication; `None` uses rayon's pool.
    pub threads: Option<usize>,
    /// Radius product tuning.
    pub rad_mag: RadMagConfig,
}

impl Default for MulConfig {
    fn default() -> Self {
        Self {
            min_block_size: 30,
            max_bits: 8000,
            density_cutoff: 0.1,
            height_cutoff: 1024.0,
            memory_cutoff: 2e9,
            threaded_cost_threshold: 100_000.0,
            block_cutoffs: [120, 60, 40],
            threads: None,
            rad_mag: RadMagConfig::default(),
        }
    }
}

impl MulConfig {
    /// Dimension cutoff for block multiplication at `prec` bits.
    #[must_use]
    pub fn block_cutoff(&self, prec: u64) -> usize {
        if prec <= 128 {
            self.block_cutoffs[0]
        } else if prec <= 1024 {
            self.block_cutoffs[1]
        } else {
            self.block_cutoffs[2]
        }
    }

    /// Number of worker threads for threaded multiplication.
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.threads.unwrap_or_else(rayon::current_num_threads).max(1)
    }
}

fn check_dims(a: &ArbMat, b: &ArbMat) {
    assert_eq!(
        a.num_cols(),
        b.num_rows(),
        "incompatible dimensions: {}x{} times {}x{}",
        a.num_rows(),
        a.num_cols(),
        b.num_rows(),
        b.num_cols()
    );
}

/// Column `j` of `b` as a vector of references.
pub(crate) fn columns(b: &ArbMat) -> Vec<Vec<&Arb>> {
    (0..b.num_cols())
        .map(|j| (0..b.num_rows()).map(|k| &b[(k, j)]).collect())
        .collect()
}

fn entry_dot(row: &[Arb], col: &[&Arb], prec: u64) -> Arb {
    Arb::dot(None, false, row.iter().zip(col.iter().copied()), prec)
}

/// Classical multiplication: each entry is one ball dot product.
///
/// # Panics
///
/// Panics if the inner dimensions differ.
#[must_use]
pub fn mul_classical(a: &ArbMat, b: &ArbMat, prec: u64) -> ArbMat {
    check_dims(a, b);
    let cols = columns(b);
    ArbMat::from_fn(a.num_rows(), b.num_cols(), |i, j| {
        entry_dot(a.row(i), &cols[j], prec)
    })
}

/// Multithreaded classical multiplication.
///
/// The larger of the output row and column counts is split into
/// `threads` contiguous chunks, each computed by one rayon task.
///
/// # Panics
///
/// Panics if the inner dimensions differ.
#[must_use]
pub fn mul_threaded(a: &ArbMat, b: &ArbMat, prec: u64, threads: usize) -> ArbMat {
    check_dims(a, b);
    let (m, p) = (a.num_rows(), b.num_cols());
    if m == 0 || p == 0 {
        return ArbMat::zeros(m, p);
    }
    let cols = columns(b);
    let threads = threads.max(1);

    if m >= p {
        let chunk = m.div_ceil(threads);
        let starts: Vec<usize> = (0..m).step_by(chunk).collect();
        let blocks: Vec<Vec<Vec<Arb>>> = starts
            .par_iter()
            .map(|&r0| {
                (r0..(r0 + chunk).min(m))
                    .map(|i| cols.iter().map(|col| entry_dot(a.row(i), col, prec)).collect())
                    .collect()
            })
            .collect();
        ArbMat::from_rows(blocks.into_iter().flatten().collect())
    } else {
        let chunk = p.div_ceil(threads);
        let starts: Vec<usize> = (0..p).step_by(chunk).collect();
        // blocks[t][j - start][i]
        let blocks: Vec<Vec<Vec<Arb>>> = starts
            .par_iter()
            .map(|&c0| {
                cols[c0..(c0 + chunk).min(p)]
                    .iter()
                    .map(|col| (0..m).map(|i| entry_dot(a.row(i), col, prec)).collect())
                    .collect()
            })
            .collect();
        let by_column: Vec<Vec<Arb>> = blocks.into_iter().flatten().collect();
        ArbMat::from_fn(m, p, |i, j| by_column[j][i].clone())
    }
}

/// Multiplies two ball matrices, choosing a strategy from the shape and
/// precision with the default configuration.
///
/// # Panics
///
/// Panics if the inner dimensions differ.
#[must_use]
pub fn mul(a: &ArbMat, b: &ArbMat, prec: u64) -> ArbMat {
    mul_with(&MulConfig::default(), a, b, prec)
}

/// [`mul`] with explicit configuration.
///
/// # Panics
///
/// Panics if the inner dimensions differ.
#[must_use]
pub fn mul_with(config: &MulConfig, a: &ArbMat, b: &ArbMat, prec: u64) -> ArbMat {
    check_dims(a, b);
    let (m, n, p) = (a.num_rows(), a.num_cols(), b.num_cols());
    let cutoff = config.block_cutoff(prec);

    if m <= cutoff || n <= cutoff || p <= cutoff {
        let threads = config.num_threads();
        let cost = m as f64 * n as f64 * p as f64 * prec as f64;
        if threads > 1 && cost > config.threaded_cost_threshold {
            debug!(m, n, p, prec, threads, "threaded multiplication");
            mul_threaded(a, b, prec, threads)
        } else {
            mul_classical(a, b, prec)
        }
    } else {
        debug!(m, n, p, prec, "block multiplication");
        mul_block_with(config, a, b, prec)
    }
}

/// `a ← a · b`, computed via a scratch matrix.
///
/// # Panics
///
/// Panics if the inner dimensions differ.
pub fn mul_assign_right(a: &mut ArbMat, b: &ArbMat, prec: u64) {
    with_scratch(a, |a| mul(a, b, prec));
}

/// `b ← a · b`, computed via a scratch matrix.
///
/// # Panics
///
/// Panics if the inner dimensions differ.
pub fn mul_assign_left(a: &ArbMat, b: &mut ArbMat, prec: u64) {
    with_scratch(b, |b| mul(a, b, prec));
}

/// Squares a square matrix, computing each product `a_ik·a_ki` once.
///
/// Diagonal entries collect `a_ii² + Σ_{k≠i} a_ik·a_ki`; each off-diagonal
/// entry starts from `(a_ii + a_jj)·a_ij` and adds the remaining products.
///
/// # Panics
///
/// Panics if the matrix is not square.
#[must_use]
pub fn sqr_classical(a: &ArbMat, prec: u64) -> ArbMat {
    assert!(a.is_square(), "cannot square a non-square matrix");
    let n = a.num_rows();
    let mut b = ArbMat::zeros(n, n);
    if n == 0 {
        return b;
    }
    if n == 1 {
        b[(0, 0)] = a[(0, 0)].sqr(prec);
        return b;
    }

    for i in 0..n {
        b[(i, i)] = a[(i, i)].sqr(prec);
    }
    for i in 1..n {
        for k in 0..i {
            let p = a[(i, k)].mul(&a[(k, i)], prec);
            b[(i, i)] = b[(i, i)].add(&p, prec);
            b[(k, k)] = b[(k, k)].add(&p, prec);
        }
    }

    let cols = columns(a);
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let diag = a[(i, i)].add(&a[(j, j)], prec);
            let init = diag.mul(&a[(i, j)], prec);
            let terms = a
                .row(i)
                .iter()
                .zip(cols[j].iter().copied())
                .enumerate()
                .filter(|&(k, _)| k != i && k != j)
                .map(|(_, t)| t);
            b[(i, j)] = Arb::dot(Some(&init), false, terms, prec);
        }
    }
    b
}

/// Squares a square matrix.
///
/// # Panics
///
/// Panics if the matrix is not square.
#[must_use]
pub fn sqr(a: &ArbMat, prec: u64) -> ArbMat {
    assert!(a.is_square(), "cannot square a non-square matrix");
    if a.num_rows() <= MulConfig::default().block_cutoff(prec) {
        sqr_classical(a, prec)
    } else {
        mul(a, a, prec)
    }
}

/// `a ← a²`.
///
/// # Panics
///
/// Panics if the matrix is not square.
pub fn sqr_in_place(a: &mut ArbMat, prec: u64) {
    with_scratch(a, |a| sqr(a, prec));
}

/// `a^e` by binary powering.
///
/// # Panics
///
/// Panics if the matrix is not square.
#[must_use]
pub fn pow_ui(a: &ArbMat, e: u64, prec: u64) -> ArbMat {
    assert!(a.is_square(), "cannot raise a non-square matrix to a power");
    let n = a.num_rows();
    match e {
        0 => return ArbMat::identity(n),
        1 => return a.round(prec),
        2 => return sqr(a, prec),
        _ => {}
    }
    let mut result = a.clone();
    for bit in (0..(63 - e.leading_zeros())).rev() {
        result = sqr(&result, prec);
        if (e >> bit) & 1 == 1 {
            result = mul(&result, a, prec);
        }
    }
    result
}

/// Midpoint-only product; the result has zero radii and no guarantee.
///
/// # Panics
///
/// Panics if the inner dimensions differ.
#[must_use]
pub fn approx_mul(a: &ArbMat, b: &ArbMat, prec: u64) -> ArbMat {
    check_dims(a, b);
    let cols = columns(b);
    ArbMat::from_fn(a.num_rows(), b.num_cols(), |i, j| {
        let terms = a
            .row(i)
            .iter()
            .zip(cols[j].iter())
            .map(|(x, y)| (x.mid(), y.mid()));
        Arb::from_arf(Arf::dot_approx(None, false, terms, prec))
    })
}
