//! Triangular solves `L·X = B` and `U·X = B`.
//!
//! Lower solvers read only the strictly lower part and, unless `unit` is
//! set, the diagonal; upper solvers read only the strictly upper part and
//! the diagonal. A packed LU matrix can therefore be passed to both.

use certus_ball::{Arb, Arf, Round};

use crate::dense::{with_scratch, ArbMat};
use crate::mul::{approx_mul, mul};

/// Size thresholds for switching from recursive to classical solving.
#[derive(Clone, Debug)]
pub struct TriangularConfig {
    /// Rigorous systems smaller than this are solved classically.
    pub cutoff: usize,
    /// Midpoint systems smaller than this are solved classically.
    pub approx_cutoff: usize,
}

impl Default for TriangularConfig {
    fn default() -> Self {
        Self {
            cutoff: 8,
            approx_cutoff: 32,
        }
    }
}

#[derive(Clone, Copy)]
enum Mode {
    Rigorous,
    Approx,
}

impl Mode {
    fn cutoff(self, config: &TriangularConfig) -> usize {
        match self {
            Self::Rigorous => config.cutoff,
            Self::Approx => config.approx_cutoff,
        }
    }

    fn mul(self, a: &ArbMat, b: &ArbMat, prec: u64) -> ArbMat {
        match self {
            Self::Rigorous => mul(a, b, prec),
            Self::Approx => approx_mul(a, b, prec),
        }
    }

    fn sub(self, a: &ArbMat, b: &ArbMat, prec: u64) -> ArbMat {
        match self {
            Self::Rigorous => a.sub(b, prec),
            Self::Approx => a.sub(b, prec).get_mid(),
        }
    }

    /// `(init − Σ aᵢ·bᵢ) / d`, with `d = None` for a unit diagonal.
    fn eliminate<'a, I>(self, init: &Arb, terms: I, d: Option<&Arb>, prec: u64) -> Arb
    where
        I: Iterator<Item = (&'a Arb, &'a Arb)>,
    {
        match self {
            Self::Rigorous => {
                let s = Arb::dot(Some(init), true, terms, prec);
                match d {
                    Some(d) => s.div(d, prec),
                    None => s,
                }
            }
            Self::Approx => {
                let s = Arf::dot_approx(
                    Some(init.mid()),
                    true,
                    terms.map(|(a, b)| (a.mid(), b.mid())),
                    prec,
                );
                let s = match d {
                    Some(d) if d.mid().is_zero() => Arf::zero(),
                    Some(d) => s.div(d.mid(), prec, Round::Near).0,
                    None => s,
                };
                Arb::from_arf(s)
            }
        }
    }
}

fn check_system(t: &ArbMat, b: &ArbMat) {
    assert!(t.is_square(), "triangular matrix must be square");
    assert_eq!(t.num_rows(), b.num_rows(), "right-hand side row count mismatch");
}

fn tril_classical(mode: Mode, l: &ArbMat, b: &ArbMat, unit: bool, prec: u64) -> ArbMat {
    check_system(l, b);
    let (n, m) = (b.num_rows(), b.num_cols());
    let mut x = b.clone();
    for i in 0..n {
        let d = (!unit).then(|| &l[(i, i)]);
        for j in 0..m {
            let terms = (0..i).map(|k| (&l[(i, k)], &x[(k, j)]));
            let v = mode.eliminate(&b[(i, j)], terms, d, prec);
            x[(i, j)] = v;
        }
    }
    x
}

fn triu_classical(mode: Mode, u: &ArbMat, b: &ArbMat, unit: bool, prec: u64) -> ArbMat {
    check_system(u, b);
    let (n, m) = (b.num_rows(), b.num_cols());
    let mut x = b.clone();
    for i in (0..n).rev() {
        let d = (!unit).then(|| &u[(i, i)]);
        for j in 0..m {
            let terms = (i + 1..n).map(|k| (&u[(i, k)], &x[(k, j)]));
            let v = mode.eliminate(&b[(i, j)], terms, d, prec);
            x[(i, j)] = v;
        }
    }
    x
}

fn stack(top: &ArbMat, bottom: &ArbMat) -> ArbMat {
    let r = top.num_rows();
    ArbMat::from_fn(r + bottom.num_rows(), top.num_cols(), |i, j| {
        if i < r {
            top[(i, j)].clone()
        } else {
            bottom[(i - r, j)].clone()
        }
    })
}

fn tril_recursive(
    mode: Mode,
    config: &TriangularConfig,
    l: &ArbMat,
    b: &ArbMat,
    unit: bool,
    prec: u64,
) -> ArbMat {
    check_system(l, b);
    let (n, m) = (b.num_rows(), b.num_cols());
    if n < mode.cutoff(config).max(2) || m == 0 {
        return tril_classical(mode, l, b, unit, prec);
    }
    // [A 0; C D] [X1; X2] = [B1; B2]
    let r = n / 2;
    let a = l.window(0, 0, r, r).to_mat();
    let c = l.window(r, 0, n, r).to_mat();
    let d = l.window(r, r, n, n).to_mat();
    let b1 = b.window(0, 0, r, m).to_mat();
    let b2 = b.window(r, 0, n, m).to_mat();

    let x1 = tril_recursive(mode, config, &a, &b1, unit, prec);
    let rhs = mode.sub(&b2, &mode.mul(&c, &x1, prec), prec);
    let x2 = tril_recursive(mode, config, &d, &rhs, unit, prec);
    stack(&x1, &x2)
}

fn triu_recursive(
    mode: Mode,
    config: &TriangularConfig,
    u: &ArbMat,
    b: &ArbMat,
    unit: bool,
    prec: u64,
) -> ArbMat {
    check_system(u, b);
    let (n, m) = (b.num_rows(), b.num_cols());
    if n < mode.cutoff(config).max(2) || m == 0 {
        return triu_classical(mode, u, b, unit, prec);
    }
    // [A B; 0 D] [X1; X2] = [B1; B2]
    let r = n / 2;
    let a = u.window(0, 0, r, r).to_mat();
    let bb = u.window(0, r, r, n).to_mat();
    let d = u.window(r, r, n, n).to_mat();
    let b1 = b.window(0, 0, r, m).to_mat();
    let b2 = b.window(r, 0, n, m).to_mat();

    let x2 = triu_recursive(mode, config, &d, &b2, unit, prec);
    let rhs = mode.sub(&b1, &mode.mul(&bb, &x2, prec), prec);
    let x1 = triu_recursive(mode, config, &a, &rhs, unit, prec);
    stack(&x1, &x2)
}

/// Solves `L·X = B` by forward substitution.
///
/// # Panics
///
/// Panics if `l` is not square or the row counts differ.
#[must_use]
pub fn solve_tril_classical(l: &ArbMat, b: &ArbMat, unit: bool, prec: u64) -> ArbMat {
    tril_classical(Mode::Rigorous, l, b, unit, prec)
}

/// Solves `U·X = B` by back substitution.
///
/// # Panics
///
/// Panics if `u` is not square or the row counts differ.
#[must_use]
pub fn solve_triu_classical(u: &ArbMat, b: &ArbMat, unit: bool, prec: u64) -> ArbMat {
    triu_classical(Mode::Rigorous, u, b, unit, prec)
}

/// Solves `L·X = B` by splitting into 2×2 blocks, with one multiply
/// and subtract per level.
///
/// # Panics
///
/// Panics if `l` is not square or the row counts differ.
#[must_use]
pub fn solve_tril_recursive(l: &ArbMat, b: &ArbMat, unit: bool, prec: u64) -> ArbMat {
    tril_recursive(Mode::Rigorous, &TriangularConfig::default(), l, b, unit, prec)
}

/// Solves `U·X = B` by splitting into 2×2 blocks.
///
/// # Panics
///
/// Panics if `u` is not square or the row counts differ.
#[must_use]
pub fn solve_triu_recursive(u: &ArbMat, b: &ArbMat, unit: bool, prec: u64) -> ArbMat {
    triu_recursive(Mode::Rigorous, &TriangularConfig::default(), u, b, unit, prec)
}

/// Solves `L·X = B`, choosing the algorithm by size.
///
/// # Panics
///
/// Panics if `l` is not square or the row counts differ.
#[must_use]
pub fn solve_tril(l: &ArbMat, b: &ArbMat, unit: bool, prec: u64) -> ArbMat {
    solve_tril_with(&TriangularConfig::default(), l, b, unit, prec)
}

/// Solves `U·X = B`, choosing the algorithm by size.
///
/// # Panics
///
/// Panics if `u` is not square or the row counts differ.
#[must_use]
pub fn solve_triu(u: &ArbMat, b: &ArbMat, unit: bool, prec: u64) -> ArbMat {
    solve_triu_with(&TriangularConfig::default(), u, b, unit, prec)
}

/// [`solve_tril`] with explicit thresholds.
///
/// # Panics
///
/// Panics if `l` is not square or the row counts differ.
#[must_use]
pub fn solve_tril_with(
    config: &TriangularConfig,
    l: &ArbMat,
    b: &ArbMat,
    unit: bool,
    prec: u64,
) -> ArbMat {
    if b.num_rows() < config.cutoff || b.num_cols() < config.cutoff {
        tril_classical(Mode::Rigorous, l, b, unit, prec)
    } else {
        tril_recursive(Mode::Rigorous, config, l, b, unit, prec)
    }
}

/// [`solve_triu`] with explicit thresholds.
///
/// # Panics
///
/// Panics if `u` is not square or the row counts differ.
#[must_use]
pub fn solve_triu_with(
    config: &TriangularConfig,
    u: &ArbMat,
    b: &ArbMat,
    unit: bool,
    prec: u64,
) -> ArbMat {
    if b.num_rows() < config.cutoff || b.num_cols() < config.cutoff {
        triu_classical(Mode::Rigorous, u, b, unit, prec)
    } else {
        triu_recursive(Mode::Rigorous, config, u, b, unit, prec)
    }
}

/// `B ← L⁻¹·B`.
///
/// # Panics
///
/// Panics if `l` is not square or the row counts differ.
pub fn solve_tril_in_place(l: &ArbMat, b: &mut ArbMat, unit: bool, prec: u64) {
    with_scratch(b, |b| solve_tril(l, b, unit, prec));
}

/// `B ← U⁻¹·B`.
///
/// # Panics
///
/// Panics if `u` is not square or the row counts differ.
pub fn solve_triu_in_place(u: &ArbMat, b: &mut ArbMat, unit: bool, prec: u64) {
    with_scratch(b, |b| solve_triu(u, b, unit, prec));
}

/// Midpoint-only `L⁻¹·B`; radii are ignored and the result carries none.
/// A zero diagonal midpoint yields a zero quotient.
///
/// # Panics
///
/// Panics if `l` is not square or the row counts differ.
#[must_use]
pub fn approx_solve_tril(l: &ArbMat, b: &ArbMat, unit: bool, prec: u64) -> ArbMat {
    tril_recursive(Mode::Approx, &TriangularConfig::default(), l, b, unit, prec)
}

/// Midpoint-only `U⁻¹·B`.
///
/// # Panics
///
/// Panics if `u` is not square or the row counts differ.
#[must_use]
pub fn approx_solve_triu(u: &ArbMat, b: &ArbMat, unit: bool, prec: u64) -> ArbMat {
    triu_recursive(Mode::Approx, &TriangularConfig::default(), u, b, unit, prec)
}
