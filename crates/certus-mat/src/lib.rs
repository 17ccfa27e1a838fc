//! # certus-mat
//!
//! Dense ball matrices for Certus.
//!
//! This crate provides:
//! - Dense matrices of real balls with O(1) row swaps and borrowed windows
//! - Classical, threaded and exponent-aware block multiplication
//! - LU, Cholesky and LDL factorizations with certified pivots
//! - Triangular solves, linear systems, inverses and determinants
//! - Characteristic polynomials and the matrix exponential
//! - Symmetric eigendecomposition by Jacobi rotations
//!
//! ## Algorithm Selection
//!
//! Entry points choose a strategy from the shape and precision:
//! - Multiplication: classical or threaded below a precision dependent
//!   cutoff, block multiplication above it
//! - Solving: direct LU for small systems or high precision, otherwise an
//!   approximate factorization certified by a residual bound
//! - Determinants: closed forms up to 3×3, elimination, or preconditioning
//!
//! Every result encloses the exact result for all matrices contained in the
//! inputs. When certification fails a [`MatError`] is returned and the
//! computation can be retried at higher precision with [`PrecisionLadder`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::many_single_char_names)]

pub mod charpoly;
pub mod cholesky;
pub mod dense;
pub mod det;
pub mod error;
pub mod exp;
pub mod ladder;
pub mod ldl;
pub mod lu;
pub mod mul;
pub mod mul_block;
pub mod perm;
pub mod rad_mag;
pub mod solve;
pub mod symmetric;
pub mod triangular;
pub mod window;

pub use charpoly::{charpoly, companion, diag_prod, trace};
pub use cholesky::{cho, spd_det, spd_inv, spd_logdet, spd_solve};
pub use dense::{ArbMat, PascalKind, StirlingKind};
pub use det::det;
pub use error::{MatError, Result};
pub use exp::exp;
pub use ladder::PrecisionLadder;
pub use ldl::ldl;
pub use lu::{approx_lu, lu};
pub use mul::{approx_mul, mul, mul_with, pow_ui, sqr, MulConfig};
pub use rad_mag::RadMagConfig;
pub use solve::{approx_inv, approx_solve, inv, solve};
pub use symmetric::{jacobi, twobytwo_diag, SymmetricEig};
pub use triangular::{solve_tril, solve_triu, TriangularConfig};
pub use window::{ArbMatView, ArbMatViewMut};

#[cfg(test)]
mod proptests;
#[cfg(test)]
mod tests;
