//! # Certus
//!
//! Certified arbitrary-precision linear algebra in Rust.
//!
//! Every quantity is a ball: a binary floating-point midpoint together with
//! a radius that bounds the error. Operations return balls guaranteed to
//! contain the exact result, and certification failures are reported so the
//! caller can retry at a higher precision.
//!
//! ## Features
//!
//! - **Ball Arithmetic**: `Mag` bounds, directed-rounding `Arf`, `Arb` balls
//! - **Exact Oracles**: rational matrices for construction and checking
//! - **Multiplication**: classical, multithreaded and exponent-aware block
//! - **Factorizations**: LU, Cholesky and LDL with certified pivots
//! - **Solving**: direct and preconditioned solving, inverses, determinants
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use certus::prelude::*;
//!
//! let h = ArbMat::hilbert(8, 256);
//! let d = PrecisionLadder::default().run(|prec| Ok(det(&ArbMat::hilbert(8, prec), prec)))?;
//! let x = solve(&h, &ArbMat::ones(8, 1), 256)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub use certus_ball as ball;
pub use certus_exact as exact;
pub use certus_mat as mat;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use certus_ball::{Arb, Arf, Mag, Round};
    pub use certus_exact::RatMat;
    pub use certus_mat::{
        det, exp, inv, jacobi, mul, solve, spd_det, spd_solve, ArbMat, MatError, MulConfig,
        PrecisionLadder, SymmetricEig,
    };
}
