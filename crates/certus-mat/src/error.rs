//! Error types for certified matrix computations.
//!
//! Only numeric insufficiency is reported through [`MatError`]: the
//! computation was carried out correctly but the working precision did not
//! suffice to certify the answer, and retrying at a higher precision may
//! succeed. Shape mismatches and other contract violations panic.

use thiserror::Error;

/// A certification failure at a given working precision.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MatError {
    /// No pivot could be certified nonzero, so singularity was not ruled out.
    #[error("matrix is singular or singularity could not be ruled out at {prec} bits")]
    Singular {
        /// Working precision of the failed attempt.
        prec: u64,
    },

    /// A Cholesky or LDL diagonal entry was not certified positive.
    #[error("matrix is not certified positive definite at {prec} bits")]
    NotPositiveDefinite {
        /// Working precision of the failed attempt.
        prec: u64,
    },

    /// A residual bound failed to prove contraction.
    #[error("approximate solution could not be certified at {prec} bits")]
    NotCertified {
        /// Working precision of the failed attempt.
        prec: u64,
    },
}

impl MatError {
    /// Working precision at which the failure occurred.
    #[must_use]
    pub fn prec(&self) -> u64 {
        match *self {
            Self::Singular { prec }
            | Self::NotPositiveDefinite { prec }
            | Self::NotCertified { prec } => prec,
        }
    }
}

/// Shorthand `Result` type used throughout certus-mat.
pub type Result<T, E = MatError> = std::result::Result<T, E>;
