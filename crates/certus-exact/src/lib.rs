//! # certus-exact
//!
//! Exact rational matrices for Certus.
//!
//! `RatMat` is a small dense matrix over `dashu` rationals. It is the ground
//! truth the ball engine is checked against: ball matrices are lifted from
//! rational matrices, and every certified ball result must contain the
//! exact rational result computed here.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod rat_mat;

pub use rat_mat::RatMat;
