//! # certus-ball
//!
//! Rigorous real ball arithmetic for Certus.
//!
//! This crate provides the scalar layer the matrix crate is built on:
//! - Upward-rounding magnitude bounds (`Mag`)
//! - Arbitrary-precision binary floating point with directed rounding (`Arf`)
//! - Midpoint-radius real balls (`Arb`)
//!
//! All big-integer work is delegated to `dashu`. Every `Arb` operation
//! returns a ball that contains the exact result for all members of the
//! inputs; rounding errors of the midpoint are folded into the radius.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

pub mod arb;
pub mod arf;
pub mod elementary;
pub mod mag;

#[cfg(test)]
mod proptests;

pub use arb::{Arb, LAGOM_EXP};
pub use arf::{Arf, Round, Rounding, ARF_MAX_EXP};
pub use mag::Mag;
