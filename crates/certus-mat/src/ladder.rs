//! Retrying certified computations at increasing precision.

use tracing::debug;

use crate::error::{MatError, Result};

/// Doubling precision schedule from `start` up to `max` bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrecisionLadder {
    /// First working precision.
    pub start: u64,
    /// Largest working precision attempted.
    pub max: u64,
}

impl Default for PrecisionLadder {
    fn default() -> Self {
        Self {
            start: 64,
            max: 10_000,
        }
    }
}

impl PrecisionLadder {
    /// Creates a ladder from `start` to `max` bits.
    ///
    /// # Panics
    ///
    /// Panics if `start` is zero or exceeds `max`.
    #[must_use]
    pub fn new(start: u64, max: u64) -> Self {
        assert!(start > 0 && start <= max, "invalid precision ladder {start}..={max}");
        Self { start, max }
    }

    /// The precisions tried, in order.
    pub fn precisions(&self) -> impl Iterator<Item = u64> {
        let max = self.max;
        std::iter::successors(Some(self.start.max(1)), move |&p| p.checked_mul(2).filter(|&q| q <= max))
    }

    /// Calls `f` with doubling precision until it succeeds, returning the
    /// last error if the largest precision also fails.
    ///
    /// # Errors
    ///
    /// Returns the error of the attempt at the largest precision.
    pub fn run<T, F>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(u64) -> Result<T>,
    {
        let mut last = MatError::NotCertified { prec: self.start };
        for prec in self.precisions() {
            match f(prec) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    debug!(prec, %err, "retrying at higher precision");
                    last = err;
                }
            }
        }
        Err(last)
    }
}
