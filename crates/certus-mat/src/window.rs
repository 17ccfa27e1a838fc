//! Borrowed rectangular windows into a matrix.
//!
//! A window aliases its parent: reads see the parent's entries and writes
//! through [`ArbMatViewMut`] land in the parent. While a window is alive the
//! parent cannot be resized or otherwise mutated.

use certus_ball::Arb;

use crate::dense::ArbMat;

/// Read-only window `[r0, r0 + num_rows) × [c0, c0 + num_cols)`.
#[derive(Clone, Copy)]
pub struct ArbMatView<'a> {
    mat: &'a ArbMat,
    r0: usize,
    c0: usize,
    num_rows: usize,
    num_cols: usize,
}

/// Mutable window `[r0, r0 + num_rows) × [c0, c0 + num_cols)`.
pub struct ArbMatViewMut<'a> {
    mat: &'a mut ArbMat,
    r0: usize,
    c0: usize,
    num_rows: usize,
    num_cols: usize,
}

fn check_bounds(mat: &ArbMat, r0: usize, c0: usize, r1: usize, c1: usize) {
    assert!(
        r0 <= r1 && r1 <= mat.num_rows() && c0 <= c1 && c1 <= mat.num_cols(),
        "window [{r0}, {r1}) x [{c0}, {c1}) out of range for {}x{} matrix",
        mat.num_rows(),
        mat.num_cols()
    );
}

impl ArbMat {
    /// The window of rows `r0..r1` and columns `c0..c1`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    #[must_use]
    pub fn window(&self, r0: usize, c0: usize, r1: usize, c1: usize) -> ArbMatView<'_> {
        check_bounds(self, r0, c0, r1, c1);
        ArbMatView {
            mat: self,
            r0,
            c0,
            num_rows: r1 - r0,
            num_cols: c1 - c0,
        }
    }

    /// The mutable window of rows `r0..r1` and columns `c0..c1`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn window_mut(&mut self, r0: usize, c0: usize, r1: usize, c1: usize) -> ArbMatViewMut<'_> {
        check_bounds(self, r0, c0, r1, c1);
        ArbMatViewMut {
            mat: self,
            r0,
            c0,
            num_rows: r1 - r0,
            num_cols: c1 - c0,
        }
    }
}

impl<'a> ArbMatView<'a> {
    /// Returns the number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Row `i` of the window.
    #[must_use]
    pub fn row(&self, i: usize) -> &'a [Arb] {
        let mat: &'a ArbMat = self.mat;
        &mat.row(self.r0 + i)[self.c0..self.c0 + self.num_cols]
    }

    /// Entry `(i, j)` of the window.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> &'a Arb {
        &self.row(i)[j]
    }

    /// Copies the window into an owned matrix.
    #[must_use]
    pub fn to_mat(&self) -> ArbMat {
        ArbMat::from_fn(self.num_rows, self.num_cols, |i, j| self.get(i, j).clone())
    }
}

impl ArbMatViewMut<'_> {
    /// Returns the number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Row `i` of the window, writable.
    pub fn row_mut(&mut self, i: usize) -> &mut [Arb] {
        let (c0, c) = (self.c0, self.num_cols);
        &mut self.mat.row_mut(self.r0 + i)[c0..c0 + c]
    }

    /// A read-only view of the same region.
    #[must_use]
    pub fn as_view(&self) -> ArbMatView<'_> {
        ArbMatView {
            mat: &*self.mat,
            r0: self.r0,
            c0: self.c0,
            num_rows: self.num_rows,
            num_cols: self.num_cols,
        }
    }

    fn check_shape(&self, src: &ArbMat) {
        assert_eq!(
            (self.num_rows, self.num_cols),
            (src.num_rows(), src.num_cols()),
            "window shape mismatch"
        );
    }

    /// Overwrites the window with `src`.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn copy_from(&mut self, src: &ArbMat) {
        self.check_shape(src);
        for i in 0..self.num_rows {
            self.row_mut(i).clone_from_slice(src.row(i));
        }
    }

    /// Subtracts `src` from the window in place.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn sub_assign(&mut self, src: &ArbMat, prec: u64) {
        self.check_shape(src);
        for i in 0..self.num_rows {
            for (x, y) in self.row_mut(i).iter_mut().zip(src.row(i)) {
                *x = x.sub(y, prec);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_aliases_parent() {
        let mut m = ArbMat::from_i64_rows(&[vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]);
        let w = m.window(1, 1, 3, 3);
        assert_eq!(w.to_mat(), ArbMat::from_i64_rows(&[vec![5, 6], vec![8, 9]]));

        let mut wm = m.window_mut(0, 0, 2, 2);
        wm.sub_assign(&ArbMat::ones(2, 2), 64);
        assert_eq!(wm.as_view().get(1, 1), &Arb::from_i64(4));
        assert_eq!(m[(0, 0)], Arb::from_i64(0));
        assert_eq!(m[(2, 2)], Arb::from_i64(9));
    }

    #[test]
    fn test_window_follows_row_swaps() {
        let mut m = ArbMat::from_i64_rows(&[vec![1, 2], vec![3, 4]]);
        m.swap_rows(None, 0, 1);
        assert_eq!(m.window(0, 0, 1, 2).get(0, 1), &Arb::from_i64(4));
        m.window_mut(1, 0, 2, 2).copy_from(&ArbMat::zeros(1, 2));
        assert!(m.row(1).iter().all(Arb::is_zero));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_window_out_of_range() {
        let m = ArbMat::zeros(2, 2);
        let _ = m.window(0, 0, 3, 1);
    }
}
