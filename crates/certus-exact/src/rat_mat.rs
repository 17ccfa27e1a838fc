//! Dense exact rational matrices.
//!
//! All arithmetic is exact. The determinant uses fraction-free (Bareiss)
//! elimination on the row-scaled integer matrix; solve and inverse use
//! Gauss-Jordan elimination over the rationals.

use std::fmt;
use std::ops::{Index, IndexMut};

use dashu::integer::{IBig, UBig};
use dashu::rational::RBig;
use rand::Rng;

/// Dense rational matrix stored in row-major order.
#[derive(Clone, PartialEq, Eq)]
pub struct RatMat {
    /// Matrix entries in row-major order.
    data: Vec<RBig>,
    /// Number of rows.
    num_rows: usize,
    /// Number of columns.
    num_cols: usize,
}

fn rat(p: i64, q: u64) -> RBig {
    RBig::from_parts(IBig::from(p), UBig::from(q))
}

fn abs(q: &RBig) -> RBig {
    if *q < RBig::ZERO {
        -q.clone()
    } else {
        q.clone()
    }
}

impl RatMat {
    /// Creates a new matrix filled with zeros.
    #[must_use]
    pub fn zeros(num_rows: usize, num_cols: usize) -> Self {
        Self {
            data: vec![RBig::ZERO; num_rows * num_cols],
            num_rows,
            num_cols,
        }
    }

    /// Creates an identity matrix.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = RBig::ONE;
        }
        m
    }

    /// Creates a matrix from a 2D vector.
    ///
    /// # Panics
    ///
    /// Panics if the rows have different lengths.
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<RBig>>) -> Self {
        if rows.is_empty() {
            return Self::zeros(0, 0);
        }
        let num_rows = rows.len();
        let num_cols = rows[0].len();
        let data: Vec<RBig> = rows.into_iter().flatten().collect();
        assert_eq!(data.len(), num_rows * num_cols, "ragged rows");
        Self {
            data,
            num_rows,
            num_cols,
        }
    }

    /// Creates an integer matrix from rows of `i64`.
    #[must_use]
    pub fn from_i64_rows(rows: &[Vec<i64>]) -> Self {
        Self::from_rows(
            rows.iter()
                .map(|row| row.iter().map(|&x| RBig::from(IBig::from(x))).collect())
                .collect(),
        )
    }

    /// The Hilbert matrix `H[i, j] = 1 / (i + j + 1)`.
    #[must_use]
    pub fn hilbert(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                m[(i, j)] = rat(1, (i + j + 1) as u64);
            }
        }
        m
    }

    /// Random rationals with numerators in `[−2^bits, 2^bits]` and
    /// denominators in `[1, 2^bits]`.
    ///
    /// # Panics
    ///
    /// Panics if `bits > 60`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, num_rows: usize, num_cols: usize, bits: u32) -> Self {
        assert!(bits <= 60, "random entries are limited to 60 bits");
        let bound = 1i64 << bits;
        let data = (0..num_rows * num_cols)
            .map(|_| {
                let p = rng.gen_range(-bound..=bound);
                let q = rng.gen_range(1..=bound.unsigned_abs());
                rat(p, q)
            })
            .collect();
        Self {
            data,
            num_rows,
            num_cols,
        }
    }

    /// Random integer matrix with entries in `[−2^bits, 2^bits]`.
    ///
    /// # Panics
    ///
    /// Panics if `bits > 60`.
    pub fn random_integer<R: Rng + ?Sized>(
        rng: &mut R,
        num_rows: usize,
        num_cols: usize,
        bits: u32,
    ) -> Self {
        assert!(bits <= 60, "random entries are limited to 60 bits");
        let bound = 1i64 << bits;
        let data = (0..num_rows * num_cols)
            .map(|_| RBig::from(IBig::from(rng.gen_range(-bound..=bound))))
            .collect();
        Self {
            data,
            num_rows,
            num_cols,
        }
    }

    /// Random symmetric positive definite matrix `M·Mᵀ + I` for a random
    /// integer matrix `M`.
    pub fn random_spd<R: Rng + ?Sized>(rng: &mut R, n: usize, bits: u32) -> Self {
        let m = Self::random_integer(rng, n, n, bits);
        m.mul(&m.transpose()).add(&Self::identity(n))
    }

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

    /// Returns true if the matrix is square.
    #[must_use]
    pub fn is_square(&self) -> bool {
        self.num_rows == self.num_cols
    }

    /// Returns a row as a slice.
    #[must_use]
    pub fn row(&self, row: usize) -> &[RBig] {
        let start = row * self.num_cols;
        &self.data[start..start + self.num_cols]
    }

    /// Swaps two rows.
    pub fn swap_rows(&mut self, i: usize, j: usize) {
        if i != j {
            for col in 0..self.num_cols {
                self.data.swap(i * self.num_cols + col, j * self.num_cols + col);
            }
        }
    }

    /// Matrix product.
    ///
    /// # Panics
    ///
    /// Panics if the inner dimensions differ.
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        assert_eq!(self.num_cols, other.num_rows, "incompatible dimensions");
        let mut result = Self::zeros(self.num_rows, other.num_cols);
        for i in 0..self.num_rows {
            for k in 0..self.num_cols {
                let a = &self[(i, k)];
                if *a == RBig::ZERO {
                    continue;
                }
                for j in 0..other.num_cols {
                    let p = a * &other[(k, j)];
                    result[(i, j)] += p;
                }
            }
        }
        result
    }

    /// Entrywise sum.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        assert_eq!(
            (self.num_rows, self.num_cols),
            (other.num_rows, other.num_cols),
            "incompatible dimensions"
        );
        Self {
            data: self.data.iter().zip(&other.data).map(|(a, b)| a + b).collect(),
            num_rows: self.num_rows,
            num_cols: self.num_cols,
        }
    }

    /// Entrywise difference.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        assert_eq!(
            (self.num_rows, self.num_cols),
            (other.num_rows, other.num_cols),
            "incompatible dimensions"
        );
        Self {
            data: self.data.iter().zip(&other.data).map(|(a, b)| a - b).collect(),
            num_rows: self.num_rows,
            num_cols: self.num_cols,
        }
    }

    /// Transpose.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut result = Self::zeros(self.num_cols, self.num_rows);
        for i in 0..self.num_rows {
            for j in 0..self.num_cols {
                result[(j, i)] = self[(i, j)].clone();
            }
        }
        result
    }

    /// Multiplies every entry by a scalar.
    #[must_use]
    pub fn scale(&self, scalar: &RBig) -> Self {
        Self {
            data: self.data.iter().map(|a| a * scalar).collect(),
            num_rows: self.num_rows,
            num_cols: self.num_cols,
        }
    }

    /// Sum of the diagonal.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is not square.
    #[must_use]
    pub fn trace(&self) -> RBig {
        assert!(self.is_square(), "trace of a non-square matrix");
        (0..self.num_rows).fold(RBig::ZERO, |acc, i| acc + &self[(i, i)])
    }

    /// Maximum absolute row sum.
    #[must_use]
    pub fn inf_norm(&self) -> RBig {
        (0..self.num_rows)
            .map(|i| self.row(i).iter().fold(RBig::ZERO, |acc, x| acc + abs(x)))
            .max()
            .unwrap_or(RBig::ZERO)
    }

    /// Determinant by fraction-free elimination.
    ///
    /// Each row is scaled by the product of its denominators so that the
    /// elimination runs over the integers with exact divisions.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is not square.
    #[must_use]
    pub fn det(&self) -> RBig {
        assert!(self.is_square(), "determinant of a non-square matrix");
        let n = self.num_rows;
        if n == 0 {
            return RBig::ONE;
        }

        let mut scale = UBig::ONE;
        let mut m: Vec<Vec<IBig>> = Vec::with_capacity(n);
        for i in 0..n {
            let row_scale = self
                .row(i)
                .iter()
                .fold(UBig::ONE, |acc, x| acc * x.denominator());
            let row = self
                .row(i)
                .iter()
                .map(|x| {
                    let factor = &row_scale / x.denominator();
                    x.numerator() * IBig::from(factor)
                })
                .collect();
            scale *= &row_scale;
            m.push(row);
        }

        let mut negate = false;
        let mut prev = IBig::ONE;
        for k in 0..n {
            let Some(p) = (k..n).find(|&r| m[r][k] != IBig::ZERO) else {
                return RBig::ZERO;
            };
            if p != k {
                m.swap(p, k);
                negate = !negate;
            }
            for i in k + 1..n {
                for j in k + 1..n {
                    let v = &m[i][j] * &m[k][k] - &m[i][k] * &m[k][j];
                    m[i][j] = v / &prev;
                }
                m[i][k] = IBig::ZERO;
            }
            prev = m[k][k].clone();
        }

        let det = m[n - 1][n - 1].clone();
        let det = if negate { -det } else { det };
        RBig::from_parts(det, scale)
    }

    /// Returns true if the determinant is nonzero.
    #[must_use]
    pub fn is_invertible(&self) -> bool {
        self.is_square() && self.det() != RBig::ZERO
    }

    /// Solves `A·X = B`; `None` if `A` is singular.
    ///
    /// # Panics
    ///
    /// Panics if `A` is not square or the row counts differ.
    #[must_use]
    pub fn solve(&self, b: &Self) -> Option<Self> {
        assert!(self.is_square(), "solve with a non-square matrix");
        assert_eq!(self.num_rows, b.num_rows, "incompatible dimensions");
        let n = self.num_rows;
        let m = b.num_cols;

        // Augmented matrix [A | B]
        let mut aug = Self::zeros(n, n + m);
        for i in 0..n {
            for j in 0..n {
                aug[(i, j)] = self[(i, j)].clone();
            }
            for j in 0..m {
                aug[(i, n + j)] = b[(i, j)].clone();
            }
        }

        for col in 0..n {
            let pivot_row = (col..n).find(|&r| aug[(r, col)] != RBig::ZERO)?;
            aug.swap_rows(col, pivot_row);
            let inv = RBig::ONE / &aug[(col, col)];
            for j in col..n + m {
                aug[(col, j)] = &aug[(col, j)] * &inv;
            }
            for row in 0..n {
                if row == col || aug[(row, col)] == RBig::ZERO {
                    continue;
                }
                let factor = aug[(row, col)].clone();
                for j in col..n + m {
                    let v = &factor * &aug[(col, j)];
                    aug[(row, j)] -= v;
                }
            }
        }

        let mut x = Self::zeros(n, m);
        for i in 0..n {
            for j in 0..m {
                x[(i, j)] = aug[(i, n + j)].clone();
            }
        }
        Some(x)
    }

    /// Inverse; `None` if singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        self.solve(&Self::identity(self.num_rows))
    }

    /// Characteristic polynomial `det(x·I − A)` by the Berkowitz algorithm,
    /// coefficients from low to high degree.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is not square.
    #[must_use]
    pub fn charpoly(&self) -> Vec<RBig> {
        assert!(self.is_square(), "charpoly of a non-square matrix");
        let n = self.num_rows;
        // high-to-low coefficients of the leading r×r block
        let mut c = vec![RBig::ONE];
        for r in 0..n {
            let mut t = Vec::with_capacity(r + 2);
            t.push(RBig::ONE);
            t.push(-self[(r, r)].clone());
            // v = A_r^k · C, C = column r above the diagonal
            let mut v: Vec<RBig> = (0..r).map(|i| self[(i, r)].clone()).collect();
            for k in 0..r {
                let dot = (0..r).fold(RBig::ZERO, |acc, j| acc + &self[(r, j)] * &v[j]);
                t.push(-dot);
                if k + 1 < r {
                    v = (0..r)
                        .map(|i| (0..r).fold(RBig::ZERO, |acc, j| acc + &self[(i, j)] * &v[j]))
                        .collect();
                }
            }
            let next = (0..r + 2)
                .map(|i| {
                    (0..=i.min(r)).fold(RBig::ZERO, |acc, j| acc + &t[i - j] * &c[j])
                })
                .collect();
            c = next;
        }
        c.reverse();
        c
    }
}

impl Index<(usize, usize)> for RatMat {
    type Output = RBig;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        &self.data[row * self.num_cols + col]
    }
}

impl IndexMut<(usize, usize)> for RatMat {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Self::Output {
        &mut self.data[row * self.num_cols + col]
    }
}

impl fmt::Debug for RatMat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RatMat {}x{} [", self.num_rows, self.num_cols)?;
        for i in 0..self.num_rows {
            let row: Vec<String> = self.row(i).iter().map(ToString::to_string).collect();
            writeln!(f, "  [{}]", row.join(", "))?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_identity_and_mul() {
        let a = RatMat::from_i64_rows(&[vec![1, 2], vec![3, 4]]);
        let b = RatMat::from_i64_rows(&[vec![5, 6], vec![7, 8]]);
        let c = a.mul(&b);
        assert_eq!(c, RatMat::from_i64_rows(&[vec![19, 22], vec![43, 50]]));
        assert_eq!(a.mul(&RatMat::identity(2)), a);
    }

    #[test]
    fn test_det() {
        let m = RatMat::from_i64_rows(&[vec![3, 8], vec![4, 6]]);
        assert_eq!(m.det(), RBig::from(IBig::from(-14)));
        assert_eq!(RatMat::zeros(0, 0).det(), RBig::ONE);
        let singular = RatMat::from_i64_rows(&[vec![1, 2, 3], vec![2, 4, 6], vec![1, 0, 1]]);
        assert_eq!(singular.det(), RBig::ZERO);
        assert!(!singular.is_invertible());
    }

    #[test]
    fn test_hilbert_det() {
        let h = RatMat::hilbert(5);
        assert_eq!(h.det(), rat(1, 266_716_800_000));
    }

    #[test]
    fn test_det_needs_pivoting() {
        let m = RatMat::from_i64_rows(&[vec![0, 1, 2], vec![1, 0, 3], vec![4, -3, 8]]);
        // expand along the first row: 0 - 1·(8 - 12) + 2·(-3 - 0) = -2
        assert_eq!(m.det(), RBig::from(IBig::from(-2)));
    }

    #[test]
    fn test_solve_and_inverse() {
        let a = RatMat::from_i64_rows(&[vec![1, 2], vec![3, 4]]);
        let b = RatMat::from_i64_rows(&[vec![5], vec![11]]);
        let x = a.solve(&b).unwrap();
        assert_eq!(x, RatMat::from_i64_rows(&[vec![1], vec![2]]));
        let inv = a.inverse().unwrap();
        assert_eq!(a.mul(&inv), RatMat::identity(2));
        let singular = RatMat::from_i64_rows(&[vec![1, 2], vec![2, 4]]);
        assert!(singular.inverse().is_none());
    }

    #[test]
    fn test_charpoly() {
        let a = RatMat::from_i64_rows(&[vec![2, 1, 0], vec![1, 3, 1], vec![0, 1, 4]]);
        let p = a.charpoly();
        assert_eq!(p.len(), 4);
        assert_eq!(p[3], RBig::ONE);
        assert_eq!(p[2], -a.trace());
        assert_eq!(p[0], -a.det());
    }

    #[test]
    fn test_random_spd_is_invertible() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let a = RatMat::random_spd(&mut rng, 4, 5);
        assert_eq!(a, a.transpose());
        assert!(a.det() > RBig::ZERO);
    }

    #[test]
    fn test_inf_norm() {
        let a = RatMat::from_i64_rows(&[vec![1, -7], vec![3, 4]]);
        assert_eq!(a.inf_norm(), RBig::from(IBig::from(8)));
    }
}
