//! Dense ball matrices.
//!
//! Entries live in one contiguous buffer; each logical row is addressed
//! through an offset table, so swapping two rows only swaps two offsets.

use std::fmt;
use std::ops::{Index, IndexMut};

use certus_ball::{Arb, Arf, Mag};
use certus_exact::RatMat;
use dashu::integer::IBig;
use rand::Rng;

/// Dense matrix of real balls.
#[derive(Clone)]
pub struct ArbMat {
    /// Matrix entries; row `i` starts at `rows[i]`.
    entries: Vec<Arb>,
    /// Offset of each logical row in `entries`.
    rows: Vec<usize>,
    /// Number of rows.
    num_rows: usize,
    /// Number of columns.
    num_cols: usize,
}

/// Triangular shape of a Pascal matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PascalKind {
    /// `P[i, j] = C(i + j, i)`.
    Symmetric,
    /// `P[i, j] = C(i, j)`.
    Lower,
    /// `P[i, j] = C(j, i)`.
    Upper,
}

/// Which Stirling numbers fill a Stirling matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StirlingKind {
    /// Unsigned Stirling numbers of the first kind.
    FirstUnsigned,
    /// Signed Stirling numbers of the first kind.
    FirstSigned,
    /// Stirling numbers of the second kind.
    Second,
}

impl ArbMat {
    /// Creates a new matrix filled with exact zeros.
    #[must_use]
    pub fn zeros(num_rows: usize, num_cols: usize) -> Self {
        Self {
            entries: vec![Arb::zero(); num_rows * num_cols],
            rows: (0..num_rows).map(|i| i * num_cols).collect(),
            num_rows,
            num_cols,
        }
    }

    /// Creates an identity matrix.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        m.set_one();
        m
    }

    /// Creates a matrix whose entries are all exactly one.
    #[must_use]
    pub fn ones(num_rows: usize, num_cols: usize) -> Self {
        Self::from_fn(num_rows, num_cols, |_, _| Arb::one())
    }

    /// Creates a matrix whose entries are all `[0 ± ∞]`.
    #[must_use]
    pub fn indeterminate(num_rows: usize, num_cols: usize) -> Self {
        Self::from_fn(num_rows, num_cols, |_, _| Arb::indeterminate())
    }

    /// Creates a matrix from a function of the indices.
    pub fn from_fn<F>(num_rows: usize, num_cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> Arb,
    {
        let mut entries = Vec::with_capacity(num_rows * num_cols);
        for i in 0..num_rows {
            for j in 0..num_cols {
                entries.push(f(i, j));
            }
        }
        Self {
            entries,
            rows: (0..num_rows).map(|i| i * num_cols).collect(),
            num_rows,
            num_cols,
        }
    }

    /// Creates a matrix from a 2D vector.
    ///
    /// # Panics
    ///
    /// Panics if the rows have different lengths.
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<Arb>>) -> Self {
        if rows.is_empty() {
            return Self::zeros(0, 0);
        }
        let num_rows = rows.len();
        let num_cols = rows[0].len();
        let entries: Vec<Arb> = rows.into_iter().flatten().collect();
        assert_eq!(entries.len(), num_rows * num_cols, "ragged rows");
        Self {
            entries,
            rows: (0..num_rows).map(|i| i * num_cols).collect(),
            num_rows,
            num_cols,
        }
    }

    /// Creates an exact integer matrix.
    #[must_use]
    pub fn from_i64_rows(rows: &[Vec<i64>]) -> Self {
        Self::from_rows(
            rows.iter()
                .map(|row| row.iter().map(|&x| Arb::from_i64(x)).collect())
                .collect(),
        )
    }

    /// Encloses a rational matrix at `prec` bits.
    #[must_use]
    pub fn from_rat_mat(q: &RatMat, prec: u64) -> Self {
        Self::from_fn(q.num_rows(), q.num_cols(), |i, j| {
            Arb::from_rational(&q[(i, j)], prec)
        })
    }

    /// The Hilbert matrix `H[i, j] = 1 / (i + j + 1)` at `prec` bits.
    #[must_use]
    pub fn hilbert(n: usize, prec: u64) -> Self {
        Self::from_fn(n, n, |i, j| {
            Arb::one().div_si((i + j + 1) as i64, prec)
        })
    }

    /// A Pascal matrix of binomial coefficients, rounded to `prec` bits.
    #[must_use]
    pub fn pascal(n: usize, kind: PascalKind, prec: u64) -> Self {
        // binom[i][j] = C(i, j) for i < 2n
        let size = 2 * n;
        let mut binom = vec![vec![IBig::ZERO; size.max(1)]; size.max(1)];
        for i in 0..size {
            binom[i][0] = IBig::ONE;
            for j in 1..=i {
                binom[i][j] = &binom[i - 1][j - 1] + &binom[i - 1][j];
            }
        }
        Self::from_fn(n, n, |i, j| {
            let c = match kind {
                PascalKind::Symmetric => &binom[i + j][i],
                PascalKind::Lower => &binom[i][j],
                PascalKind::Upper => &binom[j][i],
            };
            Arb::from_arf(Arf::from_ibig_2exp(c, 0)).round(prec)
        })
    }

    /// The lower triangular matrix of Stirling numbers `S[i, j]`,
    /// `0 ≤ i, j < n`, rounded to `prec` bits.
    #[must_use]
    pub fn stirling(n: usize, kind: StirlingKind, prec: u64) -> Self {
        let mut s = vec![vec![IBig::ZERO; n]; n];
        if n > 0 {
            s[0][0] = IBig::ONE;
        }
        for i in 1..n {
            for j in 1..=i {
                let factor = match kind {
                    StirlingKind::FirstUnsigned => IBig::from(i - 1),
                    StirlingKind::FirstSigned => -IBig::from(i - 1),
                    StirlingKind::Second => IBig::from(j),
                };
                s[i][j] = &s[i - 1][j - 1] + factor * &s[i - 1][j];
            }
        }
        Self::from_fn(n, n, |i, j| {
            Arb::from_arf(Arf::from_ibig_2exp(&s[i][j], 0)).round(prec)
        })
    }

    /// A random matrix for testing: midpoints with up to `min(prec, 62)`
    /// mantissa bits and exponents in `±mag_bits`, some exact zeros and
    /// some nonzero radii.
    pub fn randtest<R: Rng + ?Sized>(
        rng: &mut R,
        num_rows: usize,
        num_cols: usize,
        prec: u64,
        mag_bits: i64,
    ) -> Self {
        let man_bits = prec.clamp(1, 62);
        Self::from_fn(num_rows, num_cols, |_, _| {
            if rng.gen_ratio(1, 5) {
                return Arb::zero();
            }
            let bound = (1i64 << man_bits) - 1;
            let m = rng.gen_range(-bound..=bound);
            let e = rng.gen_range(-mag_bits..=mag_bits);
            let mid = Arf::from_ibig_2exp(&IBig::from(m), e - man_bits as i64);
            if rng.gen_bool(0.5) {
                Arb::from_arf(mid)
            } else {
                let re = e - man_bits as i64 - rng.gen_range(0..8);
                Arb::from_mid_rad(mid, Mag::pow2(re))
            }
        })
    }

    /// Resets to the empty 0×0 matrix.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.rows.clear();
        self.num_rows = 0;
        self.num_cols = 0;
    }

    /// Exchanges two matrices.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
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

    /// Returns true if the matrix has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0 || self.num_cols == 0
    }

    /// Returns true if the matrix is square.
    #[must_use]
    pub fn is_square(&self) -> bool {
        self.num_rows == self.num_cols
    }

    /// Returns an entry, or `None` if out of range.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<&Arb> {
        if row < self.num_rows && col < self.num_cols {
            Some(&self.entries[self.rows[row] + col])
        } else {
            None
        }
    }

    /// Returns a mutable entry, or `None` if out of range.
    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut Arb> {
        if row < self.num_rows && col < self.num_cols {
            Some(&mut self.entries[self.rows[row] + col])
        } else {
            None
        }
    }

    /// Returns a row as a slice.
    #[must_use]
    pub fn row(&self, row: usize) -> &[Arb] {
        let start = self.rows[row];
        &self.entries[start..start + self.num_cols]
    }

    /// Returns a row as a mutable slice.
    pub fn row_mut(&mut self, row: usize) -> &mut [Arb] {
        let start = self.rows[row];
        &mut self.entries[start..start + self.num_cols]
    }

    /// Borrows row `src` for reading and row `dst` for writing.
    ///
    /// # Panics
    ///
    /// Panics if `src == dst`.
    pub fn row_pair(&mut self, src: usize, dst: usize) -> (&[Arb], &mut [Arb]) {
        assert_ne!(src, dst, "row_pair needs two distinct rows");
        let c = self.num_cols;
        let (s, d) = (self.rows[src], self.rows[dst]);
        if s < d {
            let (lo, hi) = self.entries.split_at_mut(d);
            (&lo[s..s + c], &mut hi[..c])
        } else {
            let (lo, hi) = self.entries.split_at_mut(s);
            (&hi[..c], &mut lo[d..d + c])
        }
    }

    /// Swaps rows `r` and `s` in O(1), mirroring the swap in `perm`.
    pub fn swap_rows(&mut self, perm: Option<&mut [usize]>, r: usize, s: usize) {
        if r != s {
            self.rows.swap(r, s);
            if let Some(perm) = perm {
                perm.swap(r, s);
            }
        }
    }

    /// Iterates over all entries in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Arb> + '_ {
        (0..self.num_rows).flat_map(move |i| self.row(i).iter())
    }

    /// Sets every entry to exact zero.
    pub fn set_zero(&mut self) {
        for x in &mut self.entries {
            *x = Arb::zero();
        }
    }

    /// Sets the leading diagonal to one and everything else to zero.
    pub fn set_one(&mut self) {
        self.set_zero();
        for i in 0..self.num_rows.min(self.num_cols) {
            self[(i, i)] = Arb::one();
        }
    }

    /// Transpose.
    #[must_use]
    pub fn transpose(&self) -> Self {
        Self::from_fn(self.num_cols, self.num_rows, |i, j| self[(j, i)].clone())
    }

    /// Applies a function to every entry.
    #[must_use]
    pub fn map<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&Arb) -> Arb,
    {
        Self::from_fn(self.num_rows, self.num_cols, |i, j| f(&self[(i, j)]))
    }

    fn zip_map<F>(&self, other: &Self, mut f: F) -> Self
    where
        F: FnMut(&Arb, &Arb) -> Arb,
    {
        assert_eq!(
            (self.num_rows, self.num_cols),
            (other.num_rows, other.num_cols),
            "incompatible dimensions"
        );
        Self::from_fn(self.num_rows, self.num_cols, |i, j| {
            f(&self[(i, j)], &other[(i, j)])
        })
    }

    fn all_pairs<F>(&self, other: &Self, mut f: F) -> bool
    where
        F: FnMut(&Arb, &Arb) -> bool,
    {
        self.num_rows == other.num_rows
            && self.num_cols == other.num_cols
            && self.iter().zip(other.iter()).all(|(a, b)| f(a, b))
    }

    /// Returns true if every pair of corresponding entries overlaps.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.all_pairs(other, Arb::overlaps)
    }

    /// Returns true if every entry of `other` is contained in the
    /// corresponding entry of `self`.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.all_pairs(other, Arb::contains)
    }

    /// Returns true if every rational entry lies in the corresponding ball.
    #[must_use]
    pub fn contains_rat_mat(&self, q: &RatMat) -> bool {
        self.num_rows == q.num_rows()
            && self.num_cols == q.num_cols()
            && (0..self.num_rows).all(|i| {
                (0..self.num_cols).all(|j| self[(i, j)].contains_rational(&q[(i, j)]))
            })
    }

    /// Returns true if every radius is zero.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.entries.iter().all(Arb::is_exact)
    }

    /// Returns true if every entry is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(Arb::is_zero)
    }

    /// Returns true if every radius is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.entries.iter().all(Arb::is_finite)
    }

    /// Returns true if every entry is lagom (see [`Arb::is_lagom`]).
    #[must_use]
    pub fn is_lagom(&self) -> bool {
        self.entries.iter().all(Arb::is_lagom)
    }

    /// Returns true if every entry above the diagonal is exactly zero.
    #[must_use]
    pub fn is_tril(&self) -> bool {
        (0..self.num_rows).all(|i| self.row(i).iter().skip(i + 1).all(Arb::is_zero))
    }

    /// Returns true if every entry below the diagonal is exactly zero.
    #[must_use]
    pub fn is_triu(&self) -> bool {
        (0..self.num_rows).all(|i| {
            self.row(i)
                .iter()
                .take(i.min(self.num_cols))
                .all(Arb::is_zero)
        })
    }

    /// Returns true if every off-diagonal entry is exactly zero.
    #[must_use]
    pub fn is_diag(&self) -> bool {
        self.is_tril() && self.is_triu()
    }

    /// The midpoint matrix (radii dropped).
    #[must_use]
    pub fn get_mid(&self) -> Self {
        self.map(Arb::mid_arb)
    }

    /// Widens every entry by `err`.
    pub fn add_error_mag(&mut self, err: &Mag) {
        for x in &mut self.entries {
            x.add_error(err);
        }
    }

    /// Largest midpoint mantissa size in bits.
    #[must_use]
    pub fn max_bits(&self) -> u64 {
        self.entries.iter().map(|x| x.mid().bits()).max().unwrap_or(0)
    }

    /// Fraction of entries with a nonzero midpoint.
    #[must_use]
    pub fn density(&self) -> f64 {
        let total = self.num_rows * self.num_cols;
        if total == 0 {
            return 0.0;
        }
        let nonzero = self.iter().filter(|x| !x.mid().is_zero()).count();
        nonzero as f64 / total as f64
    }

    /// Rounds every midpoint to `prec` bits.
    #[must_use]
    pub fn round(&self, prec: u64) -> Self {
        self.map(|x| x.round(prec))
    }

    /// Negation.
    #[must_use]
    pub fn neg(&self) -> Self {
        self.map(Arb::neg)
    }

    /// Entrywise sum.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    #[must_use]
    pub fn add(&self, other: &Self, prec: u64) -> Self {
        self.zip_map(other, |a, b| a.add(b, prec))
    }

    /// Entrywise difference.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    #[must_use]
    pub fn sub(&self, other: &Self, prec: u64) -> Self {
        self.zip_map(other, |a, b| a.sub(b, prec))
    }

    /// Entrywise (Hadamard) product.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    #[must_use]
    pub fn mul_entrywise(&self, other: &Self, prec: u64) -> Self {
        self.zip_map(other, |a, b| a.mul(b, prec))
    }

    /// Exact multiplication by `2^k`.
    #[must_use]
    pub fn mul_2exp(&self, k: i64) -> Self {
        self.map(|x| x.mul_2exp(k))
    }

    /// Multiplies every entry by an integer.
    #[must_use]
    pub fn mul_si(&self, k: i64, prec: u64) -> Self {
        self.map(|x| x.mul_si(k, prec))
    }

    /// Divides every entry by an integer.
    #[must_use]
    pub fn div_si(&self, k: i64, prec: u64) -> Self {
        self.map(|x| x.div_si(k, prec))
    }

    /// Multiplies every entry by a ball.
    #[must_use]
    pub fn mul_arb(&self, x: &Arb, prec: u64) -> Self {
        self.map(|a| a.mul(x, prec))
    }

    /// Divides every entry by a ball.
    #[must_use]
    pub fn div_arb(&self, x: &Arb, prec: u64) -> Self {
        self.map(|a| a.div(x, prec))
    }

    /// `self += a · x`.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn addmul_arb(&mut self, a: &Self, x: &Arb, prec: u64) {
        assert_eq!(
            (self.num_rows, self.num_cols),
            (a.num_rows, a.num_cols),
            "incompatible dimensions"
        );
        for i in 0..self.num_rows {
            for j in 0..self.num_cols {
                self[(i, j)].addmul(&a[(i, j)], x, prec);
            }
        }
    }

    /// Upper bound for the maximum absolute row sum.
    #[must_use]
    pub fn bound_inf_norm(&self) -> Mag {
        (0..self.num_rows)
            .map(|i| {
                self.row(i)
                    .iter()
                    .fold(Mag::ZERO, |acc, x| acc.add(&x.mag()))
            })
            .max()
            .unwrap_or(Mag::ZERO)
    }

    /// Encloses the Frobenius norm.
    #[must_use]
    pub fn frobenius_norm(&self, prec: u64) -> Arb {
        let sum = Arb::dot(None, false, self.iter().zip(self.iter()), prec + 10);
        sum.sqrtpos(prec)
    }

    /// Upper bound for the Frobenius norm.
    #[must_use]
    pub fn bound_frobenius_norm(&self) -> Mag {
        self.iter()
            .fold(Mag::ZERO, |acc, x| {
                let m = x.mag();
                acc.add(&m.mul(&m))
            })
            .sqrt()
    }

    /// Entrywise pattern of entries that are exactly zero.
    #[must_use]
    pub fn entrywise_is_zero(&self) -> Vec<Vec<bool>> {
        (0..self.num_rows)
            .map(|i| self.row(i).iter().map(Arb::is_zero).collect())
            .collect()
    }

    /// Number of entries that are exactly zero.
    #[must_use]
    pub fn count_is_zero(&self) -> usize {
        self.entries.iter().filter(|x| x.is_zero()).count()
    }
}

/// Runs `f` on the current value of `dst` and stores the result in `dst`,
/// so that an operation may read its own output operand.
pub(crate) fn with_scratch<F>(dst: &mut ArbMat, f: F)
where
    F: FnOnce(&ArbMat) -> ArbMat,
{
    let result = f(&*dst);
    *dst = result;
}

impl Index<(usize, usize)> for ArbMat {
    type Output = Arb;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        debug_assert!(col < self.num_cols);
        &self.entries[self.rows[row] + col]
    }
}

impl IndexMut<(usize, usize)> for ArbMat {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Self::Output {
        debug_assert!(col < self.num_cols);
        &mut self.entries[self.rows[row] + col]
    }
}

impl PartialEq for ArbMat {
    fn eq(&self, other: &Self) -> bool {
        self.all_pairs(other, |a, b| a == b)
    }
}

impl Eq for ArbMat {}

impl fmt::Debug for ArbMat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ArbMat {}x{} [", self.num_rows, self.num_cols)?;
        for i in 0..self.num_rows {
            let row: Vec<String> = self.row(i).iter().map(|x| format!("{x:?}")).collect();
            writeln!(f, "  [{}]", row.join(", "))?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for ArbMat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = f.precision().unwrap_or(6);
        write!(f, "[")?;
        for i in 0..self.num_rows {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[")?;
            for (j, x) in self.row(i).iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{x:.digits$}")?;
            }
            write!(f, "]")?;
        }
        write!(f, "]")
    }
}
