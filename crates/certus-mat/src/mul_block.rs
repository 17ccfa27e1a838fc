//! Exponent-aware block multiplication.
//!
//! Midpoints and radii are multiplied separately. The shared dimension is
//! cut into blocks in which every row of `A` and every column of `B` spans a
//! bounded exponent range; inside such a block the midpoints are shifted to
//! exact fixed-point integers and multiplied with exact big-integer
//! arithmetic, rounding only once per block. Radii go through the
//! magnitude product in [`crate::rad_mag`].

use certus_ball::{Arb, Arf, Mag};
use dashu::integer::IBig;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::dense::ArbMat;
use crate::mul::{mul_classical, MulConfig};
use crate::rad_mag::addmul_rad_mag_fast;

/// Block multiplication with the default configuration.
///
/// # Panics
///
/// Panics if the inner dimensions differ.
#[must_use]
pub fn mul_block(a: &ArbMat, b: &ArbMat, prec: u64) -> ArbMat {
    mul_block_with(&MulConfig::default(), a, b, prec)
}

/// Exponent window of the nonzero midpoints seen in one row or column.
#[derive(Clone, Copy)]
struct Window {
    top: i64,
    bottom: i64,
}

impl Window {
    const EMPTY: Self = Self {
        top: i64::MIN,
        bottom: i64::MAX,
    };

    fn is_empty(self) -> bool {
        self.top < self.bottom
    }

    fn with(self, x: &Arf) -> Self {
        if x.is_zero() {
            self
        } else {
            Self {
                top: self.top.max(x.exponent()),
                bottom: self.bottom.min(x.bottom_exponent()),
            }
        }
    }

    fn height(self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.top - self.bottom
        }
    }
}

/// Block multiplication with explicit configuration.
///
/// Falls back to [`mul_classical`] for inputs that are not lagom, whose
/// midpoints are too long, or that are sparse with a large exponent spread.
///
/// # Panics
///
/// Panics if the inner dimensions differ.
#[must_use]
pub fn mul_block_with(config: &MulConfig, a: &ArbMat, b: &ArbMat, prec: u64) -> ArbMat {
    assert_eq!(a.num_cols(), b.num_rows(), "incompatible dimensions");
    let (m, n, p) = (a.num_rows(), a.num_cols(), b.num_cols());
    if m == 0 || n == 0 || p == 0 {
        return ArbMat::zeros(m, p);
    }
    if !a.is_lagom() || !b.is_lagom() {
        debug!("inputs not lagom, using classical multiplication");
        return mul_classical(a, b, prec);
    }

    let bits = a.max_bits().max(b.max_bits());
    let max_height = 1.25 * prec.min(bits) as f64 + 192.0;
    if bits > config.max_bits
        || (a.density() < config.density_cutoff
            && b.density() < config.density_cutoff
            && max_height > config.height_cutoff)
    {
        debug!(bits, max_height, "unsuitable for blocking, using classical");
        return mul_classical(a, b, prec);
    }

    let mut c = mul_block_mid(config, a, b, m, n, p, max_height as i64, prec);
    add_radius_products(config, &mut c, a, b, m, n, p);
    c
}

#[allow(clippy::too_many_arguments)]
fn mul_block_mid(
    config: &MulConfig,
    a: &ArbMat,
    b: &ArbMat,
    m: usize,
    n: usize,
    p: usize,
    max_height: i64,
    prec: u64,
) -> ArbMat {
    let a_mid = a.get_mid();
    let bt_mid = b.get_mid().transpose();
    let mut c = ArbMat::zeros(m, p);

    let mut start = 0;
    while start < n {
        let mut row_win = vec![Window::EMPTY; m];
        let mut col_win = vec![Window::EMPTY; p];
        let mut end = start;
        while end < n {
            let new_rows: Vec<Window> = (0..m).map(|i| row_win[i].with(a_mid[(i, end)].mid())).collect();
            let new_cols: Vec<Window> = (0..p).map(|j| col_win[j].with(bt_mid[(j, end)].mid())).collect();
            let height = new_rows.iter().chain(&new_cols).map(|w| w.height()).max().unwrap_or(0);
            let row_bits: i64 = new_rows.iter().map(|w| w.height()).sum();
            let col_bits: i64 = new_cols.iter().map(|w| w.height()).sum();
            let bytes = (row_bits + col_bits) as f64 * (end - start + 1) as f64 / 8.0;
            if end > start && (height > max_height || bytes > config.memory_cutoff) {
                break;
            }
            row_win = new_rows;
            col_win = new_cols;
            end += 1;
        }

        if end - start < config.min_block_size {
            let stop = (start + config.min_block_size).min(n);
            trace!(start, stop, "short block via ball dot products");
            for i in 0..m {
                for j in 0..p {
                    let terms = a_mid.row(i)[start..stop].iter().zip(&bt_mid.row(j)[start..stop]);
                    c[(i, j)] = Arb::dot(Some(&c[(i, j)]), false, terms, prec);
                }
            }
            start = stop;
        } else {
            trace!(start, end, "fixed-point block");
            let block = fixed_point_block(&a_mid, &bt_mid, &row_win, &col_win, start..end);
            for (i, row) in block.into_iter().enumerate() {
                for (j, (value, e)) in row.into_iter().enumerate() {
                    if value == IBig::ZERO {
                        continue;
                    }
                    let term = Arb::from_mid_rad_round(&Arf::from_ibig_2exp(&value, e), Mag::ZERO, prec);
                    c[(i, j)] = c[(i, j)].add(&term, prec);
                }
            }
            start = end;
        }
    }
    c
}

/// Exact products `(Σ_k A_ik·B_kj) · 2^−e` with their exponents `e`.
///
/// The `m × p` output is computed in tiles of at most `k × k` entries,
/// where `k` is the length of the block, so every tile multiplies a
/// near-square `k × k` by `k × k` pair.
fn fixed_point_block(
    a_mid: &ArbMat,
    bt_mid: &ArbMat,
    row_win: &[Window],
    col_win: &[Window],
    range: std::ops::Range<usize>,
) -> Vec<Vec<(IBig, i64)>> {
    let shift = |w: Window| if w.is_empty() { 0 } else { w.bottom };
    // every nonzero midpoint lies at or above the bottom of its window
    let to_fixed = |mat: &ArbMat, r: usize, e: i64| -> Vec<IBig> {
        mat.row(r)[range.clone()]
            .iter()
            .map(|x| x.mid().to_fixed(e).expect("entry below block window"))
            .collect()
    };
    let a_fix: Vec<Vec<IBig>> = (0..a_mid.num_rows())
        .map(|i| to_fixed(a_mid, i, shift(row_win[i])))
        .collect();
    let b_fix: Vec<Vec<IBig>> = (0..bt_mid.num_rows())
        .map(|j| to_fixed(bt_mid, j, shift(col_win[j])))
        .collect();

    let tile = range.len().max(1);
    let dot = |x: &[IBig], y: &[IBig]| x.iter().zip(y).fold(IBig::ZERO, |acc, (u, v)| acc + u * v);
    let tiles: Vec<(usize, usize, Vec<Vec<IBig>>)> = (0..a_fix.len())
        .step_by(tile)
        .flat_map(|i0| (0..b_fix.len()).step_by(tile).map(move |j0| (i0, j0)))
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(i0, j0)| {
            let rows = &a_fix[i0..(i0 + tile).min(a_fix.len())];
            let cols = &b_fix[j0..(j0 + tile).min(b_fix.len())];
            let sums = rows
                .iter()
                .map(|arow| cols.iter().map(|bcol| dot(arow, bcol)).collect())
                .collect();
            (i0, j0, sums)
        })
        .collect();

    let mut out: Vec<Vec<(IBig, i64)>> = (0..a_fix.len())
        .map(|i| {
            (0..b_fix.len())
                .map(|j| (IBig::ZERO, shift(row_win[i]) + shift(col_win[j])))
                .collect()
        })
        .collect();
    for (i0, j0, sums) in tiles {
        for (di, row) in sums.into_iter().enumerate() {
            for (dj, s) in row.into_iter().enumerate() {
                out[i0 + di][j0 + dj].0 = s;
            }
        }
    }
    out
}

#[allow(clippy::many_single_char_names)]
fn add_radius_products(
    config: &MulConfig,
    c: &mut ArbMat,
    a: &ArbMat,
    b: &ArbMat,
    m: usize,
    n: usize,
    p: usize,
) {
    let a_exact = a.is_exact();
    let b_exact = b.is_exact();
    if a_exact && b_exact {
        return;
    }
    let bt = b.transpose();
    let mid_mag = |x: &Arb| x.mid().mag();
    let a_abs: Vec<Mag> = a.iter().map(mid_mag).collect();
    let a_rad: Vec<Mag> = a.iter().map(|x| *x.rad()).collect();
    let bt_abs: Vec<Mag> = bt.iter().map(mid_mag).collect();
    let bt_rad: Vec<Mag> = bt.iter().map(|x| *x.rad()).collect();

    let mut rad = vec![Mag::ZERO; m * p];
    let cfg = &config.rad_mag;
    if a_exact {
        addmul_rad_mag_fast(&mut rad, &a_abs, &bt_rad, m, n, p, cfg);
    } else if b_exact {
        addmul_rad_mag_fast(&mut rad, &a_rad, &bt_abs, m, n, p, cfg);
    } else {
        // (|A| + a)·b + a·|B|
        let a_upper: Vec<Mag> = a_abs.iter().zip(&a_rad).map(|(x, r)| x.add(r)).collect();
        addmul_rad_mag_fast(&mut rad, &a_upper, &bt_rad, m, n, p, cfg);
        addmul_rad_mag_fast(&mut rad, &a_rad, &bt_abs, m, n, p, cfg);
    }
    for i in 0..m {
        for j in 0..p {
            c[(i, j)].add_error(&rad[i * p + j]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certus_exact::RatMat;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_blocks() -> MulConfig {
        MulConfig {
            min_block_size: 4,
            ..MulConfig::default()
        }
    }

    #[test]
    fn test_exact_integer_product() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let qa = RatMat::random_integer(&mut rng, 9, 13, 40);
        let qb = RatMat::random_integer(&mut rng, 13, 6, 40);
        let a = ArbMat::from_rat_mat(&qa, 200);
        let b = ArbMat::from_rat_mat(&qb, 200);
        let c = mul_block_with(&small_blocks(), &a, &b, 200);
        // 80-bit products summed over 13 terms fit in 200 bits.
        assert!(c.is_exact());
        assert!(c.contains_rat_mat(&qa.mul(&qb)));
    }

    #[test]
    fn test_contains_exact_product_with_radii() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let qa = RatMat::random(&mut rng, 12, 10, 16);
        let qb = RatMat::random(&mut rng, 10, 11, 16);
        let exact = qa.mul(&qb);
        for prec in [16, 64, 300] {
            let a = ArbMat::from_rat_mat(&qa, prec);
            let b = ArbMat::from_rat_mat(&qb, prec);
            let c = mul_block_with(&small_blocks(), &a, &b, prec);
            assert!(c.contains_rat_mat(&exact), "prec {prec}");
            assert!(c.overlaps(&mul_classical(&a, &b, prec)));
        }
    }

    #[test]
    fn test_wide_exponent_range_splits_blocks() {
        let n = 10;
        let a = ArbMat::from_fn(2, n, |i, k| Arb::pow2(if (i + k) % 2 == 0 { 3000 } else { -3000 }));
        let b = ArbMat::from_fn(n, 2, |k, j| Arb::from_i64((k + j) as i64 + 1));
        let c = mul_block_with(&small_blocks(), &a, &b, 64);
        assert!(c.overlaps(&mul_classical(&a, &b, 64)));
    }

    #[test]
    fn test_fixed_point_tiles_match_exact_sums() {
        // 7×3 by 3×5 gives 3×3 tiles with ragged edges
        let a = ArbMat::from_fn(7, 3, |i, k| Arb::from_i64((i * 3 + k) as i64 - 9).mul_2exp(k as i64 - 4));
        let b = ArbMat::from_fn(3, 5, |k, j| Arb::from_i64((k + 2 * j) as i64 + 1).mul_2exp(2 * j as i64));
        let (a_mid, bt_mid) = (a.get_mid(), b.get_mid().transpose());
        let row_win: Vec<Window> = (0..7)
            .map(|i| a_mid.row(i).iter().fold(Window::EMPTY, |w, x| w.with(x.mid())))
            .collect();
        let col_win: Vec<Window> = (0..5)
            .map(|j| bt_mid.row(j).iter().fold(Window::EMPTY, |w, x| w.with(x.mid())))
            .collect();
        let block = fixed_point_block(&a_mid, &bt_mid, &row_win, &col_win, 0..3);
        let exact = mul_classical(&a, &b, 200);
        assert_eq!(block.len(), 7);
        for (i, row) in block.iter().enumerate() {
            assert_eq!(row.len(), 5);
            for (j, (value, e)) in row.iter().enumerate() {
                let entry = Arb::from_arf(Arf::from_ibig_2exp(value, *e));
                assert_eq!(entry, exact[(i, j)], "entry ({i}, {j})");
            }
        }
    }

    #[test]
    fn test_mixed_exponents_within_window() {
        let n = 12;
        let a = ArbMat::from_fn(n, n, |i, k| Arb::from_i64((i + k) as i64 + 1).mul_2exp(((i * k) % 7) as i64 - 3));
        let b = ArbMat::from_fn(n, n, |k, j| Arb::from_i64(k as i64 - j as i64).mul_2exp(((k + j) % 5) as i64));
        let c = mul_block_with(&small_blocks(), &a, &b, 128);
        assert!(c.is_exact());
        assert_eq!(c, mul_classical(&a, &b, 128));
    }

    #[test]
    fn test_non_lagom_falls_back() {
        let mut a = ArbMat::identity(3);
        a[(0, 0)] = Arb::pow2(certus_ball::LAGOM_EXP * 2);
        let b = ArbMat::ones(3, 3);
        assert_eq!(mul_block(&a, &b, 64), mul_classical(&a, &b, 64));
    }

    #[test]
    fn test_empty_shapes() {
        let c = mul_block(&ArbMat::zeros(3, 0), &ArbMat::zeros(0, 4), 64);
        assert_eq!((c.num_rows(), c.num_cols()), (3, 4));
        assert!(c.is_zero());
    }
}
