//! Property-based containment tests for matrix operations.

#[cfg(test)]
mod tests {
    use certus_exact::RatMat;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::charpoly::charpoly;
    use crate::dense::ArbMat;
    use crate::det::det;
    use crate::mul::{mul, mul_classical, sqr};
    use crate::mul_block::mul_block_with;
    use crate::solve::solve;
    use crate::MulConfig;

    fn precision() -> impl Strategy<Value = u64> {
        prop_oneof![Just(8u64), 30u64..120u64, Just(400u64)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn product_contains_exact(
            seed in any::<u64>(),
            m in 1usize..7,
            n in 1usize..7,
            p in 1usize..7,
            prec in precision(),
        ) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let qa = RatMat::random(&mut rng, m, n, 10);
            let qb = RatMat::random(&mut rng, n, p, 10);
            let exact = qa.mul(&qb);
            let a = ArbMat::from_rat_mat(&qa, prec);
            let b = ArbMat::from_rat_mat(&qb, prec);
            prop_assert!(mul(&a, &b, prec).contains_rat_mat(&exact));
            prop_assert!(mul_classical(&a, &b, prec).contains_rat_mat(&exact));
        }

        #[test]
        fn block_product_contains_exact(
            seed in any::<u64>(),
            n in 1usize..24,
            min_block_size in 0usize..10,
            prec in precision(),
        ) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let qa = RatMat::random(&mut rng, 5, n, 16);
            let qb = RatMat::random(&mut rng, n, 4, 16);
            let config = MulConfig { min_block_size, ..MulConfig::default() };
            let a = ArbMat::from_rat_mat(&qa, prec);
            let b = ArbMat::from_rat_mat(&qb, prec);
            let c = mul_block_with(&config, &a, &b, prec);
            prop_assert!(c.contains_rat_mat(&qa.mul(&qb)));
        }

        #[test]
        fn square_contains_exact(seed in any::<u64>(), n in 1usize..8, prec in precision()) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let q = RatMat::random(&mut rng, n, n, 8);
            prop_assert!(sqr(&ArbMat::from_rat_mat(&q, prec), prec).contains_rat_mat(&q.mul(&q)));
        }

        #[test]
        fn det_contains_exact(seed in any::<u64>(), n in 0usize..9, prec in precision()) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let q = RatMat::random(&mut rng, n, n, 6);
            prop_assert!(det(&ArbMat::from_rat_mat(&q, prec), prec).contains_rational(&q.det()));
        }

        #[test]
        fn solve_contains_exact_when_certified(
            seed in any::<u64>(),
            n in 1usize..8,
            prec in precision(),
        ) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let q = RatMat::random(&mut rng, n, n, 6);
            let qb = RatMat::random(&mut rng, n, 2, 6);
            match (solve(&ArbMat::from_rat_mat(&q, prec), &ArbMat::from_rat_mat(&qb, prec), prec), q.solve(&qb)) {
                (Ok(x), Some(exact)) => prop_assert!(x.contains_rat_mat(&exact)),
                (Ok(_), None) => prop_assert!(false, "singular system certified"),
                (Err(_), _) => {}
            }
        }

        #[test]
        fn charpoly_contains_exact(seed in any::<u64>(), n in 0usize..6, prec in precision()) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let q = RatMat::random(&mut rng, n, n, 6);
            let cp = charpoly(&ArbMat::from_rat_mat(&q, prec), prec);
            for (x, e) in cp.iter().zip(q.charpoly().iter()) {
                prop_assert!(x.contains_rational(e));
            }
        }
    }
}
