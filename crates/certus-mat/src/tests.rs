//! Integration tests for certus-mat.

#[cfg(test)]
mod integration_tests {
    use crate::charpoly::{charpoly, trace};
    use crate::cholesky::{spd_det, spd_solve};
    use crate::dense::ArbMat;
    use crate::det::{det, det_lu, det_precond};
    use crate::error::MatError;
    use crate::ladder::PrecisionLadder;
    use crate::ldl::{ldl, solve_ldl_precomp};
    use crate::mul::{mul, mul_classical, mul_threaded, mul_with, MulConfig};
    use crate::mul_block::mul_block_with;
    use crate::solve::{approx_inv, approx_solve, inv, solve, solve_lu, solve_preapprox};
    use certus_exact::RatMat;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_multiplication_strategies_agree() {
        let mut rng = ChaCha8Rng::seed_from_u64(101);
        let qa = RatMat::random(&mut rng, 9, 14, 12);
        let qb = RatMat::random(&mut rng, 14, 8, 12);
        let exact = qa.mul(&qb);
        let prec = 96;
        let a = ArbMat::from_rat_mat(&qa, prec);
        let b = ArbMat::from_rat_mat(&qb, prec);

        let classical = mul_classical(&a, &b, prec);
        let threaded = mul_threaded(&a, &b, prec, 3);
        assert!(classical.contains_rat_mat(&exact));
        assert_eq!(classical, threaded);

        for min_block_size in 0..10 {
            let config = MulConfig {
                min_block_size,
                ..MulConfig::default()
            };
            let block = mul_block_with(&config, &a, &b, prec);
            assert!(block.contains_rat_mat(&exact), "min_block_size {min_block_size}");
            assert!(block.overlaps(&classical));
        }

        // a zero cutoff forces the block path through the dispatcher
        let forced = MulConfig {
            block_cutoffs: [0, 0, 0],
            ..MulConfig::default()
        };
        assert!(mul_with(&forced, &a, &b, prec).contains_rat_mat(&exact));
    }

    #[test]
    fn test_trace_of_product_commutes() {
        let mut rng = ChaCha8Rng::seed_from_u64(102);
        let a = ArbMat::randtest(&mut rng, 5, 7, 80, 6);
        let b = ArbMat::randtest(&mut rng, 7, 5, 80, 6);
        let ab = trace(&mul(&a, &b, 80), 80);
        let ba = trace(&mul(&b, &a, 80), 80);
        assert!(ab.overlaps(&ba));
    }

    #[test]
    fn test_charpoly_agrees_with_det() {
        let mut rng = ChaCha8Rng::seed_from_u64(103);
        let q = RatMat::random(&mut rng, 5, 5, 8);
        let a = ArbMat::from_rat_mat(&q, 128);
        let cp = charpoly(&a, 128);
        // c_0 = det(−A) = −det(A) for odd n
        assert!(cp[0].neg().overlaps(&det(&a, 128)));
        assert!(cp[4].neg().overlaps(&trace(&a, 128)));
    }

    #[test]
    fn test_empty_determinant_is_one() {
        let empty = ArbMat::zeros(0, 0);
        assert!(det(&empty, 64).is_one());
        assert!(det_lu(&empty, 64).is_one());
        assert!(det_precond(&empty, 64).is_one());
        assert!(spd_det(&empty, 64).unwrap().is_one());
    }

    #[test]
    fn test_hilbert_determinant_via_ladder() {
        let n = 12;
        let exact = RatMat::hilbert(n).det();
        let ladder = PrecisionLadder::new(32, 4096);
        let result = ladder.run(|prec| {
            let d = det(&ArbMat::hilbert(n, prec), prec);
            if d.rel_accuracy_bits() >= 50 {
                Ok(d)
            } else {
                Err(MatError::NotCertified { prec })
            }
        });
        let d = result.unwrap();
        assert!(d.contains_rational(&exact));
        assert!(d.is_positive());
    }

    #[test]
    fn test_hilbert_solve_via_ladder() {
        let n = 10;
        let q = RatMat::hilbert(n);
        let qb = RatMat::from_i64_rows(&(0..n).map(|i| vec![i as i64 + 1]).collect::<Vec<_>>());
        let exact = q.solve(&qb).unwrap();
        let ladder = PrecisionLadder::default();
        let x = ladder
            .run(|prec| solve(&ArbMat::hilbert(n, prec), &ArbMat::from_rat_mat(&qb, prec), prec))
            .unwrap();
        assert!(x.contains_rat_mat(&exact));
    }

    #[test]
    fn test_inverse_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(104);
        let q = RatMat::random(&mut rng, 12, 12, 10);
        let a = ArbMat::from_rat_mat(&q, 128);
        let ai = inv(&a, 128).unwrap();
        assert!(ai.contains_rat_mat(&q.inverse().unwrap()));
        assert!(inv(&ai, 128).unwrap().overlaps(&a));
    }

    #[test]
    fn test_singular_never_certified() {
        let mut rng = ChaCha8Rng::seed_from_u64(105);
        // rank deficient: last row is the sum of the first two
        let mut q = RatMat::random_integer(&mut rng, 8, 8, 8);
        for j in 0..8 {
            q[(7, j)] = &q[(0, j)] + &q[(1, j)];
        }
        assert!(!q.is_invertible());
        for prec in [32, 64, 256, 1024] {
            let a = ArbMat::from_rat_mat(&q, prec);
            assert!(solve(&a, &ArbMat::identity(8), prec).is_err());
            assert!(solve_lu(&a, &ArbMat::identity(8), prec).is_err());
            assert!(inv(&a, prec).is_err());
            assert!(det(&a, prec).contains_zero());
        }
    }

    #[test]
    fn test_preapprox_with_computed_inverse() {
        let mut rng = ChaCha8Rng::seed_from_u64(106);
        let q = RatMat::random(&mut rng, 16, 16, 8);
        let qb = RatMat::random(&mut rng, 16, 4, 8);
        let a = ArbMat::from_rat_mat(&q, 128);
        let b = ArbMat::from_rat_mat(&qb, 128);
        let r = approx_inv(&a, 128).unwrap();
        let t = approx_solve(&a, &b, 128).unwrap();
        let x = solve_preapprox(&a, &b, &r, &t, 128).unwrap();
        assert!(x.contains_rat_mat(&q.solve(&qb).unwrap()));
        assert!(x.overlaps(&solve_lu(&a, &b, 128).unwrap()));
    }

    #[test]
    fn test_spd_routes_agree() {
        let mut rng = ChaCha8Rng::seed_from_u64(107);
        let q = RatMat::random_spd(&mut rng, 10, 5);
        let qb = RatMat::random_integer(&mut rng, 10, 2, 5);
        let exact = q.solve(&qb).unwrap();
        let a = ArbMat::from_rat_mat(&q, 200);
        let b = ArbMat::from_rat_mat(&qb, 200);

        let via_cho = spd_solve(&a, &b, 200).unwrap();
        let via_ldl = solve_ldl_precomp(&ldl(&a, 200).unwrap(), &b, 200);
        let via_lu = solve_lu(&a, &b, 200).unwrap();
        for x in [&via_cho, &via_ldl, &via_lu] {
            assert!(x.contains_rat_mat(&exact));
        }
        assert!(spd_det(&a, 200).unwrap().overlaps(&det(&a, 200)));
    }

    #[test]
    fn test_ball_inputs_enclose_members() {
        let mut rng = ChaCha8Rng::seed_from_u64(108);
        let a = ArbMat::randtest(&mut rng, 6, 6, 64, 3);
        let shifted = a.add(&ArbMat::identity(6).mul_si(64, 64), 64);
        // the midpoint matrix is one member of the input balls
        let member = shifted.get_mid();
        assert!(det(&shifted, 64).overlaps(&det(&member, 128)));
        let x = inv(&shifted, 64).unwrap();
        assert!(x.overlaps(&inv(&member, 128).unwrap()));
        assert!(x.contains(&x.get_mid()));
    }
}
