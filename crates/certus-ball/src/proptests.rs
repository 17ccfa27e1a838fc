//! Property-based containment tests for ball arithmetic.

#[cfg(test)]
mod tests {
    use dashu::integer::{IBig, UBig};
    use dashu::rational::RBig;
    use proptest::prelude::*;

    use crate::{Arb, Arf, Mag, Round};

    fn small_rational() -> impl Strategy<Value = RBig> {
        (-10_000i64..10_000i64, 1u64..500u64)
            .prop_map(|(p, q)| RBig::from_parts(IBig::from(p), UBig::from(q)))
    }

    fn nonzero_rational() -> impl Strategy<Value = RBig> {
        (prop_oneof![(-10_000i64..=-1i64), (1i64..=10_000i64)], 1u64..500u64)
            .prop_map(|(p, q)| RBig::from_parts(IBig::from(p), UBig::from(q)))
    }

    fn precision() -> impl Strategy<Value = u64> {
        prop_oneof![Just(2u64), 8u64..80u64, Just(300u64)]
    }

    proptest! {
        #[test]
        fn ball_add_contains_sum(a in small_rational(), b in small_rational(), prec in precision()) {
            let x = Arb::from_rational(&a, prec);
            let y = Arb::from_rational(&b, prec);
            prop_assert!(x.add(&y, prec).contains_rational(&(&a + &b)));
            prop_assert!(x.sub(&y, prec).contains_rational(&(&a - &b)));
        }

        #[test]
        fn ball_mul_contains_product(a in small_rational(), b in small_rational(), prec in precision()) {
            let x = Arb::from_rational(&a, prec);
            let y = Arb::from_rational(&b, prec);
            prop_assert!(x.mul(&y, prec).contains_rational(&(&a * &b)));
            prop_assert!(x.sqr(prec).contains_rational(&(&a * &a)));
        }

        #[test]
        fn ball_div_contains_quotient(a in small_rational(), b in nonzero_rational(), prec in precision()) {
            let x = Arb::from_rational(&a, prec);
            let y = Arb::from_rational(&b, prec);
            prop_assert!(x.div(&y, prec).contains_rational(&(&a / &b)));
        }

        #[test]
        fn dot_contains_exact(
            pairs in prop::collection::vec((small_rational(), small_rational()), 0..12),
            prec in precision(),
        ) {
            let xs: Vec<Arb> = pairs.iter().map(|(p, _)| Arb::from_rational(p, prec)).collect();
            let ys: Vec<Arb> = pairs.iter().map(|(_, q)| Arb::from_rational(q, prec)).collect();
            let exact = pairs.iter().fold(RBig::ZERO, |acc, (p, q)| acc + p * q);
            let d = Arb::dot(None, false, xs.iter().zip(ys.iter()), prec);
            prop_assert!(d.contains_rational(&exact));
        }

        #[test]
        fn rounding_error_is_bounded(a in small_rational(), prec in precision()) {
            let (x, r) = Arf::from_rational(&a, prec, Round::Near);
            let err = Arf::from_mag(&r.error()).unwrap_or_default().to_rational();
            let diff = x.to_rational() - &a;
            let diff = if diff < RBig::ZERO { -diff } else { diff };
            prop_assert!(diff <= err);
        }

        #[test]
        fn ball_sqrt_contains_root(p in 0u64..100_000u64, prec in precision()) {
            let x = Arb::from_i64(p as i64 * p as i64);
            let s = x.sqrt(prec);
            prop_assert!(s.contains_arf(&Arf::from_u64(p)));
        }

        #[test]
        fn mag_add_is_upper_bound(a in 0u64..1_000_000_000u64, b in 0u64..1_000_000_000u64) {
            let m = Mag::from_u64(a).add(&Mag::from_u64(b));
            prop_assert!(m >= Mag::from_u64_lower(a + b));
            prop_assert!(m.to_f64() >= (a + b) as f64);
        }
    }
}
