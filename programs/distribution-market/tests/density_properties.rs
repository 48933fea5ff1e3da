use distribution_market::{
    math::{difference, evaluate, kl_divergence, wasserstein_distance, Fixed18},
    state::Curve,
    InvariantEngine,
};
use proptest::prelude::*;

const SCALE: i128 = 1_000_000_000_000_000_000;

/// 1e-9, well above fixed-point rounding
const DROP_TOLERANCE: i128 = 1_000_000_000;

fn curve_strategy() -> impl Strategy<Value = Curve> {
    (-10 * SCALE..10 * SCALE, SCALE / 10..5 * SCALE, SCALE / 10..5 * SCALE).prop_map(
        |(mu, sigma, lambda)| {
            Curve::new(Fixed18::from_raw(mu), Fixed18::from_raw(sigma), Fixed18::from_raw(lambda))
        },
    )
}

/// Curves far narrower than the widest `curve_strategy` curve
fn narrow_curve_strategy() -> impl Strategy<Value = Curve> {
    (-10 * SCALE..10 * SCALE, SCALE / 100..SCALE / 5, SCALE / 10..5 * SCALE).prop_map(
        |(mu, sigma, lambda)| {
            Curve::new(Fixed18::from_raw(mu), Fixed18::from_raw(sigma), Fixed18::from_raw(lambda))
        },
    )
}

fn any_width_curve_strategy() -> impl Strategy<Value = Curve> {
    prop_oneof![curve_strategy(), narrow_curve_strategy()]
}

fn point_strategy() -> impl Strategy<Value = Fixed18> {
    (-40 * SCALE..40 * SCALE).prop_map(Fixed18::from_raw)
}

proptest! {
    #[test]
    fn test_density_is_bounded_by_peak(curve in curve_strategy(), x in point_strategy()) {
        let value = curve.density_at(x).unwrap();
        prop_assert!(!value.is_negative());
        prop_assert!(value <= curve.max_density().unwrap());
    }

    #[test]
    fn test_degenerate_parameters_evaluate_to_zero(
        x in point_strategy(),
        mu in point_strategy(),
        other in SCALE / 10..5 * SCALE,
    ) {
        let other = Fixed18::from_raw(other);
        prop_assert_eq!(evaluate(x, mu, Fixed18::ZERO, other).unwrap(), Fixed18::ZERO);
        prop_assert_eq!(evaluate(x, mu, other, Fixed18::ZERO).unwrap(), Fixed18::ZERO);
    }

    #[test]
    fn test_identical_curves_are_indistinguishable(curve in curve_strategy(), x in point_strategy()) {
        prop_assert_eq!(difference(x, &curve, &curve).unwrap(), Fixed18::ZERO);
        prop_assert_eq!(kl_divergence(&curve, &curve).unwrap(), Fixed18::ZERO);
        prop_assert_eq!(wasserstein_distance(&curve, &curve).unwrap(), Fixed18::ZERO);
    }

    #[test]
    fn test_distances_are_non_negative(first in curve_strategy(), second in curve_strategy()) {
        prop_assert!(!kl_divergence(&first, &second).unwrap().is_negative());
        prop_assert!(!kl_divergence(&second, &first).unwrap().is_negative());
        prop_assert!(!wasserstein_distance(&first, &second).unwrap().is_negative());
    }

    #[test]
    fn test_fee_tracks_distance(
        old in curve_strategy(),
        near in curve_strategy(),
        far in curve_strategy(),
        fee_bps in 0u16..=10_000,
    ) {
        let near_distance = wasserstein_distance(&old, &near).unwrap();
        let far_distance = wasserstein_distance(&old, &far).unwrap();
        let near_fee = InvariantEngine::calculate_fee(&old, &near, fee_bps).unwrap();
        let far_fee = InvariantEngine::calculate_fee(&old, &far, fee_bps).unwrap();

        if near_distance <= far_distance {
            prop_assert!(near_fee <= far_fee);
        } else {
            prop_assert!(near_fee >= far_fee);
        }
    }

    #[test]
    fn test_required_collateral_covers_every_point(
        old in curve_strategy(),
        new in any_width_curve_strategy(),
        near_new in any::<bool>(),
        offset in -10 * SCALE..10 * SCALE,
    ) {
        // Sample within ten sigmas of one of the curves
        let anchor = if near_new { &new } else { &old };
        let x = anchor
            .mu
            .checked_add(Fixed18::from_raw(offset).checked_mul(anchor.sigma).unwrap())
            .unwrap();

        // Both densities vanish at the caller's point, so only the derived drop counts
        let far = Fixed18::from_int(1_000);
        let required = InvariantEngine::required_collateral(&old, &new, far).unwrap();
        let at_x = difference(x, &old, &new).unwrap();

        prop_assert!(!required.is_negative());
        prop_assert!(
            required.raw + DROP_TOLERANCE >= at_x.raw,
            "required {} below drop {} at {}",
            required,
            at_x,
            x
        );
    }

    #[test]
    fn test_sqrt_is_monotonic(a in 0..i128::MAX / SCALE, b in 0..i128::MAX / SCALE) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let low_root = Fixed18::from_raw(low).sqrt().unwrap();
        let high_root = Fixed18::from_raw(high).sqrt().unwrap();
        prop_assert!(low_root <= high_root);
    }

    #[test]
    fn test_sqrt_exact_on_perfect_squares(root in 0i64..1_000_000_000) {
        let value = Fixed18::from_int(root);
        let square = value.checked_mul(value).unwrap();
        prop_assert_eq!(square.sqrt().unwrap(), value);
    }
}
