//! Gaussian density evaluation and distances between curves
//!
//! Pure functions over `Fixed18`. Degenerate curves (zero sigma or lambda)
//! evaluate to zero instead of failing.

use solana_program::program_error::ProgramError;

use crate::{constants::EXP_CEILING, math::fixed_point::{Fixed18, SCALE}, state::Curve};

/// Beyond this many standard deviations the exponent is past `EXP_CEILING`
const MAX_Z_SCORE: i128 = 17;

/// lambda / (sigma * sqrt(2pi)) * exp(-(x - mu)^2 / (2 sigma^2))
pub fn evaluate(
    x: Fixed18,
    mu: Fixed18,
    sigma: Fixed18,
    lambda: Fixed18,
) -> Result<Fixed18, ProgramError> {
    if sigma.raw <= 0 || lambda.raw <= 0 {
        return Ok(Fixed18::ZERO);
    }

    let diff = match x.checked_sub(mu) {
        Ok(diff) => diff,
        Err(_) => return Ok(Fixed18::ZERO),
    };

    // Cheap tail cut before the division can overflow
    if diff.raw.unsigned_abs() / MAX_Z_SCORE as u128 > sigma.raw as u128 {
        return Ok(Fixed18::ZERO);
    }

    let z = diff.checked_div(sigma)?;
    let exponent = z.checked_mul(z)?.checked_div(Fixed18::TWO)?;
    if exponent.raw > EXP_CEILING * SCALE {
        return Ok(Fixed18::ZERO);
    }

    let peak = lambda.checked_div(sigma.checked_mul(Fixed18::SQRT_2PI)?)?;
    peak.checked_mul(exponent.checked_neg()?.exp()?)
}

/// Signed density delta `curve1(x) - curve2(x)`
pub fn difference(x: Fixed18, curve1: &Curve, curve2: &Curve) -> Result<Fixed18, ProgramError> {
    let first = evaluate(x, curve1.mu, curve1.sigma, curve1.lambda)?;
    let second = evaluate(x, curve2.mu, curve2.sigma, curve2.lambda)?;
    first.checked_sub(second)
}

/// Closed-form KL(curve1 || curve2), clamped at zero
///
/// Evaluated as `-ln(r) + (r^2 + d^2) / 2 - 1/2` with `r = sigma1 / sigma2`
/// and `d = (mu1 - mu2) / sigma2`, which keeps every intermediate near unit
/// scale. `ln(r)` comes from the two sigmas separately so a ratio below one
/// ulp still counts.
pub fn kl_divergence(curve1: &Curve, curve2: &Curve) -> Result<Fixed18, ProgramError> {
    if curve1.is_degenerate() || curve2.is_degenerate() {
        return Ok(Fixed18::ZERO);
    }

    let ratio = curve1.sigma.checked_div(curve2.sigma)?;
    let log_ratio = curve1.sigma.ln()?.checked_sub(curve2.sigma.ln()?)?;
    let mean_gap = curve1.mu.checked_sub(curve2.mu)?.checked_div(curve2.sigma)?;

    let quadratic = ratio
        .checked_mul(ratio)?
        .checked_add(mean_gap.checked_mul(mean_gap)?)?
        .checked_div(Fixed18::TWO)?;

    let kl = quadratic
        .checked_sub(log_ratio)?
        .checked_sub(Fixed18::HALF)?;

    Ok(kl.max(Fixed18::ZERO))
}

/// sqrt((lambda1 - lambda2)^2 + (KL(1->2) - KL(2->1))^2)
///
/// A distance-moved proxy used to price trades, not a true Wasserstein metric.
pub fn wasserstein_distance(curve1: &Curve, curve2: &Curve) -> Result<Fixed18, ProgramError> {
    if curve1.is_degenerate() || curve2.is_degenerate() {
        return Ok(Fixed18::ZERO);
    }

    let scale_gap = curve1.lambda.checked_sub(curve2.lambda)?;
    let asymmetry = kl_divergence(curve1, curve2)?.checked_sub(kl_divergence(curve2, curve1)?)?;

    scale_gap
        .checked_mul(scale_gap)?
        .checked_add(asymmetry.checked_mul(asymmetry)?)?
        .sqrt()
}

/// sqrt(2 * sigma * sqrt(2pi)), the norm divisor of a scaled Gaussian
fn norm_divisor(sigma: Fixed18) -> Result<Fixed18, ProgramError> {
    Fixed18::TWO
        .checked_mul(sigma)?
        .checked_mul(Fixed18::SQRT_2PI)?
        .sqrt()
}

/// L2 norm of `lambda * N(mu, sigma^2)`, `lambda / sqrt(2 sigma sqrt(2pi))`
pub fn l2_norm(curve: &Curve) -> Result<Fixed18, ProgramError> {
    if curve.is_degenerate() {
        return Ok(Fixed18::ZERO);
    }
    curve.lambda.checked_div(norm_divisor(curve.sigma)?)
}

/// Scale factor that gives a curve of width `sigma` the norm `k`
pub fn lambda_for_norm(k: Fixed18, sigma: Fixed18) -> Result<Fixed18, ProgramError> {
    if sigma.raw <= 0 {
        return Ok(Fixed18::ZERO);
    }
    k.checked_mul(norm_divisor(sigma)?)
}

/// Fixed-point square root
pub fn sqrt(x: Fixed18) -> Result<Fixed18, ProgramError> {
    x.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STANDARD_PEAK: i128 = 398_942_280_401_432_677;

    fn curve(mu: i64, sigma: i64, lambda: i64) -> Curve {
        Curve::new(Fixed18::from_int(mu), Fixed18::from_int(sigma), Fixed18::from_int(lambda))
    }

    #[test]
    fn test_standard_normal_peak() {
        let peak = evaluate(Fixed18::ZERO, Fixed18::ZERO, Fixed18::ONE, Fixed18::ONE).unwrap();
        assert!((peak.raw - STANDARD_PEAK).abs() <= 10);
    }

    #[test]
    fn test_one_sigma_density() {
        // phi(1) = 0.241970724519143349
        let value = evaluate(Fixed18::ONE, Fixed18::ZERO, Fixed18::ONE, Fixed18::ONE).unwrap();
        assert!((value.raw - 241_970_724_519_143_349).abs() <= 1_000);

        // Symmetric around the mean
        let mirrored = evaluate(Fixed18::from_int(-1), Fixed18::ZERO, Fixed18::ONE, Fixed18::ONE).unwrap();
        assert_eq!(value, mirrored);
    }

    #[test]
    fn test_degenerate_inputs_are_zero() {
        let x = Fixed18::from_int(3);
        assert_eq!(evaluate(x, Fixed18::ONE, Fixed18::ZERO, Fixed18::ONE).unwrap(), Fixed18::ZERO);
        assert_eq!(evaluate(x, Fixed18::ONE, Fixed18::ONE, Fixed18::ZERO).unwrap(), Fixed18::ZERO);

        let flat = curve(0, 0, 1);
        let normal = curve(0, 1, 1);
        assert_eq!(kl_divergence(&flat, &normal).unwrap(), Fixed18::ZERO);
        assert_eq!(wasserstein_distance(&normal, &flat).unwrap(), Fixed18::ZERO);
        assert_eq!(l2_norm(&flat).unwrap(), Fixed18::ZERO);
    }

    #[test]
    fn test_far_tail_is_zero() {
        let x = Fixed18::from_int(20);
        assert_eq!(evaluate(x, Fixed18::ZERO, Fixed18::ONE, Fixed18::ONE).unwrap(), Fixed18::ZERO);

        // Past the exponent ceiling but inside the z-score cut
        let x = Fixed18::from_raw(16_500_000_000_000_000_000);
        assert_eq!(evaluate(x, Fixed18::ZERO, Fixed18::ONE, Fixed18::ONE).unwrap(), Fixed18::ZERO);

        let extreme = Fixed18::from_raw(i128::MAX);
        assert_eq!(
            evaluate(extreme, Fixed18::from_raw(i128::MIN), Fixed18::ONE, Fixed18::ONE).unwrap(),
            Fixed18::ZERO
        );
    }

    #[test]
    fn test_difference_is_signed() {
        let wide = curve(0, 2, 1);
        let narrow = curve(0, 1, 1);
        let delta = difference(Fixed18::ZERO, &narrow, &wide).unwrap();
        assert!(delta.is_positive());
        let reverse = difference(Fixed18::ZERO, &wide, &narrow).unwrap();
        assert_eq!(delta.checked_neg().unwrap(), reverse);
        assert_eq!(difference(Fixed18::ONE, &wide, &wide).unwrap(), Fixed18::ZERO);
    }

    #[test]
    fn test_kl_divergence() {
        let a = curve(0, 1, 1);
        assert_eq!(kl_divergence(&a, &a).unwrap(), Fixed18::ZERO);

        // KL(N(0,1) || N(1,1)) = 0.5
        let shifted = curve(1, 1, 1);
        let kl = kl_divergence(&a, &shifted).unwrap();
        assert!((kl.raw - Fixed18::HALF.raw).abs() <= 10);

        // KL(N(0,1) || N(0,2)) = ln 2 + 1/8 - 1/2 = 0.318147180559945309
        let wide = curve(0, 2, 1);
        let kl = kl_divergence(&a, &wide).unwrap();
        assert!((kl.raw - 318_147_180_559_945_309).abs() <= 100);
    }

    #[test]
    fn test_kl_divergence_of_vanishing_width_ratio() {
        // sigma1 / sigma2 = 5e-19 truncates to zero, -ln(r) is still ~42.1
        let tiny = Curve::new(Fixed18::ZERO, Fixed18::from_raw(1), Fixed18::ONE);
        let wide = curve(0, 2, 1);
        let kl = kl_divergence(&tiny, &wide).unwrap();
        assert!(kl > Fixed18::from_int(41));
        assert!(kl < Fixed18::from_int(42));
    }

    #[test]
    fn test_wasserstein_distance() {
        let a = curve(0, 1, 1);
        assert_eq!(wasserstein_distance(&a, &a).unwrap(), Fixed18::ZERO);

        // Equal widths: KL is symmetric, only the scale gap remains
        let b = curve(1, 1, 3);
        let distance = wasserstein_distance(&a, &b).unwrap();
        assert!((distance.raw - Fixed18::TWO.raw).abs() <= 10);

        let c = curve(0, 2, 1);
        assert_eq!(wasserstein_distance(&a, &c).unwrap(), wasserstein_distance(&c, &a).unwrap());
        assert!(wasserstein_distance(&a, &c).unwrap().is_positive());
    }

    #[test]
    fn test_l2_norm_reference_value() {
        let norm = l2_norm(&curve(0, 1, 1)).unwrap();
        // 1 / sqrt(2 * sqrt(2pi)) = 0.446622...
        assert!((norm.raw - 446_622_000_000_000_000).abs() < 1_000_000_000_000);

        let sigma = Fixed18::from_int(2);
        let lambda = lambda_for_norm(norm, sigma).unwrap();
        let rebuilt = l2_norm(&Curve::new(Fixed18::ZERO, sigma, lambda)).unwrap();
        assert!(rebuilt.approx_eq_bps(norm, 1));
    }

    #[test]
    fn test_sqrt_delegates_to_fixed_point() {
        assert_eq!(sqrt(Fixed18::from_int(9)).unwrap(), Fixed18::from_int(3));
    }
}
