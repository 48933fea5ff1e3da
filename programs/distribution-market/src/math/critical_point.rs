//! Locating the point where a curve change loses the most density
//!
//! For `h(x) = old(x) - new(x)` the collateral a trade must post is the
//! maximum of `h`. A coarse grid covers both curves' mass and a finer scan
//! around each mean resolves the narrower curve. Every sampled peak is then
//! polished by Newton-Raphson on `h'(x) = 0`, kept inside the bracket of its
//! neighbouring samples and falling back to bisection when a step leaves it.

use solana_program::program_error::ProgramError;

use crate::{
    constants::{
        CRITICAL_GRID_POINTS, CRITICAL_LOCAL_STEPS_PER_SIGMA, CRITICAL_REFINE_ITERATIONS,
        CRITICAL_WINDOW_SIGMAS,
    },
    math::{density::difference, Fixed18},
    state::Curve,
};

/// Samples in a scan around one curve's mean, both ends included
const LOCAL_POINTS: usize = (2 * CRITICAL_WINDOW_SIGMAS * CRITICAL_LOCAL_STEPS_PER_SIGMA + 1) as usize;

/// Density and its first and second derivative at `x`
fn profile(curve: &Curve, x: Fixed18) -> Result<(Fixed18, Fixed18, Fixed18), ProgramError> {
    let value = curve.density_at(x)?;
    if value.is_zero() {
        return Ok((Fixed18::ZERO, Fixed18::ZERO, Fixed18::ZERO));
    }

    // f' = -f z / sigma, f'' = f (z^2 - 1) / sigma^2
    let z = x.checked_sub(curve.mu)?.checked_div(curve.sigma)?;
    let first = value.checked_mul(z)?.checked_div(curve.sigma)?.checked_neg()?;
    let second = value
        .checked_mul(z.checked_mul(z)?.checked_sub(Fixed18::ONE)?)?
        .checked_div(curve.sigma)?
        .checked_div(curve.sigma)?;

    Ok((value, first, second))
}

/// `h`, `h'` and `h''` at `x`
fn drop_profile(old: &Curve, new: &Curve, x: Fixed18) -> Result<(Fixed18, Fixed18, Fixed18), ProgramError> {
    let (old_value, old_first, old_second) = profile(old, x)?;
    let (new_value, new_first, new_second) = profile(new, x)?;
    Ok((
        old_value.checked_sub(new_value)?,
        old_first.checked_sub(new_first)?,
        old_second.checked_sub(new_second)?,
    ))
}

/// Scan window covering both curves' mass
fn scan_window(old: &Curve, new: &Curve) -> Result<(Fixed18, Fixed18), ProgramError> {
    let widest = old.sigma.max(new.sigma);
    let reach = widest.checked_mul(Fixed18::from_int(CRITICAL_WINDOW_SIGMAS as i64))?;

    let lower = old.mu.min(new.mu).checked_sub(reach)?;
    let upper = old.mu.max(new.mu).checked_add(reach)?;
    Ok((lower, upper))
}

/// Climb from a sampled peak toward the maximum inside `[lower, upper]`
///
/// Returns the best point evaluated, so the result never drops below the
/// seed.
fn refine(
    old: &Curve,
    new: &Curve,
    seed: (Fixed18, Fixed18),
    mut lower: Fixed18,
    mut upper: Fixed18,
) -> Result<(Fixed18, Fixed18), ProgramError> {
    let mut best = seed;
    let mut x = seed.0;

    for _ in 0..CRITICAL_REFINE_ITERATIONS {
        // Derivatives of a very narrow curve can leave the i128 range
        let (drop, slope, curvature) = match drop_profile(old, new, x) {
            Ok(profile) => profile,
            Err(_) => break,
        };
        if drop > best.1 {
            best = (x, drop);
        }
        if slope.is_zero() {
            break;
        }

        // The maximum lies uphill of x
        if slope.is_positive() {
            lower = x;
        } else {
            upper = x;
        }
        let width = upper.checked_sub(lower)?;
        if width.raw <= 1 {
            break;
        }
        let midpoint = Fixed18::from_raw(lower.raw + width.raw / 2);

        let newton = if curvature.is_negative() {
            slope.checked_div(curvature).and_then(|step| x.checked_sub(step)).ok()
        } else {
            None
        };
        x = match newton {
            Some(candidate) if candidate > lower && candidate < upper => candidate,
            _ => midpoint,
        };
    }

    Ok(best)
}

/// Sample `points` drops from `start` and refine every local peak into `best`
fn scan(
    old: &Curve,
    new: &Curve,
    start: Fixed18,
    step: Fixed18,
    points: usize,
    best: &mut (Fixed18, Fixed18),
) -> Result<(), ProgramError> {
    if !step.is_positive() {
        return Ok(());
    }

    let mut samples = Vec::with_capacity(points);
    let mut x = start;
    for _ in 0..points {
        samples.push((x, difference(x, old, new)?));
        x = x.checked_add(step)?;
    }

    for (i, &(x, drop)) in samples.iter().enumerate() {
        let left = i.checked_sub(1).map(|j| samples[j].1);
        let right = samples.get(i + 1).map(|sample| sample.1);
        let is_peak = left.map_or(true, |value| drop >= value) && right.map_or(true, |value| drop >= value);
        if !is_peak || !drop.is_positive() {
            continue;
        }

        let candidate = refine(old, new, (x, drop), x.checked_sub(step)?, x.checked_add(step)?)?;
        if candidate.1 > best.1 {
            *best = candidate;
        }
    }

    Ok(())
}

/// x maximising `old(x) - new(x)`
pub fn find_critical_point(old: &Curve, new: &Curve) -> Result<Fixed18, ProgramError> {
    // A flat old curve never drops; a flat new curve drops most at the old peak
    if old.is_degenerate() || new.is_degenerate() {
        return Ok(old.mu);
    }

    let mut best = (old.mu, difference(old.mu, old, new)?);

    let (lower, upper) = scan_window(old, new)?;
    let segments = (CRITICAL_GRID_POINTS - 1) as i128;
    let grid_step = Fixed18::from_raw(upper.checked_sub(lower)?.raw / segments);
    scan(old, new, lower, grid_step, CRITICAL_GRID_POINTS, &mut best)?;

    // The coarse grid cannot see features of a curve much narrower than the window
    for curve in [old, new] {
        let reach = curve.sigma.checked_mul(Fixed18::from_int(CRITICAL_WINDOW_SIGMAS as i64))?;
        let step = Fixed18::from_raw(curve.sigma.raw / CRITICAL_LOCAL_STEPS_PER_SIGMA);
        scan(old, new, curve.mu.checked_sub(reach)?, step, LOCAL_POINTS, &mut best)?;
    }

    Ok(best.0)
}

/// Largest density drop between the curves, never negative
pub fn max_density_drop(old: &Curve, new: &Curve) -> Result<Fixed18, ProgramError> {
    let x = find_critical_point(old, new)?;
    Ok(difference(x, old, new)?.max(Fixed18::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::density::lambda_for_norm;

    fn curve(mu: i64, sigma: i64, lambda: i64) -> Curve {
        Curve::new(Fixed18::from_int(mu), Fixed18::from_int(sigma), Fixed18::from_int(lambda))
    }

    #[test]
    fn test_widening_loses_most_at_the_mean() {
        let old = curve(0, 1, 1);
        let new = curve(0, 2, 1);
        let x = find_critical_point(&old, &new).unwrap();
        assert!(x.raw.abs() < 1_000_000_000_000);

        // 0.398942 - 0.199471
        let drop = max_density_drop(&old, &new).unwrap();
        assert!((drop.raw - 199_471_140_200_716_338).abs() < 1_000_000);
    }

    #[test]
    fn test_shift_loses_on_the_far_side() {
        let old = curve(0, 1, 1);
        let new = curve(2, 1, 1);
        let x = find_critical_point(&old, &new).unwrap();
        assert!(x.is_negative());

        let drop = max_density_drop(&old, &new).unwrap();
        let at_old_mean = difference(Fixed18::ZERO, &old, &new).unwrap();
        assert!(drop >= at_old_mean);
    }

    #[test]
    fn test_derived_drop_dominates_grid_points() {
        let old = curve(1, 1, 2);
        let new = curve(-1, 3, 2);
        let drop = max_density_drop(&old, &new).unwrap();

        let mut x = Fixed18::from_int(-10);
        while x < Fixed18::from_int(10) {
            let sample = difference(x, &old, &new).unwrap();
            assert!(sample.raw <= drop.raw + 1_000_000);
            x = x.checked_add(Fixed18::from_raw(Fixed18::ONE.raw / 8)).unwrap();
        }
    }

    #[test]
    fn test_identical_curves_have_no_drop() {
        let old = curve(3, 2, 1);
        assert_eq!(max_density_drop(&old, &old).unwrap(), Fixed18::ZERO);
    }

    #[test]
    fn test_narrow_new_curve_between_grid_points() {
        // The drop peaks about five narrow sigmas out, far between coarse grid points
        let k = Fixed18::from_raw(446_700_000_000_000_000);
        let narrow = Fixed18::from_raw(10_000_000_000_000_000);
        let old = Curve::new(Fixed18::ZERO, Fixed18::ONE, lambda_for_norm(k, Fixed18::ONE).unwrap());
        let new = Curve::new(Fixed18::ZERO, narrow, lambda_for_norm(k, narrow).unwrap());

        let x = find_critical_point(&old, &new).unwrap();
        assert!(x.raw.abs() > 30_000_000_000_000_000 && x.raw.abs() < 70_000_000_000_000_000);

        let drop = max_density_drop(&old, &new).unwrap();
        let step = Fixed18::from_raw(1_000_000_000_000_000);
        let mut sample_x = Fixed18::from_raw(-200_000_000_000_000_000);
        while sample_x <= Fixed18::from_raw(200_000_000_000_000_000) {
            let sample = difference(sample_x, &old, &new).unwrap();
            assert!(sample.raw <= drop.raw + 1_000_000, "{} beats {} at {}", sample, drop, sample_x);
            sample_x = sample_x.checked_add(step).unwrap();
        }
    }

    #[test]
    fn test_degenerate_curves() {
        let old = curve(0, 1, 1);
        let flat = old.with_lambda(Fixed18::ZERO);
        assert_eq!(max_density_drop(&flat, &old).unwrap(), Fixed18::ZERO);
        // Going flat loses the whole peak
        assert_eq!(max_density_drop(&old, &flat).unwrap(), old.max_density().unwrap());
    }
}
