use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::program_error::ProgramError;

use crate::math::{density, Fixed18};

/// Scaled Gaussian `lambda * N(mu, sigma^2)`
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Curve {
    /// Mean
    pub mu: Fixed18,

    /// Standard deviation
    pub sigma: Fixed18,

    /// Scale
    pub lambda: Fixed18,
}

impl Curve {
    pub const LEN: usize = 16 + // mu
        16 + // sigma
        16; // lambda

    pub fn new(mu: Fixed18, sigma: Fixed18, lambda: Fixed18) -> Self {
        Self { mu, sigma, lambda }
    }

    /// Same shape with a different scale
    pub fn with_lambda(&self, lambda: Fixed18) -> Self {
        Self { lambda, ..*self }
    }

    /// Zero width or zero scale, evaluates to zero everywhere
    pub fn is_degenerate(&self) -> bool {
        self.sigma.raw <= 0 || self.lambda.raw <= 0
    }

    pub fn density_at(&self, x: Fixed18) -> Result<Fixed18, ProgramError> {
        density::evaluate(x, self.mu, self.sigma, self.lambda)
    }

    /// Peak value, attained at the mean
    pub fn max_density(&self) -> Result<Fixed18, ProgramError> {
        self.density_at(self.mu)
    }

    pub fn l2_norm(&self) -> Result<Fixed18, ProgramError> {
        density::l2_norm(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use borsh::BorshSerialize;

    #[test]
    fn test_curve_layout() {
        let curve = Curve::new(Fixed18::ZERO, Fixed18::ONE, Fixed18::ONE);
        assert_eq!(curve.try_to_vec().unwrap().len(), Curve::LEN);
    }

    #[test]
    fn test_degenerate_curves() {
        let curve = Curve::new(Fixed18::ZERO, Fixed18::ONE, Fixed18::ONE);
        assert!(!curve.is_degenerate());
        assert!(curve.with_lambda(Fixed18::ZERO).is_degenerate());
        assert_eq!(curve.with_lambda(Fixed18::ZERO).max_density().unwrap(), Fixed18::ZERO);
        assert!(Curve::new(Fixed18::ZERO, Fixed18::ZERO, Fixed18::ONE).is_degenerate());
    }

    #[test]
    fn test_max_density_scales_with_lambda() {
        let unit = Curve::new(Fixed18::from_int(5), Fixed18::ONE, Fixed18::ONE);
        let doubled = unit.with_lambda(Fixed18::TWO);
        let peak = unit.max_density().unwrap();
        let doubled_peak = doubled.max_density().unwrap();
        assert!((doubled_peak.raw - 2 * peak.raw).abs() <= 2);
    }
}
