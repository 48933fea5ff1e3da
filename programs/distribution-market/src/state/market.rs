use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::{
    constants::MAX_LIQUIDITY_PROVIDERS,
    error::DistributionMarketError,
    math::Fixed18,
    state::Curve,
};

/// Lifecycle of a market, `Trading` until resolved exactly once
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketPhase {
    Trading,
    Resolved,
}

impl Default for MarketPhase {
    fn default() -> Self {
        MarketPhase::Trading
    }
}

/// Liquidity shares held by one provider
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LpShare {
    pub provider: Pubkey,
    pub shares: Fixed18,
}

impl LpShare {
    pub const LEN: usize = 32 + 16;
}

/// Parameters accepted when a market is created
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketParams {
    /// Claimed L2 norm of the opening curve
    pub k: Fixed18,

    /// Opening collateral
    pub b: Fixed18,

    pub k_to_b_ratio: Fixed18,

    pub mu: Fixed18,
    pub sigma: Fixed18,
    pub lambda: Fixed18,

    /// Narrowest curve the market accepts
    pub min_sigma: Fixed18,

    /// Trading fee, `DEFAULT_FEE_BPS` when absent
    pub fee_bps: Option<u16>,
}

/// Distribution market account
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Default)]
pub struct MarketState {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized
    pub is_initialized: bool,

    /// Administrator, the only key allowed to resolve
    pub authority: Pubkey,

    pub market_id: u64,

    /// Norm that proposed curves must match, always `k_to_b_ratio * b`
    pub k: Fixed18,

    /// Collateral backing the pool
    pub b: Fixed18,

    /// Fixed at initialization
    pub k_to_b_ratio: Fixed18,

    /// Live market curve
    pub curve: Curve,

    pub min_sigma: Fixed18,

    pub fee_bps: u16,

    /// Sum of every provider's shares
    pub total_shares: Fixed18,

    pub lp_shares: Vec<LpShare>,

    pub phase: MarketPhase,

    /// Meaningful only once resolved
    pub outcome: Fixed18,

    /// Stats
    pub total_fees: Fixed18,
    pub total_volume: Fixed18,

    /// PDA bump
    pub bump: u8,
}

impl MarketState {
    pub const DISCRIMINATOR: [u8; 8] = [68, 73, 83, 84, 95, 77, 75, 84]; // "DIST_MKT"

    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        32 + // authority
        8 + // market_id
        16 + // k
        16 + // b
        16 + // k_to_b_ratio
        Curve::LEN + // curve
        16 + // min_sigma
        2 + // fee_bps
        16 + // total_shares
        4 + (MAX_LIQUIDITY_PROVIDERS * LpShare::LEN) + // lp_shares
        1 + // phase
        16 + // outcome
        16 + // total_fees
        16 + // total_volume
        1; // bump

    pub fn is_resolved(&self) -> bool {
        self.phase == MarketPhase::Resolved
    }

    /// Recompute `k` from the current backing
    pub fn sync_k(&mut self) -> Result<(), ProgramError> {
        self.k = self.k_to_b_ratio.checked_mul(self.b)?;
        Ok(())
    }

    pub fn shares_of(&self, provider: &Pubkey) -> Fixed18 {
        self.lp_shares
            .iter()
            .find(|entry| entry.provider == *provider)
            .map(|entry| entry.shares)
            .unwrap_or(Fixed18::ZERO)
    }

    /// Mint shares to a provider
    pub fn credit_shares(&mut self, provider: &Pubkey, shares: Fixed18) -> Result<(), ProgramError> {
        match self.lp_shares.iter_mut().find(|entry| entry.provider == *provider) {
            Some(entry) => entry.shares = entry.shares.checked_add(shares)?,
            None => {
                if self.lp_shares.len() >= MAX_LIQUIDITY_PROVIDERS {
                    return Err(DistributionMarketError::TooManyProviders.into());
                }
                self.lp_shares.push(LpShare { provider: *provider, shares });
            }
        }

        self.total_shares = self.total_shares.checked_add(shares)?;
        Ok(())
    }

    /// Burn shares from a provider, dropping the entry once empty
    pub fn debit_shares(&mut self, provider: &Pubkey, shares: Fixed18) -> Result<(), ProgramError> {
        let index = self
            .lp_shares
            .iter()
            .position(|entry| entry.provider == *provider)
            .ok_or(DistributionMarketError::InsufficientShares)?;

        let remaining = self.lp_shares[index].shares.checked_sub(shares)?;
        if remaining.is_negative() {
            return Err(DistributionMarketError::InsufficientShares.into());
        }

        if remaining.is_zero() {
            self.lp_shares.remove(index);
        } else {
            self.lp_shares[index].shares = remaining;
        }

        self.total_shares = self.total_shares.checked_sub(shares)?;
        Ok(())
    }

    /// Conditions every committed state satisfies
    pub fn check_invariants(&self) -> Result<(), ProgramError> {
        let expected_k = self.k_to_b_ratio.checked_mul(self.b)?;
        if self.k.checked_sub(expected_k)?.abs()? > Fixed18::from_raw(1) {
            return Err(DistributionMarketError::RatioMismatch.into());
        }

        if self.b.is_negative() {
            return Err(DistributionMarketError::InvariantViolation.into());
        }

        let mut share_sum = Fixed18::ZERO;
        for entry in &self.lp_shares {
            share_sum = share_sum.checked_add(entry.shares)?;
        }
        if share_sum != self.total_shares {
            return Err(DistributionMarketError::InvariantViolation.into());
        }

        if self.curve.sigma < self.min_sigma {
            return Err(DistributionMarketError::InvalidSigma.into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use borsh::BorshSerialize;

    fn market_with_providers(count: usize) -> MarketState {
        let mut market = MarketState {
            discriminator: MarketState::DISCRIMINATOR,
            is_initialized: true,
            k_to_b_ratio: Fixed18::HALF,
            b: Fixed18::from_int(10),
            k: Fixed18::from_int(5),
            curve: Curve::new(Fixed18::ZERO, Fixed18::ONE, Fixed18::ONE),
            min_sigma: Fixed18::HALF,
            ..MarketState::default()
        };
        for _ in 0..count {
            market
                .credit_shares(&Pubkey::new_unique(), Fixed18::ONE)
                .unwrap();
        }
        market
    }

    #[test]
    fn test_max_size_fits_len() {
        let market = market_with_providers(MAX_LIQUIDITY_PROVIDERS);
        assert_eq!(market.try_to_vec().unwrap().len(), MarketState::LEN);
    }

    #[test]
    fn test_share_accounting() {
        let mut market = market_with_providers(0);
        let provider = Pubkey::new_unique();

        market.credit_shares(&provider, Fixed18::from_int(3)).unwrap();
        market.credit_shares(&provider, Fixed18::ONE).unwrap();
        assert_eq!(market.shares_of(&provider), Fixed18::from_int(4));
        assert_eq!(market.total_shares, Fixed18::from_int(4));

        assert_eq!(
            market.debit_shares(&provider, Fixed18::from_int(5)).unwrap_err(),
            ProgramError::from(DistributionMarketError::InsufficientShares)
        );

        market.debit_shares(&provider, Fixed18::from_int(4)).unwrap();
        assert!(market.lp_shares.is_empty());
        assert_eq!(market.total_shares, Fixed18::ZERO);
        market.check_invariants().unwrap();
    }

    #[test]
    fn test_provider_capacity() {
        let mut market = market_with_providers(MAX_LIQUIDITY_PROVIDERS);
        assert_eq!(
            market.credit_shares(&Pubkey::new_unique(), Fixed18::ONE).unwrap_err(),
            ProgramError::from(DistributionMarketError::TooManyProviders)
        );
    }

    #[test]
    fn test_invariants_detect_drift() {
        let mut market = market_with_providers(2);
        market.check_invariants().unwrap();

        market.b = Fixed18::from_int(12);
        assert_eq!(
            market.check_invariants().unwrap_err(),
            ProgramError::from(DistributionMarketError::RatioMismatch)
        );
        market.sync_k().unwrap();
        market.check_invariants().unwrap();

        market.total_shares = Fixed18::from_int(3);
        assert_eq!(
            market.check_invariants().unwrap_err(),
            ProgramError::from(DistributionMarketError::InvariantViolation)
        );
    }
}
