use solana_program::{entrypoint::ProgramResult, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    constants::{BPS_DENOMINATOR, DEFAULT_FEE_BPS, NORM_TOLERANCE_BPS},
    error::DistributionMarketError,
    math::{density, max_density_drop, Fixed18},
    state::{Curve, MarketParams, MarketPhase, MarketState, Position, PositionLedger},
};

/// Market invariant engine
///
/// Every mutating operation works on a copy of the market, checks the
/// invariants on it and only then records the position and writes the copy
/// back, so a rejected call leaves the market untouched.
pub struct InvariantEngine;

impl InvariantEngine {
    /// One-time market setup
    ///
    /// The authority receives every opening share and a liquidity position
    /// over the whole opening curve. Returns that position's id.
    pub fn initialize<L: PositionLedger>(
        market: &mut MarketState,
        ledger: &mut L,
        authority: &Pubkey,
        market_id: u64,
        params: &MarketParams,
        bump: u8,
    ) -> Result<u64, ProgramError> {
        if market.is_initialized {
            return Err(DistributionMarketError::AlreadyInitialized.into());
        }

        if !params.min_sigma.is_positive() || params.sigma < params.min_sigma {
            return Err(DistributionMarketError::InvalidSigma.into());
        }
        if !params.lambda.is_positive() {
            return Err(DistributionMarketError::InvalidLambda.into());
        }
        if !params.k.is_positive() || !params.b.is_positive() || !params.k_to_b_ratio.is_positive() {
            return Err(DistributionMarketError::InvalidAmount.into());
        }

        let fee_bps = params.fee_bps.unwrap_or(DEFAULT_FEE_BPS);
        if fee_bps > BPS_DENOMINATOR {
            return Err(DistributionMarketError::InvalidFeeRate.into());
        }

        let curve = Curve::new(params.mu, params.sigma, params.lambda);

        // Claimed k must be the curve's norm and the configured share of b
        let norm = curve.l2_norm()?;
        if !norm.approx_eq_bps(params.k, NORM_TOLERANCE_BPS) {
            msg!("Norm mismatch: claimed k {} computed {}", params.k, norm);
            return Err(DistributionMarketError::NormMismatch.into());
        }
        let k = params.k_to_b_ratio.checked_mul(params.b)?;
        if !params.k.approx_eq_bps(k, NORM_TOLERANCE_BPS) {
            return Err(DistributionMarketError::RatioMismatch.into());
        }
        if curve.max_density()? > params.b {
            return Err(DistributionMarketError::MaxDensityExceedsBacking.into());
        }

        let mut next = MarketState {
            discriminator: MarketState::DISCRIMINATOR,
            is_initialized: true,
            authority: *authority,
            market_id,
            k,
            b: params.b,
            k_to_b_ratio: params.k_to_b_ratio,
            curve,
            min_sigma: params.min_sigma,
            fee_bps,
            phase: MarketPhase::Trading,
            bump,
            ..MarketState::default()
        };
        next.credit_shares(authority, params.b)?;
        next.check_invariants()?;

        let position_id = ledger.mint(Position {
            id: 0,
            owner: *authority,
            collateral: params.b,
            initial: curve,
            target: curve.with_lambda(Fixed18::ZERO),
            settled: false,
        })?;

        *market = next;

        msg!("Market {} initialized: b {} k {}", market_id, market.b, market.k);
        Ok(position_id)
    }

    /// Deposit an exact multiple of the current backing
    ///
    /// Returns the minted shares and the id of the provider's position.
    pub fn add_liquidity<L: PositionLedger>(
        market: &mut MarketState,
        ledger: &mut L,
        provider: &Pubkey,
        amount: Fixed18,
    ) -> Result<(Fixed18, u64), ProgramError> {
        Self::require_phase(market, MarketPhase::Trading)?;

        if !amount.is_positive() {
            return Err(DistributionMarketError::InvalidAmount.into());
        }
        if !market.b.is_positive() {
            return Err(DistributionMarketError::InvariantViolation.into());
        }
        if amount.raw % market.b.raw != 0 {
            return Err(DistributionMarketError::NonMultipleLiquidity.into());
        }

        // Initialization always seeds shares, so the pool is never empty here
        let fraction = amount.checked_div(market.b)?;
        let shares = fraction.checked_mul(market.total_shares)?;
        let lambda_share = fraction.checked_mul(market.curve.lambda)?;

        let mut next = market.clone();
        next.b = next.b.checked_add(amount)?;
        next.sync_k()?;
        next.curve.lambda = next.curve.lambda.checked_add(lambda_share)?;
        next.credit_shares(provider, shares)?;
        next.check_invariants()?;

        let initial = market.curve.with_lambda(lambda_share);
        let position_id = ledger.mint(Position {
            id: 0,
            owner: *provider,
            collateral: amount,
            initial,
            target: initial.with_lambda(Fixed18::ZERO),
            settled: false,
        })?;

        *market = next;

        msg!(
            "Liquidity added: {} shares, position {}, b {} k {}",
            shares,
            position_id,
            market.b,
            market.k
        );
        Ok((shares, position_id))
    }

    /// Burn shares for their slice of the backing
    ///
    /// The last shares can never leave, so the pool is never drained.
    pub fn remove_liquidity<L: PositionLedger>(
        market: &mut MarketState,
        ledger: &mut L,
        provider: &Pubkey,
        shares: Fixed18,
        position_id: u64,
    ) -> Result<Fixed18, ProgramError> {
        Self::require_initialized(market)?;

        if !shares.is_positive() || shares > market.shares_of(provider) {
            return Err(DistributionMarketError::InsufficientShares.into());
        }
        if shares >= market.total_shares {
            return Err(DistributionMarketError::PoolDrainNotAllowed.into());
        }

        let position = ledger.get(position_id)?;
        if position.owner != *provider {
            return Err(DistributionMarketError::Unauthorized.into());
        }
        if !position.is_lp() {
            return Err(DistributionMarketError::NotLiquidityPosition.into());
        }
        if position.settled {
            return Err(DistributionMarketError::PositionSettled.into());
        }

        let amount = shares.mul_div(market.b, market.total_shares)?;
        let remaining = market.total_shares.checked_sub(shares)?;

        let mut next = market.clone();
        next.curve.lambda = next.curve.lambda.mul_div(remaining, market.total_shares)?;
        next.b = next.b.checked_sub(amount)?;
        next.sync_k()?;
        next.debit_shares(provider, shares)?;
        next.check_invariants()?;

        // Shares, not the position's collateral, are the provider's claim on
        // the pool; the positions close only when the last share leaves
        ledger.debit_collateral(position_id, amount)?;
        if next.shares_of(provider).is_zero() {
            ledger.close_liquidity(provider)?;
        }

        *market = next;

        msg!("Liquidity removed: {} shares for {}, b {}", shares, amount, market.b);
        Ok(amount)
    }

    /// Density drop at a single point, `max(0, old(x) - new(x))`
    pub fn required_collateral_at(
        old_curve: &Curve,
        new_curve: &Curve,
        critical_point: Fixed18,
    ) -> Result<Fixed18, ProgramError> {
        let drop = density::difference(critical_point, old_curve, new_curve)?;
        Ok(drop.max(Fixed18::ZERO))
    }

    /// Collateral a curve change must post
    ///
    /// The caller's point can only raise the requirement above the drop at
    /// the derived extremum.
    pub fn required_collateral(
        old_curve: &Curve,
        new_curve: &Curve,
        critical_point: Fixed18,
    ) -> Result<Fixed18, ProgramError> {
        let at_caller = Self::required_collateral_at(old_curve, new_curve, critical_point)?;
        let derived = max_density_drop(old_curve, new_curve)?;
        Ok(at_caller.max(derived))
    }

    /// Fee for moving the market curve, `fee_bps` of the distance moved
    pub fn calculate_fee(
        old_curve: &Curve,
        new_curve: &Curve,
        fee_bps: u16,
    ) -> Result<Fixed18, ProgramError> {
        density::wasserstein_distance(old_curve, new_curve)?.mul_bps(fee_bps)
    }

    /// Move the market curve, returning the id of the trader's position
    pub fn trade<L: PositionLedger>(
        market: &mut MarketState,
        ledger: &mut L,
        trader: &Pubkey,
        amount: Fixed18,
        new_curve: Curve,
        critical_point: Fixed18,
    ) -> Result<u64, ProgramError> {
        Self::require_phase(market, MarketPhase::Trading)?;

        if !amount.is_positive() {
            return Err(DistributionMarketError::InvalidAmount.into());
        }
        if new_curve.sigma < market.min_sigma {
            return Err(DistributionMarketError::InvalidSigma.into());
        }
        if !new_curve.lambda.is_positive() {
            return Err(DistributionMarketError::InvalidLambda.into());
        }

        let norm = new_curve.l2_norm()?;
        if !norm.approx_eq_bps(market.k, NORM_TOLERANCE_BPS) {
            msg!("Norm mismatch: k {} proposed {}", market.k, norm);
            return Err(DistributionMarketError::NormMismatch.into());
        }

        let old_curve = market.curve;
        let required = Self::required_collateral(&old_curve, &new_curve, critical_point)?;
        if amount < required {
            msg!("Insufficient collateral: required {} got {}", required, amount);
            return Err(DistributionMarketError::InsufficientCollateral.into());
        }

        let fee = Self::calculate_fee(&old_curve, &new_curve, market.fee_bps)?;
        if fee >= amount {
            return Err(DistributionMarketError::FeeExceedsAmount.into());
        }
        let net = amount.checked_sub(fee)?;

        let mut next = market.clone();
        next.b = next.b.checked_add(net)?;
        next.sync_k()?;
        if new_curve.max_density()? > next.b {
            return Err(DistributionMarketError::MaxDensityExceedsBacking.into());
        }
        next.curve = new_curve;
        next.total_fees = next.total_fees.checked_add(fee)?;
        next.total_volume = next.total_volume.checked_add(amount)?;
        next.check_invariants()?;

        let position_id = ledger.mint(Position {
            id: 0,
            owner: *trader,
            collateral: net,
            initial: old_curve,
            target: new_curve,
            settled: false,
        })?;

        *market = next;

        msg!(
            "Trade: position {}, required {} fee {} net {}, b {} k {}",
            position_id,
            required,
            fee,
            net,
            market.b,
            market.k
        );
        Ok(position_id)
    }

    /// Fix the outcome, once, by the market authority
    pub fn resolve(market: &mut MarketState, authority: &Pubkey, outcome: Fixed18) -> ProgramResult {
        Self::require_initialized(market)?;

        if market.authority != *authority {
            return Err(DistributionMarketError::Unauthorized.into());
        }
        if market.is_resolved() {
            return Err(DistributionMarketError::MarketResolved.into());
        }

        market.phase = MarketPhase::Resolved;
        market.outcome = outcome;

        msg!("Market {} resolved at {}", market.market_id, outcome);
        Ok(())
    }

    /// Pay a position out against the resolved outcome
    ///
    /// Returns the payout released from the pool, capped at the backing.
    pub fn withdraw<L: PositionLedger>(
        market: &mut MarketState,
        ledger: &mut L,
        owner: &Pubkey,
        position_id: u64,
        amount: Fixed18,
    ) -> Result<Fixed18, ProgramError> {
        Self::require_phase(market, MarketPhase::Resolved)?;

        if !amount.is_positive() {
            return Err(DistributionMarketError::InvalidAmount.into());
        }

        let position = ledger.get(position_id)?;
        if position.owner != *owner {
            return Err(DistributionMarketError::Unauthorized.into());
        }
        if position.settled {
            return Err(DistributionMarketError::PositionSettled.into());
        }

        let payout = Self::payout_for(position, market.outcome)?;
        let capped = payout.min(market.b);
        if amount > capped {
            msg!("Payout exceeded: requested {} available {}", amount, capped);
            return Err(DistributionMarketError::PayoutExceeded.into());
        }

        let mut next = market.clone();
        next.b = next.b.checked_sub(capped)?;
        next.sync_k()?;
        next.check_invariants()?;

        ledger.debit_collateral(position_id, amount)?;
        ledger.mark_settled(position_id)?;

        *market = next;

        msg!("Withdrawal: position {} paid {}, b {}", position_id, capped, market.b);
        Ok(capped)
    }

    /// Payout preview for a recorded position
    pub fn calculate_payout<L: PositionLedger>(
        ledger: &L,
        position_id: u64,
        outcome: Fixed18,
    ) -> Result<Fixed18, ProgramError> {
        Self::payout_for(ledger.get(position_id)?, outcome)
    }

    /// Realized change from the position's initial curve to its target
    ///
    /// Liquidity positions have a flat target, so this is minus their slice
    /// of the curve at the outcome.
    pub fn payout_for(position: &Position, outcome: Fixed18) -> Result<Fixed18, ProgramError> {
        density::difference(outcome, &position.target, &position.initial)
    }

    fn require_initialized(market: &MarketState) -> ProgramResult {
        if !market.is_initialized {
            return Err(DistributionMarketError::NotInitialized.into());
        }
        Ok(())
    }

    fn require_phase(market: &MarketState, phase: MarketPhase) -> ProgramResult {
        Self::require_initialized(market)?;
        if market.phase == phase {
            return Ok(());
        }
        match market.phase {
            MarketPhase::Resolved => Err(DistributionMarketError::MarketResolved.into()),
            MarketPhase::Trading => Err(DistributionMarketError::MarketNotResolved.into()),
        }
    }
}
