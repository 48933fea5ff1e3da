use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, FromPrimitive, PartialEq, Eq)]
pub enum DistributionMarketError {
    #[error("Invalid instruction")]
    InvalidInstruction = 0,

    #[error("Invalid account data")]
    InvalidAccountData = 1,

    #[error("Invalid PDA")]
    InvalidPDA = 2,

    #[error("Market already initialized")]
    AlreadyInitialized = 3,

    #[error("Market not initialized")]
    NotInitialized = 4,

    #[error("Unauthorized")]
    Unauthorized = 5,

    // Validation
    #[error("Sigma is zero or below the market minimum")]
    InvalidSigma = 6,

    #[error("Lambda must be positive")]
    InvalidLambda = 7,

    #[error("Amount must be positive")]
    InvalidAmount = 8,

    #[error("Liquidity must be an exact multiple of the backing")]
    NonMultipleLiquidity = 9,

    #[error("Invalid fee rate")]
    InvalidFeeRate = 10,

    // Invariants
    #[error("Claimed k does not match the curve L2 norm")]
    NormMismatch = 11,

    #[error("k does not match kToBRatio * b")]
    RatioMismatch = 12,

    #[error("Maximum density exceeds backing")]
    MaxDensityExceedsBacking = 13,

    #[error("Insufficient collateral for trade")]
    InsufficientCollateral = 14,

    #[error("Fee exceeds deposited amount")]
    FeeExceedsAmount = 15,

    #[error("Insufficient liquidity shares")]
    InsufficientShares = 16,

    #[error("Cannot remove all liquidity from the pool")]
    PoolDrainNotAllowed = 17,

    #[error("Requested amount exceeds payout")]
    PayoutExceeded = 18,

    #[error("Market invariant violated")]
    InvariantViolation = 19,

    // State machine
    #[error("Market is resolved")]
    MarketResolved = 20,

    #[error("Market is not resolved")]
    MarketNotResolved = 21,

    #[error("Position already settled")]
    PositionSettled = 22,

    #[error("Position is not a liquidity position")]
    NotLiquidityPosition = 23,

    // Ledger
    #[error("Position not found")]
    PositionNotFound = 24,

    #[error("Position ledger is full")]
    LedgerFull = 25,

    #[error("Too many liquidity providers")]
    TooManyProviders = 26,

    // Arithmetic
    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 27,

    #[error("Division by zero")]
    DivisionByZero = 28,
}

impl PrintProgramError for DistributionMarketError {
    fn print<E>(&self)
    where
        E: 'static + std::error::Error + DecodeError<E> + PrintProgramError + FromPrimitive,
    {
        msg!("DistributionMarketError: {}", self);
    }
}

impl From<DistributionMarketError> for ProgramError {
    fn from(e: DistributionMarketError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for DistributionMarketError {
    fn type_of() -> &'static str {
        "DistributionMarketError"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_error_codes_round_trip() {
        let err: ProgramError = DistributionMarketError::NormMismatch.into();
        assert_eq!(err, ProgramError::Custom(11));

        let decoded = DistributionMarketError::from_u32(22).unwrap();
        assert_eq!(decoded, DistributionMarketError::PositionSettled);
    }
}
