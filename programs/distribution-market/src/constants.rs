//! Market constants and configuration

/// Basis point denominator (100%)
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Default trading fee applied to the distance a trade moves the curve (basis points)
pub const DEFAULT_FEE_BPS: u16 = 30; // 0.3%

/// Relative tolerance for closed-form norm and ratio checks (basis points)
pub const NORM_TOLERANCE_BPS: u16 = 10; // 0.1%

/// Exponent ceiling: densities with (x-mu)^2/(2 sigma^2) above this are zero
pub const EXP_CEILING: i128 = 133;

/// Grid resolution for the collateral critical-point scan
pub const CRITICAL_GRID_POINTS: usize = 64;

/// Samples per sigma when scanning around each curve's own mean
pub const CRITICAL_LOCAL_STEPS_PER_SIGMA: i128 = 2;

/// Safeguarded Newton-Raphson steps spent on each sampled peak
pub const CRITICAL_REFINE_ITERATIONS: u8 = 32;

/// Half-width of every scan, in multiples of the sigma it is sized from
pub const CRITICAL_WINDOW_SIGMAS: i128 = 8;

/// Positions held in one position book account
pub const MAX_POSITIONS: usize = 48;

/// Liquidity providers tracked per market
pub const MAX_LIQUIDITY_PROVIDERS: usize = 32;
