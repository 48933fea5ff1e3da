//! Fixed-point math implementation
//!
//! Signed 18-decimal fixed point. Every market quantity (collateral, curve
//! parameters, densities, shares) is carried as `Fixed18`, so callers and the
//! program agree on one scale with no implicit unit conversion.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::program_error::ProgramError;
use std::fmt;

use crate::error::DistributionMarketError;
use crate::math::u256::{mul_div, U256};

/// 10^18
pub const SCALE: i128 = 1_000_000_000_000_000_000;

/// exp(x) is below one ulp for x under this bound
const EXP_MIN_INPUT: i128 = -42 * SCALE;

/// exp(x) no longer fits in i128 above this bound
const EXP_MAX_INPUT: i128 = 46 * SCALE;

const EXP_SERIES_TERMS: i128 = 30;

/// Signed fixed-point number with 18 decimal places
#[derive(
    BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub struct Fixed18 {
    pub raw: i128,
}

fn overflow() -> ProgramError {
    DistributionMarketError::ArithmeticOverflow.into()
}

/// (a * b) / divisor on signed operands, rounding toward zero
fn mul_div_signed(a: i128, b: i128, divisor: i128) -> Result<i128, ProgramError> {
    if divisor == 0 {
        return Err(DistributionMarketError::DivisionByZero.into());
    }

    let negative = (a < 0) ^ (b < 0) ^ (divisor < 0);
    let magnitude = mul_div(a.unsigned_abs(), b.unsigned_abs(), divisor.unsigned_abs())
        .ok_or_else(overflow)?;

    if !negative {
        return i128::try_from(magnitude).map_err(|_| overflow());
    }

    if magnitude <= i128::MAX as u128 {
        Ok(-(magnitude as i128))
    } else if magnitude == i128::MIN.unsigned_abs() {
        Ok(i128::MIN)
    } else {
        Err(overflow())
    }
}

impl Fixed18 {
    pub const ZERO: Self = Self { raw: 0 };
    pub const ONE: Self = Self { raw: SCALE };
    pub const TWO: Self = Self { raw: 2 * SCALE };
    pub const HALF: Self = Self { raw: SCALE / 2 };

    pub const SQRT_2PI: Self = Self { raw: 2_506_628_274_631_000_502 };
    pub const LN_2: Self = Self { raw: 693_147_180_559_945_309 };

    /// Create from raw scaled value
    pub const fn from_raw(raw: i128) -> Self {
        Self { raw }
    }

    /// Create from integer
    pub const fn from_int(value: i64) -> Self {
        Self { raw: value as i128 * SCALE }
    }

    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    pub fn is_positive(&self) -> bool {
        self.raw > 0
    }

    pub fn is_negative(&self) -> bool {
        self.raw < 0
    }

    pub fn checked_add(&self, other: Self) -> Result<Self, ProgramError> {
        self.raw
            .checked_add(other.raw)
            .map(Self::from_raw)
            .ok_or_else(overflow)
    }

    pub fn checked_sub(&self, other: Self) -> Result<Self, ProgramError> {
        self.raw
            .checked_sub(other.raw)
            .map(Self::from_raw)
            .ok_or_else(overflow)
    }

    pub fn checked_mul(&self, other: Self) -> Result<Self, ProgramError> {
        mul_div_signed(self.raw, other.raw, SCALE).map(Self::from_raw)
    }

    pub fn checked_div(&self, other: Self) -> Result<Self, ProgramError> {
        mul_div_signed(self.raw, SCALE, other.raw).map(Self::from_raw)
    }

    /// self * mul / div with a single rounding step
    pub fn mul_div(&self, mul: Self, div: Self) -> Result<Self, ProgramError> {
        mul_div_signed(self.raw, mul.raw, div.raw).map(Self::from_raw)
    }

    /// Apply a basis-point rate
    pub fn mul_bps(&self, bps: u16) -> Result<Self, ProgramError> {
        mul_div_signed(self.raw, bps as i128, 10_000).map(Self::from_raw)
    }

    pub fn checked_neg(&self) -> Result<Self, ProgramError> {
        self.raw.checked_neg().map(Self::from_raw).ok_or_else(overflow)
    }

    pub fn abs(&self) -> Result<Self, ProgramError> {
        self.raw.checked_abs().map(Self::from_raw).ok_or_else(overflow)
    }

    /// Relative closeness: |self - other| <= |other| * bps / 10_000
    pub fn approx_eq_bps(&self, other: Self, bps: u16) -> bool {
        let diff = match self.checked_sub(other) {
            Ok(diff) => diff.raw.unsigned_abs(),
            Err(_) => return false,
        };
        let tolerance = mul_div(other.raw.unsigned_abs(), bps as u128, 10_000).unwrap_or(0);
        diff <= tolerance
    }

    /// Square root, floor(sqrt(raw * 10^18)): exact on perfect squares and monotonic
    pub fn sqrt(&self) -> Result<Self, ProgramError> {
        if self.raw < 0 {
            return Err(overflow());
        }
        if self.raw == 0 {
            return Ok(Self::ZERO);
        }

        let root = U256::full_mul(self.raw as u128, SCALE as u128).isqrt();
        i128::try_from(root).map(Self::from_raw).map_err(|_| overflow())
    }

    /// e^x via range reduction x = k*ln2 + r and a Taylor series on r
    pub fn exp(&self) -> Result<Self, ProgramError> {
        if self.raw < EXP_MIN_INPUT {
            return Ok(Self::ZERO);
        }
        if self.raw > EXP_MAX_INPUT {
            return Err(overflow());
        }

        let ln2 = Self::LN_2.raw;
        let k = if self.raw >= 0 {
            (self.raw + ln2 / 2) / ln2
        } else {
            (self.raw - ln2 / 2) / ln2
        };
        // |r| <= ln2 / 2
        let r = self.raw - k * ln2;

        let mut sum = SCALE;
        let mut term = SCALE;
        for i in 1..=EXP_SERIES_TERMS {
            term = term * r / SCALE / i;
            if term == 0 {
                break;
            }
            sum += term;
        }

        let raw = if k >= 0 {
            sum.checked_mul(1i128 << k).ok_or_else(overflow)?
        } else {
            sum >> (-k)
        };

        Ok(Self::from_raw(raw))
    }

    /// Natural logarithm via binary normalisation and the atanh series
    pub fn ln(&self) -> Result<Self, ProgramError> {
        if self.raw <= 0 {
            return Err(overflow());
        }

        // m = x / 2^e in [1, 2)
        let mut m = self.raw;
        let mut e: i128 = 0;
        while m >= 2 * SCALE {
            m >>= 1;
            e += 1;
        }
        while m < SCALE {
            m <<= 1;
            e -= 1;
        }

        // ln(m) = 2 * atanh(z), z = (m - 1) / (m + 1) <= 1/3
        let z = (m - SCALE) * SCALE / (m + SCALE);
        let z2 = z * z / SCALE;

        let mut sum = z;
        let mut power = z;
        let mut n: i128 = 1;
        loop {
            power = power * z2 / SCALE;
            if power == 0 {
                break;
            }
            n += 2;
            sum += power / n;
        }

        Ok(Self::from_raw(2 * sum + e * Self::LN_2.raw))
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Fixed18 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.raw < 0 { "-" } else { "" };
        let magnitude = self.raw.unsigned_abs();
        let scale = SCALE as u128;
        write!(f, "{}{}.{:018}", sign, magnitude / scale, magnitude % scale)
    }
}
