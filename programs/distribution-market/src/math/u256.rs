//! 256-bit unsigned intermediates for 18-decimal fixed-point math
//!
//! Products of two i128 magnitudes do not fit in 128 bits, so mul/div and
//! square roots widen through this type before narrowing back.

use std::cmp::Ordering;

const LOW_MASK: u128 = u64::MAX as u128;

/// 256-bit unsigned integer represented as two u128 values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U256 {
    /// Low 128 bits
    pub lo: u128,
    /// High 128 bits
    pub hi: u128,
}

impl U256 {
    pub const ZERO: Self = Self { lo: 0, hi: 0 };

    pub const fn from_u128(val: u128) -> Self {
        Self { lo: val, hi: 0 }
    }

    pub fn is_zero(&self) -> bool {
        self.lo == 0 && self.hi == 0
    }

    /// Full 128x128 -> 256 bit product
    pub fn full_mul(a: u128, b: u128) -> Self {
        let a0 = a & LOW_MASK;
        let a1 = a >> 64;
        let b0 = b & LOW_MASK;
        let b1 = b >> 64;

        let p00 = a0 * b0;
        let p01 = a0 * b1;
        let p10 = a1 * b0;
        let p11 = a1 * b1;

        let (mid, carry_a) = p01.overflowing_add(p10);
        let (mid, carry_b) = mid.overflowing_add(p00 >> 64);
        let carries = (carry_a as u128) + (carry_b as u128);

        Self {
            lo: (p00 & LOW_MASK) | (mid << 64),
            hi: p11 + (mid >> 64) + (carries << 64),
        }
    }

    /// Number of significant bits
    pub fn bits(&self) -> u32 {
        if self.hi != 0 {
            256 - self.hi.leading_zeros()
        } else {
            128 - self.lo.leading_zeros()
        }
    }

    fn bit(&self, index: u32) -> bool {
        if index >= 128 {
            (self.hi >> (index - 128)) & 1 == 1
        } else {
            (self.lo >> index) & 1 == 1
        }
    }

    fn set_bit(&mut self, index: u32) {
        if index >= 128 {
            self.hi |= 1 << (index - 128);
        } else {
            self.lo |= 1 << index;
        }
    }

    /// Narrow to u128, None if the high half is set
    pub fn to_u128(&self) -> Option<u128> {
        if self.hi == 0 {
            Some(self.lo)
        } else {
            None
        }
    }

    /// Long division by a u128 divisor, truncating
    pub fn checked_div_u128(&self, divisor: u128) -> Option<Self> {
        if divisor == 0 {
            return None;
        }
        if self.hi == 0 {
            return Some(Self::from_u128(self.lo / divisor));
        }

        let mut quotient = Self::ZERO;
        let mut remainder = 0u128;

        for index in (0..self.bits()).rev() {
            // remainder < divisor, so the shifted value is below 2 * divisor
            let carry = remainder >> 127 == 1;
            remainder = (remainder << 1) | self.bit(index) as u128;

            if carry || remainder >= divisor {
                remainder = remainder.wrapping_sub(divisor);
                quotient.set_bit(index);
            }
        }

        Some(quotient)
    }

    /// floor(sqrt(self))
    pub fn isqrt(&self) -> u128 {
        if self.is_zero() {
            return 0;
        }

        // Start at or above the root so Newton descends monotonically
        let shift = (self.bits() + 1) / 2;
        let mut x = if shift >= 128 { u128::MAX } else { 1u128 << shift };

        loop {
            // x >= sqrt(self) keeps the quotient within 128 bits
            let q = match self.checked_div_u128(x).and_then(|q| q.to_u128()) {
                Some(q) => q,
                None => return x,
            };
            let y = x / 2 + q / 2 + ((x & 1) + (q & 1)) / 2;
            if y >= x {
                return x;
            }
            x = y;
        }
    }
}

/// (a * b) / divisor with a 256-bit intermediate, truncating
pub fn mul_div(a: u128, b: u128, divisor: u128) -> Option<u128> {
    U256::full_mul(a, b)
        .checked_div_u128(divisor)
        .and_then(|q| q.to_u128())
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.hi.cmp(&other.hi) {
            Ordering::Equal => self.lo.cmp(&other.lo),
            other => other,
        }
    }
}
