//! 18-decimal fixed-point arithmetic.
//!
//! Every quantity the engine touches (share counts, token amounts,
//! probabilities, the liquidity parameter `b`) is a [`Wad`]: an unsigned
//! integer scaled by `10^18`. There is no floating point anywhere in the
//! pricing path, so two replicas fed the same inputs produce bit-identical
//! outputs.
//!
//! Products go through a 256-bit intermediate ([`mul_div`]) so that
//! `shares × payout` or `q / b` on large books cannot silently overflow.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OpenmarketError, Result};

/// Scale factor: `1.0 == 10^18`.
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Number of decimal places carried by a [`Wad`].
pub const WAD_DECIMALS: u32 = 18;

const LOW_MASK: u128 = u64::MAX as u128;

/// Full 128×128 → 256-bit product, returned as `(hi, lo)`.
#[must_use]
pub fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    let (a1, a0) = (a >> 64, a & LOW_MASK);
    let (b1, b0) = (b >> 64, b & LOW_MASK);

    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;

    // Each addend is < 2^64, so `mid` is < 3·2^64 and cannot overflow.
    let mid = (p00 >> 64) + (p01 & LOW_MASK) + (p10 & LOW_MASK);
    let lo = (p00 & LOW_MASK) | (mid << 64);
    let hi = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);
    (hi, lo)
}

/// `floor(a · b / d)` with a 256-bit intermediate product.
///
/// Returns `None` when `d == 0` or the quotient does not fit in `u128`.
#[must_use]
pub fn mul_div(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    let (hi, lo) = widening_mul(a, b);
    if hi == 0 {
        return Some(lo / d);
    }
    if hi >= d {
        return None;
    }

    // Restoring long division of the 256-bit numerator, one bit at a time.
    // Invariant: rem < d before each step.
    let mut rem = hi;
    let mut quotient: u128 = 0;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> bit) & 1);
        quotient <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quotient |= 1;
        }
    }
    Some(quotient)
}

/// `ceil(a · b / d)` with a 256-bit intermediate product.
#[must_use]
pub fn mul_div_ceil(a: u128, b: u128, d: u128) -> Option<u128> {
    let floor = mul_div(a, b, d)?;
    let (hi, lo) = widening_mul(a, b);
    // The division was exact iff floor·d reproduces the full product.
    let (fhi, flo) = widening_mul(floor, d);
    if fhi == hi && flo == lo {
        Some(floor)
    } else {
        floor.checked_add(1)
    }
}

// ---------------------------------------------------------------------------
// Wad
// ---------------------------------------------------------------------------

/// Unsigned 18-decimal fixed-point number.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Wad(pub u128);

impl Wad {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(WAD);
    pub const MAX: Self = Self(u128::MAX);

    /// Wrap a raw scaled integer.
    #[must_use]
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Whole units, e.g. `Wad::from_units(100)` is `100.0`.
    #[must_use]
    pub const fn from_units(units: u64) -> Self {
        Self(units as u128 * WAD)
    }

    /// `numerator / denominator` as a Wad, e.g. `from_ratio(1, 2) == 0.5`.
    #[must_use]
    pub const fn from_ratio(numerator: u64, denominator: u64) -> Self {
        Self(numerator as u128 * WAD / denominator as u128)
    }

    /// The underlying scaled integer.
    #[must_use]
    pub const fn raw(self) -> u128 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Integer part, truncated.
    #[must_use]
    pub const fn trunc_units(self) -> u128 {
        self.0 / WAD
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| OpenmarketError::overflow("add"))
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or_else(|| OpenmarketError::overflow("sub"))
    }

    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// `self × rhs`, rounded down.
    pub fn checked_mul(self, rhs: Self) -> Result<Self> {
        mul_div(self.0, rhs.0, WAD)
            .map(Self)
            .ok_or_else(|| OpenmarketError::overflow("mul"))
    }

    /// `self × rhs`, rounded up.
    pub fn checked_mul_ceil(self, rhs: Self) -> Result<Self> {
        mul_div_ceil(self.0, rhs.0, WAD)
            .map(Self)
            .ok_or_else(|| OpenmarketError::overflow("mul_ceil"))
    }

    /// `self / rhs`, rounded down. Division by zero is an overflow error.
    pub fn checked_div(self, rhs: Self) -> Result<Self> {
        mul_div(self.0, WAD, rhs.0)
            .map(Self)
            .ok_or_else(|| OpenmarketError::overflow("div"))
    }

    /// `self × count` for plain integer multipliers.
    pub fn checked_mul_int(self, count: u128) -> Result<Self> {
        self.0
            .checked_mul(count)
            .map(Self)
            .ok_or_else(|| OpenmarketError::overflow("mul_int"))
    }

    /// `self / count` for plain integer divisors, rounded down.
    pub fn checked_div_int(self, count: u128) -> Result<Self> {
        self.0
            .checked_div(count)
            .map(Self)
            .ok_or_else(|| OpenmarketError::overflow("div_int"))
    }

    /// Absolute difference.
    #[must_use]
    pub const fn abs_diff(self, other: Self) -> Self {
        Self(self.0.abs_diff(other.0))
    }

    /// Convert a non-negative [`Decimal`] into a Wad. Digits beyond the
    /// 18th decimal place are truncated.
    pub fn from_decimal(value: Decimal) -> Result<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(OpenmarketError::InvalidArgument {
                reason: format!("negative fixed-point value {value}"),
            });
        }
        let mantissa = value.mantissa().unsigned_abs();
        let scale = value.scale();
        let raw = if scale <= WAD_DECIMALS {
            10u128
                .checked_pow(WAD_DECIMALS - scale)
                .and_then(|factor| mantissa.checked_mul(factor))
        } else {
            10u128
                .checked_pow(scale - WAD_DECIMALS)
                .map(|divisor| mantissa / divisor)
        };
        raw.map(Self)
            .ok_or_else(|| OpenmarketError::overflow("from_decimal"))
    }

    /// Convert to a [`Decimal`] with 18 decimal places.
    pub fn to_decimal(self) -> Result<Decimal> {
        let raw = i128::try_from(self.0).map_err(|_| OpenmarketError::overflow("to_decimal"))?;
        Decimal::try_from_i128_with_scale(raw, WAD_DECIMALS)
            .map(|d| d.normalize())
            .map_err(|_| OpenmarketError::overflow("to_decimal"))
    }
}

impl fmt::Display for Wad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int = self.0 / WAD;
        let frac = self.0 % WAD;
        if frac == 0 {
            return write!(f, "{int}");
        }
        let digits = format!("{frac:018}");
        write!(f, "{int}.{}", digits.trim_end_matches('0'))
    }
}

impl From<u64> for Wad {
    fn from(units: u64) -> Self {
        Self::from_units(units)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
