//! Integer-only `e^-x` and `ln(y)` over [`Wad`] values.
//!
//! Both functions range-reduce by powers of two first, so the series they
//! evaluate always converge fast and the result is accurate to a handful of
//! wei across the whole domain. Series terms are accumulated as signed
//! `i128` so alternating terms never underflow.

use openmarket_types::{OpenmarketError, Result, WAD, Wad, constants};

/// Upper bound on Taylor terms for `e^-r`, `r ∈ [0, ln 2)`.
const EXP_MAX_TERMS: u128 = 24;

/// Upper bound on atanh-series terms for `ln`.
const LN_MAX_TERMS: i128 = 32;

/// `e^-x`.
///
/// `x == 0` gives exactly [`Wad::ONE`]. For `x ≥ 80` the result is below
/// `2e-35` and saturates to zero. Never fails.
#[must_use]
pub fn exp_neg(x: Wad) -> Wad {
    let x = x.raw();
    if x == 0 {
        return Wad::ONE;
    }
    if x >= constants::EXP_NEG_SATURATION {
        return Wad::ZERO;
    }

    // x = k·ln2 + r, so e^-x = e^-r / 2^k.
    let k = x / constants::LN_2;
    let r = x - k * constants::LN_2;

    let mut sum: i128 = WAD as i128;
    let mut term: u128 = WAD;
    for n in 1..=EXP_MAX_TERMS {
        term = term * r / WAD / n;
        if term == 0 {
            break;
        }
        #[allow(clippy::cast_possible_wrap)]
        let signed = term as i128;
        if n % 2 == 1 {
            sum -= signed;
        } else {
            sum += signed;
        }
    }

    #[allow(clippy::cast_sign_loss)]
    let reduced = sum.max(0) as u128;
    if k >= 128 {
        return Wad::ZERO;
    }
    Wad::from_raw(reduced >> k)
}

/// Natural logarithm, signed.
///
/// Fails with a math-domain error for `y == 0`.
pub fn ln(y: Wad) -> Result<i128> {
    let mut v = y.raw();
    if v == 0 {
        return Err(OpenmarketError::MathDomain {
            reason: "ln(0) is undefined".to_string(),
        });
    }

    // Bring v into (0.5, 2.0], tracking the power of two removed.
    let mut k: i128 = 0;
    while v > 2 * WAD {
        v >>= 1;
        k += 1;
    }
    while v <= WAD / 2 {
        v <<= 1;
        k -= 1;
    }

    // ln(v) = 2·atanh(z), z = (v-1)/(v+1), |z| ≤ 1/3.
    #[allow(clippy::cast_possible_wrap)]
    let (v, one) = (v as i128, WAD as i128);
    let z = (v - one) * one / (v + one);
    let z2 = z * z / one;

    let mut sum: i128 = 0;
    let mut power = z;
    for n in 0..LN_MAX_TERMS {
        if power == 0 {
            break;
        }
        sum += power / (2 * n + 1);
        power = power * z2 / one;
    }

    #[allow(clippy::cast_possible_wrap)]
    let ln2 = constants::LN_2 as i128;
    Ok(2 * sum + k * ln2)
}
