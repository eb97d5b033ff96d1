//! LMSR cost function and price derivation.
//!
//! `C(q) = b · ln Σ exp(q_i / b)`, evaluated through log-sum-exp:
//! with `m = max(q_i / b)`, `C(q) = b · (m + ln Σ exp(q_i / b - m))`, so every
//! exponential has a non-positive argument and [`exp_neg`] never overflows.
//!
//! Marginal prices are the softmax of `q / b`, then bounded to
//! `[PRICE_FLOOR, PRICE_CAP]` and renormalized so they sum to exactly one.

use openmarket_types::{OpenmarketError, Result, WAD, Wad, constants, mul_div};
use tracing::debug;

use crate::transcendental::{exp_neg, ln};

/// `ln(n)` to 18 decimals for `n` in `0..=10`. Entries 0 and 1 are unused.
pub const LN_TABLE: [u128; 11] = [
    0,
    0,
    693_147_180_559_945_309,
    1_098_612_288_668_109_691,
    1_386_294_361_119_890_618,
    1_609_437_912_434_100_374,
    1_791_759_469_228_055_000,
    1_945_910_149_055_313_305,
    2_079_441_541_679_835_928,
    2_197_224_577_336_219_382,
    2_302_585_092_994_045_684,
];

/// Reject outcome counts outside `[MIN_OUTCOMES, MAX_OUTCOMES]`.
pub fn check_outcome_count(count: usize) -> Result<()> {
    if !(constants::MIN_OUTCOMES..=constants::MAX_OUTCOMES).contains(&count) {
        return Err(OpenmarketError::InvalidOutcomeCount {
            count,
            min: constants::MIN_OUTCOMES,
            max: constants::MAX_OUTCOMES,
        });
    }
    Ok(())
}

/// `ln(n)` from [`LN_TABLE`].
pub fn ln_outcomes(count: usize) -> Result<Wad> {
    check_outcome_count(count)?;
    Ok(Wad::from_raw(LN_TABLE[count]))
}

/// `m = max(q_i / b)` and `exp(q_i / b - m)` for every outcome.
fn shifted_exponentials(b: Wad, shares: &[Wad]) -> Result<(Wad, Vec<Wad>)> {
    if b.is_zero() {
        return Err(OpenmarketError::InvalidLiquidityParam(b));
    }
    let scaled = shares
        .iter()
        .map(|q| q.checked_div(b))
        .collect::<Result<Vec<_>>>()?;
    let max = scaled.iter().copied().max().unwrap_or(Wad::ZERO);
    let exps = scaled
        .iter()
        .map(|s| exp_neg(max.saturating_sub(*s)))
        .collect();
    Ok((max, exps))
}

fn sum(values: &[Wad]) -> Result<Wad> {
    values
        .iter()
        .try_fold(Wad::ZERO, |acc, v| acc.checked_add(*v))
}

/// First index holding the largest value.
fn argmax(values: &[Wad]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// LMSR cost `C(q)` in shares. An empty share vector costs nothing.
pub fn cost(b: Wad, shares: &[Wad]) -> Result<Wad> {
    if b.is_zero() {
        return Err(OpenmarketError::InvalidLiquidityParam(b));
    }
    if shares.is_empty() {
        return Ok(Wad::ZERO);
    }
    let (max, exps) = shifted_exponentials(b, shares)?;
    // The max term is exactly one, so the sum is ≥ 1 and its log ≥ 0.
    let log_sum = ln(sum(&exps)?)?.max(0);
    #[allow(clippy::cast_sign_loss)]
    let log_sum = Wad::from_raw(log_sum as u128);
    b.checked_mul(max.checked_add(log_sum)?)
}

/// Plain softmax of `q / b`, without bounds.
pub fn raw_probabilities(b: Wad, shares: &[Wad]) -> Result<Vec<Wad>> {
    if shares.is_empty() {
        return Ok(Vec::new());
    }
    let (_, exps) = shifted_exponentials(b, shares)?;
    let total = sum(&exps)?;
    exps.iter()
        .map(|e| {
            mul_div(e.raw(), WAD, total.raw())
                .map(Wad::from_raw)
                .ok_or_else(|| OpenmarketError::ArithmeticOverflow {
                    op: "softmax".to_string(),
                })
        })
        .collect()
}

/// Bounded marginal prices: softmax, cap, floor, then renormalize so the
/// vector sums to exactly [`Wad::ONE`].
pub fn probabilities(b: Wad, shares: &[Wad]) -> Result<Vec<Wad>> {
    let mut prices = raw_probabilities(b, shares)?;
    if prices.len() < 2 {
        return Ok(prices);
    }
    apply_cap(&mut prices)?;
    apply_floor(&mut prices)?;
    renormalize(&mut prices)?;
    debug!(b = %b, prices = ?prices.iter().map(ToString::to_string).collect::<Vec<_>>(), "bounded prices");
    Ok(prices)
}

/// Clip anything above the cap and hand the excess to the other outcomes in
/// proportion to their price, or evenly when they are all zero.
fn apply_cap(prices: &mut [Wad]) -> Result<()> {
    let cap = Wad::from_raw(constants::PRICE_CAP);
    for i in 0..prices.len() {
        if prices[i] <= cap {
            continue;
        }
        let excess = prices[i].checked_sub(cap)?;
        prices[i] = cap;

        let others: Wad = sum(prices)?.checked_sub(cap)?;
        let n_others = (prices.len() - 1) as u128;
        for (j, price) in prices.iter_mut().enumerate() {
            if j == i {
                continue;
            }
            let share = if others.is_zero() {
                excess.checked_div_int(n_others)?
            } else {
                mul_div(excess.raw(), price.raw(), others.raw())
                    .map(Wad::from_raw)
                    .ok_or_else(|| OpenmarketError::ArithmeticOverflow {
                        op: "cap_redistribution".to_string(),
                    })?
            };
            *price = price.checked_add(share)?;
        }
    }
    Ok(())
}

/// Lift anything below the floor, taking the deficit from the current
/// largest outcome.
fn apply_floor(prices: &mut [Wad]) -> Result<()> {
    let floor = Wad::from_raw(constants::PRICE_FLOOR);
    for i in 0..prices.len() {
        if prices[i] >= floor {
            continue;
        }
        let deficit = floor.checked_sub(prices[i])?;
        prices[i] = floor;
        let donor = argmax(prices);
        prices[donor] = prices[donor].checked_sub(deficit)?;
    }
    Ok(())
}

/// Push the rounding residual onto the largest bucket that stays within
/// the cap (on a shortfall) or off the largest bucket (on a surplus).
fn renormalize(prices: &mut [Wad]) -> Result<()> {
    let total = sum(prices)?;
    let one = Wad::ONE;
    if total == one {
        return Ok(());
    }
    if total < one {
        let residual = one.checked_sub(total)?;
        let cap = Wad::from_raw(constants::PRICE_CAP);
        let target = prices
            .iter()
            .enumerate()
            .filter(|(_, p)| p.checked_add(residual).is_ok_and(|v| v <= cap))
            .fold(None::<(usize, Wad)>, |best, (i, p)| match best {
                Some((_, bp)) if bp >= *p => best,
                _ => Some((i, *p)),
            })
            .map(|(i, _)| i)
            .ok_or_else(|| OpenmarketError::PriceInvariantViolation {
                reason: format!("no bucket can absorb residual {residual}"),
            })?;
        prices[target] = prices[target].checked_add(residual)?;
    } else {
        let surplus = total.checked_sub(one)?;
        let target = argmax(prices);
        let floor = Wad::from_raw(constants::PRICE_FLOOR);
        let lowered = prices[target].checked_sub(surplus)?;
        if lowered < floor {
            return Err(OpenmarketError::PriceInvariantViolation {
                reason: format!("surplus {surplus} would push outcome {target} below the floor"),
            });
        }
        prices[target] = lowered;
    }
    Ok(())
}

/// Derive `b` from seed liquidity: `b = 0.9·L / (ln(n) · payout)`, clamped
/// to `[1, 10^9]` shares. Fails when the clamped `b` would let the worst-case
/// market-maker loss `b·ln(n)·payout` exceed `L`.
pub fn compute_liquidity_param(
    initial_liquidity: Wad,
    outcome_count: usize,
    payout_per_share: Wad,
) -> Result<Wad> {
    let ln_n = ln_outcomes(outcome_count)?;
    if payout_per_share.is_zero() {
        return Err(OpenmarketError::InvalidArgument {
            reason: "payout per share must be positive".to_string(),
        });
    }

    let budget = initial_liquidity.checked_mul(Wad::from_raw(constants::LIQUIDITY_COVERAGE_RATIO))?;
    let unit_loss = ln_n.checked_mul(payout_per_share)?;
    let b = budget
        .checked_div(unit_loss)?
        .clamp(
            Wad::from_raw(constants::MIN_LIQUIDITY_PARAM),
            Wad::from_raw(constants::MAX_LIQUIDITY_PARAM),
        );

    let required = b.checked_mul_ceil(unit_loss)?;
    if required > initial_liquidity {
        return Err(OpenmarketError::InsufficientLiquidity {
            required,
            provided: initial_liquidity,
        });
    }
    debug!(b = %b, outcome_count, initial_liquidity = %initial_liquidity, "derived liquidity parameter");
    Ok(b)
}
