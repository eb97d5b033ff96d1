//! Per-market pricing logic over the LMSR cost engine.
//!
//! [`MarketPricing`] binds a market's liquidity parameter and outcome count,
//! and adapts option state to the cost engine: trade deltas, committed
//! price updates, and the price-vector invariant check.

use openmarket_types::{OpenmarketError, OptionState, Result, WAD, Wad, constants};
use tracing::{debug, error};

use crate::lmsr;

/// Pricing context for a single market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketPricing {
    liquidity_param: Wad,
    outcome_count: usize,
}

impl MarketPricing {
    pub fn new(liquidity_param: Wad, outcome_count: usize) -> Result<Self> {
        if liquidity_param.is_zero() {
            return Err(OpenmarketError::InvalidLiquidityParam(liquidity_param));
        }
        lmsr::check_outcome_count(outcome_count)?;
        Ok(Self {
            liquidity_param,
            outcome_count,
        })
    }

    #[must_use]
    pub fn liquidity_param(&self) -> Wad {
        self.liquidity_param
    }

    #[must_use]
    pub fn outcome_count(&self) -> usize {
        self.outcome_count
    }

    fn check_len(&self, actual: usize) -> Result<()> {
        if actual != self.outcome_count {
            return Err(OpenmarketError::LengthMismatch {
                expected: self.outcome_count,
                actual,
            });
        }
        Ok(())
    }

    fn check_option(&self, option: usize) -> Result<()> {
        if option >= self.outcome_count {
            return Err(OpenmarketError::InvalidOption {
                option,
                outcome_count: self.outcome_count,
            });
        }
        Ok(())
    }

    pub fn calculate_cost(&self, shares: &[Wad]) -> Result<Wad> {
        self.check_len(shares.len())?;
        lmsr::cost(self.liquidity_param, shares)
    }

    pub fn calculate_cost_from_option_state(&self, options: &[OptionState]) -> Result<Wad> {
        let shares: Vec<Wad> = options.iter().map(|o| o.shares).collect();
        self.calculate_cost(&shares)
    }

    /// Bounded, normalized prices for a share vector.
    pub fn prices(&self, shares: &[Wad]) -> Result<Vec<Wad>> {
        self.check_len(shares.len())?;
        lmsr::probabilities(self.liquidity_param, shares)
    }

    /// Recompute and commit `last_price` on every option. All or nothing:
    /// on error no option is touched.
    pub fn update_current_prices(&self, options: &mut [OptionState]) -> Result<()> {
        let shares: Vec<Wad> = options.iter().map(|o| o.shares).collect();
        let prices = self.prices(&shares)?;
        Self::validate_prices(&prices)?;
        for (option, price) in options.iter_mut().zip(prices) {
            option.last_price = price;
        }
        Ok(())
    }

    /// `C(q + qty·e_i) - C(q)` in shares.
    pub fn compute_buy_delta(
        &self,
        options: &[OptionState],
        option: usize,
        quantity: Wad,
    ) -> Result<Wad> {
        self.check_option(option)?;
        if quantity.is_zero() {
            return Err(OpenmarketError::ZeroQuantity);
        }
        let before = self.calculate_cost_from_option_state(options)?;
        let mut after_shares: Vec<Wad> = options.iter().map(|o| o.shares).collect();
        after_shares[option] = after_shares[option].checked_add(quantity)?;
        let after = self.calculate_cost(&after_shares)?;
        let delta = after.saturating_sub(before);
        debug!(option, quantity = %quantity, delta = %delta, "buy delta");
        Ok(delta)
    }

    /// `C(q) - C(q - qty·e_i)` in shares. The book must hold `qty` shares of
    /// the option.
    pub fn compute_sell_delta(
        &self,
        options: &[OptionState],
        option: usize,
        quantity: Wad,
    ) -> Result<Wad> {
        self.check_option(option)?;
        if quantity.is_zero() {
            return Err(OpenmarketError::ZeroQuantity);
        }
        let before = self.calculate_cost_from_option_state(options)?;
        let held = options[option].shares;
        if held < quantity {
            return Err(OpenmarketError::InsufficientShares {
                needed: quantity,
                available: held,
            });
        }
        let mut after_shares: Vec<Wad> = options.iter().map(|o| o.shares).collect();
        after_shares[option] = held.checked_sub(quantity)?;
        let after = self.calculate_cost(&after_shares)?;
        let delta = before.saturating_sub(after);
        debug!(option, quantity = %quantity, delta = %delta, "sell delta");
        Ok(delta)
    }

    /// Every price in `[0, 1]` and the sum within
    /// [`PRICE_SUM_TOLERANCE_PPM`](constants::PRICE_SUM_TOLERANCE_PPM) of one.
    pub fn validate_prices(prices: &[Wad]) -> Result<()> {
        let mut total = Wad::ZERO;
        for (i, price) in prices.iter().enumerate() {
            if *price > Wad::ONE {
                error!(option = i, price = %price, "price above one");
                return Err(OpenmarketError::PriceInvariantViolation {
                    reason: format!("price {price} of option {i} exceeds 1"),
                });
            }
            total = total.checked_add(*price)?;
        }
        let tolerance = WAD / 1_000_000 * constants::PRICE_SUM_TOLERANCE_PPM;
        if total.raw().abs_diff(WAD) > tolerance {
            error!(total = %total, "price vector not normalized");
            return Err(OpenmarketError::PriceInvariantViolation {
                reason: format!("prices sum to {total}"),
            });
        }
        Ok(())
    }
}
