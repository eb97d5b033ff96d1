//! Market model: the per-market record, its outcome options, and the
//! lifecycle status.
//!
//! A market is created with all share ledgers at zero and uniform prices,
//! passes an optional validation gate, trades inside its window, and ends
//! either **Resolved** (exactly once, with a winning option) or
//! **Invalidated**.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MarketId, OpenmarketError, Result, UserId, Wad};

/// Stored lifecycle status of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketStatus {
    /// Created, awaiting the validation gate.
    Created,
    /// Passed validation; trading is open inside the window.
    Validated,
    /// Resolved to a winning option. Terminal.
    Resolved { winning_option: usize },
    /// Invalidated before resolution. Terminal.
    Invalidated,
}

impl MarketStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved { .. } | Self::Invalidated)
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Validated => write!(f, "VALIDATED"),
            Self::Resolved { winning_option } => write!(f, "RESOLVED({winning_option})"),
            Self::Invalidated => write!(f, "INVALIDATED"),
        }
    }
}

/// Time-dependent view of a market, derived from its status and window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketPhase {
    /// Awaiting validation.
    Created,
    /// Validated, window not yet open.
    Scheduled,
    /// Validated and inside the trading window.
    Active,
    /// Window ended, awaiting resolution.
    Closed,
    Resolved,
    Invalidated,
}

impl fmt::Display for MarketPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Scheduled => write!(f, "SCHEDULED"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Invalidated => write!(f, "INVALIDATED"),
        }
    }
}

/// Descriptive metadata. Carried through untouched; the engine never reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketMetadata {
    pub question: String,
    pub description: String,
    pub option_names: Vec<String>,
    pub option_descriptions: Vec<String>,
    pub category: String,
    pub market_type: String,
}

/// Request to create a market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMarket {
    pub metadata: MarketMetadata,
    /// Length of the trading window in seconds, starting at creation.
    pub duration_secs: i64,
    /// Seed liquidity pulled from the creator.
    pub initial_liquidity: Wad,
    /// Allows resolution after the cool-down instead of after the window.
    pub early_resolution_allowed: bool,
}

impl NewMarket {
    /// Number of outcomes this request declares.
    #[must_use]
    pub fn outcome_count(&self) -> usize {
        self.metadata.option_names.len()
    }
}

/// One outcome of a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionState {
    /// Cumulative shares outstanding (`q_i`). Never negative.
    pub shares: Wad,
    /// Last committed marginal price, as a fraction of the payout unit.
    pub last_price: Wad,
    pub active: bool,
}

impl OptionState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shares: Wad::ZERO,
            last_price: Wad::ZERO,
            active: true,
        }
    }
}

impl Default for OptionState {
    fn default() -> Self {
        Self::new()
    }
}

/// A single prediction market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub creator: UserId,
    pub metadata: MarketMetadata,
    /// LMSR liquidity parameter. Fixed at creation.
    pub liquidity_param: Wad,
    pub options: Vec<OptionState>,
    /// Tokens paid out per winning share, snapshotted at creation.
    pub payout_per_share: Wad,
    /// Seed liquidity provided by the creator.
    pub admin_liquidity: Wad,
    /// Σ raw buy costs − Σ raw sell refunds.
    pub user_liquidity: Wad,
    pub status: MarketStatus,
    pub created_at: DateTime<Utc>,
    pub trading_start: DateTime<Utc>,
    pub trading_end: DateTime<Utc>,
    pub early_resolution_allowed: bool,
    /// Winning shares already claimed.
    pub claimed_shares: Wad,
    /// Tokens paid to winners or refunded to traders.
    pub paid_out: Wad,
    /// Remaining pool for refunds after invalidation.
    pub refundable: Wad,
    /// Surplus withdrawn by the creator after resolution.
    pub surplus_withdrawn: Wad,
}

impl Market {
    #[must_use]
    pub fn outcome_count(&self) -> usize {
        self.options.len()
    }

    /// Share ledger vector `q`.
    #[must_use]
    pub fn shares(&self) -> Vec<Wad> {
        self.options.iter().map(|o| o.shares).collect()
    }

    /// Committed price vector.
    #[must_use]
    pub fn prices(&self) -> Vec<Wad> {
        self.options.iter().map(|o| o.last_price).collect()
    }

    /// Seed plus net user liquidity: what backs the outcome payouts.
    pub fn available_liquidity(&self) -> Result<Wad> {
        self.admin_liquidity.checked_add(self.user_liquidity)
    }

    #[must_use]
    pub fn winning_option(&self) -> Option<usize> {
        match self.status {
            MarketStatus::Resolved { winning_option } => Some(winning_option),
            _ => None,
        }
    }

    /// Reject option indices outside `0..outcome_count`.
    pub fn check_option(&self, option: usize) -> Result<()> {
        if option >= self.outcome_count() {
            return Err(OpenmarketError::InvalidOption {
                option,
                outcome_count: self.outcome_count(),
            });
        }
        Ok(())
    }

    /// Whether `now` falls inside `[trading_start, trading_end)`.
    #[must_use]
    pub fn within_window(&self, now: DateTime<Utc>) -> bool {
        now >= self.trading_start && now < self.trading_end
    }

    /// Derive the time-dependent phase.
    #[must_use]
    pub fn phase(&self, now: DateTime<Utc>) -> MarketPhase {
        match self.status {
            MarketStatus::Created => MarketPhase::Created,
            MarketStatus::Resolved { .. } => MarketPhase::Resolved,
            MarketStatus::Invalidated => MarketPhase::Invalidated,
            MarketStatus::Validated if now < self.trading_start => MarketPhase::Scheduled,
            MarketStatus::Validated if now < self.trading_end => MarketPhase::Active,
            MarketStatus::Validated => MarketPhase::Closed,
        }
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

#[cfg(any(test, feature = "test-helpers"))]
impl Market {
    /// A validated market open for a week from `now`, with uniform prices
    /// already committed. Pricing fields are set directly; only use in tests.
    #[must_use]
    pub fn dummy(outcome_count: usize, liquidity_param: Wad, now: DateTime<Utc>) -> Self {
        use chrono::Duration;

        let n = u64::try_from(outcome_count).unwrap_or(1);
        let mut options = vec![OptionState::new(); outcome_count];
        for option in &mut options {
            option.last_price = Wad::from_ratio(1, n);
        }
        Self {
            id: MarketId(0),
            creator: UserId::from_bytes([0xAD; 16]),
            metadata: MarketMetadata::default(),
            liquidity_param,
            options,
            payout_per_share: Wad::ONE,
            admin_liquidity: Wad::from_units(1_000),
            user_liquidity: Wad::ZERO,
            status: MarketStatus::Validated,
            created_at: now,
            trading_start: now,
            trading_end: now + Duration::days(7),
            early_resolution_allowed: false,
            claimed_shares: Wad::ZERO,
            paid_out: Wad::ZERO,
            refundable: Wad::ZERO,
            surplus_withdrawn: Wad::ZERO,
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl NewMarket {
    /// A request with `outcome_count` generic options.
    #[must_use]
    pub fn dummy(outcome_count: usize, initial_liquidity: Wad) -> Self {
        let option_names = (0..outcome_count).map(|i| format!("Option {i}")).collect();
        let option_descriptions = (0..outcome_count).map(|i| format!("Outcome #{i}")).collect();
        Self {
            metadata: MarketMetadata {
                question: "Which outcome happens?".to_string(),
                description: "Test market".to_string(),
                option_names,
                option_descriptions,
                category: "test".to_string(),
                market_type: "multiple-choice".to_string(),
            },
            duration_secs: 7 * 24 * 3_600,
            initial_liquidity,
            early_resolution_allowed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn phase_follows_status_and_window() {
        let now = Utc::now();
        let mut market = Market::dummy(2, Wad::from_units(100), now);
        assert_eq!(market.phase(now), MarketPhase::Active);
        assert_eq!(market.phase(now - Duration::seconds(1)), MarketPhase::Scheduled);
        assert_eq!(market.phase(now + Duration::days(8)), MarketPhase::Closed);

        market.status = MarketStatus::Created;
        assert_eq!(market.phase(now), MarketPhase::Created);

        market.status = MarketStatus::Resolved { winning_option: 1 };
        assert_eq!(market.phase(now), MarketPhase::Resolved);
        assert_eq!(market.winning_option(), Some(1));
        assert!(market.status.is_terminal());
    }

    #[test]
    fn window_is_half_open() {
        let now = Utc::now();
        let market = Market::dummy(2, Wad::from_units(100), now);
        assert!(market.within_window(now));
        assert!(!market.within_window(market.trading_end));
    }

    #[test]
    fn check_option_bounds() {
        let market = Market::dummy(3, Wad::from_units(100), Utc::now());
        assert!(market.check_option(2).is_ok());
        let err = market.check_option(3).unwrap_err();
        assert!(matches!(
            err,
            OpenmarketError::InvalidOption {
                option: 3,
                outcome_count: 3
            }
        ));
    }

    #[test]
    fn available_liquidity_sums_seed_and_users() {
        let mut market = Market::dummy(2, Wad::from_units(100), Utc::now());
        market.user_liquidity = Wad::from_units(25);
        assert_eq!(market.available_liquidity().unwrap(), Wad::from_units(1_025));
    }

    #[test]
    fn status_display() {
        assert_eq!(MarketStatus::Created.to_string(), "CREATED");
        assert_eq!(
            MarketStatus::Resolved { winning_option: 0 }.to_string(),
            "RESOLVED(0)"
        );
    }
}
