//! Per-(market, option, user) share holdings.

use serde::{Deserialize, Serialize};

use crate::{Result, Wad};

/// A trader's holding in one option of one market.
///
/// Created lazily on the first buy. Zeroed and marked claimed on a
/// successful claim or refund.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosition {
    /// Share balance. Never negative.
    pub shares: Wad,
    /// Raw tokens paid in minus raw tokens refunded on sells, floored at zero.
    pub net_cost: Wad,
    pub claimed: bool,
}

impl UserPosition {
    /// Record a buy of `shares` for `raw_cost` (fees excluded).
    pub fn credit(&mut self, shares: Wad, raw_cost: Wad) -> Result<()> {
        self.shares = self.shares.checked_add(shares)?;
        self.net_cost = self.net_cost.checked_add(raw_cost)?;
        Ok(())
    }

    /// Record a sell of `shares` returning `raw_refund` (fees included).
    pub fn debit(&mut self, shares: Wad, raw_refund: Wad) -> Result<()> {
        self.shares = self.shares.checked_sub(shares)?;
        self.net_cost = self.net_cost.saturating_sub(raw_refund);
        Ok(())
    }

    /// Zero the position after a payout.
    pub fn settle(&mut self) {
        self.shares = Wad::ZERO;
        self.net_cost = Wad::ZERO;
        self.claimed = true;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shares.is_zero() && self.net_cost.is_zero()
    }
}
