//! Per-market fee accounting record.

use serde::{Deserialize, Serialize};

use crate::{Result, Wad};

/// Fees collected by one market.
///
/// Fees stay locked while the market can still trade. Resolution or
/// invalidation unlocks them for the fee collector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEntry {
    pub collected: Wad,
    pub unlocked: bool,
    pub withdrawn: Wad,
}

impl FeeEntry {
    /// Unlocked fees not yet withdrawn.
    pub fn withdrawable(&self) -> Result<Wad> {
        if !self.unlocked {
            return Ok(Wad::ZERO);
        }
        self.collected.checked_sub(self.withdrawn)
    }

    /// Collected fees still locked behind an open market.
    #[must_use]
    pub fn locked(&self) -> Wad {
        if self.unlocked {
            Wad::ZERO
        } else {
            self.collected
        }
    }
}
