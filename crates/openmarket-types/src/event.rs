//! Events emitted by every committed engine mutation.
//!
//! Indexers drain these from the engine journal. A failed operation emits
//! nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MarketId, TradeReceipt, UserId, Wad};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    MarketCreated {
        market: MarketId,
        creator: UserId,
        outcome_count: usize,
        liquidity_param: Wad,
        initial_liquidity: Wad,
        trading_end: DateTime<Utc>,
    },
    MarketValidated {
        market: MarketId,
        validator: UserId,
    },
    SharesBought(TradeReceipt),
    SharesSold(TradeReceipt),
    MarketResolved {
        market: MarketId,
        winning_option: usize,
        resolver: UserId,
    },
    MarketInvalidated {
        market: MarketId,
        seed_refunded: Wad,
    },
    WinningsClaimed {
        market: MarketId,
        user: UserId,
        shares: Wad,
        payout: Wad,
    },
    RefundClaimed {
        market: MarketId,
        user: UserId,
        amount: Wad,
    },
    FeesWithdrawn {
        collector: UserId,
        amount: Wad,
    },
    SurplusWithdrawn {
        market: MarketId,
        creator: UserId,
        amount: Wad,
    },
}

impl MarketEvent {
    /// The market this event concerns. Fee withdrawals span markets.
    #[must_use]
    pub fn market(&self) -> Option<MarketId> {
        match self {
            Self::MarketCreated { market, .. }
            | Self::MarketValidated { market, .. }
            | Self::MarketResolved { market, .. }
            | Self::MarketInvalidated { market, .. }
            | Self::WinningsClaimed { market, .. }
            | Self::RefundClaimed { market, .. }
            | Self::SurplusWithdrawn { market, .. } => Some(*market),
            Self::SharesBought(receipt) | Self::SharesSold(receipt) => Some(receipt.market),
            Self::FeesWithdrawn { .. } => None,
        }
    }
}
