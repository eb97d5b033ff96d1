//! Trade-facing types: side, quotes, slippage limits, and executed trade
//! receipts.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MarketId, OpenmarketError, Result, TradeId, UserId, Wad};

/// Direction of a trade against the market maker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Priced trade, before or after execution.
///
/// For a buy, `total = raw + fee` is what the trader pays. For a sell,
/// `total = raw - fee` is what the trader receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub side: TradeSide,
    pub quantity: Wad,
    /// Cost-function delta times payout per share, rounded against the trader.
    pub raw: Wad,
    pub fee: Wad,
    pub total: Wad,
    /// `total / quantity`.
    pub avg_price_per_share: Wad,
}

impl Quote {
    /// Build a quote from the raw amount and fee. Fails if a sell fee
    /// exceeds the raw proceeds or the average price overflows.
    pub fn new(side: TradeSide, quantity: Wad, raw: Wad, fee: Wad) -> Result<Self> {
        let total = match side {
            TradeSide::Buy => raw.checked_add(fee)?,
            TradeSide::Sell => raw.checked_sub(fee)?,
        };
        if quantity.is_zero() {
            return Err(OpenmarketError::ZeroQuantity);
        }
        let avg_price_per_share = total.checked_div(quantity)?;
        Ok(Self {
            side,
            quantity,
            raw,
            fee,
            total,
            avg_price_per_share,
        })
    }
}

/// Optional slippage bounds on a buy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyLimits {
    pub max_price_per_share: Option<Wad>,
    pub max_total_cost: Option<Wad>,
}

impl BuyLimits {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    pub fn check(&self, quote: &Quote) -> Result<()> {
        if let Some(max) = self.max_price_per_share.filter(|max| quote.avg_price_per_share > *max) {
            return Err(OpenmarketError::SlippageExceeded {
                reason: format!(
                    "average price {} above limit {max}",
                    quote.avg_price_per_share
                ),
            });
        }
        if let Some(max) = self.max_total_cost.filter(|max| quote.total > *max) {
            return Err(OpenmarketError::SlippageExceeded {
                reason: format!("total cost {} above limit {max}", quote.total),
            });
        }
        Ok(())
    }
}

/// Optional slippage bounds on a sell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellLimits {
    pub min_price_per_share: Option<Wad>,
    pub min_total_proceeds: Option<Wad>,
}

impl SellLimits {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    pub fn check(&self, quote: &Quote) -> Result<()> {
        if let Some(min) = self.min_price_per_share.filter(|min| quote.avg_price_per_share < *min) {
            return Err(OpenmarketError::SlippageExceeded {
                reason: format!(
                    "average price {} below limit {min}",
                    quote.avg_price_per_share
                ),
            });
        }
        if let Some(min) = self.min_total_proceeds.filter(|min| quote.total < *min) {
            return Err(OpenmarketError::SlippageExceeded {
                reason: format!("proceeds {} below limit {min}", quote.total),
            });
        }
        Ok(())
    }
}

/// Record of an executed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub id: TradeId,
    pub market: MarketId,
    pub option: usize,
    pub trader: UserId,
    pub quote: Quote,
    /// Marginal price of the traded option after execution.
    pub new_price: Wad,
    pub executed_at: DateTime<Utc>,
}

impl fmt::Display for TradeReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trade[{}] {} {} option {} qty {} total {} -> price {}",
            self.id,
            self.market,
            self.quote.side,
            self.option,
            self.quote.quantity,
            self.quote.total,
            self.new_price,
        )
    }
}
