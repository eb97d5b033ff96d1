//! Trade execution against the LMSR market maker.
//!
//! Buy and sell share one pricing path: the cost-function delta between the
//! current and the post-trade share vector, scaled by the payout per share.
//! Rounding always favours the market: buys round the raw cost up, sells
//! round the raw proceeds down, and fees round down on both sides.

use chrono::{DateTime, Utc};
use openmarket_custody::{Authorizer, TokenLedger};
use openmarket_types::{
    BuyLimits, Market, MarketEvent, MarketId, MarketStatus, OpenmarketError, Quote, Result,
    SellLimits, TradeReceipt, TradeSide, UserId, Wad, constants,
};
use tracing::{info, warn};

use crate::engine::MarketEngine;
use crate::solvency;

/// Reject zero and absurdly large quantities.
fn check_quantity(quantity: Wad) -> Result<()> {
    if quantity.is_zero() {
        return Err(OpenmarketError::ZeroQuantity);
    }
    if quantity.raw() > constants::MAX_TRADE_QUANTITY {
        return Err(OpenmarketError::InvalidArgument {
            reason: format!("quantity {quantity} exceeds the per-trade maximum"),
        });
    }
    Ok(())
}

/// Trading requires a validated market inside its window.
fn check_tradable(market: &Market, now: DateTime<Utc>) -> Result<()> {
    match market.status {
        MarketStatus::Created => Err(OpenmarketError::MarketNotValidated(market.id)),
        MarketStatus::Resolved { .. } => Err(OpenmarketError::AlreadyResolved(market.id)),
        MarketStatus::Invalidated => Err(OpenmarketError::AlreadyInvalidated(market.id)),
        MarketStatus::Validated if now < market.trading_start => {
            Err(OpenmarketError::TradingNotStarted(market.id))
        }
        MarketStatus::Validated if now >= market.trading_end => {
            Err(OpenmarketError::TradingClosed(market.id))
        }
        MarketStatus::Validated => Ok(()),
    }
}

impl<L: TokenLedger, A: Authorizer> MarketEngine<L, A> {
    pub(crate) fn price_buy(&self, market: &Market, option: usize, quantity: Wad) -> Result<Quote> {
        check_quantity(quantity)?;
        market.check_option(option)?;
        let delta = Self::pricing(market)?.compute_buy_delta(&market.options, option, quantity)?;
        let raw = delta.checked_mul_ceil(market.payout_per_share)?;
        if raw.is_zero() {
            return Err(OpenmarketError::PriceTooLow);
        }
        let fee = raw.checked_mul(self.params.fee_rate)?;
        Quote::new(TradeSide::Buy, quantity, raw, fee)
    }

    pub(crate) fn price_sell(
        &self,
        market: &Market,
        option: usize,
        quantity: Wad,
    ) -> Result<Quote> {
        check_quantity(quantity)?;
        market.check_option(option)?;
        let delta = Self::pricing(market)?.compute_sell_delta(&market.options, option, quantity)?;
        let raw = delta.checked_mul(market.payout_per_share)?;
        let fee = raw.checked_mul(self.params.fee_rate)?;
        let quote = Quote::new(TradeSide::Sell, quantity, raw, fee)?;
        if quote.total.is_zero() {
            return Err(OpenmarketError::PriceTooLow);
        }
        Ok(quote)
    }

    /// Buy `quantity` shares of `option`, paying `raw + fee` from the
    /// caller's allowance to the vault.
    pub fn buy_shares(
        &mut self,
        caller: UserId,
        id: MarketId,
        option: usize,
        quantity: Wad,
        limits: BuyLimits,
    ) -> Result<TradeReceipt> {
        let _token = self.guard.enter()?;
        let now = self.clock.now();
        let market = self.book.get(id)?;
        check_tradable(market, now)?;

        let quote = self.price_buy(market, option, quantity)?;
        if let Err(err) = limits.check(&quote) {
            warn!(market = %id, option, %caller, error = %err, "buy rejected");
            return Err(err);
        }

        // Stage.
        let mut staged = market.options.clone();
        staged[option].shares = staged[option].shares.checked_add(quantity)?;
        Self::pricing(market)?.update_current_prices(&mut staged)?;
        let user_liquidity = market.user_liquidity.checked_add(quote.raw)?;
        solvency::verify(
            &staged,
            market.payout_per_share,
            market.admin_liquidity,
            user_liquidity,
        )?;
        let mut position = self.book.position(id, option, caller);
        position.credit(quantity, quote.raw)?;
        let fee_entry = self.fees.accrued(id, quote.fee)?;

        // Interact.
        let vault = self.params.vault;
        self.ledger
            .transfer_from(vault, caller, vault, quote.total)?;

        // Commit.
        let new_price = staged[option].last_price;
        let market = self.book.get_mut(id)?;
        market.options = staged;
        market.user_liquidity = user_liquidity;
        self.book.set_position(id, option, caller, position);
        self.fees.store(id, fee_entry);

        let receipt = TradeReceipt {
            id: self.next_trade_id(),
            market: id,
            option,
            trader: caller,
            quote,
            new_price,
            executed_at: now,
        };
        info!(
            trade = %receipt.id,
            market = %id,
            option,
            %caller,
            quantity = %quantity,
            raw = %quote.raw,
            fee = %quote.fee,
            total = %quote.total,
            new_price = %new_price,
            "shares bought"
        );
        self.journal.push(MarketEvent::SharesBought(receipt.clone()));
        Ok(receipt)
    }

    /// Sell `quantity` shares of `option` back to the market, receiving
    /// `raw - fee` from the vault.
    pub fn sell_shares(
        &mut self,
        caller: UserId,
        id: MarketId,
        option: usize,
        quantity: Wad,
        limits: SellLimits,
    ) -> Result<TradeReceipt> {
        let _token = self.guard.enter()?;
        let now = self.clock.now();
        let market = self.book.get(id)?;
        check_tradable(market, now)?;
        check_quantity(quantity)?;
        market.check_option(option)?;

        let mut position = self.book.position(id, option, caller);
        if position.shares < quantity {
            return Err(OpenmarketError::InsufficientShares {
                needed: quantity,
                available: position.shares,
            });
        }

        let quote = self.price_sell(market, option, quantity)?;
        if let Err(err) = limits.check(&quote) {
            warn!(market = %id, option, %caller, error = %err, "sell rejected");
            return Err(err);
        }

        // Stage.
        let mut staged = market.options.clone();
        staged[option].shares = staged[option].shares.checked_sub(quantity)?;
        Self::pricing(market)?.update_current_prices(&mut staged)?;
        let user_liquidity = market.user_liquidity.checked_sub(quote.raw)?;
        solvency::verify(
            &staged,
            market.payout_per_share,
            market.admin_liquidity,
            user_liquidity,
        )?;
        position.debit(quantity, quote.raw)?;
        let fee_entry = self.fees.accrued(id, quote.fee)?;

        // Interact.
        let vault = self.params.vault;
        self.ledger.transfer(vault, caller, quote.total)?;

        // Commit.
        let new_price = staged[option].last_price;
        let market = self.book.get_mut(id)?;
        market.options = staged;
        market.user_liquidity = user_liquidity;
        self.book.set_position(id, option, caller, position);
        self.fees.store(id, fee_entry);

        let receipt = TradeReceipt {
            id: self.next_trade_id(),
            market: id,
            option,
            trader: caller,
            quote,
            new_price,
            executed_at: now,
        };
        info!(
            trade = %receipt.id,
            market = %id,
            option,
            %caller,
            quantity = %quantity,
            raw = %quote.raw,
            fee = %quote.fee,
            total = %quote.total,
            new_price = %new_price,
            "shares sold"
        );
        self.journal.push(MarketEvent::SharesSold(receipt.clone()));
        Ok(receipt)
    }
}
