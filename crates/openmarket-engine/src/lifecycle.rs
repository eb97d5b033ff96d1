//! Market lifecycle: creation, validation, resolution, invalidation, and
//! the payouts that follow a terminal state.
//!
//! ```text
//! Created ──validate──▶ Validated ──resolve──▶ Resolved
//!    │                      │
//!    └──────invalidate──────┴──────────────▶ Invalidated
//! ```

use chrono::Duration;
use openmarket_custody::{Authorizer, Capability, TokenLedger};
use openmarket_pricing::{MarketPricing, compute_liquidity_param, lmsr};
use openmarket_types::{
    Market, MarketEvent, MarketId, MarketStatus, NewMarket, OpenmarketError, OptionState, Result,
    UserId, Wad,
};
use tracing::info;

use crate::engine::MarketEngine;

impl<L: TokenLedger, A: Authorizer> MarketEngine<L, A> {
    /// Create a market seeded with `request.initial_liquidity` pulled from
    /// the caller. Prices start uniform.
    pub fn create_market(&mut self, caller: UserId, request: NewMarket) -> Result<MarketId> {
        let _token = self.guard.enter()?;
        self.auth.require(caller, Capability::CreateMarket)?;

        let outcome_count = request.outcome_count();
        lmsr::check_outcome_count(outcome_count)?;
        let descriptions = request.metadata.option_descriptions.len();
        if descriptions != outcome_count {
            return Err(OpenmarketError::LengthMismatch {
                expected: outcome_count,
                actual: descriptions,
            });
        }
        let (min, max) = (self.params.min_duration_secs, self.params.max_duration_secs);
        if !(min..=max).contains(&request.duration_secs) {
            return Err(OpenmarketError::InvalidDuration {
                secs: request.duration_secs,
                min,
                max,
            });
        }
        let seed = request.initial_liquidity;
        if seed < self.params.min_initial_liquidity {
            return Err(OpenmarketError::InsufficientLiquidity {
                required: self.params.min_initial_liquidity,
                provided: seed,
            });
        }

        let payout_per_share = self.params.payout_per_share;
        let liquidity_param = compute_liquidity_param(seed, outcome_count, payout_per_share)?;
        let mut options = vec![OptionState::new(); outcome_count];
        MarketPricing::new(liquidity_param, outcome_count)?.update_current_prices(&mut options)?;

        let now = self.clock.now();
        let status = if self.params.require_validation {
            MarketStatus::Created
        } else {
            MarketStatus::Validated
        };
        let market = Market {
            id: self.book.next_id(),
            creator: caller,
            metadata: request.metadata,
            liquidity_param,
            options,
            payout_per_share,
            admin_liquidity: seed,
            user_liquidity: Wad::ZERO,
            status,
            created_at: now,
            trading_start: now,
            trading_end: now + Duration::seconds(request.duration_secs),
            early_resolution_allowed: request.early_resolution_allowed,
            claimed_shares: Wad::ZERO,
            paid_out: Wad::ZERO,
            refundable: Wad::ZERO,
            surplus_withdrawn: Wad::ZERO,
        };

        let vault = self.params.vault;
        self.ledger.transfer_from(vault, caller, vault, seed)?;

        let trading_end = market.trading_end;
        let id = self.book.insert(market);
        info!(
            market = %id,
            %caller,
            outcome_count,
            b = %liquidity_param,
            seed = %seed,
            %status,
            "market created"
        );
        self.journal.push(MarketEvent::MarketCreated {
            market: id,
            creator: caller,
            outcome_count,
            liquidity_param,
            initial_liquidity: seed,
            trading_end,
        });
        Ok(id)
    }

    /// Pass the validation gate. Only from `Created`.
    pub fn validate_market(&mut self, caller: UserId, id: MarketId) -> Result<()> {
        let _token = self.guard.enter()?;
        self.auth.require(caller, Capability::ValidateMarket)?;
        let market = self.book.get_mut(id)?;
        match market.status {
            MarketStatus::Created => {}
            MarketStatus::Validated => return Err(OpenmarketError::AlreadyValidated(id)),
            MarketStatus::Resolved { .. } => return Err(OpenmarketError::AlreadyResolved(id)),
            MarketStatus::Invalidated => return Err(OpenmarketError::AlreadyInvalidated(id)),
        }
        market.status = MarketStatus::Validated;
        info!(market = %id, validator = %caller, "market validated");
        self.journal.push(MarketEvent::MarketValidated {
            market: id,
            validator: caller,
        });
        Ok(())
    }

    /// Resolve to `winning_option`, once. Allowed after the window ends, or
    /// after the cool-down from creation when early resolution is enabled.
    /// Unlocks the market's fees and freezes its prices.
    pub fn resolve_market(
        &mut self,
        caller: UserId,
        id: MarketId,
        winning_option: usize,
    ) -> Result<()> {
        let _token = self.guard.enter()?;
        self.auth.require(caller, Capability::ResolveMarket)?;
        let now = self.clock.now();
        let cooldown = Duration::seconds(self.params.early_resolution_cooldown_secs);
        let market = self.book.get_mut(id)?;
        match market.status {
            MarketStatus::Validated => {}
            MarketStatus::Created => return Err(OpenmarketError::MarketNotValidated(id)),
            MarketStatus::Resolved { .. } => return Err(OpenmarketError::AlreadyResolved(id)),
            MarketStatus::Invalidated => return Err(OpenmarketError::AlreadyInvalidated(id)),
        }
        market.check_option(winning_option)?;
        let window_over = now >= market.trading_end;
        let early_ok = market.early_resolution_allowed && now >= market.created_at + cooldown;
        if !window_over && !early_ok {
            return Err(OpenmarketError::ResolutionTooEarly(id));
        }

        market.status = MarketStatus::Resolved { winning_option };
        let winning_price = market.options[winning_option].last_price;
        self.fees.unlock(id);
        info!(
            market = %id,
            winning_option,
            winning_price = %winning_price,
            resolver = %caller,
            early = !window_over,
            "market resolved"
        );
        self.journal.push(MarketEvent::MarketResolved {
            market: id,
            winning_option,
            resolver: caller,
        });
        Ok(())
    }

    /// Cancel a market that has not resolved. The creator's seed goes back
    /// to them, fees unlock, and net trader deposits become refundable.
    pub fn invalidate_market(&mut self, caller: UserId, id: MarketId) -> Result<()> {
        let _token = self.guard.enter()?;
        self.auth.require(caller, Capability::InvalidateMarket)?;
        let market = self.book.get(id)?;
        match market.status {
            MarketStatus::Created | MarketStatus::Validated => {}
            MarketStatus::Resolved { .. } => return Err(OpenmarketError::AlreadyResolved(id)),
            MarketStatus::Invalidated => return Err(OpenmarketError::AlreadyInvalidated(id)),
        }
        let (creator, seed) = (market.creator, market.admin_liquidity);

        if !seed.is_zero() {
            self.ledger.transfer(self.params.vault, creator, seed)?;
        }

        let market = self.book.get_mut(id)?;
        market.status = MarketStatus::Invalidated;
        market.admin_liquidity = Wad::ZERO;
        market.refundable = market.user_liquidity;
        let refundable = market.refundable;
        self.fees.unlock(id);
        info!(
            market = %id,
            by = %caller,
            seed_refunded = %seed,
            refundable = %refundable,
            "market invalidated"
        );
        self.journal.push(MarketEvent::MarketInvalidated {
            market: id,
            seed_refunded: seed,
        });
        Ok(())
    }

    /// Pay `shares × payout_per_share` for the caller's winning position.
    pub fn claim_winnings(&mut self, caller: UserId, id: MarketId) -> Result<Wad> {
        let _token = self.guard.enter()?;
        let market = self.book.get(id)?;
        let winning_option = match market.status {
            MarketStatus::Resolved { winning_option } => winning_option,
            MarketStatus::Invalidated => return Err(OpenmarketError::AlreadyInvalidated(id)),
            MarketStatus::Created | MarketStatus::Validated => {
                return Err(OpenmarketError::MarketNotResolved(id));
            }
        };
        let mut position = self.book.position(id, winning_option, caller);
        if position.claimed {
            return Err(OpenmarketError::AlreadyClaimed {
                market: id,
                user: caller,
            });
        }
        if position.shares.is_zero() {
            return Err(OpenmarketError::NoWinningShares(id));
        }
        let shares = position.shares;
        let payout = shares.checked_mul(market.payout_per_share)?;
        let claimed_shares = market.claimed_shares.checked_add(shares)?;
        let paid_out = market.paid_out.checked_add(payout)?;
        position.settle();

        self.ledger.transfer(self.params.vault, caller, payout)?;

        let market = self.book.get_mut(id)?;
        market.claimed_shares = claimed_shares;
        market.paid_out = paid_out;
        self.book.set_position(id, winning_option, caller, position);
        info!(market = %id, user = %caller, shares = %shares, payout = %payout, "winnings claimed");
        self.journal.push(MarketEvent::WinningsClaimed {
            market: id,
            user: caller,
            shares,
            payout,
        });
        Ok(payout)
    }

    /// After invalidation, return the caller's net cost basis across every
    /// option, capped by what is left in the refundable pool. Once per user.
    pub fn claim_refund(&mut self, caller: UserId, id: MarketId) -> Result<Wad> {
        let _token = self.guard.enter()?;
        let market = self.book.get(id)?;
        if market.status != MarketStatus::Invalidated {
            return Err(OpenmarketError::MarketNotInvalidated(id));
        }
        let positions = self.book.positions_of(id, caller);
        let open: Vec<_> = positions.iter().filter(|(_, p)| !p.claimed).collect();
        if open.is_empty() && !positions.is_empty() {
            return Err(OpenmarketError::AlreadyClaimed {
                market: id,
                user: caller,
            });
        }
        let basis = open
            .iter()
            .try_fold(Wad::ZERO, |acc, (_, p)| acc.checked_add(p.net_cost))?;
        let amount = basis.min(market.refundable);
        if amount.is_zero() {
            return Err(OpenmarketError::NoRefundDue(id));
        }
        let refundable = market.refundable.checked_sub(amount)?;
        let paid_out = market.paid_out.checked_add(amount)?;

        self.ledger.transfer(self.params.vault, caller, amount)?;

        let market = self.book.get_mut(id)?;
        market.refundable = refundable;
        market.paid_out = paid_out;
        for (option, mut position) in positions.into_iter().filter(|(_, p)| !p.claimed) {
            position.settle();
            self.book.set_position(id, option, caller, position);
        }
        info!(market = %id, user = %caller, amount = %amount, basis = %basis, "refund claimed");
        self.journal.push(MarketEvent::RefundClaimed {
            market: id,
            user: caller,
            amount,
        });
        Ok(amount)
    }

    /// Sweep every unlocked fee to the caller.
    pub fn withdraw_fees(&mut self, caller: UserId) -> Result<Wad> {
        let _token = self.guard.enter()?;
        self.auth.require(caller, Capability::WithdrawFees)?;
        let amount = self.fees.unlocked_total()?;
        if amount.is_zero() {
            return Err(OpenmarketError::NoFeesToWithdraw);
        }

        self.ledger.transfer(self.params.vault, caller, amount)?;

        self.fees.mark_withdrawn(amount);
        info!(collector = %caller, amount = %amount, "fees withdrawn");
        self.journal.push(MarketEvent::FeesWithdrawn {
            collector: caller,
            amount,
        });
        Ok(amount)
    }

    /// After resolution, pay the creator whatever the market holds beyond
    /// the payout still owed on unclaimed winning shares.
    pub fn withdraw_surplus(&mut self, caller: UserId, id: MarketId) -> Result<Wad> {
        let _token = self.guard.enter()?;
        let market = self.book.get(id)?;
        if caller != market.creator {
            return Err(OpenmarketError::Unauthorized {
                caller,
                capability: "MARKET_CREATOR".to_string(),
            });
        }
        let Some(winning_option) = market.winning_option() else {
            return Err(OpenmarketError::MarketNotResolved(id));
        };
        let holdings = market
            .available_liquidity()?
            .saturating_sub(market.paid_out)
            .saturating_sub(market.surplus_withdrawn);
        let unclaimed = market.options[winning_option]
            .shares
            .saturating_sub(market.claimed_shares);
        let owed = unclaimed.checked_mul(market.payout_per_share)?;
        let amount = holdings.saturating_sub(owed);
        if amount.is_zero() {
            return Err(OpenmarketError::NoSurplus(id));
        }
        let surplus_withdrawn = market.surplus_withdrawn.checked_add(amount)?;

        self.ledger.transfer(self.params.vault, caller, amount)?;

        self.book.get_mut(id)?.surplus_withdrawn = surplus_withdrawn;
        info!(market = %id, creator = %caller, amount = %amount, owed = %owed, "surplus withdrawn");
        self.journal.push(MarketEvent::SurplusWithdrawn {
            market: id,
            creator: caller,
            amount,
        });
        Ok(amount)
    }
}
