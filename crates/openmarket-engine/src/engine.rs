//! The market engine: state, collaborators, and the read-only query façade.
//!
//! Mutations live in [`crate::trading`] and [`crate::lifecycle`]. Every one
//! of them takes `&mut self` and follows the same discipline:
//!
//! 1. take the reentrancy guard
//! 2. run every check
//! 3. stage the new state on copies and validate it
//! 4. perform the single external token transfer
//! 5. commit the staged state (infallible) and append the event
//!
//! A failure at any step before 5 leaves the engine untouched.

use std::sync::Arc;

use openmarket_custody::{Authorizer, TokenLedger};
use openmarket_pricing::MarketPricing;
use openmarket_types::{
    EngineConfig, EngineParams, FeeEntry, Market, MarketEvent, MarketId, MarketPhase, Quote,
    Result, TradeId, UserId, UserPosition, Wad,
};
use tracing::{debug, info};

use crate::book::MarketBook;
use crate::clock::Clock;
use crate::digest;
use crate::fee_ledger::FeeLedger;
use crate::guard::ReentrancyGuard;
use crate::journal::EventJournal;

/// Single-writer LMSR market engine over a token ledger `L` and an
/// authorizer `A`.
pub struct MarketEngine<L: TokenLedger, A: Authorizer> {
    pub(crate) config: EngineConfig,
    pub(crate) params: EngineParams,
    pub(crate) book: MarketBook,
    pub(crate) fees: FeeLedger,
    pub(crate) ledger: L,
    pub(crate) auth: A,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) guard: Arc<ReentrancyGuard>,
    pub(crate) journal: EventJournal,
    pub(crate) last_trade_id: TradeId,
}

impl<L: TokenLedger, A: Authorizer> MarketEngine<L, A> {
    /// Build an engine. Fails if `config` does not validate.
    pub fn new(config: EngineConfig, ledger: L, auth: A, clock: Arc<dyn Clock>) -> Result<Self> {
        let params = config.params()?;
        info!(
            vault = %params.vault,
            fee_rate = %params.fee_rate,
            payout_per_share = %params.payout_per_share,
            require_validation = params.require_validation,
            "market engine started"
        );
        Ok(Self {
            config,
            params,
            book: MarketBook::new(),
            fees: FeeLedger::new(),
            ledger,
            auth,
            clock,
            guard: Arc::new(ReentrancyGuard::new()),
            journal: EventJournal::new(),
            last_trade_id: TradeId(0),
        })
    }

    // -----------------------------------------------------------------------
    // Collaborators and configuration
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    #[must_use]
    pub fn authorizer(&self) -> &A {
        &self.auth
    }

    pub fn authorizer_mut(&mut self) -> &mut A {
        &mut self.auth
    }

    /// Shared handle to the reentrancy guard, for collaborators that need
    /// to detect or attempt re-entry.
    #[must_use]
    pub fn reentrancy_guard(&self) -> Arc<ReentrancyGuard> {
        Arc::clone(&self.guard)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn market(&self, id: MarketId) -> Result<&Market> {
        self.book.get(id)
    }

    #[must_use]
    pub fn market_count(&self) -> usize {
        self.book.len()
    }

    pub fn market_phase(&self, id: MarketId) -> Result<MarketPhase> {
        Ok(self.book.get(id)?.phase(self.clock.now()))
    }

    /// Committed marginal price of one option.
    pub fn current_price(&self, id: MarketId, option: usize) -> Result<Wad> {
        let market = self.book.get(id)?;
        market.check_option(option)?;
        Ok(market.options[option].last_price)
    }

    /// Committed price vector, summing to one.
    pub fn market_odds(&self, id: MarketId) -> Result<Vec<Wad>> {
        Ok(self.book.get(id)?.prices())
    }

    #[must_use]
    pub fn position(&self, id: MarketId, option: usize, user: UserId) -> UserPosition {
        self.book.position(id, option, user)
    }

    #[must_use]
    pub fn fee_entry(&self, id: MarketId) -> FeeEntry {
        self.fees.entry(id)
    }

    /// Fees the collector could withdraw right now.
    pub fn unlocked_fees(&self) -> Result<Wad> {
        self.fees.unlocked_total()
    }

    pub fn quote_buy(&self, id: MarketId, option: usize, quantity: Wad) -> Result<Quote> {
        let market = self.book.get(id)?;
        let quote = self.price_buy(market, option, quantity)?;
        debug!(market = %id, option, quantity = %quantity, total = %quote.total, "buy quote");
        Ok(quote)
    }

    pub fn quote_sell(&self, id: MarketId, option: usize, quantity: Wad) -> Result<Quote> {
        let market = self.book.get(id)?;
        let quote = self.price_sell(market, option, quantity)?;
        debug!(market = %id, option, quantity = %quantity, total = %quote.total, "sell quote");
        Ok(quote)
    }

    /// Digest of a market's pricing and payout state.
    pub fn state_root(&self, id: MarketId) -> Result<[u8; 32]> {
        let root = digest::compute_state_root(self.book.get(id)?);
        debug!(market = %id, root = %digest::root_hex(&root), "state root");
        Ok(root)
    }

    /// Events not yet drained.
    #[must_use]
    pub fn events(&self) -> &[MarketEvent] {
        self.journal.events()
    }

    pub fn drain_events(&mut self) -> Vec<MarketEvent> {
        self.journal.drain()
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    pub(crate) fn pricing(market: &Market) -> Result<MarketPricing> {
        MarketPricing::new(market.liquidity_param, market.outcome_count())
    }

    pub(crate) fn next_trade_id(&mut self) -> TradeId {
        self.last_trade_id = self.last_trade_id.next();
        self.last_trade_id
    }
}
