//! Integration test: full market lifecycle
//!
//! CREATE → VALIDATE → TRADE → RESOLVE | INVALIDATE → CLAIM → WITHDRAW
//!
//! Drives the engine through its public API with the in-memory token ledger
//! and role registry, checking balances, prices, and events at each step.

use std::sync::Arc;

use chrono::{Duration, Utc};
use openmarket_custody::{Capability, InMemoryLedger, RoleRegistry, TokenLedger};
use openmarket_engine::{ManualClock, MarketEngine, ReentrancyGuard};
use openmarket_types::*;

fn units(v: u64) -> Wad {
    Wad::from_units(v)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn sum(values: &[Wad]) -> Wad {
    values
        .iter()
        .fold(Wad::ZERO, |acc, v| acc.checked_add(*v).unwrap())
}

/// Engine plus the accounts a scenario needs.
struct Harness<L: TokenLedger> {
    engine: MarketEngine<L, RoleRegistry>,
    clock: Arc<ManualClock>,
    vault: UserId,
    admin: UserId,
    creator: UserId,
    alice: UserId,
    bob: UserId,
}

const FUNDING: u64 = 1_000_000;

fn funded_ledger(vault: UserId, accounts: &[UserId]) -> InMemoryLedger {
    let mut ledger = InMemoryLedger::new();
    for account in accounts {
        ledger.mint(*account, units(FUNDING)).unwrap();
        ledger.approve(*account, vault, units(FUNDING));
    }
    ledger
}

fn harness_with(require_validation: bool) -> Harness<InMemoryLedger> {
    init_tracing();
    let (vault, admin, creator, alice, bob) = (
        UserId::new(),
        UserId::new(),
        UserId::new(),
        UserId::new(),
        UserId::new(),
    );
    let mut config = EngineConfig::with_vault(vault);
    config.require_validation = require_validation;

    let ledger = funded_ledger(vault, &[creator, alice, bob]);
    let mut roles = RoleRegistry::new();
    roles.grant_all(admin);
    roles.grant(creator, Capability::CreateMarket);

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let engine = MarketEngine::new(config, ledger, roles, clock.clone()).unwrap();
    Harness {
        engine,
        clock,
        vault,
        admin,
        creator,
        alice,
        bob,
    }
}

fn harness() -> Harness<InMemoryLedger> {
    harness_with(true)
}

impl<L: TokenLedger> Harness<L> {
    fn open_market(&mut self, outcomes: usize, seed: u64) -> MarketId {
        let id = self
            .engine
            .create_market(self.creator, NewMarket::dummy(outcomes, units(seed)))
            .unwrap();
        if self.engine.market(id).unwrap().status == MarketStatus::Created {
            self.engine.validate_market(self.admin, id).unwrap();
        }
        id
    }

    fn buy(&mut self, who: UserId, id: MarketId, option: usize, qty: u64) -> TradeReceipt {
        self.engine
            .buy_shares(who, id, option, units(qty), BuyLimits::none())
            .unwrap()
    }

    /// Vault holds seed + net user liquidity + fees, minus everything paid out.
    fn assert_vault_conserved(&self) {
        let mut expected = Wad::ZERO;
        for i in 0..self.engine.market_count() {
            let m = self.engine.market(MarketId(i as u64)).unwrap();
            expected = expected
                .checked_add(m.admin_liquidity)
                .unwrap()
                .checked_add(m.user_liquidity)
                .unwrap()
                .checked_sub(m.paid_out)
                .unwrap()
                .checked_sub(m.surplus_withdrawn)
                .unwrap()
                .checked_add(self.engine.fee_entry(m.id).collected)
                .unwrap();
        }
        let fees_out = self.engine.ledger().balance_of(self.admin);
        assert_eq!(
            self.engine.ledger().balance_of(self.vault),
            expected.checked_sub(fees_out).unwrap()
        );
    }
}

// =========================================================================
// Two-outcome market, resolved
// =========================================================================

#[test]
fn two_outcome_market_full_cycle() {
    let mut h = harness();

    // =====================================================================
    // CREATE + VALIDATE
    // =====================================================================
    let id = h
        .engine
        .create_market(h.creator, NewMarket::dummy(2, units(1_000)))
        .unwrap();
    assert_eq!(h.engine.market_phase(id).unwrap(), MarketPhase::Created);
    assert_eq!(
        h.engine.market_odds(id).unwrap(),
        vec![Wad::from_ratio(1, 2), Wad::from_ratio(1, 2)]
    );
    let b = h.engine.market(id).unwrap().liquidity_param;
    assert!(b > units(1_298) && b < units(1_299), "b = {b}");
    assert_eq!(
        h.engine.ledger().balance_of(h.creator),
        units(FUNDING - 1_000)
    );

    let err = h.buy_err(h.alice, id, 0, 10);
    assert_eq!(err, OpenmarketError::MarketNotValidated(id));

    h.engine.validate_market(h.admin, id).unwrap();
    assert_eq!(h.engine.market_phase(id).unwrap(), MarketPhase::Active);
    assert_eq!(
        h.engine.validate_market(h.admin, id).unwrap_err(),
        OpenmarketError::AlreadyValidated(id)
    );

    // =====================================================================
    // TRADE
    // =====================================================================
    let alice_buy = h.buy(h.alice, id, 0, 100);
    assert!(alice_buy.quote.raw > units(50) && alice_buy.quote.raw < units(52));
    assert!(alice_buy.new_price > Wad::from_ratio(1, 2));
    assert_eq!(
        alice_buy.quote.fee,
        alice_buy.quote.raw.checked_mul(Wad::from_ratio(2, 100)).unwrap()
    );
    let p0 = h.engine.current_price(id, 0).unwrap();
    let p1 = h.engine.current_price(id, 1).unwrap();
    assert!(p0 > p1);
    assert_eq!(sum(&h.engine.market_odds(id).unwrap()), Wad::ONE);

    h.buy(h.bob, id, 1, 50);
    h.assert_vault_conserved();

    // =====================================================================
    // RESOLVE
    // =====================================================================
    assert_eq!(
        h.engine.resolve_market(h.admin, id, 0).unwrap_err(),
        OpenmarketError::ResolutionTooEarly(id)
    );
    assert_eq!(
        h.engine.withdraw_fees(h.admin).unwrap_err(),
        OpenmarketError::NoFeesToWithdraw
    );
    h.clock.advance(Duration::days(8));
    assert_eq!(h.engine.market_phase(id).unwrap(), MarketPhase::Closed);
    h.engine.resolve_market(h.admin, id, 0).unwrap();
    assert_eq!(h.engine.market_phase(id).unwrap(), MarketPhase::Resolved);
    assert_eq!(
        h.engine.resolve_market(h.admin, id, 1).unwrap_err(),
        OpenmarketError::AlreadyResolved(id)
    );

    // =====================================================================
    // CLAIM
    // =====================================================================
    let before = h.engine.ledger().balance_of(h.alice);
    let payout = h.engine.claim_winnings(h.alice, id).unwrap();
    assert_eq!(payout, units(100));
    assert_eq!(
        h.engine.ledger().balance_of(h.alice),
        before.checked_add(units(100)).unwrap()
    );
    assert!(matches!(
        h.engine.claim_winnings(h.alice, id).unwrap_err(),
        OpenmarketError::AlreadyClaimed { .. }
    ));
    assert_eq!(
        h.engine.claim_winnings(h.bob, id).unwrap_err(),
        OpenmarketError::NoWinningShares(id)
    );

    // =====================================================================
    // WITHDRAW
    // =====================================================================
    let fees = h.engine.withdraw_fees(h.admin).unwrap();
    let entry = h.engine.fee_entry(id);
    assert_eq!(fees, entry.collected);
    assert_eq!(entry.withdrawn, entry.collected);
    assert_eq!(
        h.engine.withdraw_fees(h.admin).unwrap_err(),
        OpenmarketError::NoFeesToWithdraw
    );

    assert!(matches!(
        h.engine.withdraw_surplus(h.alice, id).unwrap_err(),
        OpenmarketError::Unauthorized { .. }
    ));
    let surplus = h.engine.withdraw_surplus(h.creator, id).unwrap();
    let market = h.engine.market(id).unwrap();
    assert_eq!(
        surplus,
        units(1_000)
            .checked_add(market.user_liquidity)
            .unwrap()
            .checked_sub(units(100))
            .unwrap()
    );
    assert_eq!(
        h.engine.withdraw_surplus(h.creator, id).unwrap_err(),
        OpenmarketError::NoSurplus(id)
    );
    h.assert_vault_conserved();

    // Only fees already withdrawn and nothing else remain.
    assert_eq!(h.engine.ledger().balance_of(h.vault), Wad::ZERO);

    let kinds: Vec<&str> = h
        .engine
        .drain_events()
        .iter()
        .map(|e| match e {
            MarketEvent::MarketCreated { .. } => "created",
            MarketEvent::MarketValidated { .. } => "validated",
            MarketEvent::SharesBought(_) => "bought",
            MarketEvent::SharesSold(_) => "sold",
            MarketEvent::MarketResolved { .. } => "resolved",
            MarketEvent::MarketInvalidated { .. } => "invalidated",
            MarketEvent::WinningsClaimed { .. } => "claimed",
            MarketEvent::RefundClaimed { .. } => "refunded",
            MarketEvent::FeesWithdrawn { .. } => "fees",
            MarketEvent::SurplusWithdrawn { .. } => "surplus",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "created", "validated", "bought", "bought", "resolved", "claimed", "fees", "surplus"
        ]
    );
}

impl<L: TokenLedger> Harness<L> {
    fn buy_err(&mut self, who: UserId, id: MarketId, option: usize, qty: u64) -> OpenmarketError {
        self.engine
            .buy_shares(who, id, option, units(qty), BuyLimits::none())
            .unwrap_err()
    }
}

// =========================================================================
// Five-outcome market under extreme imbalance
// =========================================================================

#[test]
fn five_outcome_extreme_buy_respects_cap_and_floor() {
    let mut h = harness_with(false);
    let id = h.open_market(5, 1_000);
    for p in h.engine.market_odds(id).unwrap() {
        assert!(p.raw().abs_diff(Wad::from_ratio(1, 5).raw()) <= 1);
    }

    let receipt = h.buy(h.alice, id, 0, 10_000);
    // Cost ≈ 10000 - b·ln 5 = 9100.
    assert!(receipt.quote.raw > units(9_099) && receipt.quote.raw < units(9_101));

    let odds = h.engine.market_odds(id).unwrap();
    assert_eq!(sum(&odds), Wad::ONE);
    assert!(odds[0].raw() <= constants::PRICE_CAP);
    assert!(odds[0] > Wad::from_ratio(9, 10));
    for p in &odds[1..] {
        assert!(p.raw() >= constants::PRICE_FLOOR);
        // The capped excess is split evenly: ≈ 0.0125 each.
        assert!(p.raw().abs_diff(Wad::from_ratio(125, 10_000).raw()) <= 100);
    }

    let market = h.engine.market(id).unwrap();
    assert!(units(10_000) <= market.available_liquidity().unwrap());
}

// =========================================================================
// Round trip
// =========================================================================

#[test]
fn buy_then_sell_loses_about_two_fees() {
    let mut h = harness_with(false);
    let id = h.open_market(2, 1_000);
    let start = h.engine.ledger().balance_of(h.alice);

    let buy = h.buy(h.alice, id, 0, 100);
    let sell = h
        .engine
        .sell_shares(h.alice, id, 0, units(100), SellLimits::none())
        .unwrap();

    let end = h.engine.ledger().balance_of(h.alice);
    let loss = start.checked_sub(end).unwrap();
    let fees = buy.quote.fee.checked_add(sell.quote.fee).unwrap();
    assert!(loss >= fees);
    assert!(loss.raw() - fees.raw() <= 10, "loss {loss} fees {fees}");

    // The book is back where it started.
    assert_eq!(
        h.engine.market_odds(id).unwrap(),
        vec![Wad::from_ratio(1, 2), Wad::from_ratio(1, 2)]
    );
    assert!(h.engine.market(id).unwrap().user_liquidity.raw() <= 10);
    let position = h.engine.position(id, 0, h.alice);
    assert_eq!(position.shares, Wad::ZERO);
    assert_eq!(position.net_cost, Wad::ZERO);
    h.assert_vault_conserved();
}

// =========================================================================
// Invalidation and refunds
// =========================================================================

#[test]
fn invalidated_market_refunds_seed_and_cost_basis() {
    let mut h = harness_with(false);
    let id = h.open_market(3, 500);
    let alice_buy = h.buy(h.alice, id, 0, 40);
    h.buy(h.alice, id, 2, 10);
    let bob_buy = h.buy(h.bob, id, 1, 25);

    let creator_before = h.engine.ledger().balance_of(h.creator);
    h.engine.invalidate_market(h.admin, id).unwrap();
    assert_eq!(
        h.engine.ledger().balance_of(h.creator),
        creator_before.checked_add(units(500)).unwrap()
    );
    assert_eq!(h.engine.market_phase(id).unwrap(), MarketPhase::Invalidated);
    assert_eq!(
        h.engine.invalidate_market(h.admin, id).unwrap_err(),
        OpenmarketError::AlreadyInvalidated(id)
    );

    let refund = h.engine.claim_refund(h.bob, id).unwrap();
    assert_eq!(refund, bob_buy.quote.raw);

    let alice_basis = h.engine.position(id, 0, h.alice).net_cost;
    assert_eq!(alice_basis, alice_buy.quote.raw);
    let refund = h.engine.claim_refund(h.alice, id).unwrap();
    assert!(refund > alice_basis);
    assert!(matches!(
        h.engine.claim_refund(h.alice, id).unwrap_err(),
        OpenmarketError::AlreadyClaimed { .. }
    ));
    assert_eq!(
        h.engine.claim_refund(h.creator, id).unwrap_err(),
        OpenmarketError::NoRefundDue(id)
    );
    assert_eq!(
        h.engine.claim_winnings(h.alice, id).unwrap_err(),
        OpenmarketError::AlreadyInvalidated(id)
    );
    assert_eq!(h.engine.market(id).unwrap().refundable, Wad::ZERO);

    // Fees unlock on invalidation.
    let fees = h.engine.withdraw_fees(h.admin).unwrap();
    assert_eq!(fees, h.engine.fee_entry(id).collected);
    h.assert_vault_conserved();
    assert_eq!(h.engine.ledger().balance_of(h.vault), Wad::ZERO);
}

#[test]
fn refund_requires_invalidation() {
    let mut h = harness_with(false);
    let id = h.open_market(2, 500);
    h.buy(h.alice, id, 0, 5);
    assert_eq!(
        h.engine.claim_refund(h.alice, id).unwrap_err(),
        OpenmarketError::MarketNotInvalidated(id)
    );
    h.clock.advance(Duration::days(8));
    h.engine.resolve_market(h.admin, id, 1).unwrap();
    assert_eq!(
        h.engine.invalidate_market(h.admin, id).unwrap_err(),
        OpenmarketError::AlreadyResolved(id)
    );
}

// =========================================================================
// Resolution timing
// =========================================================================

#[test]
fn early_resolution_waits_for_cooldown() {
    let mut h = harness_with(false);
    let mut request = NewMarket::dummy(2, units(1_000));
    request.early_resolution_allowed = true;
    let id = h.engine.create_market(h.creator, request).unwrap();

    h.clock.advance(Duration::minutes(30));
    assert_eq!(
        h.engine.resolve_market(h.admin, id, 0).unwrap_err(),
        OpenmarketError::ResolutionTooEarly(id)
    );
    h.clock.advance(Duration::minutes(30));
    h.engine.resolve_market(h.admin, id, 0).unwrap();
    // Trading is closed once resolved, even inside the window.
    assert_eq!(
        h.buy_err(h.alice, id, 0, 1),
        OpenmarketError::AlreadyResolved(id)
    );
}

#[test]
fn resolution_rejects_bad_option_and_unvalidated_market() {
    let mut h = harness();
    let id = h
        .engine
        .create_market(h.creator, NewMarket::dummy(2, units(1_000)))
        .unwrap();
    h.clock.advance(Duration::days(8));
    assert_eq!(
        h.engine.resolve_market(h.admin, id, 0).unwrap_err(),
        OpenmarketError::MarketNotValidated(id)
    );
    h.engine.validate_market(h.admin, id).unwrap();
    assert!(matches!(
        h.engine.resolve_market(h.admin, id, 2).unwrap_err(),
        OpenmarketError::InvalidOption { .. }
    ));
}

// =========================================================================
// Creation checks
// =========================================================================

#[test]
fn create_market_validates_request() {
    let mut h = harness();

    assert!(matches!(
        h.engine
            .create_market(h.alice, NewMarket::dummy(2, units(1_000)))
            .unwrap_err(),
        OpenmarketError::Unauthorized { .. }
    ));
    assert!(matches!(
        h.engine
            .create_market(h.creator, NewMarket::dummy(1, units(1_000)))
            .unwrap_err(),
        OpenmarketError::InvalidOutcomeCount { .. }
    ));
    assert!(matches!(
        h.engine
            .create_market(h.creator, NewMarket::dummy(11, units(1_000)))
            .unwrap_err(),
        OpenmarketError::InvalidOutcomeCount { .. }
    ));

    let mut mismatched = NewMarket::dummy(3, units(1_000));
    mismatched.metadata.option_descriptions.pop();
    assert_eq!(
        h.engine.create_market(h.creator, mismatched).unwrap_err(),
        OpenmarketError::LengthMismatch {
            expected: 3,
            actual: 2
        }
    );

    let mut short = NewMarket::dummy(2, units(1_000));
    short.duration_secs = 60;
    assert!(matches!(
        h.engine.create_market(h.creator, short).unwrap_err(),
        OpenmarketError::InvalidDuration { .. }
    ));

    assert!(matches!(
        h.engine
            .create_market(h.creator, NewMarket::dummy(2, units(99)))
            .unwrap_err(),
        OpenmarketError::InsufficientLiquidity { .. }
    ));

    assert_eq!(h.engine.market_count(), 0);
    assert!(h.engine.events().is_empty());
    assert_eq!(h.engine.ledger().balance_of(h.creator), units(FUNDING));
}

#[test]
fn thin_seed_rejected_by_liquidity_sizing() {
    init_tracing();
    let vault = UserId::new();
    let creator = UserId::new();
    let json = format!(r#"{{ "vault": "{vault}", "min_initial_liquidity": "0" }}"#);
    let config = EngineConfig::from_json_str(&json).unwrap();
    let mut roles = RoleRegistry::new();
    roles.grant(creator, Capability::CreateMarket);
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let mut engine =
        MarketEngine::new(config, funded_ledger(vault, &[creator]), roles, clock).unwrap();

    let err = engine
        .create_market(creator, NewMarket::dummy(2, Wad::from_ratio(1, 2)))
        .unwrap_err();
    assert!(matches!(err, OpenmarketError::InsufficientLiquidity { .. }));
}

// =========================================================================
// Reentrancy
// =========================================================================

/// Ledger that tries to re-enter the engine from inside every transfer.
struct HookedLedger {
    inner: InMemoryLedger,
    engine_guard: Option<Arc<ReentrancyGuard>>,
}

impl HookedLedger {
    fn call_back(&self) -> Result<()> {
        if let Some(guard) = &self.engine_guard {
            let _token = guard.enter()?;
        }
        Ok(())
    }
}

impl TokenLedger for HookedLedger {
    fn balance_of(&self, account: UserId) -> Wad {
        self.inner.balance_of(account)
    }

    fn transfer(&mut self, from: UserId, to: UserId, amount: Wad) -> Result<()> {
        self.call_back()?;
        self.inner.transfer(from, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: UserId,
        owner: UserId,
        to: UserId,
        amount: Wad,
    ) -> Result<()> {
        self.call_back()?;
        self.inner.transfer_from(spender, owner, to, amount)
    }
}

#[test]
fn ledger_callback_cannot_reenter() {
    init_tracing();
    let (vault, creator, alice) = (UserId::new(), UserId::new(), UserId::new());
    let mut config = EngineConfig::with_vault(vault);
    config.require_validation = false;
    let ledger = HookedLedger {
        inner: funded_ledger(vault, &[creator, alice]),
        engine_guard: None,
    };
    let mut roles = RoleRegistry::new();
    roles.grant(creator, Capability::CreateMarket);
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let mut engine = MarketEngine::new(config, ledger, roles, clock).unwrap();

    let id = engine
        .create_market(creator, NewMarket::dummy(2, units(1_000)))
        .unwrap();
    let root = engine.state_root(id).unwrap();
    engine.drain_events();

    let guard = engine.reentrancy_guard();
    engine.ledger_mut().engine_guard = Some(guard);

    let err = engine
        .buy_shares(alice, id, 0, units(10), BuyLimits::none())
        .unwrap_err();
    assert_eq!(err, OpenmarketError::ReentrantCall);
    assert_eq!(engine.state_root(id).unwrap(), root);
    assert!(engine.events().is_empty());
    assert!(!engine.reentrancy_guard().is_entered());

    // With the hook removed the same trade goes through.
    engine.ledger_mut().engine_guard = None;
    engine
        .buy_shares(alice, id, 0, units(10), BuyLimits::none())
        .unwrap();
}

// =========================================================================
// Determinism
// =========================================================================

#[test]
fn replicas_agree_on_state_root() {
    init_tracing();
    let vault = UserId::from_bytes([1; 16]);
    let creator = UserId::from_bytes([2; 16]);
    let trader = UserId::from_bytes([3; 16]);
    let start = Utc::now();

    let run = || {
        let mut config = EngineConfig::with_vault(vault);
        config.require_validation = false;
        let mut roles = RoleRegistry::new();
        roles.grant(creator, Capability::CreateMarket);
        let clock = Arc::new(ManualClock::new(start));
        let mut engine =
            MarketEngine::new(config, funded_ledger(vault, &[creator, trader]), roles, clock)
                .unwrap();
        let id = engine
            .create_market(creator, NewMarket::dummy(4, units(2_000)))
            .unwrap();
        for (option, qty) in [(0, 30), (3, 12), (1, 7), (0, 50)] {
            engine
                .buy_shares(trader, id, option, units(qty), BuyLimits::none())
                .unwrap();
        }
        engine
            .sell_shares(trader, id, 0, units(20), SellLimits::none())
            .unwrap();
        engine.state_root(id).unwrap()
    };

    assert_eq!(run(), run());
}
