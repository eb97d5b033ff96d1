//! # openmarket-engine
//!
//! The stateful core of **OpenMarket**: a single-writer engine that runs
//! LMSR prediction markets end to end.
//!
//! - [`MarketEngine`]: market state plus the query façade
//! - [`trading`]: `buy_shares` / `sell_shares` with slippage bounds
//! - [`lifecycle`]: create, validate, resolve, invalidate, claims, fee and
//!   surplus withdrawal
//! - [`fee_ledger`]: per-market fee locks
//! - [`solvency`]: the worst-case payout check applied to every trade
//! - [`guard`]: the reentrancy guard held across every mutation
//! - [`digest`]: SHA-256 state roots for cross-replica checks
//!
//! ## Invariants (after every committed mutation)
//!
//! - Committed prices of a market sum to exactly one, each within
//!   `[1e-12, 0.95]`.
//! - `b` never changes after creation.
//! - `max_i(q_i) × payout ≤ admin_liquidity + user_liquidity` while trading.
//! - A failed operation changes nothing and emits no event.

pub mod book;
pub mod clock;
pub mod digest;
pub mod engine;
pub mod fee_ledger;
pub mod guard;
pub mod journal;
pub mod lifecycle;
pub mod solvency;
pub mod trading;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::MarketEngine;
pub use guard::{GuardToken, ReentrancyGuard};
