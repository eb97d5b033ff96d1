//! # openmarket-pricing
//!
//! Deterministic, side-effect-free LMSR pricing for **OpenMarket**.
//!
//! - [`transcendental`]: integer `e^-x` and `ln`
//! - [`lmsr`]: cost function, bounded softmax prices, liquidity sizing
//! - [`pricing`]: [`MarketPricing`], the per-market adapter used by the engine
//!
//! Nothing here allocates state or performs I/O; the same inputs always give
//! the same bits.

pub mod lmsr;
pub mod pricing;
pub mod transcendental;

pub use lmsr::{compute_liquidity_param, cost, probabilities, raw_probabilities};
pub use pricing::MarketPricing;
pub use transcendental::{exp_neg, ln};
