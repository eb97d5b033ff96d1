//! # openmarket-types
//!
//! Shared types, errors, and configuration for the **OpenMarket** LMSR
//! prediction-market engine.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Fixed point**: [`Wad`] (18 decimals over `u128`), [`mul_div`] with a 256-bit intermediate
//! - **Identifiers**: [`MarketId`], [`UserId`], [`TradeId`]
//! - **Market model**: [`Market`], [`OptionState`], [`MarketStatus`], [`MarketPhase`], [`MarketMetadata`], [`NewMarket`]
//! - **Positions and fees**: [`UserPosition`], [`FeeEntry`]
//! - **Trades**: [`Quote`], [`BuyLimits`], [`SellLimits`], [`TradeReceipt`], [`TradeSide`]
//! - **Events**: [`MarketEvent`]
//! - **Configuration**: [`EngineConfig`], [`EngineParams`]
//! - **Errors**: [`OpenmarketError`] with `OMK_ERR_` prefix codes
//! - **Constants**: price bounds, outcome limits, and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod fee;
pub mod fixed;
pub mod ids;
pub mod market;
pub mod position;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use openmarket_types::{Market, Wad, Quote, ...};

pub use config::*;
pub use error::*;
pub use event::*;
pub use fee::*;
pub use fixed::*;
pub use ids::*;
pub use market::*;
pub use position::*;
pub use trade::*;

// Constants are accessed via `openmarket_types::constants::FOO`
// (not re-exported to avoid name collisions).
