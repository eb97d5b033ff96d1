//! System-wide constants for the OpenMarket engine.
//!
//! All fixed-point values are raw [`crate::Wad`] integers (`10^18 == 1.0`).

use crate::fixed::WAD;

/// Minimum number of outcomes in a market.
pub const MIN_OUTCOMES: usize = 2;

/// Maximum number of outcomes in a market.
pub const MAX_OUTCOMES: usize = 10;

/// No outcome is ever priced above 95%.
pub const PRICE_CAP: u128 = 95 * WAD / 100;

/// No outcome is ever priced below 1e-12.
pub const PRICE_FLOOR: u128 = 1_000_000;

/// Allowed drift of Σ prices from `WAD`, in parts per million.
pub const PRICE_SUM_TOLERANCE_PPM: u128 = 10;

/// `e^-x` is returned as exactly zero for `x` at or above 80.
pub const EXP_NEG_SATURATION: u128 = 80 * WAD;

/// ln(2) to 18 decimals.
pub const LN_2: u128 = 693_147_180_559_945_309;

/// Fraction of seeded liquidity the worst-case market-maker loss may use.
pub const LIQUIDITY_COVERAGE_RATIO: u128 = 90 * WAD / 100;

/// Lower clamp for the liquidity parameter `b` (1 share).
pub const MIN_LIQUIDITY_PARAM: u128 = WAD;

/// Upper clamp for the liquidity parameter `b` (1e9 shares).
pub const MAX_LIQUIDITY_PARAM: u128 = 1_000_000_000 * WAD;

/// Largest quantity accepted in a single trade (1e12 shares).
pub const MAX_TRADE_QUANTITY: u128 = 1_000_000_000_000 * WAD;

/// Default trading fee (2%).
pub const DEFAULT_FEE_RATE: &str = "0.02";

/// Highest fee rate a deployment may configure (10%).
pub const MAX_FEE_RATE: &str = "0.1";

/// Default payout per winning share (1 token).
pub const DEFAULT_PAYOUT_PER_SHARE: &str = "1";

/// Default minimum seed liquidity (100 tokens).
pub const DEFAULT_MIN_INITIAL_LIQUIDITY: &str = "100";

/// Shortest allowed trading window (1 hour).
pub const DEFAULT_MIN_DURATION_SECS: i64 = 3_600;

/// Longest allowed trading window (365 days).
pub const DEFAULT_MAX_DURATION_SECS: i64 = 365 * 24 * 3_600;

/// Cool-down from creation before an early-resolution market may resolve.
pub const DEFAULT_EARLY_RESOLUTION_COOLDOWN_SECS: i64 = 3_600;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "OpenMarket";
