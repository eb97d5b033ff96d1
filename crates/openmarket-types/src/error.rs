//! Error types for the OpenMarket engine.
//!
//! All errors use the `OMK_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by failure kind:
//! - 1xx: Invalid argument
//! - 2xx: Not ready (wrong lifecycle phase or too early)
//! - 3xx: Already terminal (resolved, claimed, invalidated)
//! - 4xx: Authorization
//! - 5xx: Economic (slippage, solvency, liquidity, fees)
//! - 6xx: Custody / token ledger
//! - 7xx: Configuration
//! - 9xx: Internal invariant (always fatal)

use std::fmt;

use thiserror::Error;

use crate::{MarketId, UserId, Wad};

/// Central error enum for all OpenMarket operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenmarketError {
    // =================================================================
    // Invalid Argument (1xx)
    // =================================================================
    /// Generic malformed input.
    #[error("OMK_ERR_100: Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The market id does not exist.
    #[error("OMK_ERR_101: Market not found: {0}")]
    MarketNotFound(MarketId),

    /// The option index is outside `0..outcome_count`.
    #[error("OMK_ERR_102: Invalid option {option} for market with {outcome_count} outcomes")]
    InvalidOption { option: usize, outcome_count: usize },

    /// Trade quantity must be strictly positive.
    #[error("OMK_ERR_103: Quantity must be greater than zero")]
    ZeroQuantity,

    /// Outcome count outside the supported `[2, 10]` range.
    #[error("OMK_ERR_104: Invalid outcome count {count}: must be between {min} and {max}")]
    InvalidOutcomeCount { count: usize, min: usize, max: usize },

    /// Two arrays that must be parallel have different lengths.
    #[error("OMK_ERR_105: Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Market duration outside the configured bounds.
    #[error("OMK_ERR_106: Invalid duration {secs}s: must be between {min}s and {max}s")]
    InvalidDuration { secs: i64, min: i64, max: i64 },

    /// A transcendental function was called outside its domain (e.g. `ln(0)`).
    #[error("OMK_ERR_107: Math domain error: {reason}")]
    MathDomain { reason: String },

    /// The liquidity parameter `b` is zero or otherwise unusable.
    #[error("OMK_ERR_108: Invalid liquidity parameter: {0}")]
    InvalidLiquidityParam(Wad),

    // =================================================================
    // Not Ready (2xx)
    // =================================================================
    /// Market has not passed the validation gate yet.
    #[error("OMK_ERR_200: Market {0} has not been validated")]
    MarketNotValidated(MarketId),

    /// The trading window has not opened yet.
    #[error("OMK_ERR_201: Trading has not started for market {0}")]
    TradingNotStarted(MarketId),

    /// The trading window has ended.
    #[error("OMK_ERR_202: Trading window closed for market {0}")]
    TradingClosed(MarketId),

    /// Resolution attempted before the window ended or the cool-down passed.
    #[error("OMK_ERR_203: Too early to resolve market {0}")]
    ResolutionTooEarly(MarketId),

    /// Claim attempted before resolution.
    #[error("OMK_ERR_204: Market {0} is not resolved")]
    MarketNotResolved(MarketId),

    /// Refund attempted on a market that was not invalidated.
    #[error("OMK_ERR_205: Market {0} is not invalidated")]
    MarketNotInvalidated(MarketId),

    // =================================================================
    // Already Terminal (3xx)
    // =================================================================
    /// Market was already resolved.
    #[error("OMK_ERR_300: Market {0} already resolved")]
    AlreadyResolved(MarketId),

    /// Market was already invalidated.
    #[error("OMK_ERR_301: Market {0} already invalidated")]
    AlreadyInvalidated(MarketId),

    /// Market was already validated.
    #[error("OMK_ERR_302: Market {0} already validated")]
    AlreadyValidated(MarketId),

    /// This user already claimed from this market.
    #[error("OMK_ERR_303: Already claimed from market {market} by {user}")]
    AlreadyClaimed { market: MarketId, user: UserId },

    // =================================================================
    // Authorization (4xx)
    // =================================================================
    /// The caller lacks the capability required by this operation.
    #[error("OMK_ERR_400: Unauthorized: {caller} lacks {capability}")]
    Unauthorized { caller: UserId, capability: String },

    // =================================================================
    // Economic (5xx)
    // =================================================================
    /// Average price or total cost exceeds the caller's bound.
    #[error("OMK_ERR_500: Slippage exceeded: {reason}")]
    SlippageExceeded { reason: String },

    /// Sell proceeds round to zero.
    #[error("OMK_ERR_501: Price too low: proceeds round to zero")]
    PriceTooLow,

    /// The trade would leave the market unable to pay every outcome.
    #[error("OMK_ERR_502: Solvency violation: liability {liability} exceeds available {available}")]
    InsufficientSolvency { liability: Wad, available: Wad },

    /// Seeded liquidity cannot cover the worst-case loss for the derived `b`.
    #[error("OMK_ERR_503: Insufficient liquidity: required {required}, provided {provided}")]
    InsufficientLiquidity { required: Wad, provided: Wad },

    /// Seller does not hold enough shares.
    #[error("OMK_ERR_504: Insufficient shares: need {needed}, have {available}")]
    InsufficientShares { needed: Wad, available: Wad },

    /// Nothing newly unlocked for the fee collector.
    #[error("OMK_ERR_505: No unlocked fees to withdraw")]
    NoFeesToWithdraw,

    /// Caller holds no shares of the winning outcome.
    #[error("OMK_ERR_506: No winning shares in market {0}")]
    NoWinningShares(MarketId),

    /// Caller has no cost basis to refund on an invalidated market.
    #[error("OMK_ERR_507: No refund due in market {0}")]
    NoRefundDue(MarketId),

    /// Nothing left above outstanding liability for the creator.
    #[error("OMK_ERR_508: No surplus available in market {0}")]
    NoSurplus(MarketId),

    // =================================================================
    // Custody (6xx)
    // =================================================================
    /// Token balance too small for a transfer.
    #[error("OMK_ERR_600: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Wad, available: Wad },

    /// Spender allowance too small for `transfer_from`.
    #[error("OMK_ERR_601: Insufficient allowance: need {needed}, have {available}")]
    InsufficientAllowance { needed: Wad, available: Wad },

    /// A collaborator tried to call back into an in-flight mutation.
    #[error("OMK_ERR_602: Reentrant call rejected")]
    ReentrantCall,

    // =================================================================
    // Configuration (7xx)
    // =================================================================
    /// Invalid or unreadable engine configuration.
    #[error("OMK_ERR_700: Configuration error: {0}")]
    Configuration(String),

    // =================================================================
    // Internal Invariant (9xx)
    // =================================================================
    /// Probability vector out of bounds or not normalized.
    #[error("OMK_ERR_900: Price invariant violation: {reason}")]
    PriceInvariantViolation { reason: String },

    /// Fixed-point overflow or underflow.
    #[error("OMK_ERR_901: Arithmetic overflow in {op}")]
    ArithmeticOverflow { op: String },

    /// Unrecoverable internal error.
    #[error("OMK_ERR_902: Internal error: {0}")]
    Internal(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OpenmarketError>;

/// Taxonomy bucket for an [`OpenmarketError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotReady,
    AlreadyTerminal,
    Authorization,
    Economic,
    Custody,
    Configuration,
    InternalInvariant,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            Self::NotReady => write!(f, "NOT_READY"),
            Self::AlreadyTerminal => write!(f, "ALREADY_TERMINAL"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Economic => write!(f, "ECONOMIC"),
            Self::Custody => write!(f, "CUSTODY"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::InternalInvariant => write!(f, "INTERNAL_INVARIANT"),
        }
    }
}

impl OpenmarketError {
    pub(crate) fn overflow(op: &str) -> Self {
        Self::ArithmeticOverflow { op: op.to_string() }
    }

    /// The taxonomy bucket this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. }
            | Self::MarketNotFound(_)
            | Self::InvalidOption { .. }
            | Self::ZeroQuantity
            | Self::InvalidOutcomeCount { .. }
            | Self::LengthMismatch { .. }
            | Self::InvalidDuration { .. }
            | Self::MathDomain { .. }
            | Self::InvalidLiquidityParam(_) => ErrorKind::InvalidArgument,
            Self::MarketNotValidated(_)
            | Self::TradingNotStarted(_)
            | Self::TradingClosed(_)
            | Self::ResolutionTooEarly(_)
            | Self::MarketNotResolved(_)
            | Self::MarketNotInvalidated(_) => ErrorKind::NotReady,
            Self::AlreadyResolved(_)
            | Self::AlreadyInvalidated(_)
            | Self::AlreadyValidated(_)
            | Self::AlreadyClaimed { .. } => ErrorKind::AlreadyTerminal,
            Self::Unauthorized { .. } => ErrorKind::Authorization,
            Self::SlippageExceeded { .. }
            | Self::PriceTooLow
            | Self::InsufficientSolvency { .. }
            | Self::InsufficientLiquidity { .. }
            | Self::InsufficientShares { .. }
            | Self::NoFeesToWithdraw
            | Self::NoWinningShares(_)
            | Self::NoRefundDue(_)
            | Self::NoSurplus(_) => ErrorKind::Economic,
            Self::InsufficientBalance { .. }
            | Self::InsufficientAllowance { .. }
            | Self::ReentrantCall => ErrorKind::Custody,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::PriceInvariantViolation { .. }
            | Self::ArithmeticOverflow { .. }
            | Self::Internal(_) => ErrorKind::InternalInvariant,
        }
    }

    /// Internal-invariant failures are never recovered from.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::InternalInvariant
    }
}

impl From<std::io::Error> for OpenmarketError {
    fn from(err: std::io::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for OpenmarketError {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}
