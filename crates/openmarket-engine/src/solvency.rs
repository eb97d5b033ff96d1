//! Solvency invariant checker.
//!
//! Enforced on the staged state of every trade:
//! ```text
//! max_i(q_i) × payout_per_share ≤ admin_liquidity + user_liquidity
//! ```
//!
//! Whichever outcome wins, the market can pay every share of it. Collected
//! fees are held separately and never count toward coverage.

use openmarket_types::{OpenmarketError, OptionState, Result, Wad};
use tracing::warn;

/// Payout owed if the most-held outcome wins.
pub fn max_liability(options: &[OptionState], payout_per_share: Wad) -> Result<Wad> {
    let max_shares = options
        .iter()
        .map(|o| o.shares)
        .max()
        .unwrap_or(Wad::ZERO);
    max_shares.checked_mul(payout_per_share)
}

/// Verify that `admin_liquidity + user_liquidity` covers the worst-case
/// payout of `options`.
///
/// # Errors
/// Returns [`OpenmarketError::InsufficientSolvency`] if it does not.
pub fn verify(
    options: &[OptionState],
    payout_per_share: Wad,
    admin_liquidity: Wad,
    user_liquidity: Wad,
) -> Result<()> {
    let liability = max_liability(options, payout_per_share)?;
    let available = admin_liquidity.checked_add(user_liquidity)?;
    if liability > available {
        warn!(liability = %liability, available = %available, "solvency check failed");
        return Err(OpenmarketError::InsufficientSolvency {
            liability,
            available,
        });
    }
    Ok(())
}
