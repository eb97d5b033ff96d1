//! Cross-replica determinism check over market pricing state.
//!
//! Two engines that applied the same operations in the same order must
//! produce the same state root for every market.

use openmarket_types::{Market, MarketStatus};
use sha2::{Digest, Sha256};

/// SHA-256 over everything that feeds pricing and payouts.
#[must_use]
pub fn compute_state_root(market: &Market) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"openmarket:state_root:v1:");
    hasher.update(market.id.0.to_le_bytes());
    hasher.update(market.creator.as_bytes());
    hasher.update(market.liquidity_param.raw().to_le_bytes());
    hasher.update(market.payout_per_share.raw().to_le_bytes());
    hasher.update(market.admin_liquidity.raw().to_le_bytes());
    hasher.update(market.user_liquidity.raw().to_le_bytes());
    match market.status {
        MarketStatus::Created => hasher.update([0u8]),
        MarketStatus::Validated => hasher.update([1u8]),
        MarketStatus::Resolved { winning_option } => {
            hasher.update([2u8]);
            hasher.update((winning_option as u64).to_le_bytes());
        }
        MarketStatus::Invalidated => hasher.update([3u8]),
    }
    hasher.update((market.options.len() as u64).to_le_bytes());
    for option in &market.options {
        hasher.update(option.shares.raw().to_le_bytes());
        hasher.update(option.last_price.raw().to_le_bytes());
        hasher.update([u8::from(option.active)]);
    }
    hasher.update(market.claimed_shares.raw().to_le_bytes());
    hasher.update(market.paid_out.raw().to_le_bytes());
    hasher.update(market.refundable.raw().to_le_bytes());
    hasher.update(market.surplus_withdrawn.raw().to_le_bytes());

    let result = hasher.finalize();
    let mut root = [0u8; 32];
    root.copy_from_slice(&result);
    root
}

#[must_use]
pub fn verify_state_root(market: &Market, expected_root: &[u8; 32]) -> bool {
    compute_state_root(market) == *expected_root
}

/// Lowercase hex, for logs.
#[must_use]
pub fn root_hex(root: &[u8; 32]) -> String {
    hex::encode(root)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use openmarket_types::Wad;

    use super::*;

    #[test]
    fn same_state_same_root() {
        let now = Utc::now();
        let a = Market::dummy(3, Wad::from_units(100), now);
        let b = a.clone();
        assert_eq!(compute_state_root(&a), compute_state_root(&b));
        assert!(verify_state_root(&b, &compute_state_root(&a)));
    }

    #[test]
    fn share_change_changes_root() {
        let now = Utc::now();
        let a = Market::dummy(2, Wad::from_units(100), now);
        let mut b = a.clone();
        b.options[0].shares = Wad::from_raw(1);
        assert_ne!(compute_state_root(&a), compute_state_root(&b));
    }

    #[test]
    fn metadata_does_not_affect_root() {
        let now = Utc::now();
        let a = Market::dummy(2, Wad::from_units(100), now);
        let mut b = a.clone();
        b.metadata.question = "something else".to_string();
        assert_eq!(compute_state_root(&a), compute_state_root(&b));
    }

    #[test]
    fn hex_is_64_chars() {
        let root = compute_state_root(&Market::dummy(2, Wad::ONE, Utc::now()));
        assert_eq!(root_hex(&root).len(), 64);
    }
}
