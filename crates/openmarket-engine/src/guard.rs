//! Reentrancy guard for engine mutations.
//!
//! Every mutating entry point holds a [`GuardToken`] for its whole
//! duration. A collaborator that calls back into the engine while the token
//! is alive (for example from a token-ledger transfer hook) is rejected with
//! [`OpenmarketError::ReentrantCall`]. The token releases the guard on drop,
//! so every exit path, including `?` returns, unlocks it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use openmarket_types::{OpenmarketError, Result};
use tracing::warn;

/// Single-entry lock shared between the engine and anything it hands a
/// handle to.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

impl ReentrancyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard, or fail if a mutation is already in flight.
    pub fn enter(self: &Arc<Self>) -> Result<GuardToken> {
        if self
            .entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            warn!("reentrant call rejected");
            return Err(OpenmarketError::ReentrantCall);
        }
        Ok(GuardToken {
            guard: Arc::clone(self),
        })
    }

    #[must_use]
    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

/// Proof that the guard is held. Releases it on drop.
#[derive(Debug)]
#[must_use = "the guard is released as soon as the token is dropped"]
pub struct GuardToken {
    guard: Arc<ReentrancyGuard>,
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        self.guard.entered.store(false, Ordering::Release);
    }
}
