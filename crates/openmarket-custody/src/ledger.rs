//! Fungible token custody.
//!
//! The engine never holds tokens itself. Seed liquidity, trade payments,
//! and fees all sit in the engine's vault account on a [`TokenLedger`], and
//! every payout is a transfer out of that vault.

use std::collections::HashMap;

use openmarket_types::{OpenmarketError, Result, UserId, Wad};
use tracing::trace;

/// The token operations the engine depends on.
///
/// Implementations must be atomic per call: a failed transfer leaves every
/// balance and allowance unchanged.
pub trait TokenLedger {
    fn balance_of(&self, account: UserId) -> Wad;

    /// Move `amount` from `from` to `to`.
    fn transfer(&mut self, from: UserId, to: UserId, amount: Wad) -> Result<()>;

    /// Move `amount` from `owner` to `to`, spending `spender`'s allowance.
    fn transfer_from(&mut self, spender: UserId, owner: UserId, to: UserId, amount: Wad)
    -> Result<()>;
}

/// Reference ledger held in memory, with ERC-20 style allowances.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: HashMap<UserId, Wad>,
    /// `(owner, spender) -> remaining allowance`.
    allowances: HashMap<(UserId, UserId), Wad>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create tokens in `account`.
    pub fn mint(&mut self, account: UserId, amount: Wad) -> Result<()> {
        let balance = self.balances.entry(account).or_default();
        *balance = balance.checked_add(amount)?;
        Ok(())
    }

    /// Set `spender`'s allowance over `owner`'s tokens, replacing any
    /// previous value.
    pub fn approve(&mut self, owner: UserId, spender: UserId, amount: Wad) {
        self.allowances.insert((owner, spender), amount);
    }

    #[must_use]
    pub fn allowance(&self, owner: UserId, spender: UserId) -> Wad {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    /// Sum of every balance.
    pub fn total_supply(&self) -> Result<Wad> {
        self.balances
            .values()
            .try_fold(Wad::ZERO, |acc, b| acc.checked_add(*b))
    }

    fn debit_credit(&mut self, from: UserId, to: UserId, amount: Wad) -> Result<()> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(OpenmarketError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self.balance_of(to).checked_add(amount)?;
        self.balances.insert(from, available.checked_sub(amount)?);
        self.balances.insert(to, credited);
        Ok(())
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, account: UserId) -> Wad {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    fn transfer(&mut self, from: UserId, to: UserId, amount: Wad) -> Result<()> {
        self.debit_credit(from, to, amount)?;
        trace!(%from, %to, amount = %amount, "transfer");
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: UserId,
        owner: UserId,
        to: UserId,
        amount: Wad,
    ) -> Result<()> {
        let allowance = self.allowance(owner, spender);
        if allowance < amount {
            return Err(OpenmarketError::InsufficientAllowance {
                needed: amount,
                available: allowance,
            });
        }
        self.debit_credit(owner, to, amount)?;
        self.allowances
            .insert((owner, spender), allowance.checked_sub(amount)?);
        trace!(%spender, %owner, %to, amount = %amount, "transfer_from");
        Ok(())
    }
}
