//! Per-market fee accrual and lock/unlock accounting.
//!
//! Fees accrue on every trade and stay locked until their market resolves
//! or is invalidated. Withdrawal sweeps the unlocked remainder of every
//! market at once.

use std::collections::BTreeMap;

use openmarket_types::{FeeEntry, MarketId, Result, Wad};

#[derive(Debug, Clone, Default)]
pub struct FeeLedger {
    entries: BTreeMap<MarketId, FeeEntry>,
    total_withdrawn: Wad,
}

impl FeeLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entry(&self, market: MarketId) -> FeeEntry {
        self.entries.get(&market).cloned().unwrap_or_default()
    }

    /// The entry for `market` after accruing `fee`, without storing it.
    pub fn accrued(&self, market: MarketId, fee: Wad) -> Result<FeeEntry> {
        let mut entry = self.entry(market);
        entry.collected = entry.collected.checked_add(fee)?;
        Ok(entry)
    }

    /// Store an entry staged by [`accrued`](Self::accrued).
    pub fn store(&mut self, market: MarketId, entry: FeeEntry) {
        self.entries.insert(market, entry);
    }

    pub fn unlock(&mut self, market: MarketId) {
        self.entries.entry(market).or_default().unlocked = true;
    }

    /// Unlocked fees not yet withdrawn, across every market.
    pub fn unlocked_total(&self) -> Result<Wad> {
        self.entries
            .values()
            .try_fold(Wad::ZERO, |acc, e| acc.checked_add(e.withdrawable()?))
    }

    /// Fees still locked behind open markets.
    pub fn locked_total(&self) -> Result<Wad> {
        self.entries
            .values()
            .try_fold(Wad::ZERO, |acc, e| acc.checked_add(e.locked()))
    }

    /// Mark every unlocked fee withdrawn. Call only after the tokens for
    /// `amount` (the prior [`unlocked_total`](Self::unlocked_total)) have
    /// left the vault.
    pub fn mark_withdrawn(&mut self, amount: Wad) {
        for entry in self.entries.values_mut().filter(|e| e.unlocked) {
            entry.withdrawn = entry.collected;
        }
        self.total_withdrawn = Wad::from_raw(self.total_withdrawn.raw().saturating_add(amount.raw()));
    }

    #[must_use]
    pub fn total_withdrawn(&self) -> Wad {
        self.total_withdrawn
    }
}
