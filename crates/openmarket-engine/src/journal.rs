//! Append-only event journal drained by indexers.

use openmarket_types::MarketEvent;

#[derive(Debug, Clone, Default)]
pub struct EventJournal {
    events: Vec<MarketEvent>,
}

impl EventJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: MarketEvent) {
        self.events.push(event);
    }

    /// Events not yet drained, oldest first.
    #[must_use]
    pub fn events(&self) -> &[MarketEvent] {
        &self.events
    }

    /// Take every pending event, leaving the journal empty.
    pub fn drain(&mut self) -> Vec<MarketEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use openmarket_types::{UserId, Wad};

    use super::*;

    #[test]
    fn drain_empties() {
        let mut journal = EventJournal::new();
        journal.push(MarketEvent::FeesWithdrawn {
            collector: UserId::new(),
            amount: Wad::ONE,
        });
        assert_eq!(journal.len(), 1);
        let drained = journal.drain();
        assert_eq!(drained.len(), 1);
        assert!(journal.is_empty());
    }
}
