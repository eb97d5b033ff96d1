//! Market arena and position store.

use std::collections::HashMap;

use openmarket_types::{Market, MarketId, OpenmarketError, Result, UserId, UserPosition};

/// Key of a position: one option of one market, held by one user.
pub type PositionKey = (MarketId, usize, UserId);

/// Every market, addressed by arena index, plus all user positions.
#[derive(Debug, Clone, Default)]
pub struct MarketBook {
    markets: Vec<Market>,
    positions: HashMap<PositionKey, UserPosition>,
}

impl MarketBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next inserted market will receive.
    #[must_use]
    pub fn next_id(&self) -> MarketId {
        MarketId(self.markets.len() as u64)
    }

    /// Append a market, overwriting its id with its arena index.
    pub fn insert(&mut self, mut market: Market) -> MarketId {
        let id = self.next_id();
        market.id = id;
        self.markets.push(market);
        id
    }

    pub fn get(&self, id: MarketId) -> Result<&Market> {
        self.markets
            .get(id.index())
            .ok_or(OpenmarketError::MarketNotFound(id))
    }

    pub fn get_mut(&mut self, id: MarketId) -> Result<&mut Market> {
        self.markets
            .get_mut(id.index())
            .ok_or(OpenmarketError::MarketNotFound(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Market> {
        self.markets.iter()
    }

    /// A user's position, or an empty one if they never traded the option.
    #[must_use]
    pub fn position(&self, market: MarketId, option: usize, user: UserId) -> UserPosition {
        self.positions
            .get(&(market, option, user))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_position(
        &mut self,
        market: MarketId,
        option: usize,
        user: UserId,
        position: UserPosition,
    ) {
        self.positions.insert((market, option, user), position);
    }

    /// Every stored position of `user` in `market`, by option index.
    #[must_use]
    pub fn positions_of(&self, market: MarketId, user: UserId) -> Vec<(usize, UserPosition)> {
        let outcome_count = self.get(market).map_or(0, Market::outcome_count);
        (0..outcome_count)
            .filter_map(|option| {
                self.positions
                    .get(&(market, option, user))
                    .map(|p| (option, p.clone()))
            })
            .collect()
    }
}
