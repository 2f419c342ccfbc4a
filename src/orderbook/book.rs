//! Core order book: two ordered sides, an id index, and read-only views.
//!
//! Prices are validated, tick-aligned `i64` keys into a pair of
//! `SkipMap`s. The skip list keeps each side sorted, so the best bid is
//! the last bid key and the best ask the first ask key, with no sorting in
//! the matching path. All mutation goes through `&self`; the book is
//! exclusively owned by its dispatcher.

use crate::orderbook::cache::PriceLevelCache;
use crate::orderbook::error::OrderBookError;
use crate::orderbook::level::PriceLevel;
use crate::orderbook::order::{BookOrder, OrderId, Side};
use crate::orderbook::snapshot::DepthLevel;
use crate::orderbook::trade::LastTrade;
use crossbeam::atomic::AtomicCell;
use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use std::sync::Arc;

/// Price-time-priority limit order book for one instrument.
pub struct OrderBook {
    /// Instrument identifier, informational only.
    symbol: String,

    /// Minimum price increment; every book price is a non-negative exact
    /// multiple of this.
    tick_size: i64,

    /// Bid levels keyed by price; the greatest key is the best bid.
    pub(super) bids: SkipMap<i64, Arc<PriceLevel>>,

    /// Ask levels keyed by price; the least key is the best ask.
    pub(super) asks: SkipMap<i64, Arc<PriceLevel>>,

    /// Order id → (price, side) for O(log n) cancel and modify. Holds
    /// every live order, dark icebergs included.
    pub(super) order_locations: DashMap<OrderId, (i64, Side)>,

    /// Icebergs whose displayed slice is exhausted and whose hidden
    /// remainder awaits an `IcebergRefresh` event. Not matchable while
    /// here.
    pub(super) dark_icebergs: DashMap<OrderId, Arc<BookOrder>>,

    /// Most recent fill; drives stop triggers and snapshots.
    last_trade: AtomicCell<Option<LastTrade>>,

    /// Best-price cache, invalidated on every mutation.
    pub(super) cache: PriceLevelCache,
}

impl OrderBook {
    /// Creates an empty book.
    ///
    /// `tick_size` must be positive; construction goes through
    /// [`SimulatorConfig`](crate::config::SimulatorConfig) in normal use,
    /// which validates it.
    pub fn new(symbol: &str, tick_size: i64) -> Self {
        Self {
            symbol: symbol.to_string(),
            tick_size,
            bids: SkipMap::new(),
            asks: SkipMap::new(),
            order_locations: DashMap::new(),
            dark_icebergs: DashMap::new(),
            last_trade: AtomicCell::new(None),
            cache: PriceLevelCache::new(),
        }
    }

    /// Instrument identifier.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Configured minimum price increment.
    #[inline]
    pub fn tick_size(&self) -> i64 {
        self.tick_size
    }

    /// Validates a limit price: non-negative and tick-aligned.
    pub fn validate_price(&self, price: i64) -> Result<(), OrderBookError> {
        if price < 0 {
            return Err(OrderBookError::NegativePrice { price });
        }
        if price % self.tick_size != 0 {
            return Err(OrderBookError::PriceNotTickAligned {
                price,
                tick_size: self.tick_size,
            });
        }
        Ok(())
    }

    /// Best (highest) bid price, if any.
    pub fn best_bid(&self) -> Option<i64> {
        if let Some(cached) = self.cache.cached_best_bid() {
            return cached;
        }
        let best = self.bids.back().map(|entry| *entry.key());
        self.cache.store_best_bid(best);
        best
    }

    /// Best (lowest) ask price, if any.
    pub fn best_ask(&self) -> Option<i64> {
        if let Some(cached) = self.cache.cached_best_ask() {
            return cached;
        }
        let best = self.asks.front().map(|entry| *entry.key());
        self.cache.store_best_ask(best);
        best
    }

    /// `best_ask - best_bid` in ticks; defined only when both sides are
    /// non-empty.
    pub fn spread(&self) -> Option<i64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Exact mid price as a doubled-tick integer (`bid + ask`), so a
    /// half-tick mid stays representable without floats.
    pub fn mid_double_ticks(&self) -> Option<i64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(bid + ask),
            _ => None,
        }
    }

    /// Mid price as a float view for analytics; tick arithmetic stays the
    /// source of truth.
    pub fn mid_price(&self) -> Option<f64> {
        self.mid_double_ticks().map(|doubled| doubled as f64 / 2.0)
    }

    /// Most recent fill, if any trade has occurred.
    pub fn last_trade(&self) -> Option<LastTrade> {
        self.last_trade.load()
    }

    /// Records a fill for stop triggers and snapshots.
    pub(crate) fn record_trade(&self, trade: LastTrade) {
        self.last_trade.store(Some(trade));
    }

    /// Number of live orders, dark icebergs included.
    pub fn order_count(&self) -> usize {
        self.order_locations.len()
    }

    /// `true` when `order_id` is live (resting or dark).
    pub fn contains(&self, order_id: OrderId) -> bool {
        self.order_locations.contains_key(&order_id)
    }

    /// Top `n_levels` of one side in price-priority order.
    pub fn depth(&self, side: Side, n_levels: usize) -> Vec<DepthLevel> {
        let mut levels = Vec::new();
        match side {
            Side::Buy => {
                for entry in self.bids.iter().rev().take(n_levels) {
                    levels.push(DepthLevel::from_level(entry.value()));
                }
            }
            Side::Sell => {
                for entry in self.asks.iter().take(n_levels) {
                    levels.push(DepthLevel::from_level(entry.value()));
                }
            }
        }
        levels
    }

    /// Opposite-side price the order would match at, or `None` when it
    /// would rest. Used for the POST_ONLY admission check.
    pub fn would_cross(&self, side: Side, price: i64) -> Option<i64> {
        match side {
            Side::Buy => self.best_ask().filter(|&ask| price >= ask),
            Side::Sell => self.best_bid().filter(|&bid| price <= bid),
        }
    }

    /// Members of the level at `(side, price)` in priority order, for
    /// inspection and invariant checks.
    pub fn level_orders(&self, side: Side, price: i64) -> Option<Vec<Arc<BookOrder>>> {
        let map = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        map.get(&price)
            .map(|entry| entry.value().orders_in_priority())
    }

    /// Cached aggregate quantity of the level at `(side, price)`.
    pub fn level_quantity(&self, side: Side, price: i64) -> Option<u64> {
        let map = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        map.get(&price).map(|entry| entry.value().total_quantity())
    }

    /// A resting or dark order by id.
    pub fn get_order(&self, order_id: OrderId) -> Option<Arc<BookOrder>> {
        let location = self.order_locations.get(&order_id)?;
        let (price, side) = *location.value();
        drop(location);

        if let Some(dark) = self.dark_icebergs.get(&order_id) {
            return Some(dark.value().clone());
        }
        let map = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        map.get(&price)
            .and_then(|entry| entry.value().orders_in_priority().into_iter().find(|o| o.id() == order_id))
    }

    /// The side map an aggressor on `side` matches against.
    pub(super) fn opposite_levels(&self, side: Side) -> &SkipMap<i64, Arc<PriceLevel>> {
        match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        }
    }

    /// The side map an order on `side` rests on.
    pub(super) fn same_levels(&self, side: Side) -> &SkipMap<i64, Arc<PriceLevel>> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }
}
