//! Best-price cache invalidated on every book mutation.

use crossbeam::atomic::AtomicCell;

/// Caches the best bid/ask so repeated top-of-book reads between
/// mutations skip the skip-list walk.
///
/// The outer `Option` distinguishes "not cached" from "cached as empty
/// side", so an empty book is cached too.
#[derive(Debug, Default)]
pub(super) struct PriceLevelCache {
    best_bid: AtomicCell<Option<Option<i64>>>,
    best_ask: AtomicCell<Option<Option<i64>>>,
}

impl PriceLevelCache {
    pub(super) fn new() -> Self {
        Self {
            best_bid: AtomicCell::new(None),
            best_ask: AtomicCell::new(None),
        }
    }

    /// Cached best bid, or `None` when the cache is cold.
    #[inline]
    pub(super) fn cached_best_bid(&self) -> Option<Option<i64>> {
        self.best_bid.load()
    }

    /// Cached best ask, or `None` when the cache is cold.
    #[inline]
    pub(super) fn cached_best_ask(&self) -> Option<Option<i64>> {
        self.best_ask.load()
    }

    #[inline]
    pub(super) fn store_best_bid(&self, price: Option<i64>) {
        self.best_bid.store(Some(price));
    }

    #[inline]
    pub(super) fn store_best_ask(&self, price: Option<i64>) {
        self.best_ask.store(Some(price));
    }

    /// Drops both cached prices. Called by every mutating operation.
    #[inline]
    pub(super) fn invalidate(&self) {
        self.best_bid.store(None);
        self.best_ask.store(None);
    }
}
