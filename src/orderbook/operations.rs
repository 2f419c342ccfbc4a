//! Book mutations: resting insertion, cancellation, in-place reduction,
//! and iceberg refresh transitions.

use crate::orderbook::book::OrderBook;
use crate::orderbook::error::OrderBookError;
use crate::orderbook::level::PriceLevel;
use crate::orderbook::order::{BookOrder, OrderId, Side};
use std::sync::Arc;
use tracing::trace;

impl OrderBook {
    /// Places a non-crossing order onto its side, creating the price level
    /// if absent.
    ///
    /// # Errors
    /// `DuplicateOrderId` when the id is already live. Price validation is
    /// the dispatcher's admission step; this method trusts its input.
    pub fn insert_resting(&self, order: Arc<BookOrder>) -> Result<(), OrderBookError> {
        let id = order.id();
        if self.order_locations.contains_key(&id) {
            return Err(OrderBookError::DuplicateOrderId(id));
        }

        let (side, price) = (order.side(), order.price());
        let level = self
            .same_levels(side)
            .get_or_insert(price, Arc::new(PriceLevel::new(price)))
            .value()
            .clone();
        level.append(order);
        self.order_locations.insert(id, (price, side));
        self.cache.invalidate();
        trace!("rested {} {} @ {}", id, side, price);
        Ok(())
    }

    /// Removes a live order (resting or dark iceberg). Empty levels are
    /// reclaimed.
    ///
    /// # Errors
    /// `UnknownOrderId` when the id is not live; a cancel for an
    /// already-filled order reports this rather than silently dropping.
    pub fn cancel(&self, order_id: OrderId) -> Result<Arc<BookOrder>, OrderBookError> {
        let location = self
            .order_locations
            .get(&order_id)
            .ok_or(OrderBookError::UnknownOrderId(order_id))?;
        let (price, side) = *location.value();
        drop(location);

        if let Some((_, dark)) = self.dark_icebergs.remove(&order_id) {
            self.order_locations.remove(&order_id);
            trace!("cancelled dark iceberg {}", order_id);
            return Ok(dark);
        }

        let levels = self.same_levels(side);
        let order = levels
            .get(&price)
            .and_then(|entry| entry.value().remove(order_id))
            .ok_or(OrderBookError::UnknownOrderId(order_id))?;
        self.order_locations.remove(&order_id);
        self.reclaim_if_empty(side, price);
        self.cache.invalidate();
        trace!("cancelled {} {} @ {}", order_id, side, price);
        Ok(order)
    }

    /// Reduces a resting order's quantity in place, preserving time
    /// priority. The new quantity must be positive and strictly below the
    /// current remainder; anything else is routed through cancel + submit
    /// by the dispatcher.
    ///
    /// # Errors
    /// `UnknownOrderId` when the id is not resting;
    /// `NonPositiveQuantity` when `new_quantity` is zero.
    pub fn reduce_quantity(
        &self,
        order_id: OrderId,
        new_quantity: u64,
    ) -> Result<Arc<BookOrder>, OrderBookError> {
        if new_quantity == 0 {
            return Err(OrderBookError::NonPositiveQuantity { order_id });
        }
        let location = self
            .order_locations
            .get(&order_id)
            .ok_or(OrderBookError::UnknownOrderId(order_id))?;
        let (price, side) = *location.value();
        drop(location);

        if let Some(dark) = self.dark_icebergs.get(&order_id) {
            // Dark slice has no level aggregates to maintain.
            let order = dark.value().clone();
            drop(dark);
            order.reduce_to(new_quantity.min(order.remaining()));
            return Ok(order);
        }

        let levels = self.same_levels(side);
        let entry = levels
            .get(&price)
            .ok_or(OrderBookError::UnknownOrderId(order_id))?;
        let level = entry.value();
        let order = level
            .orders_in_priority()
            .into_iter()
            .find(|o| o.id() == order_id)
            .ok_or(OrderBookError::UnknownOrderId(order_id))?;

        level.reduce_order(&order, new_quantity.min(order.remaining()));
        self.cache.invalidate();
        trace!("reduced {} to {}", order_id, new_quantity);
        Ok(order)
    }

    /// Moves an exhausted iceberg out of its level while its hidden
    /// remainder awaits refresh. Called by the matching engine; the order
    /// stays cancellable through the id index.
    pub(crate) fn park_dark(&self, order: Arc<BookOrder>) {
        debug_assert_eq!(order.visible(), 0);
        debug_assert!(order.remaining() > 0);
        self.dark_icebergs.insert(order.id(), order);
    }

    /// Takes a dark iceberg out of the waiting table; the id stays
    /// tracked so a later cancel still resolves. Returns `None` when the
    /// order was cancelled while dark (its refresh event is a no-op).
    pub(crate) fn take_dark(&self, order_id: OrderId) -> Option<Arc<BookOrder>> {
        self.dark_icebergs.remove(&order_id).map(|(_, order)| order)
    }

    /// Re-posts a refreshed iceberg slice at its price level. The caller
    /// has already refreshed the slice and resolved any cross.
    pub(crate) fn rest_refreshed(&self, order: Arc<BookOrder>) {
        debug_assert!(order.visible() > 0);
        let (side, price) = (order.side(), order.price());
        let level = self
            .same_levels(side)
            .get_or_insert(price, Arc::new(PriceLevel::new(price)))
            .value()
            .clone();
        let slice = order.visible();
        level.append(order);
        self.cache.invalidate();
        trace!("iceberg refreshed {} @ {}", slice, price);
    }

    /// Forgets a tracked id whose order left the book outside the normal
    /// pop/cancel paths (a refreshed slice that fully filled as taker).
    pub(crate) fn remove_tracking(&self, order_id: OrderId) {
        self.order_locations.remove(&order_id);
    }

    /// Drops the level at `(side, price)` once its last live order is
    /// gone.
    pub(crate) fn reclaim_if_empty(&self, side: Side, price: i64) {
        let levels = self.same_levels(side);
        if let Some(entry) = levels.get(&price) {
            if entry.value().is_empty() {
                entry.remove();
            }
        }
    }
}
