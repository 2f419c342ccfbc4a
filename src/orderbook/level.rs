//! A single price level: resting orders in time priority with cached
//! aggregates.
//!
//! The level keeps a priority queue of `(submit_ts, sequence)` keys beside
//! an id → order map. Cancellation removes from the map in O(1) and leaves
//! a tombstone in the queue that head operations skip lazily, so a level
//! stays cheap under heavy cancel traffic. Matching peeks the head without
//! consuming it, which is what rules out a plain FIFO of popped entries.

use crate::orderbook::order::{BookOrder, OrderId};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Queue entry carrying the priority key so ordered insertion does not
/// need a map lookup per comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    submit_ts: i64,
    sequence: u64,
    id: OrderId,
}

impl QueueEntry {
    #[inline]
    fn key(&self) -> (i64, u64) {
        (self.submit_ts, self.sequence)
    }
}

/// Resting orders at one price, ordered by `submit_ts` then arrival
/// sequence.
///
/// Aggregates are cached: `total_quantity` is the sum of member
/// remainders (hidden iceberg reserve included), `visible_quantity` the
/// sum of displayed slices. Both are maintained incrementally by every
/// mutating operation.
#[derive(Debug)]
pub struct PriceLevel {
    price: i64,
    queue: Mutex<VecDeque<QueueEntry>>,
    orders: DashMap<OrderId, Arc<BookOrder>>,
    total_quantity: AtomicU64,
    visible_quantity: AtomicU64,
}

impl PriceLevel {
    /// Creates an empty level at `price` ticks.
    pub fn new(price: i64) -> Self {
        Self {
            price,
            queue: Mutex::new(VecDeque::new()),
            orders: DashMap::new(),
            total_quantity: AtomicU64::new(0),
            visible_quantity: AtomicU64::new(0),
        }
    }

    /// The level's price in ticks.
    #[inline]
    pub fn price(&self) -> i64 {
        self.price
    }

    /// Sum of member remainders, hidden reserve included.
    #[inline]
    pub fn total_quantity(&self) -> u64 {
        self.total_quantity.load(Ordering::Relaxed)
    }

    /// Sum of displayed slices.
    #[inline]
    pub fn visible_quantity(&self) -> u64 {
        self.visible_quantity.load(Ordering::Relaxed)
    }

    /// Number of resting orders.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// `true` when no live orders remain (tombstones do not count).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Inserts an order in `(submit_ts, sequence)` priority position.
    ///
    /// In the common case (monotone arrivals) this is a push at the tail;
    /// an order whose `submit_ts` predates later arrivals is slotted ahead
    /// of them.
    pub fn append(&self, order: Arc<BookOrder>) {
        debug_assert_eq!(order.price(), self.price);
        let entry = QueueEntry {
            submit_ts: order.submit_ts(),
            sequence: order.sequence(),
            id: order.id(),
        };

        let mut queue = self.queue.lock().expect("level queue poisoned");
        let at = queue.partition_point(|existing| existing.key() <= entry.key());
        queue.insert(at, entry);
        drop(queue);

        self.total_quantity
            .fetch_add(order.remaining(), Ordering::Relaxed);
        self.visible_quantity
            .fetch_add(order.visible(), Ordering::Relaxed);
        self.orders.insert(order.id(), order);
    }

    /// Returns the head order without removing it, skipping tombstones.
    pub fn peek_front(&self) -> Option<Arc<BookOrder>> {
        let mut queue = self.queue.lock().expect("level queue poisoned");
        while let Some(entry) = queue.front() {
            if let Some(order) = self.orders.get(&entry.id) {
                return Some(order.value().clone());
            }
            queue.pop_front();
        }
        None
    }

    /// Removes and returns the head order, adjusting aggregates by its
    /// current remainder.
    pub fn pop_front(&self) -> Option<Arc<BookOrder>> {
        let mut queue = self.queue.lock().expect("level queue poisoned");
        while let Some(entry) = queue.pop_front() {
            if let Some((_, order)) = self.orders.remove(&entry.id) {
                self.total_quantity
                    .fetch_sub(order.remaining(), Ordering::Relaxed);
                self.visible_quantity
                    .fetch_sub(order.visible(), Ordering::Relaxed);
                return Some(order);
            }
        }
        None
    }

    /// Excises an order by id in O(1), leaving a queue tombstone.
    pub fn remove(&self, order_id: OrderId) -> Option<Arc<BookOrder>> {
        let (_, order) = self.orders.remove(&order_id)?;
        self.total_quantity
            .fetch_sub(order.remaining(), Ordering::Relaxed);
        self.visible_quantity
            .fetch_sub(order.visible(), Ordering::Relaxed);
        Some(order)
    }

    /// Applies a fill of `quantity` to a member order and the cached
    /// aggregates. The caller guarantees `quantity <= order.visible()`.
    pub(crate) fn apply_fill(&self, order: &BookOrder, quantity: u64) {
        order.fill(quantity);
        self.total_quantity.fetch_sub(quantity, Ordering::Relaxed);
        self.visible_quantity.fetch_sub(quantity, Ordering::Relaxed);
    }

    /// Reduces a member order's remainder in place (priority preserved).
    pub(crate) fn reduce_order(&self, order: &BookOrder, new_remaining: u64) {
        let delta = order.remaining().saturating_sub(new_remaining);
        let visible_removed = order.reduce_to(new_remaining);
        self.total_quantity.fetch_sub(delta, Ordering::Relaxed);
        self.visible_quantity
            .fetch_sub(visible_removed, Ordering::Relaxed);
    }

    /// Members in priority order. Used by depth snapshots and invariant
    /// checks, not by the matching hot path.
    pub fn orders_in_priority(&self) -> Vec<Arc<BookOrder>> {
        let queue = self.queue.lock().expect("level queue poisoned");
        queue
            .iter()
            .filter_map(|entry| self.orders.get(&entry.id).map(|o| o.value().clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::order::{OwnerTag, Side, TimeInForce};

    fn resting(id: u64, quantity: u64, submit_ts: i64, sequence: u64) -> Arc<BookOrder> {
        Arc::new(BookOrder::new(
            OrderId(id),
            Side::Sell,
            10_000,
            quantity,
            None,
            TimeInForce::Gtc,
            submit_ts,
            sequence,
            OwnerTag::ANONYMOUS,
        ))
    }

    #[test]
    fn test_append_updates_aggregates() {
        let level = PriceLevel::new(10_000);
        level.append(resting(1, 30, 1, 1));
        level.append(resting(2, 70, 2, 2));

        assert_eq!(level.total_quantity(), 100);
        assert_eq!(level.visible_quantity(), 100);
        assert_eq!(level.order_count(), 2);
    }

    #[test]
    fn test_fifo_by_submit_ts_then_sequence() {
        let level = PriceLevel::new(10_000);
        level.append(resting(1, 10, 5, 1));
        // Arrived later but carries an earlier submit_ts; takes the head.
        level.append(resting(2, 10, 3, 2));

        assert_eq!(level.peek_front().unwrap().id(), OrderId(2));
        assert_eq!(level.pop_front().unwrap().id(), OrderId(2));
        assert_eq!(level.pop_front().unwrap().id(), OrderId(1));
        assert!(level.is_empty());
    }

    #[test]
    fn test_equal_submit_ts_breaks_on_sequence() {
        let level = PriceLevel::new(10_000);
        level.append(resting(7, 10, 4, 11));
        level.append(resting(8, 10, 4, 10));

        assert_eq!(level.pop_front().unwrap().id(), OrderId(8));
        assert_eq!(level.pop_front().unwrap().id(), OrderId(7));
    }

    #[test]
    fn test_remove_leaves_skippable_tombstone() {
        let level = PriceLevel::new(10_000);
        level.append(resting(1, 25, 1, 1));
        level.append(resting(2, 75, 2, 2));

        let removed = level.remove(OrderId(1)).unwrap();
        assert_eq!(removed.id(), OrderId(1));
        assert_eq!(level.total_quantity(), 75);

        // Head skips the tombstone.
        assert_eq!(level.peek_front().unwrap().id(), OrderId(2));
        assert!(level.remove(OrderId(1)).is_none());
    }

    #[test]
    fn test_apply_fill_keeps_aggregates_consistent() {
        let level = PriceLevel::new(10_000);
        let order = resting(1, 100, 1, 1);
        level.append(order.clone());

        level.apply_fill(&order, 40);
        assert_eq!(order.remaining(), 60);
        assert_eq!(level.total_quantity(), 60);
        assert_eq!(level.visible_quantity(), 60);
    }

    #[test]
    fn test_reduce_order_preserves_position() {
        let level = PriceLevel::new(10_000);
        let first = resting(1, 100, 1, 1);
        level.append(first.clone());
        level.append(resting(2, 50, 2, 2));

        level.reduce_order(&first, 10);
        assert_eq!(level.total_quantity(), 60);
        assert_eq!(level.peek_front().unwrap().id(), OrderId(1));
    }

    #[test]
    fn test_aggregate_equals_member_sum_after_mixed_ops() {
        let level = PriceLevel::new(10_000);
        for i in 0..10u64 {
            level.append(resting(i, 10 + i, i as i64, i));
        }
        level.remove(OrderId(3));
        level.remove(OrderId(7));
        let head = level.peek_front().unwrap();
        level.apply_fill(&head, 5);

        let member_sum: u64 = level
            .orders_in_priority()
            .iter()
            .map(|o| o.remaining())
            .sum();
        assert_eq!(level.total_quantity(), member_sum);
    }
}
