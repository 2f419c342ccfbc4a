//! Price-time-priority matching.
//!
//! An incoming aggressive order walks the opposite side best level first,
//! and within a level head-by-head in `(submit_ts, sequence)` order.
//! Fills execute at the maker's resting price. The engine mutates the
//! book (fills, maker removal, level reclamation, STP cancellations,
//! iceberg dark transitions) and returns a [`MatchOutcome`] for the
//! dispatcher to turn into trades, reports, and scheduled refreshes.

use crate::orderbook::book::OrderBook;
use crate::orderbook::order::{OrderId, OwnerTag, Side};
use crate::orderbook::stp::{check_self_trade, SelfTradePolicy, StpAction};
use tracing::trace;

/// The aggressive order as seen by the matching engine.
///
/// `limit_price` is `None` for market orders (and triggered stops), which
/// cross unconditionally.
#[derive(Debug, Clone, Copy)]
pub struct IncomingOrder {
    /// Taker order id.
    pub id: OrderId,
    /// Taker side.
    pub side: Side,
    /// Crossing limit; `None` walks the whole opposite side.
    pub limit_price: Option<i64>,
    /// Quantity to match.
    pub quantity: u64,
    /// Owner identity for self-trade prevention.
    pub owner: OwnerTag,
}

/// One fill against a resting maker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    /// The maker that provided the liquidity.
    pub maker_order_id: OrderId,
    /// Execution price: the maker's resting price.
    pub price: i64,
    /// Executed quantity.
    pub quantity: u64,
    /// `true` when the maker is now fully filled.
    pub maker_completed: bool,
}

/// How self-trade prevention terminated the taker, if it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StpTermination {
    /// `CANCEL_NEWEST`: the remainder is dropped without error.
    CancelNewest,
    /// `REJECT_TAKER`: the remainder is rejected with
    /// `SelfTradePrevented`.
    RejectTaker,
}

/// Everything the matching walk did to the book, for the dispatcher to
/// publish.
#[derive(Debug)]
pub struct MatchOutcome {
    /// The taker order id.
    pub taker_id: OrderId,
    /// Fills in execution order.
    pub fills: Vec<Fill>,
    /// Quantity matched.
    pub executed_quantity: u64,
    /// Quantity left on the taker.
    pub remaining_quantity: u64,
    /// Makers cancelled by `CANCEL_OLDEST` self-trade prevention.
    pub cancelled_makers: Vec<OrderId>,
    /// Icebergs whose displayed slice was exhausted with hidden quantity
    /// left; the dispatcher schedules their refresh events.
    pub icebergs_exhausted: Vec<OrderId>,
    /// Set when STP terminated the taker before its remainder matched.
    pub taker_termination: Option<StpTermination>,
}

impl MatchOutcome {
    fn new(taker_id: OrderId, quantity: u64) -> Self {
        Self {
            taker_id,
            fills: Vec::new(),
            executed_quantity: 0,
            remaining_quantity: quantity,
            cancelled_makers: Vec::new(),
            icebergs_exhausted: Vec::new(),
            taker_termination: None,
        }
    }

    /// `true` when every unit of the taker matched.
    #[must_use]
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.remaining_quantity == 0
    }
}

impl OrderBook {
    /// Matches `incoming` against the opposite side under price-time
    /// priority.
    ///
    /// The walk stops when the taker is exhausted, the opposite side runs
    /// out of crossing liquidity, or STP terminates the taker. Residual
    /// handling (rest, discard, reject) is the dispatcher's TIF decision,
    /// not the engine's.
    pub fn match_incoming(
        &self,
        incoming: &IncomingOrder,
        policy: SelfTradePolicy,
    ) -> MatchOutcome {
        self.cache.invalidate();
        let mut outcome = MatchOutcome::new(incoming.id, incoming.quantity);

        'levels: while outcome.remaining_quantity > 0 {
            let opposite = self.opposite_levels(incoming.side);
            let entry = match incoming.side {
                Side::Buy => opposite.front(),
                Side::Sell => opposite.back(),
            };
            let Some(entry) = entry else { break };
            let price = *entry.key();
            let level = entry.value().clone();
            drop(entry);

            if let Some(limit) = incoming.limit_price {
                match incoming.side {
                    Side::Buy if price > limit => break,
                    Side::Sell if price < limit => break,
                    _ => {}
                }
            }

            while outcome.remaining_quantity > 0 {
                let Some(maker) = level.peek_front() else { break };

                match check_self_trade(incoming.owner, maker.owner(), policy) {
                    StpAction::Match => {}
                    StpAction::CancelMaker => {
                        level.remove(maker.id());
                        self.order_locations.remove(&maker.id());
                        outcome.cancelled_makers.push(maker.id());
                        trace!("stp cancelled maker {} at {}", maker.id(), price);
                        continue;
                    }
                    StpAction::CancelTaker => {
                        outcome.taker_termination = Some(StpTermination::CancelNewest);
                        break 'levels;
                    }
                    StpAction::RejectTaker => {
                        outcome.taker_termination = Some(StpTermination::RejectTaker);
                        break 'levels;
                    }
                }

                let quantity = outcome.remaining_quantity.min(maker.visible());
                debug_assert!(quantity > 0);
                level.apply_fill(&maker, quantity);
                outcome.remaining_quantity -= quantity;
                outcome.executed_quantity += quantity;
                outcome.fills.push(Fill {
                    maker_order_id: maker.id(),
                    price: maker.price(),
                    quantity,
                    maker_completed: maker.remaining() == 0,
                });

                if maker.remaining() == 0 {
                    level.pop_front();
                    self.order_locations.remove(&maker.id());
                } else if maker.visible() == 0 {
                    // Displayed slice exhausted with hidden reserve left:
                    // the iceberg leaves the level until its refresh event.
                    level.pop_front();
                    self.park_dark(maker.clone());
                    outcome.icebergs_exhausted.push(maker.id());
                }
            }

            // The inner loop exits with either an exhausted taker or an
            // exhausted level; the outer walk re-fetches the next best
            // level and re-checks the limit.
            self.reclaim_if_empty(incoming.side.opposite(), price);
        }

        self.cache.invalidate();
        trace!(
            "match {}: executed {} remaining {} fills {}",
            incoming.id,
            outcome.executed_quantity,
            outcome.remaining_quantity,
            outcome.fills.len()
        );
        outcome
    }

    /// Crossable quantity visible to a taker, without mutating the book.
    ///
    /// Walks crossing levels best-first, capped at `quantity`. Resting
    /// orders owned by `exclude_owner` are skipped when the tag is
    /// tracked, so a fill-or-kill pre-check never counts liquidity the
    /// taker would be prevented from taking.
    pub fn crossable_quantity(
        &self,
        side: Side,
        quantity: u64,
        limit_price: Option<i64>,
        exclude_owner: OwnerTag,
    ) -> u64 {
        let opposite = self.opposite_levels(side);
        let mut available = 0u64;

        let iter: Box<dyn Iterator<Item = _>> = match side {
            Side::Buy => Box::new(opposite.iter()),
            Side::Sell => Box::new(opposite.iter().rev()),
        };

        for entry in iter {
            if available >= quantity {
                break;
            }
            let price = *entry.key();
            if let Some(limit) = limit_price {
                match side {
                    Side::Buy if price > limit => break,
                    Side::Sell if price < limit => break,
                    _ => {}
                }
            }

            let level = entry.value();
            let level_quantity = if exclude_owner.is_tracked() {
                level
                    .orders_in_priority()
                    .iter()
                    .filter(|o| o.owner() != exclude_owner)
                    .map(|o| o.visible())
                    .sum::<u64>()
            } else {
                level.visible_quantity()
            };
            available = available.saturating_add(level_quantity);
        }

        available.min(quantity)
    }
}
