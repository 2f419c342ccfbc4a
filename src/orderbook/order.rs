//! Order identity and the resting order record.
//!
//! Prices are `i64` values denominated in ticks; quantities are `u64`
//! share counts. The resting order uses atomic quantity fields so the
//! book can keep the `&self` mutation surface used throughout the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Externally supplied order identifier, unique across a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque owner identity used for self-trade prevention.
///
/// [`OwnerTag::ANONYMOUS`] (zero) always bypasses STP checks, so producers
/// that do not care about self-trades pay nothing for the feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerTag(pub u64);

impl OwnerTag {
    /// The anonymous owner; never participates in self-trade prevention.
    pub const ANONYMOUS: OwnerTag = OwnerTag(0);

    /// Returns `true` when this tag is subject to STP checks.
    #[must_use]
    #[inline]
    pub fn is_tracked(self) -> bool {
        self != OwnerTag::ANONYMOUS
    }
}

impl fmt::Display for OwnerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner:{}", self.0)
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Bid side; matches against asks.
    Buy,
    /// Ask side; matches against bids.
    Sell,
}

impl Side {
    /// The side an aggressor on `self` matches against.
    #[must_use]
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Cost sign convention: paying up is positive for buys, negative for
    /// sells. Used by the slippage ledger.
    #[must_use]
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Residual-handling policy evaluated at match time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    /// Rest until the session ends.
    Day,
    /// Immediate-or-cancel: discard the unmatched remainder.
    Ioc,
    /// Fill-or-kill: the full quantity must match atomically or nothing does.
    Fok,
    /// Good-till-cancel: rest until explicitly cancelled.
    #[default]
    Gtc,
    /// Maker-only: reject the order if it would cross.
    PostOnly,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInForce::Day => write!(f, "DAY"),
            TimeInForce::Ioc => write!(f, "IOC"),
            TimeInForce::Fok => write!(f, "FOK"),
            TimeInForce::Gtc => write!(f, "GTC"),
            TimeInForce::PostOnly => write!(f, "POST_ONLY"),
        }
    }
}

/// Order kind with kind-specific parameters.
///
/// `Stop` and `StopLimit` carry the trigger price; for `StopLimit` the
/// order's `price` field is the limit that applies once triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    /// Plain limit order.
    Limit,
    /// Market order; `price` is ignored.
    Market,
    /// Stop order: becomes a market order when the last trade crosses
    /// `trigger_price`.
    Stop {
        /// Trigger threshold in ticks.
        trigger_price: i64,
    },
    /// Stop-limit order: becomes a limit order at `price` when triggered.
    StopLimit {
        /// Trigger threshold in ticks.
        trigger_price: i64,
    },
    /// Iceberg order showing at most `display_quantity` at a time.
    Iceberg {
        /// Displayed slice size; must be positive and no larger than the
        /// order quantity.
        display_quantity: u64,
    },
}

impl OrderKind {
    /// Returns `true` for the stop kinds held outside the book until
    /// triggered.
    #[must_use]
    #[inline]
    pub fn is_stop(self) -> bool {
        matches!(self, OrderKind::Stop { .. } | OrderKind::StopLimit { .. })
    }
}

/// A fully-formed order as supplied by a producer in a `SUBMIT` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Externally supplied unique identifier.
    pub id: OrderId,
    /// Buy or sell.
    pub side: Side,
    /// Order kind and kind-specific parameters.
    #[serde(flatten)]
    pub kind: OrderKind,
    /// Limit price in ticks. Ignored for `Market`; the post-trigger limit
    /// for `StopLimit`.
    pub price: i64,
    /// Total quantity; must be positive.
    pub quantity: u64,
    /// Residual-handling policy.
    pub time_in_force: TimeInForce,
    /// Logical timestamp at which the producer created the order. Time
    /// priority is taken from this value; it may precede the event's
    /// arrival timestamp to model latency.
    pub submit_ts: i64,
    /// Owner identity for self-trade prevention.
    pub owner: OwnerTag,
}

impl OrderRequest {
    /// Convenience constructor for a GTC limit order.
    pub fn limit(id: OrderId, side: Side, price: i64, quantity: u64, submit_ts: i64) -> Self {
        Self {
            id,
            side,
            kind: OrderKind::Limit,
            price,
            quantity,
            time_in_force: TimeInForce::Gtc,
            submit_ts,
            owner: OwnerTag::ANONYMOUS,
        }
    }

    /// Convenience constructor for a market order.
    pub fn market(id: OrderId, side: Side, quantity: u64, submit_ts: i64) -> Self {
        Self {
            id,
            side,
            kind: OrderKind::Market,
            price: 0,
            quantity,
            time_in_force: TimeInForce::Ioc,
            submit_ts,
            owner: OwnerTag::ANONYMOUS,
        }
    }

    /// Sets the time-in-force.
    #[must_use]
    pub fn with_tif(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }

    /// Sets the owner tag.
    #[must_use]
    pub fn with_owner(mut self, owner: OwnerTag) -> Self {
        self.owner = owner;
        self
    }
}

/// A resting order owned by the book.
///
/// Identity fields are immutable; quantities and priority are atomic so
/// matching and cancellation run through `&self`. For icebergs,
/// `remaining` counts the whole order (displayed plus hidden) while
/// `visible` counts only the displayed slice; for everything else the two
/// are equal.
#[derive(Debug)]
pub struct BookOrder {
    id: OrderId,
    side: Side,
    price: i64,
    original_quantity: u64,
    remaining: AtomicU64,
    visible: AtomicU64,
    display_quantity: Option<u64>,
    time_in_force: TimeInForce,
    submit_ts: AtomicI64,
    sequence: AtomicU64,
    owner: OwnerTag,
}

impl BookOrder {
    /// Creates a resting order. `display_quantity` is `Some` only for
    /// icebergs, in which case the initial visible slice is
    /// `min(display, quantity)`.
    pub fn new(
        id: OrderId,
        side: Side,
        price: i64,
        quantity: u64,
        display_quantity: Option<u64>,
        time_in_force: TimeInForce,
        submit_ts: i64,
        sequence: u64,
        owner: OwnerTag,
    ) -> Self {
        let visible = display_quantity.map_or(quantity, |d| d.min(quantity));
        Self {
            id,
            side,
            price,
            original_quantity: quantity,
            remaining: AtomicU64::new(quantity),
            visible: AtomicU64::new(visible),
            display_quantity,
            time_in_force,
            submit_ts: AtomicI64::new(submit_ts),
            sequence: AtomicU64::new(sequence),
            owner,
        }
    }

    /// Order identifier.
    #[inline]
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Resting side.
    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Resting price in ticks.
    #[inline]
    pub fn price(&self) -> i64 {
        self.price
    }

    /// Quantity at submission.
    #[inline]
    pub fn original_quantity(&self) -> u64 {
        self.original_quantity
    }

    /// Unfilled quantity, including any hidden iceberg reserve.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Relaxed)
    }

    /// Displayed (matchable) quantity.
    #[inline]
    pub fn visible(&self) -> u64 {
        self.visible.load(Ordering::Relaxed)
    }

    /// Hidden iceberg reserve; zero for non-icebergs.
    #[inline]
    pub fn hidden(&self) -> u64 {
        self.remaining().saturating_sub(self.visible())
    }

    /// Iceberg slice size, if this order is an iceberg.
    #[inline]
    pub fn display_quantity(&self) -> Option<u64> {
        self.display_quantity
    }

    /// Residual-handling policy.
    #[inline]
    pub fn time_in_force(&self) -> TimeInForce {
        self.time_in_force
    }

    /// Logical timestamp used for time priority. Refreshed (and priority
    /// lost) when an iceberg replenishes.
    #[inline]
    pub fn submit_ts(&self) -> i64 {
        self.submit_ts.load(Ordering::Relaxed)
    }

    /// Arrival sequence number; tie-break after `submit_ts`.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// Owner identity.
    #[inline]
    pub fn owner(&self) -> OwnerTag {
        self.owner
    }

    /// Consumes `quantity` from the displayed slice and the total
    /// remainder. Callers must not exceed `visible()`.
    #[inline]
    pub(crate) fn fill(&self, quantity: u64) {
        debug_assert!(quantity <= self.visible());
        self.visible.fetch_sub(quantity, Ordering::Relaxed);
        self.remaining.fetch_sub(quantity, Ordering::Relaxed);
    }

    /// Reduces the total remainder to `new_remaining` (quantity-decrease
    /// modify; keeps time priority). The displayed slice is clamped to the
    /// new remainder. Returns the visible quantity removed, for aggregate
    /// upkeep.
    pub(crate) fn reduce_to(&self, new_remaining: u64) -> u64 {
        debug_assert!(new_remaining <= self.remaining());
        self.remaining.store(new_remaining, Ordering::Relaxed);
        let visible = self.visible.load(Ordering::Relaxed);
        if visible > new_remaining {
            self.visible.store(new_remaining, Ordering::Relaxed);
            visible - new_remaining
        } else {
            0
        }
    }

    /// Replenishes the displayed slice from the hidden reserve with a
    /// fresh timestamp and sequence, forfeiting time priority. Returns the
    /// new visible quantity.
    pub(crate) fn refresh_slice(&self, submit_ts: i64, sequence: u64) -> u64 {
        let slice = self
            .display_quantity
            .unwrap_or(u64::MAX)
            .min(self.remaining());
        self.visible.store(slice, Ordering::Relaxed);
        self.submit_ts.store(submit_ts, Ordering::Relaxed);
        self.sequence.store(sequence, Ordering::Relaxed);
        slice
    }
}
