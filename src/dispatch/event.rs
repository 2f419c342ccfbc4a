//! The normalized event stream consumed by the dispatcher.
//!
//! Producers (market-data decoders, strategies, test harnesses) supply
//! `Event` values; the `kind` tag plus a kind-specific payload mirrors the
//! wire schema, so a JSON stream maps onto these types directly.

use crate::orderbook::order::{OrderId, OrderRequest};
use serde::{Deserialize, Serialize};

/// One timestamped input to the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Logical arrival timestamp; must be `>=` the dispatcher's current
    /// time at submission.
    pub ts: i64,
    /// What happened.
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    /// Shorthand for a `SUBMIT` event.
    pub fn submit(ts: i64, order: OrderRequest) -> Self {
        Self {
            ts,
            kind: EventKind::Submit { order },
        }
    }

    /// Shorthand for a `CANCEL` event.
    pub fn cancel(ts: i64, order_id: OrderId) -> Self {
        Self {
            ts,
            kind: EventKind::Cancel { order_id },
        }
    }

    /// Shorthand for a `MODIFY` event.
    pub fn modify(ts: i64, order_id: OrderId, new_quantity: u64, new_price: Option<i64>) -> Self {
        Self {
            ts,
            kind: EventKind::Modify {
                order_id,
                new_quantity,
                new_price,
            },
        }
    }
}

/// Event payload variants.
///
/// `StopTrigger` and `IcebergRefresh` are normally scheduled by the
/// dispatcher itself, but remain part of the input schema so recorded
/// streams replay byte-for-byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// New order submission.
    Submit {
        /// The fully-formed order.
        order: OrderRequest,
    },
    /// Cancel a live order (resting, dark, or armed stop).
    Cancel {
        /// Target order.
        order_id: OrderId,
    },
    /// Modify a resting order. A pure quantity decrease preserves time
    /// priority; a price change or quantity increase is cancel + resubmit
    /// at the current logical time.
    Modify {
        /// Target order.
        order_id: OrderId,
        /// New total quantity; must be positive.
        new_quantity: u64,
        /// New limit price, when repricing.
        new_price: Option<i64>,
    },
    /// Fire an armed stop. Scheduled by the dispatcher when the last
    /// trade crosses the trigger.
    StopTrigger {
        /// The armed stop order.
        order_id: OrderId,
    },
    /// Re-post a dark iceberg's next displayed slice.
    IcebergRefresh {
        /// The dark iceberg.
        order_id: OrderId,
    },
}
