//! Trade tape records and listener plumbing.

use crate::orderbook::order::{OrderId, Side};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One executed fill on the tape.
///
/// Trades are numbered by a monotone `sequence` assigned at emission, so
/// identical event streams produce byte-identical tapes. The price is
/// always the maker's resting price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Global emission sequence number.
    pub sequence: u64,
    /// Logical timestamp of the event that produced the fill.
    pub ts: i64,
    /// Resting (passive) order.
    pub maker_order_id: OrderId,
    /// Incoming (aggressive) order.
    pub taker_order_id: OrderId,
    /// Execution price in ticks; the maker's resting price.
    pub price_ticks: i64,
    /// Executed quantity.
    pub quantity: u64,
    /// Side of the aggressor.
    pub aggressor_side: Side,
}

/// Compact copy of the most recent trade, kept by the book for stop
/// triggers and snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastTrade {
    /// Execution price in ticks.
    pub price_ticks: i64,
    /// Executed quantity.
    pub quantity: u64,
    /// Logical timestamp of the fill.
    pub ts: i64,
    /// Side of the aggressor.
    pub aggressor_side: Side,
}

impl From<&Trade> for LastTrade {
    fn from(trade: &Trade) -> Self {
        Self {
            price_ticks: trade.price_ticks,
            quantity: trade.quantity,
            ts: trade.ts,
            aggressor_side: trade.aggressor_side,
        }
    }
}

/// Callback invoked synchronously after each trade, in emission order.
///
/// Listeners that want to submit follow-up orders do so through a
/// [`SubmitHandle`](crate::dispatch::SubmitHandle) captured by the
/// closure; injected events are constrained to `ts >= current_ts`.
pub type TradeListener = Arc<dyn Fn(&Trade) + Send + Sync>;
