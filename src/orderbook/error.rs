//! Order book and simulator error types.

use crate::orderbook::order::{OrderId, OwnerTag};
use crate::orderbook::stp::SelfTradePolicy;
use std::fmt;

/// Errors produced by book operations and event validation.
///
/// Every variant maps to an execution-report reason; validation errors are
/// terminal to the offending event and never mutate book state.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum OrderBookError {
    /// Submit with an id that is already live (resting, dark, or armed as
    /// a stop).
    DuplicateOrderId(OrderId),

    /// Cancel or modify against an id that is not live.
    UnknownOrderId(OrderId),

    /// Order or modify quantity is zero.
    NonPositiveQuantity {
        /// The offending order id.
        order_id: OrderId,
    },

    /// Price below zero ticks.
    NegativePrice {
        /// The offending price in ticks.
        price: i64,
    },

    /// Price is not an exact multiple of the configured tick size.
    PriceNotTickAligned {
        /// The offending price in ticks.
        price: i64,
        /// The configured tick size.
        tick_size: i64,
    },

    /// Event timestamp precedes the dispatcher's logical time, or an
    /// order's `submit_ts` exceeds its arrival timestamp.
    TimestampRegression {
        /// Timestamp carried by the event.
        event_ts: i64,
        /// The dispatcher's current logical time.
        current_ts: i64,
    },

    /// POST_ONLY order would have crossed the opposite side.
    PostOnlyWouldCross {
        /// The order's limit price.
        price: i64,
        /// Best opposite price it would have matched.
        opposite_price: i64,
    },

    /// Fill-or-kill order could not be filled in full.
    FokInsufficientLiquidity {
        /// Quantity requested.
        requested: u64,
        /// Crossable quantity available.
        available: u64,
    },

    /// Market order submitted while `allow_market_orders` is off.
    MarketOrdersDisabled,

    /// Iceberg display quantity is zero or exceeds the order quantity.
    InvalidDisplayQuantity {
        /// Displayed slice requested.
        display: u64,
        /// Total order quantity.
        quantity: u64,
    },

    /// Self-trade prevention under `RejectTaker` terminated the taker.
    SelfTradePrevented {
        /// Active policy (always `RejectTaker` for this error).
        policy: SelfTradePolicy,
        /// The taker order id.
        taker_order_id: OrderId,
        /// The owner that collided with itself.
        owner: OwnerTag,
    },

    /// Configuration rejected at construction time.
    InvalidConfiguration {
        /// Description of the failure.
        message: String,
    },
}

impl fmt::Display for OrderBookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderBookError::DuplicateOrderId(id) => {
                write!(f, "duplicate order id: {id} is already live")
            }
            OrderBookError::UnknownOrderId(id) => write!(f, "unknown order id: {id}"),
            OrderBookError::NonPositiveQuantity { order_id } => {
                write!(f, "non-positive quantity on order {order_id}")
            }
            OrderBookError::NegativePrice { price } => {
                write!(f, "negative price: {price} ticks")
            }
            OrderBookError::PriceNotTickAligned { price, tick_size } => {
                write!(
                    f,
                    "price {price} is not a multiple of tick size {tick_size}"
                )
            }
            OrderBookError::TimestampRegression {
                event_ts,
                current_ts,
            } => {
                write!(
                    f,
                    "timestamp regression: event ts {event_ts} < current ts {current_ts}"
                )
            }
            OrderBookError::PostOnlyWouldCross {
                price,
                opposite_price,
            } => {
                write!(
                    f,
                    "post-only at {price} would cross opposite at {opposite_price}"
                )
            }
            OrderBookError::FokInsufficientLiquidity {
                requested,
                available,
            } => {
                write!(
                    f,
                    "fill-or-kill: requested {requested}, crossable {available}"
                )
            }
            OrderBookError::MarketOrdersDisabled => {
                write!(f, "market orders are disabled by configuration")
            }
            OrderBookError::InvalidDisplayQuantity { display, quantity } => {
                write!(
                    f,
                    "invalid display quantity {display} for order quantity {quantity}"
                )
            }
            OrderBookError::SelfTradePrevented {
                policy,
                taker_order_id,
                owner,
            } => {
                write!(
                    f,
                    "self-trade prevented ({policy}): taker {taker_order_id}, {owner}"
                )
            }
            OrderBookError::InvalidConfiguration { message } => {
                write!(f, "invalid configuration: {message}")
            }
        }
    }
}

impl std::error::Error for OrderBookError {}
