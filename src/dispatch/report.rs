//! Execution reports and the order state machine.

use crate::orderbook::error::OrderBookError;
use crate::orderbook::order::OrderId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Order lifecycle state.
///
/// `Pending -> Accepted -> PartiallyFilled* -> Filled | Cancelled |
/// Rejected`. A transition to `Rejected` is terminal and implies no book
/// state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    /// Received, not yet validated.
    Pending,
    /// Validated; armed (stops), resting, or about to match.
    Accepted,
    /// Some quantity executed, some remains.
    PartiallyFilled,
    /// Fully executed.
    Filled,
    /// Removed with unexecuted quantity (explicit cancel, IOC remainder,
    /// exhausted market order, STP cancellation).
    Cancelled,
    /// Refused without touching the book.
    Rejected,
}

impl OrderState {
    /// `true` for states no further transition can leave.
    #[must_use]
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Cancelled | OrderState::Rejected
        )
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderState::Pending => write!(f, "PENDING"),
            OrderState::Accepted => write!(f, "ACCEPTED"),
            OrderState::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            OrderState::Filled => write!(f, "FILLED"),
            OrderState::Cancelled => write!(f, "CANCELLED"),
            OrderState::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Machine-readable reason attached to rejections and forced
/// cancellations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum RejectReason {
    /// Submit with an id that was already used this run.
    DuplicateOrderId,
    /// Cancel/modify against an id that is not live.
    UnknownOrderId,
    /// Zero quantity.
    NonPositiveQuantity,
    /// Price below zero ticks.
    NegativePrice,
    /// Price not a multiple of the tick size.
    PriceNotTickAligned,
    /// Event or injection timestamp in the past.
    TimestampRegression,
    /// POST_ONLY order would have crossed.
    PostOnlyWouldCross,
    /// Fill-or-kill could not fill in full.
    FokInsufficientLiquidity,
    /// Market orders disabled by configuration.
    MarketOrdersDisabled,
    /// Iceberg display quantity out of range.
    InvalidDisplayQuantity,
    /// Self-trade prevention acted on this order.
    SelfTradePrevented,
    /// Stop trigger cascade exceeded the configured depth cap.
    StopCascadeExceeded,
}

impl From<&OrderBookError> for RejectReason {
    fn from(error: &OrderBookError) -> Self {
        match error {
            OrderBookError::DuplicateOrderId(_) => RejectReason::DuplicateOrderId,
            OrderBookError::UnknownOrderId(_) => RejectReason::UnknownOrderId,
            OrderBookError::NonPositiveQuantity { .. } => RejectReason::NonPositiveQuantity,
            OrderBookError::NegativePrice { .. } => RejectReason::NegativePrice,
            OrderBookError::PriceNotTickAligned { .. } => RejectReason::PriceNotTickAligned,
            OrderBookError::TimestampRegression { .. } => RejectReason::TimestampRegression,
            OrderBookError::PostOnlyWouldCross { .. } => RejectReason::PostOnlyWouldCross,
            OrderBookError::FokInsufficientLiquidity { .. } => {
                RejectReason::FokInsufficientLiquidity
            }
            OrderBookError::MarketOrdersDisabled => RejectReason::MarketOrdersDisabled,
            OrderBookError::InvalidDisplayQuantity { .. } => RejectReason::InvalidDisplayQuantity,
            OrderBookError::SelfTradePrevented { .. } => RejectReason::SelfTradePrevented,
            // Construction-time failures never reach the report path; map
            // to the closest terminal reason if they ever do.
            _ => RejectReason::UnknownOrderId,
        }
    }
}

/// Emitted on every order state transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// The order this report describes.
    pub order_id: OrderId,
    /// State entered.
    pub state: OrderState,
    /// Total quantity executed so far.
    pub cumulative_filled: u64,
    /// Quantity-weighted average fill price in ticks; `None` before the
    /// first fill.
    pub average_fill_price_ticks: Option<f64>,
    /// Why, for rejections and forced cancellations.
    pub reason: Option<RejectReason>,
}

/// Callback invoked synchronously on every emitted report.
pub type ReportListener = Arc<dyn Fn(&ExecutionReport) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(OrderState::Filled.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
        assert!(OrderState::Rejected.is_terminal());
        assert!(!OrderState::Accepted.is_terminal());
        assert!(!OrderState::PartiallyFilled.is_terminal());
    }

    #[test]
    fn test_reason_from_error() {
        let error = OrderBookError::FokInsufficientLiquidity {
            requested: 100,
            available: 40,
        };
        assert_eq!(
            RejectReason::from(&error),
            RejectReason::FokInsufficientLiquidity
        );
    }

    #[test]
    fn test_report_serializes_screaming_case() {
        let report = ExecutionReport {
            order_id: OrderId(1),
            state: OrderState::PartiallyFilled,
            cumulative_filled: 10,
            average_fill_price_ticks: Some(10_000.0),
            reason: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state"], "PARTIALLY_FILLED");
    }
}
