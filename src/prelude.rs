//! Prelude module that re-exports commonly used types.
//!
//! ```rust
//! use lobsim::prelude::*;
//! ```

// Simulator and event stream
pub use crate::dispatch::{
    Event, EventKind, ExecutionReport, OrderState, RejectReason, ReportListener, Simulator,
    SubmitHandle,
};

// Book and order model
pub use crate::orderbook::{
    BookOrder, BookSnapshot, DepthLevel, OrderBook, OrderBookError, OrderId, OrderKind,
    OrderRequest, OwnerTag, SelfTradePolicy, Side, TimeInForce,
};

// Snapshots and tape
pub use crate::orderbook::{EnrichedSnapshot, LastTrade, MetricFlags, Trade, TradeListener};

// Cost accounting and configuration
pub use crate::config::SimulatorConfig;
pub use crate::impact::{CostBreakdown, ImpactParams, SlippageLedger};

// Serialization
pub use crate::serialization::{EventSerializer, JsonEventSerializer, SerializationError};
