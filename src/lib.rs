//! # Event-Driven Limit Order Book Simulator
//!
//! A deterministic limit order book simulator reproducing the matching
//! mechanics of continuous double-auction exchanges: price-time-priority
//! matching, strict timestamp-ordered event dispatch, and execution-cost
//! accounting. Built for backtesters and execution analytics that need
//! realistic partial fills, queue position, and slippage instead of
//! close-price fiction.
//!
//! ## Key Features
//!
//! - **Price-time priority matching**: skip-list price levels with FIFO
//!   order queues, fills at the maker's resting price, partial fills
//!   spanning multiple levels.
//!
//! - **Deterministic event dispatch**: a `(ts, seq)` min-heap drives the
//!   book one event at a time; identical event streams produce
//!   byte-identical trade tapes.
//!
//! - **Order types**: limit, market, stop, stop-limit, and iceberg orders
//!   with DAY / IOC / FOK / GTC / POST_ONLY time-in-force handling.
//!
//! - **Self-trade prevention**: configurable `CANCEL_OLDEST`,
//!   `CANCEL_NEWEST`, or `REJECT_TAKER` policies keyed by owner tag.
//!
//! - **Execution-cost accounting**: per-fill Almgren-Chriss decomposition
//!   into spread, temporary impact, permanent impact, and latency
//!   components.
//!
//! - **Snapshots and reports**: top-of-book and depth snapshots between
//!   events, an append-only trade tape, and execution reports on every
//!   order state transition.
//!
//! ## Example
//!
//! ```rust
//! use lobsim::prelude::*;
//!
//! let config = SimulatorConfig {
//!     tick_size: 1,
//!     self_trade_policy: SelfTradePolicy::CancelOldest,
//!     allow_market_orders: true,
//!     impact: ImpactParams {
//!         eta: 25.0,
//!         gamma: 10.0,
//!         adv: 1_000_000.0,
//!         decay_half_life: 100,
//!     },
//!     iceberg_refresh_delay: 0,
//!     max_stop_cascade_depth: 16,
//! };
//! let mut sim = Simulator::new("SIM", config).unwrap();
//!
//! sim.submit(Event::submit(
//!     1,
//!     OrderRequest::limit(OrderId(1), Side::Buy, 10_000, 100, 1),
//! ));
//! sim.submit(Event::submit(
//!     2,
//!     OrderRequest::limit(OrderId(2), Side::Sell, 9_900, 60, 2),
//! ));
//! sim.run_until(2);
//!
//! let trades = sim.trades();
//! assert_eq!(trades.len(), 1);
//! assert_eq!(trades[0].price_ticks, 10_000); // maker's price
//! assert_eq!(trades[0].quantity, 60);
//! ```
//!
//! ## Design
//!
//! The book is exclusively owned by its dispatcher and processes one
//! event to completion before the next is popped, so no crossed book or
//! stale aggregate is ever observable between events. Prices are `i64`
//! tick counts validated against the configured tick size; monetary
//! conversion is a boundary concern. Multiple instruments are multiple
//! independent `Simulator` instances.
//!
//! Out of scope by design: wall-clock time, network I/O, market-data
//! file decoding, multi-venue routing, and impact-parameter calibration.

pub mod config;
pub mod dispatch;
pub mod impact;
pub mod orderbook;
pub mod prelude;
pub mod serialization;

pub use config::SimulatorConfig;
pub use dispatch::{
    Event, EventKind, EventQueue, ExecutionReport, OrderState, RejectReason, ReportListener,
    Simulator, SubmitHandle,
};
pub use impact::{CostBreakdown, ImpactParams, SlippageLedger};
pub use orderbook::{
    BookOrder, BookSnapshot, DepthLevel, EnrichedSnapshot, LastTrade, MetricFlags, OrderBook,
    OrderBookError, OrderId, OrderKind, OrderRequest, OwnerTag, SelfTradePolicy, Side,
    SnapshotPackage, TimeInForce, Trade, TradeListener,
};
pub use serialization::{EventSerializer, JsonEventSerializer, SerializationError};
