//! The event dispatcher: drives one book forward in strict `(ts, seq)`
//! order.
//!
//! A `Simulator` owns its book, heap, stop tables, cost ledger, tape, and
//! report log. Each popped event executes to completion (every fill
//! emitted, residual rested or discarded, stops scanned) before the next
//! event is considered, so no intermediate crossed or stale-aggregate
//! state is ever observable. Listener callbacks run synchronously and may
//! inject follow-up events through a [`SubmitHandle`]; injections land in
//! the heap behind the event that caused them.

use crate::config::SimulatorConfig;
use crate::dispatch::event::{Event, EventKind};
use crate::dispatch::queue::{EventQueue, QueuedEvent};
use crate::dispatch::report::{ExecutionReport, OrderState, RejectReason, ReportListener};
use crate::impact::SlippageLedger;
use crate::orderbook::book::OrderBook;
use crate::orderbook::error::OrderBookError;
use crate::orderbook::matching::{IncomingOrder, MatchOutcome, StpTermination};
use crate::orderbook::order::{
    BookOrder, OrderId, OrderKind, OrderRequest, Side, TimeInForce,
};
use crate::orderbook::snapshot::{BookSnapshot, EnrichedSnapshot, MetricFlags};
use crate::orderbook::trade::{LastTrade, Trade, TradeListener};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace, warn};

/// Cloneable handle through which subscriber callbacks enqueue events
/// while the dispatcher is draining.
///
/// Injected events are validated against the dispatcher's logical clock
/// when they are folded into the heap; submitting in the past is
/// rejected.
#[derive(Clone, Default)]
pub struct SubmitHandle {
    inner: Arc<Mutex<Vec<Event>>>,
}

impl SubmitHandle {
    /// Queues an event for injection after the current event completes.
    pub fn submit(&self, event: Event) {
        self.inner.lock().expect("submit handle poisoned").push(event);
    }

    fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.inner.lock().expect("submit handle poisoned"))
    }
}

/// Per-order bookkeeping for reports, conservation, and duplicate
/// detection. An entry exists for every order ever accepted.
#[derive(Debug)]
struct OrderStats {
    state: OrderState,
    filled: u64,
    notional_ticks: i128,
}

impl OrderStats {
    fn new() -> Self {
        Self {
            state: OrderState::Pending,
            filled: 0,
            notional_ticks: 0,
        }
    }

    fn average_fill_price(&self) -> Option<f64> {
        (self.filled > 0).then(|| self.notional_ticks as f64 / self.filled as f64)
    }
}

/// Event-driven simulator for one instrument.
pub struct Simulator {
    book: OrderBook,
    config: SimulatorConfig,
    queue: EventQueue,
    current_ts: i64,
    next_arrival_seq: u64,
    next_trade_seq: u64,

    /// Every armed stop (and fired-but-unprocessed stop) by id.
    armed_stops: HashMap<OrderId, OrderRequest>,
    /// Buy stops by `(trigger, id)`; trigger when last trade >= trigger.
    buy_triggers: BTreeMap<(i64, u64), OrderId>,
    /// Sell stops by `(trigger, id)`; trigger when last trade <= trigger.
    sell_triggers: BTreeMap<(i64, u64), OrderId>,

    stats: HashMap<OrderId, OrderStats>,
    tape: Vec<Trade>,
    reports: Vec<ExecutionReport>,
    ledger: SlippageLedger,

    trade_listener: Option<TradeListener>,
    report_listener: Option<ReportListener>,
    injected: SubmitHandle,
}

impl Simulator {
    /// Creates a simulator with a validated configuration.
    ///
    /// # Errors
    /// `InvalidConfiguration` when a config value is out of range.
    pub fn new(symbol: &str, config: SimulatorConfig) -> Result<Self, OrderBookError> {
        config.validate()?;
        let book = OrderBook::new(symbol, config.tick_size);
        let ledger = SlippageLedger::new(config.impact);
        Ok(Self {
            book,
            config,
            queue: EventQueue::new(),
            current_ts: i64::MIN,
            next_arrival_seq: 0,
            next_trade_seq: 0,
            armed_stops: HashMap::new(),
            buy_triggers: BTreeMap::new(),
            sell_triggers: BTreeMap::new(),
            stats: HashMap::new(),
            tape: Vec::new(),
            reports: Vec::new(),
            ledger,
            trade_listener: None,
            report_listener: None,
            injected: SubmitHandle::default(),
        })
    }

    /// The underlying book, for read-only inspection between events.
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// The active configuration.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Current logical time.
    #[inline]
    pub fn current_ts(&self) -> i64 {
        self.current_ts
    }

    /// The append-only trade tape, in emission order.
    pub fn trades(&self) -> &[Trade] {
        &self.tape
    }

    /// Every execution report emitted so far, in emission order.
    pub fn reports(&self) -> &[ExecutionReport] {
        &self.reports
    }

    /// The slippage and impact ledger.
    pub fn costs(&self) -> &SlippageLedger {
        &self.ledger
    }

    /// Installs a trade listener invoked synchronously per fill.
    pub fn set_trade_listener(&mut self, listener: TradeListener) {
        self.trade_listener = Some(listener);
    }

    /// Installs a report listener invoked synchronously per transition.
    pub fn set_report_listener(&mut self, listener: ReportListener) {
        self.report_listener = Some(listener);
    }

    /// A handle for listener callbacks (or external producers) to inject
    /// events while the dispatcher runs.
    pub fn submit_handle(&self) -> SubmitHandle {
        self.injected.clone()
    }

    /// Accepts an event into the heap.
    ///
    /// Returns `false`, and emits a `TimestampRegression` report when
    /// the event names an order, if `event.ts` precedes logical time.
    /// All downstream effects surface through trades, reports, and
    /// snapshots.
    pub fn submit(&mut self, event: Event) -> bool {
        if event.ts < self.current_ts {
            warn!(
                "rejected event at ts {} behind logical time {}",
                event.ts, self.current_ts
            );
            if let Some(order_id) = event_order_id(&event.kind) {
                self.report_event_error(
                    order_id,
                    &OrderBookError::TimestampRegression {
                        event_ts: event.ts,
                        current_ts: self.current_ts,
                    },
                );
            }
            return false;
        }
        self.queue.push(event.ts, event.kind);
        true
    }

    /// Drains events with `ts <= until_ts`, then advances logical time to
    /// `until_ts`.
    pub fn run_until(&mut self, until_ts: i64) {
        loop {
            self.fold_injected();
            match self.queue.peek_ts() {
                Some(ts) if ts <= until_ts => {
                    let event = self.queue.pop().expect("peeked event vanished");
                    self.process(event);
                }
                _ => break,
            }
        }
        self.fold_injected();
        if until_ts > self.current_ts {
            self.current_ts = until_ts;
        }
    }

    /// Drains every queued event.
    pub fn run_to_completion(&mut self) {
        loop {
            self.fold_injected();
            let Some(event) = self.queue.pop() else { break };
            self.process(event);
        }
    }

    /// Projection of the book between events.
    pub fn snapshot(&self, depth_levels: usize) -> BookSnapshot {
        BookSnapshot {
            symbol: self.book.symbol().to_string(),
            ts: self.current_ts,
            best_bid: self.book.best_bid(),
            best_ask: self.book.best_ask(),
            spread: self.book.spread(),
            mid_double_ticks: self.book.mid_double_ticks(),
            bid_depth: self.book.depth(Side::Buy, depth_levels),
            ask_depth: self.book.depth(Side::Sell, depth_levels),
            last_trade: self.book.last_trade(),
        }
    }

    /// Snapshot with selected metrics pre-computed.
    pub fn enriched_snapshot(&self, depth_levels: usize, flags: MetricFlags) -> EnrichedSnapshot {
        EnrichedSnapshot::compute(self.snapshot(depth_levels), flags)
    }

    // ─── Event loop ─────────────────────────────────────────────────────

    fn fold_injected(&mut self) {
        for event in self.injected.drain() {
            if event.ts < self.current_ts {
                warn!(
                    "dropped injected event at ts {} behind logical time {}",
                    event.ts, self.current_ts
                );
                if let Some(order_id) = event_order_id(&event.kind) {
                    self.report_event_error(
                        order_id,
                        &OrderBookError::TimestampRegression {
                            event_ts: event.ts,
                            current_ts: self.current_ts,
                        },
                    );
                }
                continue;
            }
            self.queue.push(event.ts, event.kind);
        }
    }

    fn process(&mut self, event: QueuedEvent) {
        debug_assert!(event.ts >= self.current_ts);
        self.current_ts = event.ts;
        self.ledger.observe(event.ts, self.book.mid_price());
        trace!("processing ts {} seq {} {:?}", event.ts, event.seq, event.kind);

        match event.kind {
            EventKind::Submit { order } => self.handle_submit(order, event.ts, event.cascade_depth),
            EventKind::Cancel { order_id } => self.handle_cancel(order_id),
            EventKind::Modify {
                order_id,
                new_quantity,
                new_price,
            } => self.handle_modify(order_id, new_quantity, new_price, event.ts),
            EventKind::StopTrigger { order_id } => {
                self.handle_stop_trigger(order_id, event.ts, event.cascade_depth)
            }
            EventKind::IcebergRefresh { order_id } => {
                self.handle_iceberg_refresh(order_id, event.ts)
            }
        }
    }

    // ─── Submission ─────────────────────────────────────────────────────

    fn handle_submit(&mut self, order: OrderRequest, ts: i64, cascade_depth: u32) {
        if let Err(error) = self.validate_submission(&order, ts) {
            self.report_event_error(order.id, &error);
            return;
        }

        self.stats.insert(order.id, OrderStats::new());

        if order.kind.is_stop() {
            self.transition(order.id, OrderState::Accepted, None);
            self.arm_stop(order, ts, cascade_depth);
        } else {
            self.execute(order, ts, cascade_depth, true);
        }
    }

    fn validate_submission(&self, order: &OrderRequest, ts: i64) -> Result<(), OrderBookError> {
        if self.stats.contains_key(&order.id) {
            return Err(OrderBookError::DuplicateOrderId(order.id));
        }
        if order.quantity == 0 {
            return Err(OrderBookError::NonPositiveQuantity { order_id: order.id });
        }
        if order.submit_ts > ts {
            return Err(OrderBookError::TimestampRegression {
                event_ts: order.submit_ts,
                current_ts: ts,
            });
        }
        match order.kind {
            OrderKind::Market => {
                if !self.config.allow_market_orders {
                    return Err(OrderBookError::MarketOrdersDisabled);
                }
            }
            OrderKind::Limit => self.book.validate_price(order.price)?,
            OrderKind::Iceberg { display_quantity } => {
                self.book.validate_price(order.price)?;
                if display_quantity == 0 || display_quantity > order.quantity {
                    return Err(OrderBookError::InvalidDisplayQuantity {
                        display: display_quantity,
                        quantity: order.quantity,
                    });
                }
            }
            OrderKind::Stop { trigger_price } => {
                self.book.validate_price(trigger_price)?;
                if !self.config.allow_market_orders {
                    return Err(OrderBookError::MarketOrdersDisabled);
                }
            }
            OrderKind::StopLimit { trigger_price } => {
                self.book.validate_price(order.price)?;
                self.book.validate_price(trigger_price)?;
            }
        }
        Ok(())
    }

    // ─── Aggressive execution ───────────────────────────────────────────

    /// Admission checks, the matching walk, and residual handling for an
    /// aggressive order. `announce_accept` emits the `Accepted` report
    /// once the TIF admission checks pass; resubmission paths (modify,
    /// triggered stops) were announced long ago and pass `false`.
    fn execute(&mut self, order: OrderRequest, ts: i64, cascade_depth: u32, announce_accept: bool) {
        let limit_price = match order.kind {
            OrderKind::Market => None,
            _ => Some(order.price),
        };

        if order.time_in_force == TimeInForce::PostOnly {
            if let Some(limit) = limit_price {
                if let Some(opposite_price) = self.book.would_cross(order.side, limit) {
                    self.reject_order(
                        order.id,
                        &OrderBookError::PostOnlyWouldCross {
                            price: limit,
                            opposite_price,
                        },
                    );
                    return;
                }
            }
        }

        if order.time_in_force == TimeInForce::Fok {
            let available =
                self.book
                    .crossable_quantity(order.side, order.quantity, limit_price, order.owner);
            if available < order.quantity {
                self.reject_order(
                    order.id,
                    &OrderBookError::FokInsufficientLiquidity {
                        requested: order.quantity,
                        available,
                    },
                );
                return;
            }
        }

        if announce_accept {
            self.transition(order.id, OrderState::Accepted, None);
        }

        let incoming = IncomingOrder {
            id: order.id,
            side: order.side,
            limit_price,
            quantity: order.quantity,
            owner: order.owner,
        };
        let outcome = self.run_match(incoming, ts, cascade_depth, order.submit_ts);

        if outcome.remaining_quantity == 0 {
            self.transition(order.id, OrderState::Filled, None);
            return;
        }
        if outcome.executed_quantity > 0 {
            self.transition(order.id, OrderState::PartiallyFilled, None);
        }

        match outcome.taker_termination {
            Some(StpTermination::RejectTaker) => {
                let state = if outcome.executed_quantity == 0 {
                    OrderState::Rejected
                } else {
                    OrderState::Cancelled
                };
                self.transition(order.id, state, Some(RejectReason::SelfTradePrevented));
            }
            Some(StpTermination::CancelNewest) => {
                self.transition(
                    order.id,
                    OrderState::Cancelled,
                    Some(RejectReason::SelfTradePrevented),
                );
            }
            None => {
                let rests = !matches!(order.kind, OrderKind::Market)
                    && !matches!(order.time_in_force, TimeInForce::Ioc | TimeInForce::Fok);
                if rests {
                    let display = match order.kind {
                        OrderKind::Iceberg { display_quantity } => Some(display_quantity),
                        _ => None,
                    };
                    let resting = Arc::new(BookOrder::new(
                        order.id,
                        order.side,
                        order.price,
                        outcome.remaining_quantity,
                        display,
                        order.time_in_force,
                        order.submit_ts,
                        self.next_arrival_seq,
                        order.owner,
                    ));
                    self.next_arrival_seq += 1;
                    if let Err(error) = self.book.insert_resting(resting) {
                        // Unreachable while duplicate admission holds.
                        self.reject_order(order.id, &error);
                    }
                } else {
                    // Market remainder on an exhausted side, or IOC/FOK
                    // residual: discard.
                    self.transition(order.id, OrderState::Cancelled, None);
                }
            }
        }
    }

    /// Runs the matching walk and publishes its effects: trades, maker
    /// transitions, STP cancellations, stop scans, iceberg refresh
    /// scheduling, and cost accounting.
    fn run_match(
        &mut self,
        incoming: IncomingOrder,
        ts: i64,
        cascade_depth: u32,
        submit_ts: i64,
    ) -> MatchOutcome {
        let pre_match_mid = self.book.mid_price();
        let reference_mid = pre_match_mid.map(|mid| self.ledger.reference_mid(mid));

        let outcome = self
            .book
            .match_incoming(&incoming, self.config.self_trade_policy);

        for maker_id in &outcome.cancelled_makers {
            self.transition(
                *maker_id,
                OrderState::Cancelled,
                Some(RejectReason::SelfTradePrevented),
            );
        }

        for fill in &outcome.fills {
            let trade = Trade {
                sequence: self.next_trade_seq,
                ts,
                maker_order_id: fill.maker_order_id,
                taker_order_id: incoming.id,
                price_ticks: fill.price,
                quantity: fill.quantity,
                aggressor_side: incoming.side,
            };
            self.next_trade_seq += 1;
            self.book.record_trade(LastTrade::from(&trade));
            self.tape.push(trade);

            if let Some(ref_mid) = reference_mid {
                self.ledger
                    .record_fill(incoming.id, incoming.side, fill.price, fill.quantity, ref_mid);
            }

            self.record_fill_stats(fill.maker_order_id, fill.price, fill.quantity);
            let maker_state = if fill.maker_completed {
                OrderState::Filled
            } else {
                OrderState::PartiallyFilled
            };
            self.transition(fill.maker_order_id, maker_state, None);
            self.record_fill_stats(incoming.id, fill.price, fill.quantity);

            if let Some(listener) = self.trade_listener.clone() {
                listener(&trade);
            }
            self.scan_stops(fill.price, ts, cascade_depth);
        }

        for iceberg_id in &outcome.icebergs_exhausted {
            self.queue.push(
                ts + self.config.iceberg_refresh_delay,
                EventKind::IcebergRefresh {
                    order_id: *iceberg_id,
                },
            );
        }

        if outcome.executed_quantity > 0 && submit_ts < ts {
            if let Some(mid) = pre_match_mid {
                self.ledger.record_latency(
                    incoming.id,
                    incoming.side,
                    outcome.executed_quantity,
                    submit_ts,
                    mid,
                );
            }
        }

        outcome
    }

    // ─── Cancel / modify ────────────────────────────────────────────────

    fn handle_cancel(&mut self, order_id: OrderId) {
        if let Some(request) = self.armed_stops.remove(&order_id) {
            self.disarm_trigger(&request);
            self.transition(order_id, OrderState::Cancelled, None);
            return;
        }
        match self.book.cancel(order_id) {
            Ok(_) => self.transition(order_id, OrderState::Cancelled, None),
            Err(error) => self.report_event_error(order_id, &error),
        }
    }

    fn handle_modify(
        &mut self,
        order_id: OrderId,
        new_quantity: u64,
        new_price: Option<i64>,
        ts: i64,
    ) {
        if new_quantity == 0 {
            self.report_event_error(order_id, &OrderBookError::NonPositiveQuantity { order_id });
            return;
        }
        if let Some(price) = new_price {
            if let Err(error) = self.book.validate_price(price) {
                self.report_event_error(order_id, &error);
                return;
            }
        }

        // Armed stops carry no queue priority; amend in place.
        if let Some(mut request) = self.armed_stops.remove(&order_id) {
            self.disarm_trigger(&request);
            request.quantity = new_quantity;
            if let Some(price) = new_price {
                request.price = price;
            }
            self.arm_stop_entry(request);
            self.acknowledge(order_id);
            return;
        }

        let Some(order) = self.book.get_order(order_id) else {
            self.report_event_error(order_id, &OrderBookError::UnknownOrderId(order_id));
            return;
        };

        let price_change = new_price.is_some_and(|p| p != order.price());
        let quantity_increase = new_quantity > order.remaining();

        if !price_change && !quantity_increase {
            if new_quantity < order.remaining() {
                if let Err(error) = self.book.reduce_quantity(order_id, new_quantity) {
                    self.report_event_error(order_id, &error);
                    return;
                }
            }
            self.acknowledge(order_id);
            return;
        }

        // Price change or quantity increase forfeits priority: cancel and
        // resubmit at the current logical time, through full matching.
        debug!("modify {} loses priority, resubmitting at {}", order_id, ts);
        let display = order.display_quantity();
        let kind = match display {
            Some(display_quantity) => OrderKind::Iceberg { display_quantity },
            None => OrderKind::Limit,
        };
        let request = OrderRequest {
            id: order_id,
            side: order.side(),
            kind,
            price: new_price.unwrap_or_else(|| order.price()),
            quantity: new_quantity,
            time_in_force: order.time_in_force(),
            submit_ts: ts,
            owner: order.owner(),
        };
        if self.book.cancel(order_id).is_err() {
            self.report_event_error(order_id, &OrderBookError::UnknownOrderId(order_id));
            return;
        }
        self.execute(request, ts, 0, false);
    }

    // ─── Stops ──────────────────────────────────────────────────────────

    fn arm_stop(&mut self, order: OrderRequest, ts: i64, cascade_depth: u32) {
        let trigger = stop_trigger_price(&order);
        let order_id = order.id;
        let side = order.side;
        self.arm_stop_entry(order);
        debug!("armed {} stop {} trigger {}", side, order_id, trigger);

        // A stop can arm already in the money against the last trade.
        if let Some(last) = self.book.last_trade() {
            if stop_crossed(side, trigger, last.price_ticks) {
                self.fire_stop(order_id, side, trigger, ts, cascade_depth);
            }
        }
    }

    fn arm_stop_entry(&mut self, order: OrderRequest) {
        let trigger = stop_trigger_price(&order);
        let key = (trigger, order.id.0);
        match order.side {
            Side::Buy => {
                self.buy_triggers.insert(key, order.id);
            }
            Side::Sell => {
                self.sell_triggers.insert(key, order.id);
            }
        }
        self.armed_stops.insert(order.id, order);
    }

    fn disarm_trigger(&mut self, request: &OrderRequest) {
        let key = (stop_trigger_price(request), request.id.0);
        match request.side {
            Side::Buy => self.buy_triggers.remove(&key),
            Side::Sell => self.sell_triggers.remove(&key),
        };
    }

    fn fire_stop(&mut self, order_id: OrderId, side: Side, trigger: i64, ts: i64, depth: u32) {
        let key = (trigger, order_id.0);
        match side {
            Side::Buy => self.buy_triggers.remove(&key),
            Side::Sell => self.sell_triggers.remove(&key),
        };
        if depth > self.config.max_stop_cascade_depth {
            warn!(
                "stop {} dropped: cascade depth {} exceeds cap {}",
                order_id, depth, self.config.max_stop_cascade_depth
            );
            self.armed_stops.remove(&order_id);
            self.transition(
                order_id,
                OrderState::Cancelled,
                Some(RejectReason::StopCascadeExceeded),
            );
            return;
        }
        // Processes strictly after the triggering trade's event: same ts,
        // higher sequence.
        self.queue
            .push_with_depth(ts, EventKind::StopTrigger { order_id }, depth);
    }

    /// Scans both trigger tables against a trade print. Buy stops fire
    /// when the print is at or above their trigger, sell stops at or
    /// below.
    fn scan_stops(&mut self, trade_price: i64, ts: i64, cascade_depth: u32) {
        let next_depth = cascade_depth + 1;

        let buy_fired: Vec<(i64, OrderId)> = self
            .buy_triggers
            .range(..=(trade_price, u64::MAX))
            .map(|(&(trigger, _), &id)| (trigger, id))
            .collect();
        for (trigger, order_id) in buy_fired {
            self.fire_stop(order_id, Side::Buy, trigger, ts, next_depth);
        }

        let sell_fired: Vec<(i64, OrderId)> = self
            .sell_triggers
            .range((trade_price, 0)..)
            .map(|(&(trigger, _), &id)| (trigger, id))
            .collect();
        for (trigger, order_id) in sell_fired {
            self.fire_stop(order_id, Side::Sell, trigger, ts, next_depth);
        }
    }

    fn handle_stop_trigger(&mut self, order_id: OrderId, ts: i64, cascade_depth: u32) {
        // Cancelled between firing and processing: the trigger is a no-op.
        let Some(request) = self.armed_stops.remove(&order_id) else {
            return;
        };
        debug!("stop {} triggered at ts {}", order_id, ts);

        let kind = match request.kind {
            OrderKind::Stop { .. } => OrderKind::Market,
            OrderKind::StopLimit { .. } => OrderKind::Limit,
            other => other,
        };
        let converted = OrderRequest {
            kind,
            // Time priority dates from the trigger, not the arming.
            submit_ts: ts,
            ..request
        };
        self.execute(converted, ts, cascade_depth, false);
    }

    // ─── Iceberg refresh ────────────────────────────────────────────────

    fn handle_iceberg_refresh(&mut self, order_id: OrderId, ts: i64) {
        // Cancelled while dark: nothing to refresh.
        let Some(order) = self.book.take_dark(order_id) else {
            return;
        };
        let sequence = self.next_arrival_seq;
        self.next_arrival_seq += 1;
        order.refresh_slice(ts, sequence);

        if self.book.would_cross(order.side(), order.price()).is_some() {
            // An opposite limit rested at this price while the iceberg was
            // dark. Resolve the cross before the slice becomes observable:
            // the refreshed slice acts as the aggressor.
            let incoming = IncomingOrder {
                id: order.id(),
                side: order.side(),
                limit_price: Some(order.price()),
                quantity: order.visible(),
                owner: order.owner(),
            };
            let outcome = self.run_match(incoming, ts, 0, ts);
            order.fill(outcome.executed_quantity);

            if order.remaining() == 0 {
                self.book.remove_tracking(order.id());
                self.transition(order.id(), OrderState::Filled, None);
                return;
            }
            if outcome.executed_quantity > 0 {
                self.transition(order.id(), OrderState::PartiallyFilled, None);
            }
            if order.visible() == 0 {
                // Slice consumed aggressively; hidden reserve waits for
                // the next refresh.
                self.book.park_dark(order);
                self.queue.push(
                    ts + self.config.iceberg_refresh_delay,
                    EventKind::IcebergRefresh { order_id },
                );
                return;
            }
        }
        self.book.rest_refreshed(order);
    }

    // ─── Reports & stats ────────────────────────────────────────────────

    fn record_fill_stats(&mut self, order_id: OrderId, price: i64, quantity: u64) {
        let stats = self.stats.entry(order_id).or_insert_with(OrderStats::new);
        stats.filled += quantity;
        stats.notional_ticks += price as i128 * quantity as i128;
    }

    /// Moves an order to `state` and emits the report.
    fn transition(&mut self, order_id: OrderId, state: OrderState, reason: Option<RejectReason>) {
        let Some(stats) = self.stats.get_mut(&order_id) else {
            return;
        };
        stats.state = state;
        let report = ExecutionReport {
            order_id,
            state,
            cumulative_filled: stats.filled,
            average_fill_price_ticks: stats.average_fill_price(),
            reason,
        };
        self.push_report(report);
    }

    /// Terminal rejection of an accepted order.
    fn reject_order(&mut self, order_id: OrderId, error: &OrderBookError) {
        debug!("rejecting {}: {}", order_id, error);
        self.transition(order_id, OrderState::Rejected, Some(RejectReason::from(error)));
    }

    /// Reports an event-level failure without changing any order state:
    /// validation rejects before acceptance, and no-op cancels/modifies.
    fn report_event_error(&mut self, order_id: OrderId, error: &OrderBookError) {
        debug!("event error for {}: {}", order_id, error);
        let (state, cumulative_filled, average) = match self.stats.get(&order_id) {
            Some(stats) => (stats.state, stats.filled, stats.average_fill_price()),
            None => (OrderState::Rejected, 0, None),
        };
        let report = ExecutionReport {
            order_id,
            state,
            cumulative_filled,
            average_fill_price_ticks: average,
            reason: Some(RejectReason::from(error)),
        };
        self.push_report(report);
    }

    /// Re-emits the current state with no reason: a successful modify
    /// acknowledgement.
    fn acknowledge(&mut self, order_id: OrderId) {
        if let Some(stats) = self.stats.get(&order_id) {
            let report = ExecutionReport {
                order_id,
                state: stats.state,
                cumulative_filled: stats.filled,
                average_fill_price_ticks: stats.average_fill_price(),
                reason: None,
            };
            self.push_report(report);
        }
    }

    fn push_report(&mut self, report: ExecutionReport) {
        self.reports.push(report);
        if let Some(listener) = self.report_listener.clone() {
            listener(&report);
        }
    }
}

fn stop_trigger_price(order: &OrderRequest) -> i64 {
    match order.kind {
        OrderKind::Stop { trigger_price } | OrderKind::StopLimit { trigger_price } => trigger_price,
        _ => unreachable!("not a stop order"),
    }
}

fn stop_crossed(side: Side, trigger: i64, last_trade_price: i64) -> bool {
    match side {
        Side::Buy => last_trade_price >= trigger,
        Side::Sell => last_trade_price <= trigger,
    }
}

fn event_order_id(kind: &EventKind) -> Option<OrderId> {
    match kind {
        EventKind::Submit { order } => Some(order.id),
        EventKind::Cancel { order_id }
        | EventKind::Modify { order_id, .. }
        | EventKind::StopTrigger { order_id }
        | EventKind::IcebergRefresh { order_id } => Some(*order_id),
    }
}
