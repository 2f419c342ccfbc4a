//! Execution-cost accounting: spread, temporary impact, permanent impact,
//! and latency decomposition per taker fill.
//!
//! The model follows the Almgren-Chriss split. Each executed quantity `q`
//! moves the fair-price estimate by `gamma * q / adv` basis points
//! (permanent, persists) and adds `eta * q / adv` basis points of
//! order-flow pressure (temporary, halves every `decay_half_life` ticks
//! of logical time). Both shifts are folded into the reference mid used
//! for subsequent fills, so sustained one-sided flow pays progressively
//! worse reference prices. Costs are recorded in tick-shares: a price
//! difference in ticks times the executed quantity.

use crate::orderbook::order::{OrderId, Side};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Impact model parameters. No defaults: calibration is the caller's
/// problem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImpactParams {
    /// Temporary impact coefficient, basis points per unit participation
    /// (`qty / adv`).
    pub eta: f64,
    /// Permanent impact coefficient, basis points per unit participation.
    pub gamma: f64,
    /// Average daily volume proxy, shares per session. Must be positive.
    pub adv: f64,
    /// Half-life of the temporary pressure, in ticks of logical time.
    /// Zero means the pressure dissipates before the next event.
    pub decay_half_life: i64,
}

/// Accumulated cost components, in tick-shares.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Mechanical cost of crossing: `(fill - ref_mid) * sign * qty`.
    pub spread: f64,
    /// Dissipating order-flow pressure component.
    pub temporary: f64,
    /// Persistent fair-price shift component.
    pub permanent: f64,
    /// Cost of the submit-to-arrival delay:
    /// `(mid(arrival) - mid(submit)) * sign * qty`.
    pub latency: f64,
}

impl CostBreakdown {
    /// Sum of all four components.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.spread + self.temporary + self.permanent + self.latency
    }

    fn add(&mut self, other: &CostBreakdown) {
        self.spread += other.spread;
        self.temporary += other.temporary;
        self.permanent += other.permanent;
        self.latency += other.latency;
    }
}

/// Stateful cost ledger for one simulated book.
#[derive(Debug)]
pub struct SlippageLedger {
    params: ImpactParams,
    /// Signed temporary pressure in basis points; decays.
    temp_pressure_bps: f64,
    /// Signed permanent shift in basis points; persists.
    perm_shift_bps: f64,
    last_decay_ts: i64,
    /// `(ts, mid)` observations, one per processed event with a defined
    /// mid; answers `mid(submit_ts)` for latency attribution.
    mid_history: Vec<(i64, f64)>,
    total: CostBreakdown,
    per_order: HashMap<OrderId, CostBreakdown>,
}

impl SlippageLedger {
    /// Creates a ledger with validated parameters.
    pub fn new(params: ImpactParams) -> Self {
        Self {
            params,
            temp_pressure_bps: 0.0,
            perm_shift_bps: 0.0,
            last_decay_ts: i64::MIN,
            mid_history: Vec::new(),
            total: CostBreakdown::default(),
            per_order: HashMap::new(),
        }
    }

    /// The configured parameters.
    #[inline]
    pub fn params(&self) -> &ImpactParams {
        &self.params
    }

    /// Advances the decay clock to `ts` and records the observable mid
    /// for later latency lookups. Called once per processed event, before
    /// matching.
    pub fn observe(&mut self, ts: i64, book_mid: Option<f64>) {
        self.decay_to(ts);
        if let Some(mid) = book_mid {
            match self.mid_history.last_mut() {
                Some(last) if last.0 == ts => last.1 = mid,
                _ => self.mid_history.push((ts, mid)),
            }
        }
    }

    /// The impact-adjusted reference mid: the observed mid shifted by the
    /// current permanent and temporary state.
    #[must_use]
    pub fn reference_mid(&self, book_mid: f64) -> f64 {
        book_mid * (1.0 + (self.perm_shift_bps + self.temp_pressure_bps) / 10_000.0)
    }

    /// Last observed mid at or before `ts`.
    #[must_use]
    pub fn mid_at(&self, ts: i64) -> Option<f64> {
        let idx = self.mid_history.partition_point(|&(t, _)| t <= ts);
        idx.checked_sub(1).map(|i| self.mid_history[i].1)
    }

    /// Records one taker fill against the reference mid and pushes its
    /// participation into the impact state.
    pub fn record_fill(
        &mut self,
        taker_id: OrderId,
        side: Side,
        fill_price_ticks: i64,
        quantity: u64,
        reference_mid: f64,
    ) {
        let sign = side.sign();
        let qty = quantity as f64;
        let participation = qty / self.params.adv;

        let temp_bps = self.params.eta * participation;
        let perm_bps = self.params.gamma * participation;

        let cost = CostBreakdown {
            spread: (fill_price_ticks as f64 - reference_mid) * sign * qty,
            temporary: reference_mid * temp_bps / 10_000.0 * qty,
            permanent: reference_mid * perm_bps / 10_000.0 * qty,
            latency: 0.0,
        };

        self.temp_pressure_bps += sign * temp_bps;
        self.perm_shift_bps += sign * perm_bps;

        self.total.add(&cost);
        self.per_order.entry(taker_id).or_default().add(&cost);
    }

    /// Attributes the submit-to-arrival mid drift to latency for an
    /// order's executed quantity. No-op when either mid is unknown.
    pub fn record_latency(
        &mut self,
        taker_id: OrderId,
        side: Side,
        executed_quantity: u64,
        submit_ts: i64,
        arrival_mid: f64,
    ) {
        let Some(submit_mid) = self.mid_at(submit_ts) else {
            return;
        };
        let cost = (arrival_mid - submit_mid) * side.sign() * executed_quantity as f64;
        self.total.latency += cost;
        self.per_order.entry(taker_id).or_default().latency += cost;
    }

    /// Accumulated costs across all orders.
    #[inline]
    pub fn total_cost(&self) -> &CostBreakdown {
        &self.total
    }

    /// Accumulated costs for one order, if it ever took liquidity.
    pub fn order_cost(&self, order_id: OrderId) -> Option<&CostBreakdown> {
        self.per_order.get(&order_id)
    }

    /// Current signed temporary pressure in basis points (post-decay as
    /// of the last `observe`).
    #[inline]
    pub fn temporary_pressure_bps(&self) -> f64 {
        self.temp_pressure_bps
    }

    /// Current signed permanent shift in basis points.
    #[inline]
    pub fn permanent_shift_bps(&self) -> f64 {
        self.perm_shift_bps
    }

    fn decay_to(&mut self, ts: i64) {
        if self.last_decay_ts == i64::MIN {
            self.last_decay_ts = ts;
            return;
        }
        let elapsed = ts.saturating_sub(self.last_decay_ts);
        if elapsed <= 0 {
            return;
        }
        self.last_decay_ts = ts;
        if self.params.decay_half_life <= 0 {
            self.temp_pressure_bps = 0.0;
            return;
        }
        let half_lives = elapsed as f64 / self.params.decay_half_life as f64;
        self.temp_pressure_bps *= 0.5f64.powf(half_lives);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ImpactParams {
        ImpactParams {
            eta: 25.0,
            gamma: 10.0,
            adv: 1_000_000.0,
            decay_half_life: 100,
        }
    }

    #[test]
    fn test_spread_cost_sign_convention() {
        let mut ledger = SlippageLedger::new(params());
        ledger.observe(1, Some(10_000.0));

        // Buy at one tick above mid: positive cost.
        ledger.record_fill(OrderId(1), Side::Buy, 10_001, 100, 10_000.0);
        assert!((ledger.total_cost().spread - 100.0).abs() < 1e-9);

        // Sell at one tick below mid: also positive cost.
        ledger.record_fill(OrderId(2), Side::Sell, 9_999, 100, 10_000.0);
        assert!((ledger.total_cost().spread - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_impact_state_accumulates_and_decays() {
        let mut ledger = SlippageLedger::new(params());
        ledger.observe(0, Some(10_000.0));
        ledger.record_fill(OrderId(1), Side::Buy, 10_001, 100_000, 10_000.0);

        // participation 0.1 -> temp 2.5 bps, perm 1.0 bps
        assert!((ledger.temporary_pressure_bps() - 2.5).abs() < 1e-12);
        assert!((ledger.permanent_shift_bps() - 1.0).abs() < 1e-12);

        // One half-life later the temporary pressure halves; permanent
        // shift does not move.
        ledger.observe(100, Some(10_000.0));
        assert!((ledger.temporary_pressure_bps() - 1.25).abs() < 1e-12);
        assert!((ledger.permanent_shift_bps() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_half_life_dissipates_immediately() {
        let mut ledger = SlippageLedger::new(ImpactParams {
            decay_half_life: 0,
            ..params()
        });
        ledger.observe(0, Some(10_000.0));
        ledger.record_fill(OrderId(1), Side::Buy, 10_001, 100_000, 10_000.0);
        ledger.observe(1, Some(10_000.0));
        assert_eq!(ledger.temporary_pressure_bps(), 0.0);
    }

    #[test]
    fn test_reference_mid_includes_both_shifts() {
        let mut ledger = SlippageLedger::new(params());
        ledger.observe(0, Some(10_000.0));
        ledger.record_fill(OrderId(1), Side::Buy, 10_001, 100_000, 10_000.0);

        // 3.5 bps on 10_000 ticks = 3.5 ticks
        let reference = ledger.reference_mid(10_000.0);
        assert!((reference - 10_003.5).abs() < 1e-9);
    }

    #[test]
    fn test_mid_history_lookup() {
        let mut ledger = SlippageLedger::new(params());
        ledger.observe(10, Some(10_000.0));
        ledger.observe(20, Some(10_010.0));

        assert_eq!(ledger.mid_at(5), None);
        assert_eq!(ledger.mid_at(10), Some(10_000.0));
        assert_eq!(ledger.mid_at(15), Some(10_000.0));
        assert_eq!(ledger.mid_at(25), Some(10_010.0));
    }

    #[test]
    fn test_latency_cost_uses_mid_drift() {
        let mut ledger = SlippageLedger::new(params());
        ledger.observe(10, Some(10_000.0));
        ledger.observe(20, Some(10_004.0));

        // Buy submitted at ts=10, arrived at ts=20: paid 4 ticks of drift
        // on 50 shares.
        ledger.record_latency(OrderId(1), Side::Buy, 50, 10, 10_004.0);
        assert!((ledger.total_cost().latency - 200.0).abs() < 1e-9);
        assert!((ledger.order_cost(OrderId(1)).unwrap().latency - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_per_order_breakdown_totals() {
        let mut ledger = SlippageLedger::new(params());
        ledger.observe(0, Some(10_000.0));
        ledger.record_fill(OrderId(1), Side::Buy, 10_001, 10, 10_000.0);
        ledger.record_fill(OrderId(1), Side::Buy, 10_002, 10, 10_000.0);

        let cost = ledger.order_cost(OrderId(1)).unwrap();
        assert!((cost.spread - 30.0).abs() < 1e-9);
        assert!(cost.total() > cost.spread);
        assert_eq!(ledger.order_cost(OrderId(9)), None);
    }
}
