//! Slippage accounting observed through the simulator.

use lobsim::prelude::*;

fn config(eta: f64, gamma: f64) -> SimulatorConfig {
    SimulatorConfig {
        tick_size: 1,
        self_trade_policy: SelfTradePolicy::CancelOldest,
        allow_market_orders: true,
        impact: ImpactParams {
            eta,
            gamma,
            adv: 100_000.0,
            decay_half_life: 100,
        },
        iceberg_refresh_delay: 0,
        max_stop_cascade_depth: 16,
    }
}

fn limit(id: u64, side: Side, price: i64, qty: u64, ts: i64) -> Event {
    Event::submit(ts, OrderRequest::limit(OrderId(id), side, price, qty, ts))
}

#[test]
fn test_spread_cost_for_a_marketable_buy() {
    // Zero impact coefficients isolate the spread component.
    let mut sim = Simulator::new("SIM", config(0.0, 0.0)).unwrap();
    sim.submit(limit(1, Side::Buy, 9_990, 100, 1));
    sim.submit(limit(2, Side::Sell, 10_010, 100, 1));
    // Crossing buy: fills 40 at 10_010 against a pre-match mid of 10_000.
    sim.submit(limit(3, Side::Buy, 10_010, 40, 2));
    sim.run_until(2);

    let cost = sim.costs().order_cost(OrderId(3)).unwrap();
    // (10_010 - 10_000) * +1 * 40
    assert!((cost.spread - 400.0).abs() < 1e-9);
    assert_eq!(cost.temporary, 0.0);
    assert_eq!(cost.permanent, 0.0);
    assert_eq!(cost.latency, 0.0);
}

#[test]
fn test_impact_components_scale_with_participation() {
    let mut sim = Simulator::new("SIM", config(20.0, 10.0)).unwrap();
    sim.submit(limit(1, Side::Buy, 9_990, 100_000, 1));
    sim.submit(limit(2, Side::Sell, 10_010, 100_000, 1));
    sim.submit(limit(3, Side::Buy, 10_010, 10_000, 2));
    sim.run_until(2);

    let cost = sim.costs().order_cost(OrderId(3)).unwrap();
    // participation = 0.1: temp 2 bps, perm 1 bps on a 10_000 mid.
    assert!((cost.temporary - 10_000.0 * 2.0 / 10_000.0 * 10_000.0).abs() < 1e-6);
    assert!((cost.permanent - 10_000.0 * 1.0 / 10_000.0 * 10_000.0).abs() < 1e-6);

    // The ledger's state shifted the reference mid upward for the next
    // buyer.
    assert!(sim.costs().temporary_pressure_bps() > 0.0);
    assert!(sim.costs().permanent_shift_bps() > 0.0);
    let shifted = sim.costs().reference_mid(10_000.0);
    assert!(shifted > 10_000.0);
}

#[test]
fn test_sell_flow_shifts_reference_down() {
    let mut sim = Simulator::new("SIM", config(20.0, 10.0)).unwrap();
    sim.submit(limit(1, Side::Buy, 9_990, 100_000, 1));
    sim.submit(limit(2, Side::Sell, 10_010, 100_000, 1));
    sim.submit(limit(3, Side::Sell, 9_990, 10_000, 2));
    sim.run_until(2);

    assert!(sim.costs().temporary_pressure_bps() < 0.0);
    assert!(sim.costs().permanent_shift_bps() < 0.0);
    assert!(sim.costs().reference_mid(10_000.0) < 10_000.0);
}

#[test]
fn test_temporary_pressure_decays_permanent_does_not() {
    let mut sim = Simulator::new("SIM", config(20.0, 10.0)).unwrap();
    sim.submit(limit(1, Side::Buy, 9_990, 100_000, 1));
    sim.submit(limit(2, Side::Sell, 10_010, 100_000, 1));
    sim.submit(limit(3, Side::Buy, 10_010, 10_000, 2));
    sim.run_until(2);

    let temp_before = sim.costs().temporary_pressure_bps();
    let perm_before = sim.costs().permanent_shift_bps();

    // One half-life of idle logical time (an unrelated event forces an
    // observation).
    sim.submit(limit(4, Side::Buy, 9_000, 1, 102));
    sim.run_until(102);

    let temp_after = sim.costs().temporary_pressure_bps();
    assert!((temp_after - temp_before / 2.0).abs() < 1e-9);
    assert_eq!(sim.costs().permanent_shift_bps(), perm_before);
}

#[test]
fn test_latency_cost_attributed_from_submit_time_mid() {
    let mut sim = Simulator::new("SIM", config(0.0, 0.0)).unwrap();
    // Establish mid 10_000.
    sim.submit(limit(1, Side::Buy, 9_990, 10, 1));
    sim.submit(limit(2, Side::Sell, 10_010, 10, 1));
    // ts=2: an event records mid 10_000 in the history.
    sim.submit(limit(3, Side::Buy, 9_000, 1, 2));
    // ts=3: the bid improves, mid moves to 10_004.
    sim.submit(limit(4, Side::Buy, 9_998, 10, 3));
    // ts=4: a buy created at ts=2 arrives late and pays the drift.
    sim.submit(Event::submit(4, OrderRequest {
        id: OrderId(5),
        side: Side::Buy,
        kind: OrderKind::Limit,
        price: 10_010,
        quantity: 10,
        time_in_force: TimeInForce::Gtc,
        submit_ts: 2,
        owner: OwnerTag::ANONYMOUS,
    }));
    sim.run_until(4);

    let cost = sim.costs().order_cost(OrderId(5)).unwrap();
    // mid(arrival) 10_004 vs mid(submit) 10_000 on 10 shares.
    assert!((cost.latency - 40.0).abs() < 1e-9);
    // Spread cost measured against the arrival mid.
    assert!((cost.spread - (10_010.0 - 10_004.0) * 10.0).abs() < 1e-9);
}

#[test]
fn test_maker_side_accrues_no_taker_costs() {
    let mut sim = Simulator::new("SIM", config(20.0, 10.0)).unwrap();
    sim.submit(limit(1, Side::Buy, 10_000, 50, 1));
    sim.submit(limit(9, Side::Sell, 10_020, 50, 1));
    sim.submit(limit(2, Side::Sell, 9_990, 50, 2));
    sim.run_until(2);

    assert!(sim.costs().order_cost(OrderId(1)).is_none());
    let taker = sim.costs().order_cost(OrderId(2)).unwrap();
    // Sold at 10_000 against a 10_010 mid: 10 ticks on 50 shares.
    assert!((taker.spread - 500.0).abs() < 1e-9);
}
