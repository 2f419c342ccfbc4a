use crate::orderbook::matching::IncomingOrder;
use crate::orderbook::order::{OrderId, OwnerTag, Side};
use crate::orderbook::stp::SelfTradePolicy;
use crate::orderbook::tests::test_helpers::{book, resting, resting_iceberg};

fn buy(id: u64, quantity: u64) -> IncomingOrder {
    IncomingOrder {
        id: OrderId(id),
        side: Side::Buy,
        limit_price: None,
        quantity,
        owner: OwnerTag::ANONYMOUS,
    }
}

#[test]
fn test_only_displayed_slice_is_matchable() {
    let book = book();
    book.insert_resting(resting_iceberg(1, Side::Sell, 10_000, 500, 100, 1))
        .unwrap();

    assert_eq!(book.level_quantity(Side::Sell, 10_000), Some(500));
    let depth = book.depth(Side::Sell, 1);
    assert_eq!(depth[0].visible_quantity, 100);
    assert_eq!(depth[0].total_quantity, 500);

    let outcome = book.match_incoming(&buy(2, 300), SelfTradePolicy::CancelOldest);

    // Only the displayed slice fills; the taker walks on (and finds
    // nothing), the hidden reserve goes dark pending refresh.
    assert_eq!(outcome.executed_quantity, 100);
    assert_eq!(outcome.remaining_quantity, 200);
    assert_eq!(outcome.icebergs_exhausted, vec![OrderId(1)]);
    assert_eq!(book.best_ask(), None);
    assert!(book.contains(OrderId(1)));
}

#[test]
fn test_partial_slice_fill_stays_in_book() {
    let book = book();
    book.insert_resting(resting_iceberg(1, Side::Sell, 10_000, 500, 100, 1))
        .unwrap();

    let outcome = book.match_incoming(&buy(2, 40), SelfTradePolicy::CancelOldest);

    assert_eq!(outcome.executed_quantity, 40);
    assert!(outcome.icebergs_exhausted.is_empty());
    let depth = book.depth(Side::Sell, 1);
    assert_eq!(depth[0].visible_quantity, 60);
    assert_eq!(depth[0].total_quantity, 460);
}

#[test]
fn test_refresh_places_slice_behind_later_arrivals() {
    let book = book();
    let iceberg = resting_iceberg(1, Side::Sell, 10_000, 200, 100, 1);
    book.insert_resting(iceberg.clone()).unwrap();

    // Consume the displayed slice; the iceberg goes dark.
    let outcome = book.match_incoming(&buy(2, 100), SelfTradePolicy::CancelOldest);
    assert_eq!(outcome.icebergs_exhausted, vec![OrderId(1)]);

    // Another sell rests at the same price in the meantime.
    book.insert_resting(resting(3, Side::Sell, 10_000, 50, 5)).unwrap();

    // Refresh with a fresh (later) submit_ts: the slice queues behind.
    let dark = book.take_dark(OrderId(1)).unwrap();
    dark.refresh_slice(9, 99);
    book.rest_refreshed(dark);

    let level = book.level_orders(Side::Sell, 10_000).unwrap();
    assert_eq!(level.len(), 2);
    assert_eq!(level[0].id(), OrderId(3));
    assert_eq!(level[1].id(), OrderId(1));
    assert_eq!(level[1].visible(), 100);
    assert_eq!(iceberg.hidden(), 0);
}

#[test]
fn test_dark_iceberg_is_cancellable() {
    let book = book();
    book.insert_resting(resting_iceberg(1, Side::Sell, 10_000, 500, 100, 1))
        .unwrap();
    book.match_incoming(&buy(2, 100), SelfTradePolicy::CancelOldest);

    let cancelled = book.cancel(OrderId(1)).unwrap();
    assert_eq!(cancelled.remaining(), 400);
    assert!(!book.contains(OrderId(1)));
    // The refresh of a cancelled iceberg finds nothing.
    assert!(book.take_dark(OrderId(1)).is_none());
}

#[test]
fn test_final_slice_smaller_than_display() {
    let book = book();
    book.insert_resting(resting_iceberg(1, Side::Sell, 10_000, 130, 100, 1))
        .unwrap();
    book.match_incoming(&buy(2, 100), SelfTradePolicy::CancelOldest);

    let dark = book.take_dark(OrderId(1)).unwrap();
    let slice = dark.refresh_slice(5, 50);
    assert_eq!(slice, 30);
    book.rest_refreshed(dark);

    let depth = book.depth(Side::Sell, 1);
    assert_eq!(depth[0].visible_quantity, 30);
    assert_eq!(depth[0].total_quantity, 30);
}
