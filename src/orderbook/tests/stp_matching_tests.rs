use crate::orderbook::matching::{IncomingOrder, StpTermination};
use crate::orderbook::order::{OrderId, OwnerTag, Side};
use crate::orderbook::stp::SelfTradePolicy;
use crate::orderbook::tests::test_helpers::{book, resting_owned};

const ME: OwnerTag = OwnerTag(7);
const OTHER: OwnerTag = OwnerTag(8);

fn sell(id: u64, quantity: u64, owner: OwnerTag) -> IncomingOrder {
    IncomingOrder {
        id: OrderId(id),
        side: Side::Sell,
        limit_price: Some(10_000),
        quantity,
        owner,
    }
}

#[test]
fn test_cancel_oldest_removes_maker_without_trade() {
    let book = book();
    book.insert_resting(resting_owned(1, Side::Buy, 10_000, 50, 1, ME)).unwrap();
    book.insert_resting(resting_owned(2, Side::Buy, 10_000, 50, 2, OTHER)).unwrap();

    let outcome = book.match_incoming(&sell(3, 50, ME), SelfTradePolicy::CancelOldest);

    // The same-owner maker is cancelled, no trade against it; matching
    // continues against the other owner.
    assert_eq!(outcome.cancelled_makers, vec![OrderId(1)]);
    assert_eq!(outcome.fills.len(), 1);
    assert_eq!(outcome.fills[0].maker_order_id, OrderId(2));
    assert_eq!(outcome.executed_quantity, 50);
    assert!(outcome.taker_termination.is_none());
    assert!(!book.contains(OrderId(1)));
}

#[test]
fn test_cancel_newest_keeps_fills_and_drops_remainder() {
    let book = book();
    book.insert_resting(resting_owned(1, Side::Buy, 10_000, 30, 1, OTHER)).unwrap();
    book.insert_resting(resting_owned(2, Side::Buy, 10_000, 50, 2, ME)).unwrap();

    let outcome = book.match_incoming(&sell(3, 80, ME), SelfTradePolicy::CancelNewest);

    assert_eq!(outcome.fills.len(), 1);
    assert_eq!(outcome.fills[0].maker_order_id, OrderId(1));
    assert_eq!(outcome.executed_quantity, 30);
    assert_eq!(outcome.remaining_quantity, 50);
    assert_eq!(
        outcome.taker_termination,
        Some(StpTermination::CancelNewest)
    );
    // The maker stays.
    assert!(book.contains(OrderId(2)));
}

#[test]
fn test_reject_taker_terminates() {
    let book = book();
    book.insert_resting(resting_owned(1, Side::Buy, 10_000, 50, 1, ME)).unwrap();

    let outcome = book.match_incoming(&sell(2, 50, ME), SelfTradePolicy::RejectTaker);

    assert!(outcome.fills.is_empty());
    assert_eq!(outcome.taker_termination, Some(StpTermination::RejectTaker));
    assert!(book.contains(OrderId(1)));
    assert_eq!(book.level_quantity(Side::Buy, 10_000), Some(50));
}

#[test]
fn test_anonymous_owner_matches_itself() {
    let book = book();
    book.insert_resting(resting_owned(1, Side::Buy, 10_000, 50, 1, OwnerTag::ANONYMOUS))
        .unwrap();

    let outcome = book.match_incoming(
        &sell(2, 50, OwnerTag::ANONYMOUS),
        SelfTradePolicy::RejectTaker,
    );
    assert_eq!(outcome.executed_quantity, 50);
    assert!(outcome.taker_termination.is_none());
}

#[test]
fn test_cancel_oldest_reclaims_emptied_level() {
    let book = book();
    book.insert_resting(resting_owned(1, Side::Buy, 10_000, 50, 1, ME)).unwrap();
    book.insert_resting(resting_owned(2, Side::Buy, 9_900, 50, 2, OTHER)).unwrap();

    let outcome = book.match_incoming(
        &IncomingOrder {
            id: OrderId(3),
            side: Side::Sell,
            limit_price: Some(9_900),
            quantity: 80,
            owner: ME,
        },
        SelfTradePolicy::CancelOldest,
    );

    // Own maker at 10_000 cancelled (level reclaimed), fill at 9_900.
    assert_eq!(outcome.cancelled_makers, vec![OrderId(1)]);
    assert_eq!(outcome.fills[0].price, 9_900);
    assert_eq!(book.best_bid(), None);
}
