//! Black-box scenario and law tests driven entirely through the public
//! `OrderBookEngine` API — no access to book internals.

use std::sync::Arc;

use chrono::{Local, TimeZone};
use order_book_engine::clock::FixedClock;
use order_book_engine::{LevelInfo, OrderBookEngine, OrderType, Side, Trade, TradeLeg};

fn fresh_engine() -> Arc<OrderBookEngine> {
    let clock = Arc::new(FixedClock::new(Local.with_ymd_and_hms(2026, 7, 26, 9, 0, 0).unwrap()));
    OrderBookEngine::new(clock, 16)
}

#[tokio::test]
async fn add_then_cancel_round_trip_restores_prior_state() {
    let engine = fresh_engine();
    engine.add(1, Side::Buy, OrderType::GoodTillCancel, 100, 10);
    let before = engine.get_order_infos();

    engine.add(2, Side::Sell, OrderType::GoodTillCancel, 105, 3);
    engine.cancel(2);

    let after = engine.get_order_infos();
    assert_eq!(before, after);
    assert_eq!(engine.size(), 1);
    engine.shutdown().await;
}

#[tokio::test]
async fn cancel_idempotence() {
    let engine = fresh_engine();
    engine.add(1, Side::Buy, OrderType::GoodTillCancel, 100, 10);
    engine.cancel(1);
    let after_first = engine.get_order_infos();
    engine.cancel(1);
    let after_second = engine.get_order_infos();
    assert_eq!(after_first, after_second);
    assert_eq!(engine.size(), 0);
    engine.shutdown().await;
}

#[tokio::test]
async fn fill_or_kill_is_all_or_nothing() {
    let engine = fresh_engine();
    engine.add(1, Side::Sell, OrderType::GoodTillCancel, 100, 3);

    // Too big: rejected outright, no partial trade leaks out.
    let trades = engine.add(2, Side::Buy, OrderType::FillOrKill, 100, 4);
    assert!(trades.is_empty());
    assert_eq!(engine.size(), 1);

    // Exactly fillable: fully matches in one shot.
    let trades = engine.add(3, Side::Buy, OrderType::FillOrKill, 100, 3);
    let total: u32 = trades.iter().map(|t| t.bid.quantity).sum();
    assert_eq!(total, 3);
    assert_eq!(engine.size(), 0);
    engine.shutdown().await;
}

#[tokio::test]
async fn fill_and_kill_never_rests() {
    let engine = fresh_engine();
    engine.add(1, Side::Sell, OrderType::GoodTillCancel, 100, 2);
    engine.add(2, Side::Buy, OrderType::FillAndKill, 100, 9);
    // Order 1 fully consumed, order 2's 7 leftover units vanish rather than resting.
    assert_eq!(engine.size(), 0);
    engine.shutdown().await;
}

#[tokio::test]
async fn modify_changes_price_and_requeues_at_tail() {
    let engine = fresh_engine();
    engine.add(1, Side::Buy, OrderType::GoodTillCancel, 100, 5);
    engine.modify(1, Side::Buy, 102, 5);
    let infos = engine.get_order_infos();
    assert_eq!(infos.bids, vec![LevelInfo { price: 102, quantity: 5 }]);
    engine.shutdown().await;
}

#[tokio::test]
async fn scenario_s3_partial_fill_matches_spec_literal() {
    let engine = fresh_engine();
    engine.add(1, Side::Buy, OrderType::GoodTillCancel, 100, 10);
    let trades = engine.add(2, Side::Sell, OrderType::GoodTillCancel, 100, 4);
    assert_eq!(
        trades,
        vec![Trade {
            bid: TradeLeg { order_id: 1, price: 100, quantity: 4 },
            ask: TradeLeg { order_id: 2, price: 100, quantity: 4 },
        }]
    );
    assert_eq!(engine.size(), 1);
    engine.shutdown().await;
}
