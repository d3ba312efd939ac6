//! The matching engine: `Add`, `Cancel`, `Modify`, the internal matching
//! loop, and the fill/kill admission checks — all guarded by the single
//! coarse lock described in the concurrency model.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::book::{BookState, LevelAction};
use crate::clock::{Clock, SystemClock};
use crate::domain::{OrderId, OrderInfos, OrderType, Price, Quantity, Side, Trade, TradeLeg, Trades};
use crate::expiry;
use crate::order::Order;

const DEFAULT_SESSION_END_HOUR: u32 = 16;

/// The single-instrument limit order book engine. Cheap to clone (it's an
/// `Arc` internally would be redundant — callers hold the engine itself
/// behind their own `Arc`, same as this codebase's `AppState` wraps its
/// shared book); what matters is that every public method only ever takes
/// the one lock for the duration of the call.
pub struct OrderBookEngine {
    book: Mutex<BookState>,
    shutdown: CancellationToken,
    expiry_handle: Mutex<Option<JoinHandle<()>>>,
}

impl OrderBookEngine {
    /// Construct a new engine and spawn its background `GoodForDay`
    /// pruning task, which fires at the next local `session_end_hour:00`
    /// and every day thereafter until [`OrderBookEngine::shutdown`] is
    /// called. Requires a Tokio runtime to already be running.
    pub fn new(clock: Arc<dyn Clock>, session_end_hour: u32) -> Arc<Self> {
        let engine = Arc::new(OrderBookEngine {
            book: Mutex::new(BookState::new()),
            shutdown: CancellationToken::new(),
            expiry_handle: Mutex::new(None),
        });
        let task_engine = Arc::clone(&engine);
        let task_shutdown = engine.shutdown.clone();
        let handle = tokio::spawn(async move {
            expiry::run(task_engine, clock, task_shutdown, session_end_hour).await;
        });
        *engine.expiry_handle.lock().unwrap() = Some(handle);
        engine
    }

    /// Convenience constructor using the real system clock and the default
    /// 16:00 local session end.
    pub fn with_default_session_end() -> Arc<Self> {
        Self::new(Arc::new(SystemClock), DEFAULT_SESSION_END_HOUR)
    }

    /// Signal shutdown to the expiry task and await its exit. Safe to call
    /// more than once. After this returns, no background pruning can race
    /// a concurrent `Add`/`Cancel`/`Modify` call.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.expiry_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Number of live orders in the book.
    pub fn size(&self) -> usize {
        self.book.lock().unwrap().len()
    }

    /// Read-only snapshot of both ladders, aggregated by price.
    pub fn get_order_infos(&self) -> OrderInfos {
        self.book.lock().unwrap().order_infos()
    }

    /// Ids of all live orders whose type is exactly `order_type`. Used by
    /// the expiry task to snapshot `GoodForDay` ids before releasing the
    /// lock and cancelling them through `bulk_cancel`.
    pub(crate) fn ids_with_type(&self, order_type: OrderType) -> Vec<OrderId> {
        self.book
            .lock()
            .unwrap()
            .ids_matching(|order| order.order_type == order_type)
    }

    /// Submit a new order. Returns the trades produced while draining the
    /// cross, or an empty list if the order was rejected on admission (see
    /// the admission rules) or rested without crossing anything.
    pub fn add(&self, id: OrderId, side: Side, order_type: OrderType, price: Price, quantity: Quantity) -> Trades {
        let mut book = self.book.lock().unwrap();
        Self::add_locked(&mut book, id, side, order_type, price, quantity)
    }

    fn add_locked(
        book: &mut BookState,
        id: OrderId,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
    ) -> Trades {
        if book.contains(id) {
            warn!(order_id = id, "rejecting add: duplicate order id");
            return Vec::new();
        }

        let (order_type, price) = match order_type {
            OrderType::Market => {
                let Some(worst) = book.worst_price(side.opposite()) else {
                    warn!(order_id = id, ?side, "rejecting market order: opposite side empty");
                    return Vec::new();
                };
                (OrderType::GoodTillCancel, worst)
            }
            other => (other, price),
        };

        if order_type == OrderType::FillAndKill {
            let crossable = match side {
                Side::Buy => book.best_ask().is_some_and(|ask| ask <= price),
                Side::Sell => book.best_bid().is_some_and(|bid| bid >= price),
            };
            if !crossable {
                warn!(order_id = id, ?side, price, "rejecting fill-and-kill: nothing to cross");
                return Vec::new();
            }
        }

        if order_type == OrderType::FillOrKill && !book.can_fully_fill(side, price, quantity) {
            warn!(order_id = id, ?side, price, quantity, "rejecting fill-or-kill: cannot fully fill");
            return Vec::new();
        }

        let order = Order::new(id, side, order_type, price, quantity);
        book.insert(order);
        info!(order_id = id, ?side, ?order_type, price, quantity, "order admitted");

        let trades = Self::match_book(book);
        Self::cancel_dangling_fill_and_kill(book);
        trades
    }

    /// Cancel a live order. Idempotent: cancelling an unknown or
    /// already-cancelled id is a no-op.
    pub fn cancel(&self, id: OrderId) {
        let mut book = self.book.lock().unwrap();
        Self::cancel_locked(&mut book, id);
    }

    fn cancel_locked(book: &mut BookState, id: OrderId) {
        if book.remove(id).is_some() {
            info!(order_id = id, "order cancelled");
        } else {
            debug!(order_id = id, "cancel of unknown or already-gone order id");
        }
    }

    /// Cancel every id in `ids` under a single lock acquisition — this is
    /// what distinguishes `BulkCancel` from calling [`OrderBookEngine::cancel`]
    /// once per id.
    pub fn bulk_cancel(&self, ids: &[OrderId]) {
        let mut book = self.book.lock().unwrap();
        for &id in ids {
            Self::cancel_locked(&mut book, id);
        }
    }

    /// Cancel-then-add under the same id: reads the existing order's type
    /// (ignoring whatever `Modify` was not asked to change), removes it,
    /// and re-admits a new order with the supplied side/price/quantity and
    /// the preserved type. Loses queue priority by design (see design
    /// notes). No-op (empty trades) if `id` is not live.
    pub fn modify(&self, id: OrderId, side: Side, price: Price, quantity: Quantity) -> Trades {
        let mut book = self.book.lock().unwrap();
        let Some(existing) = book.get(id) else {
            debug!(order_id = id, "modify of unknown order id");
            return Vec::new();
        };
        let order_type = existing.order_type;
        Self::cancel_locked(&mut book, id);
        Self::add_locked(&mut book, id, side, order_type, price, quantity)
    }

    /// Drain crossing volume between the two ladders, emitting a `Trade`
    /// per match in the order the loop produces them.
    fn match_book(book: &mut BookState) -> Trades {
        let mut trades = Vec::new();
        loop {
            let (Some(bid_price), Some(ask_price)) = (book.best_bid(), book.best_ask()) else {
                break;
            };
            if bid_price < ask_price {
                break;
            }
            let Some(bid_id) = book.level_head(Side::Buy, bid_price) else {
                break;
            };
            let Some(ask_id) = book.level_head(Side::Sell, ask_price) else {
                break;
            };

            let bid_remaining = book.get(bid_id).expect("bid head id must be live").remaining_quantity;
            let ask_remaining = book.get(ask_id).expect("ask head id must be live").remaining_quantity;
            let fill_qty = bid_remaining.min(ask_remaining);

            {
                let bid = book.orders.get_mut(&bid_id).expect("bid head id must be live");
                bid.fill(fill_qty).unwrap_or_else(|e| panic!("{e}"));
            }
            {
                let ask = book.orders.get_mut(&ask_id).expect("ask head id must be live");
                ask.fill(fill_qty).unwrap_or_else(|e| panic!("{e}"));
            }

            trades.push(Trade {
                bid: TradeLeg {
                    order_id: bid_id,
                    price: bid_price,
                    quantity: fill_qty,
                },
                ask: TradeLeg {
                    order_id: ask_id,
                    price: ask_price,
                    quantity: fill_qty,
                },
            });
            debug!(bid_id, ask_id, price_bid = bid_price, price_ask = ask_price, fill_qty, "matched");

            let bid_filled = book.get(bid_id).unwrap().is_filled();
            if bid_filled {
                book.pop_level_head(Side::Buy, bid_price);
                book.orders.remove(&bid_id);
                book.apply_stats(bid_price, LevelAction::Remove(fill_qty));
            } else {
                book.apply_stats(bid_price, LevelAction::Match(fill_qty));
            }

            let ask_filled = book.get(ask_id).unwrap().is_filled();
            if ask_filled {
                book.pop_level_head(Side::Sell, ask_price);
                book.orders.remove(&ask_id);
                book.apply_stats(ask_price, LevelAction::Remove(fill_qty));
            } else {
                book.apply_stats(ask_price, LevelAction::Match(fill_qty));
            }
        }
        trades
    }

    /// After the matching loop settles, a `FillAndKill` order that still
    /// heads its queue did not fully match during its arrival wave and must
    /// be cancelled — it is never allowed to rest.
    fn cancel_dangling_fill_and_kill(book: &mut BookState) {
        for side in [Side::Buy, Side::Sell] {
            let head_price = match side {
                Side::Buy => book.best_bid(),
                Side::Sell => book.best_ask(),
            };
            let Some(price) = head_price else { continue };
            let Some(head_id) = book.level_head(side, price) else {
                continue;
            };
            if book.get(head_id).map(|o| o.order_type) == Some(OrderType::FillAndKill) {
                warn!(order_id = head_id, "fill-and-kill residue did not fully match; cancelling");
                book.remove(head_id);
            }
        }
    }
}

impl Drop for OrderBookEngine {
    /// Best-effort backstop: a synchronous `Drop` cannot await the expiry
    /// task's `JoinHandle`, so this only signals cancellation. Callers that
    /// need a guaranteed join must call [`OrderBookEngine::shutdown`] before
    /// dropping the engine; without it the task still observes the token and
    /// exits on its own, it just isn't joined here.
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{Local, TimeZone};

    fn test_engine() -> Arc<OrderBookEngine> {
        let clock = Arc::new(FixedClock::new(Local.with_ymd_and_hms(2026, 7, 26, 9, 0, 0).unwrap()));
        OrderBookEngine::new(clock, 16)
    }

    #[tokio::test]
    async fn s1_add_resting_limit() {
        let engine = test_engine();
        let trades = engine.add(1, Side::Buy, OrderType::GoodTillCancel, 100, 10);
        assert!(trades.is_empty());
        assert_eq!(engine.size(), 1);
        let infos = engine.get_order_infos();
        assert_eq!(infos.bids, vec![crate::domain::LevelInfo { price: 100, quantity: 10 }]);
        assert!(infos.asks.is_empty());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn s2_cancel_round_trip() {
        let engine = test_engine();
        engine.add(1, Side::Buy, OrderType::GoodTillCancel, 100, 10);
        engine.cancel(1);
        assert_eq!(engine.size(), 0);
        let infos = engine.get_order_infos();
        assert!(infos.bids.is_empty() && infos.asks.is_empty());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn s3_partial_fill() {
        let engine = test_engine();
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
        let infos = engine.get_order_infos();
        assert_eq!(infos.bids, vec![crate::domain::LevelInfo { price: 100, quantity: 6 }]);
        assert!(infos.asks.is_empty());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn s4_fill_and_kill_sweeps_fifo_queue() {
        let engine = test_engine();
        engine.add(1, Side::Buy, OrderType::GoodTillCancel, 100, 5);
        engine.add(2, Side::Buy, OrderType::GoodTillCancel, 100, 5);
        let trades = engine.add(3, Side::Sell, OrderType::FillAndKill, 100, 8);
        assert_eq!(
            trades,
            vec![
                Trade {
                    bid: TradeLeg { order_id: 1, price: 100, quantity: 5 },
                    ask: TradeLeg { order_id: 3, price: 100, quantity: 5 },
                },
                Trade {
                    bid: TradeLeg { order_id: 2, price: 100, quantity: 3 },
                    ask: TradeLeg { order_id: 3, price: 100, quantity: 3 },
                },
            ]
        );
        assert_eq!(engine.size(), 1);
        let infos = engine.get_order_infos();
        assert_eq!(infos.bids, vec![crate::domain::LevelInfo { price: 100, quantity: 2 }]);
        assert!(infos.asks.is_empty());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn s5_fill_or_kill_rejected() {
        let engine = test_engine();
        engine.add(1, Side::Sell, OrderType::GoodTillCancel, 101, 5);
        let trades = engine.add(2, Side::Buy, OrderType::FillOrKill, 101, 10);
        assert!(trades.is_empty());
        assert_eq!(engine.size(), 1);
        let infos = engine.get_order_infos();
        assert!(infos.bids.is_empty());
        assert_eq!(infos.asks, vec![crate::domain::LevelInfo { price: 101, quantity: 5 }]);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn s6_fill_or_kill_accepted_across_levels() {
        let engine = test_engine();
        engine.add(1, Side::Sell, OrderType::GoodTillCancel, 101, 5);
        engine.add(2, Side::Sell, OrderType::GoodTillCancel, 102, 5);
        let trades = engine.add(3, Side::Buy, OrderType::FillOrKill, 102, 10);
        assert_eq!(
            trades,
            vec![
                Trade {
                    bid: TradeLeg { order_id: 3, price: 102, quantity: 5 },
                    ask: TradeLeg { order_id: 1, price: 101, quantity: 5 },
                },
                Trade {
                    bid: TradeLeg { order_id: 3, price: 102, quantity: 5 },
                    ask: TradeLeg { order_id: 2, price: 102, quantity: 5 },
                },
            ]
        );
        assert_eq!(engine.size(), 0);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let engine = test_engine();
        engine.add(1, Side::Buy, OrderType::GoodTillCancel, 100, 10);
        let trades = engine.add(1, Side::Buy, OrderType::GoodTillCancel, 99, 3);
        assert!(trades.is_empty());
        assert_eq!(engine.size(), 1);
        assert_eq!(engine.get_order_infos().bids[0].quantity, 10);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn market_order_rewrites_to_worst_opposite_price() {
        let engine = test_engine();
        engine.add(1, Side::Sell, OrderType::GoodTillCancel, 101, 5);
        engine.add(2, Side::Sell, OrderType::GoodTillCancel, 102, 5);
        let trades = engine.add(3, Side::Buy, OrderType::Market, 0, 5);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].ask.price, 101);
        engine.shutdown().await;
    }

    /// Disambiguates "worst price" (full sweep) from "best price" (touch
    /// only the nearest level): a quantity that exceeds the nearest level
    /// only fully matches if the rewritten price reaches the deepest level.
    #[tokio::test]
    async fn market_order_sweeps_multiple_levels_to_worst_price() {
        let engine = test_engine();
        engine.add(1, Side::Sell, OrderType::GoodTillCancel, 101, 5);
        engine.add(2, Side::Sell, OrderType::GoodTillCancel, 102, 5);
        let trades = engine.add(3, Side::Buy, OrderType::Market, 0, 10);
        assert_eq!(
            trades,
            vec![
                Trade {
                    bid: TradeLeg { order_id: 3, price: 102, quantity: 5 },
                    ask: TradeLeg { order_id: 1, price: 101, quantity: 5 },
                },
                Trade {
                    bid: TradeLeg { order_id: 3, price: 102, quantity: 5 },
                    ask: TradeLeg { order_id: 2, price: 102, quantity: 5 },
                },
            ]
        );
        assert_eq!(engine.size(), 0, "the market buy must fully sweep both levels, not rest after the first");
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn market_order_with_empty_opposite_side_is_rejected() {
        let engine = test_engine();
        let trades = engine.add(1, Side::Buy, OrderType::Market, 0, 5);
        assert!(trades.is_empty());
        assert_eq!(engine.size(), 0);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let engine = test_engine();
        engine.add(1, Side::Buy, OrderType::GoodTillCancel, 100, 10);
        engine.cancel(1);
        engine.cancel(1);
        assert_eq!(engine.size(), 0);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn modify_preserves_type_but_loses_priority() {
        let engine = test_engine();
        engine.add(1, Side::Buy, OrderType::GoodTillCancel, 100, 5);
        engine.add(2, Side::Buy, OrderType::GoodTillCancel, 100, 5);
        // Bump order 1's quantity; it now queues behind order 2 at the same price.
        engine.modify(1, Side::Buy, 100, 9);
        let trades = engine.add(3, Side::Sell, OrderType::GoodTillCancel, 100, 5);
        assert_eq!(trades[0].bid.order_id, 2, "order 2 should fill first: order 1 lost queue priority");
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn modify_unknown_id_is_noop() {
        let engine = test_engine();
        let trades = engine.modify(42, Side::Buy, 100, 5);
        assert!(trades.is_empty());
        assert_eq!(engine.size(), 0);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn bulk_cancel_covers_unknown_ids_without_error() {
        let engine = test_engine();
        engine.add(1, Side::Buy, OrderType::GoodTillCancel, 100, 5);
        engine.bulk_cancel(&[1, 999]);
        assert_eq!(engine.size(), 0);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn fill_and_kill_leaves_no_residue_on_the_book() {
        let engine = test_engine();
        engine.add(1, Side::Sell, OrderType::GoodTillCancel, 100, 3);
        engine.add(2, Side::Buy, OrderType::FillAndKill, 100, 10);
        let infos = engine.get_order_infos();
        assert!(
            !infos.bids.iter().any(|l| l.price == 100) || engine.size() == 0,
            "fill-and-kill must not rest"
        );
        assert_eq!(engine.size(), 0);
        engine.shutdown().await;
    }
}
