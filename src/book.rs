//! Book state: the dual-sided price ladder, the FIFO queue at each price,
//! the order arena, and the per-price aggregate statistics.
//!
//! Orders are owned exactly once, in the arena (`orders: HashMap<OrderId,
//! Order>`); the ladders only ever store ids. This is the arena
//! re-architecture the design notes call for in place of the source's
//! reference-counted, jointly-owned order records.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::trace;

use crate::domain::{LevelInfo, OrderId, OrderInfos, Price, Quantity, Side};
use crate::order::Order;

/// How a mutation affects a price level's cached statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelAction {
    /// A new order arrived at this level.
    Add(Quantity),
    /// An order left this level entirely (filled or cancelled).
    Remove(Quantity),
    /// A resting order at this level was partially filled but remains.
    Match(Quantity),
}

/// Cached aggregate for one price level, shared by whichever side currently
/// holds that price (bid and ask prices never coexist once the book is
/// uncrossed, so one map keyed by price alone is sufficient).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelStats {
    pub order_count: u32,
    pub aggregate_remaining: u64,
}

/// One side's price ladder: price -> FIFO queue of order ids.
pub type Ladder = BTreeMap<Price, VecDeque<OrderId>>;

pub struct BookState {
    pub(crate) orders: HashMap<OrderId, Order>,
    pub(crate) bids: Ladder,
    pub(crate) asks: Ladder,
    pub(crate) stats: HashMap<Price, LevelStats>,
}

impl BookState {
    pub fn new() -> Self {
        BookState {
            orders: HashMap::new(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            stats: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.orders.contains_key(&id)
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    fn ladder(&self, side: Side) -> &Ladder {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn ladder_mut(&mut self, side: Side) -> &mut Ladder {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Best bid: highest price with a non-empty queue.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    /// Best ask: lowest price with a non-empty queue.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// Worst (least favorable to a resting order) price on `side` — the
    /// price a Market order rewrites to when it crosses that side.
    pub fn worst_price(&self, side: Side) -> Option<Price> {
        match side {
            Side::Buy => self.bids.keys().next().copied(),
            Side::Sell => self.asks.keys().next_back().copied(),
        }
    }

    /// Apply a statistics delta for `price`, erasing the entry once its
    /// order count reaches zero.
    pub fn apply_stats(&mut self, price: Price, action: LevelAction) {
        let entry = self.stats.entry(price).or_default();
        match action {
            LevelAction::Add(qty) => {
                entry.order_count += 1;
                entry.aggregate_remaining += qty as u64;
            }
            LevelAction::Remove(qty) => {
                entry.order_count = entry.order_count.saturating_sub(1);
                entry.aggregate_remaining = entry.aggregate_remaining.saturating_sub(qty as u64);
                if entry.order_count == 0 {
                    self.stats.remove(&price);
                }
            }
            LevelAction::Match(qty) => {
                entry.aggregate_remaining = entry.aggregate_remaining.saturating_sub(qty as u64);
            }
        }
    }

    /// Insert `order` at the tail of its (side, price) queue, register it
    /// in the arena, and emit `Add` statistics.
    pub fn insert(&mut self, order: Order) {
        let side = order.side;
        let price = order.price;
        let qty = order.remaining_quantity;
        let id = order.id;
        self.orders.insert(id, order);
        self.ladder_mut(side).entry(price).or_default().push_back(id);
        self.apply_stats(price, LevelAction::Add(qty));
        trace!(order_id = id, ?side, price, qty, "inserted order into book");
    }

    /// Remove `id` from the arena and from its (side, price) level queue,
    /// erasing the price key if the queue becomes empty. Emits `Remove`
    /// statistics for the order's remaining quantity. No-op if `id` is not
    /// live.
    pub fn remove(&mut self, id: OrderId) -> Option<Order> {
        let order = self.orders.remove(&id)?;
        let queue = self.ladder_mut(order.side).get_mut(&order.price)?;
        if let Some(pos) = queue.iter().position(|&queued| queued == id) {
            queue.remove(pos);
        }
        if queue.is_empty() {
            self.ladder_mut(order.side).remove(&order.price);
        }
        self.apply_stats(order.price, LevelAction::Remove(order.remaining_quantity));
        trace!(order_id = id, "removed order from book");
        Some(order)
    }

    /// Head order id of the queue at (side, price), if any.
    pub fn level_head(&self, side: Side, price: Price) -> Option<OrderId> {
        self.ladder(side).get(&price).and_then(|q| q.front()).copied()
    }

    /// Pop the head id off the queue at (side, price), erasing the price
    /// key if the queue becomes empty. Does not touch the arena or stats —
    /// callers that pop a fully-filled head are expected to also remove it
    /// from the arena and emit `Remove` stats themselves (see the matching
    /// loop, which needs to do both atomically with the fill).
    pub fn pop_level_head(&mut self, side: Side, price: Price) -> Option<OrderId> {
        let ladder = self.ladder_mut(side);
        let id = ladder.get_mut(&price).and_then(|q| q.pop_front());
        if let Some(queue) = ladder.get(&price) {
            if queue.is_empty() {
                ladder.remove(&price);
            }
        }
        id
    }

    /// Feasibility check for a Fill-or-Kill order: can a prospective order
    /// of `quantity` at limit `price` on `side` be *fully* satisfied by
    /// resting liquidity on the opposite side, walking levels from best to
    /// worst and stopping once `price` is no longer acceptable?
    ///
    /// O(number of acceptable levels) thanks to the cached aggregates —
    /// never walks individual orders.
    pub fn can_fully_fill(&self, side: Side, price: Price, quantity: Quantity) -> bool {
        let opposite = self.ladder(side.opposite());
        let mut needed: i64 = quantity as i64;
        let levels: Box<dyn Iterator<Item = (&Price, &VecDeque<OrderId>)>> = match side {
            Side::Buy => Box::new(opposite.iter()),
            Side::Sell => Box::new(opposite.iter().rev()),
        };
        for (&level_price, _) in levels {
            let acceptable = match side {
                Side::Buy => level_price <= price,
                Side::Sell => level_price >= price,
            };
            if !acceptable {
                break;
            }
            let Some(level_stats) = self.stats.get(&level_price) else {
                continue;
            };
            needed -= level_stats.aggregate_remaining as i64;
            if needed <= 0 {
                return true;
            }
        }
        false
    }

    /// Read-only snapshot: bids descending by price, asks ascending, each
    /// level's quantity summed from the cached aggregate.
    pub fn order_infos(&self) -> OrderInfos {
        let bids = self
            .bids
            .iter()
            .rev()
            .map(|(&price, queue)| LevelInfo {
                price,
                quantity: self.level_quantity(price, queue),
            })
            .collect();
        let asks = self
            .asks
            .iter()
            .map(|(&price, queue)| LevelInfo {
                price,
                quantity: self.level_quantity(price, queue),
            })
            .collect();
        OrderInfos { bids, asks }
    }

    fn level_quantity(&self, price: Price, queue: &VecDeque<OrderId>) -> Quantity {
        if let Some(stats) = self.stats.get(&price) {
            return stats.aggregate_remaining.min(Quantity::MAX as u64) as Quantity;
        }
        queue
            .iter()
            .filter_map(|id| self.orders.get(id))
            .map(|o| o.remaining_quantity)
            .sum()
    }

    /// All ids currently live whose order type matches `predicate` — used
    /// by the expiry task to find `GoodForDay` orders without holding the
    /// lock across the cancellation itself.
    pub fn ids_matching(&self, predicate: impl Fn(&Order) -> bool) -> Vec<OrderId> {
        self.orders
            .values()
            .filter(|o| predicate(o))
            .map(|o| o.id)
            .collect()
    }
}

impl Default for BookState {
    fn default() -> Self {
        Self::new()
    }
}
