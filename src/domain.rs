//! Primitive types shared by every other module: prices, quantities, ids,
//! sides, order types, and the immutable `Trade` record the matching loop
//! emits.

use serde::Serialize;

/// Signed price in ticks. Negative and zero prices are legal limit prices;
/// only [`INVALID_PRICE`] is reserved, as the sentinel a [`crate::domain::OrderType::Market`]
/// order carries before admission rewrites it.
pub type Price = i32;

/// Sentinel price carried by a `Market` order prior to admission. Never
/// participates in ladder ordering comparisons — admission always rewrites
/// it to a real price before the order can be inserted.
pub const INVALID_PRICE: Price = Price::MIN;

/// Unsigned resting/remaining size, in whatever lot unit the caller uses.
pub type Quantity = u32;

/// Unique identifier of a live order. Callers choose ids; the engine only
/// requires uniqueness among currently-live orders.
pub type OrderId = u32;

/// Which side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an order on `self` would need to cross against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// The five order-type tags this engine understands. See the glossary for
/// the matching semantics of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OrderType {
    GoodTillCancel,
    FillAndKill,
    FillOrKill,
    GoodForDay,
    Market,
}

/// One leg of a trade: which resting order was hit, at what price, for how
/// much quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TradeLeg {
    pub order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
}

/// A single match between a bid and an ask. Trades carry no back-reference
/// to the `Order`s involved; they are plain, caller-owned value records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Trade {
    pub bid: TradeLeg,
    pub ask: TradeLeg,
}

/// The ordered sequence of trades produced by a single `Add` invocation —
/// the "tape" for that submission.
pub type Trades = Vec<Trade>;

/// One level of the `GetOrderInfos` snapshot: a price and the total
/// remaining quantity resting at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelInfo {
    pub price: Price,
    pub quantity: Quantity,
}

/// Read-only view of the book, bids descending by price and asks ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderInfos {
    pub bids: Vec<LevelInfo>,
    pub asks: Vec<LevelInfo>,
}
