//! The mutable per-order record.

use crate::domain::{OrderId, OrderType, Price, Quantity, Side};
use crate::error::{EngineError, EngineResult};

/// A live (or about-to-be-live) order. `remaining_quantity` is mutated in
/// place by [`Order::fill`]; every other field is fixed for the order's
/// lifetime except as rewritten once by admission (Market → GTC rewrite) or
/// replaced wholesale by `Modify` (cancel-then-add under the same id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Price,
    pub initial_quantity: Quantity,
    pub remaining_quantity: Quantity,
}

impl Order {
    pub fn new(id: OrderId, side: Side, order_type: OrderType, price: Price, quantity: Quantity) -> Self {
        Order {
            id,
            side,
            order_type,
            price,
            initial_quantity: quantity,
            remaining_quantity: quantity,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// Reduce `remaining_quantity` by `quantity`. Filling beyond what
    /// remains is an invariant violation: it means some caller upstream
    /// (the matching loop) computed a fill size larger than either side
    /// could actually supply.
    pub fn fill(&mut self, quantity: Quantity) -> EngineResult<()> {
        if quantity > self.remaining_quantity {
            return Err(EngineError::InvariantViolation {
                order_id: self.id,
                requested: quantity,
                remaining: self.remaining_quantity,
            });
        }
        self.remaining_quantity -= quantity;
        Ok(())
    }
}
