//! Error taxonomy for the engine.
//!
//! Admission rejections (duplicate id, unfillable F&K/FOK, Market with no
//! opposite side) are *not* represented here — per the engine's contract
//! those are expected outcomes signalled by an empty trade list, not
//! `Result::Err`. This enum exists for the one class of failure that is a
//! programmer/bookkeeping error rather than a market outcome: filling an
//! order past its remaining quantity, which would mean the book's own
//! invariants have already been violated somewhere upstream.

use crate::domain::{OrderId, Quantity};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error(
        "order {order_id}: attempted to fill {requested} but only {remaining} remained — book invariant violated"
    )]
    InvariantViolation {
        order_id: OrderId,
        requested: Quantity,
        remaining: Quantity,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
