//! Single-instrument limit order book matching engine.
//!
//! The public surface is [`engine::OrderBookEngine`]: submit orders with
//! [`engine::OrderBookEngine::add`], cancel with
//! [`engine::OrderBookEngine::cancel`], amend in place with
//! [`engine::OrderBookEngine::modify`], and read a consistent snapshot with
//! [`engine::OrderBookEngine::get_order_infos`]. A background task prunes
//! `GoodForDay` orders at the configured session end; call
//! [`engine::OrderBookEngine::shutdown`] before dropping the engine to join
//! it cleanly.
//!
//! Out of scope for this crate: multi-symbol routing, a wire protocol,
//! persistence, and the process entry point — this crate ships a minimal
//! `clap`-based demo binary that exercises the engine interactively, but it
//! is not part of the library's contract.

pub mod book;
pub mod clock;
pub mod domain;
pub mod engine;
pub mod error;
mod expiry;
pub mod order;

pub use domain::{
    LevelInfo, OrderId, OrderInfos, OrderType, Price, Quantity, Side, Trade, TradeLeg, Trades,
    INVALID_PRICE,
};
pub use engine::OrderBookEngine;
pub use error::{EngineError, EngineResult};
pub use order::Order;
