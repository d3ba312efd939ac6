//! A minimal interactive demo for the engine. Not part of the library's
//! public contract (see crate docs) — just a terminal-friendly way to poke
//! at `Add`/`Cancel`/`Modify`/snapshot without wiring up a transport.

use clap::{Parser, Subcommand, ValueEnum};

use order_book_engine::{OrderBookEngine, OrderId, OrderType as EngineOrderType, Price, Quantity, Side as EngineSide};

#[derive(Parser)]
#[command(name = "order-book-cli")]
#[command(author, version, about = "Demo CLI for the limit order book engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CliSide {
    Buy,
    Sell,
}

impl From<CliSide> for EngineSide {
    fn from(value: CliSide) -> Self {
        match value {
            CliSide::Buy => EngineSide::Buy,
            CliSide::Sell => EngineSide::Sell,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CliOrderType {
    Gtc,
    Fak,
    Fok,
    Gfd,
    Market,
}

impl From<CliOrderType> for EngineOrderType {
    fn from(value: CliOrderType) -> Self {
        match value {
            CliOrderType::Gtc => EngineOrderType::GoodTillCancel,
            CliOrderType::Fak => EngineOrderType::FillAndKill,
            CliOrderType::Fok => EngineOrderType::FillOrKill,
            CliOrderType::Gfd => EngineOrderType::GoodForDay,
            CliOrderType::Market => EngineOrderType::Market,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a new order and print any resulting trades.
    Add {
        id: OrderId,
        side: CliSide,
        order_type: CliOrderType,
        /// Ignored for Market orders.
        price: Price,
        quantity: Quantity,
    },
    /// Cancel a resting order by id.
    Cancel { id: OrderId },
    /// Modify a resting order in place (loses queue priority).
    Modify {
        id: OrderId,
        side: CliSide,
        price: Price,
        quantity: Quantity,
    },
    /// Print the current book snapshot.
    Book,
    /// Print the number of live orders.
    Size,
}

pub fn run(engine: &OrderBookEngine, command: Commands) {
    match command {
        Commands::Add {
            id,
            side,
            order_type,
            price,
            quantity,
        } => {
            let trades = engine.add(id, side.into(), order_type.into(), price, quantity);
            if trades.is_empty() {
                println!("no trades");
            } else {
                for t in trades {
                    println!("{t:?}");
                }
            }
        }
        Commands::Cancel { id } => {
            engine.cancel(id);
            println!("cancelled {id}");
        }
        Commands::Modify {
            id,
            side,
            price,
            quantity,
        } => {
            let trades = engine.modify(id, side.into(), price, quantity);
            if trades.is_empty() {
                println!("no trades");
            } else {
                for t in trades {
                    println!("{t:?}");
                }
            }
        }
        Commands::Book => {
            let infos = engine.get_order_infos();
            println!("bids (best first):");
            for level in infos.bids {
                println!("  {} @ {}", level.quantity, level.price);
            }
            println!("asks (best first):");
            for level in infos.asks {
                println!("  {} @ {}", level.quantity, level.price);
            }
        }
        Commands::Size => {
            println!("{}", engine.size());
        }
    }
}
