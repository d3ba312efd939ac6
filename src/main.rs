mod cli;

use clap::Parser;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use order_book_engine::OrderBookEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let engine: Arc<OrderBookEngine> = OrderBookEngine::with_default_session_end();
    let args = cli::Cli::parse();
    cli::run(&engine, args.command);
    engine.shutdown().await;
    Ok(())
}
