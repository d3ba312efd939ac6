//! The background `GoodForDay` pruning task: a time-driven sweep that
//! cancels every resting `GoodForDay` order at the session end.
//!
//! State machine: `Idle -> Waiting -> Pruning -> Idle`, terminal on
//! shutdown. The transitions are logged rather than typed, since nothing
//! outside this module observes the state directly.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::clock::{next_session_end, Clock};
use crate::domain::OrderType;
use crate::engine::OrderBookEngine;

/// Drive the expiry loop until `shutdown` fires. Spawned once per engine by
/// [`OrderBookEngine::new`]; not part of the public API surface (callers
/// interact with the engine, not this task, directly).
pub(crate) async fn run(
    engine: Arc<OrderBookEngine>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    session_end_hour: u32,
) {
    loop {
        debug!("expiry task: idle");
        let now = clock.now();
        let deadline = next_session_end(now, session_end_hour);
        let wait = (deadline - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        debug!(?wait, "expiry task: waiting for next session end");

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("expiry task: shutdown signalled, exiting");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        debug!("expiry task: pruning good-for-day orders");
        let ids = {
            let infos_engine = Arc::clone(&engine);
            collect_good_for_day_ids(&infos_engine)
        };
        if !ids.is_empty() {
            info!(count = ids.len(), "expiry task: cancelling good-for-day orders");
            engine.bulk_cancel(&ids);
        }
    }
}

fn collect_good_for_day_ids(engine: &Arc<OrderBookEngine>) -> Vec<crate::domain::OrderId> {
    engine.ids_with_type(OrderType::GoodForDay)
}
