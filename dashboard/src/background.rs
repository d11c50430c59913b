use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::config::PRUNE_INTERVAL;
use crate::state::AppState;

pub fn spawn_background_workers(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;

            let removed = state.store_mut().prune(Utc::now());
            debug!(removed, "prune pass complete");
        }
    });
}
