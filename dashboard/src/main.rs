use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use crate::state::AppState;

mod background;
mod charts;
mod config;
mod error;
mod metrics;
mod paths;
mod routes;
mod state;
mod storage;
mod store;
mod survey;
mod view_state;
mod views;

#[tokio::main]
async fn main() -> Result<()> {
    shared::init_tracing!()?;
    let config = shared::load_config!()?;
    let state = Arc::new(AppState::new(&config));

    background::spawn_background_workers(Arc::clone(&state));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, routes::router(state))
        .await
        .context("Server error")
}
