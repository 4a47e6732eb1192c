//! Inbound HTTP surface.
//!
//! Every rate route answers 200 with whatever the rate service produced, so an
//! upstream outage shows up in the body (the failure record), never as a
//! non-2xx status.

use crate::core::rate::{RateProvider, RateResult};
use anyhow::{Context, Result};
use axum::{Json, Router, extract::State, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

#[derive(Clone)]
pub struct AppState {
    pub rates: Arc<dyn RateProvider>,
}

pub fn router(rates: Arc<dyn RateProvider>) -> Router {
    Router::new()
        .route("/", get(latest_rates))
        .route("/rates", get(latest_rates))
        .route("/health", get(health))
        .with_state(AppState { rates })
}

async fn latest_rates(State(state): State<AppState>) -> Json<RateResult> {
    debug!("Received rates request");
    Json(state.rates.fetch_rates().await)
}

async fn health() -> &'static str {
    "ok\n"
}

/// Serves the routes on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, rates: Arc<dyn RateProvider>) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("Serving rates on http://{addr}");

    axum::serve(listener, router(rates))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
