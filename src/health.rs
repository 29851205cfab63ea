//! Liveness surface
//!
//! Reports whether the bus connection is currently reachable. The caller
//! binds the listener, so a port that cannot be bound is a startup error.

use crate::bus::MessageBus;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    service: &'static str,
    bus: bool,
}

struct HealthState {
    service: &'static str,
    bus: Arc<dyn MessageBus>,
}

/// Serve the health endpoint until the process shuts down
pub async fn serve(
    listener: TcpListener,
    service: &'static str,
    bus: Arc<dyn MessageBus>,
) -> anyhow::Result<()> {
    let state = Arc::new(HealthState { service, bus });
    let router = Router::new().route("/health", get(health)).with_state(state);

    tracing::info!(addr = %listener.local_addr()?, service, "Health endpoint listening");
    axum::serve(listener, router).await?;
    Ok(())
}

async fn health(State(state): State<Arc<HealthState>>) -> (StatusCode, Json<HealthStatus>) {
    let bus_ok = state.bus.is_connected();
    let code = if bus_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthStatus {
            status: if bus_ok { "UP" } else { "DOWN" },
            service: state.service,
            bus: bus_ok,
        }),
    )
}
