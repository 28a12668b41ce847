//! Dashboard API (spec.md §4.8): read-only proxies over
//! `FleetController::snapshot`, plus the operator-triggered hot-reload
//! endpoint (SPEC_FULL §6).

use axum::extract::State;
use axum::Json;
use fleet_controller::InstanceView;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// `GET /api/accounts` (spec.md §6).
pub async fn accounts_handler(State(state): State<AppState>) -> Json<Vec<InstanceView>> {
    Json(state.controller.snapshot())
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub instances: Vec<InstanceView>,
}

/// `GET /health` (spec.md §6). `ok` reflects whether every fannable
/// instance (`Running`) is free of consecutive probe failures.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let instances = state.controller.snapshot();
    let ok = instances.iter().all(|i| i.consecutive_failures == 0);
    Json(HealthResponse { ok, instances })
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub success: bool,
    pub message: String,
}

/// `GET /api/reload` (SPEC_FULL §6): re-reads `routing` and
/// `trading_defaults` from `fleet.toml` without restarting any instance.
/// `protected_port` is intentionally not reloaded here (spec.md §6).
pub async fn reload_handler(State(state): State<AppState>) -> Result<Json<ReloadResponse>> {
    let raw = tokio::fs::read_to_string(state.config_path.as_ref())
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("could not read {}: {e}", state.config_path)))?;
    let fresh: fleet_core::config::FleetConfig =
        toml::from_str(&raw).map_err(|e| ApiError::InvalidRequest(format!("invalid config: {e}")))?;

    let table = fresh.routing.as_table();
    state
        .controller
        .reload_routing(table)
        .map_err(ApiError::InvalidRequest)?;

    {
        let mut config = state.config.write();
        config.routing = fresh.routing;
        config.trading_defaults = fresh.trading_defaults;
    }

    info!("routing and trading_defaults reloaded");
    warn!("protected_port and watchdog settings are not hot-reloadable, unchanged");
    Ok(Json(ReloadResponse { success: true, message: "routing and trading_defaults reloaded".to_string() }))
}
