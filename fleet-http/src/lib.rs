#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # fleet-http — Intent Router & Dashboard API
//!
//! Components G and H of the Browser Fleet Orchestrator (spec.md §2,
//! §4.7, §4.8). Thin `axum` layer: write endpoints proxy the Fleet
//! Controller's command API, read endpoints proxy its read-only
//! `snapshot()` projection. The server never pushes — refresh cadence
//! for read endpoints is entirely client-driven (spec.md §4.8).

pub mod error;
pub mod routes;
pub mod schema;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

/// Assembles the full route table (spec.md §6): `/webhook`, `/api/trade`,
/// `/api/exit`, `/api/accounts`, `/health`, plus the operator-only
/// `/api/reload` (SPEC_FULL §6).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(routes::webhook::webhook_handler))
        .route("/api/trade", post(routes::trade::trade_handler))
        .route("/api/exit", post(routes::exit::exit_handler))
        .route("/api/accounts", get(routes::dashboard::accounts_handler))
        .route("/api/reload", get(routes::dashboard::reload_handler))
        .route("/health", get(routes::dashboard::health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::config::{FleetConfig, HttpConfig, RoutingConfig, TradingDefaults, WatchdogConfig};
    use fleet_core::routing::RoutingTable;
    use fleet_controller::FleetController;
    use indexmap::IndexMap;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn sample_config() -> FleetConfig {
        let mut strategies = IndexMap::new();
        strategies.insert("DEFAULT".to_string(), vec!["acc0".to_string()]);
        FleetConfig {
            protected_port: 9222,
            managed_port_base: 9223,
            max_instances: 8,
            data_dir: "./var".to_string(),
            credentials: HashMap::new(),
            routing: RoutingConfig { strategies },
            trading_defaults: TradingDefaults {
                quantity: 1,
                tp_ticks: 40,
                sl_ticks: 20,
                rr_ratio: 2.0,
                tick_overrides: HashMap::new(),
            },
            watchdog: WatchdogConfig::default(),
            http: HttpConfig::default(),
            trading_host: "trade.example.com".to_string(),
            browser_binary: "/usr/bin/chromium".to_string(),
        }
    }

    /// *S6 — Routing fallback*: routing table has only `DEFAULT`; an
    /// unknown strategy still resolves, and a request with no accounts
    /// registered reports every resolved account as failed (there is no
    /// live adapter), never a silent empty aggregate.
    #[tokio::test]
    async fn health_endpoint_reports_empty_fleet() {
        let config = sample_config();
        let controller = Arc::new(FleetController::new(config.routing.as_table()));
        let state = AppState::new(controller, config, "./fleet.toml");
        let app = router(state);

        let response = app
            .oneshot(axum::http::Request::builder().uri("/health").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn webhook_rejects_missing_symbol() {
        let config = sample_config();
        let controller = Arc::new(FleetController::new(config.routing.as_table()));
        let state = AppState::new(controller, config, "./fleet.toml");
        let app = router(state);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn routing_table_requires_default_entry() {
        assert!(RoutingTable::default().validate().is_err());
    }
}
