//! Invariants 3 (verification grounding) and 4 (partial-failure
//! faithfulness) from spec.md §8, driven against a mock bundle returning
//! arbitrary mixed discriminants.

use std::sync::Arc;

use fleet_adapter::SessionAdapter;
use fleet_browser::debug::cdp::TabInfo;
use fleet_browser::debug::mock::MockDebugTransport;
use fleet_core::command::{CommandMethod, Side};
use fleet_core::instance::InstanceRecord;
use fleet_core::routing::RoutingTable;
use fleet_core::{AccountName, StrategyName};
use fleet_controller::FleetController;
use indexmap::IndexMap;
use proptest::prelude::*;
use serde_json::json;

fn tab() -> TabInfo {
    TabInfo {
        id: "tab-1".to_string(),
        title: "Trading".to_string(),
        url: "https://trade.example.com/dashboard".to_string(),
        web_socket_debugger_url: "ws://127.0.0.1:9223/devtools/page/tab-1".to_string(),
    }
}

fn adapter_with_discriminant(account: &str, port: u16, success: bool) -> (Arc<SessionAdapter>, InstanceRecord) {
    let transport = MockDebugTransport::new(
        vec![tab()],
        Arc::new(move |expr: &str| {
            if expr.starts_with("JSON.stringify([typeof") {
                Ok(json!([true, true, true, true, true]))
            } else if success {
                Ok(json!({"success": true, "orders": [{"symbol":"NQ","qty":1,"side":"Buy","status":"Filled","price":"100"}]}))
            } else {
                Ok(json!({"success": false, "rejectionReason": "risk limit"}))
            }
        }),
    );
    let adapter = Arc::new(SessionAdapter::new(AccountName::from(account), port, "trade.example.com", Arc::new(transport)));
    let record = InstanceRecord::new(AccountName::from(account), port, format!("/tmp/{account}"));
    (adapter, record)
}

fn default_routing() -> RoutingTable {
    let mut entries = IndexMap::new();
    entries.insert(StrategyName::from("DEFAULT"), vec![]);
    RoutingTable::new(entries)
}

proptest! {
    /// Invariant 3: every `Verified` result corresponds to a bundle
    /// payload whose `success` discriminant was `true` — never inferred
    /// from dispatch alone.
    #[test]
    fn verification_is_grounded_in_bundle_success(discriminants in prop::collection::vec(any::<bool>(), 1..6)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let controller = FleetController::new(default_routing());
            let mut accounts = vec![];
            for (i, success) in discriminants.iter().enumerate() {
                let account = format!("acc{i}");
                let (adapter, record) = adapter_with_discriminant(&account, 9223 + i as u16, *success);
                controller.register(adapter, record);
                accounts.push(AccountName::from(account.as_str()));
            }

            let method = CommandMethod::Enter {
                symbol: "NQ".into(), qty: 1, side: Side::Buy, tp_ticks: 100, sl_ticks: 40, tick_size: "0.25".into(),
            };
            let result = controller.call_accounts(accounts.clone(), method).await;

            for (account, expected_success) in accounts.iter().zip(discriminants.iter()) {
                let outcome = result.per_account_results.get(account.as_str()).unwrap();
                prop_assert_eq!(outcome.is_verified(), *expected_success);
            }
            Ok(())
        })?;
    }

    /// Invariant 4: `call_all`/`call_accounts` over K adapters returns
    /// exactly K per-account entries, regardless of the outcome mix.
    #[test]
    fn fan_out_returns_exactly_k_entries(discriminants in prop::collection::vec(any::<bool>(), 0..8)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let controller = FleetController::new(default_routing());
            let mut accounts = vec![];
            for (i, success) in discriminants.iter().enumerate() {
                let account = format!("acc{i}");
                let (adapter, record) = adapter_with_discriminant(&account, 9300 + i as u16, *success);
                controller.register(adapter, record);
                accounts.push(AccountName::from(account.as_str()));
            }
            let method = CommandMethod::ReadState;
            let result = controller.call_accounts(accounts.clone(), method).await;
            prop_assert_eq!(result.per_account_results.len(), accounts.len());
            Ok(())
        })?;
    }
}

#[tokio::test]
async fn all_verified_requires_every_account_to_succeed() {
    let controller = FleetController::new(default_routing());
    let (a, ra) = adapter_with_discriminant("acc0", 9400, true);
    let (b, rb) = adapter_with_discriminant("acc1", 9401, false);
    controller.register(a, ra);
    controller.register(b, rb);

    let method = CommandMethod::Enter { symbol: "NQ".into(), qty: 1, side: Side::Buy, tp_ticks: 100, sl_ticks: 40, tick_size: "0.25".into() };
    let result = controller.call_all(method).await;
    assert_eq!(result.per_account_results.len(), 2);
    assert!(!result.all_verified());
}
