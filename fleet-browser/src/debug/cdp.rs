//! Minimal Chrome DevTools Protocol message shapes — only the methods
//! spec.md §6 says this system consumes: `Runtime.evaluate`,
//! `Page.navigate`, `Runtime.consoleAPICalled`, `Runtime.exceptionThrown`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tab as reported by `GET /json` on the browser's debug port.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TabInfo {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// A CDP request envelope. `id` is a monotonically increasing `u64` per
/// session, matched against responses to implement the "ordering within a
/// session" guarantee (spec.md §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl CdpRequest {
    pub fn evaluate(id: u64, expression: &str, await_promise: bool) -> Self {
        Self {
            id,
            method: "Runtime.evaluate".to_string(),
            params: serde_json::json!({
                "expression": expression,
                "awaitPromise": await_promise,
                "returnByValue": true,
            }),
        }
    }

    pub fn navigate(id: u64, url: &str) -> Self {
        Self {
            id,
            method: "Page.navigate".to_string(),
            params: serde_json::json!({ "url": url }),
        }
    }

    pub fn enable_runtime(id: u64) -> Self {
        Self { id, method: "Runtime.enable".to_string(), params: serde_json::json!({}) }
    }
}

/// A CDP response envelope (for requests) or event envelope (unsolicited).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CdpMessage {
    Response {
        id: u64,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<CdpError>,
    },
    Event {
        method: String,
        #[serde(default)]
        params: Value,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct CdpError {
    pub code: i64,
    pub message: String,
}

/// The payload of a `Runtime.evaluate` response's `result.result`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateResult {
    pub result: RemoteObject,
    #[serde(rename = "exceptionDetails", default)]
    pub exception_details: Option<Value>,
}
