//! Wire schema for the HTTP API (spec.md §4.7, §6).

use fleet_core::command::{CommandMethod, CommandOutcome, ExitMode, OrderEvidence, ScaleLevel, Side};
use fleet_core::AccountName;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// POSTed webhook intent (spec.md §4.7). Only `symbol` is required; the
/// rest fall back to `trading_defaults` when absent (SPEC_FULL §4.7).
#[derive(Debug, Clone, Deserialize)]
pub struct IntentPayload {
    /// `Option` so a payload missing `symbol` still deserializes — the
    /// handler turns its absence into a 400, rather than letting serde's
    /// data error surface as axum's 422 `JsonRejection` (spec.md §6).
    pub symbol: Option<SmolStr>,
    pub action: Option<Side>,
    #[serde(rename = "orderQty")]
    pub order_qty: Option<u64>,
    #[serde(rename = "orderType")]
    pub order_type: Option<OrderType>,
    #[serde(rename = "entryPrice")]
    pub entry_price: Option<SmolStr>,
    #[serde(rename = "takeProfitPrice")]
    pub take_profit_price: Option<SmolStr>,
    #[serde(rename = "tradeType")]
    pub trade_type: Option<TradeType>,
    pub strategy: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub enum TradeType {
    Open,
    Close,
}

/// `POST /api/trade` (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct TradeRequest {
    pub symbol: SmolStr,
    pub qty: u64,
    pub side: Side,
    pub tp: u32,
    pub sl: u32,
    pub tick: SmolStr,
    pub account: Option<String>,
    /// Present only for scale entries; absent means a plain `enter`.
    #[serde(default)]
    pub levels: Vec<ScaleLevel>,
}

/// `POST /api/exit` (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct ExitRequest {
    pub symbol: SmolStr,
    pub mode: ExitMode,
    pub account: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifiedEntry {
    pub account: String,
    pub orders: Vec<OrderEvidence>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedEntry {
    pub account: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Aggregate response shape (spec.md §6): `success` is `true` iff
/// `failed` is empty.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResponse {
    pub success: bool,
    pub message: String,
    pub verified: Vec<VerifiedEntry>,
    pub failed: Vec<FailedEntry>,
    /// Not part of the wire contract (spec.md §6 shows only the four
    /// fields above); drives [`TradeResponse`]'s status-code mapping.
    #[serde(skip)]
    pub all_timed_out: bool,
}

impl AggregateResponse {
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = (String, CommandOutcome)>) -> Self {
        let mut verified = Vec::new();
        let mut failed = Vec::new();
        let mut timed_out = 0usize;
        for (account, outcome) in outcomes {
            match outcome {
                CommandOutcome::Verified(payload) => verified.push(VerifiedEntry { account, orders: payload.orders }),
                CommandOutcome::Rejected(reason) => failed.push(FailedEntry { account, error: "rejected".to_string(), details: Some(reason) }),
                CommandOutcome::Error(reason) => failed.push(FailedEntry { account, error: "error".to_string(), details: Some(reason) }),
                CommandOutcome::Timeout => {
                    timed_out += 1;
                    failed.push(FailedEntry { account, error: "timeout".to_string(), details: None });
                }
            }
        }
        let success = failed.is_empty();
        let message = if success {
            "all accounts verified".to_string()
        } else {
            format!("{} of {} accounts failed", failed.len(), verified.len() + failed.len())
        };
        let all_timed_out = verified.is_empty() && !failed.is_empty() && timed_out == failed.len();
        Self { success, message, verified, failed, all_timed_out }
    }
}

/// Wraps an [`AggregateResponse`] for `/api/trade` and `/api/exit`
/// (spec.md §6): `504` when every per-account slot timed out, `200`
/// otherwise — including the partial-failure case, which is still a
/// successful HTTP exchange carrying per-account detail.
pub struct TradeResponse(pub AggregateResponse);

impl axum::response::IntoResponse for TradeResponse {
    fn into_response(self) -> axum::response::Response {
        let status = if self.0.all_timed_out {
            axum::http::StatusCode::GATEWAY_TIMEOUT
        } else {
            axum::http::StatusCode::OK
        };
        (status, axum::Json(self.0)).into_response()
    }
}

/// Builds the `CommandMethod` and target account set for a `TradeRequest`.
pub fn trade_method(request: &TradeRequest) -> CommandMethod {
    if request.levels.is_empty() {
        CommandMethod::Enter {
            symbol: request.symbol.clone(),
            qty: request.qty,
            side: request.side,
            tp_ticks: request.tp,
            sl_ticks: request.sl,
            tick_size: request.tick.clone(),
        }
    } else {
        CommandMethod::ScaleEnter {
            symbol: request.symbol.clone(),
            levels: request.levels.clone(),
            side: request.side,
            tp_ticks: request.tp,
            sl_ticks: request.sl,
            tick_size: request.tick.clone(),
        }
    }
}

pub fn exit_method(request: &ExitRequest) -> CommandMethod {
    CommandMethod::Exit { symbol: request.symbol.clone(), mode: request.mode }
}

/// Normalizes a webhook intent into an `enter` command, applying
/// `trading_defaults` for any field the caller omitted (SPEC_FULL §4.7).
/// `symbol` is taken separately, already validated as present by the
/// caller (spec.md §6: missing `symbol` is a 400, handled before this is
/// reached).
pub fn intent_method(symbol: SmolStr, intent: &IntentPayload, defaults: &fleet_core::config::TradingDefaults) -> CommandMethod {
    let tick_size = SmolStr::new(defaults.tick_size_for(symbol.as_str()).to_string());
    CommandMethod::Enter {
        symbol,
        qty: intent.order_qty.unwrap_or(defaults.quantity),
        side: intent.action.unwrap_or(Side::Buy),
        tp_ticks: defaults.tp_ticks,
        sl_ticks: defaults.sl_ticks,
        tick_size,
    }
}

pub fn parse_account(account: &Option<String>) -> Option<AccountName> {
    account.as_deref().map(AccountName::from)
}
