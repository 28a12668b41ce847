//! The injected instrumentation bundle's global API surface (spec.md §6).
//! These types describe the contract the bundle's JSON payloads must
//! satisfy; the bundle itself is an opaque page-side artifact (spec.md
//! §1 out-of-scope).

use serde::Deserialize;
use smol_str::SmolStr;

use fleet_core::command::OrderEvidence;

/// The expected global names probed for after every (re)injection
/// (spec.md §4.3 "Script injection"). Missing any of these is a signal
/// to re-inject, never a command failure.
pub const EXPECTED_GLOBALS: &[&str] = &[
    "autoTrade",
    "auto_trade_scale",
    "clickExitForSymbol",
    "getConsoleLogs",
    "clearConsoleLogs",
];

/// `autoTrade(...)`'s resolved payload (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct AutoTradeReport {
    pub success: SuccessDiscriminant,
    #[serde(default)]
    pub orders: Vec<OrderEvidence>,
    #[serde(rename = "rejectionReason", default)]
    pub rejection_reason: Option<String>,
    #[serde(rename = "partialFills", default)]
    pub partial_fills: Option<Vec<OrderEvidence>>,
    #[serde(rename = "isPartiallyFilled", default)]
    pub is_partially_filled: Option<bool>,
}

/// The bundle's `success` discriminant is `true`, `false`, or the literal
/// string `"partial"` — never inferred from dispatch-side information
/// alone (spec.md §9 "source of truth" discipline).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SuccessDiscriminant {
    Bool(bool),
    Partial(PartialMarker),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PartialMarker {
    #[serde(rename = "partial")]
    Partial,
}

impl SuccessDiscriminant {
    pub fn is_success(&self) -> bool {
        matches!(self, SuccessDiscriminant::Bool(true))
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, SuccessDiscriminant::Partial(_))
    }
}

/// One level's verification from `auto_trade_scale` (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct ScaleLevelReport {
    pub success: SuccessDiscriminant,
    #[serde(default)]
    pub orders: Vec<OrderEvidence>,
    #[serde(rename = "rejectionReason", default)]
    pub rejection_reason: Option<String>,
}

/// `clickExitForSymbol(...)` returns a plain boolean; the adapter still
/// confirms the effect by re-reading the position delta rather than
/// trusting this boolean alone (spec.md §4.3 verification column).
pub type ExitDispatchAck = bool;

/// One console log line, as returned by `getConsoleLogs()` (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleLogLine {
    pub timestamp: SmolStr,
    pub level: SmolStr,
    pub message: SmolStr,
    pub url: SmolStr,
}
