//! The command/result taxonomy the Session Adapter's public API is built
//! from (spec.md §4.3, §3).

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::id::{AccountName, CommandId};

/// One order leg or level as reported back by the injected bundle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderEvidence {
    pub symbol: SmolStr,
    pub qty: u64,
    pub side: SmolStr,
    pub status: SmolStr,
    /// Decimal price rendered as a string — the bundle's JSON payload may
    /// use either a float or string; the adapter normalizes to a string so
    /// no precision is lost crossing the `evaluate` boundary.
    pub price: SmolStr,
}

/// The named operations a Session Adapter exposes (spec.md §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum CommandMethod {
    Enter {
        symbol: SmolStr,
        qty: u64,
        side: Side,
        tp_ticks: u32,
        sl_ticks: u32,
        tick_size: SmolStr,
    },
    ScaleEnter {
        symbol: SmolStr,
        levels: Vec<ScaleLevel>,
        side: Side,
        tp_ticks: u32,
        sl_ticks: u32,
        tick_size: SmolStr,
    },
    Exit {
        symbol: SmolStr,
        mode: ExitMode,
    },
    SetSymbol {
        symbol: SmolStr,
    },
    ReadState,
}

impl CommandMethod {
    /// Per-method timeout (spec.md §4.3 "Timeouts").
    pub fn timeout(&self) -> std::time::Duration {
        match self {
            CommandMethod::ScaleEnter { levels, .. } => {
                std::time::Duration::from_secs(15) + std::time::Duration::from_secs(2 * levels.len() as u64)
            }
            _ => std::time::Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ExitMode {
    Flatten,
    CancelWorking,
    FlattenAndCancel,
    Reverse,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScaleLevel {
    pub qty: u64,
    pub price: SmolStr,
}

/// Per-command, per-account outcome (spec.md §3, the adapter's state
/// machine terminal states).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum CommandOutcome {
    /// Evidence read back from the page after the operation completed
    /// confirms the command. Never set from dispatch-side information
    /// alone (spec.md §9 "source of truth" discipline).
    Verified(CommandPayload),
    /// The bundle reported a negative outcome with a reason.
    Rejected(String),
    /// Transport or evaluated-code exception.
    Error(String),
    /// The promise did not resolve within the per-method budget.
    Timeout,
}

impl CommandOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, CommandOutcome::Verified(_))
    }
}

/// Evidence payload backing a [`CommandOutcome::Verified`] result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandPayload {
    pub orders: Vec<OrderEvidence>,
    /// Present only for `read_state`.
    pub state: Option<ReadStateSnapshot>,
}

impl CommandPayload {
    pub fn orders(orders: Vec<OrderEvidence>) -> Self {
        Self { orders, state: None }
    }

    pub fn state(state: ReadStateSnapshot) -> Self {
        Self { orders: Vec::new(), state: Some(state) }
    }
}

/// The `read_state()` projection (spec.md §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReadStateSnapshot {
    pub symbol: SmolStr,
    pub qty: u64,
    pub pending_orders: Vec<OrderEvidence>,
    pub positions: Vec<OrderEvidence>,
}

/// One fan-out invocation and its per-account results (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandRecord {
    pub command_id: CommandId,
    pub method: CommandMethod,
    /// Insertion-order preserved so Dashboard JSON output is stable
    /// (SPEC_FULL §3).
    pub per_account_results: IndexMap<String, CommandOutcome>,
    pub issued_at: DateTime<Utc>,
}

impl CommandRecord {
    pub fn new(method: CommandMethod) -> Self {
        Self {
            command_id: CommandId::new(),
            method,
            per_account_results: IndexMap::new(),
            issued_at: Utc::now(),
        }
    }

    pub fn record(&mut self, account: &AccountName, outcome: CommandOutcome) {
        self.per_account_results.insert(account.as_str().to_string(), outcome);
    }

    /// Aggregate success per spec.md §4.6: **all** entries `Verified`.
    pub fn all_verified(&self) -> bool {
        !self.per_account_results.is_empty()
            && self.per_account_results.values().all(CommandOutcome::is_verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_verified_requires_every_account() {
        let mut record = CommandRecord::new(CommandMethod::ReadState);
        record.record(&AccountName::from("a"), CommandOutcome::Verified(CommandPayload::orders(vec![])));
        assert!(record.all_verified());
        record.record(&AccountName::from("b"), CommandOutcome::Timeout);
        assert!(!record.all_verified());
    }

    #[test]
    fn empty_aggregate_is_not_verified() {
        let record = CommandRecord::new(CommandMethod::ReadState);
        assert!(!record.all_verified());
    }

    #[test]
    fn scale_enter_timeout_scales_with_levels() {
        let method = CommandMethod::ScaleEnter {
            symbol: "NQ".into(),
            levels: vec![
                ScaleLevel { qty: 1, price: "100".into() },
                ScaleLevel { qty: 1, price: "101".into() },
                ScaleLevel { qty: 1, price: "102".into() },
            ],
            side: Side::Buy,
            tp_ticks: 10,
            sl_ticks: 10,
            tick_size: "0.25".into(),
        };
        assert_eq!(method.timeout(), std::time::Duration::from_secs(21));
    }
}
