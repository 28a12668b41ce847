//! The pre-restart state snapshot record (spec.md §3, §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::command::OrderEvidence;
use crate::id::AccountName;

/// Configured trading parameters as read from the page UI at capture
/// time — the only part of a snapshot that gets replayed on restore
/// (spec.md §4.5: order recreation is the trading application's
/// responsibility, not ours).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TradingParameters {
    pub symbol: SmolStr,
    pub qty: u64,
    pub tp_ticks: u32,
    pub sl_ticks: u32,
}

/// Captured immediately before a terminate-and-restart (spec.md §4.5).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SnapshotRecord {
    pub account_name: AccountName,
    pub parameters: TradingParameters,
    /// Read-only at capture time; not replayed on restore.
    pub pending_orders: Vec<OrderEvidence>,
    /// Read-only at capture time; not replayed on restore.
    pub positions: Vec<OrderEvidence>,
    pub captured_at: DateTime<Utc>,
}

impl SnapshotRecord {
    pub fn new(
        account_name: AccountName,
        parameters: TradingParameters,
        pending_orders: Vec<OrderEvidence>,
        positions: Vec<OrderEvidence>,
    ) -> Self {
        Self {
            account_name,
            parameters,
            pending_orders,
            positions,
            captured_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let snapshot = SnapshotRecord::new(
            AccountName::from("acc0"),
            TradingParameters { symbol: "ES".into(), qty: 3, tp_ticks: 40, sl_ticks: 20 },
            vec![],
            vec![],
        );
        let encoded = serde_json::to_string(&snapshot).expect("serialize");
        let decoded: SnapshotRecord = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(snapshot, decoded);
    }
}
