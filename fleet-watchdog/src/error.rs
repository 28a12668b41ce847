//! `WatchdogError` (spec.md §7).

use fleet_core::AccountName;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum WatchdogError {
    #[error("recovery for {account} exceeded its budget of {budget_secs}s")]
    RecoveryExhausted { account: AccountName, budget_secs: u64 },

    #[error("failed to persist snapshot for {account}: {reason}")]
    SnapshotWriteFailed { account: AccountName, reason: String },
}

impl From<WatchdogError> for fleet_core::FleetError {
    fn from(value: WatchdogError) -> Self {
        match value {
            WatchdogError::RecoveryExhausted { account, budget_secs } => fleet_core::FleetError::RecoveryExhausted {
                account,
                reason: format!("budget of {budget_secs}s exceeded"),
            },
            WatchdogError::SnapshotWriteFailed { account, reason } => fleet_core::FleetError::Io(format!("{account}: {reason}")),
        }
    }
}
