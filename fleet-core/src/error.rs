//! Aggregate error type for the fleet orchestrator.
//!
//! Every crate in the workspace raises its own `thiserror`-derived enum
//! scoped to its own failure modes (`SupervisorError`, `AdapterError`,
//! `WatchdogError`, `ApiError`); each of those converts into
//! [`FleetError`] via `#[from]` so nothing above a crate boundary ever
//! matches on another crate's internal error type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::AccountName;

/// Central error type the orchestrator's binary and its top-level wiring
/// deal in. Individual crates define their own narrower error enums and
/// convert into this one at the crate boundary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Error)]
pub enum FleetError {
    /// §7 `LaunchFailed`: the Supervisor could not bring a process to a
    /// responsive debug port within the startup window.
    #[error("launch failed for {account}: {reason}")]
    LaunchFailed { account: AccountName, reason: String },

    /// §7 `AttachFailed`: the debug client could not attach or enumerate
    /// tabs. Handled internally by the adapter (re-enter `Attaching`) but
    /// surfaced here when it escapes a retry budget.
    #[error("attach failed for {account}: {reason}")]
    AttachFailed { account: AccountName, reason: String },

    /// §7 `InjectionFailed`: bundle globals absent after evaluation, and
    /// the retry/backoff budget was exhausted.
    #[error("injection failed for {account} after {attempts} attempts: {reason}")]
    InjectionFailed {
        account: AccountName,
        attempts: u32,
        reason: String,
    },

    /// §7 `RecoveryExhausted`: the watchdog's recovery budget was hit.
    #[error("recovery exhausted for {account}: {reason}")]
    RecoveryExhausted { account: AccountName, reason: String },

    /// §7 `ConfigInvalid`: startup configuration fails the protected-port
    /// or port-uniqueness checks. Fatal — aborts startup.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// An account was referenced that has no instance record.
    #[error("unknown account: {0}")]
    UnknownAccount(AccountName),

    /// A `tokio::task::JoinError` surfaced by a spawned task.
    #[error("join error: {0}")]
    JoinError(String),

    /// Fleet-wide I/O failure (snapshot persistence, config load).
    #[error("io error: {0}")]
    Io(String),
}

impl From<tokio::task::JoinError> for FleetError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::JoinError(format!("{value:?}"))
    }
}

impl From<std::io::Error> for FleetError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}
