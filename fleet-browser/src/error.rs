//! `SupervisorError` and debug-transport errors (spec.md §7), both
//! converging on [`fleet_core::FleetError`].

use fleet_core::AccountName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("port {port} is the protected port and can never be assigned to an instance")]
    ProtectedPort { port: u16 },

    #[error("port {port} is already held by another instance record")]
    PortInUse { port: u16 },

    #[error("profile dir {path} is already owned by another instance record")]
    ProfileDirInUse { path: String },

    #[error("failed to spawn browser process for {account}: {source}")]
    SpawnFailed { account: AccountName, #[source] source: std::io::Error },

    #[error("debug port {port} did not become responsive within {timeout_secs}s")]
    StartupTimedOut { port: u16, timeout_secs: u64 },

    #[error("failed to create profile dir: {0}")]
    ProfileDirFailed(#[source] std::io::Error),
}

impl From<SupervisorError> for fleet_core::FleetError {
    fn from(value: SupervisorError) -> Self {
        fleet_core::FleetError::LaunchFailed {
            account: AccountName::from("unknown"),
            reason: value.to_string(),
        }
    }
}

/// Errors from the Debug-Protocol Client (spec.md §4.2), distinguishing
/// timeout, evaluated-code exception, and transport failure per the
/// operation's contract.
#[derive(Debug, Error, Clone)]
pub enum DebugError {
    #[error("evaluate timed out after {0}ms")]
    Timeout(u64),

    #[error("exception in evaluated code: {0}")]
    Exception(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("no tab matched the requested selector")]
    NoMatchingTab,
}
