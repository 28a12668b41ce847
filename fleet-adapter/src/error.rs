//! `AdapterError` (spec.md §7), converging on [`fleet_core::FleetError`].

use fleet_core::AccountName;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum AdapterError {
    #[error("{account}: debug client could not attach or enumerate tabs: {reason}")]
    AttachFailed { account: AccountName, reason: String },

    #[error("{account}: bundle globals absent after {attempts} injection attempts: {reason}")]
    InjectionFailed { account: AccountName, attempts: u32, reason: String },

    #[error("{account}: no tab host matched the configured trading host")]
    NoTargetTab { account: AccountName },
}

impl From<AdapterError> for fleet_core::FleetError {
    fn from(value: AdapterError) -> Self {
        match value {
            AdapterError::AttachFailed { account, reason } => {
                fleet_core::FleetError::AttachFailed { account, reason }
            }
            AdapterError::InjectionFailed { account, attempts, reason } => {
                fleet_core::FleetError::InjectionFailed { account, attempts, reason }
            }
            AdapterError::NoTargetTab { account } => {
                fleet_core::FleetError::AttachFailed { account, reason: "no target tab".to_string() }
            }
        }
    }
}
