//! Controller-level errors, converging on [`fleet_core::FleetError`].

use fleet_core::AccountName;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ControllerError {
    #[error("unknown account: {0}")]
    UnknownAccount(AccountName),
}

impl From<ControllerError> for fleet_core::FleetError {
    fn from(value: ControllerError) -> Self {
        match value {
            ControllerError::UnknownAccount(account) => fleet_core::FleetError::UnknownAccount(account),
        }
    }
}
