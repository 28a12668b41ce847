//! `ApiError` (spec.md §7, SPEC_FULL §6): maps the error taxonomy onto
//! HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fleet_core::FleetError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unknown account: {0}")]
    UnknownAccount(String),
    #[error("fleet is not yet initialized")]
    NotReady,
    #[error(transparent)]
    Fleet(#[from] FleetError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownAccount(_) => StatusCode::BAD_REQUEST,
            ApiError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Fleet(FleetError::ConfigInvalid(_)) => StatusCode::BAD_REQUEST,
            ApiError::Fleet(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { success: false, message: self.to_string() })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
