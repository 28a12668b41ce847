//! `POST /api/exit` (spec.md §6).

use axum::extract::State;
use axum::Json;
use fleet_core::command::CommandOutcome;
use tracing::instrument;

use crate::error::{ApiError, Result};
use crate::schema::{exit_method, parse_account, AggregateResponse, ExitRequest, TradeResponse};
use crate::state::AppState;

#[instrument(skip(state, request), fields(symbol = %request.symbol))]
pub async fn exit_handler(State(state): State<AppState>, Json(request): Json<ExitRequest>) -> Result<TradeResponse> {
    if request.symbol.is_empty() {
        return Err(ApiError::InvalidRequest("symbol is required".to_string()));
    }

    let method = exit_method(&request);
    let account = parse_account(&request.account);

    let outcomes: Vec<(String, CommandOutcome)> = match account {
        Some(account) => {
            let outcome = state.controller.call_one(&account, method).await.map_err(fleet_core::FleetError::from)?;
            vec![(account.as_str().to_string(), outcome)]
        }
        None => {
            let record = state.controller.call_all(method).await;
            record.per_account_results.into_iter().collect()
        }
    };

    Ok(TradeResponse(AggregateResponse::from_outcomes(outcomes)))
}
