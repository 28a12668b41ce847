//! `POST /api/trade` (spec.md §6): direct entry/scale-entry command,
//! optionally targeted at a single account.

use axum::extract::State;
use axum::Json;
use fleet_core::command::CommandOutcome;
use tracing::instrument;

use crate::error::{ApiError, Result};
use crate::schema::{parse_account, trade_method, AggregateResponse, TradeRequest, TradeResponse};
use crate::state::AppState;

#[instrument(skip(state, request), fields(symbol = %request.symbol))]
pub async fn trade_handler(State(state): State<AppState>, Json(request): Json<TradeRequest>) -> Result<TradeResponse> {
    if request.symbol.is_empty() || request.qty == 0 {
        return Err(ApiError::InvalidRequest("symbol and a positive qty are required".to_string()));
    }

    let method = trade_method(&request);
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
