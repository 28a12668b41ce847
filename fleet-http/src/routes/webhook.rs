//! Intent Router (spec.md §4.7): HTTP ingress for external trading
//! intents, routed through the strategy → accounts table.

use axum::extract::State;
use axum::Json;
use fleet_core::id::{StrategyName, DEFAULT_STRATEGY};
use tracing::{info, instrument};

use crate::error::{ApiError, Result};
use crate::schema::{intent_method, AggregateResponse, IntentPayload};
use crate::state::AppState;

/// `POST /webhook` (spec.md §4.7). No deduplication at this layer
/// (SPEC_FULL §9 Open Question resolution): two identical POSTs submit
/// two entries.
///
/// `symbol` is `Option` on [`IntentPayload`] so a payload that omits it
/// still deserializes into the handler, where its absence is reported as
/// a 400 — not as axum's 422 `JsonRejection` for a serde data error.
#[instrument(skip(state, intent))]
pub async fn webhook_handler(State(state): State<AppState>, Json(intent): Json<IntentPayload>) -> Result<Json<AggregateResponse>> {
    let symbol = intent
        .symbol
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("missing symbol".to_string()))?;

    let strategy = intent
        .strategy
        .as_deref()
        .map(StrategyName::from)
        .unwrap_or_else(|| StrategyName::from(DEFAULT_STRATEGY));
    let accounts = state.controller.routing().resolve(&strategy).to_vec();
    info!(symbol = %symbol, strategy = %strategy, account_count = accounts.len(), "routing webhook intent");

    let defaults = state.config.read().trading_defaults.clone();
    let method = intent_method(symbol, &intent, &defaults);
    let record = state.controller.call_accounts(accounts, method).await;

    let outcomes = record.per_account_results.into_iter();
    Ok(Json(AggregateResponse::from_outcomes(outcomes)))
}
