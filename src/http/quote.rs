//! Quote protocol handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::blockchain::ChainNode;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::quoting::{AcceptQuoteRequest, AcceptedQuote, Quote, QuoteRequest};

/// `POST /getQuote`
pub async fn get_quote<N: ChainNode>(
    State(state): State<AppState<N>>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<Vec<Quote>>, ApiError> {
    let Json(request) = payload?;
    tracing::debug!(
        contract = %request.call_contract_address,
        value = %request.value_to_transfer,
        gas_limit = request.gas_limit,
        "Quote requested"
    );

    let quotes = state.protocol.get_quotes(&request).await?;
    Ok(Json(quotes))
}

/// `POST /acceptQuote`
pub async fn accept_quote<N: ChainNode>(
    State(state): State<AppState<N>>,
    payload: Result<Json<AcceptQuoteRequest>, JsonRejection>,
) -> Result<Json<AcceptedQuote>, ApiError> {
    let Json(request) = payload?;
    let accepted = state.protocol.accept_quote(&request.quote_hash).await?;
    Ok(Json(accepted))
}

/// `GET /health`
pub async fn health<N: ChainNode>(State(state): State<AppState<N>>) -> impl IntoResponse {
    if state.protocol.connector().is_healthy().await {
        (StatusCode::OK, Json(json!({ "status": "ok", "chain": "reachable" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "chain": "unreachable" })),
        )
    }
}
