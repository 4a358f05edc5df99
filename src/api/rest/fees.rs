use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::pricing::{resolve_fee, FeeQuote, FeeSelector};
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/fees/quote", post(quote))
}

#[derive(Deserialize)]
pub struct QuoteRequest {
    pub farmer_id: Uuid,
    #[serde(flatten)]
    pub selector: FeeSelector,
}

async fn quote(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<FeeQuote>, AppError> {
    let mode = payload.selector.mode_label();
    let result = resolve_fee(&state, payload.farmer_id, &payload.selector);

    let outcome = if result.is_ok() { "success" } else { "error" };
    state
        .metrics
        .fee_quotes_total
        .with_label_values(&[mode, outcome])
        .inc();

    result.map(Json)
}
