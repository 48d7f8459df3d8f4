//! Axum router and the single HTTP handler for pension-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. The handler is `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};

use pension_schemas::{CalculationRequest, CalculationResponse};

use crate::{error::ApiError, state::AppState};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/calculation-requests",
            post(calculation_requests).fallback(wrong_method),
        )
        .with_state(state)
}

pub(crate) async fn calculation_requests(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CalculationRequest>, JsonRejection>,
) -> Result<Json<CalculationResponse>, ApiError> {
    let Json(request) = body?;

    if request.calculation_instructions.mutations.is_empty() {
        return Err(ApiError::bad_request("At least one mutation is required"));
    }

    let response = pension_engine::process(&request, state.scheme_rates.as_ref()).await;
    Ok(Json(response))
}

pub(crate) async fn wrong_method() -> ApiError {
    ApiError::method_not_allowed()
}
