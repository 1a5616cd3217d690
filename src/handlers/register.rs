//! Registration HTTP handler.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{info, span, Instrument, Level};

use crate::{
    app::AppState,
    db::users::RegisterData,
    handlers::register_logic::process_registration,
    utils::metrics,
};

/// Handles POST /accounts/register requests.
pub async fn register_handler(
    State(app_state): State<Arc<AppState>>,
    Json(data): Json<RegisterData>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request",
        method = "POST",
        path = "/accounts/register",
        username = %data.username
    );
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/accounts/register");

    async move {
        info!("Received registration request");

        let result = process_registration(&app_state, data).await;

        let response = match result {
            Ok(body) => (StatusCode::CREATED, Json(body)).into_response(),
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/accounts/register", "POST", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}
