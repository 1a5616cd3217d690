//! Checkout HTTP handler.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, span, Instrument, Level};

use crate::{
    app::AppState,
    handlers::checkout_logic::{prepare_checkout, CheckoutOutcome},
    middleware::identity::CurrentUser,
    utils::metrics,
};

/// Handles GET /games/:id/buy requests.
///
/// Returns the provider form fields for the frontend to auto-submit, or an
/// `already_owned` marker telling the frontend to open the game instead.
pub async fn checkout_handler(
    Path(game_id): Path<i32>,
    CurrentUser(buyer_id): CurrentUser,
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request",
        method = "GET",
        path = "/games/:id/buy",
        game_id = game_id,
        buyer_id = buyer_id
    );
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/games/:id/buy");

    async move {
        info!("Received checkout request");

        let now = chrono::Utc::now().naive_utc();
        let result = prepare_checkout(&app_state, buyer_id, game_id, now).await;

        let response = match result {
            Ok(CheckoutOutcome::AlreadyOwned) => (
                StatusCode::OK,
                Json(json!({
                    "status": "already_owned",
                    "game_id": game_id,
                })),
            )
                .into_response(),
            Ok(CheckoutOutcome::Redirect(payment)) => (
                StatusCode::OK,
                Json(json!({
                    "status": "redirect",
                    "payment": payment,
                })),
            )
                .into_response(),
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/games/:id/buy", "GET", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    use crate::utils::test_utils::{insert_game, insert_user, test_state};

    fn app() -> (Router, Arc<AppState>) {
        metrics::init();
        let app_state = Arc::new(test_state());
        let router = Router::new()
            .route("/games/:id/buy", get(checkout_handler))
            .with_state(app_state.clone());
        (router, app_state)
    }

    #[tokio::test]
    async fn checkout_requires_identity() {
        let (app, state) = app();
        let mut conn = state.pool.get().unwrap();
        let dev = insert_user(&mut conn, "dev", "dev@example.com", true);
        let game = insert_game(&mut conn, "Space Miner", 500, dev.id);
        drop(conn);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/games/{}/buy", game.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn checkout_returns_provider_form_fields() {
        let (app, state) = app();
        let mut conn = state.pool.get().unwrap();
        let dev = insert_user(&mut conn, "dev", "dev@example.com", true);
        let buyer = insert_user(&mut conn, "buyer", "buyer@example.com", true);
        let game = insert_game(&mut conn, "Space Miner", 500, dev.id);
        drop(conn);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/games/{}/buy", game.id))
                    .header("x-user-id", buyer.id.to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "redirect");
        assert_eq!(json["payment"]["amount"], 500);
        assert_eq!(json["payment"]["sid"], "SID1");
        assert_eq!(json["payment"]["checksum"].as_str().unwrap().len(), 32);
    }
}
