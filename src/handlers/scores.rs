//! High-score HTTP handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, span, Instrument, Level};

use crate::{
    app::AppState,
    config::database::get_connection,
    db::games::Game,
    db::scores::{HighScore, NewHighScore},
    middleware::identity::CurrentUser,
    utils::{errors::StoreServiceError, metrics},
};

#[derive(Debug, Deserialize)]
pub struct SubmitScoreData {
    pub score: i32,
}

/// Handles POST /games/:id/scores requests.
pub async fn submit_score_handler(
    Path(game_id): Path<i32>,
    CurrentUser(player_id): CurrentUser,
    State(app_state): State<Arc<AppState>>,
    Json(data): Json<SubmitScoreData>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request",
        method = "POST",
        path = "/games/:id/scores",
        game_id = game_id,
        player_id = player_id
    );
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/games/:id/scores");

    async move {
        info!("Received high-score submission");

        let result = (|| -> Result<HighScore, StoreServiceError> {
            let mut conn = get_connection(&app_state.pool)?;
            Game::find(&mut conn, game_id)?;

            HighScore::create(
                &mut conn,
                NewHighScore {
                    user_id: player_id,
                    game_id,
                    score: data.score,
                },
            )
        })();

        let response = match result {
            Ok(score) => (StatusCode::CREATED, Json(json!({ "score": score }))).into_response(),
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/games/:id/scores", "POST", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}

/// Handles GET /games/:id/scores requests. Best first.
pub async fn game_scores_handler(
    Path(game_id): Path<i32>,
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request",
        method = "GET",
        path = "/games/:id/scores",
        game_id = game_id
    );
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/games/:id/scores");

    async move {
        let result = (|| -> Result<Vec<HighScore>, StoreServiceError> {
            let mut conn = get_connection(&app_state.pool)?;
            Game::find(&mut conn, game_id)?;
            HighScore::for_game(&mut conn, game_id)
        })();

        let response = match result {
            Ok(scores) => (StatusCode::OK, Json(json!({ "scores": scores }))).into_response(),
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/games/:id/scores", "GET", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}

/// Handles GET /high-scores requests. The global board, best first.
pub async fn high_scores_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request", method = "GET", path = "/high-scores");
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/high-scores");

    async move {
        let result = (|| -> Result<Vec<HighScore>, StoreServiceError> {
            let mut conn = get_connection(&app_state.pool)?;
            HighScore::all(&mut conn)
        })();

        let response = match result {
            Ok(scores) => (StatusCode::OK, Json(json!({ "scores": scores }))).into_response(),
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/high-scores", "GET", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}
