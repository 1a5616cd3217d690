//! Save-state HTTP handlers.
//!
//! Called from the game iframe over AJAX, so the load response keeps the
//! `{"found": 1, "state": ...}` shape the embedded games expect. Only owners
//! can save and load.

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
    db::games::{Game, Ownership},
    db::saves::{NewSave, Save},
    middleware::identity::CurrentUser,
    utils::{errors::StoreServiceError, metrics},
};

#[derive(Debug, Deserialize)]
pub struct SaveStateData {
    pub state: serde_json::Value,
}

fn require_ownership(
    conn: &mut diesel::SqliteConnection,
    player_id: i32,
    game_id: i32,
) -> Result<(), StoreServiceError> {
    // Also rejects save/load against games that do not exist.
    Game::find(conn, game_id)?;
    if Ownership::exists(conn, player_id, game_id)? {
        Ok(())
    } else {
        Err(StoreServiceError::forbidden(
            "You must own this game to save or load",
        ))
    }
}

/// Handles POST /games/:id/save requests.
pub async fn save_state_handler(
    Path(game_id): Path<i32>,
    CurrentUser(player_id): CurrentUser,
    State(app_state): State<Arc<AppState>>,
    Json(data): Json<SaveStateData>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request",
        method = "POST",
        path = "/games/:id/save",
        game_id = game_id,
        player_id = player_id
    );
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/games/:id/save");

    async move {
        info!("Received save-state request");

        let result = (|| -> Result<Save, StoreServiceError> {
            let mut conn = get_connection(&app_state.pool)?;
            require_ownership(&mut conn, player_id, game_id)?;

            Save::create(
                &mut conn,
                NewSave {
                    user_id: player_id,
                    game_id,
                    game_state: data.state.to_string(),
                    created_at: chrono::Utc::now().naive_utc(),
                },
            )
        })();

        let response = match result {
            Ok(_) => (StatusCode::OK, Json(json!({ "saved": 1 }))).into_response(),
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/games/:id/save", "POST", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}

/// Handles GET /games/:id/load requests. Returns the most recent save.
pub async fn load_state_handler(
    Path(game_id): Path<i32>,
    CurrentUser(player_id): CurrentUser,
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request",
        method = "GET",
        path = "/games/:id/load",
        game_id = game_id,
        player_id = player_id
    );
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/games/:id/load");

    async move {
        let result = (|| -> Result<Option<Save>, StoreServiceError> {
            let mut conn = get_connection(&app_state.pool)?;
            require_ownership(&mut conn, player_id, game_id)?;
            Save::latest(&mut conn, player_id, game_id)
        })();

        let response = match result {
            Ok(Some(save)) => {
                let state: serde_json::Value = serde_json::from_str(&save.game_state)
                    .unwrap_or(serde_json::Value::Null);
                (StatusCode::OK, Json(json!({ "found": 1, "state": state }))).into_response()
            }
            Ok(None) => (StatusCode::OK, Json(json!({ "found": 0 }))).into_response(),
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/games/:id/load", "GET", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}
