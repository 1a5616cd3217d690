//! Game catalog HTTP handlers.
//!
//! Browsing is open to everyone; the detail view tailors its flags to the
//! caller when an identity header is present. Publishing is restricted to
//! developer accounts.

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
    db::categories::GameCategory,
    db::games::{Game, GameChanges, NewGame, Ownership},
    db::transactions::Transaction,
    db::users::User,
    middleware::identity::{CurrentUser, MaybeUser},
    utils::{errors::StoreServiceError, metrics, validators},
};

/// Request body for publishing or editing a game.
#[derive(Debug, Deserialize)]
pub struct PublishGameData {
    pub name: String,
    pub price: i32,
    pub url: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Handles GET /games requests. The full catalog, newest first.
pub async fn browse_games_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request", method = "GET", path = "/games");
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/games");

    async move {
        let result = (|| -> Result<Vec<Game>, StoreServiceError> {
            let mut conn = get_connection(&app_state.pool)?;
            Game::list(&mut conn)
        })();

        let response = match result {
            Ok(games) => (StatusCode::OK, Json(json!({ "games": games }))).into_response(),
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/games", "GET", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}

/// Handles GET /games/:id requests.
///
/// With an identity header the payload carries `bought_game` and
/// `developed_game` flags so the frontend can show play, buy, or edit.
pub async fn game_detail_handler(
    Path(game_id): Path<i32>,
    MaybeUser(viewer_id): MaybeUser,
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request",
        method = "GET",
        path = "/games/:id",
        game_id = game_id
    );
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/games/:id");

    async move {
        let result = (|| -> Result<serde_json::Value, StoreServiceError> {
            let mut conn = get_connection(&app_state.pool)?;
            let game = Game::find(&mut conn, game_id)?;

            let (bought_game, developed_game) = match viewer_id {
                Some(viewer) => (
                    Ownership::exists(&mut conn, viewer, game.id)?,
                    game.developer_id == viewer,
                ),
                None => (false, false),
            };

            let categories = GameCategory::names_for_game(&mut conn, game.id)?;

            Ok(json!({
                "game": game,
                "categories": categories,
                "bought_game": bought_game,
                "developed_game": developed_game,
            }))
        })();

        let response = match result {
            Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/games/:id", "GET", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}

/// Handles POST /games requests. Developer accounts only.
pub async fn publish_game_handler(
    CurrentUser(publisher_id): CurrentUser,
    State(app_state): State<Arc<AppState>>,
    Json(data): Json<PublishGameData>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request",
        method = "POST",
        path = "/games",
        publisher_id = publisher_id
    );
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/games");

    async move {
        info!("Received game publish request");

        let result = (|| -> Result<Game, StoreServiceError> {
            validators::validate_game_name(&data.name)?;
            if data.price < 0 {
                return Err(StoreServiceError::validation(
                    "price",
                    "Price must not be negative",
                ));
            }

            let mut conn = get_connection(&app_state.pool)?;
            let publisher = User::find_by_id(&mut conn, publisher_id)?;
            if !publisher.is_developer {
                return Err(StoreServiceError::forbidden(
                    "Only developer accounts can publish games",
                ));
            }

            let now = chrono::Utc::now().naive_utc();
            let game = Game::create(
                &mut conn,
                NewGame {
                    name: data.name.clone(),
                    price: data.price,
                    url: data.url.clone(),
                    image: data.image.clone(),
                    description: data.description.clone(),
                    developer_id: publisher_id,
                    created_at: now,
                    modified_at: now,
                },
            )?;
            GameCategory::set_for_game(&mut conn, game.id, &data.categories)?;
            Ok(game)
        })();

        let response = match result {
            Ok(game) => (StatusCode::CREATED, Json(json!({ "game": game }))).into_response(),
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/games", "POST", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}

/// Handles POST /games/:id requests. Only the publishing developer may edit.
pub async fn update_game_handler(
    Path(game_id): Path<i32>,
    CurrentUser(editor_id): CurrentUser,
    State(app_state): State<Arc<AppState>>,
    Json(data): Json<PublishGameData>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request",
        method = "POST",
        path = "/games/:id",
        game_id = game_id,
        editor_id = editor_id
    );
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/games/:id");

    async move {
        info!("Received game edit request");

        let result = (|| -> Result<Game, StoreServiceError> {
            validators::validate_game_name(&data.name)?;
            if data.price < 0 {
                return Err(StoreServiceError::validation(
                    "price",
                    "Price must not be negative",
                ));
            }

            let mut conn = get_connection(&app_state.pool)?;
            let game = Game::find(&mut conn, game_id)?;
            if game.developer_id != editor_id {
                return Err(StoreServiceError::forbidden(
                    "Only the publishing developer can edit this game",
                ));
            }

            let game = Game::update(
                &mut conn,
                game_id,
                GameChanges {
                    name: data.name.clone(),
                    price: data.price,
                    url: data.url.clone(),
                    image: data.image.clone(),
                    description: data.description.clone(),
                    modified_at: chrono::Utc::now().naive_utc(),
                },
            )?;
            GameCategory::set_for_game(&mut conn, game.id, &data.categories)?;
            Ok(game)
        })();

        let response = match result {
            Ok(game) => (StatusCode::OK, Json(json!({ "game": game }))).into_response(),
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/games/:id", "POST", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}

/// Handles DELETE /games/:id requests. Only the publishing developer may
/// delete; ownerships and category links go with the game.
pub async fn delete_game_handler(
    Path(game_id): Path<i32>,
    CurrentUser(editor_id): CurrentUser,
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request",
        method = "DELETE",
        path = "/games/:id",
        game_id = game_id,
        editor_id = editor_id
    );
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/games/:id");

    async move {
        info!("Received game delete request");

        let result = (|| -> Result<(), StoreServiceError> {
            let mut conn = get_connection(&app_state.pool)?;
            let game = Game::find(&mut conn, game_id)?;
            if game.developer_id != editor_id {
                return Err(StoreServiceError::forbidden(
                    "Only the publishing developer can delete this game",
                ));
            }

            Game::delete(&mut conn, game_id)?;
            Ok(())
        })();

        let response = match result {
            Ok(()) => (
                StatusCode::OK,
                Json(json!({ "message": "Game deleted" })),
            )
                .into_response(),
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/games/:id", "DELETE", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}

/// Handles GET /categories requests.
pub async fn list_categories_handler(
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request", method = "GET", path = "/categories");
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/categories");

    async move {
        let result = (|| -> Result<Vec<GameCategory>, StoreServiceError> {
            let mut conn = get_connection(&app_state.pool)?;
            GameCategory::all(&mut conn)
        })();

        let response = match result {
            Ok(categories) => {
                (StatusCode::OK, Json(json!({ "categories": categories }))).into_response()
            }
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/categories", "GET", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}

/// Handles GET /categories/:name/games requests. Unknown categories are a
/// plain 404, same as an unknown game id.
pub async fn category_games_handler(
    Path(category_name): Path<String>,
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request",
        method = "GET",
        path = "/categories/:name/games",
        category = %category_name
    );
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/categories/:name/games");

    async move {
        let result = (|| -> Result<Vec<Game>, StoreServiceError> {
            let mut conn = get_connection(&app_state.pool)?;
            GameCategory::games_in(&mut conn, &category_name)?
                .ok_or_else(|| StoreServiceError::not_found("Category"))
        })();

        let response = match result {
            Ok(games) => (StatusCode::OK, Json(json!({ "games": games }))).into_response(),
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/categories/:name/games", "GET", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}

/// Handles GET /my-games requests. The caller's library.
pub async fn my_games_handler(
    CurrentUser(owner_id): CurrentUser,
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request",
        method = "GET",
        path = "/my-games",
        owner_id = owner_id
    );
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/my-games");

    async move {
        let result = (|| -> Result<Vec<Game>, StoreServiceError> {
            let mut conn = get_connection(&app_state.pool)?;
            Game::owned_by(&mut conn, owner_id)
        })();

        let response = match result {
            Ok(games) => (StatusCode::OK, Json(json!({ "games": games }))).into_response(),
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/my-games", "GET", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}

/// Handles GET /dev/dashboard requests. Developer accounts only:
/// published games plus the transactions where they were the seller.
pub async fn developer_dashboard_handler(
    CurrentUser(developer_id): CurrentUser,
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request",
        method = "GET",
        path = "/dev/dashboard",
        developer_id = developer_id
    );
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/dev/dashboard");

    async move {
        let result = (|| -> Result<serde_json::Value, StoreServiceError> {
            let mut conn = get_connection(&app_state.pool)?;
            let account = User::find_by_id(&mut conn, developer_id)?;
            if !account.is_developer {
                return Err(StoreServiceError::forbidden(
                    "Only developer accounts have a dashboard",
                ));
            }

            let games = Game::developed_by(&mut conn, developer_id)?;
            let transactions = Transaction::sold_by(&mut conn, developer_id)?;

            Ok(json!({
                "games": games,
                "transactions": transactions,
            }))
        })();

        let response = match result {
            Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
            Err(e) => e.into_response(),
        };

        span.record("http.status_code", &response.status().as_u16());
        metrics::http::request("/dev/dashboard", "GET", response.status().as_u16());
        drop(timer);

        response
    }
    .instrument(span_for_instrument)
    .await
}
