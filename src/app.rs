//! Application state and router assembly.

use axum::{
    routing::get,
    routing::post,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::database::DbPool;
use crate::config::settings::Settings;
use crate::handlers::{
    activation::confirm_account_handler,
    checkout::checkout_handler,
    games::{
        browse_games_handler, category_games_handler, delete_game_handler,
        developer_dashboard_handler, game_detail_handler, list_categories_handler,
        my_games_handler, publish_game_handler, update_game_handler,
    },
    payment_result::payment_result_handler,
    register::register_handler,
    saves::{load_state_handler, save_state_handler},
    scores::{game_scores_handler, high_scores_handler, submit_score_handler},
};
use crate::utils::email::EmailConfig;
use crate::utils::metrics;

/// Shared state handed to every handler.
pub struct AppState {
    pub pool: DbPool,
    /// None when SMTP is not configured; registration then fails loudly
    /// instead of creating accounts nobody can activate.
    pub email_config: Option<EmailConfig>,
    pub settings: Settings,
}

/// Builds the Axum application with routes and middleware.
pub async fn build_app(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "🎮 Game Store Service is running" }))
        .route("/metrics", get(|| async { metrics::gather() }))
        .route("/accounts/register", post(register_handler))
        .route("/accounts/confirm/:activation_key", get(confirm_account_handler))
        .route("/games", get(browse_games_handler).post(publish_game_handler))
        .route(
            "/games/:id",
            get(game_detail_handler)
                .post(update_game_handler)
                .delete(delete_game_handler),
        )
        .route("/games/:id/buy", get(checkout_handler))
        .route("/categories", get(list_categories_handler))
        .route("/categories/:name/games", get(category_games_handler))
        .route("/games/:id/save", post(save_state_handler))
        .route("/games/:id/load", get(load_state_handler))
        .route("/games/:id/scores", post(submit_score_handler).get(game_scores_handler))
        .route("/high-scores", get(high_scores_handler))
        .route("/my-games", get(my_games_handler))
        .route("/dev/dashboard", get(developer_dashboard_handler))
        .route("/payment/result", get(payment_result_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
