//! Account confirmation HTTP handler.
//!
//! Serves the e-mail confirmation links with user-friendly HTML pages.
//! An expired link gets its own page; unknown and already-used keys share
//! one generic page.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use std::sync::Arc;
use tracing::{error, info, span, Instrument, Level};

use crate::{
    app::AppState,
    handlers::activation_logic::{process_activation, ActivationOutcome},
    utils::metrics,
};

/// Handles GET /accounts/confirm/:activation_key requests.
///
/// Always returns HTML; these URLs are opened from e-mail clients.
pub async fn confirm_account_handler(
    Path(activation_key): Path<String>,
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request",
        method = "GET",
        path = "/accounts/confirm",
        key_length = activation_key.len()
    );
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/accounts/confirm");

    async move {
        info!("Received account confirmation request");

        let now = chrono::Utc::now().naive_utc();
        let result = process_activation(&app_state, &activation_key, now).await;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => {
                error!("Account confirmation failed: {}", e);
                500
            }
        };
        span.record("http.status_code", &status);
        metrics::http::request("/accounts/confirm", "GET", status);
        drop(timer);

        match result {
            Ok(ActivationOutcome::Activated) => Html(render_page(
                "Account Activated",
                "Your account has been successfully activated. You can now log in.",
                "success",
            ))
            .into_response(),
            Ok(ActivationOutcome::Expired) => Html(render_page(
                "Link Expired",
                "This activation link has expired. Please contact support to receive a new one.",
                "error",
            ))
            .into_response(),
            Ok(ActivationOutcome::NotFound) => Html(render_page(
                "Invalid Activation Link",
                "We couldn't find an account for this activation link.",
                "error",
            ))
            .into_response(),
            // Hard failures must surface as 5xx so clients and upstream
            // callers do not mistake them for a handled outcome.
            Err(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_page(
                    "Service Unavailable",
                    "We're experiencing technical difficulties. Please try again later.",
                    "error",
                )),
            )
                .into_response(),
        }
    }
    .instrument(span_for_instrument)
    .await
}

/// Renders a simple HTML page with a title and message.
pub(crate) fn render_page(title: &str, message: &str, status: &str) -> String {
    let status_class = match status {
        "success" => "success",
        "error" => "error",
        _ => "info",
    };

    let frontend_url =
        std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
    let store_url = format!("{}/games", frontend_url);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif;
            background: #1a202c;
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            padding: 1rem;
        }}
        .card {{
            background: white;
            border-radius: 12px;
            padding: 2.5rem;
            max-width: 420px;
            width: 100%;
            text-align: center;
        }}
        h1 {{
            color: #2d3748;
            font-size: 1.75rem;
            margin-bottom: 1rem;
        }}
        .message {{
            padding: 1rem;
            border-radius: 8px;
            margin: 1.5rem 0;
            font-size: 0.95rem;
            line-height: 1.5;
        }}
        .success {{
            background: #c6f6d5;
            color: #22543d;
            border: 1px solid #9ae6b4;
        }}
        .error {{
            background: #fed7d7;
            color: #742a2a;
            border: 1px solid #fc8181;
        }}
        .info {{
            background: #bee3f8;
            color: #2c5282;
            border: 1px solid #90cdf4;
        }}
        .btn {{
            display: inline-block;
            background: #4a5568;
            color: white;
            text-decoration: none;
            padding: 0.75rem 2rem;
            border-radius: 6px;
            font-weight: 500;
            margin-top: 0.5rem;
        }}
    </style>
</head>
<body>
    <div class="card">
        <h1>{title}</h1>
        <div class="message {status_class}">
            {message}
        </div>
        <a href="{store_url}" class="btn">Browse Games</a>
    </div>
</body>
</html>"#
    )
}
