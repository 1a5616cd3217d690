//! Game store service entry point.
//!
//! Startup sequence:
//!
//! 1. Initialize observability (metrics, logging)
//! 2. Load and validate configuration
//! 3. Establish the database pool and apply migrations
//! 4. Build the HTTP application with routes and middleware
//! 5. Start the HTTP server with graceful shutdown handling
//!
//! Shutdown is triggered by Ctrl+C or SIGTERM; in-flight requests are
//! allowed to complete before the process exits.

use axum::Server;
use dotenvy::dotenv;
use std::{env, net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::app::{build_app, AppState};
use crate::config::database::{init_pool, run_migrations};
use crate::config::settings::Settings;
use crate::utils::email::EmailConfig;
use crate::utils::metrics;

mod app;
mod config;
mod db;
mod handlers;
mod middleware;
mod utils;

/// Default port if not specified in environment
const DEFAULT_PORT: u16 = 3000;

/// Default host address if not specified in environment
const DEFAULT_HOST: &str = "127.0.0.1";

/// Environment variables that must be present for the service to start
const REQUIRED_ENV_VARS: &[&str] = &["DATABASE_URL", "PAYMENT_SELLER_ID", "PAYMENT_SECRET_KEY"];

/// Environment variables that enhance service functionality if present
const OPTIONAL_ENV_VARS: &[&str] = &[
    "SMTP_SERVER",
    "SMTP_USERNAME",
    "SMTP_PASSWORD",
    "FRONTEND_URL",
    "PAYMENT_RESULT_URL",
    "ACTIVATION_WINDOW_HOURS",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    metrics::init();

    // The guard must outlive main or the async writer stops flushing.
    let _log_guard = setup_logging()?;
    info!(
        service = "gamestore-service",
        version = env!("CARGO_PKG_VERSION"),
        "Server initialization: logging & metrics configured"
    );

    dotenv().ok();
    info!("Server initialization: environment loaded");

    check_required_env_vars();

    let settings = Settings::from_env()?;
    info!("Server initialization: settings loaded");

    let pool = init_pool();
    pool.get().map_err(|e| {
        error!(error = %e, "Database connection failed");
        e
    })?;
    info!("Server initialization: database pool ready");

    run_migrations(&pool).map_err(|e| {
        error!(error = %e, "Database migrations failed");
        e
    })?;
    info!("Server initialization: database migrations applied");

    let email_config = match EmailConfig::new() {
        Ok(cfg) => {
            info!("Server initialization: email configured");
            Some(cfg)
        }
        Err(e) => {
            warn!(
                error = %e,
                "Server initialization: email config error, registration will be rejected"
            );
            None
        }
    };

    let app_state = Arc::new(AppState {
        pool,
        email_config,
        settings,
    });
    let app = build_app(app_state).await;
    info!("Server initialization: application built");

    let addr = get_server_address()?;
    info!(address = %addr, "Server startup: listening");

    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown: complete");
    Ok(())
}

/// Sets up structured JSON logging with an async non-blocking writer.
fn setup_logging() -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    let (non_blocking, guard) = non_blocking(std::io::stdout());

    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .json()
        .with_span_events(FmtSpan::ENTER | FmtSpan::CLOSE)
        .with_target(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    Registry::default().with(filter).with(fmt_layer).init();

    Ok(guard)
}

/// Validates required and optional environment variables, logging status.
fn check_required_env_vars() {
    let mut missing_required = false;

    for &var in REQUIRED_ENV_VARS {
        if env::var(var).is_err() {
            error!(variable = var, "Missing required environment variable");
            missing_required = true;
        }
    }

    if !missing_required {
        info!("Server initialization: required environment variables present");
    }

    let missing: Vec<_> = OPTIONAL_ENV_VARS
        .iter()
        .filter(|&&var| env::var(var).is_err())
        .collect();

    if missing.is_empty() {
        info!("Server initialization: all optional environment variables present");
    } else {
        warn!(
            missing = ?missing,
            "Server initialization: some optional environment variables missing"
        );
    }
}

/// Determines the bind address from HOST/PORT or the defaults.
fn get_server_address() -> Result<SocketAddr, Box<dyn std::error::Error>> {
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());

    let addr = format!("{}:{}", host, port).parse()?;

    Ok(addr)
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received: Ctrl+C");
    };

    #[cfg(unix)]
    let sigterm = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
        info!("Shutdown signal received: SIGTERM");
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = sigterm => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::env_guard;

    #[test]
    fn server_address_uses_defaults_when_unset() {
        let _guard = env_guard();
        env::remove_var("HOST");
        env::remove_var("PORT");

        let addr = get_server_address().unwrap();
        assert_eq!(
            addr.to_string(),
            format!("{}:{}", DEFAULT_HOST, DEFAULT_PORT)
        );
    }

    #[test]
    fn server_address_honors_environment() {
        let _guard = env_guard();
        env::set_var("HOST", "0.0.0.0");
        env::set_var("PORT", "8080");

        let addr = get_server_address().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:8080");

        env::remove_var("HOST");
        env::remove_var("PORT");
    }
}
