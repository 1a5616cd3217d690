//! Test utilities for the store service.
//!
//! Provides an isolated in-memory database per test plus small seed
//! helpers, without over-engineering.

#![cfg(test)]

use crate::app::AppState;
use crate::config::database::{DbPool, MIGRATIONS};
use crate::config::settings::Settings;
use crate::db::activation_tokens::{ActivationToken, NewActivationToken};
use crate::db::games::{Game, NewGame};
use crate::db::users::{NewUser, User};
use crate::utils::email::EmailConfig;
use chrono::NaiveDateTime;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;
use diesel_migrations::MigrationHarness;
use once_cell::sync::Lazy;
use std::sync::{Mutex, MutexGuard};

// =============================================================================
// ENVIRONMENT SERIALIZATION
// =============================================================================

/// Lock serializing tests that read or write process environment variables.
static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Acquires the environment lock; poisoning is ignored.
pub fn env_guard() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Enables TEST_MODE for the duration of the returned guard's scope.
pub fn test_mode_guard() -> MutexGuard<'static, ()> {
    let guard = env_guard();
    std::env::set_var("TEST_MODE", "true");
    guard
}

// =============================================================================
// TEST DATABASE MANAGEMENT
// =============================================================================

/// Creates an isolated in-memory database pool with migrations applied.
///
/// Pool size is pinned to 1 so every checkout sees the same in-memory
/// database (each SQLite `:memory:` connection is otherwise its own world).
pub fn make_pool() -> DbPool {
    let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
    let pool = Pool::builder()
        .max_size(1)
        .connection_customizer(Box::new(crate::config::database::ConnectionOptions))
        .build(manager)
        .expect("Failed to build in-memory test pool");

    let mut conn = pool.get().expect("Failed to check out test connection");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations on test database");
    drop(conn);

    pool
}

// =============================================================================
// APP STATE BUILDER
// =============================================================================

/// Creates a test AppState with an in-memory database, dummy e-mail
/// transport and fixed settings.
pub fn test_state() -> AppState {
    AppState {
        pool: make_pool(),
        email_config: Some(EmailConfig::dummy()),
        settings: Settings::dummy(),
    }
}

// =============================================================================
// SEED HELPERS
// =============================================================================

/// Current timestamp with the resolution the store uses.
pub fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

pub fn insert_user(
    conn: &mut SqliteConnection,
    username: &str,
    email: &str,
    active: bool,
) -> User {
    let mut new_user: NewUser = User::new_for_insert(username, email, "Secret1!", false);
    new_user.is_active = active;
    User::save_new(new_user, conn).expect("Failed to seed user")
}

pub fn insert_developer(conn: &mut SqliteConnection, username: &str, email: &str) -> User {
    let mut new_user: NewUser = User::new_for_insert(username, email, "Secret1!", true);
    new_user.is_active = true;
    User::save_new(new_user, conn).expect("Failed to seed developer")
}

pub fn insert_game(conn: &mut SqliteConnection, name: &str, price: i32, developer_id: i32) -> Game {
    Game::create(
        conn,
        NewGame {
            name: name.to_string(),
            price,
            url: format!("http://games.example.com/{}", name.replace(' ', "-")),
            image: "http://placehold.it/150x80?text=IMAGE".to_string(),
            description: "No description.".to_string(),
            developer_id,
            created_at: now(),
            modified_at: now(),
        },
    )
    .expect("Failed to seed game")
}

pub fn insert_token(
    conn: &mut SqliteConnection,
    user_id: i32,
    token: &str,
    issued_at: NaiveDateTime,
    expires_at: NaiveDateTime,
) -> ActivationToken {
    ActivationToken::create(
        conn,
        NewActivationToken {
            user_id,
            token: token.to_string(),
            issued_at,
            expires_at,
        },
    )
    .expect("Failed to seed activation token")
}
