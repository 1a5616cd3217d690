//! Business logic for user registration.
//!
//! Creates an inactive account and issues its activation token. Delivery
//! failure of the confirmation e-mail is NOT swallowed: the account and
//! token rows are kept but the caller gets an `EmailDelivery` error so the
//! registration can be flagged incomplete instead of silently leaving an
//! account nobody can activate.

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    app::AppState,
    config::database::get_connection,
    db::users::{RegisterData, User},
    handlers::activation_logic::issue_activation,
    utils::errors::StoreServiceError,
    utils::metrics,
    utils::validators::{validate_email, validate_password, validate_username},
};

/// Processes a registration request.
///
/// Returns the JSON body for a 201 response, or the error the handler
/// turns into the appropriate status code.
pub async fn process_registration(
    app_state: &AppState,
    data: RegisterData,
) -> Result<Value, StoreServiceError> {
    // Validate input
    if let Err(e) = validate_username(&data.username)
        .and_then(|_| validate_email(&data.email))
        .and_then(|_| validate_password(&data.password))
    {
        warn!("Registration validation failed: {}", e);
        metrics::store::registration("validation_failed");
        return Err(e);
    }

    let mut conn = get_connection(&app_state.pool)?;

    // Check uniqueness before insert for friendlier errors; the schema's
    // unique constraints still back this up against races.
    if User::find_by_email(&mut conn, &data.email).is_ok() {
        metrics::store::registration("already_exists");
        return Err(StoreServiceError::conflict("email", "Email already registered"));
    }
    if User::find_by_username(&mut conn, &data.username).is_ok() {
        metrics::store::registration("already_exists");
        return Err(StoreServiceError::conflict("username", "Username already taken"));
    }

    // Create the inactive account
    let new_user =
        User::new_for_insert(&data.username, &data.email, &data.password, data.is_developer);
    let user = User::save_new(new_user, &mut conn).map_err(|e| {
        metrics::store::registration("failure");
        e
    })?;
    drop(conn);

    // Issue the activation token and send the confirmation e-mail
    let now = chrono::Utc::now().naive_utc();
    if let Err(e) = issue_activation(app_state, &user, now).await {
        warn!(user = %user.username, "Registration incomplete: {}", e);
        metrics::store::registration(match e {
            StoreServiceError::EmailDelivery(_) => "email_failed",
            _ => "failure",
        });
        return Err(e);
    }

    info!(user = %user.username, "User registration successful");
    metrics::store::registration("success");

    Ok(json!({
        "status": "success",
        "message": "Registration successful! Please check your email to activate your account.",
        "user": user.to_safe_info(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::activation_tokens::ActivationToken;
    use crate::utils::test_utils::{insert_user, test_mode_guard, test_state};

    fn register_data(username: &str, email: &str) -> RegisterData {
        RegisterData {
            username: username.into(),
            email: email.into(),
            password: "Valid1!pass".into(),
            is_developer: false,
        }
    }

    #[tokio::test]
    async fn successful_registration_creates_inactive_account_with_token() {
        let _guard = test_mode_guard();
        let state = test_state();

        let body = process_registration(&state, register_data("alice", "alice@example.com"))
            .await
            .unwrap();
        assert_eq!(body["status"], "success");

        let mut conn = state.pool.get().unwrap();
        let user = User::find_by_username(&mut conn, "alice").unwrap();
        assert!(!user.is_active);

        use crate::db::schema::activation_tokens::dsl::*;
        use diesel::prelude::*;
        let tokens: Vec<ActivationToken> = activation_tokens
            .filter(user_id.eq(user.id))
            .load(&mut conn)
            .unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].consumed_at.is_none());
    }

    #[tokio::test]
    async fn invalid_email_is_rejected() {
        let state = test_state();
        let result = process_registration(&state, register_data("alice", "not-an-email")).await;
        assert!(matches!(result, Err(StoreServiceError::Validation { .. })));
    }

    #[tokio::test]
    async fn weak_password_is_rejected() {
        let state = test_state();
        let mut data = register_data("alice", "alice@example.com");
        data.password = "weak".into();
        let result = process_registration(&state, data).await;
        assert!(matches!(result, Err(StoreServiceError::Validation { .. })));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let _guard = test_mode_guard();
        let state = test_state();
        let mut conn = state.pool.get().unwrap();
        insert_user(&mut conn, "first", "taken@example.com", true);
        drop(conn);

        let result = process_registration(&state, register_data("second", "taken@example.com")).await;
        assert!(matches!(result, Err(StoreServiceError::Conflict { .. })));
    }

    #[tokio::test]
    async fn missing_email_service_surfaces_incomplete_registration() {
        let _guard = test_mode_guard();
        let mut state = test_state();
        state.email_config = None;

        let result = process_registration(&state, register_data("bob", "bob@example.com")).await;
        assert!(result.is_err());

        // The account row exists but is flagged incomplete to the caller.
        let mut conn = state.pool.get().unwrap();
        assert!(User::find_by_username(&mut conn, "bob").is_ok());
    }

    #[tokio::test]
    async fn developer_flag_is_persisted() {
        let _guard = test_mode_guard();
        let state = test_state();
        let mut data = register_data("devuser", "dev@example.com");
        data.is_developer = true;

        process_registration(&state, data).await.unwrap();

        let mut conn = state.pool.get().unwrap();
        let user = User::find_by_username(&mut conn, "devuser").unwrap();
        assert!(user.is_developer);
    }
}
