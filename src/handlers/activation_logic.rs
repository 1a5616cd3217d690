//! Business logic for account activation.
//!
//! Two operations share the activation-token lifecycle:
//!
//! - [`issue_activation`] creates the time-limited token for a freshly
//!   registered, inactive account and sends the confirmation e-mail.
//! - [`process_activation`] verifies a key from a confirmation link and
//!   flips the account active exactly once.
//!
//! Verification outcomes are enumerated, not errors: the handler renders a
//! distinct page for an expired link, and the same generic page for unknown
//! and already-consumed keys so that key consumption is not observable.

use chrono::NaiveDateTime;
use diesel::Connection;
use tracing::info;

use crate::{
    app::AppState,
    config::database::get_connection,
    db::activation_tokens::{ActivationToken, NewActivationToken},
    db::users::User,
    utils::{activation_key, errors::StoreServiceError, metrics},
};

/// Outcome of verifying an activation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The account was activated by this call.
    Activated,
    /// The key exists and is live, but its deadline has passed. The
    /// account stays inactive and the key is left untouched.
    Expired,
    /// No live key matches: unknown and already-consumed keys are
    /// deliberately indistinguishable.
    NotFound,
}

/// Issues the activation token for a new account and sends the
/// confirmation e-mail.
///
/// The caller guarantees the account is fresh and has no live token (the
/// schema's one-token-per-account constraint backs this up). The token row
/// is committed before the SMTP call so no store lock is held while the
/// send is in flight; a delivery failure propagates to the caller, which
/// decides what to do with the half-registered account.
pub async fn issue_activation(
    state: &AppState,
    user: &User,
    now: NaiveDateTime,
) -> Result<ActivationToken, StoreServiceError> {
    let email_config = state.email_config.as_ref().ok_or_else(|| {
        StoreServiceError::configuration("Email service not available for activation")
    })?;

    let key = activation_key::generate(&user.email);
    let expires_at = now + state.settings.activation.window();

    let token = {
        let mut conn = get_connection(&state.pool)?;
        ActivationToken::create(
            &mut conn,
            NewActivationToken {
                user_id: user.id,
                token: key,
                issued_at: now,
                expires_at,
            },
        )?
    };

    email_config.send_activation_email(
        &user.email,
        &user.username,
        &token.token,
        state.settings.activation.window_hours,
    )?;

    info!(user = %user.username, "Activation token issued");
    Ok(token)
}

/// Verifies an activation key and activates the bound account.
///
/// The consume-and-activate step is a single store transaction around a
/// conditional update, so concurrent verifications of the same key produce
/// exactly one `Activated`; the losers observe `NotFound`.
pub async fn process_activation(
    state: &AppState,
    key: &str,
    now: NaiveDateTime,
) -> Result<ActivationOutcome, StoreServiceError> {
    let mut conn = get_connection(&state.pool)?;

    let token = match ActivationToken::find_live(&mut conn, key)? {
        Some(token) => token,
        None => {
            metrics::store::activation("not_found");
            return Ok(ActivationOutcome::NotFound);
        }
    };

    if now > token.expires_at {
        info!(user_id = token.user_id, "Activation key expired");
        metrics::store::activation("expired");
        return Ok(ActivationOutcome::Expired);
    }

    let outcome = conn.transaction::<_, StoreServiceError, _>(|conn| {
        if !ActivationToken::consume(conn, key, now)? {
            // Lost the race against a concurrent verification.
            return Ok(ActivationOutcome::NotFound);
        }
        User::activate(conn, token.user_id)?;
        Ok(ActivationOutcome::Activated)
    })?;

    match outcome {
        ActivationOutcome::Activated => {
            info!(user_id = token.user_id, "Account activated");
            metrics::store::activation("activated");
        }
        _ => metrics::store::activation("not_found"),
    }

    Ok(outcome)
}
