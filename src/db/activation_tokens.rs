//! Activation tokens.
//!
//! One token is issued per account at registration and consumed at most
//! once. Consumption is a conditional single-row update (`WHERE consumed_at
//! IS NULL`), so concurrent verifications of the same key resolve to
//! exactly one winner. Expired tokens are never deleted; with no reissue
//! flow an expired key is a permanent dead end.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::{Insertable, Queryable, Selectable, SqliteConnection};
use tracing::error;

use crate::db::schema::activation_tokens;
use crate::utils::errors::StoreServiceError;
use crate::utils::metrics;

/// Activation token bound to one account.
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = activation_tokens)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ActivationToken {
    pub id: i32,
    pub user_id: i32,
    pub token: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub consumed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = activation_tokens)]
pub struct NewActivationToken {
    pub user_id: i32,
    pub token: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

impl ActivationToken {
    /// Persists a freshly issued token.
    ///
    /// The schema enforces both token uniqueness (a hash collision fails
    /// loudly here) and the at-most-one-token-per-account invariant.
    pub fn create(
        conn: &mut SqliteConnection,
        new_token: NewActivationToken,
    ) -> Result<ActivationToken, StoreServiceError> {
        diesel::insert_into(activation_tokens::table)
            .values(&new_token)
            .get_result::<ActivationToken>(conn)
            .map_err(|e| {
                error!("Failed to store activation token: {}", e);
                metrics::db::query_failure("token_create");
                StoreServiceError::database("Failed to store activation token")
            })
            .map(|token| {
                metrics::db::query_success("token_create");
                token
            })
    }

    /// Finds a live (unconsumed) token by value.
    ///
    /// Consumed tokens are invisible here on purpose: an already-used key
    /// must be indistinguishable from an unknown one.
    pub fn find_live(
        conn: &mut SqliteConnection,
        token_value: &str,
    ) -> Result<Option<ActivationToken>, StoreServiceError> {
        use crate::db::schema::activation_tokens::dsl::*;

        activation_tokens
            .filter(token.eq(token_value))
            .filter(consumed_at.is_null())
            .first::<ActivationToken>(conn)
            .optional()
            .map_err(|e| {
                error!("Database error looking up activation token: {}", e);
                metrics::db::query_failure("token_lookup");
                StoreServiceError::database("Activation token lookup failed")
            })
            .map(|found| {
                metrics::db::query_success("token_lookup");
                found
            })
    }

    /// Consumes a token if it is still live.
    ///
    /// Returns `true` when this call performed the one-way transition,
    /// `false` when the token was already consumed (or never existed).
    /// Runs inside the caller's store transaction.
    pub fn consume(
        conn: &mut SqliteConnection,
        token_value: &str,
        now: NaiveDateTime,
    ) -> Result<bool, diesel::result::Error> {
        use crate::db::schema::activation_tokens::dsl::*;

        let updated = diesel::update(
            activation_tokens
                .filter(token.eq(token_value))
                .filter(consumed_at.is_null()),
        )
        .set(consumed_at.eq(Some(now)))
        .execute(conn)?;

        Ok(updated == 1)
    }
}
