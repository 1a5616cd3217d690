//! Store accounts.
//!
//! Accounts are created inactive by registration and flipped active only by
//! activation-key verification. Developers are flagged at registration and
//! may publish games.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, Params, Version,
};
use diesel::prelude::*;
use diesel::{AsChangeset, Insertable, Queryable, Selectable, SqliteConnection};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::db::schema::users;
use crate::utils::errors::StoreServiceError;
use crate::utils::metrics;

// =============================================================================
// DATA MODELS
// =============================================================================

/// Account model mapping to the database schema.
#[derive(Debug, Serialize, Deserialize, Queryable, Insertable, AsChangeset, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_developer: bool,
}

/// New account for database insertion.
#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_developer: bool,
}

/// Registration request data.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterData {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_developer: bool,
}

// =============================================================================
// SECURITY CONFIGURATION
// =============================================================================

const ARGON2_MEMORY_COST: u32 = 65536; // 64 MB
const ARGON2_TIME_COST: u32 = 3;
const ARGON2_PARALLELISM: u32 = 4;
const ARGON2_VERSION: Version = Version::V0x13;

// =============================================================================
// IMPLEMENTATION
// =============================================================================

impl User {
    /// Creates a NewUser for database insertion; always starts inactive.
    pub fn new_for_insert(username: &str, email: &str, password: &str, is_developer: bool) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: Self::hash_password(password),
            is_active: false,
            is_developer,
        }
    }

    /// Hashes a password using Argon2id.
    pub fn hash_password(password: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);

        let argon2 = Argon2::new_with_secret(
            &[],
            argon2::Algorithm::Argon2id,
            ARGON2_VERSION,
            Params::new(ARGON2_MEMORY_COST, ARGON2_TIME_COST, ARGON2_PARALLELISM, None).unwrap(),
        )
        .expect("Failed to create Argon2 instance");

        argon2
            .hash_password(password.as_bytes(), &salt)
            .expect("Password hashing failed")
            .to_string()
    }

    /// Saves a new account to the database.
    pub fn save_new(new_user: NewUser, conn: &mut SqliteConnection) -> Result<User, StoreServiceError> {
        let result = conn
            .transaction(|conn| {
                diesel::insert_into(users::table)
                    .values(&new_user)
                    .get_result::<User>(conn)
            })
            .map_err(|e| {
                error!("Failed to save user {}: {}", new_user.username, e);
                metrics::db::query_failure("user_create");

                if let diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    info,
                ) = &e
                {
                    let detail = info.message();
                    if detail.contains("email") {
                        return StoreServiceError::conflict("email", "Email already registered");
                    } else if detail.contains("username") {
                        return StoreServiceError::conflict("username", "Username already taken");
                    }
                }

                StoreServiceError::database("Failed to create user")
            })?;

        metrics::db::query_success("user_create");
        info!("User {} created", result.username);
        Ok(result)
    }

    /// Finds an account by id.
    pub fn find_by_id(conn: &mut SqliteConnection, user_id: i32) -> Result<Self, StoreServiceError> {
        use crate::db::schema::users::dsl::*;

        users
            .filter(id.eq(user_id))
            .first::<User>(conn)
            .map_err(|e| {
                metrics::db::query_failure("user_lookup_id");
                match e {
                    diesel::result::Error::NotFound => StoreServiceError::not_found("User"),
                    other => {
                        error!("Database error finding user {}: {}", user_id, other);
                        StoreServiceError::database("User lookup failed")
                    }
                }
            })
            .map(|user| {
                metrics::db::query_success("user_lookup_id");
                user
            })
    }

    /// Finds an account by username.
    pub fn find_by_username(
        conn: &mut SqliteConnection,
        username_str: &str,
    ) -> Result<Self, StoreServiceError> {
        use crate::db::schema::users::dsl::*;

        users
            .filter(username.eq(username_str))
            .first::<User>(conn)
            .map_err(|e| {
                metrics::db::query_failure("user_lookup_username");
                match e {
                    diesel::result::Error::NotFound => StoreServiceError::not_found("User"),
                    other => {
                        error!("Database error finding user {}: {}", username_str, other);
                        StoreServiceError::database("User lookup failed")
                    }
                }
            })
            .map(|user| {
                metrics::db::query_success("user_lookup_username");
                user
            })
    }

    /// Finds an account by email.
    pub fn find_by_email(
        conn: &mut SqliteConnection,
        email_str: &str,
    ) -> Result<Self, StoreServiceError> {
        use crate::db::schema::users::dsl::*;

        users
            .filter(email.eq(email_str))
            .first::<User>(conn)
            .map_err(|e| {
                metrics::db::query_failure("user_lookup_email");
                match e {
                    diesel::result::Error::NotFound => StoreServiceError::not_found("User"),
                    other => {
                        error!("Database error finding user by email: {}", other);
                        StoreServiceError::database("User lookup failed")
                    }
                }
            })
            .map(|user| {
                metrics::db::query_success("user_lookup_email");
                user
            })
    }

    /// Marks an account active. Used only by activation verification,
    /// inside the verification's store transaction.
    pub fn activate(conn: &mut SqliteConnection, user_id: i32) -> Result<(), diesel::result::Error> {
        use crate::db::schema::users::dsl::*;

        diesel::update(users.filter(id.eq(user_id)))
            .set(is_active.eq(true))
            .execute(conn)?;
        Ok(())
    }

    /// Returns safe account information for the frontend.
    pub fn to_safe_info(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "username": self.username,
            "email": self.email,
            "is_active": self.is_active,
            "is_developer": self.is_developer,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{insert_user, make_pool};

    #[test]
    fn test_password_is_hashed_not_stored() {
        let new_user = User::new_for_insert("alice", "alice@example.com", "Secret123!", false);
        assert!(!new_user.password_hash.contains("Secret123!"));
        assert!(new_user.password_hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_password_hash_uniqueness() {
        let hash1 = User::hash_password("password");
        let hash2 = User::hash_password("password");

        // Different salts should produce different hashes
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn new_accounts_start_inactive() {
        let new_user = User::new_for_insert("bob", "bob@example.com", "Pass123!", true);
        assert!(!new_user.is_active);
        assert!(new_user.is_developer);
        assert!(!new_user.password_hash.is_empty());
    }

    #[test]
    fn save_and_find_round_trip() {
        let pool = make_pool();
        let mut conn = pool.get().unwrap();

        let saved = User::save_new(
            User::new_for_insert("carol", "carol@example.com", "Pass123!", false),
            &mut conn,
        )
        .unwrap();
        assert!(saved.id > 0);

        let by_email = User::find_by_email(&mut conn, "carol@example.com").unwrap();
        assert_eq!(by_email.id, saved.id);
        let by_name = User::find_by_username(&mut conn, "carol").unwrap();
        assert_eq!(by_name.id, saved.id);
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let pool = make_pool();
        let mut conn = pool.get().unwrap();
        insert_user(&mut conn, "dave", "dave@example.com", true);

        let err = User::save_new(
            User::new_for_insert("dave2", "dave@example.com", "Pass123!", false),
            &mut conn,
        )
        .unwrap_err();
        assert!(matches!(err, StoreServiceError::Conflict { .. }));
    }

    #[test]
    fn activate_flips_the_flag() {
        let pool = make_pool();
        let mut conn = pool.get().unwrap();
        let user = insert_user(&mut conn, "eve", "eve@example.com", false);
        assert!(!user.is_active);

        User::activate(&mut conn, user.id).unwrap();
        let reloaded = User::find_by_id(&mut conn, user.id).unwrap();
        assert!(reloaded.is_active);
    }

    #[test]
    fn safe_info_hides_password_hash() {
        let user = User {
            id: 1,
            username: "test".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "hash".to_string(),
            is_active: true,
            is_developer: false,
        };

        let info = user.to_safe_info();
        assert_eq!(info["username"], "test");
        assert!(info.get("password_hash").is_none());
    }
}
