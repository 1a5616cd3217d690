//! Games and the ownership relation.
//!
//! Ownership is granted only by payment verification and never revoked.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::{AsChangeset, Insertable, Queryable, Selectable, SqliteConnection};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::db::schema::{games, ownerships};
use crate::utils::errors::StoreServiceError;
use crate::utils::metrics;

// =============================================================================
// DATA MODELS
// =============================================================================

#[derive(Debug, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = games)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Game {
    pub id: i32,
    pub name: String,
    pub price: i32,
    pub url: String,
    pub image: String,
    pub description: String,
    pub developer_id: i32,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = games)]
pub struct NewGame {
    pub name: String,
    pub price: i32,
    pub url: String,
    pub image: String,
    pub description: String,
    pub developer_id: i32,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}

/// Catalog fields a developer may edit after publishing.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = games)]
pub struct GameChanges {
    pub name: String,
    pub price: i32,
    pub url: String,
    pub image: String,
    pub description: String,
    pub modified_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = ownerships)]
struct NewOwnership {
    user_id: i32,
    game_id: i32,
    created_at: NaiveDateTime,
}

// =============================================================================
// IMPLEMENTATION
// =============================================================================

impl Game {
    pub fn create(conn: &mut SqliteConnection, new_game: NewGame) -> Result<Game, StoreServiceError> {
        diesel::insert_into(games::table)
            .values(&new_game)
            .get_result::<Game>(conn)
            .map_err(|e| {
                error!("Failed to create game {}: {}", new_game.name, e);
                metrics::db::query_failure("game_create");
                StoreServiceError::database("Failed to create game")
            })
            .map(|game| {
                metrics::db::query_success("game_create");
                game
            })
    }

    pub fn find(conn: &mut SqliteConnection, game_id: i32) -> Result<Game, StoreServiceError> {
        use crate::db::schema::games::dsl::*;

        games
            .filter(id.eq(game_id))
            .first::<Game>(conn)
            .map_err(|e| {
                metrics::db::query_failure("game_lookup");
                match e {
                    diesel::result::Error::NotFound => StoreServiceError::not_found("Game"),
                    other => {
                        error!("Database error finding game {}: {}", game_id, other);
                        StoreServiceError::database("Game lookup failed")
                    }
                }
            })
            .map(|game| {
                metrics::db::query_success("game_lookup");
                game
            })
    }

    /// All games, newest first.
    pub fn list(conn: &mut SqliteConnection) -> Result<Vec<Game>, StoreServiceError> {
        use crate::db::schema::games::dsl::*;

        games
            .order(created_at.desc())
            .load::<Game>(conn)
            .map_err(|e| {
                error!("Database error listing games: {}", e);
                metrics::db::query_failure("game_list");
                StoreServiceError::database("Game listing failed")
            })
    }

    /// Updates a game's catalog fields and bumps `modified_at`.
    pub fn update(
        conn: &mut SqliteConnection,
        game_id: i32,
        changes: GameChanges,
    ) -> Result<Game, StoreServiceError> {
        use crate::db::schema::games::dsl::*;

        diesel::update(games.filter(id.eq(game_id)))
            .set(&changes)
            .get_result::<Game>(conn)
            .map_err(|e| {
                error!("Failed to update game {}: {}", game_id, e);
                metrics::db::query_failure("game_update");
                match e {
                    diesel::result::Error::NotFound => StoreServiceError::not_found("Game"),
                    _ => StoreServiceError::database("Failed to update game"),
                }
            })
            .map(|game| {
                metrics::db::query_success("game_update");
                game
            })
    }

    /// Deletes a game; dependent rows cascade.
    pub fn delete(conn: &mut SqliteConnection, game_id: i32) -> Result<usize, StoreServiceError> {
        use crate::db::schema::games::dsl::*;

        diesel::delete(games.filter(id.eq(game_id)))
            .execute(conn)
            .map_err(|e| {
                error!("Failed to delete game {}: {}", game_id, e);
                metrics::db::query_failure("game_delete");
                StoreServiceError::database("Failed to delete game")
            })
            .map(|deleted| {
                metrics::db::query_success("game_delete");
                deleted
            })
    }

    /// Games published by the given developer, newest first.
    pub fn developed_by(
        conn: &mut SqliteConnection,
        developer: i32,
    ) -> Result<Vec<Game>, StoreServiceError> {
        use crate::db::schema::games::dsl::*;

        games
            .filter(developer_id.eq(developer))
            .order(created_at.desc())
            .load::<Game>(conn)
            .map_err(|e| {
                error!("Database error listing developed games: {}", e);
                metrics::db::query_failure("game_list_developed");
                StoreServiceError::database("Developed-games listing failed")
            })
    }

    /// Games owned by the given account.
    pub fn owned_by(conn: &mut SqliteConnection, owner_id: i32) -> Result<Vec<Game>, StoreServiceError> {
        ownerships::table
            .inner_join(games::table)
            .filter(ownerships::user_id.eq(owner_id))
            .select(Game::as_select())
            .load::<Game>(conn)
            .map_err(|e| {
                error!("Database error listing owned games: {}", e);
                metrics::db::query_failure("ownership_list");
                StoreServiceError::database("Owned-games listing failed")
            })
    }
}

/// The account-owns-game relation.
pub struct Ownership;

impl Ownership {
    /// Whether the account owns the game.
    pub fn exists(
        conn: &mut SqliteConnection,
        owner_id: i32,
        owned_game_id: i32,
    ) -> Result<bool, StoreServiceError> {
        use crate::db::schema::ownerships::dsl::*;
        use diesel::dsl::count_star;

        ownerships
            .filter(user_id.eq(owner_id))
            .filter(game_id.eq(owned_game_id))
            .select(count_star())
            .get_result::<i64>(conn)
            .map(|n| n > 0)
            .map_err(|e| {
                error!("Database error checking ownership: {}", e);
                metrics::db::query_failure("ownership_check");
                StoreServiceError::database("Ownership check failed")
            })
    }

    /// Grants ownership idempotently.
    ///
    /// A repeated grant (duplicate provider callback) is a no-op; once
    /// granted, ownership is never revoked. Runs inside the caller's store
    /// transaction.
    pub fn grant(
        conn: &mut SqliteConnection,
        owner_id: i32,
        owned_game_id: i32,
        now: NaiveDateTime,
    ) -> Result<(), diesel::result::Error> {
        diesel::insert_or_ignore_into(ownerships::table)
            .values(&NewOwnership {
                user_id: owner_id,
                game_id: owned_game_id,
                created_at: now,
            })
            .execute(conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{insert_game, insert_user, make_pool, now};

    #[test]
    fn create_and_find_round_trip() {
        let pool = make_pool();
        let mut conn = pool.get().unwrap();
        let dev = insert_user(&mut conn, "dev", "dev@example.com", true);

        let game = insert_game(&mut conn, "Space Miner", 500, dev.id);
        let found = Game::find(&mut conn, game.id).unwrap();
        assert_eq!(found.name, "Space Miner");
        assert_eq!(found.price, 500);
        assert_eq!(found.developer_id, dev.id);
    }

    #[test]
    fn missing_game_is_not_found() {
        let pool = make_pool();
        let mut conn = pool.get().unwrap();
        let err = Game::find(&mut conn, 9999).unwrap_err();
        assert!(matches!(err, StoreServiceError::NotFound { .. }));
    }

    #[test]
    fn update_rewrites_catalog_fields() {
        let pool = make_pool();
        let mut conn = pool.get().unwrap();
        let dev = insert_user(&mut conn, "dev", "dev@example.com", true);
        let game = insert_game(&mut conn, "Space Miner", 500, dev.id);

        let updated = Game::update(
            &mut conn,
            game.id,
            GameChanges {
                name: "Space Miner DX".to_string(),
                price: 750,
                url: game.url.clone(),
                image: game.image.clone(),
                description: "Remastered.".to_string(),
                modified_at: now(),
            },
        )
        .unwrap();
        assert_eq!(updated.name, "Space Miner DX");
        assert_eq!(updated.price, 750);
        // The publisher never changes on edit.
        assert_eq!(updated.developer_id, dev.id);
    }

    #[test]
    fn delete_removes_the_game_and_its_ownerships() {
        let pool = make_pool();
        let mut conn = pool.get().unwrap();
        let dev = insert_user(&mut conn, "dev", "dev@example.com", true);
        let buyer = insert_user(&mut conn, "buyer", "buyer@example.com", true);
        let game = insert_game(&mut conn, "Space Miner", 500, dev.id);
        Ownership::grant(&mut conn, buyer.id, game.id, now()).unwrap();

        assert_eq!(Game::delete(&mut conn, game.id).unwrap(), 1);
        assert!(matches!(
            Game::find(&mut conn, game.id),
            Err(StoreServiceError::NotFound { .. })
        ));
        assert!(Game::owned_by(&mut conn, buyer.id).unwrap().is_empty());
    }

    #[test]
    fn ownership_grant_is_idempotent() {
        let pool = make_pool();
        let mut conn = pool.get().unwrap();
        let dev = insert_user(&mut conn, "dev", "dev@example.com", true);
        let buyer = insert_user(&mut conn, "buyer", "buyer@example.com", true);
        let game = insert_game(&mut conn, "Space Miner", 500, dev.id);

        assert!(!Ownership::exists(&mut conn, buyer.id, game.id).unwrap());

        let t0 = now();
        Ownership::grant(&mut conn, buyer.id, game.id, t0).unwrap();
        Ownership::grant(&mut conn, buyer.id, game.id, t0).unwrap();

        assert!(Ownership::exists(&mut conn, buyer.id, game.id).unwrap());
        let owned = Game::owned_by(&mut conn, buyer.id).unwrap();
        assert_eq!(owned.len(), 1);
    }

    #[test]
    fn owned_by_lists_only_granted_games() {
        let pool = make_pool();
        let mut conn = pool.get().unwrap();
        let dev = insert_user(&mut conn, "dev", "dev@example.com", true);
        let buyer = insert_user(&mut conn, "buyer", "buyer@example.com", true);
        let g1 = insert_game(&mut conn, "One", 100, dev.id);
        let _g2 = insert_game(&mut conn, "Two", 200, dev.id);

        Ownership::grant(&mut conn, buyer.id, g1.id, now()).unwrap();

        let owned = Game::owned_by(&mut conn, buyer.id).unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, g1.id);
    }
}
