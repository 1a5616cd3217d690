//! Game categories.
//!
//! Category names are stored lowercase and unique; assigning categories to
//! a game replaces the full set, mirroring how a catalog edit form submits
//! the complete selection.

use diesel::prelude::*;
use diesel::{Insertable, Queryable, Selectable, SqliteConnection};
use serde::Serialize;
use tracing::error;

use crate::db::games::Game;
use crate::db::schema::{categories, game_categories, games};
use crate::utils::errors::StoreServiceError;
use crate::utils::metrics;

#[derive(Debug, Serialize, Queryable, Selectable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GameCategory {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = categories)]
struct NewGameCategory {
    name: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = game_categories)]
struct NewGameCategoryLink {
    game_id: i32,
    category_id: i32,
}

impl GameCategory {
    /// Finds a category by (lowercased) name, creating it if missing.
    pub fn get_or_create(
        conn: &mut SqliteConnection,
        category_name: &str,
    ) -> Result<GameCategory, StoreServiceError> {
        use crate::db::schema::categories::dsl::*;

        let normalized = category_name.trim().to_lowercase();

        if let Some(existing) = categories
            .filter(name.eq(&normalized))
            .first::<GameCategory>(conn)
            .optional()
            .map_err(|e| {
                error!("Database error looking up category: {}", e);
                metrics::db::query_failure("category_lookup");
                StoreServiceError::database("Category lookup failed")
            })?
        {
            return Ok(existing);
        }

        diesel::insert_into(categories)
            .values(&NewGameCategory { name: normalized })
            .get_result::<GameCategory>(conn)
            .map_err(|e| {
                error!("Failed to create category: {}", e);
                metrics::db::query_failure("category_create");
                StoreServiceError::database("Failed to create category")
            })
            .map(|category| {
                metrics::db::query_success("category_create");
                category
            })
    }

    /// All categories, alphabetical.
    pub fn all(conn: &mut SqliteConnection) -> Result<Vec<GameCategory>, StoreServiceError> {
        use crate::db::schema::categories::dsl::*;

        categories
            .order(name.asc())
            .load::<GameCategory>(conn)
            .map_err(|e| {
                error!("Database error listing categories: {}", e);
                metrics::db::query_failure("category_list");
                StoreServiceError::database("Category listing failed")
            })
    }

    /// Replaces a game's category set with the given names, creating
    /// categories as needed. Runs inside the caller's store transaction.
    pub fn set_for_game(
        conn: &mut SqliteConnection,
        target_game_id: i32,
        names: &[String],
    ) -> Result<(), StoreServiceError> {
        diesel::delete(game_categories::table.filter(game_categories::game_id.eq(target_game_id)))
            .execute(conn)
            .map_err(|e| {
                error!("Failed to clear game categories: {}", e);
                StoreServiceError::database("Failed to update game categories")
            })?;

        for category_name in names {
            let category = Self::get_or_create(conn, category_name)?;
            diesel::insert_into(game_categories::table)
                .values(&NewGameCategoryLink {
                    game_id: target_game_id,
                    category_id: category.id,
                })
                .execute(conn)
                .map_err(|e| {
                    error!("Failed to link game to category: {}", e);
                    StoreServiceError::database("Failed to update game categories")
                })?;
        }

        Ok(())
    }

    /// Category names assigned to a game, alphabetical.
    pub fn names_for_game(
        conn: &mut SqliteConnection,
        target_game_id: i32,
    ) -> Result<Vec<String>, StoreServiceError> {
        game_categories::table
            .inner_join(categories::table)
            .filter(game_categories::game_id.eq(target_game_id))
            .select(categories::name)
            .order(categories::name.asc())
            .load::<String>(conn)
            .map_err(|e| {
                error!("Database error listing game categories: {}", e);
                StoreServiceError::database("Category listing failed")
            })
    }

    /// Games carrying the given category name.
    pub fn games_in(
        conn: &mut SqliteConnection,
        category_name: &str,
    ) -> Result<Option<Vec<Game>>, StoreServiceError> {
        use crate::db::schema::categories::dsl::*;

        let normalized = category_name.trim().to_lowercase();

        let category = categories
            .filter(name.eq(&normalized))
            .first::<GameCategory>(conn)
            .optional()
            .map_err(|e| {
                error!("Database error looking up category: {}", e);
                StoreServiceError::database("Category lookup failed")
            })?;

        let Some(category) = category else {
            return Ok(None);
        };

        game_categories::table
            .inner_join(games::table)
            .filter(game_categories::category_id.eq(category.id))
            .select(Game::as_select())
            .load::<Game>(conn)
            .map(Some)
            .map_err(|e| {
                error!("Database error listing category games: {}", e);
                StoreServiceError::database("Category games listing failed")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{insert_game, insert_user, make_pool};

    #[test]
    fn get_or_create_normalizes_and_deduplicates() {
        let pool = make_pool();
        let mut conn = pool.get().unwrap();

        let a = GameCategory::get_or_create(&mut conn, "Arcade").unwrap();
        let b = GameCategory::get_or_create(&mut conn, "  arcade ").unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.name, "arcade");
        assert_eq!(GameCategory::all(&mut conn).unwrap().len(), 1);
    }

    #[test]
    fn set_for_game_replaces_the_full_set() {
        let pool = make_pool();
        let mut conn = pool.get().unwrap();
        let dev = insert_user(&mut conn, "dev", "dev@example.com", true);
        let game = insert_game(&mut conn, "Space Miner", 500, dev.id);

        GameCategory::set_for_game(&mut conn, game.id, &["arcade".into(), "puzzle".into()])
            .unwrap();
        assert_eq!(
            GameCategory::names_for_game(&mut conn, game.id).unwrap(),
            vec!["arcade", "puzzle"]
        );

        GameCategory::set_for_game(&mut conn, game.id, &["strategy".into()]).unwrap();
        assert_eq!(
            GameCategory::names_for_game(&mut conn, game.id).unwrap(),
            vec!["strategy"]
        );
    }

    #[test]
    fn games_in_filters_by_category() {
        let pool = make_pool();
        let mut conn = pool.get().unwrap();
        let dev = insert_user(&mut conn, "dev", "dev@example.com", true);
        let arcade_game = insert_game(&mut conn, "Arcade One", 100, dev.id);
        let _other = insert_game(&mut conn, "Other", 200, dev.id);

        GameCategory::set_for_game(&mut conn, arcade_game.id, &["arcade".into()]).unwrap();

        let listed = GameCategory::games_in(&mut conn, "Arcade").unwrap().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, arcade_game.id);

        // An unknown category is distinct from an empty one.
        assert!(GameCategory::games_in(&mut conn, "no-such").unwrap().is_none());
    }
}
