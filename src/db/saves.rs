//! Save-state persistence. Loading returns the most recent save.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::{Insertable, Queryable, Selectable, SqliteConnection};
use serde::Serialize;
use tracing::error;

use crate::db::schema::saves;
use crate::utils::errors::StoreServiceError;
use crate::utils::metrics;

#[derive(Debug, Serialize, Queryable, Selectable)]
#[diesel(table_name = saves)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Save {
    pub id: i32,
    pub user_id: i32,
    pub game_id: i32,
    pub game_state: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = saves)]
pub struct NewSave {
    pub user_id: i32,
    pub game_id: i32,
    pub game_state: String,
    pub created_at: NaiveDateTime,
}

impl Save {
    pub fn create(conn: &mut SqliteConnection, new_save: NewSave) -> Result<Save, StoreServiceError> {
        diesel::insert_into(saves::table)
            .values(&new_save)
            .get_result::<Save>(conn)
            .map_err(|e| {
                error!("Failed to store save state: {}", e);
                metrics::db::query_failure("save_create");
                StoreServiceError::database("Failed to store save state")
            })
            .map(|save| {
                metrics::db::query_success("save_create");
                save
            })
    }

    /// Most recent save for a player/game pair, if any.
    pub fn latest(
        conn: &mut SqliteConnection,
        player_id: i32,
        saved_game_id: i32,
    ) -> Result<Option<Save>, StoreServiceError> {
        use crate::db::schema::saves::dsl::*;

        saves
            .filter(user_id.eq(player_id))
            .filter(game_id.eq(saved_game_id))
            .order((created_at.desc(), id.desc()))
            .first::<Save>(conn)
            .optional()
            .map_err(|e| {
                error!("Database error loading save state: {}", e);
                metrics::db::query_failure("save_lookup");
                StoreServiceError::database("Save lookup failed")
            })
    }
}
