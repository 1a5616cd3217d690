//! High scores.

use diesel::prelude::*;
use diesel::{Insertable, Queryable, Selectable, SqliteConnection};
use serde::Serialize;
use tracing::error;

use crate::db::schema::high_scores;
use crate::utils::errors::StoreServiceError;
use crate::utils::metrics;

#[derive(Debug, Serialize, Queryable, Selectable)]
#[diesel(table_name = high_scores)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HighScore {
    pub id: i32,
    pub user_id: i32,
    pub game_id: i32,
    pub score: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = high_scores)]
pub struct NewHighScore {
    pub user_id: i32,
    pub game_id: i32,
    pub score: i32,
}

impl HighScore {
    pub fn create(
        conn: &mut SqliteConnection,
        new_score: NewHighScore,
    ) -> Result<HighScore, StoreServiceError> {
        diesel::insert_into(high_scores::table)
            .values(&new_score)
            .get_result::<HighScore>(conn)
            .map_err(|e| {
                error!("Failed to store high score: {}", e);
                metrics::db::query_failure("score_create");
                StoreServiceError::database("Failed to store high score")
            })
            .map(|score| {
                metrics::db::query_success("score_create");
                score
            })
    }

    /// All scores for one game, best first.
    pub fn for_game(
        conn: &mut SqliteConnection,
        scored_game_id: i32,
    ) -> Result<Vec<HighScore>, StoreServiceError> {
        use crate::db::schema::high_scores::dsl::*;

        high_scores
            .filter(game_id.eq(scored_game_id))
            .order(score.desc())
            .load::<HighScore>(conn)
            .map_err(|e| {
                error!("Database error listing scores: {}", e);
                metrics::db::query_failure("score_list");
                StoreServiceError::database("Score listing failed")
            })
    }

    /// All scores across all games, best first.
    pub fn all(conn: &mut SqliteConnection) -> Result<Vec<HighScore>, StoreServiceError> {
        use crate::db::schema::high_scores::dsl::*;

        high_scores
            .order(score.desc())
            .load::<HighScore>(conn)
            .map_err(|e| {
                error!("Database error listing scores: {}", e);
                metrics::db::query_failure("score_list");
                StoreServiceError::database("Score listing failed")
            })
    }
}
