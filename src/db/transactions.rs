//! Purchase transactions.
//!
//! A transaction row's existence means pendingness: it is created when a
//! buyer initiates checkout, retained as the durable purchase record once
//! ownership is granted, and deleted when the provider reports failure or
//! the checksum does not verify. A pending row with no ownership grant is a
//! crash-recovery artifact for an operational sweep, not a terminal state.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::{Insertable, Queryable, Selectable, SqliteConnection};
use serde::Serialize;
use tracing::error;

use crate::db::schema::transactions;
use crate::utils::errors::StoreServiceError;
use crate::utils::metrics;

#[derive(Debug, Serialize, Queryable, Selectable)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Transaction {
    pub id: i32,
    pub game_id: i32,
    pub payer_id: i32,
    pub seller_id: i32,
    pub price: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = transactions)]
pub struct NewTransaction {
    pub game_id: i32,
    pub payer_id: i32,
    pub seller_id: i32,
    pub price: i32,
    pub created_at: NaiveDateTime,
}

impl Transaction {
    /// Creates a pending transaction for a checkout.
    pub fn create(
        conn: &mut SqliteConnection,
        new_transaction: NewTransaction,
    ) -> Result<Transaction, StoreServiceError> {
        diesel::insert_into(transactions::table)
            .values(&new_transaction)
            .get_result::<Transaction>(conn)
            .map_err(|e| {
                error!("Failed to create transaction: {}", e);
                metrics::db::query_failure("transaction_create");
                StoreServiceError::database("Failed to create transaction")
            })
            .map(|transaction| {
                metrics::db::query_success("transaction_create");
                transaction
            })
    }

    pub fn find(
        conn: &mut SqliteConnection,
        transaction_id: i32,
    ) -> Result<Option<Transaction>, StoreServiceError> {
        use crate::db::schema::transactions::dsl::*;

        transactions
            .filter(id.eq(transaction_id))
            .first::<Transaction>(conn)
            .optional()
            .map_err(|e| {
                error!("Database error finding transaction {}: {}", transaction_id, e);
                metrics::db::query_failure("transaction_lookup");
                StoreServiceError::database("Transaction lookup failed")
            })
            .map(|found| {
                metrics::db::query_success("transaction_lookup");
                found
            })
    }

    /// Deletes a pending transaction after a failed or tampered callback.
    ///
    /// Idempotent: deleting an already-removed row is a no-op so duplicate
    /// failure callbacks cannot error. Runs inside the caller's store
    /// transaction.
    pub fn delete(
        conn: &mut SqliteConnection,
        transaction_id: i32,
    ) -> Result<usize, diesel::result::Error> {
        use crate::db::schema::transactions::dsl::*;

        diesel::delete(transactions.filter(id.eq(transaction_id))).execute(conn)
    }

    /// Transactions where the given account is the seller, newest first.
    pub fn sold_by(
        conn: &mut SqliteConnection,
        seller: i32,
    ) -> Result<Vec<Transaction>, StoreServiceError> {
        use crate::db::schema::transactions::dsl::*;

        transactions
            .filter(seller_id.eq(seller))
            .order(created_at.desc())
            .load::<Transaction>(conn)
            .map_err(|e| {
                error!("Database error listing sold transactions: {}", e);
                metrics::db::query_failure("transaction_list_sold");
                StoreServiceError::database("Transaction listing failed")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{insert_game, insert_user, make_pool, now};

    #[test]
    fn create_find_delete_cycle() {
        let pool = make_pool();
        let mut conn = pool.get().unwrap();
        let dev = insert_user(&mut conn, "dev", "dev@example.com", true);
        let buyer = insert_user(&mut conn, "buyer", "buyer@example.com", true);
        let game = insert_game(&mut conn, "Space Miner", 500, dev.id);

        let txn = Transaction::create(
            &mut conn,
            NewTransaction {
                game_id: game.id,
                payer_id: buyer.id,
                seller_id: dev.id,
                price: game.price,
                created_at: now(),
            },
        )
        .unwrap();

        assert!(Transaction::find(&mut conn, txn.id).unwrap().is_some());

        let deleted = Transaction::delete(&mut conn, txn.id).unwrap();
        assert_eq!(deleted, 1);
        assert!(Transaction::find(&mut conn, txn.id).unwrap().is_none());

        // Idempotent cleanup of an already-removed row.
        assert_eq!(Transaction::delete(&mut conn, txn.id).unwrap(), 0);
    }

    #[test]
    fn price_is_snapshotted_at_creation() {
        let pool = make_pool();
        let mut conn = pool.get().unwrap();
        let dev = insert_user(&mut conn, "dev", "dev@example.com", true);
        let buyer = insert_user(&mut conn, "buyer", "buyer@example.com", true);
        let game = insert_game(&mut conn, "Space Miner", 500, dev.id);

        let txn = Transaction::create(
            &mut conn,
            NewTransaction {
                game_id: game.id,
                payer_id: buyer.id,
                seller_id: dev.id,
                price: game.price,
                created_at: now(),
            },
        )
        .unwrap();

        assert_eq!(txn.price, 500);
        assert_eq!(txn.seller_id, dev.id);
        assert_eq!(txn.payer_id, buyer.id);
    }
}
