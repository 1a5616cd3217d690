//! Business logic for checkout initiation (the outbound payment leg).
//!
//! Creates a pending transaction snapshotting the game's current price and
//! seller, and computes the outbound checksum for the form the frontend
//! auto-submits to the payment provider. Buyers who already own the game
//! never reach the provider; they are redirected back to the game.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

use crate::{
    app::AppState,
    config::database::get_connection,
    db::games::{Game, Ownership},
    db::transactions::{NewTransaction, Transaction},
    utils::{checksum, errors::StoreServiceError, metrics},
};

/// Fields for the auto-submitted payment provider form.
#[derive(Debug, Serialize)]
pub struct PaymentRedirect {
    pub pid: i32,
    pub sid: String,
    pub amount: i32,
    pub checksum: String,
    pub success_url: String,
    pub cancel_url: String,
    pub error_url: String,
}

/// Outcome of a checkout initiation.
#[derive(Debug)]
pub enum CheckoutOutcome {
    /// The buyer already owns the game; no transaction is created.
    AlreadyOwned,
    /// Pending transaction created; redirect the buyer to the provider.
    Redirect(PaymentRedirect),
}

/// Prepares the outbound payment redirect for a buyer and a game.
pub async fn prepare_checkout(
    state: &AppState,
    buyer_id: i32,
    game_id: i32,
    now: NaiveDateTime,
) -> Result<CheckoutOutcome, StoreServiceError> {
    let mut conn = get_connection(&state.pool)?;

    let game = Game::find(&mut conn, game_id)?;

    if Ownership::exists(&mut conn, buyer_id, game.id)? {
        metrics::store::checkout("already_owned");
        return Ok(CheckoutOutcome::AlreadyOwned);
    }

    let transaction = Transaction::create(
        &mut conn,
        NewTransaction {
            game_id: game.id,
            payer_id: buyer_id,
            seller_id: game.developer_id,
            price: game.price,
            created_at: now,
        },
    )
    .map_err(|e| {
        metrics::store::checkout("failure");
        e
    })?;

    let payment = &state.settings.payment;
    let checksum = checksum::outbound_checksum(
        transaction.id,
        &payment.seller_id,
        transaction.price,
        &payment.secret_key,
    );

    info!(
        transaction_id = transaction.id,
        game_id = game.id,
        "Pending transaction created for checkout"
    );
    metrics::store::checkout("created");

    Ok(CheckoutOutcome::Redirect(PaymentRedirect {
        pid: transaction.id,
        sid: payment.seller_id.clone(),
        amount: transaction.price,
        checksum,
        success_url: payment.result_url.clone(),
        cancel_url: payment.result_url.clone(),
        error_url: payment.result_url.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{insert_game, insert_user, make_pool, now, test_state};

    #[tokio::test]
    async fn checkout_creates_pending_transaction_with_checksum() {
        let state = test_state();
        let mut conn = state.pool.get().unwrap();
        let dev = insert_user(&mut conn, "dev", "dev@example.com", true);
        let buyer = insert_user(&mut conn, "buyer", "buyer@example.com", true);
        let game = insert_game(&mut conn, "Space Miner", 500, dev.id);
        drop(conn);

        let outcome = prepare_checkout(&state, buyer.id, game.id, now()).await.unwrap();
        let redirect = match outcome {
            CheckoutOutcome::Redirect(r) => r,
            other => panic!("Expected redirect, got {:?}", other),
        };

        assert_eq!(redirect.amount, 500);
        assert_eq!(redirect.sid, "SID1");
        assert_eq!(
            redirect.checksum,
            checksum::outbound_checksum(redirect.pid, "SID1", 500, "K")
        );
        assert_eq!(redirect.success_url, redirect.cancel_url);
        assert_eq!(redirect.success_url, redirect.error_url);

        // Pending transaction row exists until the provider calls back.
        let mut conn = state.pool.get().unwrap();
        let txn = Transaction::find(&mut conn, redirect.pid).unwrap().unwrap();
        assert_eq!(txn.payer_id, buyer.id);
        assert_eq!(txn.seller_id, dev.id);
    }

    #[tokio::test]
    async fn owners_are_not_charged_again() {
        let state = test_state();
        let mut conn = state.pool.get().unwrap();
        let dev = insert_user(&mut conn, "dev", "dev@example.com", true);
        let buyer = insert_user(&mut conn, "buyer", "buyer@example.com", true);
        let game = insert_game(&mut conn, "Space Miner", 500, dev.id);
        Ownership::grant(&mut conn, buyer.id, game.id, now()).unwrap();
        drop(conn);

        let outcome = prepare_checkout(&state, buyer.id, game.id, now()).await.unwrap();
        assert!(matches!(outcome, CheckoutOutcome::AlreadyOwned));

        // No transaction was created.
        let mut conn = state.pool.get().unwrap();
        use crate::db::schema::transactions::dsl::*;
        use diesel::prelude::*;
        let count: i64 = transactions.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn unknown_game_is_not_found() {
        let state = test_state();
        let mut conn = state.pool.get().unwrap();
        let buyer = insert_user(&mut conn, "buyer", "buyer@example.com", true);
        drop(conn);

        let result = prepare_checkout(&state, buyer.id, 404, now()).await;
        assert!(matches!(result, Err(StoreServiceError::NotFound { .. })));
    }

    #[test]
    fn price_snapshot_uses_game_price_at_checkout_time() {
        // The transaction price is read from the game row at creation;
        // later price edits must not affect a pending transaction.
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

        use crate::db::schema::games::dsl::*;
        use diesel::prelude::*;
        diesel::update(games.filter(id.eq(game.id)))
            .set(price.eq(999))
            .execute(&mut conn)
            .unwrap();

        let reloaded = Transaction::find(&mut conn, txn.id).unwrap().unwrap();
        assert_eq!(reloaded.price, 500);
    }
}
