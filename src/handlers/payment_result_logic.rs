//! Business logic for the inbound payment leg.
//!
//! The provider redirects the buyer back with `result`, `pid`, `ref` and
//! `checksum` query parameters. The checksum is recomputed over the raw
//! parameter strings; only an exact match on the full digest together with
//! `result == "success"` grants ownership. Everything else deletes the
//! pending transaction, so failed attempts never linger. Tampering and a
//! legitimately failed payment are deliberately indistinguishable to the
//! user. Grant-or-delete runs in one store transaction, making duplicate
//! provider callbacks safe.

use chrono::NaiveDateTime;
use diesel::Connection;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    app::AppState,
    config::database::get_connection,
    db::games::Ownership,
    db::transactions::Transaction,
    utils::{checksum, errors::StoreServiceError, metrics},
};

/// Raw callback parameters as received from the provider.
#[derive(Debug, Deserialize)]
pub struct PaymentCallback {
    pub result: String,
    pub pid: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub checksum: String,
}

/// Outcome of verifying a provider callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Checksum verified and the provider reported success: ownership is
    /// granted and the transaction retained as the purchase record.
    Granted,
    /// Non-success result or checksum mismatch: the pending transaction
    /// is deleted.
    Rejected,
}

/// Verifies an inbound provider callback and settles the transaction.
pub async fn process_payment_result(
    state: &AppState,
    callback: &PaymentCallback,
    now: NaiveDateTime,
) -> Result<PaymentOutcome, StoreServiceError> {
    let expected = checksum::inbound_checksum(
        &callback.pid,
        &callback.reference,
        &callback.result,
        &state.settings.payment.secret_key,
    );
    let verified =
        callback.result == "success" && checksum::checksum_matches(&expected, &callback.checksum);

    // A pid our checkout never issued cannot carry a valid checksum, so a
    // parse failure only ever accompanies the rejected branch.
    let transaction_id: Option<i32> = callback.pid.parse().ok();

    let mut conn = get_connection(&state.pool)?;

    let outcome = conn.transaction::<_, StoreServiceError, _>(|conn| {
        if verified {
            let transaction_id = transaction_id.ok_or_else(|| {
                StoreServiceError::validation("pid", "Malformed transaction id")
            })?;
            // A verified callback for a missing transaction is a hard
            // failure, not a payment outcome.
            let transaction = Transaction::find(conn, transaction_id)?
                .ok_or_else(|| StoreServiceError::not_found("Transaction"))?;

            Ownership::grant(conn, transaction.payer_id, transaction.game_id, now)?;
            Ok(PaymentOutcome::Granted)
        } else {
            if let Some(transaction_id) = transaction_id {
                // Idempotent cleanup of the abandoned attempt.
                Transaction::delete(conn, transaction_id)?;
            }
            Ok(PaymentOutcome::Rejected)
        }
    })?;

    match outcome {
        PaymentOutcome::Granted => {
            info!(pid = %callback.pid, "Payment verified, ownership granted");
            metrics::store::payment_result("granted");
        }
        PaymentOutcome::Rejected => {
            warn!(pid = %callback.pid, result = %callback.result, "Payment callback rejected");
            metrics::store::payment_result("rejected");
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::games::Game;
    use crate::db::transactions::NewTransaction;
    use crate::utils::test_utils::{insert_game, insert_user, now, test_state};

    fn callback(pid: &str, reference: &str, result: &str, checksum_value: &str) -> PaymentCallback {
        PaymentCallback {
            result: result.to_string(),
            pid: pid.to_string(),
            reference: reference.to_string(),
            checksum: checksum_value.to_string(),
        }
    }

    fn signed_callback(pid: &str, reference: &str, result: &str) -> PaymentCallback {
        // Test settings use secret "K".
        let digest = checksum::inbound_checksum(pid, reference, result, "K");
        callback(pid, reference, result, &digest)
    }

    async fn seed_pending(state: &crate::app::AppState) -> (i32, i32, i32) {
        let mut conn = state.pool.get().unwrap();
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
        (txn.id, buyer.id, game.id)
    }

    #[tokio::test]
    async fn verified_success_grants_ownership_and_retains_transaction() {
        let state = test_state();
        let (pid, buyer_id, game_id) = seed_pending(&state).await;

        let cb = signed_callback(&pid.to_string(), "R1", "success");
        let outcome = process_payment_result(&state, &cb, now()).await.unwrap();
        assert_eq!(outcome, PaymentOutcome::Granted);

        let mut conn = state.pool.get().unwrap();
        assert!(Ownership::exists(&mut conn, buyer_id, game_id).unwrap());
        // Settled transaction is the durable purchase record.
        assert!(Transaction::find(&mut conn, pid).unwrap().is_some());
    }

    #[tokio::test]
    async fn failure_result_deletes_the_pending_transaction() {
        let state = test_state();
        let (pid, buyer_id, game_id) = seed_pending(&state).await;

        // Provider signs failure results too; the checksum is valid.
        let cb = signed_callback(&pid.to_string(), "R1", "failure");
        let outcome = process_payment_result(&state, &cb, now()).await.unwrap();
        assert_eq!(outcome, PaymentOutcome::Rejected);

        let mut conn = state.pool.get().unwrap();
        assert!(!Ownership::exists(&mut conn, buyer_id, game_id).unwrap());
        assert!(Transaction::find(&mut conn, pid).unwrap().is_none());
    }

    #[tokio::test]
    async fn tampered_checksum_is_rejected_and_cleans_up() {
        let state = test_state();
        let (pid, buyer_id, game_id) = seed_pending(&state).await;

        let good = checksum::inbound_checksum(&pid.to_string(), "R1", "success", "K");
        // Flip the last character.
        let mut tampered = good[..31].to_string();
        tampered.push(if good.ends_with('0') { '1' } else { '0' });

        let cb = callback(&pid.to_string(), "R1", "success", &tampered);
        let outcome = process_payment_result(&state, &cb, now()).await.unwrap();
        assert_eq!(outcome, PaymentOutcome::Rejected);

        let mut conn = state.pool.get().unwrap();
        assert!(!Ownership::exists(&mut conn, buyer_id, game_id).unwrap());
        assert!(Transaction::find(&mut conn, pid).unwrap().is_none());
    }

    #[tokio::test]
    async fn success_result_with_wrong_secret_is_rejected() {
        let state = test_state();
        let (pid, _, _) = seed_pending(&state).await;

        let forged = checksum::inbound_checksum(&pid.to_string(), "R1", "success", "wrong-secret");
        let cb = callback(&pid.to_string(), "R1", "success", &forged);
        let outcome = process_payment_result(&state, &cb, now()).await.unwrap();
        assert_eq!(outcome, PaymentOutcome::Rejected);
    }

    #[tokio::test]
    async fn duplicate_success_callback_is_idempotent() {
        let state = test_state();
        let (pid, buyer_id, game_id) = seed_pending(&state).await;

        let cb = signed_callback(&pid.to_string(), "R1", "success");
        assert_eq!(
            process_payment_result(&state, &cb, now()).await.unwrap(),
            PaymentOutcome::Granted
        );
        assert_eq!(
            process_payment_result(&state, &cb, now()).await.unwrap(),
            PaymentOutcome::Granted
        );

        let mut conn = state.pool.get().unwrap();
        assert!(Ownership::exists(&mut conn, buyer_id, game_id).unwrap());
        let owned = Game::owned_by(&mut conn, buyer_id).unwrap();
        assert_eq!(owned.len(), 1);
    }

    #[tokio::test]
    async fn verified_callback_for_missing_transaction_is_a_hard_failure() {
        let state = test_state();

        let cb = signed_callback("424242", "R1", "success");
        let result = process_payment_result(&state, &cb, now()).await;
        assert!(matches!(result, Err(StoreServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn duplicate_failure_callback_does_not_error() {
        let state = test_state();
        let (pid, _, _) = seed_pending(&state).await;

        let cb = signed_callback(&pid.to_string(), "R1", "failure");
        assert_eq!(
            process_payment_result(&state, &cb, now()).await.unwrap(),
            PaymentOutcome::Rejected
        );
        assert_eq!(
            process_payment_result(&state, &cb, now()).await.unwrap(),
            PaymentOutcome::Rejected
        );
    }

    #[tokio::test]
    async fn unparsable_pid_with_bad_checksum_is_rejected() {
        let state = test_state();
        let cb = callback("not-a-pid", "R1", "success", "0000");
        let outcome = process_payment_result(&state, &cb, now()).await.unwrap();
        assert_eq!(outcome, PaymentOutcome::Rejected);
    }
}
