//! Payment result HTTP handler.
//!
//! The provider redirects the buyer's browser here, so the response is
//! HTML. The failure page is the same whether the provider reported a
//! failed payment or the checksum did not verify.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use std::sync::Arc;
use tracing::{error, info, span, Instrument, Level};

use crate::{
    app::AppState,
    handlers::activation::render_page,
    handlers::payment_result_logic::{process_payment_result, PaymentCallback, PaymentOutcome},
    utils::metrics,
};

/// Handles GET /payment/result requests.
pub async fn payment_result_handler(
    Query(callback): Query<PaymentCallback>,
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let span = span!(Level::INFO, "http_request",
        method = "GET",
        path = "/payment/result",
        pid = %callback.pid
    );
    let span_for_instrument = span.clone();
    let timer = metrics::http::timer("/payment/result");

    async move {
        info!("Received payment result callback");

        let now = chrono::Utc::now().naive_utc();
        let result = process_payment_result(&app_state, &callback, now).await;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => {
                error!("Payment result processing failed: {}", e);
                500
            }
        };
        span.record("http.status_code", &status);
        metrics::http::request("/payment/result", "GET", status);
        drop(timer);

        match result {
            Ok(PaymentOutcome::Granted) => Html(render_page(
                "Purchase Complete",
                "Your payment was verified and the game has been added to your library.",
                "success",
            ))
            .into_response(),
            Ok(PaymentOutcome::Rejected) => Html(render_page(
                "Payment Not Completed",
                "Your payment could not be completed. No charge was recorded; you can retry the purchase at any time.",
                "error",
            ))
            .into_response(),
            // A hard failure must not answer 200: the provider would take
            // the callback as delivered while the transaction stays pending.
            Err(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_page(
                    "Service Unavailable",
                    "We're experiencing technical difficulties. Please try again later.",
                    "error",
                )),
            )
                .into_response(),
        }
    }
    .instrument(span_for_instrument)
    .await
}
