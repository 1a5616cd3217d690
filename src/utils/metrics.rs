//! Prometheus metrics for the game store service.
//!
//! Counters and histograms covering the two core protocols (activation,
//! payment handshake), database queries, e-mail delivery, and HTTP traffic.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramTimer,
    HistogramVec, TextEncoder,
};

// ===== Store Protocol Metrics =====
lazy_static! {
    pub static ref STORE_REGISTRATIONS: CounterVec = register_counter_vec!(
        "store_registrations_total",
        "Number of registration attempts",
        &["result"] // "success", "validation_failed", "already_exists", "email_failed", "failure"
    ).expect("Failed to register STORE_REGISTRATIONS");

    pub static ref STORE_ACTIVATIONS: CounterVec = register_counter_vec!(
        "store_activations_total",
        "Number of account activation attempts",
        &["result"] // "activated", "expired", "not_found", "failure"
    ).expect("Failed to register STORE_ACTIVATIONS");

    pub static ref PAYMENT_CHECKOUTS: CounterVec = register_counter_vec!(
        "store_payment_checkouts_total",
        "Number of checkout initiations",
        &["result"] // "created", "already_owned", "failure"
    ).expect("Failed to register PAYMENT_CHECKOUTS");

    pub static ref PAYMENT_RESULTS: CounterVec = register_counter_vec!(
        "store_payment_results_total",
        "Number of payment provider callbacks",
        &["result"] // "granted", "rejected", "failure"
    ).expect("Failed to register PAYMENT_RESULTS");
}

// ===== Infrastructure Metrics =====
lazy_static! {
    pub static ref DB_QUERIES: CounterVec = register_counter_vec!(
        "store_db_queries_total",
        "Number of database queries",
        &["operation", "result"] // result: "success", "failure"
    ).expect("Failed to register DB_QUERIES");

    pub static ref EMAIL_OPERATIONS: CounterVec = register_counter_vec!(
        "store_email_operations_total",
        "Number of outbound e-mail operations",
        &["result"] // "success", "failure"
    ).expect("Failed to register EMAIL_OPERATIONS");

    pub static ref HTTP_REQUESTS: CounterVec = register_counter_vec!(
        "store_http_requests_total",
        "Number of HTTP requests",
        &["path", "method", "status"]
    ).expect("Failed to register HTTP_REQUESTS");

    pub static ref HTTP_DURATION: HistogramVec = register_histogram_vec!(
        "store_http_request_duration_seconds",
        "HTTP request latency",
        &["path"]
    ).expect("Failed to register HTTP_DURATION");
}

/// Forces registration of all lazily-initialized metrics at startup.
pub fn init() {
    lazy_static::initialize(&STORE_REGISTRATIONS);
    lazy_static::initialize(&STORE_ACTIVATIONS);
    lazy_static::initialize(&PAYMENT_CHECKOUTS);
    lazy_static::initialize(&PAYMENT_RESULTS);
    lazy_static::initialize(&DB_QUERIES);
    lazy_static::initialize(&EMAIL_OPERATIONS);
    lazy_static::initialize(&HTTP_REQUESTS);
    lazy_static::initialize(&HTTP_DURATION);
}

/// Renders the registry in Prometheus text exposition format.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub mod store {
    use super::*;

    pub fn registration(result: &str) {
        STORE_REGISTRATIONS.with_label_values(&[result]).inc();
    }

    pub fn activation(result: &str) {
        STORE_ACTIVATIONS.with_label_values(&[result]).inc();
    }

    pub fn checkout(result: &str) {
        PAYMENT_CHECKOUTS.with_label_values(&[result]).inc();
    }

    pub fn payment_result(result: &str) {
        PAYMENT_RESULTS.with_label_values(&[result]).inc();
    }
}

pub mod db {
    use super::*;

    pub fn query_success(operation: &str) {
        DB_QUERIES.with_label_values(&[operation, "success"]).inc();
    }

    pub fn query_failure(operation: &str) {
        DB_QUERIES.with_label_values(&[operation, "failure"]).inc();
    }
}

pub mod email {
    use super::*;

    pub fn sent() {
        EMAIL_OPERATIONS.with_label_values(&["success"]).inc();
    }

    pub fn failed() {
        EMAIL_OPERATIONS.with_label_values(&["failure"]).inc();
    }
}

pub mod http {
    use super::*;

    pub fn request(path: &str, method: &str, status: u16) {
        HTTP_REQUESTS
            .with_label_values(&[path, method, &status.to_string()])
            .inc();
    }

    pub fn timer(path: &str) -> HistogramTimer {
        HTTP_DURATION.with_label_values(&[path]).start_timer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        init();
        let before = STORE_ACTIVATIONS.with_label_values(&["activated"]).get();
        store::activation("activated");
        let after = STORE_ACTIVATIONS.with_label_values(&["activated"]).get();
        assert_eq!(after, before + 1.0);
    }

    #[test]
    fn gather_renders_text_format() {
        init();
        store::payment_result("granted");
        let text = gather();
        assert!(text.contains("store_payment_results_total"));
    }
}
