//! Service settings.
//!
//! All protocol constants live in an immutable [`Settings`] struct built
//! once at startup and carried in the application state; nothing reads
//! payment or activation configuration from ambient globals after boot.

use crate::utils::errors::StoreServiceError;
use chrono::Duration;
use std::env;

/// Default activation window in hours.
const DEFAULT_ACTIVATION_WINDOW_HOURS: i64 = 48;

/// Activation protocol settings.
#[derive(Debug, Clone)]
pub struct ActivationSettings {
    /// How long an issued activation key stays valid.
    pub window_hours: i64,
}

impl ActivationSettings {
    pub fn window(&self) -> Duration {
        Duration::hours(self.window_hours)
    }
}

/// Payment handshake settings for the external provider.
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    /// Our seller identifier at the payment provider.
    pub seller_id: String,
    /// Shared secret salting both checksum legs; never transmitted.
    pub secret_key: String,
    /// Callback URL the provider redirects back to. The provider expects
    /// separate success/cancel/error URLs; we point all three here and
    /// branch on the `result` parameter.
    pub result_url: String,
}

/// Immutable, process-wide settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub activation: ActivationSettings,
    pub payment: PaymentSettings,
}

impl Settings {
    /// Loads settings from the environment.
    ///
    /// `PAYMENT_SECRET_KEY` and `PAYMENT_SELLER_ID` are required; the
    /// service must not start without them, since every checkout and
    /// callback verification depends on both.
    pub fn from_env() -> Result<Self, StoreServiceError> {
        let seller_id = required("PAYMENT_SELLER_ID")?;
        let secret_key = required("PAYMENT_SECRET_KEY")?;
        let result_url = env::var("PAYMENT_RESULT_URL")
            .unwrap_or_else(|_| "http://localhost:8000/payment/result".to_string());

        let window_hours = env::var("ACTIVATION_WINDOW_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_ACTIVATION_WINDOW_HOURS);

        Ok(Settings {
            activation: ActivationSettings { window_hours },
            payment: PaymentSettings {
                seller_id,
                secret_key,
                result_url,
            },
        })
    }
}

fn required(name: &str) -> Result<String, StoreServiceError> {
    env::var(name)
        .map_err(|_| StoreServiceError::configuration(format!("{} must be set", name)))
}

#[cfg(test)]
impl Settings {
    /// Fixed settings for tests; no environment involved.
    pub fn dummy() -> Self {
        Settings {
            activation: ActivationSettings { window_hours: 48 },
            payment: PaymentSettings {
                seller_id: "SID1".to_string(),
                secret_key: "K".to_string(),
                result_url: "http://localhost:8000/payment/result".to_string(),
            },
        }
    }
}
