//! Outbound e-mail for account confirmation.
//!
//! SMTP transport via lettre with credentials and a send timeout, plus a
//! TEST_MODE that logs instead of sending for development and CI. Delivery
//! failures are propagated to the caller, never swallowed: a registration
//! whose confirmation mail was lost must be flagged incomplete rather than
//! leave the account in an unreachable inactive state.

use crate::utils::errors::StoreServiceError;
use crate::utils::metrics;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::env;
use std::time::Duration;
use tracing::{error, info, warn};

/// Email configuration with SMTP transport and sender settings.
#[derive(Clone)]
pub struct EmailConfig {
    from_address: String,
    mailer: SmtpTransport,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("from_address", &self.from_address)
            .field("mailer", &"SmtpTransport{configured}")
            .finish()
    }
}

impl EmailConfig {
    /// Creates the e-mail configuration from environment variables.
    ///
    /// In TEST_MODE a local mock transport is configured and sends are
    /// logged instead of delivered; otherwise `SMTP_SERVER`,
    /// `SMTP_USERNAME` and `SMTP_PASSWORD` are required.
    pub fn new() -> Result<Self, StoreServiceError> {
        if Self::is_test_mode() {
            info!("Running in TEST_MODE - emails will be logged but not sent");
            return Ok(Self {
                from_address: "test@example.com".into(),
                mailer: SmtpTransport::builder_dangerous("localhost")
                    .port(1025) // Standard MailHog/test SMTP port
                    .build(),
            });
        }

        let smtp_server = Self::required_env_var("SMTP_SERVER")?;
        let smtp_username = Self::required_env_var("SMTP_USERNAME")?;
        let smtp_password = Self::required_env_var("SMTP_PASSWORD")?;
        let from_address =
            env::var("SMTP_FROM_ADDRESS").unwrap_or_else(|_| "no-reply@example.com".to_string());

        let credentials = Credentials::new(smtp_username, smtp_password);
        let mailer = SmtpTransport::relay(&smtp_server)
            .map_err(|e| {
                error!("SMTP transport creation failed: {}", e);
                StoreServiceError::configuration("Failed to create email transport")
            })?
            .credentials(credentials)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        info!(server = %smtp_server, from = %from_address, "SMTP transport configured");
        Ok(Self { from_address, mailer })
    }

    fn required_env_var(name: &str) -> Result<String, StoreServiceError> {
        env::var(name).map_err(|_| {
            error!("{} variable missing", name);
            StoreServiceError::configuration(format!("{} must be set", name))
        })
    }

    fn is_test_mode() -> bool {
        env::var("TEST_MODE").is_ok_and(|v| v == "true")
    }

    /// Sends the account confirmation e-mail carrying the activation link.
    ///
    /// The caller has already persisted the activation token; no store
    /// lock is held while the SMTP call is in flight.
    pub fn send_activation_email(
        &self,
        to_email: &str,
        username: &str,
        activation_key: &str,
        window_hours: i64,
    ) -> Result<(), StoreServiceError> {
        let activation_link = confirmation_link(activation_key);

        let email_body = format!(
            "Hey {}, thanks for signing up.\n\n\
             To activate your account, click this link within {} hours:\n\n\
             {}\n\n\
             If you did not create an account, please ignore this message.",
            username, window_hours, activation_link
        );

        if Self::is_test_mode() {
            info!(email = %to_email, "TEST MODE: would send confirmation email");
            metrics::email::sent();
            return Ok(());
        }

        let email = self.build_message(to_email, "Account confirmation", &email_body)?;

        match self.mailer.send(&email) {
            Ok(_) => {
                info!(email = %to_email, "Confirmation email sent");
                metrics::email::sent();
                Ok(())
            }
            Err(e) => {
                warn!(email = %to_email, "Failed to send confirmation email: {}", e);
                metrics::email::failed();
                Err(StoreServiceError::email(format!(
                    "Failed to send confirmation email: {}",
                    e
                )))
            }
        }
    }

    fn build_message(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<Message, StoreServiceError> {
        Message::builder()
            .from(self.from_address.parse().map_err(|e| {
                error!("Invalid sender address '{}': {}", self.from_address, e);
                metrics::email::failed();
                StoreServiceError::configuration("Invalid sender email address configuration")
            })?)
            .to(recipient.parse().map_err(|e| {
                warn!("Invalid recipient address '{}': {}", recipient, e);
                metrics::email::failed();
                StoreServiceError::email("Invalid recipient email address")
            })?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| {
                error!("Failed to build email message: {}", e);
                metrics::email::failed();
                StoreServiceError::configuration("Failed to build email message")
            })
    }
}

#[cfg(test)]
impl EmailConfig {
    /// Creates a dummy EmailConfig for testing.
    pub fn dummy() -> Self {
        EmailConfig {
            from_address: "test@example.com".into(),
            mailer: SmtpTransport::builder_dangerous("localhost")
                .port(1025)
                .build(),
        }
    }
}

/// Builds the frontend confirmation link for an activation key.
pub fn confirmation_link(activation_key: &str) -> String {
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
    format!("{}/accounts/confirm/{}", frontend_url, activation_key)
}
