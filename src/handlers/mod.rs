//! HTTP handlers, split into thin axum adapters and testable `*_logic`
//! modules holding the business rules.

pub mod activation;
pub mod activation_logic;
pub mod checkout;
pub mod checkout_logic;
pub mod games;
pub mod payment_result;
pub mod payment_result_logic;
pub mod register;
pub mod register_logic;
pub mod saves;
pub mod scores;
