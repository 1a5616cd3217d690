pub mod activation_key;
pub mod checksum;
pub mod email;
pub mod errors;
pub mod metrics;
pub mod test_utils;
pub mod validators;
