//! Activation key generation.
//!
//! Keys are 40-character lowercase hex strings: the SHA-1 of a short random
//! salt concatenated with the account's e-mail address. Collision
//! probability is treated as negligible rather than checked-and-retried;
//! the store layer carries a UNIQUE constraint on the token column so a
//! collision fails loudly instead of binding two accounts to one key.

use rand::Rng;
use sha1::{Digest, Sha1};

fn sha1_hex(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates an unguessable activation key bound to an e-mail address.
pub fn generate(email: &str) -> String {
    let random: f64 = rand::thread_rng().gen();
    let salt = sha1_hex(&random.to_string());
    sha1_hex(&format!("{}{}", &salt[..5], email))
}
