//! Payment checksum computation.
//!
//! The payment provider authenticates both redirect legs with an MD5
//! digest over a canonical `key=value&...` string that is salted with the
//! shared secret key. The secret itself never crosses the wire.
//!
//! Wire format (must match the provider byte-for-byte):
//!
//! - outbound: `pid={transactionId}&sid={sellerId}&amount={price}&token={secret}`
//! - inbound:  `pid={pid}&ref={ref}&result={result}&token={secret}`
//!
//! The digest is the lowercase hex of the full 128-bit hash. An unkeyed
//! general-purpose digest is a weak authenticator by modern standards; the
//! wire format is fixed by the provider, so the choice is isolated in
//! [`digest_hex`] where a keyed MAC could be swapped in without touching
//! call sites.

use md5::{Digest, Md5};

/// Single seam for the checksum digest.
fn digest_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checksum for the outbound redirect form, computed over typed fields of
/// the freshly created transaction.
pub fn outbound_checksum(transaction_id: i32, seller_id: &str, amount: i32, secret: &str) -> String {
    let canonical = format!(
        "pid={}&sid={}&amount={}&token={}",
        transaction_id, seller_id, amount, secret
    );
    digest_hex(&canonical)
}

/// Checksum for the inbound provider callback, computed over the raw query
/// parameter strings exactly as received.
pub fn inbound_checksum(pid: &str, reference: &str, result: &str, secret: &str) -> String {
    let canonical = format!(
        "pid={}&ref={}&result={}&token={}",
        pid, reference, result, secret
    );
    digest_hex(&canonical)
}

/// Compares a supplied checksum against the expected one.
///
/// Exact string equality over the full hex digest; no prefix or
/// case-insensitive matching.
pub fn checksum_matches(expected: &str, supplied: &str) -> bool {
    expected == supplied
}
