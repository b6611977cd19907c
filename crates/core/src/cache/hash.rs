//! Entry key hashing for the SQLite store.

use sha2::{Digest, Sha256};

/// Compute the stored key hash for a request identity.
///
/// Requests are always GET today, but the method is part of the identity so a
/// future HEAD entry can never shadow a GET one.
pub fn compute_entry_key(method: &str, request_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(request_key.as_bytes());
    hex::encode(hasher.finalize())
}
