//! Stable identity for data-source results.

use sha2::{Digest, Sha256};

/// SHA-256 over the sorted ids, as 64 lowercase hex characters
///
/// The input order does not matter, so two reads returning the same set of
/// entities produce the same identity.
#[must_use]
pub fn result_digest<S: AsRef<str>>(ids: &[S]) -> String {
    let mut sorted: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    for id in sorted {
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
