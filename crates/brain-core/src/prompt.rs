//! Prompt fingerprints for logs.

use std::fmt::Write;

use sha2::{Digest, Sha256};

/// Number of hex characters kept by [`short_fingerprint`].
const SHORT_FINGERPRINT_LEN: usize = 12;

/// Hex SHA-256 of a prompt, stable across runs.
pub fn hash_prompt(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    digest
        .iter()
        .fold(String::with_capacity(digest.len() * 2), |mut hex, byte| {
            let _ = write!(hex, "{:02x}", byte);
            hex
        })
}

/// First characters of [`hash_prompt`], enough to tell prompt versions apart in logs.
pub fn short_fingerprint(prompt: &str) -> String {
    let mut hex = hash_prompt(prompt);
    hex.truncate(SHORT_FINGERPRINT_LEN);
    hex
}
