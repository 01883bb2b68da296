//! Content fingerprinting for cache and idempotency keys.
//!
//! The fingerprint is the SHA-256 digest of the exact submitted content
//! string. No normalization is applied: byte-identical content always maps
//! to the same fingerprint, while whitespace or case differences produce
//! different fingerprints. That is a documented limitation, not a bug:
//! the key must never serve wrong content, and a content-derived hash
//! guarantees that.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Prefix for cache keys derived from a fingerprint.
const CACHE_KEY_PREFIX: &str = "analysis:";

/// A deterministic, content-derived identity for an analysis request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint the exact content string.
    pub fn of(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        Self(hex_encode(&hasher.finalize()))
    }

    /// Lower-case hex digest.
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Cache key in the `analysis:<hex>` format.
    pub fn cache_key(&self) -> String {
        format!("{CACHE_KEY_PREFIX}{}", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = Fingerprint::of("the earth is round");
        let b = Fingerprint::of("the earth is round");
        assert_eq!(a, b);
    }

    #[test]
    fn test_whitespace_changes_fingerprint() {
        let a = Fingerprint::of("the earth is round");
        let b = Fingerprint::of("the earth is round ");
        assert_ne!(a, b);
    }

    #[test]
    fn test_case_changes_fingerprint() {
        assert_ne!(Fingerprint::of("Claim"), Fingerprint::of("claim"));
    }

    #[test]
    fn test_known_digest() {
        // sha256("") is a fixed vector
        let fp = Fingerprint::of("");
        assert_eq!(
            fp.as_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_cache_key_format() {
        let fp = Fingerprint::of("content");
        let key = fp.cache_key();
        assert!(key.starts_with("analysis:"));
        assert_eq!(key.len(), "analysis:".len() + 64);
    }
}
