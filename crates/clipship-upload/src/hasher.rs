//! Content hashing.

use clipship_core::ContentDigest;
use sha2::{Digest, Sha256};

/// Computes the SHA-256 digest of a payload. Pure, deterministic, stateless;
/// the digest feeds both the signature and the receiver's integrity check.
pub struct ContentHasher;

impl ContentHasher {
    pub fn hash(payload: &[u8]) -> ContentDigest {
        ContentDigest(Sha256::digest(payload).into())
    }
}
