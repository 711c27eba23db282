//! # Hashing Utilities
//!
//! Two hash functions, each with a fixed job:
//!
//! - **BLAKE3**: transaction IDs, the message extensions sign over, and UTXO
//!   locators. Fast, and not vulnerable to length extension.
//! - **SHA-256**: address derivation from public keys, truncated to 20
//!   bytes. Kept for compatibility with tooling that already derives
//!   addresses this way.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash and return a fixed-size array.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute the BLAKE3 hash of the input data.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hash multiple byte slices together without concatenation overhead.
///
/// Feeding the parts sequentially into one hasher gives the same digest as
/// hashing their concatenation, minus the temporary buffer.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let hash = sha256_array(b"");
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(hash.as_slice(), expected.as_slice());
    }

    #[test]
    fn blake3_deterministic() {
        assert_eq!(blake3_hash(b"utxo"), blake3_hash(b"utxo"));
        assert_ne!(blake3_hash(b"utxo"), blake3_hash(b"UTXO"));
    }

    #[test]
    fn test_blake3_hash_multi() {
        let multi = blake3_hash_multi(&[b"hello", b" world"]);
        assert_eq!(multi, blake3_hash(b"hello world"));
    }
}
