//! # Cryptographic Primitives
//!
//! Thin, typed wrappers around audited implementations. Nothing here is
//! novel: Ed25519 via `ed25519-dalek`, SHA-256 via `sha2`, BLAKE3 via
//! `blake3`.

pub mod hash;
pub mod keys;

pub use hash::{blake3_hash, sha256_array};
pub use keys::{address_of, KeyError, Keypair, PublicKey, Signature};
