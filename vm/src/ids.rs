//! Fixed-width identifiers used across the ledger.
//!
//! - [`Id`]: 32 bytes. Transaction IDs, asset IDs (an asset is named after
//!   the transaction that created it), chain IDs and UTXO locators.
//! - [`ShortId`]: 20 bytes. Addresses, derived from a public key.
//!
//! Both render as lowercase hex and order lexicographically by their bytes,
//! which is what the canonical sort orders in `txs` rely on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::crypto::hash::blake3_hash_multi;

/// Errors from parsing identifiers out of untrusted strings or slices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("invalid identifier length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("invalid hex identifier: {0}")]
    InvalidHex(String),
}

// ---------------------------------------------------------------------------
// Id
// ---------------------------------------------------------------------------

/// A 32-byte identifier.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id([u8; 32]);

impl Id {
    /// The all-zero identifier.
    pub const EMPTY: Id = Id([0u8; 32]);

    pub const LEN: usize = 32;

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, IdError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| IdError::InvalidLength {
            expected: Self::LEN,
            got: slice.len(),
        })?;
        Ok(Self(bytes))
    }

    /// Derives a new identifier by hashing this one together with `index`.
    ///
    /// Used to turn `(tx_id, output_index)` into a single UTXO locator.
    pub fn prefix(&self, index: u32) -> Id {
        Id(blake3_hash_multi(&[&self.0, &index.to_be_bytes()]))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl FromStr for Id {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| IdError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", &self.to_hex()[..16])
    }
}

impl From<[u8; 32]> for Id {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

// ---------------------------------------------------------------------------
// ShortId
// ---------------------------------------------------------------------------

/// A 20-byte identifier. Used for addresses.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShortId([u8; 20]);

impl ShortId {
    pub const LEN: usize = 20;

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, IdError> {
        let bytes: [u8; 20] = slice.try_into().map_err(|_| IdError::InvalidLength {
            expected: Self::LEN,
            got: slice.len(),
        })?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for ShortId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| IdError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortId({})", self.to_hex())
    }
}
