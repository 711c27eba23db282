//! Canonical binary codec for transactions and stored records.
//!
//! bincode with fixed-width integers and a hard size limit. Decoding is
//! strict: trailing bytes are refused, and a value must re-encode to exactly
//! the bytes it came from. That keeps one byte string per transaction, so a
//! transaction ID can't be changed by re-encoding the same payload.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::tx::Tx;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("encoding of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: u64, max: u64 },

    #[error("malformed encoding: {0}")]
    Malformed(String),

    #[error("encoding is not canonical")]
    NonCanonical,
}

/// Encodes and decodes transactions with a bounded size.
#[derive(Debug, Clone, Copy)]
pub struct Parser {
    max_size: u64,
}

impl Parser {
    pub fn new(max_size: u64) -> Self {
        Self { max_size }
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    fn options(&self) -> impl Options + Copy {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_little_endian()
            .reject_trailing_bytes()
            .with_limit(self.max_size)
    }

    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        self.options().serialize(value).map_err(|e| match *e {
            bincode::ErrorKind::SizeLimit => CodecError::TooLarge {
                len: bincode::DefaultOptions::new()
                    .with_fixint_encoding()
                    .serialized_size(value)
                    .unwrap_or(u64::MAX),
                max: self.max_size,
            },
            other => CodecError::Malformed(other.to_string()),
        })
    }

    pub fn decode<T: Serialize + DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        if bytes.len() as u64 > self.max_size {
            return Err(CodecError::TooLarge {
                len: bytes.len() as u64,
                max: self.max_size,
            });
        }
        let value: T = self
            .options()
            .deserialize(bytes)
            .map_err(|e| CodecError::Malformed(e.to_string()))?;
        if self.encode(&value)? != bytes {
            return Err(CodecError::NonCanonical);
        }
        Ok(value)
    }

    /// Decodes a signed transaction and fills in its ID and signing hash.
    pub fn parse_tx(&self, bytes: &[u8]) -> Result<Tx, CodecError> {
        let mut tx: Tx = self.decode(bytes)?;
        tx.initialize(self, bytes.to_vec())?;
        Ok(tx)
    }
}
