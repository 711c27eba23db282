//! # Key-Value Backends
//!
//! The ledger only needs an ordered byte-keyed store with prefix scans and
//! atomic multi-key writes. [`Database`] captures exactly that; two
//! implementations ship:
//!
//! - [`SledDb`]: on-disk, sled's embedded B+ tree. Atomic writes go through
//!   a single sled `Batch`, so either every key lands or none does.
//! - [`MemDb`]: a `BTreeMap` behind a lock. Tests and throwaway chains.
//!
//! Keys are raw bytes. Callers namespace them with prefixes (see
//! `ledger.rs`); lexicographic order is what prefix scans iterate in.

use parking_lot::RwLock;
use sled::{Batch, Db, Tree};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::txs::CodecError;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] CodecError),

    #[error("corrupt record under key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

pub type DbResult<T> = Result<T, DbError>;

/// One write in an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// An ordered key-value store with atomic batches.
pub trait Database: Send + Sync + fmt::Debug {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>>;

    fn has(&self, key: &[u8]) -> DbResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Applies every op or none of them.
    fn write_batch(&self, ops: Vec<BatchOp>) -> DbResult<()>;

    /// All entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Makes previous writes durable.
    fn flush(&self) -> DbResult<()>;

    fn put(&self, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.write_batch(vec![BatchOp::Put(key.to_vec(), value.to_vec())])
    }

    fn delete(&self, key: &[u8]) -> DbResult<()> {
        self.write_batch(vec![BatchOp::Delete(key.to_vec())])
    }
}

// ---------------------------------------------------------------------------
// MemDb
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemDb {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Database for MemDb {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> DbResult<()> {
        let mut entries = self.entries.write();
        for op in ops {
            match op {
                BatchOp::Put(key, value) => {
                    entries.insert(key, value);
                }
                BatchOp::Delete(key) => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn flush(&self) -> DbResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SledDb
// ---------------------------------------------------------------------------

/// sled-backed store. Everything lives in one named tree so a single
/// `Batch` covers all ledger keys.
#[derive(Debug, Clone)]
pub struct SledDb {
    db: Db,
    ledger: Tree,
}

impl SledDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A database that is removed when dropped. For tests.
    pub fn open_temporary() -> DbResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let ledger = db.open_tree("ledger")?;
        Ok(Self { db, ledger })
    }
}

impl Database for SledDb {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        Ok(self.ledger.get(key)?.map(|v| v.to_vec()))
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> DbResult<()> {
        let mut batch = Batch::default();
        for op in ops {
            match op {
                BatchOp::Put(key, value) => batch.insert(key, value),
                BatchOp::Delete(key) => batch.remove(key),
            }
        }
        self.ledger.apply_batch(batch)?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.ledger
            .scan_prefix(prefix)
            .map(|entry| {
                let (k, v) = entry?;
                Ok((k.to_vec(), v.to_vec()))
            })
            .collect()
    }

    fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}
