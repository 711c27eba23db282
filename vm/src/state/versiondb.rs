//! A write overlay over a [`Database`].
//!
//! Writes accumulate in memory and reads see them first. `commit` pushes
//! the whole overlay down in one atomic batch; `abort` throws it away.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::db::{BatchOp, Database, DbResult};

#[derive(Debug)]
pub struct VersionDb {
    base: Arc<dyn Database>,
    /// `None` marks a pending delete.
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl VersionDb {
    pub fn new(base: Arc<dyn Database>) -> Self {
        Self {
            base,
            pending: BTreeMap::new(),
        }
    }

    pub fn base(&self) -> &Arc<dyn Database> {
        &self.base
    }

    pub fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        match self.pending.get(key) {
            Some(value) => Ok(value.clone()),
            None => self.base.get(key),
        }
    }

    pub fn has(&self, key: &[u8]) -> DbResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.pending.insert(key, Some(value));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.pending.insert(key, None);
    }

    /// Prefix scan over the merged view, in key order.
    pub fn scan_prefix(&self, prefix: &[u8]) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self.base.scan_prefix(prefix)?.into_iter().collect();
        for (key, value) in self
            .pending
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Writes the overlay atomically and clears it. On failure the overlay
    /// is kept so the caller can retry or abort.
    pub fn commit(&mut self) -> DbResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let ops = self
            .pending
            .iter()
            .map(|(key, value)| match value {
                Some(v) => BatchOp::Put(key.clone(), v.clone()),
                None => BatchOp::Delete(key.clone()),
            })
            .collect();
        self.base.write_batch(ops)?;
        self.pending.clear();
        Ok(())
    }

    pub fn abort(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::db::MemDb;

    #[test]
    fn overlay_shadows_base_until_commit() {
        let base = Arc::new(MemDb::new());
        base.put(b"k", b"old").unwrap();
        let mut vdb = VersionDb::new(base.clone());

        vdb.put(b"k".to_vec(), b"new".to_vec());
        vdb.put(b"j".to_vec(), b"added".to_vec());
        assert_eq!(vdb.get(b"k").unwrap(), Some(b"new".to_vec()));
        assert_eq!(base.get(b"k").unwrap(), Some(b"old".to_vec()));

        vdb.commit().unwrap();
        assert!(!vdb.has_pending());
        assert_eq!(base.get(b"k").unwrap(), Some(b"new".to_vec()));
        assert_eq!(base.get(b"j").unwrap(), Some(b"added".to_vec()));
    }

    #[test]
    fn abort_discards_and_deletes_shadow() {
        let base = Arc::new(MemDb::new());
        base.put(b"p/1", b"x").unwrap();
        base.put(b"p/2", b"y").unwrap();
        let mut vdb = VersionDb::new(base.clone());

        vdb.delete(b"p/1".to_vec());
        vdb.put(b"p/3".to_vec(), b"z".to_vec());
        let keys: Vec<_> = vdb.scan_prefix(b"p/").unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"p/2".to_vec(), b"p/3".to_vec()]);
        assert!(!vdb.has(b"p/1").unwrap());

        vdb.abort();
        assert!(vdb.has(b"p/1").unwrap());
        assert_eq!(base.len(), 2);
    }
}
