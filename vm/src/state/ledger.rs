//! Typed ledger records over the versioned store.
//!
//! ## Key Layout
//!
//! | Prefix       | Key suffix                     | Value                 |
//! |--------------|--------------------------------|-----------------------|
//! | `utxo/`      | UTXO locator (32B)             | `bincode(Utxo)`       |
//! | `tx/`        | tx ID (32B)                    | canonical tx bytes    |
//! | `status/`    | tx ID (32B)                    | status byte           |
//! | `addr/`      | address (20B) ++ locator (32B) | empty                 |
//! | `meta/`      | well-known name                | value                 |
//!
//! The address index is maintained alongside the UTXO records: putting a
//! UTXO indexes it under every owner address, deleting it drops those
//! entries again.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::db::{Database, DbError, DbResult};
use super::status::Status;
use super::versiondb::VersionDb;
use crate::ids::{Id, ShortId};
use crate::txs::{Parser, Tx};
use crate::utxo::{Utxo, UtxoId};

const UTXO_PREFIX: &[u8] = b"utxo/";
const TX_PREFIX: &[u8] = b"tx/";
const STATUS_PREFIX: &[u8] = b"status/";
const ADDR_PREFIX: &[u8] = b"addr/";
const META_INITIALIZED: &[u8] = b"meta/initialized";

fn key(prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut k = Vec::with_capacity(prefix.len() + suffix.len());
    k.extend_from_slice(prefix);
    k.extend_from_slice(suffix);
    k
}

fn addr_key(addr: &ShortId, locator: &Id) -> Vec<u8> {
    let mut k = key(ADDR_PREFIX, addr.as_bytes());
    k.extend_from_slice(locator.as_bytes());
    k
}

/// UTXOs, transactions, statuses and the address index.
///
/// Writes are staged until [`State::commit`].
#[derive(Debug)]
pub struct State {
    db: VersionDb,
    parser: Parser,
}

impl State {
    pub fn new(base: Arc<dyn Database>, parser: Parser) -> Self {
        Self {
            db: VersionDb::new(base),
            parser,
        }
    }

    // -- UTXOs --------------------------------------------------------------

    pub fn get_utxo(&self, utxo_id: &UtxoId) -> DbResult<Option<Utxo>> {
        self.get_utxo_by_locator(&utxo_id.input_id())
    }

    fn get_utxo_by_locator(&self, locator: &Id) -> DbResult<Option<Utxo>> {
        match self.db.get(&key(UTXO_PREFIX, locator.as_bytes()))? {
            Some(bytes) => Ok(Some(self.parser.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_utxo(&mut self, utxo: &Utxo) -> DbResult<()> {
        let locator = utxo.input_id();
        let bytes = self.parser.encode(utxo)?;
        self.db.put(key(UTXO_PREFIX, locator.as_bytes()), bytes);
        for addr in &utxo.out.owners().addrs {
            self.db.put(addr_key(addr, &locator), Vec::new());
        }
        Ok(())
    }

    /// Removes a UTXO and its index entries. Missing UTXOs are ignored.
    pub fn delete_utxo(&mut self, utxo_id: &UtxoId) -> DbResult<()> {
        let locator = utxo_id.input_id();
        if let Some(utxo) = self.get_utxo_by_locator(&locator)? {
            for addr in &utxo.out.owners().addrs {
                self.db.delete(addr_key(addr, &locator));
            }
        }
        self.db.delete(key(UTXO_PREFIX, locator.as_bytes()));
        Ok(())
    }

    /// Every UTXO owned (at least partly) by one of `addrs`, each once, in
    /// locator order.
    pub fn utxos_for_addresses(&self, addrs: &[ShortId]) -> DbResult<Vec<Utxo>> {
        let mut found: BTreeMap<Id, Utxo> = BTreeMap::new();
        for addr in addrs {
            let prefix = key(ADDR_PREFIX, addr.as_bytes());
            for (k, _) in self.db.scan_prefix(&prefix)? {
                let locator = Id::from_slice(&k[prefix.len()..]).map_err(|e| DbError::Corrupt {
                    key: hex::encode(&k),
                    reason: e.to_string(),
                })?;
                if found.contains_key(&locator) {
                    continue;
                }
                if let Some(utxo) = self.get_utxo_by_locator(&locator)? {
                    found.insert(locator, utxo);
                }
            }
        }
        Ok(found.into_values().collect())
    }

    // -- Transactions -------------------------------------------------------

    pub fn get_tx(&self, tx_id: &Id) -> DbResult<Option<Tx>> {
        match self.db.get(&key(TX_PREFIX, tx_id.as_bytes()))? {
            Some(bytes) => Ok(Some(self.parser.parse_tx(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_tx(&mut self, tx: &Tx) {
        self.db
            .put(key(TX_PREFIX, tx.id().as_bytes()), tx.bytes().to_vec());
    }

    pub fn status(&self, tx_id: &Id) -> DbResult<Status> {
        match self.db.get(&key(STATUS_PREFIX, tx_id.as_bytes()))? {
            Some(bytes) => match bytes.as_slice() {
                [byte] => Status::from_byte(*byte).ok_or_else(|| DbError::Corrupt {
                    key: format!("status/{}", tx_id),
                    reason: format!("unknown status byte {}", byte),
                }),
                _ => Err(DbError::Corrupt {
                    key: format!("status/{}", tx_id),
                    reason: format!("expected 1 byte, got {}", bytes.len()),
                }),
            },
            None => Ok(Status::Unknown),
        }
    }

    pub fn set_status(&mut self, tx_id: &Id, status: Status) {
        self.db
            .put(key(STATUS_PREFIX, tx_id.as_bytes()), vec![status.to_byte()]);
    }

    // -- Metadata -----------------------------------------------------------

    pub fn is_initialized(&self) -> DbResult<bool> {
        self.db.has(META_INITIALIZED)
    }

    pub fn set_initialized(&mut self) {
        self.db.put(META_INITIALIZED.to_vec(), vec![1]);
    }

    // -- Versioning ---------------------------------------------------------

    pub fn commit(&mut self) -> DbResult<()> {
        self.db.commit()
    }

    pub fn abort(&mut self) {
        self.db.abort()
    }

    /// Flushes the backing store to disk.
    pub fn flush(&self) -> DbResult<()> {
        self.db.base().flush()
    }
}
