//! The canonical in-memory view of one transaction ID.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::ids::Id;
use crate::state::Status;
use crate::txs::{Tx, TxError};
use crate::utxo::UtxoId;

/// Mutable facts the VM learns about a transaction over its lifetime.
#[derive(Debug, Default)]
pub(crate) struct TxCachedState {
    pub tx: Option<Arc<Tx>>,
    pub status: Status,
    /// Memoized syntactic verdict. Syntax can't change, so neither can this.
    pub syntax: Option<Result<(), TxError>>,
    /// Set once the transaction passed full verification and was handed to
    /// the scheduler. Ancestor walks and lookups never touch it.
    pub verified_state: bool,
}

/// One transaction as the engine sees it.
///
/// The deduplicator guarantees at most one live `UniqueTx` per ID, so every
/// holder of an `Arc<UniqueTx>` for the same ID observes the same status
/// and verdicts.
#[derive(Debug)]
pub struct UniqueTx {
    id: Id,
    state: RwLock<TxCachedState>,
}

impl UniqueTx {
    /// A view of a transaction known only by ID. The VM fills the body in
    /// from storage on first use.
    pub fn new(id: Id) -> Self {
        Self {
            id,
            state: RwLock::new(TxCachedState::default()),
        }
    }

    pub fn with_tx(tx: Tx) -> Self {
        let id = tx.id();
        Self {
            id,
            state: RwLock::new(TxCachedState {
                tx: Some(Arc::new(tx)),
                ..TxCachedState::default()
            }),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn tx(&self) -> Option<Arc<Tx>> {
        self.state.read().tx.clone()
    }

    /// Canonical bytes, if the body is loaded.
    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.state.read().tx.as_ref().map(|tx| tx.bytes().to_vec())
    }

    pub fn status(&self) -> Status {
        self.state.read().status
    }

    /// Whether this transaction passed verification and is waiting on
    /// consensus.
    pub fn is_verified(&self) -> bool {
        self.state.read().verified_state
    }

    /// UTXOs consumed, if the body is loaded.
    pub fn input_utxos(&self) -> Vec<UtxoId> {
        self.tx()
            .map(|tx| tx.unsigned.input_utxos())
            .unwrap_or_default()
    }

    /// Locators of the consumed UTXOs. Two transactions conflict iff these
    /// overlap.
    pub fn input_ids(&self) -> Vec<Id> {
        self.input_utxos().iter().map(UtxoId::input_id).collect()
    }

    pub(crate) fn set_status(&self, status: Status) {
        self.state.write().status = status;
    }

    pub(crate) fn set_tx_if_missing(&self, tx: Arc<Tx>) {
        let mut state = self.state.write();
        if state.tx.is_none() {
            state.tx = Some(tx);
        }
    }

    pub(crate) fn syntax(&self) -> Option<Result<(), TxError>> {
        self.state.read().syntax.clone()
    }

    pub(crate) fn set_syntax(&self, verdict: Result<(), TxError>) {
        self.state.write().syntax = Some(verdict);
    }

    pub(crate) fn mark_verified(&self) {
        self.state.write().verified_state = true;
    }
}
