// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # UTXO VM: Transaction Core
//!
//! The transaction-processing half of a UTXO asset ledger that plugs into an
//! external consensus engine. Bytes come in, get parsed into one canonical
//! object per transaction, are checked against committed and still-pending
//! outputs, and leave in batches for consensus to order. Accept and reject
//! decisions come back and are applied to the ledger atomically.
//!
//! ## Architecture
//!
//! - **ids / utxo**: 32- and 20-byte identifiers, UTXO references.
//! - **crypto**: Ed25519 keys and signatures, BLAKE3/SHA-256 hashing.
//! - **fxs**: Feature extensions: pluggable verifiers for key-locked
//!   transfers and mints, and for NFTs. Also the keychain coin selection
//!   signs with.
//! - **txs**: Transaction types, the canonical codec, and every check that
//!   needs no chain state.
//! - **state**: Ledger records over an ordered key-value store (sled or in
//!   memory) with atomic multi-key commits.
//! - **vm**: The orchestrator: deduplication, ancestor-aware verification,
//!   capability caching, batching, decisions and coin selection.
//! - **config**: Protocol constants and the runtime JSON config.
//!
//! ## Design Philosophy
//!
//! 1. Deterministic: the same bytes and the same state give the same verdict.
//! 2. One object per transaction ID, no matter how many times it's parsed.
//! 3. Never block on consensus. A full engine channel drops a signal, never
//!    a transaction.

pub mod config;
pub mod crypto;
pub mod fxs;
pub mod ids;
pub mod state;
pub mod txs;
pub mod utxo;
pub mod vm;

pub use ids::{Id, ShortId};
pub use utxo::{Utxo, UtxoId};
pub use vm::{ChainContext, EngineMessage, SharedVm, UniqueTx, Vm, VmError, VmState};
