//! # Ledger State
//!
//! Persistent UTXO set, transaction records and lifecycle statuses.
//!
//! ## Design Decisions
//!
//! - **Backend-agnostic**: the ledger talks to a [`Database`] trait object.
//!   sled in production, an in-memory map in tests.
//! - **Staged writes**: every mutation goes into a [`VersionDb`] overlay and
//!   reaches the backend in one atomic batch on commit. Accepting a
//!   transaction (consume inputs, create outputs, flip status) can never be
//!   half-applied.
//! - **UTXOs are never mutated**: created by an accepted transaction,
//!   deleted when an accepted transaction consumes them.

pub mod db;
pub mod ledger;
pub mod status;
pub mod versiondb;

pub use db::{BatchOp, Database, DbError, DbResult, MemDb, SledDb};
pub use ledger::State;
pub use status::Status;
pub use versiondb::VersionDb;
