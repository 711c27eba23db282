use thiserror::Error;

use crate::config::ConfigError;
use crate::fxs::{FxError, RegistryError, ValueKind};
use crate::ids::Id;
use crate::state::{DbError, Status};
use crate::txs::{CodecError, TxError};
use crate::utxo::UtxoId;

/// Everything the VM can refuse a transaction (or a request) for.
///
/// Extension, syntax and storage errors pass through unchanged so callers
/// can match on the underlying cause.
#[derive(Debug, Error)]
pub enum VmError {
    // -- malformed ---------------------------------------------------------
    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Syntax(#[from] TxError),

    // -- resolution --------------------------------------------------------
    /// The consumed UTXO is neither committed nor producible by a live
    /// ancestor.
    #[error("missing utxo {0}")]
    MissingUtxo(UtxoId),

    /// The ancestor exists but has no output at that index.
    #[error("invalid utxo {0}: output index out of range")]
    InvalidUtxo(UtxoId),

    // -- capability --------------------------------------------------------
    #[error("no registered extension handles {0:?}")]
    UnknownFx(ValueKind),

    #[error("asset {asset} does not support extension {fx_index}")]
    IncompatibleFx { asset: Id, fx_index: usize },

    #[error("asset id mismatch: expected {expected}, got {got}")]
    AssetIdMismatch { expected: Id, got: Id },

    // -- extension ---------------------------------------------------------
    #[error(transparent)]
    Fx(#[from] FxError),

    // -- lookup ------------------------------------------------------------
    #[error("transaction {0} is unknown")]
    UnknownTx(Id),

    #[error("transaction {0} was rejected")]
    RejectedTx(Id),

    #[error("asset '{0}' not found")]
    UnknownAsset(String),

    /// Accept or reject on a transaction that isn't awaiting a decision.
    #[error("transaction {id} is {status:?}, not processing")]
    NotProcessing { id: Id, status: Status },

    // -- coin selection ----------------------------------------------------
    #[error("want to spend {wanted} of asset {asset} but only have {have}")]
    InsufficientFunds { asset: Id, wanted: u64, have: u64 },

    #[error("provided addresses can't mint the requested assets")]
    CantMintAsset,

    #[error("spend overflowed")]
    SpendOverflow,

    // -- lifecycle ---------------------------------------------------------
    #[error("chain is bootstrapping")]
    Bootstrapping,

    #[error("genesis asset '{0}' must have a non-empty state")]
    GenesisAssetMustHaveState(String),

    #[error("invalid genesis: {0}")]
    Genesis(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("failed to start batch timer: {0}")]
    Timer(#[from] std::io::Error),
}
