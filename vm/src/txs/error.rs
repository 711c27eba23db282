//! Syntactic transaction errors.
//!
//! Everything here is decidable from the transaction alone, without reading
//! chain state. A transaction failing one of these checks can never become
//! valid, so the verdict is cached on the transaction.

use thiserror::Error;

use crate::fxs::FxError;
use crate::ids::Id;
use crate::utxo::UtxoId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("wrong network id: expected {expected}, got {got}")]
    WrongNetworkId { expected: u32, got: u32 },

    #[error("wrong chain id: expected {expected}, got {got}")]
    WrongChainId { expected: Id, got: Id },

    #[error("memo of {len} bytes exceeds {max}")]
    MemoTooLarge { len: usize, max: usize },

    /// Outputs must be ordered by asset, then by encoded bytes.
    #[error("outputs are not sorted")]
    OutputsNotSorted,

    /// Inputs must be strictly ascending by UTXO locator.
    #[error("inputs are not sorted and unique")]
    InputsNotSortedUnique,

    #[error("output {index} is invalid: {source}")]
    InvalidOutput {
        index: usize,
        #[source]
        source: FxError,
    },

    #[error("input {index} is invalid: {source}")]
    InvalidInput {
        index: usize,
        #[source]
        source: FxError,
    },

    #[error("operation {index} is invalid: {source}")]
    InvalidOperation {
        index: usize,
        #[source]
        source: FxError,
    },

    /// Consumed amounts don't cover produced amounts plus the fee.
    #[error("asset {asset} consumes {consumed} but produces {produced}")]
    InsufficientInput {
        asset: Id,
        consumed: u64,
        produced: u64,
    },

    #[error("amount overflow")]
    Overflow,

    #[error("expected {expected} credentials, got {got}")]
    WrongNumberOfCredentials { expected: usize, got: usize },

    // -- create asset --------------------------------------------------------
    #[error("asset name of {len} bytes is outside {min}..={max}")]
    NameLength { len: usize, min: usize, max: usize },

    #[error("asset symbol of {len} bytes exceeds {max}")]
    SymbolTooLong { len: usize, max: usize },

    #[error("asset denomination {denomination} exceeds {max}")]
    DenominationTooLarge { denomination: u8, max: u8 },

    #[error("asset name has leading or trailing whitespace")]
    UnexpectedWhitespace,

    #[error("asset name contains an illegal character")]
    IllegalNameCharacter,

    #[error("asset symbol must be uppercase ASCII letters")]
    IllegalSymbolCharacter,

    #[error("asset declares no initial states")]
    NoStates,

    #[error("initial states are not sorted and unique by fx index")]
    StatesNotSortedUnique,

    #[error("initial state references fx {index}, but only {num_fxs} are registered")]
    UnknownFxIndex { index: u32, num_fxs: usize },

    #[error("initial state outputs are not sorted")]
    StateOutputsNotSorted,

    // -- operations ----------------------------------------------------------
    #[error("operation transaction has no operations")]
    NoOperations,

    #[error("operation consumes no utxos")]
    NoOperationUtxos,

    #[error("operation utxos are not sorted and unique")]
    OperationUtxosNotSortedUnique,

    #[error("operations are not sorted and unique")]
    OperationsNotSortedUnique,

    #[error("utxo {0} is consumed more than once")]
    DoubleSpend(UtxoId),

    #[error("encoding failed: {0}")]
    Encoding(String),
}
