//! # Transactions
//!
//! Wire types, canonical encoding and the syntactic rule set.
//!
//! ## Design Decisions
//!
//! - **Three shapes, one enum**: base transfers, asset creation and
//!   operation transactions share a [`BaseTx`] and differ only in what they
//!   add on top. [`UnsignedTx`] is a closed enum over the three.
//! - **Canonical bytes**: the codec refuses anything that doesn't re-encode
//!   to the same bytes, so a transaction ID is a function of the payload.
//! - **Sorted everything**: inputs by UTXO locator, outputs by asset and
//!   bytes, operations by bytes. Helpers for producing that order live next
//!   to the checks that enforce it.
//! - **Syntax before state**: everything in this module is checked without
//!   touching the ledger, so malformed transactions are dropped before any
//!   read.

pub mod base_tx;
pub mod create_asset_tx;
pub mod error;
pub mod flow;
pub mod operation_tx;
pub mod parser;
pub mod tx;

pub use base_tx::{
    sort_inputs_with_signers, sort_outputs, BaseTx, SyntaxContext, TransferableInput,
    TransferableOutput,
};
pub use create_asset_tx::{CreateAssetTx, InitialState};
pub use error::TxError;
pub use flow::FlowChecker;
pub use operation_tx::{sort_operations_with_signers, Operation, OperationTx};
pub use parser::{CodecError, Parser};
pub use tx::{Tx, UnsignedTx};
