//! UTXO references and records.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fxs::values::Output;
use crate::ids::Id;

/// Points at output `output_index` of transaction `tx_id`.
///
/// Transactions order their inputs by [`UtxoId::input_id`], not by the
/// derived ordering. The derived ordering is only used for map keys and for
/// the UTXO lists inside an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtxoId {
    pub tx_id: Id,
    pub output_index: u32,
}

impl UtxoId {
    pub fn new(tx_id: Id, output_index: u32) -> Self {
        Self {
            tx_id,
            output_index,
        }
    }

    /// The 32-byte locator this UTXO is stored under.
    pub fn input_id(&self) -> Id {
        self.tx_id.prefix(self.output_index)
    }
}

impl fmt::Display for UtxoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_id, self.output_index)
    }
}

/// An unspent output together with the asset it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub utxo_id: UtxoId,
    pub asset_id: Id,
    pub out: Output,
}

impl Utxo {
    pub fn input_id(&self) -> Id {
        self.utxo_id.input_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_id_distinguishes_indices() {
        let tx_id = Id::new([9u8; 32]);
        assert_ne!(
            UtxoId::new(tx_id, 0).input_id(),
            UtxoId::new(tx_id, 1).input_id()
        );
        assert_eq!(UtxoId::new(tx_id, 3).input_id(), tx_id.prefix(3));
    }

    #[test]
    fn ordering_is_tx_then_index() {
        let a = UtxoId::new(Id::new([1u8; 32]), 5);
        let b = UtxoId::new(Id::new([1u8; 32]), 6);
        let c = UtxoId::new(Id::new([2u8; 32]), 0);
        assert!(a < b && b < c);
    }
}
