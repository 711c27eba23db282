//! Transactions that run extension operations (minting, NFT transfers) on
//! top of an ordinary base transfer.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::base_tx::{BaseTx, SyntaxContext};
use super::error::TxError;
use super::flow::FlowChecker;
use super::parser::Parser;
use crate::crypto::keys::Keypair;
use crate::fxs::{is_sorted_and_unique, Op};
use crate::ids::Id;
use crate::utxo::UtxoId;

/// One extension operation over UTXOs of a single asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub asset_id: Id,
    pub utxo_ids: Vec<UtxoId>,
    pub op: Op,
}

impl Operation {
    fn verify(&self, index: usize) -> Result<(), TxError> {
        if self.utxo_ids.is_empty() {
            return Err(TxError::NoOperationUtxos);
        }
        if !is_sorted_and_unique(&self.utxo_ids) {
            return Err(TxError::OperationUtxosNotSortedUnique);
        }
        self.op
            .verify()
            .map_err(|source| TxError::InvalidOperation { index, source })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationTx {
    pub base: BaseTx,
    pub ops: Vec<Operation>,
}

impl OperationTx {
    pub fn verify_syntax(&self, ctx: &SyntaxContext<'_>, fc: &mut FlowChecker) -> Result<(), TxError> {
        if self.ops.is_empty() {
            return Err(TxError::NoOperations);
        }
        self.base.verify_syntax(ctx, fc)?;
        fc.produce(ctx.fee_asset_id, ctx.tx_fee);

        let mut spent: HashSet<UtxoId> = self.base.ins.iter().map(|i| i.utxo_id).collect();
        for (index, op) in self.ops.iter().enumerate() {
            op.verify(index)?;
            for utxo_id in &op.utxo_ids {
                if !spent.insert(*utxo_id) {
                    return Err(TxError::DoubleSpend(*utxo_id));
                }
            }
        }
        if !is_sorted_operations(&self.ops, ctx.parser)? {
            return Err(TxError::OperationsNotSortedUnique);
        }
        Ok(())
    }
}

fn encode_all(ops: &[Operation], parser: &Parser) -> Result<Vec<Vec<u8>>, TxError> {
    ops.iter()
        .map(|op| parser.encode(op))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TxError::Encoding(e.to_string()))
}

/// Operations are strictly ascending by their encoded bytes.
pub fn is_sorted_operations(ops: &[Operation], parser: &Parser) -> Result<bool, TxError> {
    Ok(is_sorted_and_unique(&encode_all(ops, parser)?))
}

/// Sorts operations into canonical order, keeping each one's signers next
/// to it.
pub fn sort_operations_with_signers(
    ops: &mut Vec<Operation>,
    signers: &mut Vec<Vec<Keypair>>,
    parser: &Parser,
) -> Result<(), TxError> {
    let keys = encode_all(ops, parser)?;
    let mut keyed: Vec<_> = keys
        .into_iter()
        .zip(ops.drain(..).zip(signers.drain(..)))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    for (_, (op, keys)) in keyed {
        ops.push(op);
        signers.push(keys);
    }
    Ok(())
}
