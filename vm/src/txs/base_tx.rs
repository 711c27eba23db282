//! The shared core of every transaction: network binding, transfers in and
//! out, and a memo.

use serde::{Deserialize, Serialize};

use super::error::TxError;
use super::flow::FlowChecker;
use super::parser::Parser;
use crate::config::MAX_MEMO_SIZE;
use crate::crypto::keys::Keypair;
use crate::fxs::{Input, Output};
use crate::ids::Id;
use crate::utxo::UtxoId;

/// Chain-level parameters syntactic verification runs against.
#[derive(Debug, Clone, Copy)]
pub struct SyntaxContext<'a> {
    pub parser: &'a Parser,
    pub network_id: u32,
    pub chain_id: Id,
    pub fee_asset_id: Id,
    pub tx_fee: u64,
    pub create_asset_tx_fee: u64,
    pub num_fxs: usize,
}

/// An output tagged with the asset it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferableOutput {
    pub asset_id: Id,
    pub out: Output,
}

/// An input tagged with the UTXO it consumes and that UTXO's asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferableInput {
    pub utxo_id: UtxoId,
    pub asset_id: Id,
    pub input: Input,
}

impl TransferableInput {
    /// Locator of the consumed UTXO; the canonical input sort key.
    pub fn input_id(&self) -> Id {
        self.utxo_id.input_id()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseTx {
    pub network_id: u32,
    pub chain_id: Id,
    pub outs: Vec<TransferableOutput>,
    pub ins: Vec<TransferableInput>,
    pub memo: Vec<u8>,
}

impl BaseTx {
    /// Checks everything about the base that needs no chain state, and
    /// tallies its value flow into `fc`. The caller finishes the flow check
    /// once every part of the transaction has been tallied.
    pub fn verify_syntax(&self, ctx: &SyntaxContext<'_>, fc: &mut FlowChecker) -> Result<(), TxError> {
        if self.network_id != ctx.network_id {
            return Err(TxError::WrongNetworkId {
                expected: ctx.network_id,
                got: self.network_id,
            });
        }
        if self.chain_id != ctx.chain_id {
            return Err(TxError::WrongChainId {
                expected: ctx.chain_id,
                got: self.chain_id,
            });
        }
        if self.memo.len() > MAX_MEMO_SIZE {
            return Err(TxError::MemoTooLarge {
                len: self.memo.len(),
                max: MAX_MEMO_SIZE,
            });
        }

        for (index, out) in self.outs.iter().enumerate() {
            out.out
                .verify()
                .map_err(|source| TxError::InvalidOutput { index, source })?;
            if let Some(amount) = out.out.amount() {
                fc.produce(out.asset_id, amount);
            }
        }
        if !is_sorted_outputs(&self.outs, ctx.parser)? {
            return Err(TxError::OutputsNotSorted);
        }

        for (index, input) in self.ins.iter().enumerate() {
            input
                .input
                .verify()
                .map_err(|source| TxError::InvalidInput { index, source })?;
            fc.consume(input.asset_id, input.input.amount());
        }
        if !self.ins.windows(2).all(|w| w[0].input_id() < w[1].input_id()) {
            return Err(TxError::InputsNotSortedUnique);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Canonical ordering
// ---------------------------------------------------------------------------

fn output_sort_key(out: &TransferableOutput, parser: &Parser) -> Result<(Id, Vec<u8>), TxError> {
    let bytes = parser
        .encode(&out.out)
        .map_err(|e| TxError::Encoding(e.to_string()))?;
    Ok((out.asset_id, bytes))
}

/// Outputs are ordered by asset, then by their encoded bytes. Duplicates are
/// allowed.
pub fn is_sorted_outputs(outs: &[TransferableOutput], parser: &Parser) -> Result<bool, TxError> {
    let keys = outs
        .iter()
        .map(|out| output_sort_key(out, parser))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(keys.windows(2).all(|w| w[0] <= w[1]))
}

pub fn sort_outputs(outs: &mut Vec<TransferableOutput>, parser: &Parser) -> Result<(), TxError> {
    let mut keyed = outs
        .drain(..)
        .map(|out| output_sort_key(&out, parser).map(|key| (key, out)))
        .collect::<Result<Vec<_>, _>>()?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    outs.extend(keyed.into_iter().map(|(_, out)| out));
    Ok(())
}

/// Sorts inputs by locator, keeping each input's signers next to it.
pub fn sort_inputs_with_signers(ins: &mut Vec<TransferableInput>, signers: &mut Vec<Vec<Keypair>>) {
    let mut paired: Vec<_> = ins.drain(..).zip(signers.drain(..)).collect();
    paired.sort_by_key(|(input, _)| input.input_id());
    for (input, keys) in paired {
        ins.push(input);
        signers.push(keys);
    }
}
