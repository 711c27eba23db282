//! Closed sets of the values a transaction can carry.
//!
//! Every concrete type an extension understands appears as one variant here,
//! and each variant reports a [`ValueKind`] tag. The registry maps tags to
//! extension indices, so dispatch is a table lookup rather than a type test.

use serde::{Deserialize, Serialize};

use super::keyfx::{self, OutputOwners};
use super::nftfx;
use super::{FxError, ValueKind};

/// An output stored in the UTXO set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Output {
    KeyTransfer(keyfx::TransferOutput),
    KeyMint(keyfx::MintOutput),
    NftTransfer(nftfx::TransferOutput),
    NftMint(nftfx::MintOutput),
}

impl Output {
    pub fn kind(&self) -> ValueKind {
        match self {
            Output::KeyTransfer(_) => ValueKind::KeyTransferOutput,
            Output::KeyMint(_) => ValueKind::KeyMintOutput,
            Output::NftTransfer(_) => ValueKind::NftTransferOutput,
            Output::NftMint(_) => ValueKind::NftMintOutput,
        }
    }

    pub fn verify(&self) -> Result<(), FxError> {
        match self {
            Output::KeyTransfer(out) => out.verify(),
            Output::KeyMint(out) => out.verify(),
            Output::NftTransfer(out) => out.verify(),
            Output::NftMint(out) => out.verify(),
        }
    }

    /// The fungible amount, for outputs that carry one.
    pub fn amount(&self) -> Option<u64> {
        match self {
            Output::KeyTransfer(out) => Some(out.amount),
            _ => None,
        }
    }

    pub fn owners(&self) -> &OutputOwners {
        match self {
            Output::KeyTransfer(out) => &out.owners,
            Output::KeyMint(out) => &out.owners,
            Output::NftTransfer(out) => &out.owners,
            Output::NftMint(out) => &out.owners,
        }
    }
}

/// The spending half of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Input {
    KeyTransfer(keyfx::TransferInput),
}

impl Input {
    pub fn kind(&self) -> ValueKind {
        match self {
            Input::KeyTransfer(_) => ValueKind::KeyTransferInput,
        }
    }

    pub fn verify(&self) -> Result<(), FxError> {
        match self {
            Input::KeyTransfer(input) => input.verify(),
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            Input::KeyTransfer(input) => input.amount,
        }
    }
}

/// Proof that the spender controls what an input or operation consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Credential {
    Key(keyfx::Credential),
    Nft(nftfx::Credential),
}

impl Credential {
    pub fn kind(&self) -> ValueKind {
        match self {
            Credential::Key(_) => ValueKind::KeyCredential,
            Credential::Nft(_) => ValueKind::NftCredential,
        }
    }
}

/// An extension-specific state transition over one or more UTXOs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    KeyMint(keyfx::MintOperation),
    NftMint(nftfx::MintOperation),
    NftTransfer(nftfx::TransferOperation),
}

impl Op {
    pub fn kind(&self) -> ValueKind {
        match self {
            Op::KeyMint(_) => ValueKind::KeyMintOperation,
            Op::NftMint(_) => ValueKind::NftMintOperation,
            Op::NftTransfer(_) => ValueKind::NftTransferOperation,
        }
    }

    pub fn verify(&self) -> Result<(), FxError> {
        match self {
            Op::KeyMint(op) => op.verify(),
            Op::NftMint(op) => op.verify(),
            Op::NftTransfer(op) => op.verify(),
        }
    }

    /// Outputs this operation creates, in output-index order.
    pub fn outs(&self) -> Vec<Output> {
        match self {
            Op::KeyMint(op) => op.outs(),
            Op::NftMint(op) => op.outs(),
            Op::NftTransfer(op) => op.outs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ShortId;

    #[test]
    fn kinds_are_distinct_per_variant() {
        let owners = OutputOwners::single(ShortId::new([1u8; 20]));
        let outs = [
            Output::KeyTransfer(keyfx::TransferOutput {
                amount: 1,
                owners: owners.clone(),
            }),
            Output::KeyMint(keyfx::MintOutput {
                owners: owners.clone(),
            }),
            Output::NftTransfer(nftfx::TransferOutput {
                group_id: 0,
                payload: vec![],
                owners: owners.clone(),
            }),
            Output::NftMint(nftfx::MintOutput {
                group_id: 0,
                owners,
            }),
        ];
        let mut kinds: Vec<_> = outs.iter().map(Output::kind).collect();
        kinds.dedup();
        assert_eq!(kinds.len(), 4);
    }

    #[test]
    fn only_key_transfer_outputs_carry_amounts() {
        let owners = OutputOwners::single(ShortId::new([1u8; 20]));
        let transfer = Output::KeyTransfer(keyfx::TransferOutput {
            amount: 9,
            owners: owners.clone(),
        });
        let mint = Output::KeyMint(keyfx::MintOutput { owners });
        assert_eq!(transfer.amount(), Some(9));
        assert_eq!(mint.amount(), None);
    }
}
