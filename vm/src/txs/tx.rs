//! Signed transactions.
//!
//! A [`Tx`] is an [`UnsignedTx`] plus one credential per input and per
//! operation, in that order. Its ID is the BLAKE3 hash of its canonical
//! bytes; credentials sign the BLAKE3 hash of the unsigned bytes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::base_tx::{BaseTx, SyntaxContext};
use super::create_asset_tx::CreateAssetTx;
use super::error::TxError;
use super::flow::FlowChecker;
use super::operation_tx::OperationTx;
use super::parser::{CodecError, Parser};
use crate::crypto::hash::blake3_hash;
use crate::crypto::keys::Keypair;
use crate::fxs::keyfx::{self, SignerProof};
use crate::fxs::{nftfx, Credential, Op, Output};
use crate::ids::Id;
use crate::utxo::{Utxo, UtxoId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnsignedTx {
    Base(BaseTx),
    CreateAsset(CreateAssetTx),
    Operation(OperationTx),
}

impl UnsignedTx {
    pub fn base(&self) -> &BaseTx {
        match self {
            UnsignedTx::Base(tx) => tx,
            UnsignedTx::CreateAsset(tx) => &tx.base,
            UnsignedTx::Operation(tx) => &tx.base,
        }
    }

    pub fn num_credentials(&self) -> usize {
        let ops = match self {
            UnsignedTx::Operation(tx) => tx.ops.len(),
            _ => 0,
        };
        self.base().ins.len() + ops
    }

    /// Every UTXO this transaction consumes: inputs first, then operation
    /// UTXOs in operation order.
    pub fn input_utxos(&self) -> Vec<UtxoId> {
        let mut utxos: Vec<UtxoId> = self.base().ins.iter().map(|i| i.utxo_id).collect();
        if let UnsignedTx::Operation(tx) = self {
            for op in &tx.ops {
                utxos.extend(op.utxo_ids.iter().copied());
            }
        }
        utxos
    }

    /// Assets whose UTXOs this transaction consumes.
    pub fn consumed_asset_ids(&self) -> BTreeSet<Id> {
        let mut assets: BTreeSet<Id> = self.base().ins.iter().map(|i| i.asset_id).collect();
        if let UnsignedTx::Operation(tx) = self {
            assets.extend(tx.ops.iter().map(|op| op.asset_id));
        }
        assets
    }

    /// Every asset this transaction mentions.
    pub fn asset_ids(&self) -> BTreeSet<Id> {
        let mut assets = self.consumed_asset_ids();
        assets.extend(self.base().outs.iter().map(|o| o.asset_id));
        assets
    }

    /// The UTXOs this transaction creates once accepted, given its ID.
    ///
    /// Output indices run over base outputs, then initial-state outputs
    /// (owned by the new asset, which takes `tx_id` as its ID), then the
    /// outputs of each operation.
    pub fn utxos(&self, tx_id: Id) -> Vec<Utxo> {
        let mut utxos = Vec::new();
        let mut push = |asset_id: Id, out: Output| {
            let output_index = utxos.len() as u32;
            utxos.push(Utxo {
                utxo_id: UtxoId::new(tx_id, output_index),
                asset_id,
                out,
            });
        };
        for out in &self.base().outs {
            push(out.asset_id, out.out.clone());
        }
        match self {
            UnsignedTx::Base(_) => {}
            UnsignedTx::CreateAsset(tx) => {
                for state in &tx.states {
                    for out in &state.outs {
                        push(tx_id, out.clone());
                    }
                }
            }
            UnsignedTx::Operation(tx) => {
                for op in &tx.ops {
                    for out in op.op.outs() {
                        push(op.asset_id, out);
                    }
                }
            }
        }
        utxos
    }

    /// Checks every rule that needs no chain state, including the value flow.
    pub fn verify_syntax(&self, ctx: &SyntaxContext<'_>, num_creds: usize) -> Result<(), TxError> {
        let mut fc = FlowChecker::new();
        match self {
            UnsignedTx::Base(tx) => {
                tx.verify_syntax(ctx, &mut fc)?;
                fc.produce(ctx.fee_asset_id, ctx.tx_fee);
            }
            UnsignedTx::CreateAsset(tx) => tx.verify_syntax(ctx, &mut fc)?,
            UnsignedTx::Operation(tx) => tx.verify_syntax(ctx, &mut fc)?,
        }
        fc.verify()?;

        let expected = self.num_credentials();
        if num_creds != expected {
            return Err(TxError::WrongNumberOfCredentials {
                expected,
                got: num_creds,
            });
        }
        Ok(())
    }
}

/// Derived once after decoding or signing. Never serialized.
#[derive(Debug, Clone, Default)]
struct TxMeta {
    bytes: Vec<u8>,
    id: Id,
    signing_hash: [u8; 32],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tx {
    pub unsigned: UnsignedTx,
    pub creds: Vec<Credential>,
    #[serde(skip)]
    meta: TxMeta,
}

impl Tx {
    /// Signs `unsigned` with one signer set per credential slot.
    ///
    /// Inputs and key mint operations get key credentials; NFT operations
    /// get NFT credentials. `signers` must line up with the inputs followed
    /// by the operations; a short list yields a transaction that fails the
    /// credential-count check.
    pub fn sign(parser: &Parser, unsigned: UnsignedTx, signers: &[Vec<Keypair>]) -> Result<Tx, CodecError> {
        let unsigned_bytes = parser.encode(&unsigned)?;
        let hash = blake3_hash(&unsigned_bytes);

        let mut slots: Vec<bool> = vec![false; unsigned.base().ins.len()];
        if let UnsignedTx::Operation(tx) = &unsigned {
            slots.extend(
                tx.ops
                    .iter()
                    .map(|op| matches!(op.op, Op::NftMint(_) | Op::NftTransfer(_))),
            );
        }

        let creds = slots
            .iter()
            .zip(signers)
            .map(|(&is_nft, keys)| {
                let cred = keyfx::Credential {
                    sigs: keys
                        .iter()
                        .map(|key| SignerProof {
                            public_key: key.public_key(),
                            signature: key.sign(&hash),
                        })
                        .collect(),
                };
                if is_nft {
                    Credential::Nft(nftfx::Credential(cred))
                } else {
                    Credential::Key(cred)
                }
            })
            .collect();

        let mut tx = Tx {
            unsigned,
            creds,
            meta: TxMeta::default(),
        };
        let bytes = parser.encode(&tx)?;
        tx.initialize(parser, bytes)?;
        Ok(tx)
    }

    /// Records the canonical bytes and derives the ID and signing hash.
    pub(crate) fn initialize(&mut self, parser: &Parser, bytes: Vec<u8>) -> Result<(), CodecError> {
        let unsigned_bytes = parser.encode(&self.unsigned)?;
        self.meta = TxMeta {
            id: Id::new(blake3_hash(&bytes)),
            signing_hash: blake3_hash(&unsigned_bytes),
            bytes,
        };
        Ok(())
    }

    pub fn id(&self) -> Id {
        self.meta.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.meta.bytes
    }

    /// The message every credential signs.
    pub fn signing_hash(&self) -> [u8; 32] {
        self.meta.signing_hash
    }

    pub fn utxos(&self) -> Vec<Utxo> {
        self.unsigned.utxos(self.id())
    }

    pub fn verify_syntax(&self, ctx: &SyntaxContext<'_>) -> Result<(), TxError> {
        self.unsigned.verify_syntax(ctx, self.creds.len())
    }
}

impl PartialEq for Tx {
    fn eq(&self, other: &Self) -> bool {
        self.unsigned == other.unsigned && self.creds == other.creds
    }
}

impl Eq for Tx {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fxs::keyfx::{OutputOwners, TransferInput, TransferOutput};
    use crate::fxs::Input;
    use crate::txs::base_tx::{TransferableInput, TransferableOutput};

    fn sample(kp: &Keypair) -> UnsignedTx {
        let asset = Id::new([1u8; 32]);
        UnsignedTx::Base(BaseTx {
            network_id: 1,
            chain_id: Id::EMPTY,
            outs: vec![TransferableOutput {
                asset_id: asset,
                out: Output::KeyTransfer(TransferOutput {
                    amount: 5,
                    owners: OutputOwners::single(kp.address()),
                }),
            }],
            ins: vec![TransferableInput {
                utxo_id: UtxoId::new(Id::new([2u8; 32]), 0),
                asset_id: asset,
                input: Input::KeyTransfer(TransferInput {
                    amount: 5,
                    input: keyfx::Input {
                        sig_indices: vec![0],
                    },
                }),
            }],
            memo: b"hi".to_vec(),
        })
    }

    #[test]
    fn parse_restores_id_and_hash() {
        let parser = Parser::new(64 * 1024);
        let kp = Keypair::generate();
        let tx = Tx::sign(&parser, sample(&kp), &[vec![kp.clone()]]).unwrap();
        let parsed = parser.parse_tx(tx.bytes()).unwrap();

        assert_eq!(parsed, tx);
        assert_eq!(parsed.id(), tx.id());
        assert_eq!(parsed.signing_hash(), tx.signing_hash());
        assert_eq!(parsed.id(), Id::new(blake3_hash(tx.bytes())));
    }

    #[test]
    fn credentials_sign_unsigned_hash() {
        let parser = Parser::new(64 * 1024);
        let kp = Keypair::generate();
        let tx = Tx::sign(&parser, sample(&kp), &[vec![kp.clone()]]).unwrap();
        let Credential::Key(cred) = &tx.creds[0] else {
            panic!("expected key credential");
        };
        assert!(cred.sigs[0]
            .public_key
            .verify(&tx.signing_hash(), &cred.sigs[0].signature));
    }

    #[test]
    fn utxo_indices_follow_outputs() {
        let parser = Parser::new(64 * 1024);
        let kp = Keypair::generate();
        let tx = Tx::sign(&parser, sample(&kp), &[vec![kp]]).unwrap();
        let utxos = tx.utxos();
        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos[0].utxo_id, UtxoId::new(tx.id(), 0));
    }

    #[test]
    fn credential_count_checked() {
        let parser = Parser::new(64 * 1024);
        let kp = Keypair::generate();
        let tx = Tx::sign(&parser, sample(&kp), &[]).unwrap();
        let ctx = SyntaxContext {
            parser: &parser,
            network_id: 1,
            chain_id: Id::EMPTY,
            fee_asset_id: Id::new([1u8; 32]),
            tx_fee: 0,
            create_asset_tx_fee: 0,
            num_fxs: 2,
        };
        assert_eq!(
            tx.verify_syntax(&ctx),
            Err(TxError::WrongNumberOfCredentials {
                expected: 1,
                got: 0
            })
        );
    }
}
