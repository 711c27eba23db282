//! # NFT Feature Extension
//!
//! Non-fungible tokens grouped under an asset. A `MintOutput` grants the
//! right to mint tokens in one group; each minted `TransferOutput` carries an
//! opaque payload that travels unchanged with the token.
//!
//! NFTs move only through operations. A transfer input naming an NFT output
//! is rejected.
//!
//! Ownership and signatures reuse the key extension's rules.

use serde::{Deserialize, Serialize};

use super::keyfx::{self, verify_credentials, OutputOwners};
use super::values::{Credential as AnyCredential, Input as AnyInput, Op, Output};
use super::{Fx, FxContext, FxError, ValueKind};
use crate::config::MAX_NFT_PAYLOAD_SIZE;

const KINDS: &[ValueKind] = &[
    ValueKind::NftTransferOutput,
    ValueKind::NftMintOutput,
    ValueKind::NftCredential,
    ValueKind::NftMintOperation,
    ValueKind::NftTransferOperation,
];

fn verify_payload(payload: &[u8]) -> Result<(), FxError> {
    if payload.len() > MAX_NFT_PAYLOAD_SIZE {
        return Err(FxError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_NFT_PAYLOAD_SIZE,
        });
    }
    Ok(())
}

/// The right to mint tokens in `group_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintOutput {
    pub group_id: u32,
    pub owners: OutputOwners,
}

impl MintOutput {
    pub fn verify(&self) -> Result<(), FxError> {
        self.owners.verify()
    }
}

/// One token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutput {
    pub group_id: u32,
    pub payload: Vec<u8>,
    pub owners: OutputOwners,
}

impl TransferOutput {
    pub fn verify(&self) -> Result<(), FxError> {
        verify_payload(&self.payload)?;
        self.owners.verify()
    }
}

/// Signatures for an NFT operation. Same shape as the key credential, its
/// own kind so the registry routes it here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential(pub keyfx::Credential);

/// Mints one token per entry of `outputs`, all carrying `payload`.
///
/// The consumed mint output is not re-created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintOperation {
    pub mint_input: keyfx::Input,
    pub group_id: u32,
    pub payload: Vec<u8>,
    pub outputs: Vec<OutputOwners>,
}

impl MintOperation {
    pub fn verify(&self) -> Result<(), FxError> {
        self.mint_input.verify()?;
        verify_payload(&self.payload)?;
        if self.outputs.is_empty() {
            return Err(FxError::NoOutputs);
        }
        self.outputs.iter().try_for_each(OutputOwners::verify)
    }

    pub fn outs(&self) -> Vec<Output> {
        self.outputs
            .iter()
            .map(|owners| {
                Output::NftTransfer(TransferOutput {
                    group_id: self.group_id,
                    payload: self.payload.clone(),
                    owners: owners.clone(),
                })
            })
            .collect()
    }
}

/// Hands a token to new owners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOperation {
    pub input: keyfx::Input,
    pub output: TransferOutput,
}

impl TransferOperation {
    pub fn verify(&self) -> Result<(), FxError> {
        self.input.verify()?;
        self.output.verify()
    }

    pub fn outs(&self) -> Vec<Output> {
        vec![Output::NftTransfer(self.output.clone())]
    }
}

/// Verifier for NFT mint and transfer operations.
#[derive(Debug, Default)]
pub struct NftFx {
    bootstrapped: bool,
}

impl NftFx {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Fx for NftFx {
    fn name(&self) -> &'static str {
        "nftfx"
    }

    fn kinds(&self) -> &'static [ValueKind] {
        KINDS
    }

    fn bootstrapping(&mut self) -> Result<(), FxError> {
        self.bootstrapped = false;
        Ok(())
    }

    fn bootstrapped(&mut self) -> Result<(), FxError> {
        self.bootstrapped = true;
        Ok(())
    }

    fn verify_transfer(
        &self,
        _ctx: &FxContext,
        _input: &AnyInput,
        _cred: &AnyCredential,
        _utxo: &Output,
    ) -> Result<(), FxError> {
        Err(FxError::CantTransfer)
    }

    fn verify_operation(
        &self,
        ctx: &FxContext,
        op: &Op,
        cred: &AnyCredential,
        utxos: &[&Output],
    ) -> Result<(), FxError> {
        let AnyCredential::Nft(Credential(cred)) = cred else {
            return Err(FxError::WrongCredentialType);
        };
        if utxos.len() != 1 {
            return Err(FxError::WrongNumberOfUtxos {
                expected: 1,
                got: utxos.len(),
            });
        }
        match op {
            Op::NftMint(op) => {
                let Output::NftMint(out) = utxos[0] else {
                    return Err(FxError::WrongUtxoType);
                };
                op.verify()?;
                if op.group_id != out.group_id {
                    return Err(FxError::WrongGroupId {
                        expected: out.group_id,
                        got: op.group_id,
                    });
                }
                verify_credentials(ctx, self.bootstrapped, &op.mint_input, cred, &out.owners)
            }
            Op::NftTransfer(op) => {
                let Output::NftTransfer(out) = utxos[0] else {
                    return Err(FxError::WrongUtxoType);
                };
                op.verify()?;
                if op.output.group_id != out.group_id {
                    return Err(FxError::WrongGroupId {
                        expected: out.group_id,
                        got: op.output.group_id,
                    });
                }
                if op.output.payload != out.payload {
                    return Err(FxError::WrongPayload);
                }
                verify_credentials(ctx, self.bootstrapped, &op.input, cred, &out.owners)
            }
            Op::KeyMint(_) => Err(FxError::WrongOperationType),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Keypair;
    use crate::fxs::keyfx::SignerProof;
    use crate::ids::ShortId;

    fn ctx() -> FxContext {
        FxContext {
            tx_hash: [3u8; 32],
            now: 0,
        }
    }

    fn cred_for(kp: &Keypair, ctx: &FxContext) -> AnyCredential {
        AnyCredential::Nft(Credential(keyfx::Credential {
            sigs: vec![SignerProof {
                public_key: kp.public_key(),
                signature: kp.sign(&ctx.tx_hash),
            }],
        }))
    }

    fn fx() -> NftFx {
        let mut fx = NftFx::new();
        fx.bootstrapped().unwrap();
        fx
    }

    #[test]
    fn mint_in_matching_group() {
        let kp = Keypair::generate();
        let c = ctx();
        let utxo = Output::NftMint(MintOutput {
            group_id: 4,
            owners: OutputOwners::single(kp.address()),
        });
        let op = MintOperation {
            mint_input: keyfx::Input {
                sig_indices: vec![0],
            },
            group_id: 4,
            payload: b"art".to_vec(),
            outputs: vec![OutputOwners::single(ShortId::new([5u8; 20]))],
        };
        assert!(fx()
            .verify_operation(&c, &Op::NftMint(op.clone()), &cred_for(&kp, &c), &[&utxo])
            .is_ok());

        let wrong_group = MintOperation { group_id: 5, ..op };
        assert_eq!(
            fx().verify_operation(&c, &Op::NftMint(wrong_group), &cred_for(&kp, &c), &[&utxo]),
            Err(FxError::WrongGroupId {
                expected: 4,
                got: 5
            })
        );
    }

    #[test]
    fn transfer_must_keep_payload() {
        let kp = Keypair::generate();
        let c = ctx();
        let utxo = Output::NftTransfer(TransferOutput {
            group_id: 1,
            payload: b"original".to_vec(),
            owners: OutputOwners::single(kp.address()),
        });
        let op = TransferOperation {
            input: keyfx::Input {
                sig_indices: vec![0],
            },
            output: TransferOutput {
                group_id: 1,
                payload: b"forged".to_vec(),
                owners: OutputOwners::single(ShortId::new([5u8; 20])),
            },
        };
        assert_eq!(
            fx().verify_operation(&c, &Op::NftTransfer(op), &cred_for(&kp, &c), &[&utxo]),
            Err(FxError::WrongPayload)
        );
    }

    #[test]
    fn oversized_payload_rejected() {
        let out = TransferOutput {
            group_id: 0,
            payload: vec![0u8; MAX_NFT_PAYLOAD_SIZE + 1],
            owners: OutputOwners::single(ShortId::new([1u8; 20])),
        };
        assert!(matches!(
            out.verify(),
            Err(FxError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn transfer_inputs_are_refused() {
        let kp = Keypair::generate();
        let c = ctx();
        let input = AnyInput::KeyTransfer(keyfx::TransferInput {
            amount: 1,
            input: keyfx::Input::default(),
        });
        let utxo = Output::NftMint(MintOutput {
            group_id: 0,
            owners: OutputOwners::single(kp.address()),
        });
        assert_eq!(
            fx().verify_transfer(&c, &input, &cred_for(&kp, &c), &utxo),
            Err(FxError::CantTransfer)
        );
    }
}
