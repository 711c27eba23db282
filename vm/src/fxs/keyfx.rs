//! # Key Feature Extension
//!
//! Fungible value guarded by threshold ownership. Outputs name a set of
//! owner addresses, a threshold and a locktime; spending one requires a
//! credential carrying `threshold` signatures from distinct owners over the
//! transaction's signing hash.
//!
//! Value types:
//!
//! | Type             | Kind                         |
//! |------------------|------------------------------|
//! | `TransferOutput` | `ValueKind::KeyTransferOutput` |
//! | `MintOutput`     | `ValueKind::KeyMintOutput`     |
//! | `TransferInput`  | `ValueKind::KeyTransferInput`  |
//! | `Credential`     | `ValueKind::KeyCredential`     |
//! | `MintOperation`  | `ValueKind::KeyMintOperation`  |

use serde::{Deserialize, Serialize};

use super::values::{Credential as AnyCredential, Input as AnyInput, Op, Output};
use super::{is_sorted_and_unique, Fx, FxContext, FxError, ValueKind};
use crate::crypto::keys::{address_of, PublicKey, Signature};
use crate::ids::ShortId;

const KINDS: &[ValueKind] = &[
    ValueKind::KeyTransferOutput,
    ValueKind::KeyMintOutput,
    ValueKind::KeyTransferInput,
    ValueKind::KeyCredential,
    ValueKind::KeyMintOperation,
];

// ---------------------------------------------------------------------------
// Owners
// ---------------------------------------------------------------------------

/// Who may spend an output, and from when.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOwners {
    /// Unix timestamp (seconds) before which the output cannot be spent.
    pub locktime: u64,
    /// Number of owner signatures required.
    pub threshold: u32,
    /// Owner addresses, sorted and unique.
    pub addrs: Vec<ShortId>,
}

impl OutputOwners {
    /// Single-owner, threshold 1, no locktime.
    pub fn single(addr: ShortId) -> Self {
        Self {
            locktime: 0,
            threshold: 1,
            addrs: vec![addr],
        }
    }

    pub fn verify(&self) -> Result<(), FxError> {
        if self.threshold as usize > self.addrs.len() {
            return Err(FxError::OutputUnspendable {
                threshold: self.threshold,
                addrs: self.addrs.len(),
            });
        }
        if self.threshold == 0 && !self.addrs.is_empty() {
            return Err(FxError::OutputUnoptimized);
        }
        if !is_sorted_and_unique(&self.addrs) {
            return Err(FxError::AddrsNotSortedUnique);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// An amount of a fungible asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutput {
    pub amount: u64,
    pub owners: OutputOwners,
}

impl TransferOutput {
    pub fn verify(&self) -> Result<(), FxError> {
        if self.amount == 0 {
            return Err(FxError::NoValueOutput);
        }
        self.owners.verify()
    }
}

/// The right to mint more of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintOutput {
    pub owners: OutputOwners,
}

impl MintOutput {
    pub fn verify(&self) -> Result<(), FxError> {
        self.owners.verify()
    }
}

// ---------------------------------------------------------------------------
// Inputs & credentials
// ---------------------------------------------------------------------------

/// Indices into the spent output's owner list naming who signs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub sig_indices: Vec<u32>,
}

impl Input {
    pub fn verify(&self) -> Result<(), FxError> {
        if !is_sorted_and_unique(&self.sig_indices) {
            return Err(FxError::InputIndicesNotSortedUnique);
        }
        Ok(())
    }
}

/// Consumes a [`TransferOutput`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInput {
    pub amount: u64,
    pub input: Input,
}

impl TransferInput {
    pub fn verify(&self) -> Result<(), FxError> {
        if self.amount == 0 {
            return Err(FxError::NoValueInput);
        }
        self.input.verify()
    }
}

/// One signer's public key and signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerProof {
    pub public_key: PublicKey,
    pub signature: Signature,
}

/// Signatures authorizing one input or operation, parallel to its
/// `sig_indices`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub sigs: Vec<SignerProof>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Consumes a [`MintOutput`], re-creates it, and creates new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintOperation {
    pub mint_input: Input,
    pub mint_output: MintOutput,
    pub transfer_output: TransferOutput,
}

impl MintOperation {
    pub fn verify(&self) -> Result<(), FxError> {
        self.mint_input.verify()?;
        self.mint_output.verify()?;
        self.transfer_output.verify()
    }

    pub fn outs(&self) -> Vec<Output> {
        vec![
            Output::KeyMint(self.mint_output.clone()),
            Output::KeyTransfer(self.transfer_output.clone()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Signature checks (shared with the NFT extension)
// ---------------------------------------------------------------------------

/// Checks that `cred` satisfies `owners` for the signers named by `input`.
///
/// Signature checks are skipped while bootstrapping; the structural checks
/// (locktime, threshold, counts) are not.
pub(crate) fn verify_credentials(
    ctx: &FxContext,
    bootstrapped: bool,
    input: &Input,
    cred: &Credential,
    owners: &OutputOwners,
) -> Result<(), FxError> {
    let num_sigs = input.sig_indices.len();
    if owners.locktime > ctx.now {
        return Err(FxError::Timelocked {
            locktime: owners.locktime,
            now: ctx.now,
        });
    }
    if (owners.threshold as usize) < num_sigs {
        return Err(FxError::TooManySigners {
            threshold: owners.threshold,
            sigs: num_sigs,
        });
    }
    if (owners.threshold as usize) > num_sigs {
        return Err(FxError::TooFewSigners {
            threshold: owners.threshold,
            sigs: num_sigs,
        });
    }
    if num_sigs != cred.sigs.len() {
        return Err(FxError::InputCredentialSignersMismatch {
            indices: num_sigs,
            sigs: cred.sigs.len(),
        });
    }
    if !bootstrapped {
        return Ok(());
    }

    for (i, (&index, proof)) in input.sig_indices.iter().zip(&cred.sigs).enumerate() {
        let expected = owners
            .addrs
            .get(index as usize)
            .ok_or(FxError::InputOutputIndexOutOfBounds { index })?;
        if address_of(&proof.public_key) != *expected {
            return Err(FxError::WrongSigner { position: i });
        }
        if !proof.public_key.verify(&ctx.tx_hash, &proof.signature) {
            return Err(FxError::InvalidSignature { position: i });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// KeyFx
// ---------------------------------------------------------------------------

/// Verifier for fungible transfers and mint operations.
#[derive(Debug, Default)]
pub struct KeyFx {
    bootstrapped: bool,
}

impl KeyFx {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Fx for KeyFx {
    fn name(&self) -> &'static str {
        "keyfx"
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
        ctx: &FxContext,
        input: &AnyInput,
        cred: &AnyCredential,
        utxo: &Output,
    ) -> Result<(), FxError> {
        let AnyInput::KeyTransfer(input) = input;
        let AnyCredential::Key(cred) = cred else {
            return Err(FxError::WrongCredentialType);
        };
        let Output::KeyTransfer(out) = utxo else {
            return Err(FxError::WrongUtxoType);
        };
        out.verify()?;
        input.verify()?;
        if out.amount != input.amount {
            return Err(FxError::MismatchedAmounts {
                input: input.amount,
                output: out.amount,
            });
        }
        verify_credentials(ctx, self.bootstrapped, &input.input, cred, &out.owners)
    }

    fn verify_operation(
        &self,
        ctx: &FxContext,
        op: &Op,
        cred: &AnyCredential,
        utxos: &[&Output],
    ) -> Result<(), FxError> {
        let Op::KeyMint(op) = op else {
            return Err(FxError::WrongOperationType);
        };
        let AnyCredential::Key(cred) = cred else {
            return Err(FxError::WrongCredentialType);
        };
        if utxos.len() != 1 {
            return Err(FxError::WrongNumberOfUtxos {
                expected: 1,
                got: utxos.len(),
            });
        }
        let Output::KeyMint(out) = utxos[0] else {
            return Err(FxError::WrongUtxoType);
        };
        op.verify()?;
        if op.mint_output.owners != out.owners {
            return Err(FxError::WrongMintCreated);
        }
        verify_credentials(ctx, self.bootstrapped, &op.mint_input, cred, &out.owners)
    }
}
