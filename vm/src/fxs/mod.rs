//! # Feature Extensions
//!
//! A feature extension ("fx") owns a family of value types and the rules for
//! spending them. The VM never inspects outputs, inputs or credentials
//! itself; it looks up the responsible extension by the value's
//! [`ValueKind`] and delegates.
//!
//! ## Design Decisions
//!
//! - **Closed value enums**: the set of value types is fixed at compile time
//!   (see [`values`]). Each variant reports a kind tag, and the registry maps
//!   tags to extension indices once at construction.
//! - **Index identity**: an extension is identified by its position in the
//!   registry. Create-asset transactions reference extensions by that index,
//!   so registration order is part of the chain's rules.
//! - **Bitset capabilities**: which extensions an asset supports fits in a
//!   `u64`, which caps the registry at 64 extensions.

use std::collections::HashMap;

use thiserror::Error;

pub mod keychain;
pub mod keyfx;
pub mod nftfx;
pub mod values;

pub use keychain::{Keychain, KeychainError, Spendable};
pub use keyfx::KeyFx;
pub use nftfx::NftFx;
pub use values::{Credential, Input, Op, Output};

/// Maximum number of extensions a registry can hold.
pub const MAX_FXS: usize = 64;

// ---------------------------------------------------------------------------
// Kinds & errors
// ---------------------------------------------------------------------------

/// Tag identifying the concrete type of an output, input, credential or
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    KeyTransferOutput,
    KeyMintOutput,
    KeyTransferInput,
    KeyCredential,
    KeyMintOperation,
    NftTransferOutput,
    NftMintOutput,
    NftCredential,
    NftMintOperation,
    NftTransferOperation,
}

/// Verification failures raised by an extension. Surfaced to callers
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FxError {
    #[error("output is unspendable: threshold {threshold} exceeds {addrs} addresses")]
    OutputUnspendable { threshold: u32, addrs: usize },

    #[error("output has addresses but a zero threshold")]
    OutputUnoptimized,

    #[error("addresses are not sorted and unique")]
    AddrsNotSortedUnique,

    #[error("output has no value")]
    NoValueOutput,

    #[error("input has no value")]
    NoValueInput,

    #[error("signature indices are not sorted and unique")]
    InputIndicesNotSortedUnique,

    #[error("output is locked until {locktime}, now {now}")]
    Timelocked { locktime: u64, now: u64 },

    #[error("too many signers: threshold {threshold}, got {sigs}")]
    TooManySigners { threshold: u32, sigs: usize },

    #[error("too few signers: threshold {threshold}, got {sigs}")]
    TooFewSigners { threshold: u32, sigs: usize },

    #[error("input names {indices} signers but credential has {sigs} signatures")]
    InputCredentialSignersMismatch { indices: usize, sigs: usize },

    #[error("signature index {index} is out of bounds")]
    InputOutputIndexOutOfBounds { index: u32 },

    #[error("signature {position} is from the wrong signer")]
    WrongSigner { position: usize },

    #[error("signature {position} is invalid")]
    InvalidSignature { position: usize },

    #[error("wrong credential type")]
    WrongCredentialType,

    #[error("wrong utxo type")]
    WrongUtxoType,

    #[error("wrong operation type")]
    WrongOperationType,

    #[error("input amount {input} does not match output amount {output}")]
    MismatchedAmounts { input: u64, output: u64 },

    #[error("expected {expected} utxos, got {got}")]
    WrongNumberOfUtxos { expected: usize, got: usize },

    #[error("mint operation must re-create the consumed mint output")]
    WrongMintCreated,

    #[error("payload of {len} bytes exceeds {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("operation has no outputs")]
    NoOutputs,

    #[error("wrong group id: expected {expected}, got {got}")]
    WrongGroupId { expected: u32, got: u32 },

    #[error("payload does not match the consumed output")]
    WrongPayload,

    #[error("this extension cannot be spent through transfer inputs")]
    CantTransfer,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no feature extensions registered")]
    Empty,

    #[error("too many feature extensions: {0} (max 64)")]
    TooMany(usize),

    #[error("value kind {kind:?} claimed by extension {first} and {second}")]
    DuplicateKind {
        kind: ValueKind,
        first: usize,
        second: usize,
    },
}

// ---------------------------------------------------------------------------
// Fx trait
// ---------------------------------------------------------------------------

/// Per-transaction inputs an extension needs.
#[derive(Debug, Clone, Copy)]
pub struct FxContext {
    /// The message every credential signs: hash of the unsigned tx bytes.
    pub tx_hash: [u8; 32],
    /// VM clock, Unix seconds.
    pub now: u64,
}

/// A pluggable verifier for one family of value types.
pub trait Fx: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Value kinds this extension is responsible for.
    fn kinds(&self) -> &'static [ValueKind];

    /// Called when the chain starts catching up with the network.
    fn bootstrapping(&mut self) -> Result<(), FxError>;

    /// Called once the chain has caught up.
    fn bootstrapped(&mut self) -> Result<(), FxError>;

    /// Verifies `input`, authorized by `cred`, may consume `utxo`.
    fn verify_transfer(
        &self,
        ctx: &FxContext,
        input: &Input,
        cred: &Credential,
        utxo: &Output,
    ) -> Result<(), FxError>;

    /// Verifies `op`, authorized by `cred`, may consume `utxos`.
    fn verify_operation(
        &self,
        ctx: &FxContext,
        op: &Op,
        cred: &Credential,
        utxos: &[&Output],
    ) -> Result<(), FxError>;
}

/// The default extension set: key transfers at index 0, NFTs at index 1.
pub fn default_fxs() -> Vec<Box<dyn Fx>> {
    vec![Box::new(KeyFx::new()), Box::new(NftFx::new())]
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Set of extension indices, one bit each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FxBitSet(u64);

impl FxBitSet {
    pub fn insert(&mut self, index: usize) {
        if index < MAX_FXS {
            self.0 |= 1 << index;
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index < MAX_FXS && self.0 & (1 << index) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Registered extensions, addressable by index and by value kind.
#[derive(Debug)]
pub struct FxRegistry {
    fxs: Vec<Box<dyn Fx>>,
    by_kind: HashMap<ValueKind, usize>,
}

impl FxRegistry {
    pub fn new(fxs: Vec<Box<dyn Fx>>) -> Result<Self, RegistryError> {
        if fxs.is_empty() {
            return Err(RegistryError::Empty);
        }
        if fxs.len() > MAX_FXS {
            return Err(RegistryError::TooMany(fxs.len()));
        }
        let mut by_kind = HashMap::new();
        for (index, fx) in fxs.iter().enumerate() {
            for &kind in fx.kinds() {
                if let Some(first) = by_kind.insert(kind, index) {
                    return Err(RegistryError::DuplicateKind {
                        kind,
                        first,
                        second: index,
                    });
                }
            }
        }
        Ok(Self { fxs, by_kind })
    }

    pub fn len(&self) -> usize {
        self.fxs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fxs.is_empty()
    }

    /// Index of the extension owning `kind`.
    pub fn index_of(&self, kind: ValueKind) -> Option<usize> {
        self.by_kind.get(&kind).copied()
    }

    pub fn get(&self, index: usize) -> Option<&dyn Fx> {
        self.fxs.get(index).map(|fx| fx.as_ref())
    }

    pub fn bootstrapping(&mut self) -> Result<(), FxError> {
        self.fxs.iter_mut().try_for_each(|fx| fx.bootstrapping())
    }

    pub fn bootstrapped(&mut self) -> Result<(), FxError> {
        self.fxs.iter_mut().try_for_each(|fx| fx.bootstrapped())
    }
}

/// `true` if `items` is strictly ascending.
pub(crate) fn is_sorted_and_unique<T: Ord>(items: &[T]) -> bool {
    items.windows(2).all(|w| w[0] < w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_routes_kinds() {
        let registry = FxRegistry::new(default_fxs()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.index_of(ValueKind::KeyCredential), Some(0));
        assert_eq!(registry.index_of(ValueKind::NftMintOperation), Some(1));
        assert_eq!(registry.get(1).map(|fx| fx.name()), Some("nftfx"));
    }

    #[test]
    fn duplicate_kinds_rejected() {
        let fxs: Vec<Box<dyn Fx>> = vec![Box::new(KeyFx::new()), Box::new(KeyFx::new())];
        match FxRegistry::new(fxs) {
            Err(RegistryError::DuplicateKind {
                first: 0,
                second: 1,
                ..
            }) => {}
            other => panic!("expected DuplicateKind, got {:?}", other),
        }
        assert_eq!(FxRegistry::new(vec![]).unwrap_err(), RegistryError::Empty);
    }

    #[test]
    fn bitset_membership() {
        let mut set = FxBitSet::default();
        assert!(set.is_empty());
        set.insert(0);
        set.insert(5);
        assert!(set.contains(0) && set.contains(5));
        assert!(!set.contains(1));
        assert!(!set.contains(200));
    }

    #[test]
    fn sorted_unique_check() {
        assert!(is_sorted_and_unique(&[1, 2, 3]));
        assert!(is_sorted_and_unique::<u32>(&[]));
        assert!(!is_sorted_and_unique(&[1, 1]));
        assert!(!is_sorted_and_unique(&[2, 1]));
    }
}
