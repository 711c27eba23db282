//! A set of signing keys and the logic to pick which of them can unlock an
//! output.

use std::collections::HashMap;

use thiserror::Error;

use super::keyfx::{Input, OutputOwners, TransferInput};
use super::values::Output;
use super::ValueKind;
use crate::crypto::keys::Keypair;
use crate::ids::ShortId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeychainError {
    #[error("keychain cannot satisfy the output's owners")]
    CantSpend,

    #[error("keychain cannot spend outputs of kind {0:?}")]
    UnsupportedOutput(ValueKind),
}

/// What the keychain produced for a spendable output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spendable {
    Transfer(TransferInput),
    Mint(Input),
}

#[derive(Debug, Default, Clone)]
pub struct Keychain {
    keys: HashMap<ShortId, Keypair>,
}

impl Keychain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keys(keys: impl IntoIterator<Item = Keypair>) -> Self {
        let mut kc = Self::new();
        for key in keys {
            kc.add(key);
        }
        kc
    }

    pub fn add(&mut self, key: Keypair) {
        self.keys.insert(key.address(), key);
    }

    pub fn get(&self, addr: &ShortId) -> Option<&Keypair> {
        self.keys.get(addr)
    }

    /// Addresses in ascending order.
    pub fn addresses(&self) -> Vec<ShortId> {
        let mut addrs: Vec<_> = self.keys.keys().copied().collect();
        addrs.sort();
        addrs
    }

    /// Picks the first `threshold` owners this keychain holds keys for.
    ///
    /// Returns their indices into `owners.addrs` and the matching keys, or
    /// `None` if the output is still locked or too few keys are held.
    pub fn match_owners(&self, owners: &OutputOwners, now: u64) -> Option<(Vec<u32>, Vec<Keypair>)> {
        if owners.locktime > now {
            return None;
        }
        let threshold = owners.threshold as usize;
        let mut indices = Vec::with_capacity(threshold);
        let mut signers = Vec::with_capacity(threshold);
        for (i, addr) in owners.addrs.iter().enumerate() {
            if indices.len() >= threshold {
                break;
            }
            if let Some(key) = self.keys.get(addr) {
                indices.push(i as u32);
                signers.push(key.clone());
            }
        }
        (indices.len() == threshold).then_some((indices, signers))
    }

    /// Builds the input that spends `out`, with the keys that must sign it.
    pub fn spend(&self, out: &Output, now: u64) -> Result<(Spendable, Vec<Keypair>), KeychainError> {
        match out {
            Output::KeyTransfer(out) => {
                let (sig_indices, signers) = self
                    .match_owners(&out.owners, now)
                    .ok_or(KeychainError::CantSpend)?;
                let input = TransferInput {
                    amount: out.amount,
                    input: Input { sig_indices },
                };
                Ok((Spendable::Transfer(input), signers))
            }
            Output::KeyMint(out) => {
                let (sig_indices, signers) = self
                    .match_owners(&out.owners, now)
                    .ok_or(KeychainError::CantSpend)?;
                Ok((Spendable::Mint(Input { sig_indices }), signers))
            }
            other => Err(KeychainError::UnsupportedOutput(other.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fxs::keyfx::TransferOutput;

    fn sorted_owners(keys: &[&Keypair], threshold: u32) -> OutputOwners {
        let mut addrs: Vec<_> = keys.iter().map(|k| k.address()).collect();
        addrs.sort();
        OutputOwners {
            locktime: 0,
            threshold,
            addrs,
        }
    }

    #[test]
    fn match_picks_first_threshold_known_owners() {
        let a = Keypair::from_seed(&[1u8; 32]);
        let b = Keypair::from_seed(&[2u8; 32]);
        let c = Keypair::from_seed(&[3u8; 32]);
        let owners = sorted_owners(&[&a, &b, &c], 2);
        let kc = Keychain::from_keys([a.clone(), b.clone(), c.clone()]);

        let (indices, signers) = kc.match_owners(&owners, 0).unwrap();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(signers.len(), 2);
        assert_eq!(signers[0].address(), owners.addrs[0]);
    }

    #[test]
    fn match_fails_below_threshold_or_when_locked() {
        let a = Keypair::from_seed(&[1u8; 32]);
        let b = Keypair::from_seed(&[2u8; 32]);
        let owners = sorted_owners(&[&a, &b], 2);
        let kc = Keychain::from_keys([a.clone()]);
        assert!(kc.match_owners(&owners, 0).is_none());

        let locked = OutputOwners {
            locktime: 10,
            ..OutputOwners::single(a.address())
        };
        assert!(kc.match_owners(&locked, 9).is_none());
        assert!(kc.match_owners(&locked, 10).is_some());
    }

    #[test]
    fn spend_builds_transfer_input() {
        let a = Keypair::generate();
        let kc = Keychain::from_keys([a.clone()]);
        let out = Output::KeyTransfer(TransferOutput {
            amount: 42,
            owners: OutputOwners::single(a.address()),
        });
        match kc.spend(&out, 0) {
            Ok((Spendable::Transfer(input), signers)) => {
                assert_eq!(input.amount, 42);
                assert_eq!(input.input.sig_indices, vec![0]);
                assert_eq!(signers, vec![a]);
            }
            other => panic!("expected transfer input, got {:?}", other),
        }
    }

    #[test]
    fn spend_refuses_foreign_outputs() {
        let kc = Keychain::from_keys([Keypair::generate()]);
        let out = Output::KeyTransfer(TransferOutput {
            amount: 1,
            owners: OutputOwners::single(ShortId::new([8u8; 20])),
        });
        assert_eq!(kc.spend(&out, 0).unwrap_err(), KeychainError::CantSpend);
    }
}
