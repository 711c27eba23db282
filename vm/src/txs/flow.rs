//! Per-asset value conservation.

use std::collections::BTreeMap;

use super::error::TxError;
use crate::ids::Id;

/// Tallies consumed and produced amounts per asset and checks that every
/// asset consumes at least what it produces.
///
/// The fee is recorded as an extra production of the fee asset, so a
/// transaction that doesn't burn enough of it fails the same check.
#[derive(Debug, Default)]
pub struct FlowChecker {
    consumed: BTreeMap<Id, u64>,
    produced: BTreeMap<Id, u64>,
    overflowed: bool,
}

impl FlowChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consume(&mut self, asset: Id, amount: u64) {
        Self::add(&mut self.consumed, &mut self.overflowed, asset, amount);
    }

    pub fn produce(&mut self, asset: Id, amount: u64) {
        Self::add(&mut self.produced, &mut self.overflowed, asset, amount);
    }

    fn add(tally: &mut BTreeMap<Id, u64>, overflowed: &mut bool, asset: Id, amount: u64) {
        if amount == 0 {
            return;
        }
        let entry = tally.entry(asset).or_insert(0);
        match entry.checked_add(amount) {
            Some(sum) => *entry = sum,
            None => *overflowed = true,
        }
    }

    pub fn verify(&self) -> Result<(), TxError> {
        if self.overflowed {
            return Err(TxError::Overflow);
        }
        for (asset, &produced) in &self.produced {
            let consumed = self.consumed.get(asset).copied().unwrap_or(0);
            if consumed < produced {
                return Err(TxError::InsufficientInput {
                    asset: *asset,
                    consumed,
                    produced,
                });
            }
        }
        Ok(())
    }
}
