//! Memoized "which extensions does this asset support" answers.
//!
//! An asset's capability set is fixed by the initial states of the
//! transaction that created it, so once computed it never changes. The
//! whole set is cached on the first query, not just the bit asked about.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::fxs::FxBitSet;
use crate::ids::Id;
use crate::state::{DbResult, State, Status};
use crate::txs::UnsignedTx;

#[derive(Debug)]
pub struct AssetCapabilities {
    cache: LruCache<Id, FxBitSet>,
}

impl AssetCapabilities {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// Whether `asset_id` declared an initial state for extension
    /// `fx_index`.
    ///
    /// Unknown assets and IDs that don't name a create-asset transaction
    /// answer `false` and are not cached, so a later creation is still
    /// picked up.
    pub fn supports(&mut self, state: &State, asset_id: &Id, fx_index: usize) -> DbResult<bool> {
        if let Some(set) = self.cache.get(asset_id) {
            return Ok(set.contains(fx_index));
        }
        if state.status(asset_id)? == Status::Unknown {
            return Ok(false);
        }
        let Some(tx) = state.get_tx(asset_id)? else {
            return Ok(false);
        };
        let UnsignedTx::CreateAsset(create) = &tx.unsigned else {
            return Ok(false);
        };
        let set = create.fx_set();
        self.cache.put(*asset_id, set);
        Ok(set.contains(fx_index))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
