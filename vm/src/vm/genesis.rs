//! # Genesis
//!
//! The assets a chain starts with, read from JSON:
//!
//! ```json
//! {
//!   "assets": [{
//!     "alias": "DJTX",
//!     "name": "Dijets",
//!     "symbol": "DJTX",
//!     "denomination": 9,
//!     "initialState": {
//!       "fixedCap": [{ "amount": 1000, "address": "<40 hex chars>" }],
//!       "variableCap": [{ "minters": ["<40 hex chars>"], "threshold": 1 }]
//!     }
//!   }]
//! }
//! ```
//!
//! ## Design Decisions
//!
//! - **All value lives in initial states**: a genesis asset has no base
//!   outputs and no inputs. An asset with no initial state at all is refused.
//! - **First asset pays fees**: the first listed asset becomes the fee asset.
//! - **Idempotent**: the UTXOs are written once. On later starts the
//!   transactions are rebuilt only to recover aliases and the fee asset.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::fxs::keyfx::{self, OutputOwners};
use crate::fxs::{nftfx, Output};
use crate::ids::{Id, ShortId};
use crate::txs::{BaseTx, CreateAssetTx, InitialState, Parser, Tx, UnsignedTx};

use super::error::VmError;

const KEY_FX_INDEX: u32 = 0;
const NFT_FX_INDEX: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genesis {
    pub assets: Vec<GenesisAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisAsset {
    pub alias: String,
    pub name: String,
    pub symbol: String,
    pub denomination: u8,
    /// Hex-encoded.
    #[serde(default)]
    pub memo: String,
    pub initial_state: GenesisState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenesisState {
    pub fixed_cap: Vec<Holder>,
    pub variable_cap: Vec<Minters>,
    pub nft_groups: Vec<NftGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub amount: u64,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minters {
    pub minters: Vec<String>,
    pub threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftGroup {
    pub group_id: u32,
    pub minters: Vec<String>,
    pub threshold: u32,
}

fn parse_addr(s: &str) -> Result<ShortId, VmError> {
    ShortId::from_str(s).map_err(|e| VmError::Genesis(format!("address '{}': {}", s, e)))
}

fn owners(addrs: &[String], threshold: u32) -> Result<OutputOwners, VmError> {
    let mut addrs = addrs
        .iter()
        .map(|a| parse_addr(a))
        .collect::<Result<Vec<_>, _>>()?;
    addrs.sort();
    addrs.dedup();
    Ok(OutputOwners {
        locktime: 0,
        threshold,
        addrs,
    })
}

impl Genesis {
    pub fn from_json(bytes: &[u8]) -> Result<Self, VmError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(bytes).map_err(|e| VmError::Genesis(e.to_string()))
    }

    pub fn to_json(&self) -> Result<Vec<u8>, VmError> {
        serde_json::to_vec_pretty(self).map_err(|e| VmError::Genesis(e.to_string()))
    }

    /// Builds each asset's creation transaction, in listed order.
    pub fn build(
        &self,
        parser: &Parser,
        network_id: u32,
        chain_id: Id,
    ) -> Result<Vec<(String, Tx)>, VmError> {
        self.assets
            .iter()
            .map(|asset| {
                let tx = asset.build(parser, network_id, chain_id)?;
                Ok((asset.alias.clone(), tx))
            })
            .collect()
    }
}

impl GenesisAsset {
    fn states(&self, parser: &Parser) -> Result<Vec<InitialState>, VmError> {
        let mut key_outs = Vec::new();
        for holder in &self.initial_state.fixed_cap {
            key_outs.push(Output::KeyTransfer(keyfx::TransferOutput {
                amount: holder.amount,
                owners: OutputOwners::single(parse_addr(&holder.address)?),
            }));
        }
        for minters in &self.initial_state.variable_cap {
            key_outs.push(Output::KeyMint(keyfx::MintOutput {
                owners: owners(&minters.minters, minters.threshold)?,
            }));
        }

        let mut nft_outs = Vec::new();
        for group in &self.initial_state.nft_groups {
            nft_outs.push(Output::NftMint(nftfx::MintOutput {
                group_id: group.group_id,
                owners: owners(&group.minters, group.threshold)?,
            }));
        }

        let mut states = Vec::new();
        for (fx_index, outs) in [(KEY_FX_INDEX, key_outs), (NFT_FX_INDEX, nft_outs)] {
            if outs.is_empty() {
                continue;
            }
            let mut state = InitialState { fx_index, outs };
            state.sort(parser)?;
            states.push(state);
        }
        Ok(states)
    }

    fn build(&self, parser: &Parser, network_id: u32, chain_id: Id) -> Result<Tx, VmError> {
        let states = self.states(parser)?;
        if states.is_empty() {
            return Err(VmError::GenesisAssetMustHaveState(self.alias.clone()));
        }
        let memo = hex::decode(&self.memo)
            .map_err(|e| VmError::Genesis(format!("memo of '{}': {}", self.alias, e)))?;
        let unsigned = UnsignedTx::CreateAsset(CreateAssetTx {
            base: BaseTx {
                network_id,
                chain_id,
                outs: Vec::new(),
                ins: Vec::new(),
                memo,
            },
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            denomination: self.denomination,
            states,
        });
        Ok(Tx::sign(parser, unsigned, &[])?)
    }
}
