//! Asset creation. The new asset is named after the creating transaction's
//! ID; its initial states fix, once and for all, which extensions the asset
//! supports.

use serde::{Deserialize, Serialize};

use super::base_tx::{BaseTx, SyntaxContext};
use super::error::TxError;
use super::flow::FlowChecker;
use super::parser::Parser;
use crate::config::{MAX_DENOMINATION, MAX_NAME_LEN, MAX_SYMBOL_LEN, MIN_NAME_LEN};
use crate::fxs::{FxBitSet, Output};

/// Outputs an asset starts with under one extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialState {
    pub fx_index: u32,
    pub outs: Vec<Output>,
}

impl InitialState {
    fn verify(&self, num_fxs: usize, parser: &Parser) -> Result<(), TxError> {
        if self.fx_index as usize >= num_fxs {
            return Err(TxError::UnknownFxIndex {
                index: self.fx_index,
                num_fxs,
            });
        }
        for (index, out) in self.outs.iter().enumerate() {
            out.verify()
                .map_err(|source| TxError::InvalidOutput { index, source })?;
        }
        let encoded = self
            .outs
            .iter()
            .map(|out| parser.encode(out))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TxError::Encoding(e.to_string()))?;
        if !encoded.windows(2).all(|w| w[0] <= w[1]) {
            return Err(TxError::StateOutputsNotSorted);
        }
        Ok(())
    }

    /// Sorts `outs` into canonical order.
    pub fn sort(&mut self, parser: &Parser) -> Result<(), TxError> {
        let mut keyed = self
            .outs
            .drain(..)
            .map(|out| parser.encode(&out).map(|key| (key, out)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TxError::Encoding(e.to_string()))?;
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        self.outs.extend(keyed.into_iter().map(|(_, out)| out));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAssetTx {
    pub base: BaseTx,
    pub name: String,
    pub symbol: String,
    pub denomination: u8,
    pub states: Vec<InitialState>,
}

impl CreateAssetTx {
    pub fn verify_syntax(&self, ctx: &SyntaxContext<'_>, fc: &mut FlowChecker) -> Result<(), TxError> {
        verify_name(&self.name)?;
        verify_symbol(&self.symbol)?;
        if self.denomination > MAX_DENOMINATION {
            return Err(TxError::DenominationTooLarge {
                denomination: self.denomination,
                max: MAX_DENOMINATION,
            });
        }
        if self.states.is_empty() {
            return Err(TxError::NoStates);
        }
        if !self
            .states
            .windows(2)
            .all(|w| w[0].fx_index < w[1].fx_index)
        {
            return Err(TxError::StatesNotSortedUnique);
        }
        for state in &self.states {
            state.verify(ctx.num_fxs, ctx.parser)?;
        }

        self.base.verify_syntax(ctx, fc)?;
        fc.produce(ctx.fee_asset_id, ctx.create_asset_tx_fee);
        Ok(())
    }

    /// Every extension index the asset declares a state for.
    pub fn fx_set(&self) -> FxBitSet {
        let mut set = FxBitSet::default();
        for state in &self.states {
            set.insert(state.fx_index as usize);
        }
        set
    }
}

fn verify_name(name: &str) -> Result<(), TxError> {
    let len = name.len();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(TxError::NameLength {
            len,
            min: MIN_NAME_LEN,
            max: MAX_NAME_LEN,
        });
    }
    if name.starts_with(' ') || name.ends_with(' ') {
        return Err(TxError::UnexpectedWhitespace);
    }
    if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b' ') {
        return Err(TxError::IllegalNameCharacter);
    }
    Ok(())
}

fn verify_symbol(symbol: &str) -> Result<(), TxError> {
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(TxError::SymbolTooLong {
            len: symbol.len(),
            max: MAX_SYMBOL_LEN,
        });
    }
    if !symbol.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(TxError::IllegalSymbolCharacter);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_rules() {
        assert!(verify_name("Gold Coin 2").is_ok());
        assert!(matches!(verify_name(""), Err(TxError::NameLength { .. })));
        assert!(matches!(
            verify_name(&"a".repeat(MAX_NAME_LEN + 1)),
            Err(TxError::NameLength { .. })
        ));
        assert_eq!(verify_name(" Gold"), Err(TxError::UnexpectedWhitespace));
        assert_eq!(verify_name("Gold "), Err(TxError::UnexpectedWhitespace));
        assert_eq!(verify_name("Gold-Coin"), Err(TxError::IllegalNameCharacter));
    }

    #[test]
    fn symbol_rules() {
        assert!(verify_symbol("").is_ok());
        assert!(verify_symbol("GLD").is_ok());
        assert!(matches!(
            verify_symbol("GOLDX"),
            Err(TxError::SymbolTooLong { .. })
        ));
        assert_eq!(verify_symbol("gld"), Err(TxError::IllegalSymbolCharacter));
    }

    #[test]
    fn fx_set_covers_every_state() {
        let tx = CreateAssetTx {
            base: BaseTx {
                network_id: 0,
                chain_id: Default::default(),
                outs: vec![],
                ins: vec![],
                memo: vec![],
            },
            name: "Both".into(),
            symbol: "BTH".into(),
            denomination: 0,
            states: vec![
                InitialState {
                    fx_index: 0,
                    outs: vec![],
                },
                InitialState {
                    fx_index: 1,
                    outs: vec![],
                },
            ],
        };
        let set = tx.fx_set();
        assert!(set.contains(0) && set.contains(1));
        assert!(!set.contains(2));
    }
}
