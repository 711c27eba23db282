//! # Coin Selection
//!
//! Greedy UTXO selection for building transactions from a keychain.
//!
//! Every selector walks `utxos` in the order given and takes what the
//! keychain can unlock at `now`. Given the same UTXO list, keychain and
//! request, the result is byte-for-byte the same. A selector either meets
//! the whole request or fails; it never hands back a partial selection.
//!
//! Results come out in canonical transaction order (inputs by UTXO locator,
//! operations by encoded bytes) with signer sets kept aligned.

use std::collections::BTreeMap;

use crate::crypto::keys::Keypair;
use crate::fxs::keychain::{Keychain, Spendable};
use crate::fxs::keyfx::{self, MintOperation, OutputOwners, TransferOutput};
use crate::fxs::nftfx;
use crate::fxs::{Input, Op, Output};
use crate::ids::{Id, ShortId};
use crate::txs::{
    sort_inputs_with_signers, sort_operations_with_signers, Operation, Parser, TransferableInput,
};
use crate::utxo::Utxo;

use super::error::VmError;

/// Inputs chosen to fund a transfer.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Total consumed per asset. May exceed what was asked for; the caller
    /// returns the difference as change.
    pub amounts_spent: BTreeMap<Id, u64>,
    pub ins: Vec<TransferableInput>,
    /// Keys that must sign each input, parallel to `ins`.
    pub signers: Vec<Vec<Keypair>>,
}

/// Operations chosen for a mint or NFT transfer.
#[derive(Debug, Clone, Default)]
pub struct OperationSelection {
    pub ops: Vec<Operation>,
    /// Keys that must sign each operation, parallel to `ops`.
    pub signers: Vec<Vec<Keypair>>,
}

fn single_owner(to: ShortId) -> OutputOwners {
    OutputOwners::single(to)
}

/// Collects transfer inputs, skipping assets that already reached their
/// target when `targets` is given.
fn collect_inputs(
    utxos: &[Utxo],
    keychain: &Keychain,
    now: u64,
    targets: Option<&BTreeMap<Id, u64>>,
) -> Result<Selection, VmError> {
    let mut selection = Selection::default();
    for utxo in utxos {
        let spent = selection
            .amounts_spent
            .get(&utxo.asset_id)
            .copied()
            .unwrap_or(0);
        if let Some(targets) = targets {
            let wanted = targets.get(&utxo.asset_id).copied().unwrap_or(0);
            if spent >= wanted {
                continue;
            }
        }

        let Ok((Spendable::Transfer(input), signers)) = keychain.spend(&utxo.out, now) else {
            continue;
        };
        let total = spent
            .checked_add(input.amount)
            .ok_or(VmError::SpendOverflow)?;
        selection.amounts_spent.insert(utxo.asset_id, total);
        selection.ins.push(TransferableInput {
            utxo_id: utxo.utxo_id,
            asset_id: utxo.asset_id,
            input: Input::KeyTransfer(input),
        });
        selection.signers.push(signers);
    }
    sort_inputs_with_signers(&mut selection.ins, &mut selection.signers);
    Ok(selection)
}

/// Picks inputs covering at least `amounts[asset]` of every asset.
pub fn spend(
    utxos: &[Utxo],
    keychain: &Keychain,
    amounts: &BTreeMap<Id, u64>,
    now: u64,
) -> Result<Selection, VmError> {
    let selection = collect_inputs(utxos, keychain, now, Some(amounts))?;
    for (asset, &wanted) in amounts {
        let have = selection.amounts_spent.get(asset).copied().unwrap_or(0);
        if have < wanted {
            return Err(VmError::InsufficientFunds {
                asset: *asset,
                wanted,
                have,
            });
        }
    }
    Ok(selection)
}

/// Picks every amount-bearing UTXO the keychain can unlock.
pub fn spend_all(utxos: &[Utxo], keychain: &Keychain, now: u64) -> Result<Selection, VmError> {
    collect_inputs(utxos, keychain, now, None)
}

/// Builds one operation handing an NFT of `group_id` to `to`.
pub fn spend_nft(
    utxos: &[Utxo],
    keychain: &Keychain,
    asset_id: Id,
    group_id: u32,
    to: ShortId,
    now: u64,
    parser: &Parser,
) -> Result<OperationSelection, VmError> {
    let found = utxos.iter().find_map(|utxo| {
        if utxo.asset_id != asset_id {
            return None;
        }
        let Output::NftTransfer(out) = &utxo.out else {
            return None;
        };
        if out.group_id != group_id {
            return None;
        }
        let (sig_indices, signers) = keychain.match_owners(&out.owners, now)?;
        let op = Operation {
            asset_id,
            utxo_ids: vec![utxo.utxo_id],
            op: Op::NftTransfer(nftfx::TransferOperation {
                input: keyfx::Input { sig_indices },
                output: nftfx::TransferOutput {
                    group_id: out.group_id,
                    payload: out.payload.clone(),
                    owners: single_owner(to),
                },
            }),
        };
        Some((op, signers))
    });

    let Some((op, signers)) = found else {
        return Err(VmError::InsufficientFunds {
            asset: asset_id,
            wanted: 1,
            have: 0,
        });
    };
    finish_ops(vec![op], vec![signers], parser)
}

/// Builds one mint operation per requested asset, each sending the amount
/// to `to`.
pub fn mint(
    utxos: &[Utxo],
    keychain: &Keychain,
    amounts: &BTreeMap<Id, u64>,
    to: ShortId,
    now: u64,
    parser: &Parser,
) -> Result<OperationSelection, VmError> {
    let mut remaining: BTreeMap<Id, u64> = amounts
        .iter()
        .filter(|(_, &amount)| amount > 0)
        .map(|(asset, &amount)| (*asset, amount))
        .collect();
    let mut ops = Vec::new();
    let mut signers = Vec::new();

    for utxo in utxos {
        let Some(&amount) = remaining.get(&utxo.asset_id) else {
            continue;
        };
        let Output::KeyMint(out) = &utxo.out else {
            continue;
        };
        let Ok((Spendable::Mint(mint_input), keys)) = keychain.spend(&utxo.out, now) else {
            continue;
        };
        ops.push(Operation {
            asset_id: utxo.asset_id,
            utxo_ids: vec![utxo.utxo_id],
            op: Op::KeyMint(MintOperation {
                mint_input,
                mint_output: out.clone(),
                transfer_output: TransferOutput {
                    amount,
                    owners: single_owner(to),
                },
            }),
        });
        signers.push(keys);
        remaining.remove(&utxo.asset_id);
    }

    if !remaining.is_empty() {
        return Err(VmError::CantMintAsset);
    }
    finish_ops(ops, signers, parser)
}

/// Builds one operation minting a single NFT with `payload` for `to`.
pub fn mint_nft(
    utxos: &[Utxo],
    keychain: &Keychain,
    asset_id: Id,
    payload: Vec<u8>,
    to: ShortId,
    now: u64,
    parser: &Parser,
) -> Result<OperationSelection, VmError> {
    let found = utxos.iter().find_map(|utxo| {
        if utxo.asset_id != asset_id {
            return None;
        }
        let Output::NftMint(out) = &utxo.out else {
            return None;
        };
        let (sig_indices, signers) = keychain.match_owners(&out.owners, now)?;
        Some((utxo, out, sig_indices, signers))
    });

    let Some((utxo, out, sig_indices, signers)) = found else {
        return Err(VmError::CantMintAsset);
    };
    let op = Operation {
        asset_id,
        utxo_ids: vec![utxo.utxo_id],
        op: Op::NftMint(nftfx::MintOperation {
            mint_input: keyfx::Input { sig_indices },
            group_id: out.group_id,
            payload,
            outputs: vec![single_owner(to)],
        }),
    };
    finish_ops(vec![op], vec![signers], parser)
}

fn finish_ops(
    mut ops: Vec<Operation>,
    mut signers: Vec<Vec<Keypair>>,
    parser: &Parser,
) -> Result<OperationSelection, VmError> {
    sort_operations_with_signers(&mut ops, &mut signers, parser)?;
    Ok(OperationSelection { ops, signers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fxs::keyfx::MintOutput;
    use crate::utxo::UtxoId;

    fn asset(n: u8) -> Id {
        Id::new([n; 32])
    }

    fn transfer_utxo(tx: u8, asset_id: Id, amount: u64, owner: ShortId) -> Utxo {
        Utxo {
            utxo_id: UtxoId::new(Id::new([tx; 32]), 0),
            asset_id,
            out: Output::KeyTransfer(TransferOutput {
                amount,
                owners: OutputOwners::single(owner),
            }),
        }
    }

    fn parser() -> Parser {
        Parser::new(64 * 1024)
    }

    #[test]
    fn spend_meets_request_with_greedy_prefix() {
        let kp = Keypair::from_seed(&[1u8; 32]);
        let kc = Keychain::from_keys([kp.clone()]);
        let utxos = vec![
            transfer_utxo(1, asset(1), 4, kp.address()),
            transfer_utxo(2, asset(1), 4, kp.address()),
            transfer_utxo(3, asset(1), 4, kp.address()),
        ];
        let amounts = BTreeMap::from([(asset(1), 6)]);

        let selection = spend(&utxos, &kc, &amounts, 0).unwrap();
        assert_eq!(selection.amounts_spent[&asset(1)], 8);
        assert_eq!(selection.ins.len(), 2);
        assert_eq!(selection.signers.len(), 2);
        assert!(selection
            .ins
            .windows(2)
            .all(|w| w[0].input_id() < w[1].input_id()));
    }

    #[test]
    fn spend_reports_shortfall() {
        let kp = Keypair::from_seed(&[1u8; 32]);
        let stranger = Keypair::from_seed(&[2u8; 32]);
        let kc = Keychain::from_keys([kp.clone()]);
        let utxos = vec![
            transfer_utxo(1, asset(1), 4, kp.address()),
            transfer_utxo(2, asset(1), 100, stranger.address()),
        ];
        let amounts = BTreeMap::from([(asset(1), 5)]);
        match spend(&utxos, &kc, &amounts, 0) {
            Err(VmError::InsufficientFunds {
                wanted: 5, have: 4, ..
            }) => {}
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }
    }

    #[test]
    fn spend_overflow_detected() {
        let kp = Keypair::from_seed(&[1u8; 32]);
        let kc = Keychain::from_keys([kp.clone()]);
        let utxos = vec![
            transfer_utxo(1, asset(1), u64::MAX, kp.address()),
            transfer_utxo(2, asset(1), 1, kp.address()),
        ];
        assert!(matches!(
            spend_all(&utxos, &kc, 0),
            Err(VmError::SpendOverflow)
        ));
    }

    #[test]
    fn mint_fails_without_mint_rights() {
        let kp = Keypair::from_seed(&[1u8; 32]);
        let kc = Keychain::from_keys([kp.clone()]);
        let utxos = vec![transfer_utxo(1, asset(1), 4, kp.address())];
        let amounts = BTreeMap::from([(asset(1), 10)]);
        assert!(matches!(
            mint(&utxos, &kc, &amounts, kp.address(), 0, &parser()),
            Err(VmError::CantMintAsset)
        ));
    }

    #[test]
    fn mint_builds_one_op_per_asset() {
        let kp = Keypair::from_seed(&[1u8; 32]);
        let kc = Keychain::from_keys([kp.clone()]);
        let mint_utxo = |tx: u8, a: Id| Utxo {
            utxo_id: UtxoId::new(Id::new([tx; 32]), 0),
            asset_id: a,
            out: Output::KeyMint(MintOutput {
                owners: OutputOwners::single(kp.address()),
            }),
        };
        let utxos = vec![
            mint_utxo(1, asset(1)),
            mint_utxo(2, asset(1)),
            mint_utxo(3, asset(2)),
        ];
        let amounts = BTreeMap::from([(asset(1), 10), (asset(2), 20)]);
        let selection = mint(&utxos, &kc, &amounts, kp.address(), 0, &parser()).unwrap();
        assert_eq!(selection.ops.len(), 2);
        assert_eq!(selection.signers.len(), 2);
    }

    #[test]
    fn nft_selectors() {
        let kp = Keypair::from_seed(&[1u8; 32]);
        let kc = Keychain::from_keys([kp.clone()]);
        let to = ShortId::new([7u8; 20]);
        let minter = Utxo {
            utxo_id: UtxoId::new(Id::new([1u8; 32]), 0),
            asset_id: asset(3),
            out: Output::NftMint(nftfx::MintOutput {
                group_id: 2,
                owners: OutputOwners::single(kp.address()),
            }),
        };
        let token = Utxo {
            utxo_id: UtxoId::new(Id::new([2u8; 32]), 0),
            asset_id: asset(3),
            out: Output::NftTransfer(nftfx::TransferOutput {
                group_id: 2,
                payload: b"hello".to_vec(),
                owners: OutputOwners::single(kp.address()),
            }),
        };
        let utxos = vec![minter, token];

        let minted = mint_nft(&utxos, &kc, asset(3), b"new".to_vec(), to, 0, &parser()).unwrap();
        assert_eq!(minted.ops.len(), 1);
        assert!(matches!(minted.ops[0].op, Op::NftMint(_)));

        let sent = spend_nft(&utxos, &kc, asset(3), 2, to, 0, &parser()).unwrap();
        match &sent.ops[0].op {
            Op::NftTransfer(op) => assert_eq!(op.output.payload, b"hello".to_vec()),
            other => panic!("expected NFT transfer, got {:?}", other),
        }

        assert!(matches!(
            spend_nft(&utxos, &kc, asset(3), 9, to, 0, &parser()),
            Err(VmError::InsufficientFunds { .. })
        ));
        assert!(matches!(
            mint_nft(&utxos, &kc, asset(4), vec![], to, 0, &parser()),
            Err(VmError::CantMintAsset)
        ));
    }
}
