// Coin selection and transaction parsing benchmarks for the UTXO VM.
//
// Covers greedy selection over wallets of growing size, signing the
// resulting transaction, and decoding it back from bytes.

use std::collections::BTreeMap;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use utxo_vm::crypto::Keypair;
use utxo_vm::fxs::keyfx::{OutputOwners, TransferOutput};
use utxo_vm::fxs::{Keychain, Output};
use utxo_vm::txs::{sort_outputs, BaseTx, Parser, TransferableOutput, Tx, UnsignedTx};
use utxo_vm::vm::spend;
use utxo_vm::{Id, Utxo, UtxoId};

const ASSET: Id = Id::EMPTY;

fn wallet(owner: &Keypair, n: u32) -> Vec<Utxo> {
    (0..n)
        .map(|i| Utxo {
            utxo_id: UtxoId {
                tx_id: Id::from(*blake3::hash(&i.to_be_bytes()).as_bytes()),
                output_index: i,
            },
            asset_id: ASSET,
            out: Output::KeyTransfer(TransferOutput {
                amount: 10,
                owners: OutputOwners::single(owner.address()),
            }),
        })
        .collect()
}

fn signed_transfer(parser: &Parser, owner: &Keypair, utxos: &[Utxo], amount: u64) -> Tx {
    let kc = Keychain::from_keys([owner.clone()]);
    let selection = spend::spend(utxos, &kc, &BTreeMap::from([(ASSET, amount)]), 0)
        .expect("wallet covers amount");
    let mut outs = vec![TransferableOutput {
        asset_id: ASSET,
        out: Output::KeyTransfer(TransferOutput {
            amount: selection.amounts_spent[&ASSET],
            owners: OutputOwners::single(owner.address()),
        }),
    }];
    sort_outputs(&mut outs, parser).expect("sortable outputs");
    let unsigned = UnsignedTx::Base(BaseTx {
        network_id: 1,
        chain_id: Id::EMPTY,
        outs,
        ins: selection.ins,
        memo: vec![],
    });
    Tx::sign(parser, unsigned, &selection.signers).expect("signable tx")
}

fn bench_spend(c: &mut Criterion) {
    let owner = Keypair::from_seed(&[9u8; 32]);
    let kc = Keychain::from_keys([owner.clone()]);
    let mut group = c.benchmark_group("spend/select");

    for &n in &[10u32, 100, 1000] {
        let utxos = wallet(&owner, n);
        let target = BTreeMap::from([(ASSET, u64::from(n) * 5)]);
        group.throughput(Throughput::Elements(u64::from(n)));
        group.bench_with_input(BenchmarkId::from_parameter(n), &utxos, |b, utxos| {
            b.iter(|| spend::spend(utxos, &kc, &target, 0).expect("enough funds"));
        });
    }
    group.finish();
}

fn bench_sign(c: &mut Criterion) {
    let owner = Keypair::from_seed(&[9u8; 32]);
    let parser = Parser::new(utxo_vm::config::MAX_TX_SIZE_BYTES);
    let utxos = wallet(&owner, 16);

    c.bench_function("tx/sign_16_inputs", |b| {
        b.iter(|| signed_transfer(&parser, &owner, &utxos, 160));
    });
}

fn bench_parse(c: &mut Criterion) {
    let owner = Keypair::from_seed(&[9u8; 32]);
    let parser = Parser::new(utxo_vm::config::MAX_TX_SIZE_BYTES);
    let utxos = wallet(&owner, 16);
    let bytes = signed_transfer(&parser, &owner, &utxos, 160).bytes().to_vec();

    c.bench_function("tx/parse_16_inputs", |b| {
        b.iter(|| parser.parse_tx(&bytes).expect("valid tx"));
    });
}

criterion_group!(benches, bench_spend, bench_sign, bench_parse);
criterion_main!(benches);
