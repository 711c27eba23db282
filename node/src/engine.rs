//! # Auto-Accepting Engine
//!
//! A stand-in for a real consensus engine. It waits for the VM's
//! `PendingTxs` signal, pulls the batch and decides every transaction in it
//! locally, with no voting.
//!
//! ## Decision rule
//!
//! A transaction is accepted once everything it depends on is accepted and
//! every UTXO it spends still exists. Transactions whose parents sit later in
//! the same batch are retried after each pass; anything still undecidable
//! when a pass makes no progress is rejected.
//!
//! ## Shutdown
//!
//! The loop watches a `tokio::sync::watch` channel and exits when it flips
//! to `true` or its sender drops. A batch is always decided in full before
//! the flag is looked at again.

use std::sync::Arc;

use tokio::sync::mpsc::Receiver;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use utxo_vm::state::Status;
use utxo_vm::{EngineMessage, SharedVm, UniqueTx, Vm, VmError};

use crate::metrics::NodeMetrics;

/// Outcome of one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub accepted: usize,
    pub rejected: usize,
}

pub struct AutoEngine {
    vm: SharedVm,
    metrics: NodeMetrics,
}

enum Readiness {
    Ready,
    Waiting,
    Doomed,
}

impl AutoEngine {
    pub fn new(vm: SharedVm, metrics: NodeMetrics) -> Self {
        Self { vm, metrics }
    }

    /// Pulls the pending batch and decides all of it.
    pub fn decide_pending(&self) -> Result<BatchOutcome, VmError> {
        let _timer = self.metrics.batch_decision_seconds.start_timer();
        let mut vm = self.vm.lock();
        let mut waiting = vm.pending_txs();
        let mut outcome = BatchOutcome::default();

        loop {
            let before = waiting.len();
            let mut next = Vec::with_capacity(before);
            for utx in waiting {
                if utx.status().decided() {
                    continue;
                }
                match readiness(&mut vm, &utx)? {
                    Readiness::Ready => match vm.accept_tx(&utx) {
                        Ok(()) => outcome.accepted += 1,
                        Err(e) => {
                            warn!(tx_id = %utx.id(), error = %e, "accept failed, rejecting");
                            vm.reject_tx(&utx)?;
                            outcome.rejected += 1;
                        }
                    },
                    Readiness::Doomed => {
                        vm.reject_tx(&utx)?;
                        outcome.rejected += 1;
                    }
                    Readiness::Waiting => next.push(utx),
                }
            }
            waiting = next;
            if waiting.is_empty() || waiting.len() == before {
                break;
            }
        }

        for utx in waiting {
            debug!(tx_id = %utx.id(), "dependencies never settled");
            vm.reject_tx(&utx)?;
            outcome.rejected += 1;
        }

        self.metrics.batches_pulled.inc();
        self.metrics.txs_accepted.inc_by(outcome.accepted as u64);
        self.metrics.txs_rejected.inc_by(outcome.rejected as u64);
        Ok(outcome)
    }

    /// Serves engine messages until shutdown.
    pub async fn run(self, mut from_vm: Receiver<EngineMessage>, mut shutdown: watch::Receiver<bool>) {
        info!("engine started");
        loop {
            tokio::select! {
                msg = from_vm.recv() => match msg {
                    Some(EngineMessage::PendingTxs) => match self.decide_pending() {
                        Ok(outcome) => info!(
                            accepted = outcome.accepted,
                            rejected = outcome.rejected,
                            "batch decided"
                        ),
                        Err(e) => warn!(error = %e, "batch decision failed"),
                    },
                    Some(EngineMessage::StopVertex) => debug!("stop vertex requested"),
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("engine stopped");
    }
}

fn readiness(vm: &mut Vm, utx: &Arc<UniqueTx>) -> Result<Readiness, VmError> {
    let mut ready = true;
    for dep in vm.dependencies(utx)? {
        match dep.status() {
            Status::Accepted => {}
            Status::Processing => ready = false,
            Status::Rejected | Status::Unknown => return Ok(Readiness::Doomed),
        }
    }
    if !ready {
        return Ok(Readiness::Waiting);
    }
    for utxo_id in utx.input_utxos() {
        if vm.get_utxo(&utxo_id)?.is_none() {
            return Ok(Readiness::Doomed);
        }
    }
    Ok(Readiness::Ready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use tokio::sync::mpsc;

    use utxo_vm::crypto::Keypair;
    use utxo_vm::fxs::keyfx::{OutputOwners, TransferOutput};
    use utxo_vm::fxs::{default_fxs, Keychain, Output};
    use utxo_vm::state::MemDb;
    use utxo_vm::txs::{sort_outputs, BaseTx, TransferableOutput, Tx, UnsignedTx};
    use utxo_vm::vm::{Genesis, GenesisAsset, GenesisState, Holder};
    use utxo_vm::{ChainContext, Id, ShortId, Utxo, VmState};

    fn alice() -> Keypair {
        Keypair::from_seed(&[7u8; 32])
    }

    fn bob() -> Keypair {
        Keypair::from_seed(&[8u8; 32])
    }

    fn boot() -> (SharedVm, mpsc::Receiver<EngineMessage>, NodeMetrics) {
        let genesis = Genesis {
            assets: vec![GenesisAsset {
                alias: "FEE".into(),
                name: "fee coin".into(),
                symbol: "FEE".into(),
                denomination: 0,
                memo: String::new(),
                initial_state: GenesisState {
                    fixed_cap: vec![Holder {
                        amount: 100,
                        address: alice().address().to_hex(),
                    }],
                    ..GenesisState::default()
                },
            }],
        };
        let metrics = NodeMetrics::new().unwrap();
        let (tx, rx) = mpsc::channel(8);
        let vm = Vm::initialize(
            ChainContext {
                network_id: 1,
                chain_id: Id::EMPTY,
                fee_asset_id: Id::EMPTY,
            },
            Arc::new(MemDb::new()),
            &genesis.to_json().unwrap(),
            b"",
            default_fxs(),
            tx,
            metrics.registry(),
        )
        .unwrap();
        vm.lock().set_state(VmState::NormalOp).unwrap();
        (vm, rx, metrics)
    }

    fn pay(vm: &Vm, utxos: &[Utxo], kc: &Keychain, amount: u64, to: ShortId, change: ShortId) -> Tx {
        let fee = vm.fee_asset_id();
        let selection = vm.spend(utxos, kc, &BTreeMap::from([(fee, amount)])).unwrap();
        let spent = selection.amounts_spent[&fee];
        let out = |amount, owner| TransferableOutput {
            asset_id: fee,
            out: Output::KeyTransfer(TransferOutput {
                amount,
                owners: OutputOwners::single(owner),
            }),
        };
        let mut outs = vec![out(amount, to)];
        if spent > amount {
            outs.push(out(spent - amount, change));
        }
        sort_outputs(&mut outs, vm.parser()).unwrap();
        let unsigned = UnsignedTx::Base(BaseTx {
            network_id: 1,
            chain_id: Id::EMPTY,
            outs,
            ins: selection.ins,
            memo: vec![],
        });
        Tx::sign(vm.parser(), unsigned, &selection.signers).unwrap()
    }

    fn shutdown(vm: &SharedVm) {
        let mut guard = vm.lock();
        Vm::shutdown(&mut guard).unwrap();
    }

    #[test]
    fn empty_batch_decides_nothing() {
        let (vm, _rx, metrics) = boot();
        let engine = AutoEngine::new(vm.clone(), metrics.clone());
        assert_eq!(engine.decide_pending().unwrap(), BatchOutcome::default());
        assert_eq!(metrics.batches_pulled.get(), 1);
        shutdown(&vm);
    }

    #[test]
    fn child_after_parent_in_one_batch_both_accepted() {
        let (vm, _rx, metrics) = boot();
        let kc = Keychain::from_keys([alice()]);
        {
            let mut guard = vm.lock();
            let utxos = guard.load_utxos(&kc).unwrap();
            let parent = pay(&guard, &utxos, &kc, 60, alice().address(), alice().address());
            guard.issue_tx(parent.bytes()).unwrap();
            let child = pay(&guard, &parent.utxos(), &kc, 25, bob().address(), alice().address());
            guard.issue_tx(child.bytes()).unwrap();
        }

        let engine = AutoEngine::new(vm.clone(), metrics.clone());
        let outcome = engine.decide_pending().unwrap();
        assert_eq!(outcome, BatchOutcome { accepted: 2, rejected: 0 });

        let bob_utxos = vm.lock().utxos_for_addresses(&[bob().address()]).unwrap();
        assert_eq!(bob_utxos.len(), 1);
        assert_eq!(bob_utxos[0].out.amount(), Some(25));
        assert_eq!(metrics.txs_accepted.get(), 2);
        shutdown(&vm);
    }

    #[test]
    fn double_spend_second_is_rejected() {
        let (vm, _rx, metrics) = boot();
        let kc = Keychain::from_keys([alice()]);
        {
            let mut guard = vm.lock();
            let utxos = guard.load_utxos(&kc).unwrap();
            let first = pay(&guard, &utxos, &kc, 10, bob().address(), alice().address());
            let second = pay(&guard, &utxos, &kc, 20, bob().address(), alice().address());
            guard.issue_tx(first.bytes()).unwrap();
            guard.issue_tx(second.bytes()).unwrap();
        }

        let engine = AutoEngine::new(vm.clone(), metrics);
        let outcome = engine.decide_pending().unwrap();
        assert_eq!(outcome, BatchOutcome { accepted: 1, rejected: 1 });
        shutdown(&vm);
    }

    #[tokio::test]
    async fn run_loop_stops_on_shutdown() {
        let (vm, rx, metrics) = boot();
        let (stop_tx, stop_rx) = watch::channel(false);
        let engine = AutoEngine::new(vm.clone(), metrics);
        let handle = tokio::spawn(engine.run(rx, stop_rx));
        stop_tx.send(true).unwrap();
        handle.await.unwrap();
        shutdown(&vm);
    }
}
