//! # Virtual Machine
//!
//! The `Vm` ties the pieces together: it parses transaction bytes into
//! canonical [`UniqueTx`] views, verifies them against committed state and
//! against still-undecided ancestors, hands verified transactions to the
//! consensus engine in batches, and applies the engine's decisions.
//!
//! ```text
//! bytes ─ parse_tx ─▶ UniqueTx ─ verify_tx ─▶ scheduler ─ PendingTxs ─▶ engine
//!                                                              │
//!                  accept_tx / reject_tx ◀──── pending_txs ◀───┘
//! ```
//!
//! ## Design Decisions
//!
//! - **Host-owned lock**: the VM is not internally synchronized. The host
//!   shares it as [`SharedVm`] and every call happens under that mutex. The
//!   batch timer thread takes the same lock to flush.
//! - **Iterative ancestor walk**: a transaction may spend outputs of a
//!   parent that is still processing. Parents are verified first, in a
//!   post-order walk over an explicit stack, so a long chain of unconfirmed
//!   spends can't exhaust the call stack.
//! - **Failures stay local**: a transaction that fails verification affects
//!   nothing else. An ancestor that fails just makes its outputs unavailable,
//!   unless the failure came from storage, which aborts the whole check.

pub mod asset_cache;
pub mod clock;
pub mod dedup;
pub mod error;
pub mod genesis;
pub mod metrics;
pub mod scheduler;
pub mod spend;
pub mod timer;
pub mod unique_tx;

pub use asset_cache::AssetCapabilities;
pub use clock::Clock;
pub use dedup::{Lookup, TxDeduplicator};
pub use error::VmError;
pub use genesis::{Genesis, GenesisAsset, GenesisState, Holder, Minters, NftGroup};
pub use metrics::VmMetrics;
pub use scheduler::{BatchScheduler, EngineMessage};
pub use spend::{OperationSelection, Selection};
pub use timer::Timer;
pub use unique_tx::UniqueTx;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use prometheus::Registry;
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, warn};

use crate::config::{VmConfig, VM_VERSION};
use crate::fxs::{Fx, FxContext, FxRegistry, Keychain, Output, ValueKind};
use crate::ids::{Id, ShortId};
use crate::state::{Database, DbResult, State, Status};
use crate::txs::{Parser, SyntaxContext, Tx, UnsignedTx};
use crate::utxo::{Utxo, UtxoId};

/// The VM as the host shares it.
pub type SharedVm = Arc<Mutex<Vm>>;

/// Lifecycle phase reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    /// Replaying history from the network. Signatures aren't checked and
    /// new transactions aren't accepted from clients.
    Bootstrapping,
    NormalOp,
}

/// Identity of the chain this VM runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainContext {
    pub network_id: u32,
    pub chain_id: Id,
    /// Fee asset used when the genesis lists no assets.
    pub fee_asset_id: Id,
}

pub struct Vm {
    ctx: ChainContext,
    config: VmConfig,
    parser: Parser,
    state: State,
    fxs: FxRegistry,
    txs: TxDeduplicator,
    assets: AssetCapabilities,
    scheduler: BatchScheduler,
    metrics: VmMetrics,
    clock: Clock,
    fee_asset_id: Id,
    aliases: HashMap<String, Id>,
    bootstrapped: bool,
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("ctx", &self.ctx)
            .field("fee_asset_id", &self.fee_asset_id)
            .field("bootstrapped", &self.bootstrapped)
            .field("cached_txs", &self.txs.len())
            .field("pending", &self.scheduler.pending_len())
            .finish_non_exhaustive()
    }
}

impl Vm {
    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Builds the VM, loads genesis and starts the batch timer.
    ///
    /// `config_bytes` is a JSON [`VmConfig`] (blank for defaults);
    /// `genesis_bytes` is a JSON [`Genesis`]. The genesis UTXOs are written
    /// only the first time a given database is initialized.
    pub fn initialize(
        ctx: ChainContext,
        db: Arc<dyn Database>,
        genesis_bytes: &[u8],
        config_bytes: &[u8],
        fxs: Vec<Box<dyn Fx>>,
        to_engine: Sender<EngineMessage>,
        registry: &Registry,
    ) -> Result<SharedVm, VmError> {
        let config = VmConfig::from_json(config_bytes)?;
        let parser = Parser::new(config.max_tx_size);
        let fxs = FxRegistry::new(fxs)?;
        let metrics = VmMetrics::new(registry)?;
        let scheduler = BatchScheduler::new(
            config.batch_size,
            config.batch_timeout(),
            to_engine,
            metrics.clone(),
        );

        let mut vm = Vm {
            ctx,
            parser,
            state: State::new(db, parser),
            fxs,
            txs: TxDeduplicator::new(config.dedup_cache_size),
            assets: AssetCapabilities::new(config.asset_cache_size),
            scheduler,
            metrics,
            clock: Clock::new(),
            fee_asset_id: ctx.fee_asset_id,
            aliases: HashMap::new(),
            bootstrapped: false,
            config,
        };
        vm.init_genesis(genesis_bytes)?;

        let shared = Arc::new(Mutex::new(vm));
        let weak = Arc::downgrade(&shared);
        let timer = Timer::spawn("vm-batch-timer", move || {
            if let Some(vm) = weak.upgrade() {
                vm.lock().flush_txs();
            }
        })?;
        shared.lock().scheduler.set_timer(timer);

        info!(
            version = VM_VERSION,
            network_id = ctx.network_id,
            chain_id = %ctx.chain_id,
            "VM initialized"
        );
        Ok(shared)
    }

    fn init_genesis(&mut self, genesis_bytes: &[u8]) -> Result<(), VmError> {
        let genesis = Genesis::from_json(genesis_bytes)?;
        let initialized = self.state.is_initialized()?;
        let assets = genesis.build(&self.parser, self.ctx.network_id, self.ctx.chain_id)?;

        for (index, (alias, tx)) in assets.into_iter().enumerate() {
            let asset_id = tx.id();
            if self.aliases.insert(alias.clone(), asset_id).is_some() {
                return Err(VmError::Genesis(format!("duplicate alias '{}'", alias)));
            }
            if !initialized {
                self.init_asset(&tx)?;
            }
            if index == 0 {
                info!(alias = %alias, asset = %asset_id, "fee payments use this asset");
                self.fee_asset_id = asset_id;
            }
        }

        if !initialized {
            self.state.set_initialized();
            self.state.commit()?;
        }
        Ok(())
    }

    fn init_asset(&mut self, tx: &Tx) -> DbResult<()> {
        info!(asset = %tx.id(), "initializing genesis asset");
        self.state.put_tx(tx);
        self.state.set_status(&tx.id(), Status::Accepted);
        for utxo in tx.utxos() {
            self.state.put_utxo(&utxo)?;
        }
        Ok(())
    }

    /// Moves between bootstrapping and normal operation, telling every
    /// extension.
    pub fn set_state(&mut self, state: VmState) -> Result<(), VmError> {
        match state {
            VmState::Bootstrapping => {
                self.fxs.bootstrapping()?;
                self.bootstrapped = false;
            }
            VmState::NormalOp => {
                self.fxs.bootstrapped()?;
                self.bootstrapped = true;
            }
        }
        info!(state = ?state, "VM state changed");
        Ok(())
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// Stops the batch timer and flushes storage.
    ///
    /// The timer thread flushes under the host lock, so joining it while
    /// holding that lock would deadlock. This releases `guard` for the join
    /// and takes it back afterwards.
    pub fn shutdown(guard: &mut MutexGuard<'_, Vm>) -> Result<(), VmError> {
        if let Some(timer) = guard.scheduler.take_timer() {
            MutexGuard::unlocked(guard, || timer.stop());
        }
        guard.state.flush()?;
        info!("VM shut down");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Engine-facing API
    // -----------------------------------------------------------------------

    /// Decodes `bytes` and returns the canonical view of the transaction.
    ///
    /// A transaction seen for the first time is stored as processing before
    /// this returns.
    pub fn parse_tx(&mut self, bytes: &[u8]) -> Result<Arc<UniqueTx>, VmError> {
        let tx = self.parser.parse_tx(bytes)?;
        self.metrics.txs_parsed.inc();

        let utx = self.refresh(UniqueTx::with_tx(tx))?;
        self.syntactic_verify(&utx)?;

        if utx.status() == Status::Unknown {
            let tx = body(&utx)?;
            self.state.put_tx(&tx);
            self.state.set_status(&utx.id(), Status::Processing);
            if let Err(e) = self.state.commit() {
                self.state.abort();
                return Err(e.into());
            }
            utx.set_status(Status::Processing);
            debug!(tx_id = %utx.id(), "stored new transaction");
        }
        Ok(utx)
    }

    /// Looks a transaction up by ID and re-verifies it, since its cached
    /// view may have been evicted since it was last checked.
    pub fn get_tx(&mut self, tx_id: &Id) -> Result<Arc<UniqueTx>, VmError> {
        let utx = self.refresh(UniqueTx::new(*tx_id))?;
        self.verify_without_issuing(&utx)?;
        Ok(utx)
    }

    /// Verifies `utx` and queues it for the next batch.
    ///
    /// This is the only path that sets the verified flag; a flagged
    /// transaction is already queued and is not queued again.
    pub fn verify_tx(&mut self, utx: &Arc<UniqueTx>) -> Result<(), VmError> {
        if utx.is_verified() {
            return Ok(());
        }
        self.verify_without_issuing(utx)?;
        utx.mark_verified();
        self.scheduler.issue(utx.clone());
        Ok(())
    }

    /// Drains everything waiting for the engine.
    pub fn pending_txs(&mut self) -> Vec<Arc<UniqueTx>> {
        self.scheduler.pull()
    }

    /// Signals the engine if anything is pending. Called by the batch timer.
    pub fn flush_txs(&mut self) {
        self.scheduler.flush();
    }

    pub fn issue_stop_vertex(&mut self) {
        self.scheduler.stop_vertex();
    }

    /// Applies an accepted transaction: consumed UTXOs go, produced ones
    /// appear, and the status becomes final, all in one commit.
    pub fn accept_tx(&mut self, utx: &Arc<UniqueTx>) -> Result<(), VmError> {
        let tx = self.decidable(utx)?;
        if let Err(e) = self.apply_accept(&tx) {
            self.state.abort();
            return Err(e.into());
        }
        utx.set_status(Status::Accepted);
        self.metrics.txs_accepted.inc();
        info!(tx_id = %utx.id(), "transaction accepted");
        Ok(())
    }

    fn apply_accept(&mut self, tx: &Tx) -> DbResult<()> {
        for utxo_id in tx.unsigned.input_utxos() {
            self.state.delete_utxo(&utxo_id)?;
        }
        for utxo in tx.utxos() {
            self.state.put_utxo(&utxo)?;
        }
        self.state.set_status(&tx.id(), Status::Accepted);
        self.state.commit()
    }

    pub fn reject_tx(&mut self, utx: &Arc<UniqueTx>) -> Result<(), VmError> {
        self.decidable(utx)?;
        self.state.set_status(&utx.id(), Status::Rejected);
        if let Err(e) = self.state.commit() {
            self.state.abort();
            return Err(e.into());
        }
        utx.set_status(Status::Rejected);
        self.metrics.txs_rejected.inc();
        info!(tx_id = %utx.id(), "transaction rejected");
        Ok(())
    }

    fn decidable(&self, utx: &UniqueTx) -> Result<Arc<Tx>, VmError> {
        let status = utx.status();
        if status != Status::Processing {
            return Err(VmError::NotProcessing {
                id: utx.id(),
                status,
            });
        }
        body(utx)
    }

    /// Transactions `utx` can't be accepted before: the sources of its
    /// inputs and the creators of the assets it consumes.
    pub fn dependencies(&mut self, utx: &UniqueTx) -> Result<Vec<Arc<UniqueTx>>, VmError> {
        let Some(tx) = utx.tx() else {
            return Ok(Vec::new());
        };
        let mut seen = BTreeSet::new();
        let mut deps = Vec::new();
        let sources = tx.unsigned.input_utxos().into_iter().map(|u| u.tx_id);
        for dep_id in sources.chain(tx.unsigned.consumed_asset_ids()) {
            if seen.insert(dep_id) {
                deps.push(self.refresh(UniqueTx::new(dep_id))?);
            }
        }
        Ok(deps)
    }

    // -----------------------------------------------------------------------
    // Client-facing API
    // -----------------------------------------------------------------------

    /// Parses, verifies and queues a client transaction.
    pub fn issue_tx(&mut self, bytes: &[u8]) -> Result<Id, VmError> {
        if !self.bootstrapped {
            return Err(VmError::Bootstrapping);
        }
        let utx = self.parse_tx(bytes)?;
        self.verify_tx(&utx)?;
        Ok(utx.id())
    }

    /// A committed UTXO. Outputs of undecided transactions aren't visible.
    pub fn get_utxo(&self, utxo_id: &UtxoId) -> Result<Option<Utxo>, VmError> {
        Ok(self.state.get_utxo(utxo_id)?)
    }

    pub fn utxos_for_addresses(&self, addrs: &[ShortId]) -> Result<Vec<Utxo>, VmError> {
        Ok(self.state.utxos_for_addresses(addrs)?)
    }

    /// Every committed UTXO the keychain holds a key for.
    pub fn load_utxos(&self, keychain: &Keychain) -> Result<Vec<Utxo>, VmError> {
        self.utxos_for_addresses(&keychain.addresses())
    }

    /// Resolves a genesis alias, or failing that a hex asset ID.
    pub fn lookup_asset_id(&self, asset: &str) -> Result<Id, VmError> {
        if let Some(id) = self.aliases.get(asset) {
            return Ok(*id);
        }
        Id::from_str(asset).map_err(|_| VmError::UnknownAsset(asset.to_string()))
    }

    pub fn aliases(&self) -> &HashMap<String, Id> {
        &self.aliases
    }

    // -- coin selection, timed by the VM clock ------------------------------

    pub fn spend(
        &self,
        utxos: &[Utxo],
        keychain: &Keychain,
        amounts: &BTreeMap<Id, u64>,
    ) -> Result<Selection, VmError> {
        spend::spend(utxos, keychain, amounts, self.clock.unix())
    }

    pub fn spend_all(&self, utxos: &[Utxo], keychain: &Keychain) -> Result<Selection, VmError> {
        spend::spend_all(utxos, keychain, self.clock.unix())
    }

    pub fn spend_nft(
        &self,
        utxos: &[Utxo],
        keychain: &Keychain,
        asset_id: Id,
        group_id: u32,
        to: ShortId,
    ) -> Result<OperationSelection, VmError> {
        spend::spend_nft(
            utxos,
            keychain,
            asset_id,
            group_id,
            to,
            self.clock.unix(),
            &self.parser,
        )
    }

    pub fn mint(
        &self,
        utxos: &[Utxo],
        keychain: &Keychain,
        amounts: &BTreeMap<Id, u64>,
        to: ShortId,
    ) -> Result<OperationSelection, VmError> {
        spend::mint(utxos, keychain, amounts, to, self.clock.unix(), &self.parser)
    }

    pub fn mint_nft(
        &self,
        utxos: &[Utxo],
        keychain: &Keychain,
        asset_id: Id,
        payload: Vec<u8>,
        to: ShortId,
    ) -> Result<OperationSelection, VmError> {
        spend::mint_nft(
            utxos,
            keychain,
            asset_id,
            payload,
            to,
            self.clock.unix(),
            &self.parser,
        )
    }

    // -- accessors ----------------------------------------------------------

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn chain(&self) -> &ChainContext {
        &self.ctx
    }

    pub fn fee_asset_id(&self) -> Id {
        self.fee_asset_id
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Live entries in the deduplicator.
    pub fn cached_txs(&self) -> usize {
        self.txs.len()
    }

    pub fn metrics(&self) -> &VmMetrics {
        &self.metrics
    }

    // -----------------------------------------------------------------------
    // Verification
    // -----------------------------------------------------------------------

    /// Returns the canonical view for `candidate`'s ID, filling in its body
    /// and status from storage when the cache doesn't have them.
    fn refresh(&mut self, candidate: UniqueTx) -> Result<Arc<UniqueTx>, VmError> {
        self.metrics.tx_refreshes.inc();
        let (utx, lookup) = self.txs.deduplicate(Arc::new(candidate));
        match lookup {
            Lookup::Hit => self.metrics.tx_refresh_hits.inc(),
            Lookup::Miss => self.metrics.tx_refresh_misses.inc(),
        }
        self.metrics.dedup_size.set(self.txs.len() as i64);

        let id = utx.id();
        if utx.tx().is_none() {
            if let Some(tx) = self.state.get_tx(&id)? {
                utx.set_tx_if_missing(Arc::new(tx));
            }
        }
        if utx.status() == Status::Unknown {
            let status = self.state.status(&id)?;
            if status != Status::Unknown {
                utx.set_status(status);
            }
        }
        Ok(utx)
    }

    fn syntax_context(&self) -> SyntaxContext<'_> {
        SyntaxContext {
            parser: &self.parser,
            network_id: self.ctx.network_id,
            chain_id: self.ctx.chain_id,
            fee_asset_id: self.fee_asset_id,
            tx_fee: self.config.tx_fee,
            create_asset_tx_fee: self.config.create_asset_tx_fee,
            num_fxs: self.fxs.len(),
        }
    }

    fn syntactic_verify(&self, utx: &UniqueTx) -> Result<(), VmError> {
        if let Some(verdict) = utx.syntax() {
            return Ok(verdict?);
        }
        let tx = body(utx)?;
        let verdict = tx.verify_syntax(&self.syntax_context());
        utx.set_syntax(verdict.clone());
        Ok(verdict?)
    }

    /// Full verification without queueing for consensus. Ignores and never
    /// sets the verified flag.
    fn verify_without_issuing(&mut self, utx: &Arc<UniqueTx>) -> Result<(), VmError> {
        match utx.status() {
            Status::Unknown => Err(VmError::UnknownTx(utx.id())),
            Status::Accepted => Ok(()),
            Status::Rejected => Err(VmError::RejectedTx(utx.id())),
            Status::Processing => self.semantic_verify(utx),
        }
    }

    /// Verifies `root` against state, first verifying every processing
    /// ancestor whose outputs it spends.
    ///
    /// Post-order walk over an explicit stack. Each transaction is visited
    /// once; an ancestor that is decided, unknown or invalid simply doesn't
    /// contribute outputs, so spends from it fail with `MissingUtxo`.
    /// Ancestors are always checked afresh against current state and leave
    /// no trace on their cached view. Storage failures abort the walk.
    fn semantic_verify(&mut self, root: &Arc<UniqueTx>) -> Result<(), VmError> {
        self.syntactic_verify(root)?;
        let _timer = self.metrics.verify_seconds.start_timer();

        // Undecided, verified ancestors whose outputs may be spent.
        let mut sources: HashMap<Id, Arc<Tx>> = HashMap::new();
        let mut visited: HashSet<Id> = HashSet::new();
        let mut stack: Vec<(Arc<UniqueTx>, bool)> = vec![(root.clone(), false)];

        while let Some((utx, expanded)) = stack.pop() {
            let is_root = Arc::ptr_eq(&utx, root);

            if expanded {
                let tx = body(&utx)?;
                match self.verify_semantics(&tx, &sources) {
                    Ok(()) => {
                        sources.insert(utx.id(), tx);
                    }
                    Err(e) if is_root => return Err(e),
                    Err(e @ VmError::Db(_)) => return Err(e),
                    Err(e) => debug!(tx_id = %utx.id(), error = %e, "ancestor failed verification"),
                }
                continue;
            }

            if !visited.insert(utx.id()) {
                continue;
            }
            if !is_root {
                if utx.status() != Status::Processing || self.syntactic_verify(&utx).is_err() {
                    continue;
                }
            }
            let tx = match body(&utx) {
                Ok(tx) => tx,
                Err(e) if is_root => return Err(e),
                Err(_) => continue,
            };

            stack.push((utx, true));
            for utxo_id in tx.unsigned.input_utxos() {
                if visited.contains(&utxo_id.tx_id) || self.state.get_utxo(&utxo_id)?.is_some() {
                    continue;
                }
                let parent = self.refresh(UniqueTx::new(utxo_id.tx_id))?;
                stack.push((parent, false));
            }
        }
        Ok(())
    }

    /// Looks a consumed UTXO up in state, then among `sources`.
    fn resolve_utxo(
        &self,
        utxo_id: &UtxoId,
        sources: &HashMap<Id, Arc<Tx>>,
    ) -> Result<Utxo, VmError> {
        if let Some(utxo) = self.state.get_utxo(utxo_id)? {
            return Ok(utxo);
        }
        let parent = sources
            .get(&utxo_id.tx_id)
            .ok_or(VmError::MissingUtxo(*utxo_id))?;
        parent
            .utxos()
            .into_iter()
            .nth(utxo_id.output_index as usize)
            .ok_or(VmError::InvalidUtxo(*utxo_id))
    }

    fn fx_index(&self, kind: ValueKind) -> Result<usize, VmError> {
        self.fxs.index_of(kind).ok_or(VmError::UnknownFx(kind))
    }

    fn fx(&self, index: usize, kind: ValueKind) -> Result<&dyn Fx, VmError> {
        self.fxs.get(index).ok_or(VmError::UnknownFx(kind))
    }

    fn require_support(&mut self, asset: &Id, fx_index: usize) -> Result<(), VmError> {
        if self.assets.supports(&self.state, asset, fx_index)? {
            Ok(())
        } else {
            Err(VmError::IncompatibleFx {
                asset: *asset,
                fx_index,
            })
        }
    }

    fn verify_output(&mut self, asset: &Id, out: &Output) -> Result<(), VmError> {
        let fx_index = self.fx_index(out.kind())?;
        self.require_support(asset, fx_index)
    }

    /// Checks everything about `tx` that depends on state: the UTXOs it
    /// consumes, the extensions they belong to, and the outputs it creates.
    fn verify_semantics(
        &mut self,
        tx: &Tx,
        sources: &HashMap<Id, Arc<Tx>>,
    ) -> Result<(), VmError> {
        let ctx = FxContext {
            tx_hash: tx.signing_hash(),
            now: self.clock.unix(),
        };
        let base = tx.unsigned.base();

        for (input, cred) in base.ins.iter().zip(&tx.creds) {
            let utxo = self.resolve_utxo(&input.utxo_id, sources)?;
            let kind = cred.kind();
            let fx_index = self.fx_index(kind)?;
            if utxo.asset_id != input.asset_id {
                return Err(VmError::AssetIdMismatch {
                    expected: input.asset_id,
                    got: utxo.asset_id,
                });
            }
            self.require_support(&input.asset_id, fx_index)?;
            self.fx(fx_index, kind)?
                .verify_transfer(&ctx, &input.input, cred, &utxo.out)?;
        }

        match &tx.unsigned {
            UnsignedTx::Base(_) => {}
            UnsignedTx::CreateAsset(create) => {
                // The asset doesn't exist yet; its states must just match
                // the extension they claim.
                for state in &create.states {
                    for out in &state.outs {
                        let fx_index = self.fx_index(out.kind())?;
                        if fx_index != state.fx_index as usize {
                            return Err(VmError::IncompatibleFx {
                                asset: tx.id(),
                                fx_index,
                            });
                        }
                    }
                }
            }
            UnsignedTx::Operation(op_tx) => {
                let creds = tx.creds.get(base.ins.len()..).unwrap_or_default();
                for (op, cred) in op_tx.ops.iter().zip(creds) {
                    let mut utxos = Vec::with_capacity(op.utxo_ids.len());
                    for utxo_id in &op.utxo_ids {
                        let utxo = self.resolve_utxo(utxo_id, sources)?;
                        if utxo.asset_id != op.asset_id {
                            return Err(VmError::AssetIdMismatch {
                                expected: op.asset_id,
                                got: utxo.asset_id,
                            });
                        }
                        utxos.push(utxo);
                    }

                    let kind = op.op.kind();
                    let fx_index = self.fx_index(kind)?;
                    self.require_support(&op.asset_id, fx_index)?;
                    let consumed: Vec<&Output> = utxos.iter().map(|u| &u.out).collect();
                    self.fx(fx_index, kind)?
                        .verify_operation(&ctx, &op.op, cred, &consumed)?;

                    for out in op.op.outs() {
                        self.verify_output(&op.asset_id, &out)?;
                    }
                }
            }
        }

        for out in &base.outs {
            self.verify_output(&out.asset_id, &out.out)?;
        }
        Ok(())
    }
}

impl Drop for Vm {
    fn drop(&mut self) {
        if self.scheduler.pending_len() > 0 {
            warn!(
                pending = self.scheduler.pending_len(),
                "VM dropped with transactions still pending"
            );
        }
    }
}

fn body(utx: &UniqueTx) -> Result<Arc<Tx>, VmError> {
    utx.tx().ok_or(VmError::UnknownTx(utx.id()))
}
