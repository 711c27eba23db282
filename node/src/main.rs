// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # UTXO VM Node
//!
//! Entry point for the `utxo-vm-node` binary. Parses CLI arguments,
//! initializes logging and metrics, boots the VM over a sled database and
//! drives it with the local auto-accepting engine.
//!
//! The binary supports three subcommands:
//!
//! - `run`: start the VM, the engine and stdin intake
//! - `init`: create a data directory, a key and a genesis funding it
//! - `version`: print build version information

mod cli;
mod engine;
mod logging;
mod metrics;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::{mpsc, watch};

use utxo_vm::crypto::Keypair;
use utxo_vm::fxs::default_fxs;
use utxo_vm::state::SledDb;
use utxo_vm::vm::{Genesis, GenesisAsset, GenesisState, Holder, Minters};
use utxo_vm::{ChainContext, Id, SharedVm, Vm, VmState};

use cli::{Commands, NodeCli};
use engine::AutoEngine;
use logging::LogFormat;
use metrics::NodeMetrics;

/// Capacity of the VM-to-engine channel. Signals only say "look at the
/// pending set", so a handful is plenty.
const ENGINE_CHANNEL_CAPACITY: usize = 16;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = NodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Boots the VM and serves stdin until a shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "utxo_vm_node=info,utxo_vm=info",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        network_id = args.network_id,
        data_dir = %args.data_dir.display(),
        "starting utxo-vm-node"
    );

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let db = Arc::new(
        SledDb::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?,
    );
    tracing::info!(path = %db_path.display(), "database opened");

    // --- Genesis & config ---
    let genesis_path = args
        .genesis
        .clone()
        .unwrap_or_else(|| args.data_dir.join("genesis.json"));
    let genesis_bytes = read_file(&genesis_path, "genesis")?;
    let config_bytes = match &args.config {
        Some(path) => read_file(path, "config")?,
        None => Vec::new(),
    };
    let chain_id = match &args.chain_id {
        Some(hex) => Id::from_str(hex).map_err(|e| anyhow::anyhow!("invalid chain id: {}", e))?,
        None => Id::EMPTY,
    };

    // --- Metrics ---
    let node_metrics = NodeMetrics::new().context("failed to register node metrics")?;

    // --- VM ---
    let (to_engine, from_vm) = mpsc::channel(ENGINE_CHANNEL_CAPACITY);
    let vm = Vm::initialize(
        ChainContext {
            network_id: args.network_id,
            chain_id,
            fee_asset_id: Id::EMPTY,
        },
        db,
        &genesis_bytes,
        &config_bytes,
        default_fxs(),
        to_engine,
        node_metrics.registry(),
    )
    .context("failed to initialize VM")?;
    {
        let mut guard = vm.lock();
        guard.set_state(VmState::Bootstrapping)?;
        // Nothing to replay without peers.
        guard.set_state(VmState::NormalOp)?;
        for (alias, asset_id) in guard.aliases() {
            tracing::info!(alias = %alias, asset = %asset_id, "genesis asset");
        }
    }

    // --- Engine ---
    let (stop_tx, stop_rx) = watch::channel(false);
    let engine = AutoEngine::new(Arc::clone(&vm), node_metrics.clone());
    let engine_task = tokio::spawn(engine.run(from_vm, stop_rx));

    // --- Intake ---
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => submit(&vm, &node_metrics, line.trim()),
                Ok(None) => {
                    tracing::info!("stdin closed, flushing pending transactions");
                    vm.lock().flush_txs();
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read stdin");
                    stdin_open = false;
                }
            },
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received");
                break;
            }
        }
    }

    // --- Shutdown ---
    let _ = stop_tx.send(true);
    if let Err(e) = engine_task.await {
        tracing::error!(error = %e, "engine task failed");
    }
    {
        let mut guard = vm.lock();
        Vm::shutdown(&mut guard).context("VM shutdown failed")?;
    }
    if let Some(path) = &args.metrics_file {
        std::fs::write(path, node_metrics.encode()?)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
        tracing::info!(path = %path.display(), "metrics written");
    }

    tracing::info!("utxo-vm-node stopped");
    Ok(())
}

/// Issues one hex-encoded transaction and prints its ID on success.
fn submit(vm: &SharedVm, metrics: &NodeMetrics, line: &str) {
    if line.is_empty() || line.starts_with('#') {
        return;
    }
    let bytes = match hex::decode(line) {
        Ok(bytes) => bytes,
        Err(e) => {
            metrics.submissions_refused.inc();
            tracing::warn!(error = %e, "submission is not hex");
            return;
        }
    };
    match vm.lock().issue_tx(&bytes) {
        Ok(tx_id) => println!("{}", tx_id),
        Err(e) => {
            metrics.submissions_refused.inc();
            tracing::warn!(error = %e, "transaction refused");
        }
    }
}

fn read_file(path: &Path, what: &str) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {} file {}", what, path.display()))
}

/// Initializes a data directory: a fresh key, and a genesis whose fee asset
/// is held and mintable by that key.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("utxo_vm_node=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing node");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let keypair = Keypair::generate();
    let address = keypair.address().to_hex();

    let key_path = data_dir.join("owner.key");
    std::fs::write(&key_path, hex::encode(keypair.secret_key_bytes()))
        .with_context(|| format!("failed to write key to {}", key_path.display()))?;

    // Restrict permissions on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o600))?;
    }

    let genesis = Genesis {
        assets: vec![GenesisAsset {
            alias: args.alias.clone(),
            name: format!("{} token", args.alias),
            symbol: args.alias.chars().take(4).collect::<String>().to_uppercase(),
            denomination: 0,
            memo: String::new(),
            initial_state: GenesisState {
                fixed_cap: vec![Holder {
                    amount: args.supply,
                    address: address.clone(),
                }],
                variable_cap: vec![Minters {
                    minters: vec![address.clone()],
                    threshold: 1,
                }],
                ..GenesisState::default()
            },
        }],
    };
    let genesis_path = data_dir.join("genesis.json");
    std::fs::write(&genesis_path, genesis.to_json()?)
        .with_context(|| format!("failed to write genesis to {}", genesis_path.display()))?;

    tracing::info!(address = %address, key_path = %key_path.display(), "owner key generated");

    println!("Node initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Genesis        : {}", genesis_path.display());
    println!("  Owner key      : {}", key_path.display());
    println!("  Owner address  : {}", address);

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("utxo-vm-node {}", env!("CARGO_PKG_VERSION"));
    println!("vm           {}", utxo_vm::config::VM_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler can't be
/// installed, that signal is simply never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
