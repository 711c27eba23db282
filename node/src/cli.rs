//! # CLI Interface
//!
//! Defines the command-line argument structure for `utxo-vm-node` using
//! `clap` derive. Supports three subcommands: `run`, `init`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// UTXO VM harness.
///
/// Runs the transaction VM over on-disk storage with a local engine that
/// accepts every valid batch. Transactions are read from stdin, one
/// hex-encoded transaction per line.
#[derive(Parser, Debug)]
#[command(
    name = "utxo-vm-node",
    about = "UTXO VM harness with an auto-accepting engine",
    version,
    propagate_version = true
)]
pub struct NodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the VM and the local engine.
    Run(RunArgs),
    /// Create a data directory with a fresh key and a genesis funding it.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Data directory holding the ledger database.
    #[arg(long, short = 'd', env = "UTXO_VM_DATA_DIR", default_value = "./utxo-vm-data")]
    pub data_dir: PathBuf,

    /// Genesis file (JSON). Defaults to `genesis.json` in the data directory.
    #[arg(long, short = 'g', env = "UTXO_VM_GENESIS")]
    pub genesis: Option<PathBuf>,

    /// VM config file (JSON, kebab-case keys). Defaults apply when omitted.
    #[arg(long, short = 'c', env = "UTXO_VM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Network ID transactions must carry.
    #[arg(long, env = "UTXO_VM_NETWORK_ID", default_value_t = utxo_vm::config::NETWORK_ID_DEVNET)]
    pub network_id: u32,

    /// Hex chain ID transactions must carry. All zeros when omitted.
    #[arg(long, env = "UTXO_VM_CHAIN_ID")]
    pub chain_id: Option<String>,

    /// Log format: `pretty` or `json`.
    #[arg(long, env = "UTXO_VM_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Write Prometheus text metrics here on shutdown.
    #[arg(long, env = "UTXO_VM_METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Data directory to initialize.
    #[arg(long, short = 'd', env = "UTXO_VM_DATA_DIR", default_value = "./utxo-vm-data")]
    pub data_dir: PathBuf,

    /// Alias of the genesis fee asset.
    #[arg(long, default_value = "FEE")]
    pub alias: String,

    /// Units of the fee asset credited to the generated key.
    #[arg(long, default_value_t = 1_000_000)]
    pub supply: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        NodeCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = NodeCli::parse_from(["utxo-vm-node", "run"]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.network_id, utxo_vm::config::NETWORK_ID_DEVNET);
                assert!(args.genesis.is_none());
                assert_eq!(args.log_format, "pretty");
            }
            other => panic!("expected run, got {:?}", other),
        }
    }
}
