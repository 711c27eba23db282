//! # VM Configuration & Constants
//!
//! Every magic number in the VM lives here. Consensus-relevant limits are
//! plain constants; operational knobs (batching, cache sizes, fees) have a
//! constant default and can be overridden per chain through [`VmConfig`],
//! which arrives as JSON bytes at initialization.
//!
//! Changing a consensus-relevant constant on a live chain forks it. Batching
//! and cache knobs are local and safe to tune.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Network Identifiers
// ---------------------------------------------------------------------------

pub const NETWORK_ID_MAINNET: u32 = 1;

pub const NETWORK_ID_TESTNET: u32 = 5;

/// Local networks. Reset whenever someone feels like it.
pub const NETWORK_ID_DEVNET: u32 = 12345;

/// Version string reported by the node binary.
pub const VM_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Transaction Limits (consensus-relevant)
// ---------------------------------------------------------------------------

/// Maximum encoded transaction size. Anything larger is refused before
/// decoding, so a hostile length prefix can't make us allocate the moon.
pub const MAX_TX_SIZE_BYTES: u64 = 64 * 1024;

/// Maximum memo length in bytes.
pub const MAX_MEMO_SIZE: usize = 256;

/// Asset name length bounds, in bytes.
pub const MIN_NAME_LEN: usize = 1;
pub const MAX_NAME_LEN: usize = 128;

/// Ticker symbols are short. Four uppercase letters, at most.
pub const MAX_SYMBOL_LEN: usize = 4;

/// Maximum number of decimal places an asset can declare.
pub const MAX_DENOMINATION: u8 = 32;

/// Maximum NFT payload in bytes. NFTs point at data; they aren't the data.
pub const MAX_NFT_PAYLOAD_SIZE: usize = 1024;

// ---------------------------------------------------------------------------
// Batching & Caches (local)
// ---------------------------------------------------------------------------

/// How long a validated transaction may wait before consensus is told about
/// it.
pub const BATCH_TIMEOUT: Duration = Duration::from_secs(1);

/// Number of transactions in one window that triggers an immediate flush.
pub const BATCH_SIZE: usize = 30;

/// Assets whose capability sets are memoized.
pub const ASSET_CACHE_SIZE: usize = 1024;

/// Live transaction objects kept by the deduplicator.
pub const DEDUP_CACHE_SIZE: usize = 8192;

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

/// Fee charged on every transaction, in the fee asset's smallest unit.
/// Zero on devnets so tests don't need change outputs.
pub const DEFAULT_TX_FEE: u64 = 0;

/// Fee charged on create-asset transactions.
pub const DEFAULT_CREATE_ASSET_TX_FEE: u64 = 0;

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Per-chain VM settings.
///
/// Every field is optional in the JSON; missing fields take the constant
/// defaults above. Keys are kebab-case:
///
/// ```json
/// { "batch-size": 10, "batch-timeout-ms": 250, "tx-fee": 1000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct VmConfig {
    pub batch_timeout_ms: u64,
    pub batch_size: usize,
    pub asset_cache_size: usize,
    pub dedup_cache_size: usize,
    pub max_tx_size: u64,
    pub tx_fee: u64,
    pub create_asset_tx_fee: u64,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            batch_timeout_ms: BATCH_TIMEOUT.as_millis() as u64,
            batch_size: BATCH_SIZE,
            asset_cache_size: ASSET_CACHE_SIZE,
            dedup_cache_size: DEDUP_CACHE_SIZE,
            max_tx_size: MAX_TX_SIZE_BYTES,
            tx_fee: DEFAULT_TX_FEE,
            create_asset_tx_fee: DEFAULT_CREATE_ASSET_TX_FEE,
        }
    }
}

impl VmConfig {
    /// Parses the config handed over at initialization. Empty bytes mean
    /// "all defaults".
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch-size must be > 0".into()));
        }
        if self.batch_timeout_ms == 0 {
            return Err(ConfigError::Invalid("batch-timeout-ms must be > 0".into()));
        }
        if self.asset_cache_size == 0 || self.dedup_cache_size == 0 {
            return Err(ConfigError::Invalid("cache sizes must be > 0".into()));
        }
        if self.max_tx_size == 0 {
            return Err(ConfigError::Invalid("max-tx-size must be > 0".into()));
        }
        Ok(())
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }
}
