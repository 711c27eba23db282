//! # Batch Scheduler
//!
//! Collects verified transactions and tells the engine when a batch is
//! ready to pull.
//!
//! ## Design Decisions
//!
//! - **Size or time, whichever first**: the first transaction of a window
//!   arms a timeout; the `batch_size`-th flushes immediately. Windows are
//!   counted separately from the pending list, so after a flush the next
//!   transaction starts a fresh window (and arms the timer) even if the
//!   engine hasn't pulled yet.
//! - **Signals, not data**: a flush sends a bare `PendingTxs` notification.
//!   The engine then calls `pending_txs()` to drain. Flushing never drops
//!   transactions, only notifications.
//! - **Never block the VM**: the signal goes out with `try_send`. A full
//!   channel drops it and re-arms the timeout for another attempt.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tracing::{debug, warn};

use super::metrics::VmMetrics;
use super::timer::Timer;
use super::unique_tx::UniqueTx;

/// Notifications the VM sends to the consensus engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMessage {
    /// Transactions are waiting in `pending_txs()`.
    PendingTxs,
    /// The engine should issue a stop vertex.
    StopVertex,
}

pub struct BatchScheduler {
    pending: Vec<Arc<UniqueTx>>,
    /// Transactions issued since the last flush or pull.
    window: usize,
    batch_size: usize,
    batch_timeout: Duration,
    timer: Option<Timer>,
    to_engine: Sender<EngineMessage>,
    metrics: VmMetrics,
}

impl BatchScheduler {
    pub fn new(
        batch_size: usize,
        batch_timeout: Duration,
        to_engine: Sender<EngineMessage>,
        metrics: VmMetrics,
    ) -> Self {
        Self {
            pending: Vec::new(),
            window: 0,
            batch_size: batch_size.max(1),
            batch_timeout,
            timer: None,
            to_engine,
            metrics,
        }
    }

    /// Installs the timer whose expiry calls back into [`Self::flush`].
    pub fn set_timer(&mut self, timer: Timer) {
        self.timer = Some(timer);
    }

    /// Removes the timer so the caller can stop it outside the host lock.
    pub fn take_timer(&mut self) -> Option<Timer> {
        self.timer.take()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn issue(&mut self, tx: Arc<UniqueTx>) {
        self.pending.push(tx);
        self.window += 1;
        if self.window >= self.batch_size {
            self.flush();
        } else if self.window == 1 {
            self.arm();
        }
    }

    /// Drains everything pending and starts a new window.
    pub fn pull(&mut self) -> Vec<Arc<UniqueTx>> {
        self.cancel();
        self.window = 0;
        mem::take(&mut self.pending)
    }

    /// Tells the engine there is something to pull.
    pub fn flush(&mut self) {
        self.cancel();
        self.window = 0;
        if self.pending.is_empty() {
            return;
        }
        match self.to_engine.try_send(EngineMessage::PendingTxs) {
            Ok(()) => self.metrics.batch_flushes.inc(),
            Err(TrySendError::Full(_)) => {
                debug!(
                    pending = self.pending.len(),
                    "dropping message to engine due to contention"
                );
                self.metrics.dropped_signals.inc();
                self.arm();
            }
            Err(TrySendError::Closed(_)) => {
                warn!(pending = self.pending.len(), "engine channel closed, cannot signal");
            }
        }
    }

    pub fn stop_vertex(&mut self) {
        match self.to_engine.try_send(EngineMessage::StopVertex) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("dropping stop vertex message to engine due to contention")
            }
            Err(TrySendError::Closed(_)) => warn!("engine channel closed, cannot send stop vertex"),
        }
    }

    fn arm(&self) {
        if let Some(timer) = &self.timer {
            timer.set_timeout(self.batch_timeout);
        }
    }

    fn cancel(&self) {
        if let Some(timer) = &self.timer {
            timer.cancel();
        }
    }
}
