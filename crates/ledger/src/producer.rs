//! Block Producer - turns leader tokens into committed blocks
//!
//! Leader tokens arrive on a bounded queue and are applied to the ledger one
//! at a time, in arrival order. Every commit is announced to subscribers.

use crate::block::Block;
use crate::chain::Ledger;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Default capacity of the leader token queue
pub const TRIGGER_QUEUE_CAPACITY: usize = 64;

/// Default capacity of the block update broadcast
pub const UPDATE_CAPACITY: usize = 64;

/// External trigger asking for a new block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderToken {
    /// Opaque identity of the leader, recorded as the block producer
    pub leader: String,
    /// Transactions the new block accounts for
    pub transaction_count: u64,
}

impl LeaderToken {
    pub fn new(leader: impl Into<String>, transaction_count: u64) -> Self {
        Self {
            leader: leader.into(),
            transaction_count,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerError {
    #[error("block producer is not running")]
    Closed,
}

/// Block update event sent to subscribers
#[derive(Clone, Debug)]
pub struct BlockUpdate {
    /// The block that was just committed
    pub block: Block,
    /// Chain length after the commit
    pub chain_len: usize,
}

/// Block producer configuration
#[derive(Clone, Debug)]
pub struct BlockProducerConfig {
    /// Capacity of the leader token queue
    pub queue_capacity: usize,
    /// Capacity of the update broadcast
    pub update_capacity: usize,
}

impl Default for BlockProducerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: TRIGGER_QUEUE_CAPACITY,
            update_capacity: UPDATE_CAPACITY,
        }
    }
}

/// Handle for submitting leader tokens to the block producer
#[derive(Clone)]
pub struct TriggerSender {
    sender: mpsc::Sender<LeaderToken>,
}

impl TriggerSender {
    /// Queue a token, waiting for room if the queue is full
    pub async fn send(&self, token: LeaderToken) -> Result<(), TriggerError> {
        self.sender
            .send(token)
            .await
            .map_err(|_| TriggerError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Block Producer
///
/// Sole consumer of leader tokens; calls [`Ledger::append`] for each one.
pub struct BlockProducer {
    /// Shared ledger
    ledger: Arc<Ledger>,
    /// Token receiver
    trigger_rx: mpsc::Receiver<LeaderToken>,
    /// Token sender (for cloning)
    trigger_tx: mpsc::Sender<LeaderToken>,
    /// Block update broadcaster
    update_sender: broadcast::Sender<BlockUpdate>,
}

impl BlockProducer {
    /// Create a new block producer
    pub fn new(ledger: Arc<Ledger>, config: BlockProducerConfig) -> Self {
        let (trigger_tx, trigger_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (update_sender, _) = broadcast::channel(config.update_capacity.max(1));

        Self {
            ledger,
            trigger_rx,
            trigger_tx,
            update_sender,
        }
    }

    /// Get a sender for submitting leader tokens
    pub fn trigger_sender(&self) -> TriggerSender {
        TriggerSender {
            sender: self.trigger_tx.clone(),
        }
    }

    /// Subscribe to block updates
    pub fn subscribe(&self) -> broadcast::Receiver<BlockUpdate> {
        self.update_sender.subscribe()
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Consume tokens until cancelled or every [`TriggerSender`] is dropped.
    pub async fn run(self, shutdown: CancellationToken) {
        let Self {
            ledger,
            mut trigger_rx,
            trigger_tx,
            update_sender,
        } = self;
        // Only external senders keep the queue open from here on.
        drop(trigger_tx);

        tracing::info!("Block producer started at height {}", ledger.len());

        loop {
            let token = tokio::select! {
                _ = shutdown.cancelled() => break,
                token = trigger_rx.recv() => match token {
                    Some(token) => token,
                    None => {
                        tracing::debug!("Trigger channel closed");
                        break;
                    }
                },
            };
            produce(&ledger, &update_sender, token);
        }

        tracing::info!("Block producer stopped at height {}", ledger.len());
    }
}

/// Apply one token to the ledger, returning the committed block if any.
fn produce(
    ledger: &Ledger,
    update_sender: &broadcast::Sender<BlockUpdate>,
    token: LeaderToken,
) -> Option<Block> {
    if token.leader.is_empty() {
        tracing::trace!("Ignoring empty leader token");
        return None;
    }

    if !ledger.append(&token.leader, token.transaction_count) {
        tracing::warn!("Block from leader {} was not committed", token.leader);
        return None;
    }

    let block = ledger.tail();
    let chain_len = ledger.len();
    match serde_json::to_string(&block) {
        Ok(json) => tracing::info!("Committed block {}", json),
        Err(_) => tracing::info!("Committed block {} ({})", block.sequence, block.hash),
    }

    // Broadcast to subscribers (ignore errors if no subscribers)
    let _ = update_sender.send(BlockUpdate {
        block: block.clone(),
        chain_len,
    });
    Some(block)
}
