//! The append-only chain
//!
//! All mutation goes through [`Ledger::append`], [`Ledger::commit`] or
//! [`Ledger::replace_chain`]. The chain lives behind a single lock so
//! observers never see a half-committed block.

use crate::block::{Block, BlockError};
use parking_lot::RwLock;
use thiserror::Error;

/// A broken invariant found while auditing a whole chain
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("chain is empty")]
    Empty,

    #[error("invalid genesis block")]
    InvalidGenesis,

    #[error("block {index}: {source}")]
    InvalidBlock {
        index: usize,
        #[source]
        source: BlockError,
    },
}

/// Verifiably-chained sequence of blocks
pub struct Ledger {
    chain: RwLock<Vec<Block>>,
}

impl Ledger {
    /// Create a ledger holding only a fresh genesis block
    pub fn new() -> Self {
        let genesis = Block::genesis();
        tracing::debug!("Genesis block {}", genesis.hash);
        Self {
            chain: RwLock::new(vec![genesis]),
        }
    }

    /// Build a block for `producer` on top of the current tail and commit it.
    ///
    /// Returns true iff the chain grew. The write guard is held from reading
    /// the tail until the replacement, so concurrent appends serialize.
    pub fn append(&self, producer: &str, payload_count: u64) -> bool {
        let mut chain = self.chain.write();
        let candidate = match chain.last() {
            Some(tail) => Block::next(tail, producer, payload_count),
            None => return false,
        };
        commit_locked(&mut chain, candidate)
    }

    /// Validate a pre-built candidate against the tail and commit it.
    pub fn commit(&self, candidate: Block) -> bool {
        let mut chain = self.chain.write();
        commit_locked(&mut chain, candidate)
    }

    /// Adopt `candidate` iff it is strictly longer than the current chain.
    ///
    /// Only lengths are compared. The candidate's interior links are not
    /// re-validated here; use [`verify_chain`] for that.
    pub fn replace_chain(&self, candidate: Vec<Block>) -> bool {
        let mut chain = self.chain.write();
        replace_locked(&mut chain, candidate)
    }

    /// Most recently committed block
    pub fn tail(&self) -> Block {
        // Never empty: replacement only accepts longer chains.
        self.chain
            .read()
            .last()
            .cloned()
            .unwrap_or_else(Block::genesis)
    }

    /// Snapshot of the whole chain
    pub fn blocks(&self) -> Vec<Block> {
        self.chain.read().clone()
    }

    /// Number of committed blocks, genesis included
    pub fn len(&self) -> usize {
        self.chain.read().len()
    }

    /// Never true once constructed
    pub fn is_empty(&self) -> bool {
        self.chain.read().is_empty()
    }

    /// Audit the current chain against every ledger invariant
    pub fn verify(&self) -> Result<(), ChainError> {
        verify_chain(&self.chain.read())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

fn commit_locked(chain: &mut Vec<Block>, candidate: Block) -> bool {
    let Some(tail) = chain.last() else {
        return false;
    };

    if let Err(e) = candidate.validate_successor(tail) {
        tracing::debug!("Rejected block {}: {}", candidate.sequence, e);
        return false;
    }

    let mut proposed = Vec::with_capacity(chain.len() + 1);
    proposed.extend_from_slice(chain.as_slice());
    proposed.push(candidate);
    replace_locked(chain, proposed)
}

fn replace_locked(chain: &mut Vec<Block>, candidate: Vec<Block>) -> bool {
    if candidate.len() > chain.len() {
        *chain = candidate;
        true
    } else {
        false
    }
}

/// Check all four chain invariants over `blocks`
pub fn verify_chain(blocks: &[Block]) -> Result<(), ChainError> {
    let genesis = blocks.first().ok_or(ChainError::Empty)?;
    if genesis.sequence != 0 || !genesis.prev_hash.is_empty() {
        return Err(ChainError::InvalidGenesis);
    }
    genesis
        .validate_hash()
        .map_err(|source| ChainError::InvalidBlock { index: 0, source })?;

    for (index, pair) in blocks.windows(2).enumerate() {
        pair[1]
            .validate_successor(&pair[0])
            .map_err(|source| ChainError::InvalidBlock {
                index: index + 1,
                source,
            })?;
    }
    Ok(())
}
