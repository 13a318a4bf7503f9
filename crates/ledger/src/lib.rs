//! Enclave Ledger - append-only hash chain
//!
//! - Blocks are chained by SHA-256 over their header fields
//! - New blocks are validated against the tail before commit
//! - Competing chains are resolved by length alone
//! - A block producer turns leader tokens into commits

pub mod block;
pub mod chain;
pub mod producer;

pub use block::{Block, BlockError};
pub use chain::{verify_chain, ChainError, Ledger};
pub use producer::{
    BlockProducer, BlockProducerConfig, BlockUpdate, LeaderToken, TriggerError, TriggerSender,
};
