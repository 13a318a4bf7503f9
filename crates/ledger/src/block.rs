//! Block type, hashing and successor validation

use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Why a candidate block cannot follow the current tail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("sequence mismatch: expected {expected}, got {actual}")]
    SequenceMismatch { expected: u64, actual: u64 },

    #[error("prev_hash mismatch: expected {expected}, got {actual}")]
    PrevHashMismatch { expected: String, actual: String },

    #[error("hash mismatch: computed {computed}, stored {stored}")]
    HashMismatch { computed: String, stored: String },
}

/// One committed unit of the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, 0 for genesis
    pub sequence: u64,
    /// RFC 3339 creation time (informational)
    pub timestamp: String,
    /// Leader token that triggered this block, empty for genesis
    pub producer: String,
    /// Name-based UUID derived from the producer, empty for genesis
    pub data: String,
    /// Number of transactions this block represents
    pub payload_count: u64,
    /// Hash of the preceding block, empty for genesis
    pub prev_hash: String,
    /// Digest over sequence, timestamp, payload_count and prev_hash
    pub hash: String,
}

impl Block {
    /// The single allowed starting block.
    pub fn genesis() -> Self {
        let mut block = Self {
            sequence: 0,
            timestamp: now(),
            producer: String::new(),
            data: String::new(),
            payload_count: 0,
            prev_hash: String::new(),
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Build the candidate that would follow `tail`.
    pub fn next(tail: &Block, producer: &str, payload_count: u64) -> Self {
        let mut block = Self {
            sequence: tail.sequence + 1,
            timestamp: now(),
            producer: producer.to_string(),
            data: Uuid::new_v3(&Uuid::NAMESPACE_URL, producer.as_bytes()).to_string(),
            payload_count,
            prev_hash: tail.hash.clone(),
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// SHA-256 (lowercase hex) over sequence, timestamp, payload_count and prev_hash.
    ///
    /// `producer` and `data` are not part of the digest, so two blocks that
    /// differ only in their producer hash identically.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.sequence.to_le_bytes());
        hasher.update(self.timestamp.as_bytes());
        hasher.update(self.payload_count.to_le_bytes());
        hasher.update(self.prev_hash.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Check that `self` may directly follow `prev`.
    pub fn validate_successor(&self, prev: &Block) -> Result<(), BlockError> {
        if prev.sequence + 1 != self.sequence {
            return Err(BlockError::SequenceMismatch {
                expected: prev.sequence + 1,
                actual: self.sequence,
            });
        }
        if prev.hash != self.prev_hash {
            return Err(BlockError::PrevHashMismatch {
                expected: prev.hash.clone(),
                actual: self.prev_hash.clone(),
            });
        }
        self.validate_hash()
    }

    /// Check that the stored digest matches a fresh computation.
    pub fn validate_hash(&self) -> Result<(), BlockError> {
        let computed = self.compute_hash();
        if computed != self.hash {
            return Err(BlockError::HashMismatch {
                computed,
                stored: self.hash.clone(),
            });
        }
        Ok(())
    }
}

fn now() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_shape() {
        let genesis = Block::genesis();
        assert_eq!(genesis.sequence, 0);
        assert!(genesis.producer.is_empty());
        assert!(genesis.prev_hash.is_empty());
        assert_eq!(genesis.payload_count, 0);
        assert_eq!(genesis.hash, genesis.compute_hash());
        assert_eq!(genesis.hash.len(), 64);
    }

    #[test]
    fn test_next_links_to_tail() {
        let genesis = Block::genesis();
        let block = Block::next(&genesis, "leaderA", 42);
        assert_eq!(block.sequence, 1);
        assert_eq!(block.prev_hash, genesis.hash);
        assert_eq!(block.payload_count, 42);
        assert_eq!(block.producer, "leaderA");
        assert!(block.validate_successor(&genesis).is_ok());
    }

    #[test]
    fn test_producer_not_hashed() {
        let genesis = Block::genesis();
        let a = Block::next(&genesis, "leaderA", 7);
        let mut b = a.clone();
        b.producer = "leaderB".to_string();
        assert_eq!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_data_is_stable_per_producer() {
        let genesis = Block::genesis();
        let a = Block::next(&genesis, "leaderA", 1);
        let b = Block::next(&genesis, "leaderA", 2);
        let c = Block::next(&genesis, "leaderC", 1);
        assert_eq!(a.data, b.data);
        assert_ne!(a.data, c.data);
    }

    #[test]
    fn test_validate_successor_errors() {
        let genesis = Block::genesis();
        let good = Block::next(&genesis, "leaderA", 1);

        let mut wrong_seq = good.clone();
        wrong_seq.sequence = 5;
        assert!(matches!(
            wrong_seq.validate_successor(&genesis),
            Err(BlockError::SequenceMismatch { expected: 1, actual: 5 })
        ));

        let mut wrong_prev = good.clone();
        wrong_prev.prev_hash = "deadbeef".to_string();
        assert!(matches!(
            wrong_prev.validate_successor(&genesis),
            Err(BlockError::PrevHashMismatch { .. })
        ));

        let mut tampered = good;
        tampered.payload_count = 9999;
        assert!(matches!(
            tampered.validate_successor(&genesis),
            Err(BlockError::HashMismatch { .. })
        ));
    }
}
