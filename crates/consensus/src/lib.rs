//! Enclave Consensus - leader token source
//!
//! Each round a random group is drawn from the known node ids and one member
//! is named leader. The leader's id is handed to the block producer as a
//! [`LeaderToken`](enclave_ledger::LeaderToken). There is no voting or quorum.

pub mod group;
pub mod leader;

pub use group::{ConsensusGroup, Member};
pub use leader::{LeaderRotation, LeaderRotationBuilder, RotationConfig};
