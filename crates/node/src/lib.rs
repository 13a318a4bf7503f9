//! Enclave simulator node
//!
//! Configuration loading and the status display helpers, shared by the
//! `enclave-sim` server and the `enclave-client` binary.

pub mod config;
pub mod status;

pub use config::{ConfigError, NodeConfig};
