//! Enclave Trade - command server for a single coin account
//!
//! Architecture:
//! - One TCP listener, one client at a time
//! - Text commands (`buy N`, `sell N`, `bal`, `reload`) mutate the account
//! - Lifecycle and trade events go to a pluggable sink

pub mod account;
pub mod command;
pub mod events;
pub mod processor;
pub mod server;

pub use account::{Account, AccountError};
pub use command::{Command, ProtocolError};
pub use events::{ChannelSink, EventSink, Severity, StatusEvent};
pub use processor::CommandProcessor;
pub use server::{ServerError, TradeServer, MAX_LINE_LEN};
