//! Status display - renders events, balance and blocks as log records

use chrono::Local;
use enclave_ledger::BlockUpdate;
use enclave_trade::{Severity, StatusEvent};
use tokio::sync::{broadcast, mpsc, watch};

/// Format one event the way the monitor shows it
pub fn format_event(event: &StatusEvent) -> String {
    format!(
        "{}: {}",
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        event.message
    )
}

/// Drain trade server events until the server goes away
pub async fn log_events(mut events: mpsc::UnboundedReceiver<StatusEvent>) {
    while let Some(event) = events.recv().await {
        let line = format_event(&event);
        match event.severity {
            Severity::Info => tracing::info!(target: "enclave::monitor", "{}", line),
            Severity::Warning => tracing::warn!(target: "enclave::monitor", "{}", line),
            Severity::Alert => tracing::error!(target: "enclave::monitor", "{}", line),
        }
    }
}

/// Report every balance change until the account owner goes away
pub async fn log_balance(mut balance: watch::Receiver<i64>) {
    tracing::info!("Balance: {}", *balance.borrow_and_update());
    while balance.changed().await.is_ok() {
        tracing::info!("Balance: {}", *balance.borrow_and_update());
    }
}

/// Report committed blocks until the producer stops
pub async fn log_blocks(mut updates: broadcast::Receiver<BlockUpdate>) {
    loop {
        match updates.recv().await {
            Ok(update) => tracing::info!(
                "Chain height {}: block {} by {} ({} transactions)",
                update.chain_len,
                update.block.sequence,
                update.block.producer,
                update.block.payload_count
            ),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("Block monitor lagged {} updates", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
