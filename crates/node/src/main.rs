//! Enclave Simulator
//!
//! Runs the trade server for a single coin account next to an in-memory
//! ledger. A leader rotation triggers a new block every round; trades and
//! connection events are written to the log.

use anyhow::Result;
use clap::Parser;
use enclave_consensus::LeaderRotation;
use enclave_ledger::{BlockProducer, BlockProducerConfig, Ledger};
use enclave_sim::{status, NodeConfig};
use enclave_trade::{ChannelSink, TradeServer};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Enclave blockchain simulator
#[derive(Parser, Debug)]
#[command(name = "enclave-sim")]
#[command(about = "Single-account trade server with an append-only ledger", long_about = None)]
struct Args {
    /// Config file (defaults to the enclave_config.json search path)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides tcp_connect
    #[arg(long)]
    listen: Option<String>,

    /// Opening balance, overrides opening_balance
    #[arg(long)]
    opening_balance: Option<i64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (mut config, used) = NodeConfig::load(args.config.as_deref())?;
    match used {
        Some(path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::info!("No config file found, using defaults"),
    }
    if let Some(listen) = args.listen {
        config.tcp_connect = listen;
    }
    if let Some(balance) = args.opening_balance {
        config.opening_balance = balance;
    }

    tracing::info!("Starting enclave simulator");
    tracing::info!("  Listen address: {}", config.tcp_connect);
    tracing::info!("  Opening balance: {}", config.opening_balance);
    tracing::info!("  Consensus group: {} of {} nodes", config.number_of_nodes, config.node_ids.len());
    tracing::info!("  Round delay: {}ms", config.round_delay_ms);

    // Bind before anything else runs; failure ends the process.
    let (sink, events) = ChannelSink::new();
    let server = TradeServer::bind(&config.tcp_connect, config.opening_balance, sink).await?;
    let balance = server.balance_watch();

    let ledger = Arc::new(Ledger::new());
    let producer = BlockProducer::new(ledger.clone(), BlockProducerConfig::default());
    let block_updates = producer.subscribe();
    let rotation = LeaderRotation::new(config.rotation(), producer.trigger_sender());

    let shutdown = CancellationToken::new();

    let server_handle = tokio::spawn(server.run(shutdown.clone()));
    let producer_handle = tokio::spawn(producer.run(shutdown.clone()));
    let rotation_handle = tokio::spawn(rotation.run(shutdown.clone()));
    let monitor_handle = tokio::spawn(async move {
        tokio::join!(
            status::log_events(events),
            status::log_balance(balance),
            status::log_blocks(block_updates)
        );
    });

    tracing::info!("Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    shutdown.cancel();

    for (name, handle) in [
        ("trade server", server_handle),
        ("block producer", producer_handle),
        ("leader rotation", rotation_handle),
        ("monitor", monitor_handle),
    ] {
        if let Err(e) = handle.await {
            tracing::error!("{} task failed: {}", name, e);
        }
    }

    match ledger.verify() {
        Ok(()) => tracing::info!("Ledger verified at height {}", ledger.len()),
        Err(e) => tracing::error!("Ledger verification failed: {}", e),
    }

    tracing::info!("Enclave simulator stopped");

    Ok(())
}
