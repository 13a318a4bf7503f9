//! Enclave Client
//!
//! Forwards typed commands to the enclave simulator and prints each reply.

use anyhow::{Context, Result};
use clap::Parser;
use enclave_sim::NodeConfig;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

const PROMPT: &str = "enclave-client> ";

const HELP: &str = "enclave-client commands:
'buy' or 'sell' amount
'reload'
'bal' (retrieve current balance)
'q' or 'quit'";

/// Line client for the enclave simulator
#[derive(Parser, Debug)]
#[command(name = "enclave-client")]
struct Args {
    /// Optional IP address, combined with tcp_port from the config
    #[arg(short = 'i', default_value = "localhost")]
    ip: String,

    /// Config file (defaults to the enclave_config.json search path)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, _) = NodeConfig::load(args.config.as_deref())?;
    let addr = config.client_addr(Some(args.ip.as_str()));

    let stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;
    let (reader, mut writer) = stream.into_split();
    let mut replies = BufReader::new(reader);

    println!(
        "Connected to ENCLAVE SIMULATOR {}",
        chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    );
    println!("Enter 'help' for usage hints.");

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", PROMPT);
        std::io::stdout().flush()?;

        let Some(line) = input.next_line().await? else {
            break;
        };

        match line.trim() {
            "quit" | "q" => {
                println!("enclave client exiting...");
                break;
            }
            "help" | "h" => println!("{}", HELP),
            _ => {
                writer.write_all(format!("{}\n", line).as_bytes()).await?;

                let mut reply = String::new();
                if replies.read_line(&mut reply).await? == 0 {
                    println!("server closed the connection");
                    break;
                }
                print!("{}", reply);
            }
        }
    }

    Ok(())
}
