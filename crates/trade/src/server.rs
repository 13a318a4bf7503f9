//! Trade server - one client at a time over TCP
//!
//! The accept loop is an explicit two-state machine. While a client is
//! connected no further connection is accepted; pending clients wait in the
//! listen backlog until the current one goes away.

use crate::command::ProtocolError;
use crate::events::{EventSink, Severity};
use crate::processor::CommandProcessor;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Longest command line accepted, terminator included
pub const MAX_LINE_LEN: usize = 1024;

/// Connection session state
enum SessionState {
    /// No client attached
    Waiting,
    /// Client attached, reading commands
    Connected(TcpStream, SocketAddr),
}

pub struct TradeServer<S> {
    listener: TcpListener,
    processor: CommandProcessor<S>,
}

impl<S: EventSink> TradeServer<S> {
    /// Bind the listener. Failure here is meant to be fatal to the caller.
    pub async fn bind(addr: &str, opening_balance: i64, sink: S) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!("Trade server listening on {}", addr);

        Ok(Self {
            listener,
            processor: CommandProcessor::new(opening_balance, sink),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Observe the account balance
    pub fn balance_watch(&self) -> watch::Receiver<i64> {
        self.processor.subscribe_balance()
    }

    /// Serve clients until `shutdown` is cancelled, then close the listener.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut state = SessionState::Waiting;

        loop {
            state = match state {
                SessionState::Waiting => {
                    self.emit("Waiting for connection...", Severity::Info);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        accepted = self.listener.accept() => self.on_accept(accepted),
                    }
                }
                SessionState::Connected(stream, peer) => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = self.serve(stream) => {
                            tracing::info!("Client {} disconnected", peer);
                            self.emit("Node connection closed.", Severity::Info);
                            SessionState::Waiting
                        }
                    }
                }
            };
        }

        tracing::info!("Trade server stopped");
    }

    /// Transition out of `Waiting` for one accept outcome
    fn on_accept(&self, accepted: std::io::Result<(TcpStream, SocketAddr)>) -> SessionState {
        match accepted {
            Ok((stream, peer)) => {
                tracing::info!("Client connected from {}", peer);
                self.emit("Node connected.", Severity::Info);
                SessionState::Connected(stream, peer)
            }
            Err(e) => {
                tracing::warn!("Accept error: {}", e);
                self.emit("Problem with node connection.", Severity::Warning);
                SessionState::Waiting
            }
        }
    }

    /// Read commands until end-of-stream or an I/O error.
    async fn serve(&mut self, stream: TcpStream) {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::with_capacity(128);

        loop {
            let reply = match read_command(&mut reader, &mut buf).await {
                Ok(Incoming::Line(line)) => self.processor.handle_line(&line),
                Ok(Incoming::TooLong) => {
                    tracing::debug!("Discarded line longer than {} bytes", MAX_LINE_LEN);
                    format!("{}\n", ProtocolError::InvalidCommand)
                }
                Ok(Incoming::Closed) => return,
                Err(e) => {
                    tracing::debug!("Read error: {}", e);
                    return;
                }
            };
            if let Err(e) = writer.write_all(reply.as_bytes()).await {
                tracing::debug!("Write error: {}", e);
                return;
            }
        }
    }

    fn emit(&self, message: &str, severity: Severity) {
        self.processor.sink().emit(message.to_string(), severity);
    }
}

/// One read from the client
#[derive(Debug, PartialEq, Eq)]
enum Incoming {
    /// A complete line, or the unterminated rest before end-of-stream
    Line(String),
    /// A line over [`MAX_LINE_LEN`], already skipped
    TooLong,
    /// End of stream
    Closed,
}

/// Read one line of at most [`MAX_LINE_LEN`] bytes. Invalid UTF-8 is
/// replaced rather than rejected.
async fn read_command<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Incoming>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let n = (&mut *reader)
        .take(MAX_LINE_LEN as u64)
        .read_until(b'\n', buf)
        .await?;
    if n == 0 {
        return Ok(Incoming::Closed);
    }
    if n < MAX_LINE_LEN || buf.last() == Some(&b'\n') {
        return Ok(Incoming::Line(String::from_utf8_lossy(buf).into_owned()));
    }

    // Drop the remainder of the overlong line.
    loop {
        buf.clear();
        let n = (&mut *reader)
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', buf)
            .await?;
        if n == 0 || buf.last() == Some(&b'\n') {
            return Ok(Incoming::TooLong);
        }
    }
}
