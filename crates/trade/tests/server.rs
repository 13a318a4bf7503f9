//! Socket-level tests for the trade server

use enclave_trade::{ChannelSink, ServerError, Severity, StatusEvent, TradeServer, MAX_LINE_LEN};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc::UnboundedReceiver, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    addr: SocketAddr,
    events: UnboundedReceiver<StatusEvent>,
    balance: watch::Receiver<i64>,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

async fn start(opening_balance: i64) -> Harness {
    let (sink, events) = ChannelSink::new();
    let server = TradeServer::bind("127.0.0.1:0", opening_balance, sink)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let balance = server.balance_watch();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(server.run(shutdown.clone()));
    Harness {
        addr,
        events,
        balance,
        shutdown,
        handle,
    }
}

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> String {
        let mut reply = String::new();
        tokio::time::timeout(WAIT, self.reader.read_line(&mut reply))
            .await
            .expect("reply timed out")
            .unwrap();
        reply
    }

    async fn request(&mut self, line: &str) -> String {
        self.send(line).await;
        self.recv().await
    }
}

async fn wait_for_event(events: &mut UnboundedReceiver<StatusEvent>, message: &str) -> StatusEvent {
    tokio::time::timeout(WAIT, async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if event.message == message {
                return event;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no event {message:?}"))
}

#[tokio::test]
async fn test_example_session_over_tcp() {
    let mut h = start(1000).await;
    let mut client = Client::connect(h.addr).await;

    assert_eq!(client.request("buy 500").await, "bought: 500 coins.\n");
    assert_eq!(client.request("sell 2000").await, "insufficient funds!\n");
    assert_eq!(client.request("bal").await, "current balance: 1500.\n");
    assert_eq!(client.request("sell 1500").await, "sold: 1500 coins.\n");
    assert_eq!(*h.balance.borrow(), 0);
    assert_eq!(client.request("reload").await, "account reloaded.\n");
    assert_eq!(*h.balance.borrow(), 1000);

    let connected = wait_for_event(&mut h.events, "Node connected.").await;
    assert_eq!(connected.severity, Severity::Info);
    let blocked = wait_for_event(&mut h.events, "sell order: 2000 IC: BLOCKED!").await;
    assert_eq!(blocked.severity, Severity::Alert);

    h.shutdown.cancel();
    h.handle.await.unwrap();
}

#[tokio::test]
async fn test_protocol_errors_keep_connection_open() {
    let h = start(1000).await;
    let mut client = Client::connect(h.addr).await;

    assert_eq!(
        client.request("buy many").await,
        "second parameter must be a number.\n"
    );
    assert_eq!(client.request("withdraw").await, "invalid command.\n");
    assert_eq!(client.request("buy 1 2").await, "too many parameters.\n");
    assert_eq!(client.request("").await, "too many parameters.\n");
    assert_eq!(client.request("bal").await, "current balance: 1000.\n");

    h.shutdown.cancel();
    h.handle.await.unwrap();
}

#[tokio::test]
async fn test_invalid_utf8_is_an_invalid_command() {
    let h = start(1000).await;
    let mut client = Client::connect(h.addr).await;

    client.writer.write_all(b"b\xffl\n").await.unwrap();
    assert_eq!(client.recv().await, "invalid command.\n");
    client.writer.write_all(b"buy \xff\n").await.unwrap();
    assert_eq!(client.recv().await, "second parameter must be a number.\n");
    assert_eq!(client.request("bal").await, "current balance: 1000.\n");

    h.shutdown.cancel();
    h.handle.await.unwrap();
}

#[tokio::test]
async fn test_overlong_line_is_skipped() {
    let h = start(1000).await;
    let mut client = Client::connect(h.addr).await;

    let long = format!("buy {}", "1".repeat(MAX_LINE_LEN * 4));
    assert_eq!(client.request(&long).await, "invalid command.\n");
    assert_eq!(client.request("buy 5").await, "bought: 5 coins.\n");
    assert_eq!(client.request("bal").await, "current balance: 1005.\n");

    h.shutdown.cancel();
    h.handle.await.unwrap();
}

#[tokio::test]
async fn test_reconnect_keeps_balance() {
    let mut h = start(1000).await;

    let mut first = Client::connect(h.addr).await;
    assert_eq!(first.request("buy 25").await, "bought: 25 coins.\n");
    drop(first);
    wait_for_event(&mut h.events, "Node connection closed.").await;
    wait_for_event(&mut h.events, "Waiting for connection...").await;

    let mut second = Client::connect(h.addr).await;
    assert_eq!(second.request("bal").await, "current balance: 1025.\n");

    h.shutdown.cancel();
    h.handle.await.unwrap();
}

#[tokio::test]
async fn test_second_client_waits_for_first() {
    let mut h = start(1000).await;

    let mut first = Client::connect(h.addr).await;
    assert_eq!(first.request("bal").await, "current balance: 1000.\n");

    // Completes the handshake via the backlog but is not served yet.
    let mut second = Client::connect(h.addr).await;
    second.send("bal").await;
    let mut pending = String::new();
    let early = tokio::time::timeout(
        Duration::from_millis(300),
        second.reader.read_line(&mut pending),
    )
    .await;
    assert!(early.is_err(), "second client was served while first was active");

    assert_eq!(first.request("buy 1").await, "bought: 1 coins.\n");
    drop(first);
    wait_for_event(&mut h.events, "Node connection closed.").await;

    let mut reply = pending;
    tokio::time::timeout(WAIT, second.reader.read_line(&mut reply))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply, "current balance: 1001.\n");

    h.shutdown.cancel();
    h.handle.await.unwrap();
}

#[tokio::test]
async fn test_cancel_while_waiting_closes_listener() {
    let h = start(10).await;
    h.shutdown.cancel();
    tokio::time::timeout(WAIT, h.handle).await.unwrap().unwrap();

    assert!(TcpStream::connect(h.addr).await.is_err());
}

#[tokio::test]
async fn test_cancel_while_connected_drops_client() {
    let mut h = start(10).await;
    let mut client = Client::connect(h.addr).await;
    assert_eq!(client.request("bal").await, "current balance: 10.\n");
    wait_for_event(&mut h.events, "Node connected.").await;

    h.shutdown.cancel();
    tokio::time::timeout(WAIT, h.handle).await.unwrap().unwrap();

    let mut rest = String::new();
    let read = tokio::time::timeout(WAIT, client.reader.read_line(&mut rest))
        .await
        .unwrap();
    assert!(matches!(read, Ok(0) | Err(_)));
}

#[tokio::test]
async fn test_bind_conflict_is_an_error() {
    let h = start(0).await;
    let (sink, _events) = ChannelSink::new();

    let result = TradeServer::bind(&h.addr.to_string(), 0, sink).await;
    assert!(matches!(result, Err(ServerError::Bind { .. })));

    h.shutdown.cancel();
    h.handle.await.unwrap();
}
