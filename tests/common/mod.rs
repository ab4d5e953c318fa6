//! Test helpers for end-to-end tests.
//!
//! Provides TestClient, TestServer, and helper functions for talking to a
//! relay over real TCP sockets.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use chatrelay::chat::command_list;
use chatrelay::config::{Config, LoggingConfig, ServerConfig};
use chatrelay::{RelayServer, ServerContext};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Test client speaking the line protocol.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    /// Connect to the server at the given address.
    pub async fn connect(addr: SocketAddr) -> Result<Self, std::io::Error> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
        })
    }

    /// Connect, send `nickname` and consume the command list.
    pub async fn join_as(addr: SocketAddr, nickname: &str) -> Result<Self, std::io::Error> {
        let mut client = Self::connect(addr).await?;
        client.send_line(nickname).await?;
        for expected in command_list() {
            let line = client.recv_line().await?;
            if line != expected {
                return Err(unexpected(&expected, &line));
            }
        }
        Ok(client)
    }

    /// Send raw bytes to the server.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<(), std::io::Error> {
        self.writer.write_all(data).await?;
        self.writer.flush().await
    }

    /// Send a line (with LF) to the server.
    pub async fn send_line(&mut self, line: &str) -> Result<(), std::io::Error> {
        self.send_raw(format!("{line}\n").as_bytes()).await
    }

    /// Receive one line with the default timeout.
    pub async fn recv_line(&mut self) -> Result<String, std::io::Error> {
        self.recv_line_timeout(DEFAULT_TIMEOUT).await
    }

    /// Receive one line, failing on timeout or end of stream.
    pub async fn recv_line_timeout(&mut self, duration: Duration) -> Result<String, std::io::Error> {
        match self.try_recv_line(duration).await? {
            Some(line) => Ok(line),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            )),
        }
    }

    /// Receive one line; `None` means the server closed the connection.
    pub async fn try_recv_line(
        &mut self,
        duration: Duration,
    ) -> Result<Option<String>, std::io::Error> {
        let mut line = String::new();
        let n = timeout(duration, self.reader.read_line(&mut line))
            .await
            .map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::TimedOut, "Timeout waiting for line")
            })??;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Receive the next line and check it equals `expected`.
    pub async fn expect_line(&mut self, expected: &str) -> Result<(), std::io::Error> {
        let line = self.recv_line().await?;
        if line == expected {
            Ok(())
        } else {
            Err(unexpected(expected, &line))
        }
    }

    /// Receive lines until one equals `pattern`, returning the lines
    /// skipped on the way.
    pub async fn recv_until(&mut self, pattern: &str) -> Result<Vec<String>, std::io::Error> {
        let mut skipped = Vec::new();
        loop {
            let line = self.recv_line().await?;
            if line == pattern {
                return Ok(skipped);
            }
            skipped.push(line);
        }
    }

    /// Send an unknown command and return every line that arrived before
    /// its reply.
    ///
    /// Because a session handles its input in order, this shows what the
    /// client has received up to now.
    pub async fn sync(&mut self) -> Result<Vec<String>, std::io::Error> {
        self.send_line("/sync").await?;
        self.recv_until("Unknown command: /sync").await
    }

    /// Wait for the server to close the connection, returning the lines
    /// received first.
    pub async fn recv_until_closed(&mut self) -> Result<Vec<String>, std::io::Error> {
        let mut lines = Vec::new();
        while let Some(line) = self.try_recv_line(DEFAULT_TIMEOUT).await? {
            lines.push(line);
        }
        Ok(lines)
    }

    /// Send `/bye`.
    pub async fn quit(&mut self) -> Result<(), std::io::Error> {
        self.send_line("/bye").await
    }

    /// Close the write half without sending `/bye`.
    pub async fn hang_up(mut self) -> Result<(), std::io::Error> {
        self.writer.shutdown().await
    }
}

fn unexpected(expected: &str, got: &str) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("expected {expected:?}, got {got:?}"),
    )
}

/// Relay running on an OS-assigned port for the duration of a test.
pub struct TestServer {
    addr: SocketAddr,
    context: ServerContext,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<chatrelay::Result<()>>>,
}

impl TestServer {
    /// Start a server with the test configuration.
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_config(test_config()).await
    }

    /// Start a server with a custom configuration.
    pub async fn with_config(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let server = RelayServer::bind(&config.server).await?;
        let addr = server.local_addr()?;
        let context = ServerContext::new();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(server.run_until(context.clone(), async move {
            let _ = shutdown_rx.await;
        }));

        Ok(Self {
            addr,
            context,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the local address of the server.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shared state, for asserting on registries directly.
    pub fn context(&self) -> &ServerContext {
        &self.context
    }

    /// Connect a client and register `nickname`.
    pub async fn client(&self, nickname: &str) -> Result<TestClient, std::io::Error> {
        TestClient::join_as(self.addr, nickname).await
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    pub async fn stop(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            timeout(DEFAULT_TIMEOUT, handle).await???;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Create a test configuration.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_connections: 16,
        },
        logging: LoggingConfig {
            level: "warn".to_string(),
            file: None,
        },
    }
}

/// Poll `check` until it returns true or the default timeout passes.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + DEFAULT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
