//! Single-stream connection with a bounded inbound queue.
//!
//! [`Connection::open`] asks the [`Connector`] for a stream and spawns one
//! read task per open. The task feeds every chunk into a
//! [`ProtocolParser`] and pushes parsed messages into a bounded channel.
//! When the channel is full the task stops reading, so a slow consumer
//! stalls the transport instead of growing memory.
//!
//! ```text
//! transport ──read──▶ ProtocolParser ──▶ mpsc(capacity) ──receive()──▶ caller
//! caller ──send()──▶ serialize ──write──▶ transport
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cancel::Cancellation;
use crate::error::{NatsError, Result};
use crate::protocol::{ConnectInfo, Message, ProtocolParser};
use crate::transport::{BoxedStream, Connector};

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 4222;

/// Default inbound queue capacity.
pub const DEFAULT_QUEUE_BUFFER_SIZE: usize = 1000;

/// Size of each transport read.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Where to connect and how much to buffer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Inbound queue capacity. Zero is treated as one.
    pub queue_buffer_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            queue_buffer_size: DEFAULT_QUEUE_BUFFER_SIZE,
        }
    }
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Set the inbound queue capacity.
    pub fn with_queue_buffer_size(mut self, size: usize) -> Self {
        self.queue_buffer_size = size;
        self
    }

    /// Parse `nats://[user:pass@|token@]host[:port]`.
    ///
    /// Missing host or port fall back to the defaults.
    ///
    /// # Example
    ///
    /// ```
    /// use natswire_client::ConnectionConfig;
    ///
    /// let (config, credentials) = ConnectionConfig::from_url("nats://alice:pw@demo:4333").unwrap();
    /// assert_eq!(config.host, "demo");
    /// assert_eq!(config.port, 4333);
    /// assert_eq!(credentials.user.as_deref(), Some("alice"));
    /// ```
    pub fn from_url(url: &str) -> Result<(Self, Credentials)> {
        let rest = url
            .strip_prefix("nats://")
            .ok_or_else(|| NatsError::InvalidArgument(format!("unsupported URL: {url}")))?;

        let mut config = Self::default();
        let mut credentials = Credentials::default();

        let address = match rest.rsplit_once('@') {
            Some((auth, address)) => {
                match auth.split_once(':') {
                    Some((user, pass)) => {
                        credentials.user = Some(user.to_string());
                        credentials.pass = Some(pass.to_string());
                    }
                    None => credentials.auth_token = Some(auth.to_string()),
                }
                address
            }
            None => rest,
        };
        let address = address.trim_end_matches('/');

        match address.rsplit_once(':') {
            Some((host, port)) => {
                config.port = port
                    .parse()
                    .map_err(|_| NatsError::InvalidArgument(format!("invalid port: {port}")))?;
                if !host.is_empty() {
                    config.host = host.to_string();
                }
            }
            None if !address.is_empty() => config.host = address.to_string(),
            None => {}
        }

        Ok((config, credentials))
    }

    /// Capacity actually used for the channel (never zero).
    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.queue_buffer_size.max(1)
    }
}

/// Credentials embedded in a server URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user: Option<String>,
    pub pass: Option<String>,
    pub auth_token: Option<String>,
}

impl Credentials {
    /// Copy any present credential into the CONNECT options.
    pub fn apply_to(&self, info: &mut ConnectInfo) {
        if self.user.is_some() {
            info.user = self.user.clone();
        }
        if self.pass.is_some() {
            info.pass = self.pass.clone();
        }
        if self.auth_token.is_some() {
            info.auth_token = self.auth_token.clone();
        }
    }
}

/// Write side of one open stream, shared with its read task.
struct Link {
    writer: tokio::sync::Mutex<Option<WriteHalf<BoxedStream>>>,
    closed: AtomicBool,
}

impl Link {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark closed and shut the write half down. Safe to call twice.
    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!("Transport shutdown failed: {}", e);
            }
        }
    }
}

/// Receiving end of one open stream's queue.
///
/// A handle stays bound to the stream it was taken from: once that stream
/// ends it yields `Ok(None)`, even if the connection has been reopened since.
#[derive(Clone)]
pub struct Inbound {
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Result<Message>>>>,
}

impl Inbound {
    /// Next parsed message from this stream.
    pub async fn recv(&self, cancellation: &Cancellation) -> Result<Option<Message>> {
        let mut receiver = self.receiver.lock().await;
        tokio::select! {
            item = receiver.recv() => item.transpose(),
            _ = cancellation.cancelled() => Err(NatsError::Cancelled("receive cancelled".into())),
        }
    }
}

impl std::fmt::Debug for Inbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inbound").finish_non_exhaustive()
    }
}

/// One open transport and its read task.
struct Generation {
    link: Arc<Link>,
    inbound: Inbound,
    read_task: JoinHandle<()>,
}

enum Phase {
    Idle,
    Opening,
    Open(Generation),
}

/// Resets an `Opening` phase back to `Idle` unless the open completed.
struct OpeningGuard<'a> {
    phase: &'a Mutex<Phase>,
    armed: bool,
}

impl OpeningGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for OpeningGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.phase.lock() = Phase::Idle;
        }
    }
}

/// Pull-based message source over a single transport stream.
pub struct Connection {
    connector: Arc<dyn Connector>,
    config: ConnectionConfig,
    phase: Mutex<Phase>,
}

impl Connection {
    pub fn new(connector: Arc<dyn Connector>, config: ConnectionConfig) -> Self {
        Self {
            connector,
            config,
            phase: Mutex::new(Phase::Idle),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Establish the transport and start the read task.
    ///
    /// # Errors
    ///
    /// - `AlreadyOpen` if a previous open is live or in flight
    /// - `Connection` if the connector fails
    /// - `Cancelled` if `cancellation` fires first
    pub async fn open(&self, cancellation: &Cancellation) -> Result<()> {
        {
            let mut phase = self.phase.lock();
            match &*phase {
                Phase::Opening => return Err(NatsError::AlreadyOpen),
                Phase::Open(generation) if !generation.link.is_closed() => {
                    return Err(NatsError::AlreadyOpen)
                }
                _ => {}
            }
            // A finished generation may still hold its task handle
            if let Phase::Open(stale) = std::mem::replace(&mut *phase, Phase::Opening) {
                stale.read_task.abort();
            }
        }
        let mut guard = OpeningGuard {
            phase: &self.phase,
            armed: true,
        };

        let (host, port) = (self.config.host.as_str(), self.config.port);
        tracing::debug!(host, port, "Opening connection");

        let stream = tokio::select! {
            result = self.connector.connect(host, port) => {
                result.map_err(|e| NatsError::connection("failed to open transport", e))?
            }
            _ = cancellation.cancelled() => {
                return Err(NatsError::Cancelled("connection open cancelled".into()));
            }
        };

        let (reader, writer) = tokio::io::split(stream);
        let link = Arc::new(Link {
            writer: tokio::sync::Mutex::new(Some(writer)),
            closed: AtomicBool::new(false),
        });
        let (tx, rx) = mpsc::channel(self.config.queue_capacity());
        let read_task = tokio::spawn(read_loop(reader, tx, link.clone()));

        *self.phase.lock() = Phase::Open(Generation {
            link,
            inbound: Inbound {
                receiver: Arc::new(tokio::sync::Mutex::new(rx)),
            },
            read_task,
        });
        guard.disarm();

        tracing::info!(host, port, "Connection open");
        Ok(())
    }

    /// Next parsed message.
    ///
    /// Returns `Ok(None)` once the stream ended and the queue drained, and
    /// the read task's terminal error if it failed.
    pub async fn receive(&self, cancellation: &Cancellation) -> Result<Option<Message>> {
        self.inbound()?.recv(cancellation).await
    }

    /// Queue handle for the currently open stream.
    ///
    /// # Errors
    ///
    /// `NotConnected` unless a stream is open.
    pub fn inbound(&self) -> Result<Inbound> {
        match &*self.phase.lock() {
            Phase::Open(generation) => Ok(generation.inbound.clone()),
            _ => Err(NatsError::NotConnected),
        }
    }

    /// Serialize and write one message.
    pub async fn send(&self, message: &Message) -> Result<()> {
        let link = match &*self.phase.lock() {
            Phase::Open(generation) => generation.link.clone(),
            _ => return Err(NatsError::NotConnected),
        };

        let bytes = message.serialize();
        let mut guard = link.writer.lock().await;
        let writer = guard.as_mut().ok_or(NatsError::NotConnected)?;

        writer
            .write_all(&bytes)
            .await
            .map_err(|e| NatsError::connection("failed to write message", e))?;
        writer
            .flush()
            .await
            .map_err(|e| NatsError::connection("failed to flush transport", e))?;

        tracing::trace!(kind = %message.message_type(), bytes = bytes.len(), "Sent message");
        Ok(())
    }

    /// Stop the read task and close the transport. Idempotent.
    pub async fn close(&self) {
        let generation = {
            let mut phase = self.phase.lock();
            if !matches!(*phase, Phase::Open(_)) {
                return;
            }
            match std::mem::replace(&mut *phase, Phase::Idle) {
                Phase::Open(generation) => generation,
                _ => return,
            }
        };

        generation.read_task.abort();
        generation.link.close().await;
        tracing::debug!("Connection closed");
    }

    /// True if never opened, closed, or the stream ended.
    pub fn is_closed(&self) -> bool {
        match &*self.phase.lock() {
            Phase::Open(generation) => generation.link.is_closed(),
            _ => true,
        }
    }
}

/// Read chunks, parse, and queue messages until EOF or failure.
async fn read_loop(
    mut reader: ReadHalf<BoxedStream>,
    tx: mpsc::Sender<Result<Message>>,
    link: Arc<Link>,
) {
    let mut parser = ProtocolParser::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    let outcome: Result<()> = async {
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                parser.cancel();
                tracing::debug!("Transport reached end of stream");
                return Ok(());
            }

            parser.extend(&buf[..n])?;
            // One message at a time, so a full queue leaves the rest as raw bytes
            while let Some(message) = parser.try_extract()? {
                if tx.send(Ok(message)).await.is_err() {
                    return Ok(());
                }
            }
        }
    }
    .await;

    if let Err(e) = outcome {
        tracing::error!("Read loop error: {}", e);
        let _ = tx.send(Err(e)).await;
    }

    link.close().await;
}
