//! Shared fixtures: an in-memory connector and a minimal routing server.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use natswire_client::protocol::{Info, Message, Msg, ProtocolParser, ServerInfo};
use natswire_client::transport::{BoxedStream, Connector};
use natswire_client::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;

/// Connector backed by `tokio::io::duplex`.
///
/// Each connect creates a fresh pair, keeps the client end and hands the
/// server end to the test through [`DuplexConnector::servers`].
pub struct DuplexConnector {
    connects: Arc<AtomicUsize>,
    servers: mpsc::UnboundedSender<DuplexStream>,
    buffer: usize,
    delay: Duration,
}

pub struct DuplexHandles {
    pub connects: Arc<AtomicUsize>,
    pub servers: mpsc::UnboundedReceiver<DuplexStream>,
}

impl DuplexConnector {
    pub fn new(buffer: usize) -> (Self, DuplexHandles) {
        Self::with_delay(buffer, Duration::ZERO)
    }

    /// Wait `delay` before completing each connect.
    pub fn with_delay(buffer: usize, delay: Duration) -> (Self, DuplexHandles) {
        let connects = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            connects: connects.clone(),
            servers: tx,
            buffer,
            delay,
        };
        (connector, DuplexHandles { connects, servers: rx })
    }
}

impl Connector for DuplexConnector {
    fn connect<'a>(&'a self, _host: &'a str, _port: u16) -> BoxFuture<'a, std::io::Result<BoxedStream>> {
        Box::pin(async move {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let (client, server) = tokio::io::duplex(self.buffer);
            self.servers
                .send(server)
                .map_err(|_| std::io::Error::from(std::io::ErrorKind::ConnectionRefused))?;
            Ok(Box::new(client) as BoxedStream)
        })
    }
}

impl DuplexHandles {
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Server end of the next connection.
    pub async fn next_server(&mut self) -> DuplexStream {
        tokio::time::timeout(Duration::from_secs(1), self.servers.recv())
            .await
            .expect("client connected")
            .expect("connector alive")
    }
}

pub fn server_info() -> ServerInfo {
    let mut info = ServerInfo::new("TEST", "test-server", "2.10.0", "127.0.0.1", 4222, 1_048_576, 1);
    info.headers = Some(true);
    info
}

/// Read from `stream` until `parser` yields a message.
pub async fn read_message(stream: &mut DuplexStream, parser: &mut ProtocolParser) -> Message {
    let mut pending = Vec::new();
    read_messages(stream, parser, &mut pending, 1).await;
    pending.remove(0)
}

/// Read until at least `count` messages are buffered in `pending`.
pub async fn read_messages(
    stream: &mut DuplexStream,
    parser: &mut ProtocolParser,
    pending: &mut Vec<Message>,
    count: usize,
) {
    let mut buf = [0u8; 4096];
    while pending.len() < count {
        let n = tokio::time::timeout(Duration::from_secs(1), stream.read(&mut buf))
            .await
            .expect("client wrote in time")
            .expect("read from client");
        assert!(n > 0, "client closed the stream");
        pending.extend(parser.push(&buf[..n]).expect("client bytes parse"));
    }
}

/// Minimal server: sends INFO, answers PING and routes PUB/HPUB to matching SUBs.
///
/// Every message the client sends is forwarded to the returned receiver.
pub fn spawn_server(mut stream: DuplexStream) -> mpsc::UnboundedReceiver<Message> {
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let info: Message = Info::from_server_info(server_info()).unwrap().into();
        if stream.write_all(&info.serialize()).await.is_err() {
            return;
        }

        let mut parser = ProtocolParser::new();
        let mut subs: HashMap<String, String> = HashMap::new();
        let mut buf = [0u8; 4096];

        loop {
            let n = match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            let Ok(messages) = parser.push(&buf[..n]) else {
                return;
            };

            for message in messages {
                let mut out = Vec::new();
                match &message {
                    Message::Sub(sub) => {
                        subs.insert(sub.sid().to_string(), sub.subject().to_string());
                    }
                    Message::Unsub(unsub) => {
                        subs.remove(unsub.sid());
                    }
                    Message::Ping => out.extend_from_slice(&Message::Pong.serialize()),
                    Message::Pub(_) | Message::HPub(_) => {
                        let subject = message.subject().unwrap_or_default();
                        let payload = message.payload().cloned().unwrap_or_default();
                        for (sid, pattern) in &subs {
                            if !subject_matches(pattern, subject) {
                                continue;
                            }
                            let mut msg = Msg::new(subject, sid.as_str(), payload.clone()).unwrap();
                            if let Some(reply_to) = message.reply_to() {
                                msg = msg.with_reply_to(reply_to).unwrap();
                            }
                            out.extend_from_slice(&Message::from(msg).serialize());
                        }
                    }
                    _ => {}
                }

                let _ = seen_tx.send(message);
                if !out.is_empty() && stream.write_all(&out).await.is_err() {
                    return;
                }
            }
        }
    });

    seen_rx
}

/// Token-wise subject match supporting `*` and a trailing `>`.
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern = pattern.split('.');
    let mut subject = subject.split('.');

    loop {
        match (pattern.next(), subject.next()) {
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => {}
            (Some(p), Some(s)) if p == s => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
