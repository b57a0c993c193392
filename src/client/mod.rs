//! Client lifecycle, subscriptions and request/reply.
//!
//! The [`Client`] moves through
//! `Disconnected → Connecting → Connected → Disconnecting → Disconnected`.
//! Every transition is announced on the status event bus; concurrent
//! `connect()`/`disconnect()` calls wait on those announcements instead of
//! starting a second transition.
//!
//! A successful connect starts one dispatch loop that pulls messages from the
//! connection and answers them:
//! 1. `INFO` → `CONNECT` handshake
//! 2. `MSG`/`HMSG` → subscription handler, whose `PUB` reply is sent
//! 3. `PING` → `PONG`
//!
//! # Example
//!
//! ```no_run
//! use natswire_client::protocol::{Message, Pub};
//! use natswire_client::Client;
//!
//! # #[tokio::main] async fn main() -> natswire_client::Result<()> {
//! let client = Client::builder().server_url("nats://127.0.0.1:4222")?.build();
//! client.connect().await?;
//!
//! client
//!     .subscribe("greet", |msg: Message| async move {
//!         let reply = match msg.reply_to() {
//!             Some(to) => Some(Pub::new(to, msg.payload().cloned().unwrap_or_default())?.into()),
//!             None => None,
//!         };
//!         Ok(reply)
//!     })
//!     .await?;
//!
//! let reply = client.request(Pub::new("greet", "hello")?).await?;
//! assert_eq!(reply.payload().map(|p| &p[..]), Some(&b"hello"[..]));
//!
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod dispatcher;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

use crate::cancel::Cancellation;
use crate::connection::{Connection, ConnectionConfig, Inbound};
use crate::error::{NatsError, Result};
use crate::event::{EventBus, EventSubscription};
use crate::protocol::{Message, ServerInfo, Sub, Unsub};
use crate::subscription::{HandlerResult, SubscriptionHandler, SubscriptionRegistry};
use crate::transport::Connector;

pub use config::{ClientBuilder, ClientConfig, DEFAULT_REQUEST_TIMEOUT, DEFAULT_WAIT_FOR_STATUS_TIMEOUT};
use dispatcher::MessageDispatcher;

/// Event name for status announcements.
pub const STATUS_EVENT: &str = "connectionStatusChanged";

/// Fixed bound on `disconnect()` waiting for a concurrent transition.
const DISCONNECT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on `disconnect()` waiting for the in-flight message to finish.
const DISPATCH_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Prefix of generated reply subjects.
const INBOX_PREFIX: &str = "_INBOX.";

/// Lifecycle state of a [`Client`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl ConnectionStatus {
    /// Connected or Disconnected; no transition in flight.
    #[inline]
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Connected | Self::Disconnected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        };
        f.write_str(name)
    }
}

struct ClientInner {
    connection: Connection,
    registry: Arc<SubscriptionRegistry>,
    events: EventBus<ConnectionStatus>,
    status: Mutex<ConnectionStatus>,
    /// Bumped on every successful connect; a dispatch loop only acts for its own epoch.
    epoch: AtomicU64,
    /// True while the dispatch loop is handling a message.
    dispatching: watch::Sender<bool>,
    server_info: Arc<Mutex<Option<ServerInfo>>>,
    config: ClientConfig,
    cancellation: Cancellation,
}

/// Cloneable handle to a pub/sub client.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn new(
        connector: Arc<dyn Connector>,
        connection_config: ConnectionConfig,
        config: ClientConfig,
        cancellation: Cancellation,
    ) -> Self {
        let (dispatching, _) = watch::channel(false);
        Self {
            inner: Arc::new(ClientInner {
                connection: Connection::new(connector, connection_config),
                registry: Arc::new(SubscriptionRegistry::new()),
                events: EventBus::new(),
                status: Mutex::new(ConnectionStatus::Disconnected),
                epoch: AtomicU64::new(0),
                dispatching,
                server_info: Arc::new(Mutex::new(None)),
                config,
                cancellation,
            }),
        }
    }

    #[inline]
    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status.lock()
    }

    /// Last INFO received from the server.
    pub fn server_info(&self) -> Option<ServerInfo> {
        self.inner.server_info.lock().clone()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn connection_config(&self) -> &ConnectionConfig {
        self.inner.connection.config()
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.inner.cancellation
    }

    /// Number of live subscriptions, including pending request inboxes.
    pub fn subscription_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Whether `sid` has a registered handler.
    pub fn has_subscription(&self, sid: &str) -> bool {
        self.inner.registry.contains(sid)
    }

    /// Observe status changes until the returned guard is dropped.
    pub fn subscribe_status<F>(&self, callback: F) -> EventSubscription<ConnectionStatus>
    where
        F: Fn(&ConnectionStatus) + Send + Sync + 'static,
    {
        self.inner.events.subscribe_guard(STATUS_EVENT, callback)
    }

    /// Open the connection and start dispatching.
    ///
    /// Succeeds immediately when already connected. When another call is
    /// mid-transition, waits (bounded by `wait_for_status_timeout`) for it
    /// to settle instead of opening a second transport.
    ///
    /// # Errors
    ///
    /// - `Connection`/`Cancelled` from opening the transport; status reverts
    ///   to `Disconnected`
    /// - `Cancelled` if the wait times out or the client is cancelled
    /// - `State` if a concurrent connect ended `Disconnected`
    pub async fn connect(&self) -> Result<()> {
        let timeout = self.inner.config.wait_for_status_timeout;

        loop {
            let observed = {
                let mut status = self.inner.status.lock();
                let observed = *status;
                if observed == ConnectionStatus::Disconnected {
                    *status = ConnectionStatus::Connecting;
                }
                observed
            };

            match observed {
                ConnectionStatus::Disconnected => break,
                ConnectionStatus::Connected => return Ok(()),
                ConnectionStatus::Connecting => {
                    let actual = self.wait_for_settled_status(timeout).await?;
                    return expect_status(ConnectionStatus::Connected, actual);
                }
                ConnectionStatus::Disconnecting => {
                    self.wait_for_settled_status(timeout).await?;
                }
            }
        }

        self.announce(ConnectionStatus::Connecting);

        let opened = self
            .inner
            .connection
            .open(&self.inner.cancellation)
            .await
            .and_then(|()| self.inner.connection.inbound());
        let inbound = match opened {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::error!("Failed to connect: {}", e);
                self.set_status(ConnectionStatus::Disconnected);
                return Err(e);
            }
        };

        let epoch = self.inner.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        self.set_status(ConnectionStatus::Connected);

        let client = self.clone();
        tokio::spawn(async move { client.dispatch_loop(epoch, inbound).await });

        Ok(())
    }

    /// Close the connection.
    ///
    /// Waits up to 10 seconds for a concurrent transition, then for the
    /// message currently being dispatched, before closing the transport.
    pub async fn disconnect(&self) -> Result<()> {
        loop {
            let observed = {
                let mut status = self.inner.status.lock();
                let observed = *status;
                if observed == ConnectionStatus::Connected {
                    *status = ConnectionStatus::Disconnecting;
                }
                observed
            };

            match observed {
                ConnectionStatus::Connected => break,
                ConnectionStatus::Disconnected => return Ok(()),
                ConnectionStatus::Disconnecting => {
                    let actual = self.wait_for_settled_status(DISCONNECT_WAIT_TIMEOUT).await?;
                    return expect_status(ConnectionStatus::Disconnected, actual);
                }
                ConnectionStatus::Connecting => {
                    self.wait_for_settled_status(DISCONNECT_WAIT_TIMEOUT).await?;
                }
            }
        }

        self.announce(ConnectionStatus::Disconnecting);
        self.wait_for_dispatch_idle(DISPATCH_DRAIN_TIMEOUT).await;
        self.inner.connection.close().await;
        self.set_status(ConnectionStatus::Disconnected);
        Ok(())
    }

    /// Suspend until the client's cancellation source fires.
    pub async fn wait_for_termination(&self) {
        self.inner.cancellation.cancelled().await;
        tracing::info!("Client cancellation received");
    }

    /// Subscribe `handler` to `subject` and return the generated SID.
    ///
    /// Handlers run one delivery at a time, so a handler must not await a
    /// `request` whose reply arrives on this same client.
    pub async fn subscribe<F, Fut>(&self, subject: &str, handler: F) -> Result<String>
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.subscribe_with(subject, None, Arc::new(handler)).await
    }

    /// Subscribe as a member of `queue_group`.
    pub async fn subscribe_queue<F, Fut>(
        &self,
        subject: &str,
        queue_group: &str,
        handler: F,
    ) -> Result<String>
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.subscribe_with(subject, Some(queue_group), Arc::new(handler))
            .await
    }

    async fn subscribe_with(
        &self,
        subject: &str,
        queue_group: Option<&str>,
        handler: Arc<dyn SubscriptionHandler>,
    ) -> Result<String> {
        let sid = new_sid();
        let mut sub = Sub::new(subject, sid.as_str())?;
        if let Some(group) = queue_group {
            sub = sub.with_queue_group(group)?;
        }

        self.inner.registry.add_arc(sid.as_str(), handler);
        if let Err(e) = self.inner.connection.send(&sub.into()).await {
            self.inner.registry.remove(&sid);
            return Err(e);
        }

        tracing::debug!(sid = %sid, subject, "Subscribed");
        Ok(sid)
    }

    /// Remove the handler for `sid`, then tell the server.
    ///
    /// The handler is gone even if sending `UNSUB` fails.
    pub async fn unsubscribe(&self, sid: &str) -> Result<()> {
        let unsub = Unsub::new(sid)?;
        self.inner.registry.remove(sid);
        self.inner.connection.send(&unsub.into()).await?;
        tracing::debug!(sid, "Unsubscribed");
        Ok(())
    }

    /// Ask the server to stop delivering to `sid` after `max` more messages.
    ///
    /// The handler stays registered; call [`unsubscribe`](Self::unsubscribe)
    /// to drop it.
    pub async fn unsubscribe_after(&self, sid: &str, max: u64) -> Result<()> {
        let unsub = Unsub::new(sid)?.with_max_messages(max)?;
        self.inner.connection.send(&unsub.into()).await
    }

    /// Send a `PUB` or `HPUB`.
    pub async fn publish(&self, message: impl Into<Message>) -> Result<()> {
        let message = message.into();
        if !message.is_publish() {
            return Err(NatsError::InvalidArgument(format!(
                "cannot publish a {} message",
                message.message_type()
            )));
        }
        self.inner.connection.send(&message).await
    }

    /// Publish and wait for one reply, using the configured request timeout
    /// and the client's cancellation source.
    pub async fn request(&self, message: impl Into<Message>) -> Result<Message> {
        let cancellation = self.inner.cancellation.clone();
        self.request_with(message, self.inner.config.request_timeout, &cancellation)
            .await
    }

    /// Publish and wait for one reply on a temporary inbox subscription.
    ///
    /// A reply subject `_INBOX.<id>` is set on the message unless it already
    /// has one. The inbox subscription is removed on every exit path.
    ///
    /// # Errors
    ///
    /// `Cancelled` when `timeout` elapses or `cancellation` fires first.
    pub async fn request_with(
        &self,
        message: impl Into<Message>,
        timeout: Duration,
        cancellation: &Cancellation,
    ) -> Result<Message> {
        let (message, inbox) = with_inbox(message.into())?;

        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(Mutex::new(Some(tx)));
        let sid = self
            .subscribe(&inbox, move |reply: Message| {
                let slot = slot.clone();
                async move {
                    if let Some(tx) = slot.lock().take() {
                        let _ = tx.send(reply);
                    }
                    Ok(None)
                }
            })
            .await?;

        let mut guard = ReplyGuard {
            client: self.clone(),
            sid: Some(sid),
        };

        self.publish(message).await?;

        let outcome = tokio::select! {
            reply = tokio::time::timeout(timeout, rx) => match reply {
                Ok(Ok(reply)) => Ok(reply),
                Ok(Err(_)) => Err(NatsError::Cancelled("reply subscription closed".into())),
                Err(_) => Err(NatsError::Cancelled(format!("request timed out after {timeout:?}"))),
            },
            _ = cancellation.cancelled() => Err(NatsError::Cancelled("request cancelled".into())),
        };

        guard.release().await;
        outcome
    }

    fn set_status(&self, status: ConnectionStatus) {
        *self.inner.status.lock() = status;
        self.announce(status);
    }

    fn announce(&self, status: ConnectionStatus) {
        tracing::info!(status = %status, "Connection status changed");
        if let Err(e) = self.inner.events.dispatch(STATUS_EVENT, status) {
            tracing::warn!("Failed to announce status: {}", e);
        }
    }

    /// Wait until no transition is in flight and return the settled status.
    ///
    /// The event only wakes the waiter; the decision reads the current status,
    /// so announcements delivered out of order cannot mislead it.
    async fn wait_for_settled_status(&self, timeout: Duration) -> Result<ConnectionStatus> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription = self.subscribe_status(move |status: &ConnectionStatus| {
            let _ = tx.send(*status);
        });

        let current = self.status();
        if current.is_settled() {
            return Ok(current);
        }

        let settled = async {
            while rx.recv().await.is_some() {
                let current = self.status();
                if current.is_settled() {
                    return current;
                }
            }
            self.status()
        };

        tokio::select! {
            result = tokio::time::timeout(timeout, settled) => result.map_err(|_| {
                NatsError::Cancelled(format!("timed out after {timeout:?} waiting for connection status"))
            }),
            _ = self.inner.cancellation.cancelled() => {
                Err(NatsError::Cancelled("wait for connection status cancelled".into()))
            }
        }
    }

    async fn wait_for_dispatch_idle(&self, timeout: Duration) {
        let mut busy = self.inner.dispatching.subscribe();
        let idle = busy.wait_for(|dispatching| !*dispatching);
        if tokio::time::timeout(timeout, idle).await.is_err() {
            tracing::warn!("Message dispatch still running after {:?}, closing anyway", timeout);
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.inner.epoch.load(Ordering::Acquire) == epoch
            && self.status() == ConnectionStatus::Connected
    }

    /// Pull and answer messages until the stream ends or the client leaves `Connected`.
    ///
    /// `inbound` is the queue of the stream opened for `epoch`; a later
    /// connection never feeds this loop.
    async fn dispatch_loop(self, epoch: u64, inbound: Inbound) {
        let dispatcher = MessageDispatcher::new(
            self.inner.registry.clone(),
            self.inner.config.connect_info.clone(),
            self.inner.server_info.clone(),
        );
        tracing::debug!(epoch, "Dispatch loop started");

        while self.is_current(epoch) {
            let message = match inbound.recv(&self.inner.cancellation).await {
                Ok(Some(message)) => message,
                Ok(None) => {
                    tracing::info!("Server closed the connection");
                    self.on_stream_end(epoch).await;
                    break;
                }
                Err(e) if e.is_cancellation() => {
                    tracing::debug!("Dispatch loop cancelled");
                    break;
                }
                Err(e) => {
                    tracing::error!("Connection failed: {}", e);
                    self.on_stream_end(epoch).await;
                    break;
                }
            };

            if !self.is_current(epoch) {
                tracing::debug!(kind = %message.message_type(), "Client is leaving connected, dropping message");
                break;
            }

            self.inner.dispatching.send_replace(true);
            if let Err(e) = self.dispatch_one(&dispatcher, message).await {
                tracing::error!("Failed to dispatch message: {}", e);
            }
            self.inner.dispatching.send_replace(false);
        }

        tracing::debug!(epoch, "Dispatch loop stopped");
    }

    async fn dispatch_one(&self, dispatcher: &MessageDispatcher, message: Message) -> Result<()> {
        let Some(response) = dispatcher.dispatch(message).await? else {
            return Ok(());
        };

        if self.inner.connection.is_closed() {
            tracing::warn!(kind = %response.message_type(), "Connection closed, dropping response");
            return Ok(());
        }
        self.inner.connection.send(&response).await
    }

    /// Tear down after the server side went away, unless another transition owns it.
    async fn on_stream_end(&self, epoch: u64) {
        let owned = {
            let mut status = self.inner.status.lock();
            let owned = *status == ConnectionStatus::Connected
                && self.inner.epoch.load(Ordering::Acquire) == epoch;
            if owned {
                *status = ConnectionStatus::Disconnecting;
            }
            owned
        };
        if !owned {
            return;
        }

        self.announce(ConnectionStatus::Disconnecting);
        self.inner.connection.close().await;
        self.set_status(ConnectionStatus::Disconnected);
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("status", &self.status())
            .field("subscriptions", &self.inner.registry.len())
            .finish()
    }
}

fn expect_status(expected: ConnectionStatus, actual: ConnectionStatus) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(NatsError::State { expected, actual })
    }
}

/// Alphanumeric, unique subscription id.
fn new_sid() -> String {
    Uuid::new_v4().simple().to_string()
}

fn new_inbox() -> String {
    format!("{INBOX_PREFIX}{}", Uuid::new_v4().simple())
}

/// Ensure a publish carries a reply subject and return it alongside.
fn with_inbox(message: Message) -> Result<(Message, String)> {
    let message: Message = match message {
        Message::Pub(record) if record.reply_to().is_none() => {
            record.with_reply_to(new_inbox())?.into()
        }
        Message::HPub(record) if record.reply_to().is_none() => {
            record.with_reply_to(new_inbox())?.into()
        }
        Message::Pub(_) | Message::HPub(_) => message,
        other => {
            return Err(NatsError::InvalidArgument(format!(
                "cannot send a {} message as a request",
                other.message_type()
            )))
        }
    };

    let inbox = message
        .reply_to()
        .map(str::to_owned)
        .ok_or_else(|| NatsError::InvalidArgument("request has no reply subject".into()))?;
    Ok((message, inbox))
}

/// Removes a request's inbox subscription on every exit path.
struct ReplyGuard {
    client: Client,
    sid: Option<String>,
}

impl ReplyGuard {
    async fn release(&mut self) {
        if let Some(sid) = self.sid.take() {
            if let Err(e) = self.client.unsubscribe(&sid).await {
                tracing::debug!(sid = %sid, "Failed to unsubscribe request inbox: {}", e);
            }
        }
    }
}

impl Drop for ReplyGuard {
    fn drop(&mut self) {
        let Some(sid) = self.sid.take() else {
            return;
        };

        // Dropped mid-request: forget the handler now, tell the server later
        self.client.inner.registry.remove(&sid);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let client = self.client.clone();
            handle.spawn(async move {
                if let Ok(unsub) = Unsub::new(sid.as_str()) {
                    let _ = client.inner.connection.send(&unsub.into()).await;
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{HPub, HeaderBag, Pub};
    use crate::transport::BoxedStream;
    use crate::BoxFuture;

    struct RefusingConnector;

    impl Connector for RefusingConnector {
        fn connect<'a>(&'a self, _host: &'a str, _port: u16) -> BoxFuture<'a, std::io::Result<BoxedStream>> {
            Box::pin(async { Err(std::io::Error::from(std::io::ErrorKind::ConnectionRefused)) })
        }
    }

    fn offline_client() -> Client {
        Client::builder().connector(RefusingConnector).build()
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ConnectionStatus::Connecting.to_string(), "connecting");
        assert!(ConnectionStatus::Connected.is_settled());
        assert!(!ConnectionStatus::Disconnecting.is_settled());
    }

    #[test]
    fn test_generated_ids() {
        let sid = new_sid();
        assert_eq!(sid.len(), 32);
        assert!(crate::protocol::is_valid_sid(&sid));
        assert_ne!(sid, new_sid());

        let inbox = new_inbox();
        assert!(inbox.starts_with("_INBOX."));
        assert!(crate::protocol::is_valid_subject(&inbox));
    }

    #[test]
    fn test_with_inbox() {
        let (message, inbox) = with_inbox(Pub::new("a", "x").unwrap().into()).unwrap();
        assert_eq!(message.reply_to(), Some(inbox.as_str()));

        let (message, inbox) =
            with_inbox(Pub::new("a", "x").unwrap().with_reply_to("mine").unwrap().into()).unwrap();
        assert_eq!(inbox, "mine");
        assert_eq!(message.reply_to(), Some("mine"));

        let mut headers = HeaderBag::new();
        headers.insert("X", "1").unwrap();
        let (message, _) = with_inbox(HPub::new("a", headers, "").unwrap().into()).unwrap();
        assert!(message.reply_to().is_some());

        assert!(matches!(
            with_inbox(Message::Ping),
            Err(NatsError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_connect_reverts_status() {
        let client = offline_client();

        let err = client.connect().await.unwrap_err();
        assert!(err.is_connection());
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_when_disconnected_is_noop() {
        let client = offline_client();
        client.disconnect().await.unwrap();
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_subscribe_rolls_back_on_send_failure() {
        let client = offline_client();

        let err = client
            .subscribe("a.b", |_msg: Message| async { Ok(None) })
            .await
            .unwrap_err();

        assert!(matches!(err, NatsError::NotConnected));
        assert_eq!(client.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_validates_subject() {
        let client = offline_client();

        let err = client
            .subscribe("a..b", |_msg: Message| async { Ok(None) })
            .await
            .unwrap_err();
        assert!(matches!(err, NatsError::InvalidSubject(_)));

        let err = client
            .subscribe_queue("a", "bad group", |_msg: Message| async { Ok(None) })
            .await
            .unwrap_err();
        assert!(matches!(err, NatsError::InvalidQueueGroup(_)));
    }

    #[tokio::test]
    async fn test_publish_rejects_non_publish() {
        let client = offline_client();
        assert!(matches!(
            client.publish(Message::Ping).await,
            Err(NatsError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_request_cleans_up_when_publish_fails() {
        let client = offline_client();

        // Subscribing the inbox already fails while offline
        let err = client.request(Pub::new("greet", "hi").unwrap()).await.unwrap_err();
        assert!(matches!(err, NatsError::NotConnected));
        assert_eq!(client.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_status_subscription() {
        let client = offline_client();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _guard = client.subscribe_status(move |status: &ConnectionStatus| {
            let _ = tx.send(*status);
        });

        let _ = client.connect().await;

        assert_eq!(rx.recv().await, Some(ConnectionStatus::Connecting));
        assert_eq!(rx.recv().await, Some(ConnectionStatus::Disconnected));
    }
}
