//! Routes inbound messages to responses.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::protocol::{Connect, ConnectInfo, Message, ServerInfo};
use crate::subscription::SubscriptionRegistry;

/// Decides what, if anything, to send back for each inbound message.
///
/// - `INFO` → `CONNECT`
/// - `MSG`/`HMSG` → whatever the subscription handler returns, if it is a publish
/// - `PING` → `PONG`
/// - `-ERR` → logged
pub(crate) struct MessageDispatcher {
    registry: Arc<SubscriptionRegistry>,
    connect_info: ConnectInfo,
    server_info: Arc<Mutex<Option<ServerInfo>>>,
}

impl MessageDispatcher {
    pub(crate) fn new(
        registry: Arc<SubscriptionRegistry>,
        connect_info: ConnectInfo,
        server_info: Arc<Mutex<Option<ServerInfo>>>,
    ) -> Self {
        Self {
            registry,
            connect_info,
            server_info,
        }
    }

    pub(crate) async fn dispatch(&self, message: Message) -> Result<Option<Message>> {
        match message {
            Message::Info(info) => {
                let server = info.server_info();
                tracing::info!(
                    server_id = %server.server_id,
                    server_name = %server.server_name,
                    version = %server.version,
                    "Received server info"
                );
                *self.server_info.lock() = Some(server.clone());
                Ok(Some(Connect::new(self.connect_info.clone())?.into()))
            }
            Message::Msg(_) | Message::HMsg(_) => Ok(self.deliver(message).await),
            Message::Ping => Ok(Some(Message::Pong)),
            Message::Err(err) => {
                tracing::error!(error = err.text(), "Server reported an error");
                Ok(None)
            }
            other => {
                tracing::trace!(kind = %other.message_type(), "No response needed");
                Ok(None)
            }
        }
    }

    /// Run the handler for a delivery in its own task so a panic stays contained.
    async fn deliver(&self, message: Message) -> Option<Message> {
        let sid = message.sid()?.to_owned();
        let Some(handler) = self.registry.get(&sid) else {
            tracing::warn!(sid = %sid, subject = ?message.subject(), "No subscription for delivery, dropping");
            return None;
        };

        match tokio::spawn(handler.call(message)).await {
            Ok(Ok(Some(response))) if response.is_publish() => Some(response),
            Ok(Ok(Some(other))) => {
                tracing::error!(
                    sid = %sid,
                    kind = %other.message_type(),
                    "Handler returned a message that is not PUB or HPUB, dropping"
                );
                None
            }
            Ok(Ok(None)) => None,
            Ok(Err(e)) => {
                tracing::error!(sid = %sid, "Subscription handler failed: {}", e);
                None
            }
            Err(e) => {
                tracing::error!(sid = %sid, "Subscription handler panicked: {}", e);
                None
            }
        }
    }
}
