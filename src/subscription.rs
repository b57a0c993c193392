//! Subscription registry mapping SIDs to message handlers.
//!
//! A handler receives each delivery (`MSG`/`HMSG`) for its SID and may
//! return a message to publish in response, typically a `Pub` addressed to
//! the delivery's reply-to subject.
//!
//! # Example
//!
//! ```
//! use natswire_client::protocol::{Message, Pub};
//! use natswire_client::subscription::SubscriptionRegistry;
//!
//! let registry = SubscriptionRegistry::new();
//! registry.add("sid1", |msg: Message| async move {
//!     let reply = match msg.reply_to() {
//!         Some(reply_to) => Some(Pub::new(reply_to, msg.payload().cloned().unwrap_or_default())?.into()),
//!         None => None,
//!     };
//!     Ok(reply)
//! });
//!
//! assert!(registry.contains("sid1"));
//! ```

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;

use crate::protocol::Message;
use crate::BoxFuture;

/// Error type handlers may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for handler functions.
pub type HandlerResult = std::result::Result<Option<Message>, BoxError>;

/// Trait for subscription handlers.
pub trait SubscriptionHandler: Send + Sync + 'static {
    /// Handle one delivery, optionally producing a response.
    fn call(&self, message: Message) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> SubscriptionHandler for F
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, message: Message) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(message))
    }
}

/// Concurrent SID → handler map.
///
/// Each operation is atomic per key, so the dispatch loop may look up
/// handlers while other tasks subscribe and unsubscribe.
#[derive(Default)]
pub struct SubscriptionRegistry {
    handlers: DashMap<String, Arc<dyn SubscriptionHandler>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `sid`, replacing any previous one.
    pub fn add<F, Fut>(&self, sid: impl Into<String>, handler: F)
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_arc(sid, Arc::new(handler));
    }

    pub(crate) fn add_arc(&self, sid: impl Into<String>, handler: Arc<dyn SubscriptionHandler>) {
        let sid = sid.into();
        if self.handlers.insert(sid.clone(), handler).is_some() {
            tracing::debug!(sid = %sid, "Replaced subscription handler");
        }
    }

    /// Handler for `sid`, if any.
    pub fn get(&self, sid: &str) -> Option<Arc<dyn SubscriptionHandler>> {
        self.handlers.get(sid).map(|entry| entry.value().clone())
    }

    /// Remove `sid`. No-op if absent.
    pub fn remove(&self, sid: &str) -> bool {
        self.handlers.remove(sid).is_some()
    }

    #[inline]
    pub fn contains(&self, sid: &str) -> bool {
        self.handlers.contains_key(sid)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("len", &self.handlers.len())
            .finish()
    }
}
