//! Named-event bus with fire-and-forget delivery.
//!
//! [`EventBus::dispatch`] snapshots the callbacks subscribed to a name and
//! runs them, in subscription order, on a spawned task. The dispatching
//! caller never runs callbacks itself.
//!
//! # Example
//!
//! ```
//! use natswire_client::event::EventBus;
//!
//! # #[tokio::main] async fn main() {
//! let bus: EventBus<u32> = EventBus::new();
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//!
//! let _subscription = bus.subscribe_guard("tick", move |n: &u32| {
//!     let _ = tx.send(*n);
//! });
//! bus.dispatch("tick", 7).unwrap();
//!
//! assert_eq!(rx.recv().await, Some(7));
//! # }
//! ```

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{NatsError, Result};

type Callback<P> = Arc<dyn Fn(&P) + Send + Sync>;

/// Identifies one subscription on an [`EventBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Table<P> {
    next_id: u64,
    by_name: HashMap<String, Vec<(SubscriptionId, Callback<P>)>>,
}

impl<P> Table<P> {
    fn remove(&mut self, id: SubscriptionId) -> bool {
        let mut removed = false;
        self.by_name.retain(|_, callbacks| {
            let before = callbacks.len();
            callbacks.retain(|(existing, _)| *existing != id);
            removed |= callbacks.len() != before;
            !callbacks.is_empty()
        });
        removed
    }
}

/// Cloneable handle to a shared table of named callbacks.
pub struct EventBus<P> {
    table: Arc<Mutex<Table<P>>>,
}

impl<P> Clone for EventBus<P> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<P> Default for EventBus<P> {
    fn default() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                next_id: 0,
                by_name: HashMap::new(),
            })),
        }
    }
}

impl<P> EventBus<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule every callback subscribed to `name` with `payload`.
    ///
    /// Must be called from within a tokio runtime when any callback is
    /// subscribed.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `name` is empty.
    pub fn dispatch(&self, name: &str, payload: P) -> Result<()> {
        if name.is_empty() {
            return Err(NatsError::InvalidArgument(
                "event name must not be empty".into(),
            ));
        }

        let callbacks: Vec<Callback<P>> = match self.table.lock().by_name.get(name) {
            Some(callbacks) => callbacks.iter().map(|(_, cb)| cb.clone()).collect(),
            None => return Ok(()),
        };

        tracing::trace!(event = name, subscribers = callbacks.len(), "Dispatching event");
        let event = name.to_string();
        tokio::spawn(async move {
            for callback in callbacks {
                // A panicking subscriber must not starve the ones after it
                if panic::catch_unwind(AssertUnwindSafe(|| callback(&payload))).is_err() {
                    tracing::error!(event = %event, "Event subscriber panicked");
                }
            }
        });
        Ok(())
    }

    /// Subscribe `callback` to `name`.
    pub fn subscribe<F>(&self, name: &str, callback: F) -> SubscriptionId
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        let mut table = self.table.lock();
        let id = SubscriptionId(table.next_id);
        table.next_id += 1;
        table
            .by_name
            .entry(name.to_string())
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Subscribe and get a guard that unsubscribes when dropped.
    pub fn subscribe_guard<F>(&self, name: &str, callback: F) -> EventSubscription<P>
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        let id = self.subscribe(name, callback);
        EventSubscription {
            table: Arc::downgrade(&self.table),
            id,
            armed: true,
        }
    }

    /// Remove one subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.table.lock().remove(id)
    }

    /// Remove all subscriptions for `name`, or for every name if `None`.
    pub fn clear(&self, name: Option<&str>) {
        let mut table = self.table.lock();
        match name {
            Some(name) => {
                table.by_name.remove(name);
            }
            None => table.by_name.clear(),
        }
    }

    /// Number of callbacks subscribed to `name`.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.table.lock().by_name.get(name).map_or(0, Vec::len)
    }
}

/// RAII subscription that is removed when dropped.
///
/// Call [`detach`](Self::detach) to keep the subscription for the lifetime
/// of the bus.
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct EventSubscription<P> {
    table: Weak<Mutex<Table<P>>>,
    id: SubscriptionId,
    armed: bool,
}

impl<P> EventSubscription<P> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Keep the subscription alive past this guard.
    pub fn detach(mut self) -> SubscriptionId {
        self.armed = false;
        self.id
    }
}

impl<P> Drop for EventSubscription<P> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(table) = self.table.upgrade() {
            table.lock().remove(self.id);
        }
    }
}
