//! Channel abstraction - the name-tagged message transport boundary.
//!
//! The underlying transport is never ambient global state: both the client
//! stub generator and the server dispatcher receive an explicit handle
//! implementing [`Channel`]. A channel supports exactly two operations:
//! fire-and-forget [`send`](Channel::send) of a tagged payload, and
//! [`subscribe`](Channel::subscribe), which registers a listener for a tag
//! and returns a [`Subscription`] guard that deregisters it on drop.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryChannel`] - a linked in-process endpoint pair
//! - [`StreamChannel`](crate::transport::StreamChannel) - framed transport
//!   over any `AsyncRead`/`AsyncWrite` pair
//!
//! # Delivery contract
//!
//! Implementations must deliver messages for a single tag in send order to
//! all listeners registered at delivery time, exactly once. Nothing beyond
//! that is assumed: no replies, no acknowledgements, no correlation - those
//! are this crate's job, one layer up.

mod memory;

pub use memory::MemoryChannel;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::Result;

/// Listener callback invoked with each payload delivered under its tag.
pub type Listener = dyn Fn(Value) + Send + Sync;

/// Handle to a name-tagged, fire-and-forget message transport.
pub trait Channel: Send + Sync {
    /// Send a payload under the given tag. Does not wait for delivery.
    fn send(&self, tag: &str, payload: Value) -> Result<()>;

    /// Register a listener for a tag.
    ///
    /// The listener stays registered until the returned [`Subscription`]
    /// is dropped or explicitly unsubscribed.
    fn subscribe(&self, tag: &str, listener: Box<Listener>) -> Subscription;
}

/// RAII guard for a registered listener.
///
/// Dropping the guard deregisters the listener. This is what guarantees the
/// per-call reply listeners on the client side are cleaned up on every
/// resolution path, including caller cancellation.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Create a subscription from its cancellation action.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Deregister the listener now instead of at drop time.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Tag-keyed listener registry shared by the channel implementations.
///
/// Listeners are invoked outside the lock, so a listener may subscribe or
/// unsubscribe (including itself) during delivery without deadlocking.
#[derive(Default)]
pub(crate) struct ListenerTable {
    inner: Mutex<TableInner>,
}

#[derive(Default)]
struct TableInner {
    next_token: u64,
    listeners: HashMap<String, Vec<(u64, Arc<Listener>)>>,
}

impl ListenerTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a listener; returns the token used to remove it later.
    pub(crate) fn insert(&self, tag: &str, listener: Box<Listener>) -> u64 {
        let mut inner = self.lock();
        let token = inner.next_token;
        inner.next_token += 1;
        inner
            .listeners
            .entry(tag.to_string())
            .or_default()
            .push((token, Arc::from(listener)));
        token
    }

    /// Remove a listener by tag and token. Removing twice is a no-op.
    pub(crate) fn remove(&self, tag: &str, token: u64) {
        let mut inner = self.lock();
        if let Some(entries) = inner.listeners.get_mut(tag) {
            entries.retain(|(t, _)| *t != token);
            if entries.is_empty() {
                inner.listeners.remove(tag);
            }
        }
    }

    /// Invoke every listener registered for the tag, in registration order.
    pub(crate) fn dispatch(&self, tag: &str, payload: &Value) {
        let listeners: Vec<Arc<Listener>> = {
            let inner = self.lock();
            match inner.listeners.get(tag) {
                Some(entries) => entries.iter().map(|(_, l)| l.clone()).collect(),
                None => return,
            }
        };

        for listener in listeners {
            listener(payload.clone());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TableInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_dispatch_reaches_registered_listener() {
        let table = ListenerTable::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_clone = hits.clone();
        table.insert(
            "ping",
            Box::new(move |_| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        table.dispatch("ping", &json!(null));
        table.dispatch("ping", &json!(null));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dispatch_ignores_other_tags() {
        let table = ListenerTable::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_clone = hits.clone();
        table.insert(
            "ping",
            Box::new(move |_| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        table.dispatch("pong", &json!(null));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_removed_listener_not_invoked() {
        let table = ListenerTable::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_clone = hits.clone();
        let token = table.insert(
            "ping",
            Box::new(move |_| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        table.remove("ping", token);
        table.dispatch("ping", &json!(null));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listeners_invoked_in_registration_order() {
        let table = ListenerTable::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = order.clone();
            table.insert(
                "seq",
                Box::new(move |_| {
                    order.lock().unwrap().push(label);
                }),
            );
        }

        table.dispatch("seq", &json!(null));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_subscription_drop_runs_cancel() {
        let cancelled = Arc::new(AtomicUsize::new(0));

        let cancelled_clone = cancelled.clone();
        let sub = Subscription::new(move || {
            cancelled_clone.fetch_add(1, Ordering::SeqCst);
        });

        drop(sub);
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_explicit_unsubscribe_runs_cancel_once() {
        let cancelled = Arc::new(AtomicUsize::new(0));

        let cancelled_clone = cancelled.clone();
        let sub = Subscription::new(move || {
            cancelled_clone.fetch_add(1, Ordering::SeqCst);
        });

        sub.unsubscribe();
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_unsubscribe_during_dispatch() {
        let table = Arc::new(ListenerTable::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let table_clone = table.clone();
        let hits_clone = hits.clone();
        let token = Arc::new(Mutex::new(None));
        let token_clone = token.clone();

        let registered = table.insert(
            "once",
            Box::new(move |_| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
                if let Some(t) = token_clone.lock().unwrap().take() {
                    table_clone.remove("once", t);
                }
            }),
        );
        *token.lock().unwrap() = Some(registered);

        table.dispatch("once", &json!(null));
        table.dispatch("once", &json!(null));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
