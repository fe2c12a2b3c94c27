//! In-memory channel endpoint pair.
//!
//! [`MemoryChannel::pair`] returns two linked endpoints modelling the two
//! isolated execution contexts: a send on one endpoint delivers to the
//! listeners registered on the other, never to the sender's own. Delivery
//! is synchronous and in registration order, which makes the pair both the
//! test double for the correlation layer and a usable same-process bridge.
//!
//! # Example
//!
//! ```
//! use crosswire::channel::{Channel, MemoryChannel};
//! use serde_json::json;
//! use std::sync::{Arc, Mutex};
//!
//! let (front, back) = MemoryChannel::pair();
//!
//! let seen = Arc::new(Mutex::new(None));
//! let seen_clone = seen.clone();
//! let _sub = back.subscribe("greet", Box::new(move |payload| {
//!     *seen_clone.lock().unwrap() = Some(payload);
//! }));
//!
//! front.send("greet", json!({ "name": "world" })).unwrap();
//! assert_eq!(*seen.lock().unwrap(), Some(json!({ "name": "world" })));
//! ```

use std::sync::Arc;

use serde_json::Value;

use super::{Channel, Listener, ListenerTable, Subscription};
use crate::error::Result;

/// One endpoint of a linked in-memory channel pair.
///
/// Cheaply cloneable; clones share the same endpoint identity.
#[derive(Clone)]
pub struct MemoryChannel {
    /// Listeners registered on this endpoint.
    local: Arc<ListenerTable>,
    /// Listeners of the peer endpoint, where sends deliver.
    peer: Arc<ListenerTable>,
}

impl MemoryChannel {
    /// Create a linked pair of endpoints.
    ///
    /// Conventionally the first endpoint lives in the front (restricted)
    /// context and the second in the back (privileged) context, but the
    /// pair is symmetric.
    pub fn pair() -> (MemoryChannel, MemoryChannel) {
        let a = Arc::new(ListenerTable::new());
        let b = Arc::new(ListenerTable::new());

        let front = MemoryChannel {
            local: a.clone(),
            peer: b.clone(),
        };
        let back = MemoryChannel { local: b, peer: a };

        (front, back)
    }
}

impl Channel for MemoryChannel {
    fn send(&self, tag: &str, payload: Value) -> Result<()> {
        self.peer.dispatch(tag, &payload);
        Ok(())
    }

    fn subscribe(&self, tag: &str, listener: Box<Listener>) -> Subscription {
        let token = self.local.insert(tag, listener);
        let table = self.local.clone();
        let tag = tag.to_string();
        Subscription::new(move || table.remove(&tag, token))
    }
}
