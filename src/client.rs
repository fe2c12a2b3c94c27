//! Client stub generation - promise-returning callables per operation.
//!
//! Each declared operation becomes a [`Stub`]: calling it sends a Request
//! tagged with the operation name and returns a future settled by the
//! matching reply. Correlation uses a per-call ID allocated from a
//! monotonically increasing counter, so overlapping calls to the same
//! operation never steal each other's reply. The reply listeners for one
//! call are [`Subscription`](crate::channel::Subscription) guards local to
//! that call's future; they are dropped - and therefore deregistered - on
//! every resolution path, including caller cancellation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::channel::{Channel, Listener};
use crate::error::CallError;
use crate::protocol::{done_tag, error_tag, CallId, ReplyEnvelope, RequestEnvelope};
use crate::registry::Registry;

/// Outcome delivered by a settled reply listener.
type Settled = std::result::Result<Value, Value>;

/// Slot holding the one-shot sender for a pending call.
///
/// Shared between the `:done` and `:error` listeners; whichever fires first
/// takes the sender, so the call settles exactly once.
type SettleSlot = Arc<Mutex<Option<oneshot::Sender<Settled>>>>;

/// Generated asynchronous callable for one operation.
///
/// Cheaply cloneable; clones issue calls against the same channel and share
/// the client-wide correlation counter.
#[derive(Clone)]
pub struct Stub {
    operation: String,
    done_tag: String,
    error_tag: String,
    channel: Arc<dyn Channel>,
    next_call_id: Arc<AtomicU64>,
}

impl Stub {
    pub(crate) fn new(
        operation: &str,
        channel: Arc<dyn Channel>,
        next_call_id: Arc<AtomicU64>,
    ) -> Self {
        Self {
            operation: operation.to_string(),
            done_tag: done_tag(operation),
            error_tag: error_tag(operation),
            channel,
            next_call_id,
        }
    }

    /// Name of the operation this stub invokes.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Invoke the operation with a raw argument value.
    ///
    /// Resolves with the result payload on a Success Reply, or rejects with
    /// [`CallError::Rejected`] carrying the error payload verbatim on a
    /// Failure Reply. If no reply ever arrives the future stays pending;
    /// bounded latency is the caller's policy, not this layer's.
    pub async fn call_value(&self, args: Value) -> std::result::Result<Value, CallError> {
        let id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let slot: SettleSlot = Arc::new(Mutex::new(Some(tx)));

        // Fresh listener pair per call; the guards live exactly as long as
        // this future, so settling or cancellation deregisters both.
        let _done = self
            .channel
            .subscribe(&self.done_tag, settle_listener(slot.clone(), id, true));
        let _error = self
            .channel
            .subscribe(&self.error_tag, settle_listener(slot, id, false));

        let request = RequestEnvelope::new(id, args).into_value()?;
        self.channel.send(&self.operation, request)?;

        match rx.await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(payload)) => Err(CallError::Rejected(payload)),
            Err(_) => Err(CallError::ChannelClosed),
        }
    }

    /// Invoke the operation with typed arguments and a typed result.
    pub async fn call<T, R>(&self, args: &T) -> std::result::Result<R, CallError>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let args = serde_json::to_value(args)?;
        let reply = self.call_value(args).await?;
        Ok(serde_json::from_value(reply)?)
    }
}

/// Build the listener that settles a pending call from one reply kind.
fn settle_listener(slot: SettleSlot, id: CallId, success: bool) -> Box<Listener> {
    Box::new(move |payload: Value| {
        let envelope = match ReplyEnvelope::from_value(payload) {
            Ok(env) => env,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring reply with undecodable envelope");
                return;
            }
        };
        if envelope.id != id {
            // Reply belongs to a different pending call on this operation.
            return;
        }
        let sender = slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(tx) = sender {
            let outcome = if success {
                Ok(envelope.payload)
            } else {
                Err(envelope.payload)
            };
            let _ = tx.send(outcome);
        }
    })
}

/// The namespaced mapping of generated stubs for one registry.
///
/// This is the single root object installed into the restricted execution
/// surface: one property per declared operation name.
#[derive(Clone)]
pub struct Client {
    root: String,
    stubs: HashMap<String, Stub>,
}

impl Client {
    /// Generate one stub per descriptor in the registry.
    pub(crate) fn generate(registry: &Registry, root: &str, channel: Arc<dyn Channel>) -> Self {
        // Counter shared by all stubs of this client; ID 0 is never issued.
        let next_call_id = Arc::new(AtomicU64::new(1));

        let stubs = registry
            .list()
            .iter()
            .map(|descriptor| {
                let stub = Stub::new(descriptor.name(), channel.clone(), next_call_id.clone());
                (descriptor.name().to_string(), stub)
            })
            .collect();

        Self {
            root: root.to_string(),
            stubs,
        }
    }

    /// Root name this client is installed under.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Look up the stub for an operation name.
    pub fn stub(&self, operation: &str) -> Option<&Stub> {
        self.stubs.get(operation)
    }

    /// Names of all available operations (unordered).
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.stubs.keys().map(String::as_str)
    }

    /// Invoke an operation by name with a raw argument value.
    pub async fn call(
        &self,
        operation: &str,
        args: Value,
    ) -> std::result::Result<Value, CallError> {
        let stub = self
            .stubs
            .get(operation)
            .ok_or_else(|| CallError::UnknownOperation(operation.to_string()))?;
        stub.call_value(args).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("root", &self.root)
            .field("operations", &self.stubs.len())
            .finish()
    }
}
