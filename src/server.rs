//! Server dispatcher - binds real implementations to incoming requests.
//!
//! For every operation in the registry the dispatcher registers one
//! persistent listener on the operation's Request tag. Each received
//! request is handled on its own task: the bound implementation is invoked
//! through the uniform async contract, and exactly one reply - `:done` on
//! success, `:error` on failure - is sent back on the same channel handle
//! the request arrived on. A failing handler is converted into reply data
//! at the dispatch site; it never tears down the dispatcher and never
//! affects other pending or future calls.

use std::sync::Arc;

use serde_json::Value;

use crate::channel::{Channel, Subscription};
use crate::protocol::{done_tag, error_tag, ReplyEnvelope, RequestEnvelope};
use crate::registry::{Handler, Registry};

/// A running dispatcher.
///
/// Holds the per-operation listener subscriptions; dropping the server
/// deregisters them all and stops dispatch. Unlike the client side's
/// fire-once ephemeral listeners, these are long-lived and reused across
/// many requests to the same operation.
pub struct Server {
    subscriptions: Vec<Subscription>,
}

impl Server {
    /// Bind one dispatch listener per declared operation.
    pub(crate) fn bind(registry: &Registry, channel: Arc<dyn Channel>) -> Self {
        let subscriptions = registry
            .list()
            .iter()
            .map(|descriptor| {
                let listener = dispatch_listener(
                    descriptor.name(),
                    descriptor.handler(),
                    channel.clone(),
                );
                channel.subscribe(descriptor.name(), listener)
            })
            .collect();

        Self { subscriptions }
    }

    /// Number of operations with a bound dispatch listener.
    pub fn operation_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("operations", &self.subscriptions.len())
            .finish()
    }
}

/// Build the persistent listener dispatching one operation.
fn dispatch_listener(
    operation: &str,
    handler: Arc<dyn Handler>,
    channel: Arc<dyn Channel>,
) -> Box<crate::channel::Listener> {
    let operation = operation.to_string();
    let done_tag = done_tag(&operation);
    let error_tag = error_tag(&operation);

    Box::new(move |payload: Value| {
        let envelope = match RequestEnvelope::from_value(payload) {
            Ok(env) => env,
            Err(err) => {
                // Without a correlation ID there is nothing to reply to.
                tracing::warn!(
                    operation = %operation,
                    error = %err,
                    "dropping request with undecodable envelope"
                );
                return;
            }
        };

        let handler = handler.clone();
        let channel = channel.clone();
        let operation = operation.clone();
        let done_tag = done_tag.clone();
        let error_tag = error_tag.clone();

        tokio::spawn(async move {
            let (tag, payload) = match handler.invoke(envelope.args).await {
                Ok(result) => (done_tag, result),
                Err(failure) => (error_tag, failure),
            };

            match ReplyEnvelope::new(envelope.id, payload).into_value() {
                Ok(reply) => {
                    if let Err(err) = channel.send(&tag, reply) {
                        tracing::error!(
                            operation = %operation,
                            call_id = envelope.id,
                            error = %err,
                            "failed to send reply"
                        );
                    }
                }
                Err(err) => {
                    tracing::error!(
                        operation = %operation,
                        call_id = envelope.id,
                        error = %err,
                        "failed to encode reply envelope"
                    );
                }
            }
        });
    })
}
