//! Handler registry - named operation descriptors and dispatch-by-name.
//!
//! The registry is the shared source of truth for both sides of the bridge:
//! the client stub generator reads it to know which stubs to produce, and
//! the server dispatcher reads it to know which handlers to bind. It is
//! populated single-threaded during setup and read-only afterwards.
//!
//! Every implementation, whether it produces its result immediately or
//! after suspension, is invoked through the same [`Handler`] trait that
//! yields a single deferred outcome, so the dispatcher never special-cases
//! synchronous handlers.
//!
//! # Example
//!
//! ```
//! use crosswire::registry::Registry;
//! use serde_json::Value;
//!
//! let mut registry = Registry::new();
//!
//! registry
//!     .declare("echo", |args: Value| async move { Ok::<_, Value>(args) })
//!     .unwrap();
//!
//! assert!(registry.contains("echo"));
//! ```

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{CrosswireError, Result};
use crate::protocol::validate_operation_name;

/// Outcome of one handler invocation: success payload or opaque error payload.
pub type HandlerOutcome = std::result::Result<Value, Value>;

/// Boxed future for handler outcomes.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Uniform asynchronous invocation contract for bound implementations.
pub trait Handler: Send + Sync + 'static {
    /// Invoke the implementation with a structured argument value.
    fn invoke(&self, args: Value) -> BoxFuture<'static, HandlerOutcome>;
}

/// Wrapper adapting an async closure `Fn(T) -> Future<Result<R, E>>`.
///
/// Deserializes the argument value before calling the closure and
/// serializes both outcome arms back into channel-transportable values.
pub struct AsyncHandler<F, T, R, E, Fut>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    E: Serialize + Send + 'static,
    Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(T) -> (Fut, R, E)>,
}

impl<F, T, R, E, Fut> AsyncHandler<F, T, R, E, Fut>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    E: Serialize + Send + 'static,
    Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
{
    /// Create a new async handler wrapper.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, T, R, E, Fut> Handler for AsyncHandler<F, T, R, E, Fut>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    E: Serialize + Send + 'static,
    Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
{
    fn invoke(&self, args: Value) -> BoxFuture<'static, HandlerOutcome> {
        let parsed: T = match serde_json::from_value(args) {
            Ok(v) => v,
            Err(e) => {
                let failure = argument_error_payload(&e);
                return Box::pin(async move { Err(failure) });
            }
        };

        let fut = (self.handler)(parsed);
        Box::pin(async move { normalize(fut.await) })
    }
}

/// Wrapper adapting a plain synchronous closure `Fn(T) -> Result<R, E>`.
///
/// Observably equivalent to [`AsyncHandler`]: the outcome is still delivered
/// through the same deferred [`Handler`] contract.
pub struct SyncHandler<F, T, R, E>
where
    F: Fn(T) -> std::result::Result<R, E> + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    E: Serialize + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(T) -> (R, E)>,
}

impl<F, T, R, E> SyncHandler<F, T, R, E>
where
    F: Fn(T) -> std::result::Result<R, E> + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    E: Serialize + Send + 'static,
{
    /// Create a new sync handler wrapper.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, T, R, E> Handler for SyncHandler<F, T, R, E>
where
    F: Fn(T) -> std::result::Result<R, E> + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    E: Serialize + Send + 'static,
{
    fn invoke(&self, args: Value) -> BoxFuture<'static, HandlerOutcome> {
        let parsed: T = match serde_json::from_value(args) {
            Ok(v) => v,
            Err(e) => {
                let failure = argument_error_payload(&e);
                return Box::pin(async move { Err(failure) });
            }
        };

        let outcome = normalize((self.handler)(parsed));
        Box::pin(async move { outcome })
    }
}

/// Convert a typed outcome into transportable success/failure payloads.
fn normalize<R: Serialize, E: Serialize>(outcome: std::result::Result<R, E>) -> HandlerOutcome {
    match outcome {
        Ok(result) => match serde_json::to_value(result) {
            Ok(v) => Ok(v),
            Err(e) => Err(conversion_error_payload(&e)),
        },
        Err(failure) => match serde_json::to_value(failure) {
            Ok(v) => Err(v),
            Err(e) => Err(conversion_error_payload(&e)),
        },
    }
}

/// Failure payload for arguments that do not decode to the handler's type.
///
/// Produced instead of dropping the request, so the exactly-one-reply
/// guarantee holds even for malformed argument objects.
fn argument_error_payload(err: &serde_json::Error) -> Value {
    json!({ "error": format!("invalid arguments: {err}") })
}

/// Failure payload for outcomes that cannot cross the channel boundary.
fn conversion_error_payload(err: &serde_json::Error) -> Value {
    json!({ "error": format!("payload not transportable: {err}") })
}

/// One named, invocable capability.
pub struct Descriptor {
    name: String,
    handler: Arc<dyn Handler>,
}

impl Descriptor {
    /// Operation name; doubles as the wire-level Request tag.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the bound implementation.
    pub fn handler(&self) -> Arc<dyn Handler> {
        self.handler.clone()
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor").field("name", &self.name).finish()
    }
}

/// Insertion-ordered collection of operation descriptors.
#[derive(Default)]
pub struct Registry {
    operations: Vec<Descriptor>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an operation backed by an async implementation.
    ///
    /// Fails fast with a configuration error if the name is empty, contains
    /// the reserved `:` separator, or is already declared.
    pub fn declare<F, T, R, E, Fut>(&mut self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        E: Serialize + Send + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
    {
        self.insert(name, Arc::new(AsyncHandler::new(handler)))
    }

    /// Declare an operation backed by a synchronous implementation.
    pub fn declare_sync<F, T, R, E>(&mut self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(T) -> std::result::Result<R, E> + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        E: Serialize + Send + 'static,
    {
        self.insert(name, Arc::new(SyncHandler::new(handler)))
    }

    fn insert(&mut self, name: &str, handler: Arc<dyn Handler>) -> Result<()> {
        validate_operation_name(name)?;
        if self.contains(name) {
            return Err(CrosswireError::DuplicateOperation(name.to_string()));
        }
        self.operations.push(Descriptor {
            name: name.to_string(),
            handler,
        });
        Ok(())
    }

    /// Whether an operation with this name is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.operations.iter().any(|d| d.name == name)
    }

    /// Read-only, insertion-ordered view of the declared operations.
    pub fn list(&self) -> &[Descriptor] {
        &self.operations
    }

    /// Number of declared operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether no operations are declared.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("operations", &self.operations)
            .finish()
    }
}
