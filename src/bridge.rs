//! Bridge builder - the setup-time API assembling both sides.
//!
//! A [`BridgeBuilder`] accumulates operation declarations into a registry,
//! failing fast on configuration errors. [`BridgeBuilder::build`] freezes
//! the registry; the resulting [`Bridge`] hands read-only views to whichever
//! role the process plays: [`Bridge::expose_client`] in the front context,
//! [`Bridge::connect_server`] in the back context. Within one process only
//! one role is active, but both read the same registry data.
//!
//! # Example
//!
//! ```
//! use crosswire::{Bridge, LocalSurface, MemoryChannel};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bridge = Bridge::builder()
//!     .declare("echo", |args: Value| async move { Ok::<_, Value>(args) })?
//!     .build();
//!
//! let (front, back) = MemoryChannel::pair();
//! let _server = bridge.connect_server(Arc::new(back));
//!
//! let surface = LocalSurface::new();
//! bridge.expose_client(Arc::new(front), &surface);
//!
//! let client = surface.get("crosswire").unwrap();
//! let reply = client.call("echo", json!({ "value": 42 })).await?;
//! assert_eq!(reply, json!({ "value": 42 }));
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::channel::Channel;
use crate::client::Client;
use crate::error::Result;
use crate::registry::Registry;
use crate::server::Server;
use crate::surface::Surface;

/// Well-known root name the client mapping is installed under by default.
pub const DEFAULT_ROOT: &str = "crosswire";

/// Builder accumulating operation declarations.
///
/// Declarations are chainable through `?`; every configuration error
/// (empty, duplicate, or `:`-containing name) surfaces at declare time,
/// never at call time.
pub struct BridgeBuilder {
    registry: Registry,
    root: String,
}

impl BridgeBuilder {
    /// Create a new builder with the default exposure root.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            root: DEFAULT_ROOT.to_string(),
        }
    }

    /// Declare an operation backed by an async implementation.
    pub fn declare<F, T, R, E, Fut>(mut self, name: &str, handler: F) -> Result<Self>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        E: Serialize + Send + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
    {
        self.registry.declare(name, handler)?;
        Ok(self)
    }

    /// Declare an operation backed by a synchronous implementation.
    pub fn declare_sync<F, T, R, E>(mut self, name: &str, handler: F) -> Result<Self>
    where
        F: Fn(T) -> std::result::Result<R, E> + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        E: Serialize + Send + 'static,
    {
        self.registry.declare_sync(name, handler)?;
        Ok(self)
    }

    /// Override the root name the client mapping is installed under.
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Freeze the registry.
    pub fn build(self) -> Bridge {
        Bridge {
            registry: Arc::new(self.registry),
            root: self.root,
        }
    }
}

impl Default for BridgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A finalized operation set, ready to take either role.
pub struct Bridge {
    registry: Arc<Registry>,
    root: String,
}

impl Bridge {
    /// Create a new bridge builder.
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Read-only view of the declared operations.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Root name the client mapping is installed under.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Generate the client stubs and install them into the surface.
    ///
    /// The installed mapping is also returned so in-process hosts can call
    /// through it directly.
    pub fn expose_client(&self, channel: Arc<dyn Channel>, surface: &dyn Surface) -> Client {
        let client = Client::generate(&self.registry, &self.root, channel);
        surface.install(&self.root, client.clone());
        client
    }

    /// Bind all dispatch listeners on the given channel.
    ///
    /// The returned [`Server`] guard keeps the listeners registered for as
    /// long as it lives.
    #[must_use = "dropping the Server unbinds all dispatch listeners"]
    pub fn connect_server(&self, channel: Arc<dyn Channel>) -> Server {
        Server::bind(&self.registry, channel)
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("root", &self.root)
            .field("operations", &self.registry.len())
            .finish()
    }
}
