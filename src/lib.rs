//! # crosswire
//!
//! Request/response correlation layer over a one-way, name-tagged
//! asynchronous message channel connecting two isolated execution contexts:
//! a "front" context with restricted privileges and a "back" context that
//! owns privileged operations.
//!
//! The front context invokes named operations implemented in the back
//! context as if they were local async functions. Framing, per-call
//! correlation, and error propagation are this crate's job; the transport
//! underneath only has to deliver name-tagged messages.
//!
//! ## Architecture
//!
//! - **Registry** - named operation descriptors, declared once at startup
//! - **Client** - generated promise-returning stubs, one per operation,
//!   installed under a single root name into an exposure [`Surface`]
//! - **Server** - dispatcher binding the real implementations and replying
//!   exactly once per request (`op:done` or `op:error`)
//!
//! The channel is always an explicit handle, never ambient state:
//! [`MemoryChannel`] pairs two in-process endpoints, and
//! [`StreamChannel`](transport::StreamChannel) runs the same protocol over
//! any byte stream.
//!
//! ## Example
//!
//! ```ignore
//! use crosswire::{Bridge, LocalSurface, MemoryChannel};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bridge = Bridge::builder()
//!         .declare("echo", |args: Value| async move { Ok::<_, Value>(args) })?
//!         .build();
//!
//!     let (front, back) = MemoryChannel::pair();
//!     let _server = bridge.connect_server(Arc::new(back));
//!
//!     let surface = LocalSurface::new();
//!     let client = bridge.expose_client(Arc::new(front), &surface);
//!
//!     let reply = client.call("echo", json!({ "value": 42 })).await?;
//!     assert_eq!(reply, json!({ "value": 42 }));
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod surface;
pub mod transport;

mod bridge;
mod client;
mod server;

pub use bridge::{Bridge, BridgeBuilder, DEFAULT_ROOT};
pub use channel::{Channel, MemoryChannel, Subscription};
pub use client::{Client, Stub};
pub use error::{CallError, CrosswireError, Result};
pub use server::Server;
pub use surface::{LocalSurface, Surface};
