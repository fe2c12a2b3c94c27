//! Echo bridge - simple request/response demo.
//!
//! This demo shows:
//! - Declaring operations with the builder pattern
//! - Connecting the dispatcher on the back endpoint
//! - Exposing the client mapping on the front endpoint
//! - Resolution and rejection of stub calls

use std::sync::Arc;

use crosswire::{Bridge, CallError, LocalSurface, MemoryChannel};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Deserialize)]
struct EchoArgs {
    value: i64,
}

#[derive(Serialize)]
struct EchoReply {
    value: i64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let bridge = Bridge::builder()
        .declare("echo", |args: EchoArgs| async move {
            Ok::<_, Value>(EchoReply { value: args.value })
        })?
        .declare("fail", |_args: Value| async move {
            Err::<Value, _>(json!({ "code": "BOOM" }))
        })?
        .build();

    // Back context: bind the real implementations.
    let (front, back) = MemoryChannel::pair();
    let _server = bridge.connect_server(Arc::new(back));

    // Front context: install the stubs and call through the surface.
    let surface = LocalSurface::new();
    bridge.expose_client(Arc::new(front), &surface);
    let client = surface.get("crosswire").expect("client installed");

    let reply = client.call("echo", json!({ "value": 42 })).await?;
    println!("echo resolved: {reply}");

    match client.call("fail", json!({})).await {
        Err(CallError::Rejected(payload)) => println!("fail rejected: {payload}"),
        other => println!("unexpected outcome: {other:?}"),
    }

    Ok(())
}
