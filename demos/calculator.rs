//! Calculator bridge over the byte-stream transport.
//!
//! Runs the same protocol across an in-process duplex stream, the way two
//! real processes would talk over a pipe or socket. Demonstrates typed
//! stubs, synchronous handlers, and handler failures crossing the stream.

use crosswire::transport::StreamChannel;
use crosswire::{Bridge, CallError, LocalSurface};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Serialize, Deserialize)]
struct BinaryArgs {
    a: f64,
    b: f64,
}

#[derive(Serialize, Deserialize, Debug)]
struct BinaryReply {
    result: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let bridge = Bridge::builder()
        .declare_sync("add", |args: BinaryArgs| {
            Ok::<_, Value>(BinaryReply {
                result: args.a + args.b,
            })
        })?
        .declare("divide", |args: BinaryArgs| async move {
            if args.b == 0.0 {
                return Err(json!({ "code": "DIV_BY_ZERO" }));
            }
            Ok(BinaryReply {
                result: args.a / args.b,
            })
        })?
        .root("calculator")
        .build();

    let (front_io, back_io) = tokio::io::duplex(64 * 1024);
    let (front_read, front_write) = tokio::io::split(front_io);
    let (back_read, back_write) = tokio::io::split(back_io);

    let back = StreamChannel::spawn(back_read, back_write);
    let _server = bridge.connect_server(back);

    let front = StreamChannel::spawn(front_read, front_write);
    let surface = LocalSurface::new();
    bridge.expose_client(front, &surface);
    let client = surface.get("calculator").expect("client installed");

    let sum: BinaryReply = client
        .stub("add")
        .expect("add declared")
        .call(&BinaryArgs { a: 19.0, b: 23.0 })
        .await?;
    println!("add resolved: {sum:?}");

    match client.call("divide", json!({ "a": 1.0, "b": 0.0 })).await {
        Err(CallError::Rejected(payload)) => println!("divide rejected: {payload}"),
        other => println!("unexpected outcome: {other:?}"),
    }

    Ok(())
}
