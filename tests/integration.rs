//! Integration tests for crosswire.
//!
//! These tests exercise the full path: builder -> registry -> dispatcher
//! on one endpoint, generated stubs on the other, over both channel
//! implementations.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crosswire::transport::StreamChannel;
use crosswire::{Bridge, CallError, CrosswireError, LocalSurface, MemoryChannel};

#[derive(Serialize, Deserialize)]
struct EchoArgs {
    value: i64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct EchoReply {
    value: i64,
}

/// Bridge used by most scenarios: an echo operation and a failing one.
fn echo_bridge() -> Bridge {
    Bridge::builder()
        .declare("echo", |args: EchoArgs| async move {
            Ok::<_, Value>(EchoReply { value: args.value })
        })
        .unwrap()
        .declare("fail", |_args: Value| async move {
            Err::<Value, _>(json!({ "code": "BOOM" }))
        })
        .unwrap()
        .build()
}

/// Declared operation succeeds: the stub resolves to exactly the result.
#[tokio::test]
async fn test_end_to_end_echo() {
    let bridge = echo_bridge();
    let (front, back) = MemoryChannel::pair();
    let _server = bridge.connect_server(Arc::new(back));

    let surface = LocalSurface::new();
    let client = bridge.expose_client(Arc::new(front), &surface);

    let reply = client.call("echo", json!({ "value": 42 })).await.unwrap();
    assert_eq!(reply, json!({ "value": 42 }));
}

/// Declared operation fails: the stub rejects with exactly the error payload.
#[tokio::test]
async fn test_end_to_end_fail() {
    let bridge = echo_bridge();
    let (front, back) = MemoryChannel::pair();
    let _server = bridge.connect_server(Arc::new(back));

    let surface = LocalSurface::new();
    let client = bridge.expose_client(Arc::new(front), &surface);

    let result = client.call("fail", json!({})).await;
    match result {
        Err(CallError::Rejected(payload)) => assert_eq!(payload, json!({ "code": "BOOM" })),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

/// Typed stub calls deserialize the reply into the caller's type.
#[tokio::test]
async fn test_typed_stub_call() {
    let bridge = echo_bridge();
    let (front, back) = MemoryChannel::pair();
    let _server = bridge.connect_server(Arc::new(back));

    let surface = LocalSurface::new();
    let client = bridge.expose_client(Arc::new(front), &surface);

    let stub = client.stub("echo").unwrap();
    let reply: EchoReply = stub.call(&EchoArgs { value: 7 }).await.unwrap();
    assert_eq!(reply, EchoReply { value: 7 });
}

/// Two overlapping calls to the same operation each resolve to the result
/// computed from their own argument, never the other's. The first call's
/// handler finishes after the second's, so the replies arrive out of call
/// order and only correlation IDs keep them apart.
#[tokio::test]
async fn test_overlapping_calls_to_same_operation() {
    #[derive(Serialize, Deserialize)]
    struct SlowArgs {
        delay_ms: u64,
        value: i64,
    }

    let bridge = Bridge::builder()
        .declare("slow_echo", |args: SlowArgs| async move {
            tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
            Ok::<_, Value>(json!({ "value": args.value }))
        })
        .unwrap()
        .build();

    let (front, back) = MemoryChannel::pair();
    let _server = bridge.connect_server(Arc::new(back));

    let surface = LocalSurface::new();
    let client = bridge.expose_client(Arc::new(front), &surface);

    let first = client.call("slow_echo", json!({ "delay_ms": 80, "value": 1 }));
    let second = client.call("slow_echo", json!({ "delay_ms": 5, "value": 2 }));

    let (first, second) = tokio::join!(first, second);
    assert_eq!(first.unwrap(), json!({ "value": 1 }));
    assert_eq!(second.unwrap(), json!({ "value": 2 }));
}

/// A handler returning a plain value and one returning a future produce
/// identical success payloads.
#[tokio::test]
async fn test_sync_and_async_implementations_equivalent() {
    let bridge = Bridge::builder()
        .declare("async_double", |args: EchoArgs| async move {
            Ok::<_, Value>(EchoReply {
                value: args.value * 2,
            })
        })
        .unwrap()
        .declare_sync("sync_double", |args: EchoArgs| {
            Ok::<_, Value>(EchoReply {
                value: args.value * 2,
            })
        })
        .unwrap()
        .build();

    let (front, back) = MemoryChannel::pair();
    let _server = bridge.connect_server(Arc::new(back));

    let surface = LocalSurface::new();
    let client = bridge.expose_client(Arc::new(front), &surface);

    let from_async = client.call("async_double", json!({ "value": 21 })).await.unwrap();
    let from_sync = client.call("sync_double", json!({ "value": 21 })).await.unwrap();
    assert_eq!(from_async, from_sync);
    assert_eq!(from_async, json!({ "value": 42 }));
}

/// Duplicate declaration is a configuration error at setup time.
#[test]
fn test_duplicate_declaration_rejected_at_setup() {
    let result = Bridge::builder()
        .declare("op", |args: Value| async move { Ok::<_, Value>(args) })
        .unwrap()
        .declare("op", |args: Value| async move { Ok::<_, Value>(args) });

    assert!(matches!(
        result,
        Err(CrosswireError::DuplicateOperation(name)) if name == "op"
    ));
}

/// Declaration order affects neither availability nor behavior.
#[tokio::test]
async fn test_declaration_order_does_not_affect_availability() {
    let build = |reversed: bool| {
        let names = if reversed {
            ["beta", "alpha"]
        } else {
            ["alpha", "beta"]
        };
        let mut builder = Bridge::builder();
        for name in names {
            builder = builder
                .declare(name, |args: Value| async move { Ok::<_, Value>(args) })
                .unwrap();
        }
        builder.build()
    };

    for bridge in [build(false), build(true)] {
        let (front, back) = MemoryChannel::pair();
        let _server = bridge.connect_server(Arc::new(back));

        let surface = LocalSurface::new();
        let client = bridge.expose_client(Arc::new(front), &surface);

        let mut names: Vec<_> = client.operation_names().map(str::to_string).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(
            client.call("alpha", json!(1)).await.unwrap(),
            json!(1)
        );
    }
}

/// The client mapping is reachable through the surface under its root name.
#[tokio::test]
async fn test_exposed_client_reachable_through_surface() {
    let bridge = echo_bridge();
    let (front, back) = MemoryChannel::pair();
    let _server = bridge.connect_server(Arc::new(back));

    let surface = LocalSurface::new();
    bridge.expose_client(Arc::new(front), &surface);

    let client = surface.get("crosswire").unwrap();
    let reply = client.call("echo", json!({ "value": 9 })).await.unwrap();
    assert_eq!(reply, json!({ "value": 9 }));
}

/// A custom root name is honored on the surface.
#[tokio::test]
async fn test_custom_root_name() {
    let bridge = Bridge::builder()
        .declare("ping", |_args: Value| async move { Ok::<_, Value>(json!("pong")) })
        .unwrap()
        .root("backend")
        .build();

    let (front, back) = MemoryChannel::pair();
    let _server = bridge.connect_server(Arc::new(back));

    let surface = LocalSurface::new();
    bridge.expose_client(Arc::new(front), &surface);

    assert!(surface.get("crosswire").is_none());
    let client = surface.get("backend").unwrap();
    assert_eq!(client.call("ping", json!({})).await.unwrap(), json!("pong"));
}

/// Full protocol over the byte-stream transport.
#[tokio::test]
async fn test_end_to_end_over_stream_transport() {
    let bridge = echo_bridge();

    let (front_io, back_io) = tokio::io::duplex(64 * 1024);
    let (front_read, front_write) = tokio::io::split(front_io);
    let (back_read, back_write) = tokio::io::split(back_io);

    let front = StreamChannel::spawn(front_read, front_write);
    let back = StreamChannel::spawn(back_read, back_write);

    let _server = bridge.connect_server(back);

    let surface = LocalSurface::new();
    let client = bridge.expose_client(front, &surface);

    let reply = client.call("echo", json!({ "value": 42 })).await.unwrap();
    assert_eq!(reply, json!({ "value": 42 }));

    let result = client.call("fail", json!({})).await;
    match result {
        Err(CallError::Rejected(payload)) => assert_eq!(payload, json!({ "code": "BOOM" })),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

/// Overlapping same-operation calls stay correlated across the stream
/// transport as well.
#[tokio::test]
async fn test_overlapping_calls_over_stream_transport() {
    #[derive(Serialize, Deserialize)]
    struct SlowArgs {
        delay_ms: u64,
        value: i64,
    }

    let bridge = Bridge::builder()
        .declare("slow_echo", |args: SlowArgs| async move {
            tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
            Ok::<_, Value>(json!(args.value))
        })
        .unwrap()
        .build();

    let (front_io, back_io) = tokio::io::duplex(64 * 1024);
    let (front_read, front_write) = tokio::io::split(front_io);
    let (back_read, back_write) = tokio::io::split(back_io);

    let front = StreamChannel::spawn(front_read, front_write);
    let back = StreamChannel::spawn(back_read, back_write);

    let _server = bridge.connect_server(back);
    let surface = LocalSurface::new();
    let client = bridge.expose_client(front, &surface);

    let slow = client.call("slow_echo", json!({ "delay_ms": 80, "value": 10 }));
    let fast = client.call("slow_echo", json!({ "delay_ms": 5, "value": 20 }));

    let (slow, fast) = tokio::join!(slow, fast);
    assert_eq!(slow.unwrap(), json!(10));
    assert_eq!(fast.unwrap(), json!(20));
}

/// A handler that never terminates leaves only its own call pending; other
/// operations keep working while it hangs.
#[tokio::test]
async fn test_hanging_handler_does_not_block_other_operations() {
    let bridge = Bridge::builder()
        .declare("hang", |_args: Value| async move {
            std::future::pending::<()>().await;
            Ok::<_, Value>(json!(null))
        })
        .unwrap()
        .declare("ping", |_args: Value| async move { Ok::<_, Value>(json!("pong")) })
        .unwrap()
        .build();

    let (front, back) = MemoryChannel::pair();
    let _server = bridge.connect_server(Arc::new(back));

    let surface = LocalSurface::new();
    let client = bridge.expose_client(Arc::new(front), &surface);

    let hanging = client.call("hang", json!({}));
    tokio::pin!(hanging);

    // The hanging call must still be pending while ping resolves.
    tokio::select! {
        _ = &mut hanging => panic!("hanging call settled"),
        reply = client.call("ping", json!({})) => {
            assert_eq!(reply.unwrap(), json!("pong"));
        }
    }
}
