//! Stream-backed channel with a dedicated writer task.
//!
//! ```text
//! send() ──► mpsc::UnboundedSender<Vec<u8>> ──► Writer Task ──► stream
//! stream ──► Read Loop ──► FrameBuffer ──► listener dispatch
//! ```
//!
//! `send` stays synchronous and fire-and-forget: frames are encoded in the
//! caller and handed to the writer task through the queue. The read loop
//! decodes MessagePack payloads back into structured values and dispatches
//! them to the listeners registered on this endpoint.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::frame_buffer::FrameBuffer;
use super::wire::build_frame;
use crate::channel::{Channel, Listener, ListenerTable, Subscription};
use crate::error::{CrosswireError, Result};

/// Channel endpoint running over an `AsyncRead`/`AsyncWrite` pair.
pub struct StreamChannel {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    listeners: Arc<ListenerTable>,
    _read_task: JoinHandle<()>,
    _write_task: JoinHandle<()>,
}

impl StreamChannel {
    /// Spawn the read and write tasks for one endpoint.
    ///
    /// The endpoint is usable immediately; the tasks end when the stream
    /// reaches EOF or the endpoint is dropped and the outbound queue drains.
    pub fn spawn<R, W>(reader: R, writer: W) -> Arc<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let listeners = Arc::new(ListenerTable::new());

        let read_listeners = listeners.clone();
        let read_task = tokio::spawn(async move {
            if let Err(err) = read_loop(reader, read_listeners).await {
                tracing::error!(error = %err, "transport read loop terminated");
            }
        });

        let write_task = tokio::spawn(async move {
            if let Err(err) = write_loop(outbound_rx, writer).await {
                tracing::error!(error = %err, "transport write loop terminated");
            }
        });

        Arc::new(Self {
            outbound,
            listeners,
            _read_task: read_task,
            _write_task: write_task,
        })
    }
}

impl Channel for StreamChannel {
    fn send(&self, tag: &str, payload: Value) -> Result<()> {
        let encoded = rmp_serde::to_vec_named(&payload)?;
        let frame = build_frame(tag, &encoded)?;
        self.outbound
            .send(frame)
            .map_err(|_| CrosswireError::ChannelClosed)
    }

    fn subscribe(&self, tag: &str, listener: Box<Listener>) -> Subscription {
        let token = self.listeners.insert(tag, listener);
        let table = self.listeners.clone();
        let tag = tag.to_string();
        Subscription::new(move || table.remove(&tag, token))
    }
}

/// Read frames off the stream and dispatch their payloads.
async fn read_loop<R>(mut reader: R, listeners: Arc<ListenerTable>) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut frame_buffer = FrameBuffer::new();
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            // Peer closed the stream.
            return Ok(());
        }

        for frame in frame_buffer.push(&buf[..n])? {
            match rmp_serde::from_slice::<Value>(&frame.payload) {
                Ok(value) => listeners.dispatch(&frame.tag, &value),
                Err(err) => {
                    tracing::warn!(
                        tag = %frame.tag,
                        error = %err,
                        "dropping frame with undecodable payload"
                    );
                }
            }
        }
    }
}

/// Drain queued frames onto the stream, flushing once per burst.
async fn write_loop<W>(mut rx: mpsc::UnboundedReceiver<Vec<u8>>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        writer.write_all(&frame).await?;
        while let Ok(next) = rx.try_recv() {
            writer.write_all(&next).await?;
        }
        writer.flush().await?;
    }
    Ok(())
}
