//! Per-connection read and write pumps.
//!
//! The pumps are transport agnostic: the write side is any `Sink<Frame>` and
//! the read side any `Stream` of [`Inbound`] results. The web layer adapts a
//! WebSocket into these; tests use in-memory channels.

use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::connection::{ConnectionHandle, OutboundQueue};
use crate::hub::HubHandle;

/// A frame written to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(Arc<str>),
    Close,
}

/// A frame read from the client. The protocol is push-only, so the
/// content of data frames is not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    Message,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundExit {
    /// The queue was closed and every queued frame was written.
    Drained,
    WriteFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundExit {
    PeerClosed,
    ReadFailed,
}

/// Write queued frames in order until the queue closes or a write fails.
///
/// On a clean drain a close frame is sent before the sink is released.
pub async fn outbound_pump<S>(mut sink: S, mut queue: OutboundQueue) -> OutboundExit
where
    S: Sink<Frame> + Unpin,
    S::Error: Display,
{
    while let Some(text) = queue.recv().await {
        if let Err(e) = sink.send(Frame::Text(text)).await {
            debug!(error = %e, "Write failed, stopping outbound pump");
            return OutboundExit::WriteFailed;
        }
    }

    if let Err(e) = sink.send(Frame::Close).await {
        debug!(error = %e, "Failed to send close frame");
    }
    let _ = sink.close().await;
    OutboundExit::Drained
}

/// Read and discard client frames until the peer goes away, then unregister.
pub async fn inbound_pump<R, E>(
    mut stream: R,
    hub: HubHandle,
    handle: ConnectionHandle,
) -> InboundExit
where
    R: Stream<Item = Result<Inbound, E>> + Unpin,
    E: Display,
{
    let exit = loop {
        match stream.next().await {
            Some(Ok(Inbound::Message)) => {}
            Some(Ok(Inbound::Close)) | None => break InboundExit::PeerClosed,
            Some(Err(e)) => {
                warn!(connection = %handle.id, team = %handle.team, error = %e, "Read failed");
                break InboundExit::ReadFailed;
            }
        }
    };

    hub.unregister(handle);
    exit
}

/// Run both pumps for a registered connection until it is finished.
///
/// If the read side ends first the hub closes the queue and the write side
/// drains. If the write side ends first the connection is unregistered and
/// the read side is stopped.
pub async fn drive_connection<S, R, E>(
    hub: HubHandle,
    handle: ConnectionHandle,
    queue: OutboundQueue,
    sink: S,
    stream: R,
) where
    S: Sink<Frame> + Unpin + Send + 'static,
    S::Error: Display + Send + 'static,
    R: Stream<Item = Result<Inbound, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    let mut outbound = tokio::spawn(outbound_pump(sink, queue));
    let mut inbound = tokio::spawn(inbound_pump(stream, hub.clone(), handle));

    tokio::select! {
        exit = &mut inbound => {
            debug!(connection = %handle.id, ?exit, "Inbound pump finished");
            if let Ok(exit) = outbound.await {
                debug!(connection = %handle.id, ?exit, "Outbound pump finished");
            }
        }
        exit = &mut outbound => {
            debug!(connection = %handle.id, ?exit, "Outbound pump finished first");
            hub.unregister(handle);
            inbound.abort();
        }
    }
}
