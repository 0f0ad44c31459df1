//! A live client connection as seen by the hub.

use noted_core::TeamId;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Unique identifier of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Copyable reference to a connection, used to unregister it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub team: TeamId,
}

/// The producer side of a connection, owned by the hub once registered.
///
/// Holding the only sender means that dropping a `Connection` closes its
/// outbound queue.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    team: TeamId,
    outbound: mpsc::Sender<Arc<str>>,
}

/// The consumer side of a connection's bounded outbound queue.
#[derive(Debug)]
pub struct OutboundQueue {
    rx: mpsc::Receiver<Arc<str>>,
}

/// Result of a non-blocking enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Queued,
    Full,
    Closed,
}

impl Connection {
    /// Create a connection scoped to `team` with a queue of `capacity` frames.
    pub fn open(team: TeamId, capacity: usize) -> (Self, OutboundQueue) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let conn = Self {
            id: ConnectionId::new(),
            team,
            outbound,
        };
        (conn, OutboundQueue { rx })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn team(&self) -> TeamId {
        self.team
    }

    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle {
            id: self.id,
            team: self.team,
        }
    }

    pub(crate) fn try_deliver(&self, frame: &Arc<str>) -> Delivery {
        match self.outbound.try_send(Arc::clone(frame)) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Full,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

impl OutboundQueue {
    /// Wait for the next frame. `None` once the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.rx.recv().await
    }

    /// Take a queued frame without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<str>> {
        self.rx.try_recv().ok()
    }

    /// True once the producer side is gone and nothing is left to read.
    #[cfg(test)]
    fn is_closed(&self) -> bool {
        self.rx.is_closed() && self.rx.is_empty()
    }
}
