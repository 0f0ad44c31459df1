//! The hub control loop.
//!
//! Registration, unregistration and publishing are sent as commands to a
//! single task that owns the team -> connections map. Nothing else touches
//! the map, so membership changes and fan-out never interleave.

use noted_core::config::HubConfig;
use noted_core::{Event, TeamId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connection::{Connection, ConnectionHandle, ConnectionId, Delivery, OutboundQueue};

enum Command {
    Register(Connection),
    Unregister(ConnectionHandle),
    Publish(Event),
    Snapshot(oneshot::Sender<HubSnapshot>),
    Shutdown,
}

/// A running hub. Dropping it leaves the loop running until every
/// [`HubHandle`] is gone; call [`Hub::shutdown`] to stop it explicitly.
pub struct Hub {
    handle: HubHandle,
    task: JoinHandle<()>,
}

/// Cheap, cloneable entry point to a running hub.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<Command>,
    outbound_capacity: usize,
}

/// Point-in-time view of hub membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubSnapshot {
    pub teams: BTreeMap<TeamId, Vec<ConnectionId>>,
}

impl HubSnapshot {
    pub fn connection_count(&self) -> usize {
        self.teams.values().map(Vec::len).sum()
    }

    pub fn members(&self, team: TeamId) -> &[ConnectionId] {
        self.teams.get(&team).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Hub {
    /// Spawn the control loop on the current tokio runtime.
    pub fn start(config: HubConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(rx));
        info!(outbound_capacity = config.outbound_capacity, "Hub started");
        Self {
            handle: HubHandle {
                tx,
                outbound_capacity: config.outbound_capacity,
            },
            task,
        }
    }

    pub fn handle(&self) -> HubHandle {
        self.handle.clone()
    }

    /// Stop the loop and close every remaining connection's queue.
    pub async fn shutdown(self) {
        let _ = self.handle.tx.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Hub control loop ended abnormally");
        }
    }
}

impl HubHandle {
    /// Add a connection to its team's group.
    pub fn register(&self, conn: Connection) -> ConnectionHandle {
        let handle = conn.handle();
        // A stopped hub drops the connection, which closes its queue.
        self.send(Command::Register(conn));
        handle
    }

    /// Open a connection for `team` with the configured queue size and register it.
    pub fn open(&self, team: TeamId) -> (ConnectionHandle, OutboundQueue) {
        let (conn, queue) = Connection::open(team, self.outbound_capacity);
        (self.register(conn), queue)
    }

    /// Remove a connection and close its queue. No-op if it is not registered.
    pub fn unregister(&self, handle: ConnectionHandle) {
        self.send(Command::Unregister(handle));
    }

    /// Fan an event out to its team without waiting for delivery.
    pub fn publish(&self, event: Event) {
        self.send(Command::Publish(event));
    }

    /// Membership as of every command sent before this call.
    pub async fn snapshot(&self) -> HubSnapshot {
        let (reply, rx) = oneshot::channel();
        if !self.send(Command::Snapshot(reply)) {
            return HubSnapshot::default();
        }
        rx.await.unwrap_or_default()
    }

    fn send(&self, cmd: Command) -> bool {
        if self.tx.send(cmd).is_err() {
            debug!("Hub is stopped, command dropped");
            return false;
        }
        true
    }
}

async fn run(mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut state = HubState::default();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Register(conn) => state.register(conn),
            Command::Unregister(handle) => state.unregister(handle),
            Command::Publish(event) => state.publish(event),
            Command::Snapshot(reply) => {
                let _ = reply.send(state.snapshot());
            }
            Command::Shutdown => break,
        }
    }

    let remaining = state.len();
    state.teams.clear();
    info!(remaining, "Hub stopped");
}

#[derive(Default)]
struct HubState {
    teams: HashMap<TeamId, HashMap<ConnectionId, Connection>>,
}

impl HubState {
    fn register(&mut self, conn: Connection) {
        let team = conn.team();
        let group = self.teams.entry(team).or_default();
        group.insert(conn.id(), conn);
        info!(team = %team, members = group.len(), "Connection registered");
    }

    fn unregister(&mut self, handle: ConnectionHandle) {
        let Some(group) = self.teams.get_mut(&handle.team) else {
            return;
        };
        // Dropping the connection closes its queue.
        if group.remove(&handle.id).is_none() {
            return;
        }
        let members = group.len();
        if members == 0 {
            self.teams.remove(&handle.team);
        }
        info!(team = %handle.team, connection = %handle.id, members, "Connection unregistered");
    }

    fn publish(&mut self, event: Event) {
        let team = event.team();
        let Some(group) = self.teams.get_mut(&team) else {
            debug!(team = %team, event = %event.kind(), "No subscribers for team");
            return;
        };

        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(team = %team, event = %event.kind(), error = %e, "Failed to serialize event");
                return;
            }
        };

        group.retain(|id, conn| match conn.try_deliver(&frame) {
            Delivery::Queued => true,
            Delivery::Full => {
                warn!(team = %team, connection = %id, "Outbound queue full, dropping slow connection");
                false
            }
            Delivery::Closed => {
                debug!(team = %team, connection = %id, "Outbound queue closed, dropping connection");
                false
            }
        });

        let delivered = group.len();
        if delivered == 0 {
            self.teams.remove(&team);
        }
        debug!(team = %team, event = %event.kind(), delivered, "Event published");
    }

    fn snapshot(&self) -> HubSnapshot {
        let teams = self
            .teams
            .iter()
            .map(|(team, group)| {
                let mut ids: Vec<ConnectionId> = group.keys().copied().collect();
                ids.sort();
                (*team, ids)
            })
            .collect();
        HubSnapshot { teams }
    }

    fn len(&self) -> usize {
        self.teams.values().map(HashMap::len).sum()
    }
}
