//! Noted real-time notification hub.
//!
//! Multiplexes live connections into team-scoped groups and pushes every
//! published event to the members of its team. All membership changes and
//! fan-out decisions run on a single control loop; each connection is served
//! by an inbound and an outbound pump.

pub mod connection;
pub mod hub;
pub mod pump;

pub use connection::{Connection, ConnectionHandle, ConnectionId, OutboundQueue};
pub use hub::{Hub, HubHandle, HubSnapshot};
pub use pump::{
    drive_connection, inbound_pump, outbound_pump, Frame, Inbound, InboundExit, OutboundExit,
};
