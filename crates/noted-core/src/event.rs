//! Events pushed to connected team members.
//!
//! An [`Event`] is what a mutation handler hands to the hub. On the wire it
//! becomes a single text frame shaped `{"event": <kind>, "data": <value>}`,
//! serialized once per publish and shared verbatim by every subscriber.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::NotedResult;
use crate::model::{TeamId, Todo};

/// An immutable, team-scoped named payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: String,
    data: Value,
    team: TeamId,
}

impl Event {
    /// Build an event from any serializable payload.
    pub fn new(team: TeamId, kind: impl Into<String>, data: impl Serialize) -> NotedResult<Self> {
        Ok(Self::from_value(team, kind, serde_json::to_value(data)?))
    }

    /// Build an event from an already structured JSON value.
    pub fn from_value(team: TeamId, kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            team,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn team(&self) -> TeamId {
        self.team
    }

    /// Serialize into the wire frame shared by all subscribers.
    pub fn to_frame(&self) -> NotedResult<Arc<str>> {
        let wire = WireEvent {
            event: &self.kind,
            data: &self.data,
        };
        Ok(Arc::from(serde_json::to_string(&wire)?))
    }
}

/// Borrowed wire shape of an event. The team is routing metadata and is not sent.
#[derive(Serialize)]
struct WireEvent<'a> {
    event: &'a str,
    data: &'a Value,
}

/// Body accepted by the internal publish endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishRequest {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl PublishRequest {
    pub fn into_event(self, team: TeamId) -> Event {
        Event::from_value(team, self.event, self.data)
    }
}

/// Todo mutations broadcast to the owning team.
#[derive(Debug, Clone, PartialEq)]
pub enum TodoEvent {
    Created(Todo),
    Updated(Todo),
    Deleted { id: u32 },
}

impl TodoEvent {
    pub const CREATED: &'static str = "todo_created";
    pub const UPDATED: &'static str = "todo_updated";
    pub const DELETED: &'static str = "todo_deleted";

    pub fn kind(&self) -> &'static str {
        match self {
            TodoEvent::Created(_) => Self::CREATED,
            TodoEvent::Updated(_) => Self::UPDATED,
            TodoEvent::Deleted { .. } => Self::DELETED,
        }
    }

    /// Convert into a hub event. Deletions only carry the record id.
    pub fn into_event(self, team: TeamId) -> NotedResult<Event> {
        let kind = self.kind();
        match self {
            TodoEvent::Created(todo) | TodoEvent::Updated(todo) => Event::new(team, kind, todo),
            TodoEvent::Deleted { id } => {
                Ok(Event::from_value(team, kind, serde_json::json!({ "id": id })))
            }
        }
    }
}
