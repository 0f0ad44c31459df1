//! Application state.

use noted_core::Event;
use noted_hub::HubHandle;
use std::sync::Arc;

use crate::auth::MembershipAuthorizer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub authorizer: Arc<dyn MembershipAuthorizer>,
}

impl AppState {
    pub fn new(hub: HubHandle, authorizer: Arc<dyn MembershipAuthorizer>) -> Self {
        Self { hub, authorizer }
    }

    /// Push an event to every connected member of its team.
    pub fn publish(&self, event: Event) {
        self.hub.publish(event);
    }
}
