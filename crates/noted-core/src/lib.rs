//! Noted Core Library
//!
//! Domain models, configuration and the event vocabulary shared by the
//! notification hub, the web server and the CLI.

pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod notifier;

pub use error::{NotedError, NotedResult};
pub use event::{Event, PublishRequest, TodoEvent};
pub use model::{TeamId, UserId};
