//! Application services and ports.

#![forbid(unsafe_code)]

mod actor_context;
mod event_ports;
mod event_service;
mod eventable_ports;
mod eventable_registry;
mod eventable_resolver;

pub use actor_context::ActorContext;
pub use event_ports::{EVENT_QUERY_MAX_LIMIT, EventQuery, EventRepository, EventScope};
pub use event_service::{EventBatch, EventService};
pub use eventable_ports::EventableStore;
pub use eventable_registry::EventableRegistry;
pub use eventable_resolver::{EventableResolver, Resolution, ResolvedEvent};
