//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod event;
mod eventable;
mod snapshot;
mod user;

pub use event::{ACTION_MAX_CHARS, Event, EventAction, EventId, EventInput};
pub use eventable::{EventableId, EventableRecord, EventableType};
pub use snapshot::{AttributeSnapshot, SNAPSHOT_VERSION, SNAPSHOT_VERSION_KEY};
pub use user::UserId;
