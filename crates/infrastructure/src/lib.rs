//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_event_repository;
mod in_memory_eventable_store;
mod postgres_event_repository;
mod postgres_eventable_store;

pub use in_memory_event_repository::InMemoryEventRepository;
pub use in_memory_eventable_store::InMemoryEventableStore;
pub use postgres_event_repository::PostgresEventRepository;
pub use postgres_eventable_store::PostgresEventableStore;
