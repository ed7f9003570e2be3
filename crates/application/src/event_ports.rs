use async_trait::async_trait;
use eventable_core::AppResult;
use eventable_domain::{Event, EventId, UserId};

/// Largest page size served by [`EventRepository::list_events`].
pub const EVENT_QUERY_MAX_LIMIT: usize = 500;

/// Event subsets addressable by listing queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    /// Every event.
    All,
    /// Standalone events and batch roots.
    Batched,
    /// Children of one batch root.
    ByBatch(EventId),
    /// Events recorded by one user.
    ByUser(UserId),
}

/// Query inputs for event listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventQuery {
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
    /// Subset to list.
    pub scope: EventScope,
}

impl EventQuery {
    /// Returns the limit clamped to the served range.
    #[must_use]
    pub fn capped_limit(&self) -> usize {
        self.limit.clamp(1, EVENT_QUERY_MAX_LIMIT)
    }

    /// Returns whether an event belongs to the query scope.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        match self.scope {
            EventScope::All => true,
            EventScope::Batched => event.batch_parent_id().is_none(),
            EventScope::ByBatch(parent_id) => event.batch_parent_id() == Some(parent_id),
            EventScope::ByUser(user_id) => event.user_id() == user_id,
        }
    }
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            scope: EventScope::All,
        }
    }
}

/// Port for persisting the append-only event log.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Persists one validated event.
    async fn append_event(&self, event: Event) -> AppResult<()>;

    /// Persists several validated events as one unit, in order.
    async fn append_events(&self, events: Vec<Event>) -> AppResult<()>;

    /// Finds one event by identifier.
    async fn find_event(&self, event_id: EventId) -> AppResult<Option<Event>>;

    /// Lists events oldest first.
    async fn list_events(&self, query: EventQuery) -> AppResult<Vec<Event>>;

    /// Deletes an event and, transitively, its child batch events as one unit.
    ///
    /// Returns the number of deleted events. Missing events are `NotFound`.
    async fn delete_event(&self, event_id: EventId) -> AppResult<u64>;
}
