use async_trait::async_trait;
use eventable_core::AppResult;
use eventable_domain::{AttributeSnapshot, EventableId, EventableRecord, EventableType};

/// Port for loading the subjects of one eventable type.
#[async_trait]
pub trait EventableStore: Send + Sync {
    /// Finds one subject by identifier.
    async fn find(&self, id: &EventableId) -> AppResult<Option<EventableRecord>>;

    /// Finds every subject among `ids` that still exists.
    async fn find_many(&self, ids: &[EventableId]) -> AppResult<Vec<EventableRecord>>;

    /// Point lookup used when resolving one event.
    ///
    /// Must see the same rows as [`EventableStore::find_many_for_events`].
    async fn find_for_events(&self, id: &EventableId) -> AppResult<Option<EventableRecord>> {
        self.find(id).await
    }

    /// Bulk lookup used when resolving events.
    ///
    /// Stores override this when event history should see rows the default
    /// lookup hides, such as soft-deleted ones.
    async fn find_many_for_events(&self, ids: &[EventableId]) -> AppResult<Vec<EventableRecord>> {
        self.find_many(ids).await
    }

    /// Rebuilds a transient subject from a destroy snapshot.
    ///
    /// Must tolerate attributes the current schema no longer has, and
    /// attributes the snapshot predates.
    fn reconstruct(
        &self,
        eventable_type: &EventableType,
        snapshot: &AttributeSnapshot,
    ) -> AppResult<EventableRecord> {
        Ok(EventableRecord::transient(eventable_type.clone(), snapshot))
    }
}
