use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use eventable_application::EventableStore;
use eventable_core::{AppError, AppResult};
use eventable_domain::{EventableId, EventableRecord, EventableType};
use serde_json::Value;
use tokio::sync::RwLock;

/// In-memory subject store for one eventable type.
///
/// Soft-deleted subjects are hidden from `find` and `find_many` but still
/// resolve for event history.
#[derive(Debug)]
pub struct InMemoryEventableStore {
    eventable_type: EventableType,
    records: RwLock<BTreeMap<EventableId, Value>>,
    soft_deleted: RwLock<BTreeSet<EventableId>>,
}

impl InMemoryEventableStore {
    /// Creates an empty store for `eventable_type`.
    #[must_use]
    pub fn new(eventable_type: EventableType) -> Self {
        Self {
            eventable_type,
            records: RwLock::new(BTreeMap::new()),
            soft_deleted: RwLock::new(BTreeSet::new()),
        }
    }

    /// Inserts or replaces a subject.
    pub async fn upsert(&self, id: EventableId, attributes: Value) -> AppResult<EventableRecord> {
        let record = EventableRecord::new(self.eventable_type.clone(), id.clone(), attributes)?;
        self.records
            .write()
            .await
            .insert(id.clone(), Value::Object(record.attributes().clone()));
        self.soft_deleted.write().await.remove(&id);
        Ok(record)
    }

    /// Removes a subject for good and returns its last state.
    pub async fn remove(&self, id: &EventableId) -> AppResult<EventableRecord> {
        let removed = self.records.write().await.remove(id).ok_or_else(|| {
            AppError::NotFound(format!("{} '{}' does not exist", self.eventable_type, id))
        })?;
        self.soft_deleted.write().await.remove(id);

        EventableRecord::new(self.eventable_type.clone(), id.clone(), removed)
    }

    /// Hides a subject from default lookups.
    pub async fn soft_delete(&self, id: &EventableId) -> AppResult<()> {
        if !self.records.read().await.contains_key(id) {
            return Err(AppError::NotFound(format!(
                "{} '{}' does not exist",
                self.eventable_type, id
            )));
        }

        self.soft_deleted.write().await.insert(id.clone());
        Ok(())
    }

    async fn lookup(
        &self,
        ids: &[EventableId],
        include_soft_deleted: bool,
    ) -> AppResult<Vec<EventableRecord>> {
        let records = self.records.read().await;
        let soft_deleted = self.soft_deleted.read().await;

        ids.iter()
            .filter(|id| include_soft_deleted || !soft_deleted.contains(*id))
            .filter_map(|id| records.get(id).map(|attributes| (id, attributes)))
            .map(|(id, attributes)| {
                EventableRecord::new(self.eventable_type.clone(), id.clone(), attributes.clone())
            })
            .collect()
    }
}

#[async_trait]
impl EventableStore for InMemoryEventableStore {
    async fn find(&self, id: &EventableId) -> AppResult<Option<EventableRecord>> {
        Ok(self.lookup(std::slice::from_ref(id), false).await?.pop())
    }

    async fn find_many(&self, ids: &[EventableId]) -> AppResult<Vec<EventableRecord>> {
        self.lookup(ids, false).await
    }

    async fn find_for_events(&self, id: &EventableId) -> AppResult<Option<EventableRecord>> {
        Ok(self.lookup(std::slice::from_ref(id), true).await?.pop())
    }

    async fn find_many_for_events(&self, ids: &[EventableId]) -> AppResult<Vec<EventableRecord>> {
        self.lookup(ids, true).await
    }
}
