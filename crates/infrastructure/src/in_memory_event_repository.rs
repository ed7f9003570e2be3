use async_trait::async_trait;
use eventable_application::{EventQuery, EventRepository};
use eventable_core::{AppError, AppResult};
use eventable_domain::{Event, EventId};
use tokio::sync::RwLock;

/// In-memory event log implementation.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    events: RwLock<Vec<Event>>,
}

impl InMemoryEventRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn append_event(&self, event: Event) -> AppResult<()> {
        self.append_events(vec![event]).await
    }

    async fn append_events(&self, events: Vec<Event>) -> AppResult<()> {
        let mut stored = self.events.write().await;

        for (index, event) in events.iter().enumerate() {
            let duplicate = stored.iter().any(|existing| existing.id() == event.id())
                || events[..index]
                    .iter()
                    .any(|earlier| earlier.id() == event.id());
            if duplicate {
                return Err(AppError::Conflict(format!(
                    "event '{}' already exists",
                    event.id()
                )));
            }

            if let Some(parent_id) = event.batch_parent_id() {
                let parent_known = stored.iter().any(|existing| existing.id() == parent_id)
                    || events[..index]
                        .iter()
                        .any(|earlier| earlier.id() == parent_id);
                if !parent_known {
                    return Err(AppError::Validation(format!(
                        "batch parent event '{parent_id}' does not exist"
                    )));
                }
            }
        }

        stored.extend(events);
        Ok(())
    }

    async fn find_event(&self, event_id: EventId) -> AppResult<Option<Event>> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .find(|event| event.id() == event_id)
            .cloned())
    }

    async fn list_events(&self, query: EventQuery) -> AppResult<Vec<Event>> {
        let events = self.events.read().await;

        Ok(events
            .iter()
            .filter(|event| query.matches(event))
            .skip(query.offset)
            .take(query.capped_limit())
            .cloned()
            .collect())
    }

    async fn delete_event(&self, event_id: EventId) -> AppResult<u64> {
        let mut events = self.events.write().await;

        if !events.iter().any(|event| event.id() == event_id) {
            return Err(AppError::NotFound(format!("event '{event_id}' does not exist")));
        }

        let doomed = batch_tree(&events, event_id);
        let before = events.len();
        events.retain(|event| !doomed.contains(&event.id()));

        Ok(u64::try_from(before - events.len()).unwrap_or(u64::MAX))
    }
}

/// Returns `root_id` and every event reachable from it through `batch_parent_id`.
fn batch_tree(events: &[Event], root_id: EventId) -> Vec<EventId> {
    let mut tree = vec![root_id];
    let mut cursor = 0;

    while let Some(&parent_id) = tree.get(cursor) {
        tree.extend(
            events
                .iter()
                .filter(|event| event.batch_parent_id() == Some(parent_id))
                .map(Event::id),
        );
        cursor += 1;
    }

    tree
}
