use std::sync::Arc;

use eventable_core::{AppError, AppResult};
use eventable_domain::{Event, EventAction, EventId, EventInput, EventableRecord};
use tracing::info;

use crate::{ActorContext, EventQuery, EventRepository, EventableResolver, ResolvedEvent};

/// A batch root together with its child events.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch {
    /// Root event; children point at it through `batch_parent_id`.
    pub root: Event,
    /// Child events in recording order.
    pub children: Vec<Event>,
}

/// Application service for recording, reading and deleting events.
#[derive(Clone)]
pub struct EventService {
    repository: Arc<dyn EventRepository>,
    resolver: EventableResolver,
}

impl EventService {
    /// Creates a service from a repository and a resolver.
    #[must_use]
    pub fn new(repository: Arc<dyn EventRepository>, resolver: EventableResolver) -> Self {
        Self {
            repository,
            resolver,
        }
    }

    /// Returns the resolver used for eventable lookups.
    #[must_use]
    pub fn resolver(&self) -> &EventableResolver {
        &self.resolver
    }

    /// Validates and persists one event.
    ///
    /// A missing `user_id` is taken from the [`ActorContext`].
    pub async fn record_event(&self, input: EventInput) -> AppResult<Event> {
        let event = Event::new(with_current_actor(input))?;
        self.repository.append_event(event.clone()).await?;

        info!(
            event_id = %event.id(),
            action = %event.action(),
            eventable_type = %event.eventable_type(),
            user_id = %event.user_id(),
            "event recorded"
        );

        Ok(event)
    }

    /// Records an action against a subject on behalf of the current actor.
    ///
    /// The subject's attributes are captured as the event snapshot.
    pub async fn record_for_current_actor(
        &self,
        action: EventAction,
        eventable: &EventableRecord,
        batch_parent_id: Option<EventId>,
    ) -> AppResult<Event> {
        let user_id = ActorContext::current().ok_or_else(|| {
            AppError::Validation(format!(
                "cannot record '{action}' event for {} without a current actor",
                eventable.eventable_type()
            ))
        })?;

        self.record_event(EventInput {
            action: action.as_str().to_owned(),
            eventable_type: eventable.eventable_type().as_str().to_owned(),
            eventable_id: eventable.id().map(|id| id.as_str().to_owned()),
            eventable_attributes: Some(eventable.snapshot()),
            user_id: Some(user_id),
            batch_parent_id,
        })
        .await
    }

    /// Records a batch root and its children as one unit.
    ///
    /// Children are attached to the root regardless of their own
    /// `batch_parent_id`. Nothing is stored if any event is invalid.
    pub async fn record_batch(
        &self,
        root: EventInput,
        children: Vec<EventInput>,
    ) -> AppResult<EventBatch> {
        let root = Event::new(with_current_actor(root))?;
        let children = children
            .into_iter()
            .map(|child| {
                Event::new(with_current_actor(EventInput {
                    batch_parent_id: Some(root.id()),
                    ..child
                }))
            })
            .collect::<AppResult<Vec<_>>>()?;

        let mut events = Vec::with_capacity(children.len() + 1);
        events.push(root.clone());
        events.extend(children.iter().cloned());
        self.repository.append_events(events).await?;

        info!(
            event_id = %root.id(),
            action = %root.action(),
            eventable_type = %root.eventable_type(),
            children = children.len(),
            "event batch recorded"
        );

        Ok(EventBatch { root, children })
    }

    /// Finds one event.
    pub async fn find_event(&self, event_id: EventId) -> AppResult<Option<Event>> {
        self.repository.find_event(event_id).await
    }

    /// Finds one event together with its eventable.
    pub async fn find_event_with_eventable(
        &self,
        event_id: EventId,
    ) -> AppResult<Option<ResolvedEvent>> {
        match self.repository.find_event(event_id).await? {
            Some(event) => self.resolver.resolve_event(event).await.map(Some),
            None => Ok(None),
        }
    }

    /// Lists events for a query.
    pub async fn list_events(&self, query: EventQuery) -> AppResult<Vec<Event>> {
        self.repository.list_events(query).await
    }

    /// Lists events for a query with their eventables resolved in bulk.
    pub async fn list_events_with_eventables(
        &self,
        query: EventQuery,
    ) -> AppResult<Vec<ResolvedEvent>> {
        let events = self.repository.list_events(query).await?;
        self.resolver.resolve_events(events).await
    }

    /// Deletes an event and every event in the batch below it.
    pub async fn delete_event(&self, event_id: EventId) -> AppResult<u64> {
        let deleted = self.repository.delete_event(event_id).await?;
        info!(event_id = %event_id, deleted, "event deleted");
        Ok(deleted)
    }
}

fn with_current_actor(input: EventInput) -> EventInput {
    EventInput {
        user_id: input.user_id.or_else(ActorContext::current),
        ..input
    }
}

#[cfg(test)]
mod tests;
