use std::sync::Arc;

use async_trait::async_trait;
use eventable_core::{AppError, AppResult};
use eventable_domain::{
    AttributeSnapshot, Event, EventAction, EventId, EventInput, EventableId, EventableRecord,
    EventableType, UserId,
};
use serde_json::json;
use tokio::sync::Mutex;

use crate::{
    ActorContext, EventQuery, EventRepository, EventScope, EventableRegistry, EventableResolver,
    EventableStore, Resolution,
};

use super::EventService;

#[derive(Default)]
struct FakeEventRepository {
    events: Mutex<Vec<Event>>,
}

#[async_trait]
impl EventRepository for FakeEventRepository {
    async fn append_event(&self, event: Event) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }

    async fn append_events(&self, events: Vec<Event>) -> AppResult<()> {
        self.events.lock().await.extend(events);
        Ok(())
    }

    async fn find_event(&self, event_id: EventId) -> AppResult<Option<Event>> {
        Ok(self
            .events
            .lock()
            .await
            .iter()
            .find(|event| event.id() == event_id)
            .cloned())
    }

    async fn list_events(&self, query: EventQuery) -> AppResult<Vec<Event>> {
        Ok(self
            .events
            .lock()
            .await
            .iter()
            .filter(|event| query.matches(event))
            .skip(query.offset)
            .take(query.capped_limit())
            .cloned()
            .collect())
    }

    async fn delete_event(&self, event_id: EventId) -> AppResult<u64> {
        let mut events = self.events.lock().await;
        if !events.iter().any(|event| event.id() == event_id) {
            return Err(AppError::NotFound(format!("event '{event_id}' does not exist")));
        }

        let mut doomed = vec![event_id];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let parent_id = doomed[cursor];
            doomed.extend(
                events
                    .iter()
                    .filter(|event| event.batch_parent_id() == Some(parent_id))
                    .map(Event::id),
            );
            cursor += 1;
        }

        let before = events.len();
        events.retain(|event| !doomed.contains(&event.id()));
        Ok((before - events.len()) as u64)
    }
}

struct PostStore;

#[async_trait]
impl EventableStore for PostStore {
    async fn find(&self, id: &EventableId) -> AppResult<Option<EventableRecord>> {
        Ok(self.find_many(std::slice::from_ref(id)).await?.pop())
    }

    async fn find_many(&self, ids: &[EventableId]) -> AppResult<Vec<EventableRecord>> {
        ids.iter()
            .filter(|id| id.as_str() == "1")
            .map(|id| EventableRecord::new(post_type(), id.clone(), json!({"title": "Live"})))
            .collect()
    }
}

fn post_type() -> EventableType {
    EventableType::new("Post").unwrap_or_else(|_| unreachable!())
}

fn service() -> (EventService, Arc<FakeEventRepository>) {
    let repository = Arc::new(FakeEventRepository::default());
    let registry = EventableRegistry::new()
        .with_store(post_type(), Arc::new(PostStore))
        .unwrap_or_default();
    let resolver = EventableResolver::new(Arc::new(registry));
    (
        EventService::new(repository.clone(), resolver),
        repository,
    )
}

fn input(action: &str, eventable_id: Option<&str>) -> EventInput {
    EventInput {
        action: action.to_owned(),
        eventable_type: "Post".to_owned(),
        eventable_id: eventable_id.map(str::to_owned),
        eventable_attributes: None,
        user_id: None,
        batch_parent_id: None,
    }
}

fn live_post() -> EventableRecord {
    EventableRecord::new(
        post_type(),
        EventableId::new("1").unwrap_or_else(|_| unreachable!()),
        json!({"id": 1, "title": "Live"}),
    )
    .unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn record_event_takes_user_from_actor_context() {
    let (service, repository) = service();
    let actor = UserId::new();

    let recorded =
        ActorContext::scope(actor, service.record_event(input(EventAction::CREATED, Some("1"))))
            .await;
    assert!(recorded.is_ok());
    assert_eq!(recorded.map(|event| event.user_id()).ok(), Some(actor));
    assert_eq!(repository.events.lock().await.len(), 1);
}

#[tokio::test]
async fn explicit_user_wins_over_actor_context() {
    let (service, _) = service();
    let explicit = UserId::new();
    let mut with_user = input(EventAction::UPDATED, Some("1"));
    with_user.user_id = Some(explicit);

    let recorded = ActorContext::scope(UserId::new(), service.record_event(with_user)).await;
    assert_eq!(recorded.map(|event| event.user_id()).ok(), Some(explicit));
}

#[tokio::test]
async fn invalid_events_are_not_persisted() {
    let (service, repository) = service();

    let without_actor = service.record_event(input(EventAction::CREATED, Some("1"))).await;
    assert!(matches!(without_actor, Err(AppError::Validation(_))));

    let without_id = ActorContext::scope(
        UserId::new(),
        service.record_event(input(EventAction::UPDATED, None)),
    )
    .await;
    assert!(matches!(without_id, Err(AppError::Validation(_))));

    assert!(repository.events.lock().await.is_empty());
}

#[tokio::test]
async fn destroyed_subject_is_snapshotted_and_unlinked() {
    let (service, _) = service();
    let post = live_post();

    let recorded = ActorContext::scope(
        UserId::new(),
        service.record_for_current_actor(EventAction::destroyed(), &post, None),
    )
    .await;
    assert!(recorded.is_ok());

    let event = recorded.unwrap_or_else(|_| unreachable!());
    assert!(event.eventable_id().is_none());
    assert_eq!(event.eventable_attributes(), Some(&post.snapshot()));

    let resolved = service.find_event_with_eventable(event.id()).await;
    match resolved {
        Ok(Some(resolved)) => match resolved.eventable {
            Resolution::Reconstructed(record) => {
                assert_eq!(record.attributes(), post.attributes());
            }
            other => panic!("expected reconstructed post, got {other:?}"),
        },
        other => panic!("expected resolved event, got {other:?}"),
    }
}

#[tokio::test]
async fn record_for_current_actor_requires_an_actor() {
    let (service, _) = service();
    let recorded = service
        .record_for_current_actor(EventAction::updated(), &live_post(), None)
        .await;
    assert!(matches!(recorded, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn record_batch_links_children_to_root() {
    let (service, repository) = service();

    let batch = ActorContext::scope(
        UserId::new(),
        service.record_batch(
            input("imported", Some("1")),
            vec![
                input(EventAction::CREATED, Some("2")),
                EventInput {
                    batch_parent_id: Some(EventId::new()),
                    ..input(EventAction::CREATED, Some("3"))
                },
            ],
        ),
    )
    .await;
    assert!(batch.is_ok());

    let batch = batch.unwrap_or_else(|_| unreachable!());
    assert!(batch.root.is_batched());
    assert!(
        batch
            .children
            .iter()
            .all(|child| child.batch_parent_id() == Some(batch.root.id()))
    );

    let children = service
        .list_events(EventQuery {
            scope: EventScope::ByBatch(batch.root.id()),
            ..EventQuery::default()
        })
        .await
        .unwrap_or_default();
    assert_eq!(children.len(), 2);

    let batched = service
        .list_events(EventQuery {
            scope: EventScope::Batched,
            ..EventQuery::default()
        })
        .await
        .unwrap_or_default();
    assert_eq!(batched.len(), 1);
    assert_eq!(repository.events.lock().await.len(), 3);
}

#[tokio::test]
async fn invalid_child_rejects_whole_batch() {
    let (service, repository) = service();

    let batch = ActorContext::scope(
        UserId::new(),
        service.record_batch(
            input("imported", Some("1")),
            vec![
                input(EventAction::CREATED, Some("2")),
                input(EventAction::DESTROYED, None),
            ],
        ),
    )
    .await;
    assert!(matches!(batch, Err(AppError::Validation(_))));
    assert!(repository.events.lock().await.is_empty());
}

#[tokio::test]
async fn deleting_root_removes_batch_but_not_other_events() {
    let (service, repository) = service();
    let actor = UserId::new();

    let (batch, standalone) = ActorContext::scope(actor, async {
        let batch = service
            .record_batch(
                input("imported", Some("1")),
                vec![
                    input(EventAction::CREATED, Some("2")),
                    input(EventAction::CREATED, Some("3")),
                ],
            )
            .await;
        let standalone = service
            .record_event(input(EventAction::UPDATED, Some("1")))
            .await;
        (batch, standalone)
    })
    .await;
    let batch = batch.unwrap_or_else(|_| unreachable!());
    let standalone = standalone.unwrap_or_else(|_| unreachable!());

    let deleted_child = service.delete_event(batch.children[0].id()).await;
    assert_eq!(deleted_child.ok(), Some(1));
    assert!(
        service
            .find_event(batch.root.id())
            .await
            .unwrap_or_default()
            .is_some()
    );
    assert!(
        service
            .find_event(batch.children[1].id())
            .await
            .unwrap_or_default()
            .is_some()
    );

    let deleted_root = service.delete_event(batch.root.id()).await;
    assert_eq!(deleted_root.ok(), Some(2));

    let remaining = repository.events.lock().await.clone();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id(), standalone.id());

    let missing = service.delete_event(batch.root.id()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn listing_with_eventables_resolves_in_bulk() {
    let (service, _) = service();
    let actor = UserId::new();
    let snapshot = AttributeSnapshot::from_object(json!({"title": "Gone"})).unwrap_or_default();

    ActorContext::scope(actor, async {
        assert!(
            service
                .record_event(input(EventAction::CREATED, Some("1")))
                .await
                .is_ok()
        );
        assert!(
            service
                .record_event(EventInput {
                    eventable_attributes: Some(snapshot.clone()),
                    ..input(EventAction::DESTROYED, None)
                })
                .await
                .is_ok()
        );
        assert!(
            service
                .record_event(input(EventAction::UPDATED, Some("404")))
                .await
                .is_ok()
        );
    })
    .await;

    let resolved = service
        .list_events_with_eventables(EventQuery {
            scope: EventScope::ByUser(actor),
            ..EventQuery::default()
        })
        .await
        .unwrap_or_default();

    assert_eq!(resolved.len(), 3);
    assert!(matches!(resolved[0].eventable, Resolution::Live(_)));
    assert!(matches!(resolved[1].eventable, Resolution::Reconstructed(_)));
    assert!(resolved[2].eventable.is_unresolved());
}
