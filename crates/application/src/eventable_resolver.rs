use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use eventable_core::{AppError, AppResult};
use eventable_domain::{Event, EventableId, EventableRecord, EventableType};
use tracing::{debug, warn};

use crate::EventableRegistry;

/// Outcome of resolving the subject of one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Current state of a subject that still exists. Events pointing at the
    /// same subject share one allocation.
    Live(Arc<EventableRecord>),
    /// Unsaved subject rebuilt from a destroy snapshot.
    Reconstructed(EventableRecord),
    /// The subject vanished without a destroy event.
    Unresolved,
}

impl Resolution {
    /// Returns the resolved subject, if any.
    #[must_use]
    pub fn record(&self) -> Option<&EventableRecord> {
        match self {
            Self::Live(record) => Some(record.as_ref()),
            Self::Reconstructed(record) => Some(record),
            Self::Unresolved => None,
        }
    }

    /// Returns whether no subject could be found.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }
}

/// Event paired with its resolved subject.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEvent {
    /// Source event.
    pub event: Event,
    /// Subject the event refers to.
    pub eventable: Resolution,
}

/// Resolves event subjects through the registered eventable stores.
#[derive(Clone)]
pub struct EventableResolver {
    registry: Arc<EventableRegistry>,
}

impl EventableResolver {
    /// Creates a resolver over a store registry.
    #[must_use]
    pub fn new(registry: Arc<EventableRegistry>) -> Self {
        Self { registry }
    }

    /// Resolves the subject of one event with a point lookup.
    pub async fn resolve_eventable(&self, event: &Event) -> AppResult<Resolution> {
        let eventable_type = event.eventable_type();
        let store = self.registry.store_for(eventable_type)?;

        match (event.eventable_id(), event.eventable_attributes()) {
            (None, Some(snapshot)) => Ok(Resolution::Reconstructed(
                store.reconstruct(eventable_type, snapshot)?,
            )),
            (Some(eventable_id), _) => Ok(store
                .find_for_events(eventable_id)
                .await?
                .map_or(Resolution::Unresolved, |record| {
                    Resolution::Live(Arc::new(record))
                })),
            (None, None) => Ok(Resolution::Unresolved),
        }
    }

    /// Resolves one event through the bulk path.
    pub async fn resolve_event(&self, event: Event) -> AppResult<ResolvedEvent> {
        let event_id = event.id();
        self.resolve_events(vec![event])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal(format!("event '{event_id}' was not resolved")))
    }

    /// Resolves many events with one bulk fetch per eventable type.
    ///
    /// Output order matches input order. Events referring to the same subject
    /// share the same [`Resolution::Live`] allocation. Destroy events are
    /// rebuilt from their snapshot and never fetched. A type with no
    /// registered store fails the whole call.
    pub async fn resolve_events(&self, events: Vec<Event>) -> AppResult<Vec<ResolvedEvent>> {
        let mut resolutions: Vec<Resolution> =
            events.iter().map(|_| Resolution::Unresolved).collect();

        let mut positions_by_type: BTreeMap<&EventableType, Vec<usize>> = BTreeMap::new();
        for (position, event) in events.iter().enumerate() {
            positions_by_type
                .entry(event.eventable_type())
                .or_default()
                .push(position);
        }

        for (eventable_type, positions) in positions_by_type {
            let store = self.registry.store_for(eventable_type)?;

            let mut positions_by_id: HashMap<&EventableId, Vec<usize>> = HashMap::new();
            for position in positions {
                let event = &events[position];
                match (event.eventable_id(), event.eventable_attributes()) {
                    (Some(eventable_id), _) => {
                        positions_by_id.entry(eventable_id).or_default().push(position);
                    }
                    (None, Some(snapshot)) => {
                        resolutions[position] = Resolution::Reconstructed(
                            store.reconstruct(eventable_type, snapshot)?,
                        );
                    }
                    (None, None) => {}
                }
            }

            if positions_by_id.is_empty() {
                continue;
            }

            let mut ids: Vec<EventableId> = positions_by_id.keys().map(|id| (*id).clone()).collect();
            ids.sort();

            let fetched = store.find_many_for_events(&ids).await?;
            let fetched_count = fetched.len();
            let mut attached = 0_usize;

            for record in fetched {
                let Some(positions) = record.id().and_then(|id| positions_by_id.remove(id)) else {
                    continue;
                };

                let shared = Arc::new(record);
                for position in positions {
                    resolutions[position] = Resolution::Live(Arc::clone(&shared));
                    attached += 1;
                }
            }

            debug!(
                eventable_type = %eventable_type,
                requested_ids = ids.len(),
                fetched = fetched_count,
                attached,
                "resolved eventables"
            );

            if !positions_by_id.is_empty() {
                warn!(
                    eventable_type = %eventable_type,
                    missing_ids = positions_by_id.len(),
                    "eventables referenced by events no longer exist"
                );
            }
        }

        Ok(events
            .into_iter()
            .zip(resolutions)
            .map(|(event, eventable)| ResolvedEvent { event, eventable })
            .collect())
    }
}
