//! Polymorphic subject references and subject records.

use std::fmt::{Display, Formatter};

use eventable_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::AttributeSnapshot;

/// Type tag of an eventable, used as the key into the store registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventableType(NonEmptyString);

impl EventableType {
    /// Creates a validated eventable type tag.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        NonEmptyString::new(value)
            .map(Self)
            .map_err(|_| AppError::Validation("eventable_type is required".to_owned()))
    }

    /// Returns the type tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for EventableType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Identifier of an eventable inside the store of its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventableId(NonEmptyString);

impl EventableId {
    /// Creates a validated eventable identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        NonEmptyString::new(value)
            .map(Self)
            .map_err(|_| AppError::Validation("eventable_id must not be blank".to_owned()))
    }

    /// Returns the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for EventableId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A subject an event refers to.
///
/// Persisted records come from a subject store. Transient records are rebuilt
/// from a destroy snapshot and never written back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventableRecord {
    eventable_type: EventableType,
    id: Option<EventableId>,
    attributes: Map<String, Value>,
    persisted: bool,
}

impl EventableRecord {
    /// Creates a persisted record loaded from a subject store.
    pub fn new(
        eventable_type: EventableType,
        id: EventableId,
        attributes: Value,
    ) -> AppResult<Self> {
        let Value::Object(attributes) = attributes else {
            return Err(AppError::Validation(format!(
                "attributes for {eventable_type} '{id}' must be a JSON object"
            )));
        };

        Ok(Self {
            eventable_type,
            id: Some(id),
            attributes,
            persisted: true,
        })
    }

    /// Creates an unsaved record populated from a snapshot.
    #[must_use]
    pub fn transient(eventable_type: EventableType, snapshot: &AttributeSnapshot) -> Self {
        Self {
            eventable_type,
            id: None,
            attributes: snapshot.to_object(),
            persisted: false,
        }
    }

    /// Returns the type tag.
    #[must_use]
    pub fn eventable_type(&self) -> &EventableType {
        &self.eventable_type
    }

    /// Returns the identifier. Transient records have none.
    #[must_use]
    pub fn id(&self) -> Option<&EventableId> {
        self.id.as_ref()
    }

    /// Returns all attributes.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Returns one attribute value.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Returns whether the record was loaded from a store.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Captures the current attributes as a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> AttributeSnapshot {
        AttributeSnapshot::new(self.attributes.clone())
    }
}
