//! Event entity and its validation rules.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use eventable_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AttributeSnapshot, EventableId, EventableType, UserId};

/// Maximum length of an event action, in characters.
pub const ACTION_MAX_CHARS: usize = 255;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for EventId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid event id '{value}': {error}")))
    }
}

/// What happened to the eventable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EventAction(String);

impl EventAction {
    /// Action recorded when an eventable is created.
    pub const CREATED: &'static str = "created";
    /// Action recorded when an eventable is updated.
    pub const UPDATED: &'static str = "updated";
    /// Action recorded when an eventable is destroyed.
    pub const DESTROYED: &'static str = "destroyed";

    /// Creates a validated action.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation("event action is required".to_owned()));
        }

        NonEmptyString::with_max_chars(value, ACTION_MAX_CHARS)
            .map(|value| Self(value.into()))
            .map_err(|_| {
                AppError::Validation(format!(
                    "event action must be at most {ACTION_MAX_CHARS} characters"
                ))
            })
    }

    /// Returns the `created` action.
    #[must_use]
    pub fn created() -> Self {
        Self::well_known(Self::CREATED)
    }

    /// Returns the `updated` action.
    #[must_use]
    pub fn updated() -> Self {
        Self::well_known(Self::UPDATED)
    }

    /// Returns the `destroyed` action.
    #[must_use]
    pub fn destroyed() -> Self {
        Self::well_known(Self::DESTROYED)
    }

    fn well_known(value: &'static str) -> Self {
        Self(value.to_owned())
    }

    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns whether this action removed the eventable.
    #[must_use]
    pub fn is_destroy(&self) -> bool {
        self.as_str() == Self::DESTROYED
    }
}

impl Display for EventAction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Unvalidated event fields.
///
/// Blank strings and `None` both count as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventInput {
    /// Action label, e.g. `created`.
    pub action: String,
    /// Type tag of the eventable.
    pub eventable_type: String,
    /// Identifier of the eventable. Ignored for destroy actions.
    pub eventable_id: Option<String>,
    /// Attributes captured from the eventable.
    pub eventable_attributes: Option<AttributeSnapshot>,
    /// Actor responsible for the event.
    pub user_id: Option<UserId>,
    /// Batch root this event belongs to.
    pub batch_parent_id: Option<EventId>,
}

/// Immutable audit record of one action against one eventable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    id: EventId,
    action: EventAction,
    eventable_type: EventableType,
    eventable_id: Option<EventableId>,
    eventable_attributes: Option<AttributeSnapshot>,
    user_id: UserId,
    batch_parent_id: Option<EventId>,
    created_at: DateTime<Utc>,
}

impl Event {
    /// Validates input and creates a new event.
    ///
    /// Destroy events never keep an eventable id; the subject is identified
    /// through the attribute snapshot only.
    pub fn new(input: EventInput) -> AppResult<Self> {
        Self::restore(EventId::new(), Utc::now(), input)
    }

    /// Rebuilds a stored event, enforcing the same rules as [`Event::new`].
    pub fn restore(id: EventId, created_at: DateTime<Utc>, input: EventInput) -> AppResult<Self> {
        let action = EventAction::new(input.action)?;
        let eventable_type = EventableType::new(input.eventable_type)?;
        let user_id = input
            .user_id
            .ok_or_else(|| AppError::Validation("event user_id is required".to_owned()))?;

        let eventable_id = if action.is_destroy() {
            let has_snapshot = input
                .eventable_attributes
                .as_ref()
                .is_some_and(|snapshot| !snapshot.is_empty());
            if !has_snapshot {
                return Err(AppError::Validation(
                    "eventable_attributes are required for destroyed events".to_owned(),
                ));
            }
            None
        } else {
            let eventable_id = input
                .eventable_id
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "eventable_id is required for '{action}' events"
                    ))
                })?;
            Some(EventableId::new(eventable_id)?)
        };

        Ok(Self {
            id,
            action,
            eventable_type,
            eventable_id,
            eventable_attributes: input.eventable_attributes,
            user_id,
            batch_parent_id: input.batch_parent_id,
            created_at,
        })
    }

    /// Returns the event identifier.
    #[must_use]
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Returns the action.
    #[must_use]
    pub fn action(&self) -> &EventAction {
        &self.action
    }

    /// Returns the eventable type tag.
    #[must_use]
    pub fn eventable_type(&self) -> &EventableType {
        &self.eventable_type
    }

    /// Returns the live eventable identifier, absent for destroy events.
    #[must_use]
    pub fn eventable_id(&self) -> Option<&EventableId> {
        self.eventable_id.as_ref()
    }

    /// Returns the attribute snapshot, if one was captured.
    #[must_use]
    pub fn eventable_attributes(&self) -> Option<&AttributeSnapshot> {
        self.eventable_attributes.as_ref()
    }

    /// Returns the responsible actor.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the batch root, if this event is a batch child.
    #[must_use]
    pub fn batch_parent_id(&self) -> Option<EventId> {
        self.batch_parent_id
    }

    /// Returns when the event was recorded.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns whether this event is standalone or a batch root.
    #[must_use]
    pub fn is_batched(&self) -> bool {
        self.batch_parent_id.is_none()
    }
}
