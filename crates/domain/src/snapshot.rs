//! Versioned attribute snapshots captured when an eventable is destroyed.

use std::collections::BTreeMap;

use eventable_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Current snapshot envelope version written by [`AttributeSnapshot::encode`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// Envelope key holding the version. `$` keeps it apart from column names.
pub const SNAPSHOT_VERSION_KEY: &str = "$snapshot_version";

/// Attribute name to value mapping taken from an eventable at event time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSnapshot(BTreeMap<String, Value>);

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEnvelope {
    #[serde(rename = "$snapshot_version")]
    version: u32,
    attributes: BTreeMap<String, Value>,
}

impl AttributeSnapshot {
    /// Creates a snapshot from attribute pairs.
    #[must_use]
    pub fn new(attributes: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self(attributes.into_iter().collect())
    }

    /// Creates a snapshot from a JSON object.
    pub fn from_object(value: Value) -> AppResult<Self> {
        match value {
            Value::Object(attributes) => Ok(Self(attributes.into_iter().collect())),
            other => Err(AppError::Validation(format!(
                "eventable attributes must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Encodes the snapshot into its versioned storage envelope.
    #[must_use]
    pub fn encode(&self) -> Value {
        let mut envelope = Map::new();
        envelope.insert(SNAPSHOT_VERSION_KEY.to_owned(), Value::from(SNAPSHOT_VERSION));
        envelope.insert(
            "attributes".to_owned(),
            Value::Object(self.0.clone().into_iter().collect()),
        );
        Value::Object(envelope)
    }

    /// Decodes a stored snapshot.
    ///
    /// Accepts the versioned envelope (ignoring unknown envelope keys) as well
    /// as a bare attribute object written before the envelope existed. Only
    /// objects carrying [`SNAPSHOT_VERSION_KEY`] are envelopes, so bare
    /// snapshots may hold `version` or `attributes` columns of their own.
    /// Envelopes from a newer version are rejected.
    pub fn decode(value: Value) -> AppResult<Self> {
        let is_envelope = value
            .as_object()
            .is_some_and(|object| object.contains_key(SNAPSHOT_VERSION_KEY));

        if !is_envelope {
            return Self::from_object(value);
        }

        let envelope: SnapshotEnvelope = serde_json::from_value(value).map_err(|error| {
            AppError::Validation(format!("invalid eventable attributes envelope: {error}"))
        })?;

        if envelope.version > SNAPSHOT_VERSION {
            return Err(AppError::Validation(format!(
                "eventable attributes version {} is newer than supported version {}",
                envelope.version, SNAPSHOT_VERSION
            )));
        }

        Ok(Self(envelope.attributes))
    }

    /// Returns one attribute value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns the number of captured attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether no attribute was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns the attributes as a JSON object.
    #[must_use]
    pub fn to_object(&self) -> Map<String, Value> {
        self.0.clone().into_iter().collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
