use ecrule_types::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A persistent object managed through an editing context.
///
/// Attribute values live in `data` as a flat JSON object keyed by attribute
/// name; the owning [`EntityDefinition`](crate::EntityDefinition) decides
/// which keys and value types are legal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub entity_name: String,
    pub data: Value,
    pub created_at: i64,
    pub modified_at: i64,
}

impl Entity {
    /// Creates an object with no attribute values and fresh timestamps.
    pub fn new(entity_name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: EntityId::new(),
            entity_name: entity_name.into(),
            data: Value::Object(Map::new()),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.data.get(attribute)
    }

    pub fn get_str(&self, attribute: &str) -> Option<&str> {
        self.get(attribute).and_then(Value::as_str)
    }

    pub fn get_bool(&self, attribute: &str) -> Option<bool> {
        self.get(attribute).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, attribute: &str) -> Option<i64> {
        self.get(attribute).and_then(Value::as_i64)
    }

    pub fn get_number(&self, attribute: &str) -> Option<f64> {
        self.get(attribute).and_then(Value::as_f64)
    }

    /// True if the attribute is absent or explicitly null.
    pub fn is_null(&self, attribute: &str) -> bool {
        self.get(attribute).is_none_or(Value::is_null)
    }

    /// Sets an attribute value and bumps `modified_at`.
    ///
    /// No type checking happens here; values are validated against the
    /// entity definition when changes are saved.
    pub fn set(&mut self, attribute: &str, value: impl Into<Value>) {
        if !self.data.is_object() {
            self.data = Value::Object(Map::new());
        }
        self.data[attribute] = value.into();
        self.modified_at = chrono::Utc::now().timestamp_millis().max(self.modified_at);
    }
}
