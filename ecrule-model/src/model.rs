use crate::{Entity, ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// File extension of model resources (`Test` resolves to `Test.eomodel`).
pub const MODEL_EXTENSION: &str = "eomodel";

/// A named schema definition: the entities a group of persistent objects
/// can be instances of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    #[serde(default)]
    pub entities: Vec<EntityDefinition>,
}

impl Model {
    pub fn new(name: impl Into<String>, entities: Vec<EntityDefinition>) -> Self {
        Self {
            name: name.into(),
            entities,
        }
    }

    /// Parses and checks a model from its JSON representation.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let model: Model = serde_json::from_str(json)?;
        model.check()?;
        Ok(model)
    }

    /// Reads a model resource from disk.
    ///
    /// The model's declared name must match the file stem, so that the
    /// registry entry created for `Test.eomodel` is always named `Test`.
    pub fn from_path(path: &Path) -> ModelResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let model = Self::from_json(&contents)?;
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if model.name != stem {
            return Err(ModelError::InvalidModel {
                model: model.name,
                reason: format!("declared in resource named '{stem}'"),
            });
        }
        Ok(model)
    }

    pub fn entity_named(&self, name: &str) -> Option<&EntityDefinition> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.name.as_str())
    }

    /// Structural checks: non-empty names, no duplicate entities, no
    /// duplicate attributes within an entity.
    pub fn check(&self) -> ModelResult<()> {
        let invalid = |reason: String| ModelError::InvalidModel {
            model: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("model name is empty".into()));
        }

        let mut entity_names = HashSet::new();
        for entity in &self.entities {
            if entity.name.trim().is_empty() {
                return Err(invalid("entity name is empty".into()));
            }
            if !entity_names.insert(entity.name.as_str()) {
                return Err(invalid(format!("entity '{}' declared twice", entity.name)));
            }

            let mut attribute_names = HashSet::new();
            for attribute in &entity.attributes {
                if attribute.name.trim().is_empty() {
                    return Err(invalid(format!(
                        "entity '{}' has an attribute with an empty name",
                        entity.name
                    )));
                }
                if !attribute_names.insert(attribute.name.as_str()) {
                    return Err(invalid(format!(
                        "attribute '{}.{}' declared twice",
                        entity.name, attribute.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Declares one entity: its name and the attributes its objects carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl EntityDefinition {
    pub fn new(name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Creates a fresh object of this entity with every attribute set to null.
    pub fn instantiate(&self) -> Entity {
        let mut entity = Entity::new(&self.name);
        for attribute in &self.attributes {
            entity.data[attribute.name.as_str()] = Value::Null;
        }
        entity
    }

    /// Checks an object's values against the declared attributes.
    pub fn validate(&self, entity: &Entity) -> ModelResult<()> {
        if entity.entity_name != self.name {
            return Err(ModelError::EntityMismatch {
                expected: self.name.clone(),
                found: entity.entity_name.clone(),
            });
        }

        let values = entity
            .data
            .as_object()
            .ok_or_else(|| ModelError::NotAnObject(json_kind(&entity.data).into()))?;

        if let Some(unknown) = values.keys().find(|key| self.attribute(key).is_none()) {
            return Err(ModelError::UnknownAttribute {
                entity: self.name.clone(),
                attribute: unknown.clone(),
            });
        }

        for attribute in &self.attributes {
            match values.get(&attribute.name) {
                None | Some(Value::Null) => {
                    if !attribute.allows_null {
                        return Err(ModelError::NullViolation {
                            entity: self.name.clone(),
                            attribute: attribute.name.clone(),
                        });
                    }
                }
                Some(value) if !attribute.attribute_type.accepts(value) => {
                    return Err(ModelError::TypeMismatch {
                        entity: self.name.clone(),
                        attribute: attribute.name.clone(),
                        expected: attribute.attribute_type,
                        found: json_kind(value).into(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// A single declared attribute of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    #[serde(default = "default_allows_null")]
    pub allows_null: bool,
}

fn default_allows_null() -> bool {
    true
}

impl Attribute {
    fn nullable(name: &str, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
            allows_null: true,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::nullable(name, AttributeType::String)
    }

    pub fn integer(name: &str) -> Self {
        Self::nullable(name, AttributeType::Integer)
    }

    pub fn decimal(name: &str) -> Self {
        Self::nullable(name, AttributeType::Decimal)
    }

    pub fn boolean(name: &str) -> Self {
        Self::nullable(name, AttributeType::Boolean)
    }

    /// Milliseconds since the epoch, or an RFC 3339 string.
    pub fn timestamp(name: &str) -> Self {
        Self::nullable(name, AttributeType::Timestamp)
    }

    pub fn json(name: &str) -> Self {
        Self::nullable(name, AttributeType::Json)
    }

    /// Marks the attribute mandatory: saving an object with a null value fails.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.allows_null = false;
        self
    }
}

/// Value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Integer,
    Decimal,
    Boolean,
    Timestamp,
    Json,
}

impl AttributeType {
    /// Whether a non-null JSON value is acceptable for this type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Decimal => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Timestamp => match value {
                Value::Number(n) => n.is_i64(),
                Value::String(s) => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
                _ => false,
            },
            Self::Json => true,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
