//! The item record stored in the table.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::ItemError;

/// Name of the primary key attribute.
pub const PRIMARY_KEY: &str = "id";

/// A JSON object with a non-empty string `id`.
///
/// Every other field is passed through to the store untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
#[schema(value_type = Object)]
pub struct Item(Map<String, Value>);

impl Item {
    /// The primary key.
    pub fn id(&self) -> &str {
        match self.0.get(PRIMARY_KEY) {
            Some(Value::String(id)) => id,
            // Constructors reject items without a string id.
            _ => "",
        }
    }

    /// Look up a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// All fields, including `id`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Wrap fields whose `id` the caller generated.
    pub(crate) fn from_generated(id: String, mut fields: Map<String, Value>) -> Self {
        debug_assert!(!id.is_empty());
        fields.insert(PRIMARY_KEY.to_string(), Value::String(id));
        Self(fields)
    }
}

impl TryFrom<Map<String, Value>> for Item {
    type Error = ItemError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        match fields.get(PRIMARY_KEY) {
            None => Err(ItemError::MissingId),
            Some(Value::String(id)) if id.is_empty() => Err(ItemError::EmptyId),
            Some(Value::String(_)) => Ok(Self(fields)),
            Some(_) => Err(ItemError::InvalidId),
        }
    }
}

impl TryFrom<Value> for Item {
    type Error = ItemError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Self::try_from(fields),
            _ => Err(ItemError::NotAnObject),
        }
    }
}

impl From<Item> for Map<String, Value> {
    fn from(item: Item) -> Self {
        item.0
    }
}

impl From<Item> for Value {
    fn from(item: Item) -> Self {
        Value::Object(item.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_object_with_string_id() {
        let item = Item::try_from(json!({"id": "a-1", "price": 10.5, "tags": ["x"]})).unwrap();
        assert_eq!(item.id(), "a-1");
        assert_eq!(item.get("price"), Some(&json!(10.5)));
    }

    #[test]
    fn rejects_missing_id() {
        assert_eq!(
            Item::try_from(json!({"name": "no key"})),
            Err(ItemError::MissingId)
        );
    }

    #[test]
    fn rejects_empty_or_non_string_id() {
        assert_eq!(Item::try_from(json!({"id": ""})), Err(ItemError::EmptyId));
        assert_eq!(Item::try_from(json!({"id": 7})), Err(ItemError::InvalidId));
        assert_eq!(Item::try_from(json!({"id": null})), Err(ItemError::InvalidId));
    }

    #[test]
    fn rejects_non_objects() {
        assert_eq!(Item::try_from(json!(["id"])), Err(ItemError::NotAnObject));
        assert_eq!(Item::try_from(json!("id")), Err(ItemError::NotAnObject));
    }

    #[test]
    fn serializes_as_plain_object() {
        let item = Item::try_from(json!({"id": "a-1", "nested": {"k": true}})).unwrap();
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value, json!({"id": "a-1", "nested": {"k": true}}));
    }

    #[test]
    fn deserialize_enforces_id() {
        let result: Result<Item, _> = serde_json::from_value(json!({"name": "x"}));
        assert!(result.is_err());
    }
}
