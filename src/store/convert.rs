//! JSON values to DynamoDB attribute values and back.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::{Map, Number, Value};

use crate::error::StoreError;
use crate::item::Item;

/// Convert an item into an attribute map for `PutItem`.
pub fn item_to_attributes(item: &Item) -> HashMap<String, AttributeValue> {
    item.fields()
        .iter()
        .map(|(name, value)| (name.clone(), value_to_attribute(value)))
        .collect()
}

/// Convert an attribute map returned by `Scan` into an item.
pub fn attributes_to_item(attributes: &HashMap<String, AttributeValue>) -> Result<Item, StoreError> {
    let mut fields = Map::with_capacity(attributes.len());
    for (name, attribute) in attributes {
        fields.insert(name.clone(), attribute_to_value(attribute)?);
    }
    Item::try_from(fields).map_err(|e| StoreError::Conversion(format!("stored item: {}", e)))
}

fn value_to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(values) => AttributeValue::L(values.iter().map(value_to_attribute).collect()),
        Value::Object(fields) => AttributeValue::M(
            fields
                .iter()
                .map(|(name, value)| (name.clone(), value_to_attribute(value)))
                .collect(),
        ),
    }
}

fn attribute_to_value(attribute: &AttributeValue) -> Result<Value, StoreError> {
    let value = match attribute {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::N(n) => Value::Number(parse_number(n)?),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::L(values) => Value::Array(
            values
                .iter()
                .map(attribute_to_value)
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::M(fields) => {
            let mut map = Map::with_capacity(fields.len());
            for (name, value) in fields {
                map.insert(name.clone(), attribute_to_value(value)?);
            }
            Value::Object(map)
        }
        AttributeValue::Ss(values) => Value::Array(values.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(values) => Value::Array(
            values
                .iter()
                .map(|n| parse_number(n).map(Value::Number))
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::B(_) | AttributeValue::Bs(_) => {
            return Err(StoreError::Conversion(
                "binary attributes are not supported".to_string(),
            ))
        }
        _ => {
            return Err(StoreError::Conversion(
                "unknown attribute type".to_string(),
            ))
        }
    };
    Ok(value)
}

/// Parse a store number, preferring exact integers.
fn parse_number(text: &str) -> Result<Number, StoreError> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Number::from(i));
    }
    if let Ok(u) = text.parse::<u64>() {
        return Ok(Number::from(u));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| StoreError::Conversion(format!("invalid number {:?}", text)))
}
