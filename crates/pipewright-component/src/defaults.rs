// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Default-value filling for task inputs.
//!
//! Walks the task's resolved input schema and inserts the `default` of
//! every property the input leaves unset. Nested objects are filled in
//! place; a missing nested object is created when any of its properties
//! has a default. Array elements are filled from `items`.
//!
//! Every `allOf` branch applies. Of `oneOf` and `anyOf`, only the branch
//! whose `const` properties all equal the input's values applies; inputs
//! that match no discriminated branch keep their fields as they are.

use pipewright_schema::SchemaNode;
use serde_json::{Map, Value};
use thiserror::Error;

/// The input cannot hold defaults.
#[derive(Debug, Error)]
#[error("expected an object input, got {0}")]
pub struct DefaultsError(pub &'static str);

/// Fill unset fields of `input` from the defaults in `schema`.
///
/// A `null` input is treated as an empty object.
pub fn fill_defaults(schema: &SchemaNode, input: &mut Value) -> Result<(), DefaultsError> {
    if input.is_null() {
        *input = Value::Object(Map::new());
    }
    match input {
        Value::Object(fields) => {
            fill_object(schema, fields);
            Ok(())
        }
        other => Err(DefaultsError(json_kind(other))),
    }
}

fn fill_value(schema: &SchemaNode, value: &mut Value) {
    match value {
        Value::Object(fields) => fill_object(schema, fields),
        Value::Array(elements) => {
            if let Some(items) = &schema.items {
                for element in elements {
                    fill_value(items, element);
                }
            }
        }
        _ => {}
    }
}

fn fill_object(schema: &SchemaNode, fields: &mut Map<String, Value>) {
    for (key, property) in schema.properties.iter().flatten() {
        match fields.get_mut(key) {
            Some(value) => fill_value(property, value),
            None => {
                if let Some(default) = property.default_value() {
                    fields.insert(key.clone(), default.clone());
                } else if property.is_object() {
                    let mut nested = Map::new();
                    fill_object(property, &mut nested);
                    if !nested.is_empty() {
                        fields.insert(key.clone(), Value::Object(nested));
                    }
                }
            }
        }
    }

    for branch in schema.all_of.iter().flatten() {
        fill_object(branch, fields);
    }
    for branches in [&schema.one_of, &schema.any_of].into_iter().flatten() {
        if let Some(branch) = branches.iter().find(|branch| discriminates(branch, fields)) {
            fill_object(branch, fields);
        }
    }
}

/// Whether `branch` declares at least one `const` property and `fields`
/// carries the same value for each of them.
fn discriminates(branch: &SchemaNode, fields: &Map<String, Value>) -> bool {
    let mut constants = branch
        .properties
        .iter()
        .flatten()
        .filter_map(|(key, property)| property.constant.as_ref().map(|c| (key, c)))
        .peekable();
    constants.peek().is_some() && constants.all(|(key, constant)| fields.get(key) == Some(constant))
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
