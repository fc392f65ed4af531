// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Component definition types.
//!
//! A [`ComponentDefinition`] is produced once by the
//! [`DefinitionLoader`](crate::DefinitionLoader) and never mutated
//! afterwards. It serializes to the document served to clients; the
//! resolved task schemas and the field index are kept alongside for the
//! dispatcher and are not serialized.

use std::collections::BTreeMap;

use pipewright_schema::{FieldIndex, SchemaNode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// The connector-authored `definition.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionManifest {
    pub id: String,
    pub uid: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub documentation_url: String,
    #[serde(default)]
    pub icon: String,
    /// Task identifiers the component exposes, in display order.
    pub available_tasks: Vec<String>,
    /// Any other keys, passed through to the served definition.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Summary of one task shown in task pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskCard {
    pub name: String,
    pub title: String,
    pub description: String,
}

/// Display form of a task's input and output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSpecification {
    pub input: SchemaNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<SchemaNode>,
}

/// One subscribable event of the component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSpecification {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config_schema: Value,
    #[serde(default)]
    pub message_schema: Value,
    #[serde(default)]
    pub message_examples: Vec<Value>,
}

/// Generated specifications of a component.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSpec {
    /// `oneOf` union over tasks, plus `properties.setup` when a setup
    /// schema exists.
    pub component_specification: Value,
    pub data_specifications: BTreeMap<String, DataSpecification>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub event_specifications: BTreeMap<String, EventSpecification>,
}

/// Resolved, untransformed schemas of one task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSchema {
    pub input: SchemaNode,
    pub output: Option<SchemaNode>,
}

/// A fully loaded component definition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDefinition {
    pub id: String,
    pub uid: Uuid,
    /// `component-definitions/{id}`.
    pub name: String,
    pub title: String,
    pub description: String,
    pub version: String,
    pub vendor: String,
    pub documentation_url: String,
    pub icon: String,
    pub tasks: Vec<TaskCard>,
    pub spec: DefinitionSpec,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub(crate) task_schemas: BTreeMap<String, TaskSchema>,
    #[serde(skip)]
    pub(crate) index: FieldIndex,
}

impl ComponentDefinition {
    pub fn task_card(&self, task: &str) -> Option<&TaskCard> {
        self.tasks.iter().find(|card| card.name == task)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|card| card.name.as_str())
    }

    /// The resolved input schema of `task`.
    pub fn task_input_schema(&self, task: &str) -> Option<&SchemaNode> {
        self.task_schemas.get(task).map(|schema| &schema.input)
    }

    /// The resolved output schema of `task`, when it declares one.
    pub fn task_output_schema(&self, task: &str) -> Option<&SchemaNode> {
        self.task_schemas
            .get(task)
            .and_then(|schema| schema.output.as_ref())
    }

    pub fn data_specification(&self, task: &str) -> Option<&DataSpecification> {
        self.spec.data_specifications.get(task)
    }

    pub fn event_specification(&self, event: &str) -> Option<&EventSpecification> {
        self.spec.event_specifications.get(event)
    }

    pub fn field_index(&self) -> &FieldIndex {
        &self.index
    }

    /// Whether the setup field at the dotted `path` holds a secret.
    pub fn is_secret_field(&self, path: &str) -> bool {
        self.index.is_secret(path)
    }

    pub fn secret_fields(&self) -> &[String] {
        self.index.secret_fields()
    }

    pub fn accept_formats(&self, task: &str, path: &str) -> &[String] {
        self.index.accept_formats(task, path)
    }

    pub fn output_format(&self, task: &str, path: &str) -> Option<&str> {
        self.index.output_format(task, path)
    }
}
