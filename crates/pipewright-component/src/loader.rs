// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Definition loading.
//!
//! [`DefinitionLoader`] turns a connector's embedded JSON documents into a
//! [`ComponentDefinition`]:
//!
//! 1. parse `definition.json` and read `availableTasks`
//! 2. resolve every `$ref` in the task document against the auxiliary
//!    documents (and a remote provider: the configured one, or an HTTP
//!    fetcher when the `remote-refs` feature is enabled)
//! 3. build a [`TaskCard`] per available task
//! 4. generate the component specification and the data specifications
//! 5. refine the setup schema and splice it in as `properties.setup`
//! 6. parse event specifications
//! 7. build the field index
//!
//! Any failure aborts the whole load.

use std::collections::BTreeMap;

use pipewright_schema::{
    FieldIndex, ReferenceProvider, ReferenceResolver, SchemaNode, format_data_spec,
    refine_setup_spec, to_component_spec,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::definition::{
    ComponentDefinition, DataSpecification, DefinitionManifest, DefinitionSpec,
    EventSpecification, TaskCard, TaskSchema,
};
use crate::error::LoadError;

/// Timeout for fetching remote reference documents with the default provider.
#[cfg(feature = "remote-refs")]
pub const REMOTE_FETCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// `$schema` of generated component specifications.
pub const COMPONENT_SPEC_DIALECT: &str = "http://json-schema.org/draft-07/schema#";

const TASK_PREFIX: &str = "TASK_";

/// Manifest keys the served definition computes itself.
const GENERATED_KEYS: &[&str] = &["name", "tasks", "spec"];

/// Schema of the `condition` property present on every task branch.
pub fn condition_schema() -> Value {
    json!({
        "type": "string",
        "uiOrder": 1,
        "shortDescription": "config whether the component will be executed or skipped",
        "acceptFormats": ["string"],
        "upstreamTypes": ["value", "template"]
    })
}

/// Derive a display title from a task identifier.
///
/// `TASK_LIST_PULL_REQUESTS` becomes `List Pull Requests`.
pub fn task_id_to_title(id: &str) -> String {
    id.replace(TASK_PREFIX, "")
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// One entry of the task document after reference resolution.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskEntry {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    short_description: Option<String>,
    #[serde(default)]
    input: Option<SchemaNode>,
    #[serde(default)]
    output: Option<SchemaNode>,
    #[serde(default)]
    metadata: Option<Value>,
}

/// Builder over the documents that make up a component definition.
///
/// ```ignore
/// let definition = DefinitionLoader::new(DEFINITION_JSON, TASKS_JSON)
///     .setup(SETUP_JSON)
///     .events(EVENTS_JSON)
///     .document("schema.json", SCHEMA_JSON)
///     .load()?;
/// ```
pub struct DefinitionLoader<'a> {
    definition: &'a str,
    tasks: &'a str,
    setup: Option<&'a str>,
    events: Option<&'a str>,
    documents: Vec<(&'a str, &'a str)>,
    remote: Option<&'a dyn ReferenceProvider>,
}

impl<'a> DefinitionLoader<'a> {
    pub fn new(definition: &'a str, tasks: &'a str) -> Self {
        Self {
            definition,
            tasks,
            setup: None,
            events: None,
            documents: Vec::new(),
            remote: None,
        }
    }

    /// Setup (connection) schema.
    pub fn setup(mut self, setup: &'a str) -> Self {
        self.setup = Some(setup);
        self
    }

    /// Event specifications keyed by event name.
    pub fn events(mut self, events: &'a str) -> Self {
        self.events = Some(events);
        self
    }

    /// Auxiliary document that task schemas may reference by `name`.
    pub fn document(mut self, name: &'a str, json: &'a str) -> Self {
        self.documents.push((name, json));
        self
    }

    /// Provider for `http(s)` references not registered as documents.
    pub fn remote(mut self, provider: &'a dyn ReferenceProvider) -> Self {
        self.remote = Some(provider);
        self
    }

    pub fn load(self) -> Result<ComponentDefinition, LoadError> {
        let mut manifest: DefinitionManifest = serde_json::from_str(self.definition)
            .map_err(|e| LoadError::parse("definition", e))?;
        for key in GENERATED_KEYS {
            manifest.extra.remove(*key);
        }

        let rendered = self.render_tasks()?;
        let (cards, entries) = load_tasks(&manifest.available_tasks, &rendered)?;

        let mut task_schemas = BTreeMap::new();
        let mut branches = Vec::with_capacity(cards.len());
        let mut data_specifications = BTreeMap::new();

        for card in &cards {
            let entry = &entries[&card.name];
            let input = entry
                .input
                .clone()
                .ok_or_else(|| LoadError::MissingInput(card.name.clone()))?;
            let task_error = |source| LoadError::Task {
                task: card.name.clone(),
                source,
            };

            branches.push(task_branch(card, entry, &input).map_err(task_error)?);

            let formatted_input = format_data_spec(&input).map_err(task_error)?;
            let formatted_output = entry
                .output
                .as_ref()
                .map(format_data_spec)
                .transpose()
                .map_err(task_error)?;
            data_specifications.insert(
                card.name.clone(),
                DataSpecification {
                    input: formatted_input,
                    output: formatted_output,
                },
            );

            task_schemas.insert(
                card.name.clone(),
                TaskSchema {
                    input,
                    output: entry.output.clone(),
                },
            );
            debug!(component = %manifest.id, task = %card.name, "Loaded task schema");
        }

        let mut component_specification = json!({
            "$schema": COMPONENT_SPEC_DIALECT,
            "title": format!("{} Component", manifest.title),
            "type": "object",
            "oneOf": branches,
        });

        let setup = self
            .setup
            .map(|raw| {
                serde_json::from_str::<SchemaNode>(raw)
                    .map(|node| refine_setup_spec(&node))
                    .map_err(|e| LoadError::parse("setup", e))
            })
            .transpose()?;
        if let Some(setup) = &setup {
            component_specification["properties"] = json!({ "setup": setup.to_value()? });
        }

        let event_specifications = match self.events {
            Some(raw) => serde_json::from_str::<BTreeMap<String, EventSpecification>>(raw)
                .map_err(|e| LoadError::parse("events", e))?,
            None => BTreeMap::new(),
        };

        let index = FieldIndex::build(
            setup.as_ref(),
            task_schemas
                .iter()
                .map(|(task, schema)| (task.as_str(), &schema.input)),
            task_schemas.iter().filter_map(|(task, schema)| {
                schema.output.as_ref().map(|output| (task.as_str(), output))
            }),
        );

        info!(
            component = %manifest.id,
            tasks = cards.len(),
            events = event_specifications.len(),
            secret_fields = index.secret_fields().len(),
            "Loaded component definition"
        );

        Ok(ComponentDefinition {
            name: format!("component-definitions/{}", manifest.id),
            id: manifest.id,
            uid: manifest.uid,
            title: manifest.title,
            description: manifest.description,
            version: manifest.version,
            vendor: manifest.vendor,
            documentation_url: manifest.documentation_url,
            icon: manifest.icon,
            tasks: cards,
            spec: DefinitionSpec {
                component_specification,
                data_specifications,
                event_specifications,
            },
            extra: manifest.extra,
            task_schemas,
            index,
        })
    }

    /// Parse the task document and substitute every reference.
    fn render_tasks(&self) -> Result<Value, LoadError> {
        let tasks: Value =
            serde_json::from_str(self.tasks).map_err(|e| LoadError::parse("tasks", e))?;

        #[cfg(feature = "remote-refs")]
        let http = pipewright_schema::HttpProvider::new(REMOTE_FETCH_TIMEOUT);

        let mut resolver = ReferenceResolver::new();
        for (name, raw) in &self.documents {
            let document: Value =
                serde_json::from_str(raw).map_err(|e| LoadError::parse(*name, e))?;
            resolver = resolver.with_document(*name, document);
        }
        if let Some(remote) = self.remote {
            resolver = resolver.with_remote(remote);
        } else {
            #[cfg(feature = "remote-refs")]
            {
                resolver = resolver.with_remote(&http);
            }
        }

        Ok(resolver.resolve(&tasks)?)
    }
}

fn load_tasks(
    available: &[String],
    rendered: &Value,
) -> Result<(Vec<TaskCard>, BTreeMap<String, TaskEntry>), LoadError> {
    let mut cards = Vec::with_capacity(available.len());
    let mut entries = BTreeMap::new();

    for task in available {
        let raw = rendered
            .get(task)
            .cloned()
            .ok_or_else(|| LoadError::UnknownTask(task.clone()))?;
        let entry: TaskEntry = serde_json::from_value(raw)
            .map_err(|e| LoadError::parse(format!("tasks.{task}"), e))?;

        let title = entry
            .title
            .clone()
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| task_id_to_title(task));
        let description = entry
            .short_description
            .clone()
            .or_else(|| entry.description.clone())
            .unwrap_or_default();

        cards.push(TaskCard {
            name: task.clone(),
            title,
            description,
        });
        entries.insert(task.clone(), entry);
    }

    Ok((cards, entries))
}

/// One `oneOf` branch of the component specification.
fn task_branch(
    card: &TaskCard,
    entry: &TaskEntry,
    input: &SchemaNode,
) -> pipewright_schema::Result<Value> {
    let mut task = Map::new();
    task.insert("const".to_string(), Value::String(card.name.clone()));
    task.insert("title".to_string(), Value::String(card.title.clone()));
    if let Some(description) = entry.description.as_ref().filter(|d| !d.is_empty()) {
        task.insert("description".to_string(), Value::String(description.clone()));
    }
    if !card.description.is_empty() {
        task.insert(
            "shortDescription".to_string(),
            Value::String(card.description.clone()),
        );
    }

    let mut properties = Map::new();
    properties.insert("task".to_string(), Value::Object(task));
    properties.insert("condition".to_string(), condition_schema());
    properties.insert("input".to_string(), to_component_spec(input)?.to_value()?);
    if let Some(metadata) = &entry.metadata {
        properties.insert("metadata".to_string(), metadata.clone());
    }

    Ok(json!({"type": "object", "properties": properties}))
}
