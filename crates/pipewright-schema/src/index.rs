// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Field indices over a component's schemas.
//!
//! Paths are dotted property names relative to the walked root, e.g.
//! `auth.token`. Object-typed properties are descended into, together with
//! the properties of their `oneOf` branches.

use std::collections::BTreeMap;

use crate::node::SchemaNode;

/// Read-only lookup tables built once when a definition is loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldIndex {
    secret_fields: Vec<String>,
    accept_formats: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    output_formats: BTreeMap<String, BTreeMap<String, String>>,
}

impl FieldIndex {
    /// Build the index from a setup schema and per-task input/output schemas.
    pub fn build<'a, I, O>(setup: Option<&SchemaNode>, inputs: I, outputs: O) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a SchemaNode)>,
        O: IntoIterator<Item = (&'a str, &'a SchemaNode)>,
    {
        let mut secret_fields = Vec::new();
        if let Some(setup) = setup {
            walk_root(setup, &mut |path, node| {
                if node.is_secret() {
                    secret_fields.push(path.to_string());
                }
            });
        }

        let accept_formats = inputs
            .into_iter()
            .map(|(task, schema)| {
                let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
                walk_root(schema, &mut |path, node| {
                    if let Some(formats) = &node.accept_formats {
                        fields
                            .entry(path.to_string())
                            .or_default()
                            .extend(formats.iter().cloned());
                    }
                });
                (task.to_string(), fields)
            })
            .collect();

        let output_formats = outputs
            .into_iter()
            .map(|(task, schema)| {
                let mut fields = BTreeMap::new();
                walk_root(schema, &mut |path, node| {
                    if let Some(format) = &node.output_format {
                        fields.insert(path.to_string(), format.clone());
                    }
                });
                (task.to_string(), fields)
            })
            .collect();

        Self {
            secret_fields,
            accept_formats,
            output_formats,
        }
    }

    /// Whether the setup field at `path` is marked secret.
    pub fn is_secret(&self, path: &str) -> bool {
        self.secret_fields.iter().any(|field| field == path)
    }

    pub fn secret_fields(&self) -> &[String] {
        &self.secret_fields
    }

    /// Accepted formats of an input field; empty when none are declared.
    ///
    /// A path reachable through several `oneOf` branches lists the formats
    /// of every branch, duplicates included.
    pub fn accept_formats(&self, task: &str, path: &str) -> &[String] {
        self.accept_formats
            .get(task)
            .and_then(|fields| fields.get(path))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Output format of a produced field. The last branch declaring one wins.
    pub fn output_format(&self, task: &str, path: &str) -> Option<&str> {
        self.output_formats
            .get(task)
            .and_then(|fields| fields.get(path))
            .map(String::as_str)
    }

    pub fn input_accept_formats(&self) -> &BTreeMap<String, BTreeMap<String, Vec<String>>> {
        &self.accept_formats
    }

    pub fn output_formats(&self) -> &BTreeMap<String, BTreeMap<String, String>> {
        &self.output_formats
    }
}

fn walk_root<F>(root: &SchemaNode, visit: &mut F)
where
    F: FnMut(&str, &SchemaNode),
{
    walk_properties(root, "", visit);
    for branch in root.one_of.iter().flatten() {
        walk_properties(branch, "", visit);
    }
}

fn walk_properties<F>(parent: &SchemaNode, prefix: &str, visit: &mut F)
where
    F: FnMut(&str, &SchemaNode),
{
    let Some(properties) = &parent.properties else {
        return;
    };

    for (key, node) in properties {
        let path = format!("{prefix}{key}");
        visit(&path, node);

        if node.is_object() {
            let nested = format!("{path}.");
            for branch in node.one_of.iter().flatten() {
                walk_properties(branch, &nested, visit);
            }
            walk_properties(node, &nested, visit);
        }
    }
}
