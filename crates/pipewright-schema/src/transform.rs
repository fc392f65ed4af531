// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Schema transforms.
//!
//! Three pure traversals over [`SchemaNode`] trees:
//!
//! - [`to_component_spec`] rewrites an authored task input into the shape
//!   the pipeline editor validates against. Every leaf becomes an `anyOf`
//!   union with one branch per declared [`UpstreamType`].
//! - [`format_data_spec`] reduces a schema to what a client needs to
//!   display it.
//! - [`refine_setup_spec`] fills short descriptions in a setup schema.
//!
//! Each entry point clones its argument once and then hands ownership of
//! every subtree down the recursion, so the caller's tree is never touched.

use std::collections::BTreeMap;

use serde_json::{Number, Value};
use strum::IntoEnumIterator;

use crate::error::{Result, SchemaError};
use crate::node::{NodeKind, SchemaNode, UpstreamType};

/// Pattern matched by reference expressions such as `{start.owner}`.
pub const REFERENCE_PATTERN: &str = r"^\{.*\}$";

// ============================================================================
// Component-spec transform
// ============================================================================

/// Transform an authored schema into its component-spec form.
pub fn to_component_spec(node: &SchemaNode) -> Result<SchemaNode> {
    component_spec(node.clone())
}

fn component_spec(mut node: SchemaNode) -> Result<SchemaNode> {
    let kind = node.kind();
    match kind {
        NodeKind::Const => return Ok(node),
        NodeKind::Untyped => {
            return Err(SchemaError::MissingType {
                node: node.summary(),
            });
        }
        _ => {}
    }

    map_branches(&mut node, component_spec)?;

    match kind {
        NodeKind::Object => {
            default_required(&mut node);
            node.properties = map_properties(node.properties.take(), component_spec)?;
            node.pattern_properties =
                map_properties(node.pattern_properties.take(), component_spec)?;
            Ok(node)
        }
        NodeKind::Composite if node.upstream_types.is_none() => Ok(node),
        _ => Ok(upstream_union(node)),
    }
}

/// Rewrite a leaf into an `anyOf` over its declared upstream types.
///
/// The outer node keeps the presentation keys; the `value` branch keeps
/// everything else.
fn upstream_union(mut node: SchemaNode) -> SchemaNode {
    let ui_order = node.ui_order.take().unwrap_or_else(|| Number::from(0));
    let title = node.title.take().unwrap_or_default();
    let description = node.description.take().unwrap_or_default();
    let short_description = node
        .short_description
        .take()
        .unwrap_or_else(|| description.clone());
    let accept_formats = node.accept_formats.take();
    let declared = node.upstream_types.take().unwrap_or_default();

    let branches = UpstreamType::iter()
        .filter(|upstream| declared.contains(upstream))
        .map(|upstream| match upstream {
            UpstreamType::Value => SchemaNode {
                upstream_type: Some(UpstreamType::Value),
                ..node.clone()
            },
            UpstreamType::Reference => {
                let mut branch = SchemaNode::typed("string");
                branch.extra.insert(
                    "pattern".to_string(),
                    Value::String(REFERENCE_PATTERN.to_string()),
                );
                branch.upstream_type = Some(UpstreamType::Reference);
                branch
            }
            UpstreamType::Template => SchemaNode {
                upstream_type: Some(UpstreamType::Template),
                ..SchemaNode::typed("string")
            },
        })
        .collect();

    SchemaNode {
        title: Some(title),
        description: Some(description),
        short_description: Some(short_description),
        ui_order: Some(ui_order),
        accept_formats,
        upstream_types: Some(declared),
        any_of: Some(branches),
        ..SchemaNode::default()
    }
}

// ============================================================================
// Formatted-spec transform
// ============================================================================

/// Reduce a schema to its client display form.
///
/// Applying the transform to its own output yields the same tree.
pub fn format_data_spec(node: &SchemaNode) -> Result<SchemaNode> {
    formatted(node.clone())
}

fn formatted(mut node: SchemaNode) -> Result<SchemaNode> {
    match node.kind() {
        NodeKind::Const => Ok(node),
        NodeKind::Untyped => Err(SchemaError::MissingType {
            node: node.summary(),
        }),
        NodeKind::Array => {
            default_ui_order(&mut node);
            if let Some(items) = node.items.take() {
                node.items = Some(Box::new(formatted(*items)?));
            }
            Ok(node)
        }
        NodeKind::Object => {
            default_ui_order(&mut node);
            default_required(&mut node);
            node.properties = map_properties(node.properties.take(), formatted)?;
            node.pattern_properties = map_properties(node.pattern_properties.take(), formatted)?;
            map_branches(&mut node, formatted)?;
            Ok(node)
        }
        NodeKind::Composite => {
            map_branches(&mut node, formatted)?;
            Ok(node)
        }
        NodeKind::Scalar | NodeKind::Freeform => Ok(display_leaf(node)),
    }
}

fn display_leaf(node: SchemaNode) -> SchemaNode {
    let description = node.description.unwrap_or_default();
    let short_description = node
        .short_description
        .unwrap_or_else(|| description.clone());
    // An untyped leaf keeps the formats that excuse the missing type.
    let accept_formats = match node.schema_type {
        Some(_) => None,
        None => node.accept_formats,
    };

    SchemaNode {
        schema_type: node.schema_type,
        title: Some(node.title.unwrap_or_default()),
        description: Some(description),
        short_description: Some(short_description),
        ui_order: Some(node.ui_order.unwrap_or_else(|| Number::from(0))),
        output_format: node.output_format,
        accept_formats,
        ..SchemaNode::default()
    }
}

// ============================================================================
// Setup refinement
// ============================================================================

/// Default every short description in a setup schema to its description.
pub fn refine_setup_spec(node: &SchemaNode) -> SchemaNode {
    refined(node.clone())
}

fn refined(mut node: SchemaNode) -> SchemaNode {
    if node.short_description.is_none() {
        node.short_description = Some(node.description.clone().unwrap_or_default());
    }
    node.properties = node
        .properties
        .map(|props| props.into_iter().map(|(k, v)| (k, refined(v))).collect());
    node.pattern_properties = node
        .pattern_properties
        .map(|props| props.into_iter().map(|(k, v)| (k, refined(v))).collect());
    for list in [&mut node.all_of, &mut node.any_of, &mut node.one_of] {
        if let Some(branches) = list.take() {
            *list = Some(branches.into_iter().map(refined).collect());
        }
    }
    node
}

// ============================================================================
// Helpers
// ============================================================================

fn default_ui_order(node: &mut SchemaNode) {
    if node.ui_order.is_none() {
        node.ui_order = Some(Number::from(0));
    }
}

fn default_required(node: &mut SchemaNode) {
    let required = node.required.get_or_insert_with(Vec::new).clone();
    if node.edit_on_node_fields.is_none() {
        node.edit_on_node_fields = Some(required);
    }
}

fn map_branches(
    node: &mut SchemaNode,
    f: fn(SchemaNode) -> Result<SchemaNode>,
) -> Result<()> {
    for list in [&mut node.all_of, &mut node.any_of, &mut node.one_of] {
        if let Some(branches) = list.take() {
            *list = Some(branches.into_iter().map(f).collect::<Result<_>>()?);
        }
    }
    Ok(())
}

fn map_properties(
    properties: Option<BTreeMap<String, SchemaNode>>,
    f: fn(SchemaNode) -> Result<SchemaNode>,
) -> Result<Option<BTreeMap<String, SchemaNode>>> {
    properties
        .map(|props| {
            props
                .into_iter()
                .map(|(key, value)| Ok((key, f(value)?)))
                .collect::<Result<_>>()
        })
        .transpose()
}
