// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The schema node AST.
//!
//! A [`SchemaNode`] is a JSON Schema object with the connector annotation
//! keys lifted into typed fields:
//!
//! | Key                | Field                 |
//! |--------------------|-----------------------|
//! | `uiOrder`          | `ui_order`            |
//! | `shortDescription` | `short_description`   |
//! | `acceptFormats`    | `accept_formats`      |
//! | `upstreamTypes`    | `upstream_types`      |
//! | `upstreamType`     | `upstream_type`       |
//! | `outputFormat`     | `output_format`       |
//! | `secret`           | `secret`              |
//! | `editOnNodeFields` | `edit_on_node_fields` |
//!
//! Every key the AST does not model (`default`, `pattern`, `enum`, ...) is
//! kept verbatim in [`SchemaNode::extra`] and written back on serialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use strum::{Display, EnumIter, EnumString, VariantNames};

use crate::error::Result;

/// Accepted formats that make an untyped node freeform.
pub const FREEFORM_FORMATS: &[&str] = &["*", "semi-structured/*", "semi-structured/json"];

/// How a field value may be supplied when a pipeline is authored.
///
/// The declaration order of the variants is the order in which union
/// branches are emitted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UpstreamType {
    /// A literal value.
    Value,
    /// A `{...}` reference to another field.
    Reference,
    /// A template string.
    Template,
}

/// The `type` keyword: a single name or a list of names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Union(Vec<String>),
}

impl SchemaType {
    /// The type name when exactly one is declared as a plain string.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(name) => Some(name),
            Self::Union(_) => None,
        }
    }
}

impl From<&str> for SchemaType {
    fn from(name: &str) -> Self {
        Self::Single(name.to_string())
    }
}

/// Structural classification of a node, in the priority the transforms use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Carries `const`; passed through untouched.
    Const,
    /// `type: "object"`.
    Object,
    /// `type: "array"`.
    Array,
    /// Any other declared type, including type unions.
    Scalar,
    /// No type, but `allOf`/`anyOf`/`oneOf` branches.
    Composite,
    /// No type and a freeform format set.
    Freeform,
    /// No type and nothing that excuses its absence.
    Untyped,
}

/// A JSON Schema node with typed connector annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,

    /// Input formats this field accepts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_formats: Option<Vec<String>>,

    /// Declared ways of supplying the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_types: Option<Vec<UpstreamType>>,

    /// Set on generated union branches only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_type: Option<UpstreamType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_order: Option<Number>,

    /// Format tag of a produced value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,

    /// Secret marker, `true` or `"true"` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_on_node_fields: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_properties: Option<BTreeMap<String, SchemaNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,

    /// `const`, kept even when it is `null`.
    #[serde(
        rename = "const",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub constant: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<SchemaNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<SchemaNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<SchemaNode>>,

    /// Keywords not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl SchemaNode {
    /// Parse a node from a JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Render the node back to JSON.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// A node whose `type` is the given single name.
    pub fn typed(name: &str) -> Self {
        Self {
            schema_type: Some(name.into()),
            ..Self::default()
        }
    }

    /// The single declared type name, if any.
    pub fn type_name(&self) -> Option<&str> {
        self.schema_type.as_ref().and_then(SchemaType::as_single)
    }

    pub fn is_object(&self) -> bool {
        self.type_name() == Some("object")
    }

    pub fn is_array(&self) -> bool {
        self.type_name() == Some("array")
    }

    pub fn is_composite(&self) -> bool {
        self.all_of.is_some() || self.any_of.is_some() || self.one_of.is_some()
    }

    /// Whether the node may legitimately omit `type`.
    ///
    /// True when the node declares no formats at all, or when any of its
    /// accepted or output formats is a wildcard.
    pub fn is_freeform(&self) -> bool {
        let mut formats = self
            .accept_formats
            .iter()
            .flatten()
            .map(String::as_str)
            .chain(self.output_format.as_deref().filter(|f| !f.is_empty()))
            .peekable();

        if formats.peek().is_none() {
            return true;
        }
        formats.any(|f| FREEFORM_FORMATS.contains(&f))
    }

    /// Whether the secret marker is set to `true` or `"true"`.
    pub fn is_secret(&self) -> bool {
        match &self.secret {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(flag)) => flag == "true",
            _ => false,
        }
    }

    /// The `default` keyword, if present.
    pub fn default_value(&self) -> Option<&Value> {
        self.extra.get("default")
    }

    pub fn kind(&self) -> NodeKind {
        if self.constant.is_some() {
            return NodeKind::Const;
        }
        match self.type_name() {
            Some("object") => NodeKind::Object,
            Some("array") => NodeKind::Array,
            _ if self.schema_type.is_some() => NodeKind::Scalar,
            _ if self.is_composite() => NodeKind::Composite,
            _ if self.is_freeform() => NodeKind::Freeform,
            _ => NodeKind::Untyped,
        }
    }

    /// Iterate the `allOf`, `anyOf` and `oneOf` branches, in that order.
    pub fn branches(&self) -> impl Iterator<Item = &SchemaNode> {
        self.all_of
            .iter()
            .chain(self.any_of.iter())
            .chain(self.one_of.iter())
            .flatten()
    }

    /// Compact JSON rendering used in error messages.
    pub(crate) fn summary(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}
