// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Schema handling for pipewright connectors.
//!
//! Connectors describe their tasks with JSON Schema fragments extended with
//! a handful of annotation keys. This crate provides:
//! - [`SchemaNode`], the typed AST those fragments parse into
//! - the transforms that derive the component specification, the display
//!   form of task data and the refined setup schema ([`transform`])
//! - [`FieldIndex`], lookups for secret setup fields and per-task formats
//! - [`ReferenceResolver`], `$ref` substitution across named documents

pub mod error;
pub mod index;
pub mod node;
pub mod reference;
pub mod transform;

pub use error::{Result, SchemaError};
pub use index::FieldIndex;
pub use node::{FREEFORM_FORMATS, NodeKind, SchemaNode, SchemaType, UpstreamType};
#[cfg(feature = "http")]
pub use reference::HttpProvider;
pub use reference::{MAX_REFERENCE_DEPTH, ReferenceProvider, ReferenceResolver};
pub use transform::{format_data_spec, refine_setup_spec, to_component_spec};
