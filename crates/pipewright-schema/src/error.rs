// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for pipewright-schema.

use thiserror::Error;

/// Result type using SchemaError
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors raised while parsing, resolving or transforming schemas.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// A node that is neither freeform nor composite declares no type.
    #[error("type missing: {node}")]
    MissingType {
        /// Compact JSON rendering of the offending node.
        node: String,
    },

    /// A `$ref` names a document that is neither registered nor fetchable.
    #[error("unresolved document '{document}' in reference '{reference}'")]
    UnresolvedDocument {
        /// The document part of the reference.
        document: String,
        /// The full reference string.
        reference: String,
    },

    /// A `$ref` pointer does not exist in its target document.
    #[error("reference '{reference}' does not point to anything")]
    UnresolvedPointer {
        /// The full reference string.
        reference: String,
    },

    /// A `$ref` value is not a string or has a malformed fragment.
    #[error("invalid reference: {reference}")]
    InvalidReference {
        /// The offending reference value.
        reference: String,
    },

    /// A reference chain leads back to a reference that is still being resolved.
    #[error("cyclic reference detected at '{reference}'")]
    CyclicReference {
        /// The reference that closed the cycle.
        reference: String,
    },

    /// A reference chain is nested deeper than the resolver allows.
    #[error("reference nesting exceeds {limit} levels at '{reference}'")]
    DepthExceeded {
        /// The reference at which the limit was hit.
        reference: String,
        /// The configured depth limit.
        limit: usize,
    },

    /// Fetching a remote reference document failed.
    #[error("failed to fetch '{uri}': {reason}")]
    RemoteFetch {
        /// The remote document URI.
        uri: String,
        /// The underlying failure.
        reason: String,
    },

    /// The JSON does not have the shape of a schema node.
    #[error("malformed schema: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl SchemaError {
    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingType { .. } => "SCHEMA_TYPE_MISSING",
            Self::UnresolvedDocument { .. } => "SCHEMA_UNRESOLVED_DOCUMENT",
            Self::UnresolvedPointer { .. } => "SCHEMA_UNRESOLVED_POINTER",
            Self::InvalidReference { .. } => "SCHEMA_INVALID_REFERENCE",
            Self::CyclicReference { .. } => "SCHEMA_CYCLIC_REFERENCE",
            Self::DepthExceeded { .. } => "SCHEMA_REFERENCE_DEPTH_EXCEEDED",
            Self::RemoteFetch { .. } => "SCHEMA_REMOTE_FETCH_FAILED",
            Self::Malformed(_) => "SCHEMA_MALFORMED",
        }
    }
}
