// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for pipewright-component.

use pipewright_schema::SchemaError;
use thiserror::Error;

/// Boxed error used at the job I/O and vendor client seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to load a component definition. Fatal at boot.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// A definition document is not valid JSON or has the wrong shape.
    #[error("failed to parse {document}: {source}")]
    Parse {
        /// Which document failed.
        document: String,
        source: serde_json::Error,
    },

    /// Reference resolution or schema parsing failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A task schema could not be transformed.
    #[error("task {task}: {source}")]
    Task {
        /// The task whose schema is invalid.
        task: String,
        source: SchemaError,
    },

    /// The definition lists a task the task document does not describe.
    #[error("available task '{0}' has no schema")]
    UnknownTask(String),

    /// A task schema has no `input`.
    #[error("task '{0}' has no input schema")]
    MissingInput(String),
}

impl LoadError {
    pub(crate) fn parse(document: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            document: document.into(),
            source,
        }
    }

    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "DEFINITION_PARSE_ERROR",
            Self::Schema(err) => err.error_code(),
            Self::Task { .. } => "DEFINITION_TASK_SCHEMA_INVALID",
            Self::UnknownTask(_) => "DEFINITION_UNKNOWN_TASK",
            Self::MissingInput(_) => "DEFINITION_TASK_INPUT_MISSING",
        }
    }
}

/// Errors raised while creating or running a task execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// No handler is bound to the requested task.
    #[error("not supported task: {task}")]
    UnsupportedTask {
        /// The requested task identifier.
        task: String,
    },

    /// The job input does not match what the handler expects.
    #[error("invalid task input: {0}")]
    InvalidInput(String),

    /// The vendor call made by the handler failed.
    #[error("{0}")]
    Vendor(#[source] BoxError),
}

impl TaskError {
    /// Wrap a vendor client error.
    pub fn vendor(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Vendor(Box::new(err))
    }

    /// Message suitable for showing to the pipeline author.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedTask { task } => format!("{task} task is not supported."),
            other => other.to_string(),
        }
    }

    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedTask { .. } => "UNSUPPORTED_TASK",
            Self::InvalidInput(_) => "INVALID_TASK_INPUT",
            Self::Vendor(_) => "VENDOR_CALL_FAILED",
        }
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Failure of a single job. Reported to that job's error sink only.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JobError {
    #[error("failed to read job input: {0}")]
    Read(#[source] BoxError),

    #[error("failed to fill default values: {0}")]
    Defaults(#[from] crate::defaults::DefaultsError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("failed to write job output: {0}")]
    Write(#[source] BoxError),
}

impl JobError {
    /// The processing step that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Read(_) => "read",
            Self::Defaults(_) => "defaults",
            Self::Task(_) => "handler",
            Self::Write(_) => "write",
        }
    }
}

/// Errors raised by the event lifecycle operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EventError {
    /// No parser exists for the `{event}.{action}` pair.
    #[error("not supported event: {event}.{action}")]
    UnsupportedEvent {
        /// Event type taken from the transport headers.
        event: String,
        /// Action taken from the payload.
        action: String,
    },

    /// The configured resource is not of the form `namespace/name`.
    #[error("invalid repository format: {0}")]
    InvalidRepository(String),

    /// A header the operation depends on is absent.
    #[error("missing header: {0}")]
    MissingHeader(&'static str),

    /// A hook id header or identifier is not an integer.
    #[error("invalid hook id: {0}")]
    InvalidHookId(String),

    /// The payload, config or setup does not have the expected shape.
    #[error("invalid event data: {0}")]
    InvalidData(#[from] serde_json::Error),

    /// The component does not implement this operation.
    #[error("{0} is not implemented by this component")]
    NotImplemented(&'static str),

    /// The vendor API call failed.
    #[error("{0}")]
    Vendor(#[source] BoxError),
}

impl EventError {
    /// Wrap a vendor client error.
    pub fn vendor(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Vendor(Box::new(err))
    }

    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedEvent { .. } => "UNSUPPORTED_EVENT",
            Self::InvalidRepository(_) => "INVALID_REPOSITORY_FORMAT",
            Self::MissingHeader(_) => "MISSING_HEADER",
            Self::InvalidHookId(_) => "INVALID_HOOK_ID",
            Self::InvalidData(_) => "INVALID_EVENT_DATA",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            Self::Vendor(_) => "VENDOR_CALL_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_unsupported_task_messages() {
        let err = TaskError::UnsupportedTask {
            task: "TASK_FLY".to_string(),
        };
        assert_eq!(err.to_string(), "not supported task: TASK_FLY");
        assert_eq!(err.user_message(), "TASK_FLY task is not supported.");
        assert_eq!(err.error_code(), "UNSUPPORTED_TASK");
    }

    #[test]
    fn test_vendor_errors_keep_message_and_source() {
        use std::error::Error as _;

        let err = TaskError::vendor(Boom);
        assert_eq!(err.to_string(), "boom");
        assert!(err.source().is_some());

        let err = EventError::vendor(Boom);
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.error_code(), "VENDOR_CALL_FAILED");
    }

    #[test]
    fn test_unsupported_event_names_type_and_action() {
        let err = EventError::UnsupportedEvent {
            event: "issues".to_string(),
            action: "opened".to_string(),
        };
        assert_eq!(err.to_string(), "not supported event: issues.opened");
    }

    #[test]
    fn test_job_error_stages() {
        assert_eq!(JobError::Read(Box::new(Boom)).stage(), "read");
        assert_eq!(
            JobError::from(TaskError::InvalidInput("x".to_string())).stage(),
            "handler"
        );
        assert_eq!(JobError::Write(Box::new(Boom)).stage(), "write");
    }

    #[test]
    fn test_load_error_codes() {
        assert_eq!(
            LoadError::UnknownTask("TASK_X".to_string()).error_code(),
            "DEFINITION_UNKNOWN_TASK"
        );
        let schema = SchemaError::CyclicReference {
            reference: "#/a".to_string(),
        };
        assert_eq!(
            LoadError::from(schema).error_code(),
            "SCHEMA_CYCLIC_REFERENCE"
        );
    }
}
