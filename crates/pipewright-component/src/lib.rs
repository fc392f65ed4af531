// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Component framework for pipewright connectors.
//!
//! A connector embeds its definition documents, loads them once through
//! [`DefinitionLoader`] into a [`ComponentDefinition`], and exposes:
//! - task execution via a static [`TaskBinding`] table and [`Component`]
//! - the webhook event lifecycle via [`EventHandler`]
//!
//! The pipeline engine drives both through the types in this crate and
//! never sees vendor-specific detail.

pub mod config;
pub mod defaults;
pub mod definition;
pub mod error;
pub mod event;
pub mod execution;
pub mod job;
pub mod loader;
pub mod registry;

pub use config::{Config, ConfigError, OAuthCredentials};
pub use defaults::{DefaultsError, fill_defaults};
pub use definition::{
    ComponentDefinition, DataSpecification, DefinitionManifest, DefinitionSpec,
    EventSpecification, TaskCard, TaskSchema,
};
pub use error::{BoxError, EventError, JobError, LoadError, TaskError};
pub use event::{
    EventHandler, EventSettings, Headers, Identifier, IdentifierResult, ParsedEvent, RawEvent,
    RegisterEventSettings,
};
pub use execution::{Component, Execution, TaskBinding, TaskFuture, TaskHandler};
pub use job::{ErrorReporter, InputReader, Job, JobHandle, JobOutcome, MemoryJob, OutputWriter};
pub use loader::{COMPONENT_SPEC_DIALECT, DefinitionLoader, condition_schema, task_id_to_title};
pub use registry::{
    ComponentRegistration, DefinitionCell, find_component, load_all, registered_components,
};
pub use pipewright_schema as schema;
