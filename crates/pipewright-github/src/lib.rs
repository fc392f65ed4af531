// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! GitHub connector.
//!
//! Tasks read pull requests, their review comments and commits, manage
//! issues and create webhooks.
//! The `EVENT_STAR_CREATED` event subscribes a pipeline to repository stars
//! through a repository webhook pointing back at this deployment.

pub mod client;
pub mod events;
pub mod tasks;

#[cfg(test)]
pub(crate) mod testing;

use pipewright_component::{
    ComponentDefinition, ComponentRegistration, DefinitionCell, DefinitionLoader, LoadError,
};

pub use client::{
    ClientError, ClientFactory, GithubApi, GithubClient, RestClient, RestClientFactory,
};
pub use events::{GithubComponent, HOOK_ID, WEBHOOK_PATH};

/// Definition id of the connector.
pub const COMPONENT_ID: &str = "github";

const DEFINITION_JSON: &str = include_str!("../config/definition.json");
const SETUP_JSON: &str = include_str!("../config/setup.json");
const TASKS_JSON: &str = include_str!("../config/tasks.json");
const EVENTS_JSON: &str = include_str!("../config/events.json");
const SCHEMA_JSON: &str = include_str!("../config/schema.json");

static DEFINITION: DefinitionCell = DefinitionCell::new();

/// The connector's definition, loaded on first use.
pub fn definition() -> Result<&'static ComponentDefinition, LoadError> {
    DEFINITION.get_or_load(|| {
        DefinitionLoader::new(DEFINITION_JSON, TASKS_JSON)
            .setup(SETUP_JSON)
            .events(EVENTS_JSON)
            .document("schema.json", SCHEMA_JSON)
            .load()
    })
}

static REGISTRATION: ComponentRegistration = ComponentRegistration {
    id: COMPONENT_ID,
    definition,
};

inventory::submit! {
    &REGISTRATION
}

/// Split `owner/repo` into its two non-empty parts.
pub fn split_repository(repository: &str) -> Option<(&str, &str)> {
    repository
        .split_once('/')
        .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
}
