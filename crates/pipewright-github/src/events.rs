// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Star webhook lifecycle and task execution entry point.

use std::sync::Arc;

use async_trait::async_trait;
use pipewright_component::{
    Component, ComponentDefinition, Config, EventError, EventHandler, EventSettings, Execution,
    Identifier, IdentifierResult, LoadError, ParsedEvent, RawEvent, RegisterEventSettings,
    TaskError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::client::{ClientFactory, GithubClient, HookConfig, NewHook, RestClientFactory};
use crate::{split_repository, tasks};

/// Path under the public host that receives GitHub deliveries.
pub const WEBHOOK_PATH: &str = "/v1beta/pipeline-webhooks/github";

/// Identifier key holding the GitHub hook id.
pub const HOOK_ID: &str = "hook-id";

pub const EVENT_STAR_CREATED: &str = "EVENT_STAR_CREATED";

const EVENT_HEADER: &str = "x-github-event";
const HOOK_ID_HEADER: &str = "x-github-hook-id";
const STAR_EVENT: &str = "star";

#[derive(Debug, Deserialize)]
struct StarEventConfig {
    repository: String,
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(default)]
    action: String,
}

/// A `star.created` delivery. Unknown keys are kept so the parsed message
/// serializes back to the delivered payload.
#[derive(Debug, Serialize, Deserialize)]
struct StarCreated {
    action: String,
    repository: StarRepository,
    sender: StarSender,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StarRepository {
    full_name: String,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StarSender {
    login: String,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// The GitHub component: task dispatch plus the event lifecycle.
pub struct GithubComponent {
    component: Component<GithubClient>,
    factory: Arc<dyn ClientFactory>,
}

impl GithubComponent {
    pub fn new(definition: &'static ComponentDefinition, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            component: Component::new(definition, tasks::TASKS),
            factory,
        }
    }

    /// Offer OAuth connections in addition to token setups.
    pub fn with_oauth(mut self) -> Self {
        self.component = self.component.with_oauth();
        self
    }

    /// Load the definition and talk to the API configured in `config`.
    ///
    /// OAuth is offered only when the deployment has GitHub OAuth
    /// application credentials.
    pub fn from_config(config: &Config) -> Result<Self, LoadError> {
        let component = Self::new(
            crate::definition()?,
            Arc::new(RestClientFactory::from_config(config)),
        );
        Ok(match config.github_oauth {
            Some(_) => component.with_oauth(),
            None => component,
        })
    }

    pub fn definition(&self) -> &'static ComponentDefinition {
        self.component.definition()
    }

    pub fn supports_oauth(&self) -> bool {
        self.component.supports_oauth()
    }

    /// Bind `task` to a client for the connection `setup`.
    pub fn create_execution(
        &self,
        task: &str,
        setup: &Value,
    ) -> Result<Execution<GithubClient>, TaskError> {
        self.component.binding(task)?;
        let client = self.factory.connect(setup).map_err(TaskError::vendor)?;
        self.component.create_execution(task, client)
    }

    fn target(&self, settings: &EventSettings) -> Result<(String, String, GithubClient), EventError> {
        let config: StarEventConfig = serde_json::from_value(settings.config.clone())?;
        let (owner, repo) = split_repository(&config.repository)
            .ok_or_else(|| EventError::InvalidRepository(config.repository.clone()))?;
        let client = self
            .factory
            .connect(&settings.setup)
            .map_err(EventError::vendor)?;
        Ok((owner.to_string(), repo.to_string(), client))
    }
}

/// Callback URL GitHub delivers to for `public_host`.
pub fn webhook_url(public_host: &str) -> String {
    format!("{}{WEBHOOK_PATH}", public_host.trim_end_matches('/'))
}

/// Hook id stored in an identifier. Identifiers may come back from JSON
/// storage as floats; only integral values in `i64` range are accepted.
fn hook_id(value: &Value) -> Result<i64, EventError> {
    value
        .as_i64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|id| id.fract() == 0.0 && *id >= i64::MIN as f64 && *id < i64::MAX as f64)
                .map(|id| id as i64)
        })
        .ok_or_else(|| EventError::InvalidHookId(value.to_string()))
}

#[async_trait]
impl EventHandler for GithubComponent {
    async fn identify_event(&self, raw: &RawEvent) -> Result<Option<IdentifierResult>, EventError> {
        if raw.headers.get(EVENT_HEADER) == Some("ping") {
            return Ok(Some(IdentifierResult {
                skip_trigger: true,
                identifiers: Vec::new(),
                response: json!({}),
            }));
        }

        let Some(header) = raw.headers.get(HOOK_ID_HEADER) else {
            return Ok(None);
        };
        let id: i64 = header
            .trim()
            .parse()
            .map_err(|_| EventError::InvalidHookId(header.to_string()))?;

        Ok(Some(IdentifierResult {
            skip_trigger: false,
            identifiers: vec![Identifier::new().with(HOOK_ID, id)],
            response: Value::Null,
        }))
    }

    async fn parse_event(&self, raw: &RawEvent) -> Result<ParsedEvent, EventError> {
        let event = raw
            .headers
            .get(EVENT_HEADER)
            .ok_or(EventError::MissingHeader(EVENT_HEADER))?;
        let envelope: EventEnvelope = serde_json::from_value(raw.message.clone())?;

        match (event, envelope.action.as_str()) {
            (STAR_EVENT, "created") => {
                let star: StarCreated = serde_json::from_value(raw.message.clone())?;
                debug!(
                    repository = %star.repository.full_name,
                    sender = %star.sender.login,
                    "Parsed star event"
                );
                Ok(ParsedEvent {
                    parsed_message: serde_json::to_value(&star)?,
                    response: json!({}),
                })
            }
            _ => Err(EventError::UnsupportedEvent {
                event: event.to_string(),
                action: envelope.action.clone(),
            }),
        }
    }

    async fn register_event(
        &self,
        settings: &RegisterEventSettings,
        public_host: &str,
    ) -> Result<Vec<Identifier>, EventError> {
        let (owner, repo, client) = self.target(&settings.settings())?;
        let url = webhook_url(public_host);

        let hooks = client
            .list_hooks(&owner, &repo)
            .await
            .map_err(EventError::vendor)?;
        let existing = hooks.iter().find(|hook| {
            hook.config.url.as_deref() == Some(url.as_str())
                && hook.events.first().map(String::as_str) == Some(STAR_EVENT)
        });

        let hook_id = match existing {
            Some(hook) => {
                client
                    .set_hook_active(&owner, &repo, hook.id, true)
                    .await
                    .map_err(EventError::vendor)?;
                info!(
                    repository = %format!("{owner}/{repo}"),
                    hook_id = hook.id,
                    registration = %settings.registration_uid,
                    "Reactivated existing webhook"
                );
                hook.id
            }
            None => {
                let insecure_ssl = if public_host.starts_with("https://") { "0" } else { "1" };
                let hook = NewHook::web(
                    HookConfig {
                        url: Some(url.clone()),
                        content_type: Some("json".to_string()),
                        insecure_ssl: Some(insecure_ssl.to_string()),
                        secret: None,
                    },
                    vec![STAR_EVENT.to_string()],
                    true,
                );
                let created = client
                    .create_hook(&owner, &repo, &hook)
                    .await
                    .map_err(EventError::vendor)?;
                info!(
                    repository = %format!("{owner}/{repo}"),
                    hook_id = created.id,
                    registration = %settings.registration_uid,
                    "Created webhook"
                );
                created.id
            }
        };

        Ok(vec![Identifier::new().with(HOOK_ID, hook_id)])
    }

    async fn unregister_event(
        &self,
        settings: &EventSettings,
        identifiers: &[Identifier],
    ) -> Result<(), EventError> {
        let (owner, repo, client) = self.target(settings)?;

        for identifier in identifiers {
            let Some(value) = identifier.get(HOOK_ID) else {
                debug!(identifier = ?identifier, "Identifier carries no hook id");
                continue;
            };
            let id = hook_id(value)?;
            client
                .set_hook_active(&owner, &repo, id, false)
                .await
                .map_err(EventError::vendor)?;
            info!(repository = %format!("{owner}/{repo}"), hook_id = id, "Deactivated webhook");
        }
        Ok(())
    }
}
