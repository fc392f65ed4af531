// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Event lifecycle types and the [`EventHandler`] trait.
//!
//! Subscription lifecycle per vendor resource:
//!
//! ```text
//! unregistered -> registered(active) <-> registered(inactive) -> unregistered
//! ```
//!
//! Registration and unregistration perform vendor round-trips whose
//! deadline and cancellation belong to the caller: dropping the returned
//! future aborts the in-flight call and leaves the vendor-side hook state
//! indeterminate. Registration is safe to retry but not atomic; two
//! concurrent registrations for the same resource can both miss the
//! existing hook and both create one.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::Config;
use crate::error::EventError;

/// Opaque key-value record correlating deliveries with a registration.
///
/// Stored by the orchestrator between calls, so it must survive a JSON
/// round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(Map<String, Value>);

impl Identifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Identifier {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Transport headers with case-insensitive names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers(BTreeMap<String, Vec<String>>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value for `name`.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.0
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name.as_ref(), value);
        }
        headers
    }
}

/// An inbound webhook delivery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEvent {
    pub headers: Headers,
    pub message: Value,
}

/// A delivery parsed into the message the pipeline receives.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvent {
    pub parsed_message: Value,
    /// Body of the webhook response, empty when nothing is owed.
    pub response: Value,
}

/// Result of inspecting a delivery's headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentifierResult {
    /// The delivery is a connectivity check; no pipeline should run.
    pub skip_trigger: bool,
    pub identifiers: Vec<Identifier>,
    pub response: Value,
}

/// Event config and connection setup of a subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSettings {
    pub config: Value,
    pub setup: Value,
}

/// Settings of a registration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterEventSettings {
    pub config: Value,
    pub setup: Value,
    pub registration_uid: Uuid,
}

impl RegisterEventSettings {
    pub fn settings(&self) -> EventSettings {
        EventSettings {
            config: self.config.clone(),
            setup: self.setup.clone(),
        }
    }
}

/// Webhook-driven event lifecycle of a component.
///
/// Every operation defaults to [`EventError::NotImplemented`].
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Inspect headers only. `None` when the delivery carries nothing this
    /// component recognises.
    async fn identify_event(&self, raw: &RawEvent) -> Result<Option<IdentifierResult>, EventError> {
        let _ = raw;
        Err(EventError::NotImplemented("identify_event"))
    }

    async fn parse_event(&self, raw: &RawEvent) -> Result<ParsedEvent, EventError> {
        let _ = raw;
        Err(EventError::NotImplemented("parse_event"))
    }

    /// Ensure an active vendor subscription delivering to `public_host`.
    async fn register_event(
        &self,
        settings: &RegisterEventSettings,
        public_host: &str,
    ) -> Result<Vec<Identifier>, EventError> {
        let _ = (settings, public_host);
        Err(EventError::NotImplemented("register_event"))
    }

    /// [`register_event`](Self::register_event) delivering to the deployment's
    /// configured public host.
    async fn register_with_config(
        &self,
        settings: &RegisterEventSettings,
        config: &Config,
    ) -> Result<Vec<Identifier>, EventError> {
        self.register_event(settings, &config.public_host).await
    }

    /// Deactivate the subscriptions named by `identifiers`.
    async fn unregister_event(
        &self,
        settings: &EventSettings,
        identifiers: &[Identifier],
    ) -> Result<(), EventError> {
        let _ = (settings, identifiers);
        Err(EventError::NotImplemented("unregister_event"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_headers_are_case_insensitive() {
        let headers: Headers = [
            ("X-GitHub-Event", "star"),
            ("x-github-hook-id", "42"),
            ("Accept", "a"),
            ("accept", "b"),
        ]
        .into_iter()
        .collect();

        assert_eq!(headers.get("x-github-event"), Some("star"));
        assert_eq!(headers.get("X-GITHUB-HOOK-ID"), Some("42"));
        assert_eq!(headers.get_all("ACCEPT"), &["a", "b"]);
        assert!(headers.get("missing").is_none());
        assert!(headers.get_all("missing").is_empty());
    }

    #[test]
    fn test_identifier_round_trips_through_json() {
        let id = Identifier::new().with("hook-id", 42);
        let stored = serde_json::to_string(&id).unwrap();
        assert_eq!(stored, r#"{"hook-id":42}"#);
        let restored: Identifier = serde_json::from_str(&stored).unwrap();
        assert_eq!(restored, id);
        assert_eq!(restored.get("hook-id"), Some(&json!(42)));
    }

    struct Silent;

    #[async_trait]
    impl EventHandler for Silent {}

    #[tokio::test]
    async fn test_default_operations_are_not_implemented() {
        let err = Silent.parse_event(&RawEvent::default()).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_IMPLEMENTED");
        let err = Silent
            .unregister_event(&EventSettings::default(), &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "unregister_event is not implemented by this component");
    }
}
