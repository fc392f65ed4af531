// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::fmt;
use std::time::Duration;

/// OAuth application credentials of a connector.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Deployment configuration shared by connectors.
#[derive(Debug, Clone)]
pub struct Config {
    /// Public base URL of this deployment, used to build webhook callbacks
    pub public_host: String,
    /// Base URL of the GitHub REST API
    pub github_api_url: String,
    /// Timeout applied to every vendor HTTP call
    pub http_timeout: Duration,
    /// GitHub OAuth application; OAuth setups are offered only when present
    pub github_oauth: Option<OAuthCredentials>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `PIPEWRIGHT_PUBLIC_HOST`: public base URL, e.g. `https://pipes.example.com`
    ///
    /// Optional (with defaults):
    /// - `PIPEWRIGHT_GITHUB_API_URL`: GitHub API base URL (default: https://api.github.com)
    /// - `PIPEWRIGHT_HTTP_TIMEOUT_MS`: vendor call timeout (default: 30000)
    /// - `PIPEWRIGHT_GITHUB_OAUTH_CLIENT_ID` and `PIPEWRIGHT_GITHUB_OAUTH_CLIENT_SECRET`:
    ///   GitHub OAuth application, both or neither (default: unset)
    pub fn from_env() -> Result<Self, ConfigError> {
        let public_host = std::env::var("PIPEWRIGHT_PUBLIC_HOST")
            .map_err(|_| ConfigError::Missing("PIPEWRIGHT_PUBLIC_HOST"))?;
        if !public_host.starts_with("http://") && !public_host.starts_with("https://") {
            return Err(ConfigError::Invalid(
                "PIPEWRIGHT_PUBLIC_HOST",
                "must start with http:// or https://",
            ));
        }

        let github_api_url = std::env::var("PIPEWRIGHT_GITHUB_API_URL")
            .unwrap_or_else(|_| "https://api.github.com".to_string());

        let http_timeout_ms: u64 = std::env::var("PIPEWRIGHT_HTTP_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse()
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or(ConfigError::Invalid(
                "PIPEWRIGHT_HTTP_TIMEOUT_MS",
                "must be a positive integer",
            ))?;

        let github_oauth = match (
            non_empty_var("PIPEWRIGHT_GITHUB_OAUTH_CLIENT_ID"),
            non_empty_var("PIPEWRIGHT_GITHUB_OAUTH_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => Some(OAuthCredentials {
                client_id,
                client_secret,
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Missing("PIPEWRIGHT_GITHUB_OAUTH_CLIENT_SECRET"));
            }
            (None, Some(_)) => {
                return Err(ConfigError::Missing("PIPEWRIGHT_GITHUB_OAUTH_CLIENT_ID"));
            }
        };

        Ok(Self {
            public_host: public_host.trim_end_matches('/').to_string(),
            github_api_url: github_api_url.trim_end_matches('/').to_string(),
            http_timeout: Duration::from_millis(http_timeout_ms),
            github_oauth,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
