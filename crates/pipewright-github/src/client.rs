// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! GitHub REST client.
//!
//! [`GithubApi`] is the seam between the connector and GitHub: tasks and the
//! webhook lifecycle only talk to it, and tests substitute an in-memory
//! implementation. [`RestClient`] is the `reqwest`-backed implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pipewright_component::Config;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// GitHub REST API version sent with every request.
pub const API_VERSION: &str = "2022-11-28";

const USER_AGENT: &str = concat!("pipewright-github/", env!("CARGO_PKG_VERSION"));

/// Shared handle to a vendor client.
pub type GithubClient = Arc<dyn GithubApi>;

/// Errors raised by the GitHub client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The connection token cannot be sent as a header.
    #[error("token contains characters not allowed in an HTTP header")]
    InvalidToken,

    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// The request could not be sent or timed out.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// GitHub answered with a non-success status.
    #[error("GitHub returned {status} for {url}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ClientError {
    /// HTTP status returned by GitHub, if the call got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub diff_url: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub assignees: Vec<User>,
    #[serde(default)]
    pub user: Option<User>,
    /// Present when the issue is a pull request.
    #[serde(default)]
    pub pull_request: Option<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GitAuthor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<GitAuthor>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommitStats {
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommitFile {
    pub filename: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changes: u64,
    /// Absent for binary files and very large diffs.
    #[serde(default)]
    pub patch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Commit {
    pub sha: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub commit: CommitDetail,
    #[serde(default)]
    pub stats: Option<CommitStats>,
    #[serde(default)]
    pub files: Vec<CommitFile>,
}

/// A comment on a pull request diff.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewComment {
    pub id: i64,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub commit_id: String,
    #[serde(default)]
    pub diff_hunk: String,
    #[serde(default)]
    pub line: Option<u64>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub start_line: Option<u64>,
    #[serde(default)]
    pub in_reply_to_id: Option<i64>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Delivery settings of a repository webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure_ssl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// A repository webhook as GitHub reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    pub id: i64,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub config: HookConfig,
}

/// Body of a hook creation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewHook {
    /// Always `web` for repository webhooks.
    pub name: &'static str,
    pub config: HookConfig,
    pub events: Vec<String>,
    pub active: bool,
}

impl NewHook {
    pub fn web(config: HookConfig, events: Vec<String>, active: bool) -> Self {
        Self {
            name: "web",
            config,
            events,
            active,
        }
    }
}

/// Query of a pull request or issue listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Issues only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// Query of a review comment listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewCommentQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// Body of a review comment creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewReviewComment {
    pub body: String,
    pub commit_id: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_side: Option<String>,
    /// `line` or `file`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_type: Option<String>,
}

/// Body of an issue creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewIssue {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<String>,
}

// ============================================================================
// Client trait
// ============================================================================

/// Operations the connector needs from GitHub.
#[async_trait]
pub trait GithubApi: Send + Sync {
    async fn list_hooks(&self, owner: &str, repo: &str) -> Result<Vec<Hook>, ClientError>;

    async fn create_hook(&self, owner: &str, repo: &str, hook: &NewHook)
    -> Result<Hook, ClientError>;

    /// Activate or deactivate an existing hook.
    async fn set_hook_active(
        &self,
        owner: &str,
        repo: &str,
        hook_id: i64,
        active: bool,
    ) -> Result<Hook, ClientError>;

    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        query: &ListQuery,
    ) -> Result<Vec<PullRequest>, ClientError>;

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, ClientError>;

    async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        query: &ListQuery,
    ) -> Result<Vec<Issue>, ClientError>;

    async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue, ClientError>;

    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        issue: &NewIssue,
    ) -> Result<Issue, ClientError>;

    async fn get_commit(&self, owner: &str, repo: &str, sha: &str)
    -> Result<Commit, ClientError>;

    async fn list_review_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        query: &ReviewCommentQuery,
    ) -> Result<Vec<ReviewComment>, ClientError>;

    async fn create_review_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comment: &NewReviewComment,
    ) -> Result<ReviewComment, ClientError>;
}

/// Builds a client for a connection setup.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, setup: &Value) -> Result<GithubClient, ClientError>;
}

// ============================================================================
// REST implementation
// ============================================================================

/// `reqwest`-backed [`GithubApi`].
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    /// Create a client for `base_url` authenticating with `token`.
    ///
    /// An empty token sends unauthenticated requests.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static(API_VERSION),
        );
        if !token.is_empty() {
            let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ClientError::InvalidToken)?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn repo_url(&self, owner: &str, repo: &str, path: &str) -> String {
        format!("{}/repos/{owner}/{repo}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: String,
    ) -> Result<T, ClientError> {
        debug!(url = %url, "Calling GitHub");
        let response = match request.send().await {
            Ok(response) => response,
            Err(source) => return Err(ClientError::Request { url, source }),
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
                message,
            });
        }

        match response.json::<T>().await {
            Ok(body) => Ok(body),
            Err(source) => Err(ClientError::Decode { url, source }),
        }
    }
}

#[async_trait]
impl GithubApi for RestClient {
    async fn list_hooks(&self, owner: &str, repo: &str) -> Result<Vec<Hook>, ClientError> {
        let url = self.repo_url(owner, repo, "/hooks");
        self.send(self.http.get(&url), url).await
    }

    async fn create_hook(
        &self,
        owner: &str,
        repo: &str,
        hook: &NewHook,
    ) -> Result<Hook, ClientError> {
        let url = self.repo_url(owner, repo, "/hooks");
        self.send(self.http.post(&url).json(hook), url).await
    }

    async fn set_hook_active(
        &self,
        owner: &str,
        repo: &str,
        hook_id: i64,
        active: bool,
    ) -> Result<Hook, ClientError> {
        let url = self.repo_url(owner, repo, &format!("/hooks/{hook_id}"));
        let body = serde_json::json!({ "active": active });
        self.send(self.http.patch(&url).json(&body), url).await
    }

    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        query: &ListQuery,
    ) -> Result<Vec<PullRequest>, ClientError> {
        let url = self.repo_url(owner, repo, "/pulls");
        self.send(self.http.get(&url).query(query), url).await
    }

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, ClientError> {
        let url = self.repo_url(owner, repo, &format!("/pulls/{number}"));
        self.send(self.http.get(&url), url).await
    }

    async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        query: &ListQuery,
    ) -> Result<Vec<Issue>, ClientError> {
        let url = self.repo_url(owner, repo, "/issues");
        self.send(self.http.get(&url).query(query), url).await
    }

    async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue, ClientError> {
        let url = self.repo_url(owner, repo, &format!("/issues/{number}"));
        self.send(self.http.get(&url), url).await
    }

    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        issue: &NewIssue,
    ) -> Result<Issue, ClientError> {
        let url = self.repo_url(owner, repo, "/issues");
        self.send(self.http.post(&url).json(issue), url).await
    }

    async fn get_commit(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Commit, ClientError> {
        let url = self.repo_url(owner, repo, &format!("/commits/{sha}"));
        self.send(self.http.get(&url), url).await
    }

    async fn list_review_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        query: &ReviewCommentQuery,
    ) -> Result<Vec<ReviewComment>, ClientError> {
        let url = self.repo_url(owner, repo, &format!("/pulls/{number}/comments"));
        self.send(self.http.get(&url).query(query), url).await
    }

    async fn create_review_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comment: &NewReviewComment,
    ) -> Result<ReviewComment, ClientError> {
        let url = self.repo_url(owner, repo, &format!("/pulls/{number}/comments"));
        self.send(self.http.post(&url).json(comment), url).await
    }
}

/// Creates [`RestClient`]s from the setup's `token` field.
#[derive(Debug, Clone)]
pub struct RestClientFactory {
    base_url: String,
    timeout: Duration,
}

impl RestClientFactory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.github_api_url.clone(), config.http_timeout)
    }
}

impl ClientFactory for RestClientFactory {
    fn connect(&self, setup: &Value) -> Result<GithubClient, ClientError> {
        let token = setup.get("token").and_then(Value::as_str).unwrap_or_default();
        Ok(Arc::new(RestClient::new(&self.base_url, token, self.timeout)?))
    }
}
