// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Task handlers.

use chrono::{DateTime, Utc};
use pipewright_component::{TaskBinding, TaskError, TaskFuture};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{
    Commit, CommitFile, GithubClient, HookConfig, Issue, ListQuery, NewHook, NewIssue,
    NewReviewComment, PullRequest, ReviewComment, ReviewCommentQuery, User,
};
use crate::split_repository;

pub const TASK_LIST_PULL_REQUESTS: &str = "TASK_LIST_PULL_REQUESTS";
pub const TASK_GET_PULL_REQUEST: &str = "TASK_GET_PULL_REQUEST";
pub const TASK_LIST_REVIEW_COMMENTS: &str = "TASK_LIST_REVIEW_COMMENTS";
pub const TASK_CREATE_REVIEW_COMMENT: &str = "TASK_CREATE_REVIEW_COMMENT";
pub const TASK_GET_COMMIT: &str = "TASK_GET_COMMIT";
pub const TASK_LIST_ISSUES: &str = "TASK_LIST_ISSUES";
pub const TASK_GET_ISSUE: &str = "TASK_GET_ISSUE";
pub const TASK_CREATE_ISSUE: &str = "TASK_CREATE_ISSUE";
pub const TASK_CREATE_WEBHOOK: &str = "TASK_CREATE_WEBHOOK";

/// Task table of the connector.
pub static TASKS: &[TaskBinding<GithubClient>] = &[
    TaskBinding {
        task: TASK_LIST_PULL_REQUESTS,
        handler: list_pull_requests,
    },
    TaskBinding {
        task: TASK_GET_PULL_REQUEST,
        handler: get_pull_request,
    },
    TaskBinding {
        task: TASK_LIST_REVIEW_COMMENTS,
        handler: list_review_comments,
    },
    TaskBinding {
        task: TASK_CREATE_REVIEW_COMMENT,
        handler: create_review_comment,
    },
    TaskBinding {
        task: TASK_GET_COMMIT,
        handler: get_commit,
    },
    TaskBinding {
        task: TASK_LIST_ISSUES,
        handler: list_issues,
    },
    TaskBinding {
        task: TASK_GET_ISSUE,
        handler: get_issue,
    },
    TaskBinding {
        task: TASK_CREATE_ISSUE,
        handler: create_issue,
    },
    TaskBinding {
        task: TASK_CREATE_WEBHOOK,
        handler: create_webhook,
    },
];

// ============================================================================
// Inputs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ListInput {
    repository: String,
    state: Option<String>,
    sort: Option<String>,
    direction: Option<String>,
    since: Option<DateTime<Utc>>,
    per_page: Option<u32>,
    page: Option<u32>,
    #[serde(default)]
    no_pull_request: bool,
}

impl ListInput {
    fn query(&self) -> ListQuery {
        ListQuery {
            state: self.state.clone(),
            sort: self.sort.clone(),
            direction: self.direction.clone(),
            since: self.since,
            per_page: self.per_page,
            page: self.page,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct GetPullRequestInput {
    repository: String,
    pr_number: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ListReviewCommentsInput {
    repository: String,
    pr_number: u64,
    sort: Option<String>,
    direction: Option<String>,
    since: Option<DateTime<Utc>>,
    per_page: Option<u32>,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CreateReviewCommentInput {
    repository: String,
    pr_number: u64,
    comment: ReviewCommentInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReviewCommentInput {
    body: String,
    commit_id: String,
    path: String,
    line: Option<u64>,
    side: Option<String>,
    start_line: Option<u64>,
    start_side: Option<String>,
    subject_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct GetCommitInput {
    repository: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct GetIssueInput {
    repository: String,
    issue_number: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CreateIssueInput {
    repository: String,
    title: String,
    body: Option<String>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    assignees: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CreateWebhookInput {
    repository: String,
    hook_url: String,
    hook_secret: Option<String>,
    events: Vec<String>,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default = "default_content_type")]
    content_type: String,
}

fn default_active() -> bool {
    true
}

fn default_content_type() -> String {
    "json".to_string()
}

// ============================================================================
// Outputs
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct UserOutput {
    login: String,
    id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct PullRequestOutput {
    number: u64,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    state: String,
    draft: bool,
    html_url: String,
    diff_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<UserOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

fn user_output(user: User) -> UserOutput {
    UserOutput {
        login: user.login,
        id: user.id,
    }
}

impl From<PullRequest> for PullRequestOutput {
    fn from(pr: PullRequest) -> Self {
        Self {
            number: pr.number,
            title: pr.title,
            body: pr.body,
            state: pr.state,
            draft: pr.draft,
            html_url: pr.html_url,
            diff_url: pr.diff_url,
            user: pr.user.map(user_output),
            created_at: pr.created_at,
            updated_at: pr.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct IssueOutput {
    number: u64,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    state: String,
    html_url: String,
    labels: Vec<String>,
    assignees: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<UserOutput>,
    is_pull_request: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl From<Issue> for IssueOutput {
    fn from(issue: Issue) -> Self {
        Self {
            number: issue.number,
            title: issue.title,
            body: issue.body,
            state: issue.state,
            html_url: issue.html_url,
            labels: issue.labels.into_iter().map(|l| l.name).collect(),
            assignees: issue.assignees.into_iter().map(|u| u.login).collect(),
            user: issue.user.map(user_output),
            is_pull_request: issue.pull_request.is_some(),
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ReviewCommentOutput {
    id: i64,
    body: String,
    path: String,
    commit_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    diff_hunk: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    side: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    in_reply_to_id: Option<i64>,
    html_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<UserOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl From<ReviewComment> for ReviewCommentOutput {
    fn from(comment: ReviewComment) -> Self {
        Self {
            id: comment.id,
            body: comment.body,
            path: comment.path,
            commit_id: comment.commit_id,
            diff_hunk: comment.diff_hunk,
            line: comment.line,
            side: comment.side,
            start_line: comment.start_line,
            in_reply_to_id: comment.in_reply_to_id,
            html_url: comment.html_url,
            user: comment.user.map(user_output),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct CommitOutput {
    sha: String,
    message: String,
    html_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<DateTime<Utc>>,
    stats: CommitStatsOutput,
    files: Vec<CommitFileOutput>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
struct CommitStatsOutput {
    additions: u64,
    deletions: u64,
    changes: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct CommitFileOutput {
    filename: String,
    status: String,
    additions: u64,
    deletions: u64,
    changes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    patch: Option<String>,
}

impl From<CommitFile> for CommitFileOutput {
    fn from(file: CommitFile) -> Self {
        Self {
            filename: file.filename,
            status: file.status,
            additions: file.additions,
            deletions: file.deletions,
            changes: file.changes,
            patch: file.patch,
        }
    }
}

impl From<Commit> for CommitOutput {
    fn from(commit: Commit) -> Self {
        let author = commit.commit.author.unwrap_or_default();
        let stats = commit
            .stats
            .map(|stats| CommitStatsOutput {
                additions: stats.additions,
                deletions: stats.deletions,
                changes: stats.total,
            })
            .unwrap_or_default();
        Self {
            sha: commit.sha,
            message: commit.commit.message,
            html_url: commit.html_url,
            author: Some(author.name).filter(|name| !name.is_empty()),
            author_email: Some(author.email).filter(|email| !email.is_empty()),
            date: author.date,
            stats,
            files: commit.files.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct WebhookOutput {
    hook_id: i64,
    url: String,
    events: Vec<String>,
    active: bool,
}

// ============================================================================
// Handlers
// ============================================================================

fn repository(repository: &str) -> Result<(&str, &str), TaskError> {
    split_repository(repository)
        .ok_or_else(|| TaskError::InvalidInput(format!("invalid repository format: {repository}")))
}

fn list_pull_requests<'a>(client: &'a GithubClient, input: Value) -> TaskFuture<'a> {
    Box::pin(async move {
        let input: ListInput = serde_json::from_value(input)?;
        let (owner, repo) = repository(&input.repository)?;
        let pulls = client
            .list_pull_requests(owner, repo, &input.query())
            .await
            .map_err(TaskError::vendor)?;
        let pulls: Vec<PullRequestOutput> = pulls.into_iter().map(Into::into).collect();
        Ok(serde_json::json!({ "pull-requests": pulls }))
    })
}

fn get_pull_request<'a>(client: &'a GithubClient, input: Value) -> TaskFuture<'a> {
    Box::pin(async move {
        let input: GetPullRequestInput = serde_json::from_value(input)?;
        let (owner, repo) = repository(&input.repository)?;
        let pr = client
            .get_pull_request(owner, repo, input.pr_number)
            .await
            .map_err(TaskError::vendor)?;
        Ok(serde_json::to_value(PullRequestOutput::from(pr))?)
    })
}

fn list_review_comments<'a>(client: &'a GithubClient, input: Value) -> TaskFuture<'a> {
    Box::pin(async move {
        let input: ListReviewCommentsInput = serde_json::from_value(input)?;
        let (owner, repo) = repository(&input.repository)?;
        let query = ReviewCommentQuery {
            sort: input.sort,
            direction: input.direction,
            since: input.since,
            per_page: input.per_page,
            page: input.page,
        };
        let comments = client
            .list_review_comments(owner, repo, input.pr_number, &query)
            .await
            .map_err(TaskError::vendor)?;
        let comments: Vec<ReviewCommentOutput> = comments.into_iter().map(Into::into).collect();
        Ok(serde_json::json!({ "comments": comments }))
    })
}

fn create_review_comment<'a>(client: &'a GithubClient, input: Value) -> TaskFuture<'a> {
    Box::pin(async move {
        let input: CreateReviewCommentInput = serde_json::from_value(input)?;
        let (owner, repo) = repository(&input.repository)?;
        let comment = input.comment;
        if comment.line.is_none() && comment.subject_type.as_deref() != Some("file") {
            return Err(TaskError::InvalidInput(
                "line is required unless subject-type is file".to_string(),
            ));
        }
        if let (Some(start), Some(line)) = (comment.start_line, comment.line)
            && start >= line
        {
            return Err(TaskError::InvalidInput(
                "start-line must be before line".to_string(),
            ));
        }
        let comment = NewReviewComment {
            body: comment.body,
            commit_id: comment.commit_id,
            path: comment.path,
            line: comment.line,
            side: comment.side,
            start_line: comment.start_line,
            start_side: comment.start_side,
            subject_type: comment.subject_type,
        };
        let created = client
            .create_review_comment(owner, repo, input.pr_number, &comment)
            .await
            .map_err(TaskError::vendor)?;
        Ok(serde_json::to_value(ReviewCommentOutput::from(created))?)
    })
}

fn get_commit<'a>(client: &'a GithubClient, input: Value) -> TaskFuture<'a> {
    Box::pin(async move {
        let input: GetCommitInput = serde_json::from_value(input)?;
        let (owner, repo) = repository(&input.repository)?;
        let commit = client
            .get_commit(owner, repo, &input.sha)
            .await
            .map_err(TaskError::vendor)?;
        Ok(serde_json::to_value(CommitOutput::from(commit))?)
    })
}

fn list_issues<'a>(client: &'a GithubClient, input: Value) -> TaskFuture<'a> {
    Box::pin(async move {
        let input: ListInput = serde_json::from_value(input)?;
        let (owner, repo) = repository(&input.repository)?;
        let issues = client
            .list_issues(owner, repo, &input.query())
            .await
            .map_err(TaskError::vendor)?;
        let issues: Vec<IssueOutput> = issues
            .into_iter()
            .filter(|issue| !(input.no_pull_request && issue.pull_request.is_some()))
            .map(Into::into)
            .collect();
        Ok(serde_json::json!({ "issues": issues }))
    })
}

fn get_issue<'a>(client: &'a GithubClient, input: Value) -> TaskFuture<'a> {
    Box::pin(async move {
        let input: GetIssueInput = serde_json::from_value(input)?;
        let (owner, repo) = repository(&input.repository)?;
        let issue = client
            .get_issue(owner, repo, input.issue_number)
            .await
            .map_err(TaskError::vendor)?;
        Ok(serde_json::to_value(IssueOutput::from(issue))?)
    })
}

fn create_issue<'a>(client: &'a GithubClient, input: Value) -> TaskFuture<'a> {
    Box::pin(async move {
        let input: CreateIssueInput = serde_json::from_value(input)?;
        let (owner, repo) = repository(&input.repository)?;
        let issue = NewIssue {
            title: input.title,
            body: input.body,
            labels: input.labels,
            assignees: input.assignees,
        };
        let created = client
            .create_issue(owner, repo, &issue)
            .await
            .map_err(TaskError::vendor)?;
        Ok(serde_json::to_value(IssueOutput::from(created))?)
    })
}

fn create_webhook<'a>(client: &'a GithubClient, input: Value) -> TaskFuture<'a> {
    Box::pin(async move {
        let input: CreateWebhookInput = serde_json::from_value(input)?;
        let (owner, repo) = repository(&input.repository)?;
        if input.events.is_empty() {
            return Err(TaskError::InvalidInput(
                "at least one event is required".to_string(),
            ));
        }
        let insecure_ssl = if input.hook_url.starts_with("https://") { "0" } else { "1" };
        let hook = NewHook::web(
            HookConfig {
                url: Some(input.hook_url.clone()),
                content_type: Some(input.content_type),
                insecure_ssl: Some(insecure_ssl.to_string()),
                secret: input.hook_secret,
            },
            input.events,
            input.active,
        );
        let created = client
            .create_hook(owner, repo, &hook)
            .await
            .map_err(TaskError::vendor)?;
        Ok(serde_json::to_value(WebhookOutput {
            hook_id: created.id,
            url: created.config.url.unwrap_or(input.hook_url),
            events: created.events,
            active: created.active,
        })?)
    })
}
