// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory GitHub for unit tests.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::client::{
    ClientError, ClientFactory, Commit, CommitDetail, CommitFile, CommitStats, GitAuthor,
    GithubApi, GithubClient, Hook, Issue, Label, ListQuery, NewHook, NewIssue, NewReviewComment,
    PullRequest, ReviewComment, ReviewCommentQuery,
};

/// Records every call and keeps hooks and issues in memory.
#[derive(Default)]
pub(crate) struct MockGithub {
    hooks: Mutex<Vec<Hook>>,
    issues: Mutex<Vec<Value>>,
    review_comments: Mutex<Vec<(u64, ReviewComment)>>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicI64,
}

impl MockGithub {
    pub(crate) fn with_hooks(hooks: Vec<Hook>) -> Self {
        Self {
            hooks: Mutex::new(hooks),
            ..Default::default()
        }
    }

    pub(crate) fn push_issue(&self, issue: Value) {
        self.issues.lock().unwrap().push(issue);
    }

    pub(crate) fn hooks(&self) -> Vec<Hook> {
        self.hooks.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn not_found(what: String) -> ClientError {
    ClientError::Status {
        url: what,
        status: 404,
        message: "Not Found".to_string(),
    }
}

#[async_trait]
impl GithubApi for MockGithub {
    async fn list_hooks(&self, owner: &str, repo: &str) -> Result<Vec<Hook>, ClientError> {
        self.record(format!("list_hooks {owner}/{repo}"));
        Ok(self.hooks())
    }

    async fn create_hook(
        &self,
        owner: &str,
        repo: &str,
        hook: &NewHook,
    ) -> Result<Hook, ClientError> {
        self.record(format!("create_hook {owner}/{repo}"));
        let created = Hook {
            id: 100 + self.next_id.fetch_add(1, Ordering::SeqCst),
            events: hook.events.clone(),
            active: hook.active,
            config: hook.config.clone(),
        };
        self.hooks.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn set_hook_active(
        &self,
        owner: &str,
        repo: &str,
        hook_id: i64,
        active: bool,
    ) -> Result<Hook, ClientError> {
        self.record(format!("set_hook_active {owner}/{repo} {hook_id} {active}"));
        let mut hooks = self.hooks.lock().unwrap();
        let hook = hooks
            .iter_mut()
            .find(|hook| hook.id == hook_id)
            .ok_or_else(|| not_found(format!("hooks/{hook_id}")))?;
        hook.active = active;
        Ok(hook.clone())
    }

    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        _query: &ListQuery,
    ) -> Result<Vec<PullRequest>, ClientError> {
        self.record(format!("list_pull_requests {owner}/{repo}"));
        Ok(Vec::new())
    }

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, ClientError> {
        self.record(format!("get_pull_request {owner}/{repo}"));
        Err(not_found(format!("pulls/{number}")))
    }

    async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        _query: &ListQuery,
    ) -> Result<Vec<Issue>, ClientError> {
        self.record(format!("list_issues {owner}/{repo}"));
        let issues = self.issues.lock().unwrap().clone();
        Ok(issues
            .into_iter()
            .map(|issue| serde_json::from_value(issue).unwrap())
            .collect())
    }

    async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue, ClientError> {
        self.record(format!("get_issue {owner}/{repo}"));
        let issues = self.issues.lock().unwrap().clone();
        issues
            .into_iter()
            .map(|issue| serde_json::from_value::<Issue>(issue).unwrap())
            .find(|issue| issue.number == number)
            .ok_or_else(|| not_found(format!("issues/{number}")))
    }

    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        issue: &NewIssue,
    ) -> Result<Issue, ClientError> {
        self.record(format!("create_issue {owner}/{repo}"));
        let number = self.issues.lock().unwrap().len() as u64 + 1;
        Ok(Issue {
            number,
            title: issue.title.clone(),
            body: issue.body.clone(),
            state: "open".to_string(),
            html_url: format!("https://github.com/{owner}/{repo}/issues/{number}"),
            labels: issue
                .labels
                .iter()
                .map(|name| Label { name: name.clone() })
                .collect(),
            assignees: Vec::new(),
            user: None,
            pull_request: None,
            created_at: Some(Utc::now()),
            updated_at: None,
        })
    }

    async fn get_commit(&self, owner: &str, repo: &str, sha: &str) -> Result<Commit, ClientError> {
        self.record(format!("get_commit {owner}/{repo} {sha}"));
        Ok(commit(sha))
    }

    async fn list_review_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        _query: &ReviewCommentQuery,
    ) -> Result<Vec<ReviewComment>, ClientError> {
        self.record(format!("list_review_comments {owner}/{repo} {number}"));
        Ok(self
            .review_comments
            .lock()
            .unwrap()
            .iter()
            .filter(|(pr, _)| *pr == number)
            .map(|(_, comment)| comment.clone())
            .collect())
    }

    async fn create_review_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comment: &NewReviewComment,
    ) -> Result<ReviewComment, ClientError> {
        self.record(format!("create_review_comment {owner}/{repo} {number}"));
        let mut comments = self.review_comments.lock().unwrap();
        let id = comments.len() as i64 + 1;
        let created = ReviewComment {
            id,
            body: comment.body.clone(),
            path: comment.path.clone(),
            commit_id: comment.commit_id.clone(),
            diff_hunk: String::new(),
            line: comment.line,
            side: comment.side.clone(),
            start_line: comment.start_line,
            in_reply_to_id: None,
            html_url: format!("https://github.com/{owner}/{repo}/pull/{number}#discussion_r{id}"),
            user: None,
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        comments.push((number, created.clone()));
        Ok(created)
    }
}

fn commit(sha: &str) -> Commit {
    Commit {
        sha: sha.to_string(),
        html_url: format!("https://github.com/octocat/hello/commit/{sha}"),
        commit: CommitDetail {
            message: "Update README".to_string(),
            author: Some(GitAuthor {
                name: "Mona".to_string(),
                email: "mona@example.com".to_string(),
                date: Some(Utc::now()),
            }),
        },
        stats: Some(CommitStats {
            additions: 3,
            deletions: 1,
            total: 4,
        }),
        files: vec![CommitFile {
            filename: "README.md".to_string(),
            status: "modified".to_string(),
            additions: 3,
            deletions: 1,
            changes: 4,
            patch: None,
        }],
    }
}

/// Hands out the same mock for every setup and records the setups seen.
#[derive(Default)]
pub(crate) struct MockFactory {
    pub(crate) github: Arc<MockGithub>,
    pub(crate) setups: Mutex<Vec<Value>>,
}

impl MockFactory {
    pub(crate) fn new(github: MockGithub) -> Self {
        Self {
            github: Arc::new(github),
            setups: Mutex::new(Vec::new()),
        }
    }
}

impl ClientFactory for MockFactory {
    fn connect(&self, setup: &Value) -> Result<GithubClient, ClientError> {
        self.setups.lock().unwrap().push(setup.clone());
        Ok(self.github.clone())
    }
}
