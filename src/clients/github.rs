//! GitHub REST client for filing issues.
//!
//! One operation: `POST /repos/{owner}/{repo}/issues`. Title and body are
//! validated before any network I/O; the response is decoded into the
//! [`IssueRecord`] the confirmation reply needs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const ACCEPT_V3_JSON: &str = "application/vnd.github.v3+json";

// ── Wire types ───────────────────────────────────────────────────────────────

/// Issue content to file.
#[derive(Debug, Clone, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
}

/// The created issue, as GitHub reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueRecord {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub html_url: String,
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("GitHub API rejected the call: {0}")]
    Api(String),
    #[error("failed to reach the GitHub API")]
    Network(#[source] reqwest::Error),
    /// Caller-side validation failure, checked before any network I/O.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

// ── Trait ────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait IssueFiler: Send + Sync {
    async fn post_issue(&self, issue: &NewIssue) -> Result<IssueRecord, GitHubError>;
}

#[async_trait]
impl<T: IssueFiler + ?Sized> IssueFiler for Arc<T> {
    async fn post_issue(&self, issue: &NewIssue) -> Result<IssueRecord, GitHubError> {
        (**self).post_issue(issue).await
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

pub struct GitHubClient {
    token: String,
    owner: String,
    repo: String,
    base_url: String,
    client: reqwest::Client,
}

impl GitHubClient {
    pub fn new(token: String, owner: String, repo: String) -> Self {
        Self::with_base_url(token, owner, repo, DEFAULT_BASE_URL.to_string())
    }

    /// Point the client at a non-default API root (tests, GitHub Enterprise).
    pub fn with_base_url(token: String, owner: String, repo: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            token,
            owner,
            repo,
            base_url,
            client,
        }
    }
}

#[async_trait]
impl IssueFiler for GitHubClient {
    async fn post_issue(&self, issue: &NewIssue) -> Result<IssueRecord, GitHubError> {
        if issue.title.is_empty() || issue.body.is_empty() {
            return Err(GitHubError::InvalidInput(
                "issue title and body are required".into(),
            ));
        }

        let url = format!(
            "{}/repos/{}/{}/issues",
            self.base_url, self.owner, self.repo
        );
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT_V3_JSON)
            // GitHub rejects requests without a User-Agent.
            .header(reqwest::header::USER_AGENT, "bugclerk")
            .json(issue)
            .send()
            .await
            .map_err(GitHubError::Network)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GitHubError::Api(format!(
                "issue creation returned HTTP {status}"
            )));
        }

        resp.json::<IssueRecord>().await.map_err(GitHubError::Network)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
