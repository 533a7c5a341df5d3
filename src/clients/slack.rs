//! Slack Web API client.
//!
//! Implements [`SlackApi`], the seam the usecase depends on: reading a full
//! thread via `conversations.replies` and posting a threaded reply via
//! `chat.postMessage`. Slack wraps both in an `ok`/`error` envelope, so a
//! 200 response can still be a failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://slack.com/api";

// ── Wire types ───────────────────────────────────────────────────────────────

/// One message inside a Slack thread, in the order Slack returned it.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub ts: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user: String,
    /// Timestamp of the thread root this message belongs to.
    #[serde(default)]
    pub thread_ts: String,
}

/// A threaded reply to post.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    pub channel: String,
    pub thread_ts: String,
    pub text: String,
}

/// Acknowledgment returned by `chat.postMessage`.
#[derive(Debug, Clone)]
pub struct PostedMessage {
    pub ts: String,
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    /// Slack rejected the call: non-2xx status or an `ok: false` envelope.
    #[error("Slack API rejected the call: {0}")]
    Api(String),
    #[error("failed to reach the Slack API")]
    Network(#[source] reqwest::Error),
    /// Caller-side validation failure, checked before any network I/O.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

// ── Trait ────────────────────────────────────────────────────────────────────

/// The two Slack operations the pipeline needs.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Fetch every message in a thread, in Slack's own order.
    async fn get_thread_replies(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Vec<ThreadMessage>, SlackError>;

    /// Post a reply into a thread.
    async fn post_message(&self, message: &OutboundMessage) -> Result<PostedMessage, SlackError>;
}

#[async_trait]
impl<T: SlackApi + ?Sized> SlackApi for Arc<T> {
    async fn get_thread_replies(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Vec<ThreadMessage>, SlackError> {
        (**self).get_thread_replies(channel, thread_ts).await
    }

    async fn post_message(&self, message: &OutboundMessage) -> Result<PostedMessage, SlackError> {
        (**self).post_message(message).await
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

pub struct SlackClient {
    bot_token: String,
    base_url: String,
    client: reqwest::Client,
}

impl SlackClient {
    pub fn new(bot_token: String) -> Self {
        Self::with_base_url(bot_token, DEFAULT_BASE_URL.to_string())
    }

    /// Point the client at a non-default API root (tests, proxies).
    pub fn with_base_url(bot_token: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            bot_token,
            base_url,
            client,
        }
    }

    /// Turn an `ok: false` envelope into an API error carrying Slack's
    /// error code.
    fn check_envelope(payload: &serde_json::Value) -> Result<(), SlackError> {
        if payload.get("ok").and_then(|v| v.as_bool()).unwrap_or(false) {
            return Ok(());
        }
        let err = payload
            .get("error")
            .and_then(|e| e.as_str())
            .unwrap_or("unknown Slack API error");
        Err(SlackError::Api(err.to_string()))
    }
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn get_thread_replies(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Vec<ThreadMessage>, SlackError> {
        if channel.is_empty() || thread_ts.is_empty() {
            return Err(SlackError::InvalidInput(
                "channel and thread_ts are required".into(),
            ));
        }

        let resp = self
            .client
            .get(format!("{}/conversations.replies", self.base_url))
            .bearer_auth(&self.bot_token)
            .query(&[("channel", channel), ("ts", thread_ts)])
            .send()
            .await
            .map_err(SlackError::Network)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SlackError::Api(format!(
                "conversations.replies returned HTTP {status}"
            )));
        }

        let payload: serde_json::Value = resp.json().await.map_err(SlackError::Network)?;
        Self::check_envelope(&payload)?;

        // Entries that don't look like messages (no `ts`) are skipped.
        let messages = payload
            .get("messages")
            .and_then(|m| m.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| serde_json::from_value(m.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        Ok(messages)
    }

    async fn post_message(&self, message: &OutboundMessage) -> Result<PostedMessage, SlackError> {
        let resp = self
            .client
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(&self.bot_token)
            .json(message)
            .send()
            .await
            .map_err(SlackError::Network)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SlackError::Api(format!(
                "chat.postMessage returned HTTP {status}"
            )));
        }

        let payload: serde_json::Value = resp.json().await.map_err(SlackError::Network)?;
        Self::check_envelope(&payload)?;

        let ts = payload
            .get("ts")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(PostedMessage { ts })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
