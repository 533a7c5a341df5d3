//! Typed LLM queries.
//!
//! A query knows two things: how to render itself into a prompt, and how to
//! turn the model's free-text reply back into typed data. Models tend to wrap
//! their JSON in prose, so parsing first carves out the brace-delimited span
//! and decodes only that. [`QueryService`] runs any query against any
//! [`LlmTransport`]: exactly one call, no retries.

pub mod decision;
pub mod format;

use crate::clients::slack::ThreadMessage;
use async_trait::async_trait;
use std::sync::Arc;

// ── Errors ───────────────────────────────────────────────────────────────────

/// Failure modes of turning a raw model reply into typed data.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// No `{...}` span in the reply, or the span is not decodable JSON.
    #[error("response carries no parsable JSON payload: {0}")]
    Parse(String),
    /// The span decoded, but required fields are missing, empty, or mistyped.
    #[error("response payload failed validation: {0}")]
    Format(String),
}

/// Error surface of [`QueryService::run`].
#[derive(Debug, thiserror::Error)]
pub enum LlmServiceError {
    #[error("LLM transport failed")]
    Transport(#[source] anyhow::Error),
    #[error("LLM response could not be interpreted")]
    Parse(#[source] QueryError),
}

// ── Traits ───────────────────────────────────────────────────────────────────

/// A prompt/parser pair for one kind of model call.
///
/// Both methods are pure: `build_prompt` is deterministic over the query's
/// held input, and `parse_response` reports every failure as a typed
/// [`QueryError`] instead of guessing a default.
pub trait LlmQuery {
    type Output;

    fn build_prompt(&self) -> String;
    fn parse_response(&self, raw: &str) -> Result<Self::Output, QueryError>;
}

/// Transport that delivers a prompt to the model and returns its raw text.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    async fn post(&self, prompt: &str) -> anyhow::Result<String>;
}

#[async_trait]
impl<T: LlmTransport + ?Sized> LlmTransport for Arc<T> {
    async fn post(&self, prompt: &str) -> anyhow::Result<String> {
        (**self).post(prompt).await
    }
}

// ── Service ──────────────────────────────────────────────────────────────────

/// Generic executor: one transport round-trip, then the query's own parser.
pub struct QueryService<C> {
    client: C,
}

impl<C: LlmTransport> QueryService<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub async fn run<Q: LlmQuery>(&self, query: &Q) -> Result<Q::Output, LlmServiceError> {
        let prompt = query.build_prompt();
        let raw = self
            .client
            .post(&prompt)
            .await
            .map_err(LlmServiceError::Transport)?;
        query.parse_response(&raw).map_err(LlmServiceError::Parse)
    }
}

// ── Shared helpers ───────────────────────────────────────────────────────────

/// Carve the span from the first `{` to the last `}` out of a free-text
/// reply. Returns `None` when no such span exists.
fn extract_json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Extract and decode the embedded JSON span. Absence of a span and
/// undecodable spans are both [`QueryError::Parse`].
fn decode_json_span(raw: &str) -> Result<serde_json::Value, QueryError> {
    let span = extract_json_span(raw)
        .ok_or_else(|| QueryError::Parse("no '{...}' span in response".into()))?;
    serde_json::from_str(span).map_err(|e| QueryError::Parse(e.to_string()))
}

/// Render thread messages as `"<author>: <text>"` blocks separated by blank
/// lines, in their original order.
fn render_conversation(messages: &[ThreadMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.user, m.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The six fields a bug report needs, as rendered into both prompts.
const REQUIRED_FIELDS_BLOCK: &str = "\
1. Title (a concise summary of the problem)
2. Detailed description (what the problem is)
3. Reproduction steps (how to trigger the problem)
4. Expected behavior (what should happen)
5. Actual behavior (what happens instead)
6. Environment (OS, browser, versions, and so on)";

// ── Tests ─────────────────────────────────────────────────────────────────────
