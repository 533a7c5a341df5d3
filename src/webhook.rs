//! Inbound Slack events listener.
//!
//! Starts the axum HTTP server that owns `POST /slack/events`. Each request:
//! 1. Reads the raw body.
//! 2. Verifies the `X-Slack-Signature` HMAC-SHA256 header when a signing
//!    secret is configured.
//! 3. Answers `url_verification` challenges inline.
//! 4. Filters for `app_mention` events and hands the thread reference to the
//!    usecase, spawned off the request so Slack's ack deadline is met.

use crate::clients::dify::DifyClient;
use crate::clients::github::GitHubClient;
use crate::clients::slack::SlackClient;
use crate::config::Config;
use crate::llm::QueryService;
use crate::usecase::HandleSlackMessage;
use anyhow::{bail, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

/// Requests whose timestamp is further than this from now are rejected
/// (replay window).
const MAX_TIMESTAMP_SKEW_SECS: u64 = 60 * 5;

type Usecase = HandleSlackMessage<SlackClient, GitHubClient, DifyClient>;

// ── Shared state ──────────────────────────────────────────────────────────────

struct WebhookState {
    signing_secret: Option<String>,
    usecase: Arc<Usecase>,
}

// ── Signature verification ────────────────────────────────────────────────────

/// Verify Slack's `v0` request signature.
///
/// The signing base string is `v0:<timestamp>:<body>`; the signature header
/// carries `v0=<hex hmac-sha256>`. Returns `Ok(())` when the signature is
/// valid or no secret is configured. `now` is Unix time in seconds.
fn verify_slack_signature(
    body: &[u8],
    timestamp: Option<&str>,
    signature: Option<&str>,
    secret: Option<&str>,
    now: u64,
) -> Result<()> {
    let Some(secret) = secret else {
        return Ok(()); // no secret configured: accept all
    };

    let timestamp =
        timestamp.ok_or_else(|| anyhow::anyhow!("slack events: timestamp header missing"))?;
    let signature =
        signature.ok_or_else(|| anyhow::anyhow!("slack events: signature header missing"))?;

    let ts: u64 = timestamp
        .parse()
        .map_err(|_| anyhow::anyhow!("slack events: timestamp is not a number"))?;
    if now.abs_diff(ts) > MAX_TIMESTAMP_SKEW_SECS {
        bail!("slack events: request timestamp outside the replay window");
    }

    let expected = compute_signature(body, timestamp, secret);
    if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        bail!("slack events: signature mismatch");
    }
    Ok(())
}

fn compute_signature(body: &[u8], timestamp: &str, secret: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Current Unix timestamp in whole seconds.
fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ── Event extraction ──────────────────────────────────────────────────────────

/// A thread reference extracted from an `app_mention` event.
#[derive(Debug, PartialEq, Eq)]
struct MentionRef {
    channel: String,
    thread_ts: String,
}

/// Extract the mentioned thread from an `event_callback` payload.
///
/// Returns `None` for anything that should be ignored: non-mention events,
/// bot messages, message subtypes, or events missing channel/timestamp.
fn extract_mention(payload: &serde_json::Value) -> Option<MentionRef> {
    let event = payload.get("event")?;

    if event.get("type").and_then(|t| t.as_str()) != Some("app_mention") {
        return None;
    }
    // Skip message subtypes and other bots (including our own replies).
    if event.get("subtype").is_some() || event.get("bot_id").is_some() {
        return None;
    }

    let channel = event.get("channel").and_then(|c| c.as_str()).unwrap_or("");
    let ts = event.get("ts").and_then(|t| t.as_str()).unwrap_or("");
    if channel.is_empty() || ts.is_empty() {
        return None;
    }

    // Replies carry `thread_ts` (the thread root); top-level mentions only `ts`.
    let thread_ts = event
        .get("thread_ts")
        .and_then(|t| t.as_str())
        .unwrap_or(ts);

    Some(MentionRef {
        channel: channel.to_string(),
        thread_ts: thread_ts.to_string(),
    })
}

// ── Route handler ─────────────────────────────────────────────────────────────

/// POST /slack/events, the Slack Events API endpoint.
async fn handle_events(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let timestamp = headers
        .get("x-slack-request-timestamp")
        .and_then(|v| v.to_str().ok());
    let signature = headers
        .get("x-slack-signature")
        .and_then(|v| v.to_str().ok());

    if let Err(e) = verify_slack_signature(
        &body,
        timestamp,
        signature,
        state.signing_secret.as_deref(),
        unix_timestamp(),
    ) {
        tracing::warn!("{e}");
        return (StatusCode::UNAUTHORIZED, String::new());
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("slack events: invalid JSON in request body: {e}");
            return (StatusCode::BAD_REQUEST, String::new());
        }
    };

    match payload.get("type").and_then(|t| t.as_str()) {
        // Slack sends this once when the endpoint URL is registered.
        Some("url_verification") => match payload.get("challenge").and_then(|c| c.as_str()) {
            Some(challenge) => (StatusCode::OK, challenge.to_string()),
            None => {
                tracing::warn!("slack events: url_verification without a challenge");
                (StatusCode::BAD_REQUEST, String::new())
            }
        },
        Some("event_callback") => {
            dispatch_mention(&state, &payload);
            (StatusCode::OK, String::new())
        }
        other => {
            tracing::debug!(event_type = ?other, "slack events: ignoring payload");
            (StatusCode::OK, String::new())
        }
    }
}

/// Hand a mention to the usecase without holding up the HTTP response.
///
/// Slack retries deliveries that are not acked within 3 seconds, and a retry
/// would file a duplicate issue, so the pipeline runs in a spawned task and
/// its outcome goes to the log.
fn dispatch_mention(state: &Arc<WebhookState>, payload: &serde_json::Value) {
    let Some(mention) = extract_mention(payload) else {
        tracing::debug!("slack events: ignoring non-mention event");
        return;
    };

    let usecase = Arc::clone(&state.usecase);
    tokio::spawn(async move {
        match usecase.execute(&mention.channel, &mention.thread_ts).await {
            Ok(Some(record)) => {
                tracing::info!(
                    channel = %mention.channel,
                    thread_ts = %mention.thread_ts,
                    number = record.number,
                    url = %record.html_url,
                    "issue filed from thread"
                );
            }
            Ok(None) => {
                tracing::info!(
                    channel = %mention.channel,
                    thread_ts = %mention.thread_ts,
                    "requested more detail in thread"
                );
            }
            Err(e) => {
                tracing::error!(
                    channel = %mention.channel,
                    thread_ts = %mention.thread_ts,
                    error = ?e,
                    "handling mention failed"
                );
            }
        }
    });
}

// ── Server startup ────────────────────────────────────────────────────────────

/// Wire up the clients and start the events listener. Runs until the process
/// is stopped.
pub async fn run(config: &Config) -> Result<()> {
    let slack = SlackClient::new(config.slack_bot_token.clone());
    let github = GitHubClient::new(
        config.github_token.clone(),
        config.github_owner.clone(),
        config.github_repo.clone(),
    );
    let dify = match &config.dify_base_url {
        Some(base) => DifyClient::with_base_url(
            config.dify_api_key.clone(),
            config.dify_application_id.clone(),
            base.clone(),
        ),
        None => DifyClient::new(
            config.dify_api_key.clone(),
            config.dify_application_id.clone(),
        ),
    };
    let usecase = HandleSlackMessage::new(slack, github, QueryService::new(dify));

    if config.slack_signing_secret.is_none() {
        tracing::warn!("slack events: no signing secret configured; accepting unsigned requests");
    }

    let state = Arc::new(WebhookState {
        signing_secret: config.slack_signing_secret.clone(),
        usecase: Arc::new(usecase),
    });

    let app = Router::new()
        .route("/slack/events", post(handle_events))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("slack events: listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
