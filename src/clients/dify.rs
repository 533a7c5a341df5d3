//! Dify chat-completion transport.
//!
//! Implements [`LlmTransport`] over `POST /chat-messages` in blocking mode:
//! one request per prompt, returning the raw `answer` text for the query
//! layer to parse.

use crate::llm::LlmTransport;
use anyhow::{bail, Context};
use async_trait::async_trait;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.dify.ai/v1";

pub struct DifyClient {
    api_key: String,
    application_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl DifyClient {
    pub fn new(api_key: String, application_id: String) -> Self {
        Self::with_base_url(api_key, application_id, DEFAULT_BASE_URL.to_string())
    }

    /// Point the client at a non-default API root (tests, self-hosted Dify).
    pub fn with_base_url(api_key: String, application_id: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            // Blocking chat completions can take a while.
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();
        Self {
            api_key,
            application_id,
            base_url,
            client,
        }
    }
}

#[async_trait]
impl LlmTransport for DifyClient {
    async fn post(&self, prompt: &str) -> anyhow::Result<String> {
        if prompt.is_empty() {
            bail!("prompt must not be empty");
        }

        let body = serde_json::json!({
            "app_id": self.application_id,
            "inputs": {},
            "query": prompt,
            "response_mode": "blocking",
            "user": "bugclerk",
        });

        let resp = self
            .client
            .post(format!("{}/chat-messages", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Dify API request failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("Dify API returned HTTP {status}");
        }

        let payload: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse Dify API response")?;

        payload
            .get("answer")
            .and_then(|a| a.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Dify response missing 'answer' field"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_prompt_rejected_before_any_call() {
        let client = DifyClient::with_base_url(
            "key".into(),
            "app".into(),
            "http://127.0.0.1:1".into(),
        );
        let err = client.post("").await.unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    // ── HTTP-level tests (wiremock) ───────────────────────────────
    mod http {
        use super::*;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn make_client(base_url: String) -> DifyClient {
            DifyClient::with_base_url("key".into(), "app-1".into(), base_url)
        }

        #[tokio::test]
        async fn post_returns_the_answer_text() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat-messages"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "answer": "{\"isSufficient\": true, \"missingFields\": []}",
                    "conversation_id": "c-1"
                })))
                .mount(&server)
                .await;

            let answer = make_client(server.uri()).post("judge this").await.unwrap();
            assert!(answer.contains("isSufficient"));
        }

        #[tokio::test]
        async fn post_sends_blocking_mode_and_prompt() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat-messages"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({ "answer": "ok" })),
                )
                .mount(&server)
                .await;

            make_client(server.uri()).post("judge this").await.unwrap();

            let reqs = server
                .received_requests()
                .await
                .expect("wiremock must track requests");
            let body: serde_json::Value =
                serde_json::from_slice(&reqs[0].body).expect("request body must be valid JSON");
            assert_eq!(body["query"], "judge this");
            assert_eq!(body["response_mode"], "blocking");
            assert_eq!(body["app_id"], "app-1");
        }

        #[tokio::test]
        async fn missing_answer_field_is_an_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat-messages"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({ "conversation_id": "c-1" })),
                )
                .mount(&server)
                .await;

            let err = make_client(server.uri()).post("judge this").await.unwrap_err();
            assert!(err.to_string().contains("missing 'answer'"));
        }

        #[tokio::test]
        async fn non_success_status_is_an_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat-messages"))
                .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
                .mount(&server)
                .await;

            let err = make_client(server.uri()).post("judge this").await.unwrap_err();
            assert!(err.to_string().contains("429"));
        }
    }
}
