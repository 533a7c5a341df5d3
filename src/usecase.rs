//! End-to-end handling of a thread mention: fetch the thread, judge it,
//! then either request more detail or file a GitHub issue and confirm
//! in-thread.
//!
//! Each call is one independent run. Steps execute strictly in order and the
//! first failure aborts the rest; nothing is retried or rolled back. When the
//! confirmation reply fails after the issue was filed, the issue stays filed
//! and the returned error says which step broke.

use crate::clients::github::{GitHubError, IssueFiler, IssueRecord, NewIssue};
use crate::clients::slack::{OutboundMessage, SlackApi, SlackError};
use crate::llm::decision::SufficiencyQuery;
use crate::llm::format::FormatIssueQuery;
use crate::llm::{LlmServiceError, LlmTransport, QueryService};
use crate::messages;

/// Tagged failure of one [`HandleSlackMessage::execute`] run.
#[derive(Debug, thiserror::Error)]
pub enum HandleMessageError {
    #[error("Slack: {message}")]
    Slack {
        message: String,
        #[source]
        source: Option<SlackError>,
    },
    #[error("LLM: {message}")]
    Llm {
        message: String,
        #[source]
        source: LlmServiceError,
    },
    #[error("GitHub: {message}")]
    GitHub {
        message: String,
        #[source]
        source: GitHubError,
    },
}

/// The per-mention pipeline over its three collaborators.
///
/// Holds no per-invocation state: one instance serves any number of
/// concurrent [`execute`](Self::execute) calls.
pub struct HandleSlackMessage<S, G, L> {
    slack: S,
    github: G,
    llm: QueryService<L>,
}

impl<S: SlackApi, G: IssueFiler, L: LlmTransport> HandleSlackMessage<S, G, L> {
    pub fn new(slack: S, github: G, llm: QueryService<L>) -> Self {
        Self { slack, github, llm }
    }

    /// Run the full pipeline for one mentioned thread.
    ///
    /// `Ok(Some(record))` means an issue was filed and confirmed in-thread.
    /// `Ok(None)` means the thread was judged insufficient and a request for
    /// more detail was posted instead.
    pub async fn execute(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Option<IssueRecord>, HandleMessageError> {
        let thread = self
            .slack
            .get_thread_replies(channel, thread_ts)
            .await
            .map_err(|e| HandleMessageError::Slack {
                message: "failed to fetch the thread".into(),
                source: Some(e),
            })?;

        if thread.is_empty() {
            return Err(HandleMessageError::Slack {
                message: "thread carries no messages".into(),
                source: None,
            });
        }

        let decision = self
            .llm
            .run(&SufficiencyQuery::new(thread.clone()))
            .await
            .map_err(|e| HandleMessageError::Llm {
                message: "sufficiency judgment failed".into(),
                source: e,
            })?;

        if !decision.is_sufficient {
            tracing::info!(
                channel,
                thread_ts,
                missing = decision.missing_fields.len(),
                "thread judged insufficient; requesting more detail"
            );
            let text = messages::request_for_more_info(&decision.missing_fields);
            self.reply(channel, thread_ts, text, "failed to post the request for more detail")
                .await?;
            return Ok(None);
        }

        let issue = self
            .llm
            .run(&FormatIssueQuery::new(thread))
            .await
            .map_err(|e| HandleMessageError::Llm {
                message: "issue formatting failed".into(),
                source: e,
            })?;

        let record = self
            .github
            .post_issue(&NewIssue {
                title: issue.title,
                body: issue.body,
            })
            .await
            .map_err(|e| HandleMessageError::GitHub {
                message: "issue creation failed".into(),
                source: e,
            })?;

        tracing::info!(channel, thread_ts, number = record.number, url = %record.html_url, "issue filed");

        let text = messages::issue_posted(&record);
        self.reply(channel, thread_ts, text, "failed to post the issue confirmation")
            .await?;

        Ok(Some(record))
    }

    async fn reply(
        &self,
        channel: &str,
        thread_ts: &str,
        text: String,
        context: &str,
    ) -> Result<(), HandleMessageError> {
        self.slack
            .post_message(&OutboundMessage {
                channel: channel.to_string(),
                thread_ts: thread_ts.to_string(),
                text,
            })
            .await
            .map(|_| ())
            .map_err(|e| HandleMessageError::Slack {
                message: context.to_string(),
                source: Some(e),
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
