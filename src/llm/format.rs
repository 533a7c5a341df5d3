//! Issue synthesis: turn a judged-sufficient thread into a title and a
//! Markdown body ready to file.

use super::{decode_json_span, render_conversation, LlmQuery, QueryError, REQUIRED_FIELDS_BLOCK};
use crate::clients::slack::ThreadMessage;
use serde::Deserialize;

/// Issue content as synthesized by the model, fields verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedIssue {
    pub title: String,
    pub body: String,
}

pub struct FormatIssueQuery {
    messages: Vec<ThreadMessage>,
}

impl FormatIssueQuery {
    pub fn new(messages: Vec<ThreadMessage>) -> Self {
        Self { messages }
    }
}

#[derive(Debug, Deserialize)]
struct IssuePayload {
    title: String,
    body: String,
}

impl LlmQuery for FormatIssueQuery {
    type Output = FormattedIssue;

    fn build_prompt(&self) -> String {
        format!(
            "Analyze the following Slack thread and format it as a GitHub \
             issue.\n\
             \n\
             Conversation:\n\
             {conversation}\n\
             \n\
             The issue must cover:\n\
             {REQUIRED_FIELDS_BLOCK}\n\
             \n\
             Where the conversation carries no information for a field, write \
             \"no information\" under that field instead of inventing \
             content.\n\
             \n\
             Respond in JSON with exactly this shape:\n\
             {{\n  \
               \"title\": \"issue title\",\n  \
               \"body\": \"issue body in Markdown\"\n\
             }}\n",
            conversation = render_conversation(&self.messages),
        )
    }

    fn parse_response(&self, raw: &str) -> Result<FormattedIssue, QueryError> {
        let value = decode_json_span(raw)?;
        let payload: IssuePayload =
            serde_json::from_value(value).map_err(|e| QueryError::Format(e.to_string()))?;
        if payload.title.trim().is_empty() {
            return Err(QueryError::Format("'title' must not be empty".into()));
        }
        if payload.body.trim().is_empty() {
            return Err(QueryError::Format("'body' must not be empty".into()));
        }
        Ok(FormattedIssue {
            title: payload.title,
            body: payload.body,
        })
    }
}
