//! Sufficiency judgment: does a thread carry enough to file a bug report?

use super::{decode_json_span, render_conversation, LlmQuery, QueryError, REQUIRED_FIELDS_BLOCK};
use crate::clients::slack::ThreadMessage;
use serde::Deserialize;

/// The model's verdict over a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SufficiencyDecision {
    pub is_sufficient: bool,
    /// Names of the bug-report fields the conversation does not cover.
    pub missing_fields: Vec<String>,
}

/// Asks the model whether the six bug-report fields are discoverable in the
/// conversation.
pub struct SufficiencyQuery {
    messages: Vec<ThreadMessage>,
}

impl SufficiencyQuery {
    pub fn new(messages: Vec<ThreadMessage>) -> Self {
        Self { messages }
    }
}

/// Decoded shape of the model's reply. `analysis` is requested in the prompt
/// for model-quality reasons but never consumed, so it is not decoded.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecisionPayload {
    is_sufficient: bool,
    missing_fields: Vec<String>,
}

impl LlmQuery for SufficiencyQuery {
    type Output = SufficiencyDecision;

    fn build_prompt(&self) -> String {
        format!(
            "Analyze the following Slack thread and judge whether it contains \
             enough information to file a GitHub issue.\n\
             \n\
             Conversation:\n\
             {conversation}\n\
             \n\
             Information a GitHub issue needs:\n\
             {REQUIRED_FIELDS_BLOCK}\n\
             \n\
             Respond in JSON with exactly this shape:\n\
             {{\n  \
               \"isSufficient\": true or false,\n  \
               \"missingFields\": [\"name of each missing field\", ...],\n  \
               \"analysis\": \"short explanation of the judgment\"\n\
             }}\n",
            conversation = render_conversation(&self.messages),
        )
    }

    fn parse_response(&self, raw: &str) -> Result<SufficiencyDecision, QueryError> {
        let value = decode_json_span(raw)?;
        let payload: DecisionPayload =
            serde_json::from_value(value).map_err(|e| QueryError::Format(e.to_string()))?;
        Ok(SufficiencyDecision {
            is_sufficient: payload.is_sufficient,
            missing_fields: payload.missing_fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::message;
    use super::*;

    fn query() -> SufficiencyQuery {
        SufficiencyQuery::new(vec![
            message("alice", "login freezes after clicking the button"),
            message("bob", "reproduced on Firefox 130"),
            message("carol", "expected: redirect to the dashboard"),
        ])
    }

    // ── Prompt construction ───────────────────────────────────────

    #[test]
    fn prompt_contains_every_message_in_order() {
        let prompt = query().build_prompt();
        let alice = prompt
            .find("alice: login freezes after clicking the button")
            .expect("first message missing");
        let bob = prompt
            .find("bob: reproduced on Firefox 130")
            .expect("second message missing");
        let carol = prompt
            .find("carol: expected: redirect to the dashboard")
            .expect("third message missing");
        assert!(alice < bob && bob < carol, "messages out of order");
    }

    #[test]
    fn prompt_names_all_six_required_fields() {
        let prompt = query().build_prompt();
        for label in [
            "Title",
            "Detailed description",
            "Reproduction steps",
            "Expected behavior",
            "Actual behavior",
            "Environment",
        ] {
            assert!(prompt.contains(label), "missing field label: {label}");
        }
    }

    #[test]
    fn prompt_for_empty_thread_has_no_message_lines() {
        let prompt = SufficiencyQuery::new(vec![]).build_prompt();
        assert!(prompt.contains("Conversation:\n\n"));
        assert!(!prompt.contains("alice:"));
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(query().build_prompt(), query().build_prompt());
    }

    // ── Response parsing ──────────────────────────────────────────

    #[test]
    fn parses_exact_payload_round_trip() {
        let decision = query()
            .parse_response(r#"{"isSufficient": true, "missingFields": []}"#)
            .unwrap();
        assert_eq!(
            decision,
            SufficiencyDecision {
                is_sufficient: true,
                missing_fields: vec![],
            }
        );
    }

    #[test]
    fn parses_payload_wrapped_in_prose() {
        let raw = "Here is my judgment:\n\
                   {\"isSufficient\": false, \"missingFields\": [\"Environment\"], \
                    \"analysis\": \"no version info\"}\n\
                   Hope that helps!";
        let decision = query().parse_response(raw).unwrap();
        assert!(!decision.is_sufficient);
        assert_eq!(decision.missing_fields, vec!["Environment".to_string()]);
    }

    #[test]
    fn no_span_is_a_parse_error() {
        let err = query()
            .parse_response("I could not produce JSON for that.")
            .unwrap_err();
        assert!(matches!(err, QueryError::Parse(_)));
    }

    #[test]
    fn missing_sufficiency_flag_is_a_format_error() {
        let err = query()
            .parse_response(r#"{"missingFields": []}"#)
            .unwrap_err();
        assert!(matches!(err, QueryError::Format(_)));
    }

    #[test]
    fn non_array_missing_fields_is_a_format_error() {
        let err = query()
            .parse_response(r#"{"isSufficient": false, "missingFields": "Title"}"#)
            .unwrap_err();
        assert!(matches!(err, QueryError::Format(_)));
    }

    #[test]
    fn non_boolean_flag_is_a_format_error() {
        let err = query()
            .parse_response(r#"{"isSufficient": "yes", "missingFields": []}"#)
            .unwrap_err();
        assert!(matches!(err, QueryError::Format(_)));
    }
}
