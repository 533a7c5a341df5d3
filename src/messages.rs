//! Slack reply text. Pure construction, no I/O.

use crate::clients::github::IssueRecord;
use std::fmt::Write;

/// Reply asking the thread for the fields the model could not find.
pub fn request_for_more_info(missing_fields: &[String]) -> String {
    let mut text = String::from(
        "This thread does not carry enough information to file an issue yet. \
         Please add the following:\n",
    );
    for field in missing_fields {
        let _ = writeln!(text, "• {field}");
    }
    text.push_str("\nMention me again once the thread has the details.");
    text
}

/// Confirmation that an issue was filed, with its number and URL.
pub fn issue_posted(issue: &IssueRecord) -> String {
    format!(
        ":white_check_mark: Filed issue #{} — *{}*\n{}",
        issue.number, issue.title, issue.html_url
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_lists_every_missing_field() {
        let text = request_for_more_info(&[
            "Reproduction steps".to_string(),
            "Environment".to_string(),
        ]);
        assert!(text.contains("• Reproduction steps\n"));
        assert!(text.contains("• Environment\n"));
    }

    #[test]
    fn request_with_no_fields_still_asks_for_detail() {
        let text = request_for_more_info(&[]);
        assert!(text.contains("not carry enough information"));
        assert!(!text.contains('•'));
    }

    #[test]
    fn confirmation_embeds_number_and_url() {
        let record = IssueRecord {
            id: 9001,
            number: 42,
            title: "Login freezes".into(),
            html_url: "https://github.com/acme/app/issues/42".into(),
        };
        let text = issue_posted(&record);
        assert!(text.contains("#42"));
        assert!(text.contains("https://github.com/acme/app/issues/42"));
        assert!(text.contains("Login freezes"));
    }
}
