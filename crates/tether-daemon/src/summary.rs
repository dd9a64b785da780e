use tether_core::text::{collapse_whitespace, truncate_with_ellipsis};
use tether_llm::Llm;
use tether_transcript::extract::SessionContent;

const TITLE_MAX: usize = 60;
const DESCRIPTION_MSG_MAX: usize = 300;
const COMMENT_MSG_MAX: usize = 200;
const SUMMARY_PROMPT_MSGS: usize = 10;
const FALLBACK_MSGS: usize = 5;

/// Title for an auto-created issue: `[<project>] <normalized first message>`.
pub fn issue_title(content: &SessionContent) -> String {
    let message = truncate_with_ellipsis(&collapse_whitespace(&content.primary_request), TITLE_MAX);
    if content.project_name.is_empty() {
        message
    } else {
        format!("[{}] {}", content.project_name, message)
    }
}

/// Description for an auto-created issue: preamble plus the first user
/// requests.
pub fn issue_description(content: &SessionContent) -> String {
    let mut out = String::from("This issue was auto-created from a coding-assistant session.\n");
    out.push_str("\n## User Requests\n");
    for msg in content.user_messages().iter().take(3) {
        out.push_str(&format!(
            "- {}\n",
            truncate_with_ellipsis(&collapse_whitespace(msg), DESCRIPTION_MSG_MAX)
        ));
    }
    out
}

/// Short natural-language summary of the session. Sessions with little user
/// input, or any LLM failure, fall back to a deterministic join.
pub async fn build_summary(llm: &dyn Llm, content: &SessionContent) -> String {
    let messages = content.user_messages();
    if messages.len() <= 2 {
        return fallback_summary(content);
    }
    let prompt = summary_prompt(content);
    match llm.complete(&prompt).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => fallback_summary(content),
    }
}

/// Deterministic fallback: the first user messages joined with newlines.
pub fn fallback_summary(content: &SessionContent) -> String {
    content
        .user_messages()
        .iter()
        .take(FALLBACK_MSGS)
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary_prompt(content: &SessionContent) -> String {
    let mut prompt = String::from(
        "Summarize what this coding session accomplished in 2-4 sentences. \
         Plain prose, no headings.\n\nUser messages:\n",
    );
    for msg in content.user_messages().iter().take(SUMMARY_PROMPT_MSGS) {
        prompt.push_str(&format!(
            "- {}\n",
            truncate_with_ellipsis(&collapse_whitespace(msg), DESCRIPTION_MSG_MAX)
        ));
    }
    prompt
}

/// The posted comment: stable Markdown layout with summary then requests.
pub fn comment_body(summary: &str, content: &SessionContent) -> String {
    let mut out = format!("## Claude Code Session Summary\n\n{summary}\n\n---\n\n### User Requests\n");
    for msg in content.user_messages().iter().take(FALLBACK_MSGS) {
        out.push_str(&format!(
            "- {}\n",
            truncate_with_ellipsis(&collapse_whitespace(msg), COMMENT_MSG_MAX)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_llm::MockLlm;

    fn content(msgs: &[&str], project: &str) -> SessionContent {
        let mut c = SessionContent {
            project_name: project.to_string(),
            ..Default::default()
        };
        if let Some((first, rest)) = msgs.split_first() {
            c.primary_request = first.to_string();
            c.additional_context = rest.iter().map(|s| s.to_string()).collect();
        }
        c
    }

    #[test]
    fn title_includes_project_prefix() {
        let c = content(&["fix the login page redirect bug on mobile"], "web");
        assert_eq!(issue_title(&c), "[web] fix the login page redirect bug on mobile");
    }

    #[test]
    fn title_omits_empty_project() {
        let c = content(&["fix it"], "");
        assert_eq!(issue_title(&c), "fix it");
    }

    #[test]
    fn title_normalizes_and_truncates() {
        let long = format!("fix\n\nthe   {}", "very ".repeat(30));
        let c = content(&[long.as_str()], "web");
        let title = issue_title(&c);
        assert!(title.starts_with("[web] fix the very"));
        assert!(title.ends_with("..."));
        // "[web] " + 60 message bytes + "..."
        assert!(title.len() <= 6 + TITLE_MAX + 3);
        assert!(!title.contains('\n'));
    }

    #[test]
    fn description_lists_first_three_requests() {
        let c = content(&["one", "two", "three", "four"], "web");
        let desc = issue_description(&c);
        assert!(desc.starts_with("This issue was auto-created"));
        assert!(desc.contains("- one"));
        assert!(desc.contains("- three"));
        assert!(!desc.contains("- four"));
    }

    #[test]
    fn description_truncates_long_messages() {
        let long = "x".repeat(500);
        let c = content(&[long.as_str()], "web");
        let desc = issue_description(&c);
        assert!(desc.contains(&format!("{}...", "x".repeat(300))));
    }

    #[tokio::test]
    async fn summary_uses_llm_when_enough_messages() {
        let llm = MockLlm::new().with_reply("Shipped the login fix.");
        let c = content(&["one", "two", "three"], "web");
        assert_eq!(build_summary(&llm, &c).await, "Shipped the login fix.");
    }

    #[tokio::test]
    async fn summary_falls_back_for_short_sessions() {
        let llm = MockLlm::new().with_reply("should not be used");
        let c = content(&["one", "two"], "web");
        assert_eq!(build_summary(&llm, &c).await, "one\ntwo");
        assert_eq!(llm.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn summary_falls_back_on_llm_failure() {
        let llm = MockLlm::new();
        llm.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        let c = content(&["one", "two", "three", "four", "five", "six"], "web");
        assert_eq!(build_summary(&llm, &c).await, "one\ntwo\nthree\nfour\nfive");
    }

    #[test]
    fn comment_layout_is_stable() {
        let c = content(&["first request", "second request"], "web");
        let body = comment_body("Did the thing.", &c);
        assert!(body.starts_with("## Claude Code Session Summary\n\nDid the thing.\n\n---\n\n### User Requests\n"));
        assert!(body.contains("- first request"));
        assert!(body.contains("- second request"));
    }

    #[test]
    fn comment_truncates_messages_to_200() {
        let long = "y".repeat(400);
        let c = content(&[long.as_str()], "web");
        let body = comment_body("s", &c);
        assert!(body.contains(&format!("- {}...", "y".repeat(200))));
    }
}
