use std::collections::HashSet;

use tether_core::issue::Issue;
use tether_transcript::extract::{tokenize, SessionContent};

/// Keyword score of an issue against extracted session content.
///
/// - each content keyword found in title+description: 0.15 when it appears in
///   the title, else 0.05
/// - project name appearing anywhere: 0.20
/// - primary-request token overlap (tokens longer than 2 chars): up to 0.30
///
/// Capped at 1.0. Also returns which keywords matched.
pub fn keyword_score(content: &SessionContent, issue: &Issue) -> (f64, Vec<String>) {
    let title = issue.title.to_lowercase();
    let haystack = format!("{} {}", issue.title, issue.description).to_lowercase();

    let mut score = 0.0;
    let mut matched = Vec::new();
    for kw in &content.keywords {
        if haystack.contains(kw.as_str()) {
            score += if title.contains(kw.as_str()) { 0.15 } else { 0.05 };
            matched.push(kw.clone());
        }
    }

    if !content.project_name.is_empty()
        && haystack.contains(&content.project_name.to_lowercase())
    {
        score += 0.20;
    }

    let primary_tokens: Vec<String> = tokenize(&content.primary_request)
        .into_iter()
        .filter(|t| t.len() > 2)
        .collect();
    if !primary_tokens.is_empty() {
        let issue_words: HashSet<String> = tokenize(&haystack).into_iter().collect();
        let overlap = primary_tokens
            .iter()
            .filter(|t| issue_words.contains(*t))
            .count();
        score += 0.30 * overlap as f64 / primary_tokens.len() as f64;
    }

    (score.min(1.0), matched)
}

/// Bonus factor for the issue's workflow state: active work scores highest,
/// finished or canceled work scores nothing.
///
/// "unstarted" is checked before "started", since the latter is a substring
/// of the former.
pub fn state_bonus(state_name: &str) -> f64 {
    let name = state_name.to_lowercase();
    if name.contains("unstarted") || name.contains("todo") || name.contains("backlog") {
        0.5
    } else if name.contains("progress") || name.contains("started") {
        1.0
    } else if name.contains("done") || name.contains("complete") || name.contains("cancel") {
        0.0
    } else {
        0.3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_core::issue::{StateType, WorkflowState};
    use tether_transcript::extract_content;

    fn content_for(primary: &str, cwd: &str) -> SessionContent {
        let entry = json!({
            "type": "user",
            "timestamp": "2025-01-01T00:00:00Z",
            "cwd": cwd,
            "message": {"role": "user", "content": primary}
        });
        extract_content(&[entry], "s1", cwd)
    }

    fn issue(title: &str, description: &str, state_name: &str) -> Issue {
        tether_tracker::make_issue(
            "ENG-42",
            title,
            description,
            &WorkflowState {
                id: "st".into(),
                name: state_name.into(),
                state_type: StateType::Started,
            },
        )
    }

    #[test]
    fn title_hits_outscore_description_hits() {
        let content = content_for("fix login redirect", "/home/u/web");
        let in_title = issue("Login redirect bug", "", "In Progress");
        let in_desc = issue("Some other thing", "about login redirect", "In Progress");
        let (title_score, _) = keyword_score(&content, &in_title);
        let (desc_score, _) = keyword_score(&content, &in_desc);
        assert!(title_score > desc_score);
    }

    #[test]
    fn seed_scenario_login_redirect() {
        // primary "fix the login page redirect bug on mobile", project "web",
        // candidate "Login redirect bug": keyword score ≥ 0.5.
        let content = content_for(
            "fix the login page redirect bug on mobile",
            "/home/u/proj/web",
        );
        let candidate = issue("Login redirect bug", "", "In Progress");
        let (score, matched) = keyword_score(&content, &candidate);
        assert!(score >= 0.5, "score {score}");
        assert!(matched.contains(&"login".to_string()));
        assert!(matched.contains(&"redirect".to_string()));
        assert!(matched.contains(&"bug".to_string()));
    }

    #[test]
    fn project_name_adds_twenty_points() {
        let content = content_for("unrelated words entirely", "/home/u/webapp");
        let with_project = issue("webapp cleanup", "", "Todo");
        let without = issue("cleanup", "", "Todo");
        let (a, _) = keyword_score(&content, &with_project);
        let (b, _) = keyword_score(&content, &without);
        assert!(a - b >= 0.20 - 1e-9);
    }

    #[test]
    fn score_is_capped_at_one() {
        let text = "login redirect bug crash error page mobile frontend session token";
        let content = content_for(text, "/home/u/login");
        let candidate = issue(text, text, "In Progress");
        let (score, _) = keyword_score(&content, &candidate);
        assert!(score <= 1.0);
        assert!(score > 0.9);
    }

    #[test]
    fn empty_content_scores_zero() {
        let content = SessionContent::default();
        let candidate = issue("anything", "at all", "Todo");
        let (score, matched) = keyword_score(&content, &candidate);
        assert_eq!(score, 0.0);
        assert!(matched.is_empty());
    }

    #[test]
    fn state_bonus_buckets() {
        assert_eq!(state_bonus("In Progress"), 1.0);
        assert_eq!(state_bonus("Started"), 1.0);
        assert_eq!(state_bonus("Todo"), 0.5);
        assert_eq!(state_bonus("Backlog"), 0.5);
        assert_eq!(state_bonus("Unstarted"), 0.5);
        assert_eq!(state_bonus("Done"), 0.0);
        assert_eq!(state_bonus("Completed"), 0.0);
        assert_eq!(state_bonus("Canceled"), 0.0);
        assert_eq!(state_bonus("Blocked"), 0.3);
    }
}
