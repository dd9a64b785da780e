use tether_core::issue::Issue;
use tether_core::text::truncate_with_ellipsis;
use tether_transcript::extract::SessionContent;

/// Build the semantic-ranking prompt: session context plus the candidate set,
/// asking for a strict-JSON ranking keyed by issue id.
pub fn build_match_prompt(content: &SessionContent, candidates: &[Issue]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are ranking issue-tracker candidates against a coding session. \
         Score how likely each issue is the work item this session was about.\n\n",
    );
    prompt.push_str("## Session\n");
    prompt.push_str(&format!(
        "Request: {}\n",
        truncate_with_ellipsis(&content.primary_request, 500)
    ));
    prompt.push_str(&format!("Project: {}\n", content.project_name));
    prompt.push_str(&format!("Directory: {}\n", content.cwd));
    if !content.file_paths.is_empty() {
        let files: Vec<&str> = content
            .file_paths
            .iter()
            .take(15)
            .map(|s| s.as_str())
            .collect();
        prompt.push_str(&format!("Files touched: {}\n", files.join(", ")));
    }
    if !content.keywords.is_empty() {
        let kws: Vec<&str> = content.keywords.iter().take(20).map(|s| s.as_str()).collect();
        prompt.push_str(&format!("Keywords: {}\n", kws.join(", ")));
    }

    prompt.push_str("\n## Candidate issues\n");
    for issue in candidates {
        prompt.push_str(&format!(
            "- id: {} | {} | {} | state: {}\n",
            issue.id,
            issue.identifier,
            truncate_with_ellipsis(&issue.title, 120),
            issue.state.name
        ));
        if !issue.description.is_empty() {
            prompt.push_str(&format!(
                "  {}\n",
                truncate_with_ellipsis(&issue.description, 200)
            ));
        }
    }

    prompt.push_str(
        "\nReply with JSON only, no prose:\n\
         {\"matches\": [{\"issue_id\": \"<id>\", \"relevance_score\": 0.0, \
         \"reasoning\": \"...\", \"matched_aspects\": [\"...\"]}]}\n\
         Include every candidate. Scores are 0.0-1.0.\n",
    );
    prompt
}
