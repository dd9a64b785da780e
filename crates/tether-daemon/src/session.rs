use std::path::Path;

use anyhow::{Context, Result};
use tether_core::issue::{Issue, NewIssue};
use tether_transcript::extract::SessionContent;
use tether_transcript::{extract_content, filter_entries, load_transcript};

use crate::labels::derive_label_ids;
use crate::processor::Processor;
use crate::summary::{build_summary, comment_body, issue_description, issue_title};

/// Handle one `session_stop` record: load and filter the transcript, resolve
/// (or create) the target issue, enforce assignee/state/labels, then post the
/// session summary comment.
///
/// Returns an optional diagnostic note stored on the processed record.
pub async fn handle_session_stop(
    p: &Processor,
    session_id: &str,
    transcript_path: &str,
    cwd: &str,
) -> Result<Option<String>> {
    let entries = load_transcript(Path::new(transcript_path))
        .with_context(|| format!("failed to read transcript {transcript_path}"))?;
    let kept = filter_entries(&entries);
    if kept.is_empty() {
        return Ok(Some("transcript empty after noise filter".into()));
    }

    let content = extract_content(&kept, session_id, cwd);
    let user_text = content.user_messages().join("\n");
    let derived_labels = derive_label_ids(&content.cwd, &user_text, &p.caches.labels);

    let issue = match p.matcher.resolve(&content).await? {
        Some(m) => {
            tracing::info!(
                session = session_id,
                issue = %m.issue.identifier,
                confidence = m.confidence,
                match_type = ?m.match_type,
                "session resolved to existing issue"
            );
            m.issue
        }
        None => create_issue(p, &content, &derived_labels).await?,
    };

    enforce_setup(p, &issue, &derived_labels).await?;

    let summary = build_summary(p.llm.as_ref(), &content).await;
    let body = comment_body(&summary, &content);
    p.tracker
        .add_comment(&issue.id, &body)
        .await
        .with_context(|| format!("failed to comment on {}", issue.identifier))?;
    tracing::info!(session = session_id, issue = %issue.identifier, "comment posted");
    Ok(None)
}

async fn create_issue(
    p: &Processor,
    content: &SessionContent,
    derived_labels: &[String],
) -> Result<Issue> {
    let team = p
        .caches
        .team
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no team cached; cannot create issue"))?;
    let new = NewIssue {
        title: issue_title(content),
        description: issue_description(content),
        team_id: team.id.clone(),
        assignee_id: Some(p.caches.assignee.id.clone()),
        label_ids: derived_labels.to_vec(),
        state_id: p.caches.in_progress_state().map(|s| s.id.clone()),
    };
    let issue = p
        .tracker
        .create_issue(&new)
        .await
        .context("issue creation failed")?;
    tracing::info!(issue = %issue.identifier, title = %issue.title, "created issue for session");
    Ok(issue)
}

/// Unconditional assignee overwrite, move to in-progress when known, and
/// union the derived labels into the existing set (never remove).
async fn enforce_setup(p: &Processor, issue: &Issue, derived_labels: &[String]) -> Result<()> {
    p.tracker.assign(&issue.id, &p.caches.assignee.id).await?;

    if let Some(state) = p.caches.in_progress_state() {
        p.tracker.update_state(&issue.id, &state.id).await?;
    }

    if !derived_labels.is_empty() {
        let mut ids: Vec<String> = issue.labels.iter().map(|l| l.id.clone()).collect();
        for id in derived_labels {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        p.tracker.set_labels(&issue.id, &ids).await?;
    }
    Ok(())
}
