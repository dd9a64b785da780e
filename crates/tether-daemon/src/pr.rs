use anyhow::{Context, Result};
use tether_core::issue::NewIssue;

use crate::processor::Processor;

/// Handle one `pr_created` record: attach the PR link to the session's issue
/// and advance it to review. Only branch extraction is available here; the
/// record carries no transcript.
pub async fn handle_pr_created(
    p: &Processor,
    session_id: &str,
    pr_url: &str,
    cwd: &str,
) -> Result<Option<String>> {
    let branch = current_branch(cwd).await;
    tracing::info!(session = session_id, branch = ?branch, pr = pr_url, "pr record");
    attach_pr(p, branch.as_deref(), pr_url).await
}

pub(crate) async fn attach_pr(
    p: &Processor,
    branch: Option<&str>,
    pr_url: &str,
) -> Result<Option<String>> {
    let resolved = match branch {
        Some(b) => p.matcher.resolve_branch(b).await?,
        None => None,
    };

    let issue = match resolved {
        Some(m) => m.issue,
        None => {
            let team = match &p.caches.team {
                Some(team) => team,
                None => return Ok(Some("no issue resolved and no team cached".into())),
            };
            let last_segment = pr_url
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(pr_url);
            let issue = p
                .tracker
                .create_issue(&NewIssue {
                    title: format!("PR created: {last_segment}"),
                    description: pr_url.to_string(),
                    team_id: team.id.clone(),
                    ..Default::default()
                })
                .await
                .context("placeholder issue creation failed")?;
            tracing::info!(issue = %issue.identifier, "created placeholder issue for PR");
            issue
        }
    };

    p.tracker
        .attach_link(&issue.id, pr_url, "Pull Request")
        .await
        .with_context(|| format!("failed to attach PR link to {}", issue.identifier))?;

    // Missing review state is non-fatal; the link is the important part.
    if let Some(state) = p.caches.review_state() {
        if let Err(e) = p.tracker.update_state(&issue.id, &state.id).await {
            tracing::warn!(issue = %issue.identifier, "review state update failed: {e:#}");
        }
    }
    Ok(None)
}

/// Current branch of the record's working directory, via git. Any failure
/// (no git, not a repo, detached head) resolves to `None`.
async fn current_branch(cwd: &str) -> Option<String> {
    let output = tokio::process::Command::new("git")
        .args(["branch", "--show-current"])
        .current_dir(cwd)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!branch.is_empty()).then_some(branch)
}
