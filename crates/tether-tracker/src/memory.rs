use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tether_core::issue::{Issue, Label, NewIssue, StateType, Team, User, WorkflowState};

use crate::Tracker;

/// In-memory tracker double. Seeded with fixtures, records every mutation,
/// and can be told to fail specific operations.
#[derive(Default)]
pub struct MemoryTracker {
    state: Mutex<State>,
    pub search_calls: AtomicUsize,
    pub recent_calls: AtomicUsize,
    pub fail_comments: AtomicBool,
    pub fail_search: AtomicBool,
}

#[derive(Default)]
struct State {
    viewer: Option<User>,
    users: Vec<User>,
    teams: Vec<Team>,
    labels: Vec<Label>,
    states: Vec<WorkflowState>,
    issues: Vec<Issue>,
    next_issue: usize,
    comments: Vec<(String, String)>,
    links: Vec<(String, String, String)>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A double seeded with one team, a viewer, the usual workflow states,
    /// and a label set; enough for most handler tests.
    pub fn with_defaults() -> Self {
        let t = Self::new();
        {
            let mut s = t.state.lock().unwrap();
            s.viewer = Some(User {
                id: "user-viewer".into(),
                name: "Viewer".into(),
            });
            s.users = vec![User {
                id: "user-viewer".into(),
                name: "Viewer".into(),
            }];
            s.teams = vec![Team {
                id: "team-1".into(),
                name: "Engineering".into(),
            }];
            s.states = vec![
                state("st-backlog", "Backlog", StateType::Backlog),
                state("st-todo", "Todo", StateType::Unstarted),
                state("st-progress", "In Progress", StateType::Started),
                state("st-review", "In Review", StateType::Started),
                state("st-done", "Done", StateType::Completed),
            ];
            s.labels = vec![
                label("lbl-bug", "Bug"),
                label("lbl-feature", "Feature"),
                label("lbl-frontend", "Frontend"),
                label("lbl-backend", "Backend"),
                label("lbl-mobile", "Mobile"),
            ];
        }
        t
    }

    pub fn push_issue(&self, issue: Issue) {
        self.state.lock().unwrap().issues.push(issue);
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.state.lock().unwrap().issues.clone()
    }

    pub fn comments(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().comments.clone()
    }

    pub fn links(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().links.clone()
    }

    pub fn issue_by_identifier(&self, identifier: &str) -> Option<Issue> {
        self.state
            .lock()
            .unwrap()
            .issues
            .iter()
            .find(|i| i.identifier == identifier)
            .cloned()
    }
}

fn state(id: &str, name: &str, state_type: StateType) -> WorkflowState {
    WorkflowState {
        id: id.into(),
        name: name.into(),
        state_type,
    }
}

fn label(id: &str, name: &str) -> Label {
    Label {
        id: id.into(),
        name: name.into(),
    }
}

/// Helper for building fixture issues.
pub fn make_issue(identifier: &str, title: &str, description: &str, st: &WorkflowState) -> Issue {
    Issue {
        id: format!("uuid-{identifier}"),
        identifier: identifier.into(),
        title: title.into(),
        description: description.into(),
        url: format!("https://tracker.test/{identifier}"),
        state: st.clone(),
        assignee: None,
        labels: Vec::new(),
    }
}

#[async_trait]
impl Tracker for MemoryTracker {
    async fn get_viewer(&self) -> Result<User> {
        self.state
            .lock()
            .unwrap()
            .viewer
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no viewer configured"))
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        Ok(self.state.lock().unwrap().teams.clone())
    }

    async fn list_labels(&self, _team_id: &str) -> Result<Vec<Label>> {
        Ok(self.state.lock().unwrap().labels.clone())
    }

    async fn list_states(&self, _team_id: &str) -> Result<Vec<WorkflowState>> {
        Ok(self.state.lock().unwrap().states.clone())
    }

    async fn find_user(&self, query: &str) -> Result<Option<User>> {
        let needle = query.to_lowercase();
        Ok(self
            .state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.name.to_lowercase().contains(&needle))
            .cloned())
    }

    async fn get_issue(&self, identifier: &str) -> Result<Option<Issue>> {
        Ok(self.issue_by_identifier(identifier))
    }

    async fn search_issues(&self, query: &str, limit: usize) -> Result<Vec<Issue>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_search.load(Ordering::SeqCst) {
            bail!("tracker search failed with status 500");
        }
        let tokens: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(|t| t.to_string())
            .collect();
        Ok(self
            .state
            .lock()
            .unwrap()
            .issues
            .iter()
            .filter(|i| {
                let haystack = format!("{} {}", i.title, i.description).to_lowercase();
                tokens.iter().any(|t| haystack.contains(t))
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn recent_active_issues(&self, limit: usize) -> Result<Vec<Issue>> {
        self.recent_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .state
            .lock()
            .unwrap()
            .issues
            .iter()
            .filter(|i| {
                matches!(
                    i.state.state_type,
                    StateType::Started | StateType::Unstarted
                )
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create_issue(&self, new: &NewIssue) -> Result<Issue> {
        let mut s = self.state.lock().unwrap();
        if new.team_id.is_empty() {
            bail!("issue create rejected: team is required");
        }
        s.next_issue += 1;
        let n = s.next_issue;
        let issue_state = new
            .state_id
            .as_ref()
            .and_then(|id| s.states.iter().find(|st| &st.id == id).cloned())
            .unwrap_or_else(|| state("st-unknown", "Todo", StateType::Unstarted));
        let labels = new
            .label_ids
            .iter()
            .filter_map(|id| s.labels.iter().find(|l| &l.id == id).cloned())
            .collect();
        let assignee = new
            .assignee_id
            .as_ref()
            .and_then(|id| s.users.iter().find(|u| &u.id == id).cloned());
        let issue = Issue {
            id: format!("uuid-new-{n}"),
            identifier: format!("MEM-{n}"),
            title: new.title.clone(),
            description: new.description.clone(),
            url: format!("https://tracker.test/MEM-{n}"),
            state: issue_state,
            assignee,
            labels,
        };
        s.issues.push(issue.clone());
        Ok(issue)
    }

    async fn add_comment(&self, issue_id: &str, body: &str) -> Result<()> {
        if self.fail_comments.load(Ordering::SeqCst) {
            bail!("tracker comment create failed with status 500");
        }
        self.state
            .lock()
            .unwrap()
            .comments
            .push((issue_id.to_string(), body.to_string()));
        Ok(())
    }

    async fn attach_link(&self, issue_id: &str, url: &str, title: &str) -> Result<()> {
        self.state.lock().unwrap().links.push((
            issue_id.to_string(),
            url.to_string(),
            title.to_string(),
        ));
        Ok(())
    }

    async fn update_state(&self, issue_id: &str, state_id: &str) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        let new_state = s
            .states
            .iter()
            .find(|st| st.id == state_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown state: {state_id}"))?;
        if let Some(issue) = s.issues.iter_mut().find(|i| i.id == issue_id) {
            issue.state = new_state;
        }
        Ok(())
    }

    async fn assign(&self, issue_id: &str, user_id: &str) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        let user = s
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .unwrap_or(User {
                id: user_id.to_string(),
                name: String::new(),
            });
        if let Some(issue) = s.issues.iter_mut().find(|i| i.id == issue_id) {
            issue.assignee = Some(user);
        }
        Ok(())
    }

    async fn set_labels(&self, issue_id: &str, label_ids: &[String]) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        let labels: Vec<Label> = label_ids
            .iter()
            .filter_map(|id| s.labels.iter().find(|l| &l.id == id).cloned())
            .collect();
        if let Some(issue) = s.issues.iter_mut().find(|i| i.id == issue_id) {
            issue.labels = labels;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_expose_team_and_states() {
        let t = MemoryTracker::with_defaults();
        assert_eq!(t.list_teams().await.unwrap().len(), 1);
        let states = t.list_states("team-1").await.unwrap();
        assert!(states.iter().any(|s| s.name == "In Progress"));
        assert!(t.get_viewer().await.unwrap().id.contains("viewer"));
    }

    #[tokio::test]
    async fn search_matches_title_tokens() {
        let t = MemoryTracker::with_defaults();
        let st = state("st-progress", "In Progress", StateType::Started);
        t.push_issue(make_issue("ENG-42", "Login redirect bug", "", &st));

        let hits = t.search_issues("login something", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(t.search_calls.load(Ordering::SeqCst), 1);

        let none = t.search_issues("unrelated", 10).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn create_issue_resolves_state_and_labels() {
        let t = MemoryTracker::with_defaults();
        let issue = t
            .create_issue(&NewIssue {
                title: "[web] fix it".into(),
                description: "auto".into(),
                team_id: "team-1".into(),
                assignee_id: Some("user-viewer".into()),
                label_ids: vec!["lbl-bug".into()],
                state_id: Some("st-progress".into()),
            })
            .await
            .unwrap();
        assert_eq!(issue.identifier, "MEM-1");
        assert_eq!(issue.state.name, "In Progress");
        assert_eq!(issue.labels[0].name, "Bug");
        assert_eq!(issue.assignee.as_ref().unwrap().id, "user-viewer");
    }

    #[tokio::test]
    async fn create_issue_requires_team() {
        let t = MemoryTracker::with_defaults();
        let err = t
            .create_issue(&NewIssue {
                title: "x".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("team"));
    }

    #[tokio::test]
    async fn mutations_are_recorded() {
        let t = MemoryTracker::with_defaults();
        let st = state("st-todo", "Todo", StateType::Unstarted);
        t.push_issue(make_issue("ENG-1", "A thing", "", &st));
        let issue = t.issue_by_identifier("ENG-1").unwrap();

        t.add_comment(&issue.id, "hello").await.unwrap();
        t.attach_link(&issue.id, "https://pr", "Pull Request")
            .await
            .unwrap();
        t.update_state(&issue.id, "st-progress").await.unwrap();
        t.assign(&issue.id, "user-viewer").await.unwrap();

        assert_eq!(t.comments().len(), 1);
        assert_eq!(t.links()[0].2, "Pull Request");
        let updated = t.issue_by_identifier("ENG-1").unwrap();
        assert_eq!(updated.state.name, "In Progress");
        assert_eq!(updated.assignee.unwrap().id, "user-viewer");
    }

    #[tokio::test]
    async fn fail_comments_switch() {
        let t = MemoryTracker::with_defaults();
        t.fail_comments.store(true, Ordering::SeqCst);
        assert!(t.add_comment("x", "y").await.is_err());
    }
}
