use serde::{Deserialize, Serialize};

// ── Tracker entity mirrors ──

/// Workflow state category as reported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateType {
    Started,
    Unstarted,
    Completed,
    Canceled,
    Backlog,
    #[serde(other)]
    Unknown,
}

/// A named phase of an issue (e.g. "In Progress", "In Review").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub state_type: StateType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
}

/// A work item in the external tracker.
///
/// `id` is the tracker's opaque internal id; `identifier` is the human code
/// (e.g. `ENG-123`) used in branch names and log lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub identifier: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    pub state: WorkflowState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<User>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
}

/// Fields for issue creation. Optional fields are omitted from the mutation.
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub team_id: String,
    pub assignee_id: Option<String>,
    pub label_ids: Vec<String>,
    pub state_id: Option<String>,
}

// ── Match results ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Identifier captured straight from the branch name.
    Exact,
    Keyword,
    Semantic,
    Hybrid,
}

/// Outcome of resolving a session against the tracker.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub issue: Issue,
    pub confidence: f64,
    pub match_type: MatchType,
    pub keyword_score: f64,
    pub semantic_score: Option<f64>,
    pub matched_keywords: Vec<String>,
    pub reasoning: Option<String>,
}
