//! Issue-tracker transport.
//!
//! `Tracker` is the capability set the daemon and matcher program against.
//! `HttpTracker` speaks authenticated GraphQL over HTTP; `MemoryTracker` is
//! the in-memory double used throughout the test suite.

mod http;
mod memory;

pub use http::HttpTracker;
pub use memory::{make_issue, MemoryTracker};

use anyhow::Result;
use async_trait::async_trait;
use tether_core::issue::{Issue, Label, NewIssue, Team, User, WorkflowState};

#[async_trait]
pub trait Tracker: Send + Sync {
    async fn get_viewer(&self) -> Result<User>;
    async fn list_teams(&self) -> Result<Vec<Team>>;
    async fn list_labels(&self, team_id: &str) -> Result<Vec<Label>>;
    async fn list_states(&self, team_id: &str) -> Result<Vec<WorkflowState>>;
    /// Find a user whose name or email contains `query` (case-insensitive).
    async fn find_user(&self, query: &str) -> Result<Option<User>>;

    async fn get_issue(&self, identifier: &str) -> Result<Option<Issue>>;
    /// Free-text search, best matches first.
    async fn search_issues(&self, query: &str, limit: usize) -> Result<Vec<Issue>>;
    /// Issues in `started`/`unstarted` states, most recently updated first.
    async fn recent_active_issues(&self, limit: usize) -> Result<Vec<Issue>>;

    async fn create_issue(&self, new: &NewIssue) -> Result<Issue>;
    async fn add_comment(&self, issue_id: &str, body: &str) -> Result<()>;
    async fn attach_link(&self, issue_id: &str, url: &str, title: &str) -> Result<()>;
    async fn update_state(&self, issue_id: &str, state_id: &str) -> Result<()>;
    async fn assign(&self, issue_id: &str, user_id: &str) -> Result<()>;
    /// Overwrite the issue's label set.
    async fn set_labels(&self, issue_id: &str, label_ids: &[String]) -> Result<()>;
}
