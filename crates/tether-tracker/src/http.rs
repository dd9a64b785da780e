use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tether_core::issue::{Issue, Label, NewIssue, StateType, Team, User, WorkflowState};

use crate::Tracker;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Fields requested for every issue node.
const ISSUE_FIELDS: &str = "id identifier title description url \
    state { id name type } \
    assignee { id name } \
    labels { nodes { id name } }";

/// GraphQL client for the tracker API.
///
/// Auth is a single opaque credential sent as the `Authorization` header,
/// exactly as supplied (the tracker decides its format).
pub struct HttpTracker {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpTracker {
    pub fn new(endpoint: impl Into<String>, token: &str) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(token.trim())
                .context("invalid tracker authorization header")?,
        );
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build tracker http client")?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// Execute one GraphQL operation and return its `data` object.
    async fn graphql(&self, operation: &str, query: &str, variables: Value) -> Result<Value> {
        let body = json!({ "query": query, "variables": variables });
        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("tracker {operation} request failed"))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!(
                "tracker {operation} failed with status {}: {}",
                status.as_u16(),
                truncate_body(&text)
            );
        }
        let parsed: Value = serde_json::from_str(&text)
            .with_context(|| format!("tracker {operation} returned non-JSON body"))?;
        if let Some(errors) = parsed.get("errors").and_then(|e| e.as_array()) {
            if !errors.is_empty() {
                let msg = errors[0]
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown graphql error");
                bail!("tracker {operation} rejected: {msg}");
            }
        }
        parsed
            .get("data")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("tracker {operation} returned no data"))
    }
}

fn truncate_body(body: &str) -> &str {
    let end = tether_core::text::floor_char_boundary(body, 400);
    &body[..end]
}

/// Parse one issue node. Returns `None` when required fields are missing
/// rather than failing the whole result set.
fn parse_issue(node: &Value) -> Option<Issue> {
    let state = node.get("state")?;
    Some(Issue {
        id: node.get("id")?.as_str()?.to_string(),
        identifier: node.get("identifier")?.as_str()?.to_string(),
        title: node.get("title")?.as_str()?.to_string(),
        description: node
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or("")
            .to_string(),
        url: node
            .get("url")
            .and_then(|u| u.as_str())
            .unwrap_or("")
            .to_string(),
        state: WorkflowState {
            id: state.get("id")?.as_str()?.to_string(),
            name: state.get("name")?.as_str()?.to_string(),
            state_type: serde_json::from_value(state.get("type")?.clone())
                .unwrap_or(StateType::Unknown),
        },
        assignee: node.get("assignee").and_then(|a| {
            Some(User {
                id: a.get("id")?.as_str()?.to_string(),
                name: a.get("name")?.as_str()?.to_string(),
            })
        }),
        labels: node
            .get("labels")
            .and_then(|l| l.get("nodes"))
            .and_then(|n| n.as_array())
            .map(|nodes| {
                nodes
                    .iter()
                    .filter_map(|n| {
                        Some(Label {
                            id: n.get("id")?.as_str()?.to_string(),
                            name: n.get("name")?.as_str()?.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default(),
    })
}

fn parse_issue_nodes(data: &Value, path: &[&str]) -> Vec<Issue> {
    let mut cur = data;
    for key in path {
        cur = match cur.get(key) {
            Some(v) => v,
            None => return Vec::new(),
        };
    }
    cur.as_array()
        .map(|nodes| nodes.iter().filter_map(parse_issue).collect())
        .unwrap_or_default()
}

#[async_trait]
impl Tracker for HttpTracker {
    async fn get_viewer(&self) -> Result<User> {
        let data = self
            .graphql("viewer", "query { viewer { id name } }", json!({}))
            .await?;
        let viewer = &data["viewer"];
        Ok(User {
            id: viewer
                .get("id")
                .and_then(|v| v.as_str())
                .context("viewer has no id")?
                .to_string(),
            name: viewer
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
        })
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        let data = self
            .graphql(
                "teams",
                "query { teams { nodes { id name } } }",
                json!({}),
            )
            .await?;
        Ok(data["teams"]["nodes"]
            .as_array()
            .map(|nodes| {
                nodes
                    .iter()
                    .filter_map(|n| {
                        Some(Team {
                            id: n.get("id")?.as_str()?.to_string(),
                            name: n.get("name")?.as_str()?.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_labels(&self, team_id: &str) -> Result<Vec<Label>> {
        let data = self
            .graphql(
                "labels",
                "query($teamId: String!) { team(id: $teamId) { labels { nodes { id name } } } }",
                json!({ "teamId": team_id }),
            )
            .await?;
        Ok(data["team"]["labels"]["nodes"]
            .as_array()
            .map(|nodes| {
                nodes
                    .iter()
                    .filter_map(|n| {
                        Some(Label {
                            id: n.get("id")?.as_str()?.to_string(),
                            name: n.get("name")?.as_str()?.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_states(&self, team_id: &str) -> Result<Vec<WorkflowState>> {
        let data = self
            .graphql(
                "states",
                "query($teamId: String!) { team(id: $teamId) { states { nodes { id name type } } } }",
                json!({ "teamId": team_id }),
            )
            .await?;
        Ok(data["team"]["states"]["nodes"]
            .as_array()
            .map(|nodes| {
                nodes
                    .iter()
                    .filter_map(|n| {
                        Some(WorkflowState {
                            id: n.get("id")?.as_str()?.to_string(),
                            name: n.get("name")?.as_str()?.to_string(),
                            state_type: serde_json::from_value(n.get("type")?.clone())
                                .unwrap_or(StateType::Unknown),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_user(&self, query: &str) -> Result<Option<User>> {
        let data = self
            .graphql(
                "users",
                "query { users { nodes { id name email } } }",
                json!({}),
            )
            .await?;
        let needle = query.to_lowercase();
        let found = data["users"]["nodes"].as_array().and_then(|nodes| {
            nodes.iter().find_map(|n| {
                let name = n.get("name").and_then(|v| v.as_str()).unwrap_or("");
                let email = n.get("email").and_then(|v| v.as_str()).unwrap_or("");
                if name.to_lowercase().contains(&needle) || email.to_lowercase().contains(&needle) {
                    Some(User {
                        id: n.get("id")?.as_str()?.to_string(),
                        name: name.to_string(),
                    })
                } else {
                    None
                }
            })
        });
        Ok(found)
    }

    async fn get_issue(&self, identifier: &str) -> Result<Option<Issue>> {
        let query = format!(
            "query($id: String!) {{ issue(id: $id) {{ {ISSUE_FIELDS} }} }}"
        );
        let data = self
            .graphql("issue", &query, json!({ "id": identifier }))
            .await?;
        Ok(parse_issue(&data["issue"]))
    }

    async fn search_issues(&self, text: &str, limit: usize) -> Result<Vec<Issue>> {
        let query = format!(
            "query($q: String!, $n: Int!) {{ issueSearch(query: $q, first: $n) {{ nodes {{ {ISSUE_FIELDS} }} }} }}"
        );
        let data = self
            .graphql("search", &query, json!({ "q": text, "n": limit as i64 }))
            .await?;
        Ok(parse_issue_nodes(&data, &["issueSearch", "nodes"]))
    }

    async fn recent_active_issues(&self, limit: usize) -> Result<Vec<Issue>> {
        let query = format!(
            "query($n: Int!) {{ issues(first: $n, orderBy: updatedAt, \
             filter: {{ state: {{ type: {{ in: [\"started\", \"unstarted\"] }} }} }}) \
             {{ nodes {{ {ISSUE_FIELDS} }} }} }}"
        );
        let data = self
            .graphql("recent issues", &query, json!({ "n": limit as i64 }))
            .await?;
        Ok(parse_issue_nodes(&data, &["issues", "nodes"]))
    }

    async fn create_issue(&self, new: &NewIssue) -> Result<Issue> {
        let mut input = json!({
            "title": new.title,
            "description": new.description,
            "teamId": new.team_id,
        });
        if let Some(assignee) = &new.assignee_id {
            input["assigneeId"] = json!(assignee);
        }
        if !new.label_ids.is_empty() {
            input["labelIds"] = json!(new.label_ids);
        }
        if let Some(state) = &new.state_id {
            input["stateId"] = json!(state);
        }
        let query = format!(
            "mutation($input: IssueCreateInput!) {{ issueCreate(input: $input) \
             {{ success issue {{ {ISSUE_FIELDS} }} }} }}"
        );
        let data = self
            .graphql("issue create", &query, json!({ "input": input }))
            .await?;
        parse_issue(&data["issueCreate"]["issue"])
            .ok_or_else(|| anyhow::anyhow!("issue create returned no issue"))
    }

    async fn add_comment(&self, issue_id: &str, body: &str) -> Result<()> {
        self.graphql(
            "comment create",
            "mutation($issueId: String!, $body: String!) \
             { commentCreate(input: { issueId: $issueId, body: $body }) { success } }",
            json!({ "issueId": issue_id, "body": body }),
        )
        .await?;
        Ok(())
    }

    async fn attach_link(&self, issue_id: &str, url: &str, title: &str) -> Result<()> {
        self.graphql(
            "link attach",
            "mutation($issueId: String!, $url: String!, $title: String!) \
             { attachmentLinkURL(issueId: $issueId, url: $url, title: $title) { success } }",
            json!({ "issueId": issue_id, "url": url, "title": title }),
        )
        .await?;
        Ok(())
    }

    async fn update_state(&self, issue_id: &str, state_id: &str) -> Result<()> {
        self.graphql(
            "state update",
            "mutation($issueId: String!, $stateId: String!) \
             { issueUpdate(id: $issueId, input: { stateId: $stateId }) { success } }",
            json!({ "issueId": issue_id, "stateId": state_id }),
        )
        .await?;
        Ok(())
    }

    async fn assign(&self, issue_id: &str, user_id: &str) -> Result<()> {
        self.graphql(
            "assign",
            "mutation($issueId: String!, $assigneeId: String!) \
             { issueUpdate(id: $issueId, input: { assigneeId: $assigneeId }) { success } }",
            json!({ "issueId": issue_id, "assigneeId": user_id }),
        )
        .await?;
        Ok(())
    }

    async fn set_labels(&self, issue_id: &str, label_ids: &[String]) -> Result<()> {
        self.graphql(
            "labels update",
            "mutation($issueId: String!, $labelIds: [String!]!) \
             { issueUpdate(id: $issueId, input: { labelIds: $labelIds }) { success } }",
            json!({ "issueId": issue_id, "labelIds": label_ids }),
        )
        .await?;
        Ok(())
    }
}
