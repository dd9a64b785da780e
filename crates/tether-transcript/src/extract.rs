use std::collections::BTreeSet;
use std::path::Path;

use serde_json::Value;

use crate::filter::{entry_text, PATH_KEYS};

/// Tokens carrying no matching signal on their own.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "that", "this", "with", "you", "your", "are", "was", "were", "have",
    "has", "had", "not", "but", "can", "could", "should", "would", "will", "please", "just",
    "need", "want", "make", "sure", "then", "them", "they", "there", "here", "when", "what",
    "where", "why", "how", "all", "any", "some", "into", "from", "out", "about", "also", "use",
    "using", "get", "its", "let", "lets", "new",
];

/// Structured content pulled from one session transcript.
#[derive(Debug, Clone, Default)]
pub struct SessionContent {
    /// First user message, verbatim.
    pub primary_request: String,
    /// Subsequent user messages, in order.
    pub additional_context: Vec<String>,
    /// Lowercase tokens from user text minus stop words, plus the project
    /// name and edited-file base names.
    pub keywords: Vec<String>,
    pub cwd: String,
    /// Last path segment of `cwd`.
    pub project_name: String,
    /// Lowercase set of tool names the assistant invoked.
    pub tool_patterns: BTreeSet<String>,
    /// File paths found in tool inputs.
    pub file_paths: BTreeSet<String>,
    pub session_id: String,
    pub time_range: TimeRange,
    /// Branch reported by the agent, if any user entry carried one.
    pub git_branch: Option<String>,
    /// Number of kept (user + assistant) entries the content was built from.
    pub entry_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TimeRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl SessionContent {
    /// All user messages in order: primary request first.
    pub fn user_messages(&self) -> Vec<&str> {
        let mut msgs = Vec::with_capacity(1 + self.additional_context.len());
        if !self.primary_request.is_empty() {
            msgs.push(self.primary_request.as_str());
        }
        msgs.extend(self.additional_context.iter().map(|s| s.as_str()));
        msgs
    }
}

/// Build `SessionContent` from filtered entries. `record_cwd` is the hook's
/// working directory, used when no user entry carries one.
pub fn extract_content(entries: &[Value], session_id: &str, record_cwd: &str) -> SessionContent {
    let mut content = SessionContent {
        session_id: session_id.to_string(),
        cwd: record_cwd.to_string(),
        entry_count: entries.len(),
        ..Default::default()
    };

    let mut user_texts: Vec<String> = Vec::new();

    for entry in entries {
        if let Some(ts) = entry.get("timestamp").and_then(|t| t.as_str()) {
            if content.time_range.start.is_none() {
                content.time_range.start = Some(ts.to_string());
            }
            content.time_range.end = Some(ts.to_string());
        }

        match entry.get("type").and_then(|t| t.as_str()) {
            Some("user") => {
                if let Some(cwd) = entry.get("cwd").and_then(|c| c.as_str()) {
                    if !cwd.is_empty() {
                        content.cwd = cwd.to_string();
                    }
                }
                if let Some(branch) = entry.get("git_branch").and_then(|b| b.as_str()) {
                    if !branch.is_empty() {
                        content.git_branch = Some(branch.to_string());
                    }
                }
                let text = entry_text(entry);
                if !text.is_empty() {
                    user_texts.push(text);
                }
            }
            Some("assistant") => {
                collect_tool_signals(entry, &mut content);
            }
            _ => {}
        }
    }

    if let Some((first, rest)) = user_texts.split_first() {
        content.primary_request = first.clone();
        content.additional_context = rest.to_vec();
    }

    content.project_name = project_name_of(&content.cwd);
    let keywords = build_keywords(&content, &user_texts);
    content.keywords = keywords;
    content
}

fn collect_tool_signals(entry: &Value, content: &mut SessionContent) {
    let blocks = match entry
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_array())
    {
        Some(b) => b,
        None => return,
    };
    for block in blocks {
        if block.get("type").and_then(|t| t.as_str()) != Some("tool_use") {
            continue;
        }
        if let Some(name) = block.get("name").and_then(|n| n.as_str()) {
            content.tool_patterns.insert(name.to_lowercase());
        }
        if let Some(input) = block.get("input") {
            for key in PATH_KEYS {
                if let Some(p) = input.get(*key).and_then(|v| v.as_str()) {
                    content.file_paths.insert(p.to_string());
                }
            }
        }
    }
}

fn project_name_of(cwd: &str) -> String {
    Path::new(cwd)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn build_keywords(content: &SessionContent, user_texts: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut keywords = Vec::new();
    let mut push = |word: String| {
        if word.len() > 2 && !STOP_WORDS.contains(&word.as_str()) && seen.insert(word.clone()) {
            keywords.push(word);
        }
    };

    for text in user_texts {
        for token in tokenize(text) {
            push(token);
        }
    }
    if !content.project_name.is_empty() {
        push(content.project_name.to_lowercase());
    }
    for path in &content.file_paths {
        if let Some(stem) = Path::new(path).file_stem() {
            push(stem.to_string_lossy().to_lowercase());
        }
    }
    keywords
}

/// Lowercase alphanumeric tokens (plus `-`/`_` inside words).
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '-' && c != '_')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(text: &str, ts: &str) -> Value {
        json!({
            "type": "user",
            "session_id": "s1",
            "timestamp": ts,
            "cwd": "/home/u/proj/web",
            "git_branch": "feature/ENG-123-add-login",
            "message": {"role": "user", "content": text}
        })
    }

    fn assistant_tools() -> Value {
        json!({
            "type": "assistant",
            "session_id": "s1",
            "timestamp": "2025-01-01T00:01:00Z",
            "message": {"role": "assistant", "content": [
                {"type": "text", "text": "on it"},
                {"type": "tool_use", "name": "Edit", "input": {"file_path": "/home/u/proj/web/src/login.ts"}},
                {"type": "tool_use", "name": "Bash", "input": {"command": "npm test"}}
            ]}
        })
    }

    #[test]
    fn extracts_primary_and_additional() {
        let entries = vec![
            user("fix the login redirect bug", "2025-01-01T00:00:00Z"),
            assistant_tools(),
            user("also add a test for it", "2025-01-01T00:02:00Z"),
        ];
        let content = extract_content(&entries, "s1", "/fallback");

        assert_eq!(content.primary_request, "fix the login redirect bug");
        assert_eq!(content.additional_context, vec!["also add a test for it"]);
        assert_eq!(content.cwd, "/home/u/proj/web");
        assert_eq!(content.project_name, "web");
        assert_eq!(content.entry_count, 3);
        assert_eq!(
            content.git_branch.as_deref(),
            Some("feature/ENG-123-add-login")
        );
        assert_eq!(
            content.time_range.start.as_deref(),
            Some("2025-01-01T00:00:00Z")
        );
        assert_eq!(
            content.time_range.end.as_deref(),
            Some("2025-01-01T00:02:00Z")
        );
    }

    #[test]
    fn keywords_skip_stop_words_and_include_project_and_files() {
        let entries = vec![
            user("fix the login redirect bug", "2025-01-01T00:00:00Z"),
            assistant_tools(),
        ];
        let content = extract_content(&entries, "s1", "/fallback");

        assert!(content.keywords.contains(&"login".to_string()));
        assert!(content.keywords.contains(&"redirect".to_string()));
        assert!(content.keywords.contains(&"web".to_string()));
        // base name of the edited file
        assert!(content.keywords.contains(&"login".to_string()));
        assert!(!content.keywords.contains(&"the".to_string()));
        assert!(!content.keywords.iter().any(|k| k.len() <= 2));
    }

    #[test]
    fn tool_patterns_are_lowercase() {
        let entries = vec![assistant_tools()];
        let content = extract_content(&entries, "s1", "/w");
        assert!(content.tool_patterns.contains("edit"));
        assert!(content.tool_patterns.contains("bash"));
    }

    #[test]
    fn file_paths_collected_from_known_keys() {
        let entry = json!({
            "type": "assistant",
            "message": {"content": [
                {"type": "tool_use", "name": "Read", "input": {"path": "/a.rs"}},
                {"type": "tool_use", "name": "Open", "input": {"filePath": "/b.rs"}},
                {"type": "tool_use", "name": "Load", "input": {"file": "/c.rs"}}
            ]}
        });
        let content = extract_content(&[entry], "s1", "/w");
        assert_eq!(content.file_paths.len(), 3);
    }

    #[test]
    fn cwd_falls_back_to_record() {
        let entry = json!({"type": "assistant", "message": {"content": []}});
        let content = extract_content(&[entry], "s1", "/home/u/proj/api");
        assert_eq!(content.cwd, "/home/u/proj/api");
        assert_eq!(content.project_name, "api");
    }

    #[test]
    fn user_messages_orders_primary_first() {
        let entries = vec![
            user("first", "2025-01-01T00:00:00Z"),
            user("second", "2025-01-01T00:01:00Z"),
        ];
        let content = extract_content(&entries, "s1", "/w");
        assert_eq!(content.user_messages(), vec!["first", "second"]);
    }

    #[test]
    fn empty_entries_yield_empty_content() {
        let content = extract_content(&[], "s1", "/w");
        assert!(content.primary_request.is_empty());
        assert_eq!(content.entry_count, 0);
        assert!(content.time_range.start.is_none());
    }
}
