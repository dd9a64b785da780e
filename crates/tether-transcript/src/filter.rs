use serde_json::Value;

/// Markers injected by the agent host that carry no session content.
const NOISE_MARKERS: &[&str] = &[
    "<system-reminder>",
    "<local-command>",
    "<user-prompt-submit-hook>",
];

/// Keys under which tool inputs carry file paths.
pub(crate) const PATH_KEYS: &[&str] = &["file_path", "path", "filePath", "file"];

/// Keep `user` and `assistant` entries that are not host noise.
///
/// Idempotent: filtering an already-filtered list is a no-op.
pub fn filter_entries(entries: &[Value]) -> Vec<Value> {
    entries
        .iter()
        .filter(|e| is_conversation(e) && !is_noise(e))
        .cloned()
        .collect()
}

fn is_conversation(entry: &Value) -> bool {
    matches!(
        entry.get("type").and_then(|t| t.as_str()),
        Some("user") | Some("assistant")
    )
}

fn is_noise(entry: &Value) -> bool {
    let text = entry_text(entry);
    if NOISE_MARKERS.iter().any(|m| text.contains(m)) {
        return true;
    }
    entry_paths(entry)
        .iter()
        .any(|p| p.starts_with("subagents/") || p.contains("/subagents/"))
}

/// All textual content of an entry: a user string message, or the text and
/// thinking blocks of an assistant message.
pub(crate) fn entry_text(entry: &Value) -> String {
    let content = match entry.get("message").and_then(|m| m.get("content")) {
        Some(c) => c,
        None => return String::new(),
    };
    if let Some(s) = content.as_str() {
        return s.to_string();
    }
    let mut texts: Vec<&str> = Vec::new();
    if let Some(blocks) = content.as_array() {
        for block in blocks {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("text") | Some("thinking") => {
                    if let Some(t) = block
                        .get("text")
                        .or_else(|| block.get("thinking"))
                        .and_then(|t| t.as_str())
                    {
                        texts.push(t);
                    }
                }
                _ => {}
            }
        }
    }
    texts.join("\n")
}

/// File paths referenced by an entry's tool-use inputs.
pub(crate) fn entry_paths(entry: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    let blocks = match entry
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_array())
    {
        Some(b) => b,
        None => return paths,
    };
    for block in blocks {
        if block.get("type").and_then(|t| t.as_str()) != Some("tool_use") {
            continue;
        }
        let input = match block.get("input") {
            Some(i) => i,
            None => continue,
        };
        for key in PATH_KEYS {
            if let Some(p) = input.get(*key).and_then(|v| v.as_str()) {
                paths.push(p.to_string());
            }
        }
    }
    paths
}
