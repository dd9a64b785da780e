//! Event hooks: short-lived entrypoints invoked by the coding-assistant host
//! at session boundaries.
//!
//! A hook does exactly one thing (append a queue record) and answers
//! `{"decision":"continue"}` on stdout. It must never block or fail the
//! caller: internal errors go to stderr and are swallowed.

use anyhow::Result;
use serde_json::Value;
use tether_queue::{Payload, Queue};

/// The only decision the hooks ever emit.
pub const CONTINUE: &str = r#"{"decision":"continue"}"#;

/// Session-stop hook: append one `session_stop` record.
pub fn handle_session_stop(queue: &Queue, stdin: &str) -> String {
    if let Err(e) = append_session_stop(queue, stdin) {
        eprintln!("[tether] session-stop hook error: {e:#}");
    }
    CONTINUE.to_string()
}

/// Post-tool-use hook: when the shell tool just ran `gh pr create` and its
/// response carries a pull-request URL, append one `pr_created` record.
/// Everything else is a no-op.
pub fn handle_post_tool_use(queue: &Queue, stdin: &str) -> String {
    if let Err(e) = maybe_append_pr(queue, stdin) {
        eprintln!("[tether] post-tool-use hook error: {e:#}");
    }
    CONTINUE.to_string()
}

fn append_session_stop(queue: &Queue, stdin: &str) -> Result<()> {
    let raw: Value = serde_json::from_str(stdin)?;
    queue.append(Payload::SessionStop {
        session_id: get_str(&raw, "session_id"),
        transcript_path: get_str(&raw, "transcript_path"),
        cwd: get_str(&raw, "cwd"),
    })?;
    Ok(())
}

fn maybe_append_pr(queue: &Queue, stdin: &str) -> Result<()> {
    let raw: Value = serde_json::from_str(stdin)?;
    if get_str(&raw, "tool_name") != "Bash" {
        return Ok(());
    }
    let command = get_field(&raw, "tool_input")
        .and_then(|i| i.get("command"))
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string();
    if !command.contains("gh pr create") {
        return Ok(());
    }
    let response_text = match get_field(&raw, "tool_response") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => return Ok(()),
    };
    let pr_url = match find_pr_url(&response_text) {
        Some(url) => url,
        None => return Ok(()),
    };
    queue.append(Payload::PrCreated {
        session_id: get_str(&raw, "session_id"),
        pr_url,
        cwd: get_str(&raw, "cwd"),
    })?;
    Ok(())
}

/// First GitHub pull-request URL in the text, if any.
pub fn find_pr_url(text: &str) -> Option<String> {
    let re = regex::Regex::new(r"https://github\.com/[^/\s]+/[^/\s]+/pull/\d+").ok()?;
    re.find(text).map(|m| m.as_str().to_string())
}

/// String field access tolerating both snake_case and camelCase keys.
/// The host sends camelCase; tests and fixtures use snake_case.
fn get_str(v: &Value, snake_key: &str) -> String {
    get_field(v, snake_key)
        .and_then(|x| x.as_str())
        .unwrap_or("")
        .to_string()
}

fn get_field<'a>(v: &'a Value, snake_key: &str) -> Option<&'a Value> {
    if let Some(x) = v.get(snake_key) {
        return Some(x);
    }
    v.get(snake_to_camel(snake_key))
}

fn snake_to_camel(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = false;
    for ch in s.chars() {
        if ch == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.extend(ch.to_uppercase());
            capitalize_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}
