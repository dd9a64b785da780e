//! LLM transport: a single `complete(prompt) → text` capability, executed by
//! spawning an external command with the prompt as its final argument.
//!
//! Derived operations (`complete_json`, `match_issues`) parse the first JSON
//! object out of the reply, tolerating prose around it.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// One semantic-ranking entry returned by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueMatch {
    pub issue_id: String,
    pub relevance_score: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub matched_aspects: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueMatches {
    #[serde(default)]
    pub matches: Vec<IssueMatch>,
}

#[async_trait]
pub trait Llm: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Complete, then parse the first `{…}` object in the reply.
    async fn complete_json(&self, prompt: &str) -> Result<serde_json::Value> {
        let text = self.complete(prompt).await?;
        let json = extract_first_object(&text)
            .ok_or_else(|| anyhow::anyhow!("llm reply contained no JSON object"))?;
        serde_json::from_str(json).context("llm reply JSON did not parse")
    }

    /// Complete, then parse the typed matches object.
    async fn match_issues(&self, prompt: &str) -> Result<IssueMatches> {
        let value = self.complete_json(prompt).await?;
        serde_json::from_value(value).context("llm matches object had wrong shape")
    }
}

/// Find the first balanced `{…}` substring, skipping braces inside strings.
pub fn extract_first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

// ── Subprocess transport ──

/// Runs the configured command with the prompt appended as one argument,
/// under a wall-clock timeout. Exceeding the timeout kills the subprocess.
pub struct CommandLlm {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandLlm {
    /// `command_line` is whitespace-split into program + base args, e.g.
    /// `"claude -p"`.
    pub fn new(command_line: &str, timeout_secs: u64) -> Result<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty llm command"))?
            .to_string();
        Ok(Self {
            program,
            args: parts.map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[async_trait]
impl Llm for CommandLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn llm command {:?}", self.program))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("failed to capture llm stdout"))?;

        tokio::select! {
            read = async {
                let mut out = String::new();
                stdout.read_to_string(&mut out).await.map(|_| out)
            } => {
                let out = read.context("failed reading llm stdout")?;
                let status = child.wait().await?;
                if !status.success() {
                    bail!("llm command exited with {status}");
                }
                Ok(out.trim().to_string())
            }
            _ = tokio::time::sleep(self.timeout) => {
                child.kill().await.ok();
                bail!("llm command timed out after {}s", self.timeout.as_secs());
            }
        }
    }
}

// ── Test double ──

/// Scripted double: pops queued replies in order. An empty queue answers with
/// a canned line; `fail` makes every call error (transport failure paths).
#[derive(Default)]
pub struct MockLlm {
    replies: std::sync::Mutex<Vec<String>>,
    pub fail: std::sync::atomic::AtomicBool,
    pub calls: std::sync::atomic::AtomicUsize,
}

impl MockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, reply: &str) -> Self {
        self.push_reply(reply);
        self
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push(reply.to_string());
    }
}

#[async_trait]
impl Llm for MockLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            bail!("mock llm transport failure");
        }
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            Ok("(mock) no reply configured".to_string())
        } else {
            Ok(replies.remove(0))
        }
    }
}
