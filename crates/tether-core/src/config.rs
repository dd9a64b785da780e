use serde::{Deserialize, Serialize};

/// Read an env var and parse it, falling back to `default`.
pub fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

// ── Matcher configuration ──

/// Knobs for the hybrid issue matcher. All have defaults; see `from_env`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    pub keyword_weight: f64,
    pub semantic_weight: f64,
    pub confidence_threshold: f64,
    pub max_candidates: usize,
    pub enable_semantic: bool,
    /// Regex whose capture group 1 yields the issue identifier from a branch.
    pub branch_pattern: String,
    pub max_api_calls_per_minute: u32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            keyword_weight: 0.6,
            semantic_weight: 0.4,
            confidence_threshold: 0.7,
            max_candidates: 10,
            enable_semantic: true,
            branch_pattern: r"([A-Z]+-\d+)".to_string(),
            max_api_calls_per_minute: 30,
        }
    }
}

impl MatcherConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            keyword_weight: env_parse("TETHER_KEYWORD_WEIGHT", d.keyword_weight),
            semantic_weight: env_parse("TETHER_SEMANTIC_WEIGHT", d.semantic_weight),
            confidence_threshold: env_parse("TETHER_CONFIDENCE_THRESHOLD", d.confidence_threshold),
            max_candidates: env_parse("TETHER_MAX_CANDIDATES", d.max_candidates),
            enable_semantic: env_string("TETHER_SEMANTIC", "1") != "0",
            branch_pattern: env_string("TETHER_BRANCH_PATTERN", &d.branch_pattern),
            max_api_calls_per_minute: env_parse(
                "TETHER_API_CALLS_PER_MINUTE",
                d.max_api_calls_per_minute,
            ),
        }
    }
}

// ── Daemon configuration ──

/// Settings for the queue processor and its transports.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub tracker_url: String,
    /// Opaque credential; format is the tracker's concern.
    pub tracker_token: String,
    /// Assignee name or email fragment; empty means "use the viewer".
    pub assignee: String,
    pub llm_command: String,
    pub llm_timeout_secs: u64,
    pub max_retries: u32,
    pub poll_interval_ms: u64,
    pub cleanup_hours: u64,
}

impl DaemonConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let tracker_token = std::env::var("TETHER_TRACKER_TOKEN")
            .map_err(|_| anyhow::anyhow!("TETHER_TRACKER_TOKEN is not set"))?;
        Ok(Self {
            tracker_url: env_string("TETHER_TRACKER_URL", "https://api.linear.app/graphql"),
            tracker_token,
            assignee: env_string("TETHER_ASSIGNEE", ""),
            llm_command: env_string("TETHER_LLM_CMD", "claude -p"),
            llm_timeout_secs: env_parse("TETHER_LLM_TIMEOUT_SECS", 60),
            max_retries: env_parse("TETHER_MAX_RETRIES", 3),
            poll_interval_ms: env_parse("TETHER_POLL_MS", 500),
            cleanup_hours: env_parse("TETHER_CLEANUP_HOURS", 24),
        })
    }
}
