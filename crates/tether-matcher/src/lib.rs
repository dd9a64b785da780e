//! Hybrid issue matcher.
//!
//! Resolution order: branch-pattern extraction (free, authoritative), then
//! keyword search against the tracker, then LLM-scored semantic ranking of
//! the candidate set. A match is only returned above the configured
//! confidence threshold; everything below resolves to "no match", which the
//! caller treats as a signal to create a fresh issue.

pub mod limiter;
pub mod score;
pub mod semantic;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;
use tether_core::config::MatcherConfig;
use tether_core::issue::{Issue, MatchResult, MatchType};
use tether_llm::Llm;
use tether_tracker::Tracker;
use tether_transcript::extract::SessionContent;

use limiter::TokenBucket;
use score::{keyword_score, state_bonus};

/// Minimum primary-request length for keyword matching to be meaningful.
const MIN_PRIMARY_CHARS: usize = 20;
/// Minimum transcript entries before keyword matching kicks in.
const MIN_ENTRIES: usize = 2;
/// Semantic scores below this are treated as noise.
const MIN_SEMANTIC_SCORE: f64 = 0.3;

pub struct Matcher {
    tracker: Arc<dyn Tracker>,
    llm: Arc<dyn Llm>,
    config: MatcherConfig,
    branch_re: Regex,
    limiter: TokenBucket,
    /// session_id → resolved match, for the life of the process.
    cache: tokio::sync::Mutex<HashMap<String, MatchResult>>,
}

struct Candidate {
    issue: Issue,
    keyword_score: f64,
    matched_keywords: Vec<String>,
    semantic_score: Option<f64>,
    reasoning: Option<String>,
}

impl Matcher {
    pub fn new(
        tracker: Arc<dyn Tracker>,
        llm: Arc<dyn Llm>,
        config: MatcherConfig,
    ) -> Result<Self> {
        let branch_re = Regex::new(&config.branch_pattern)
            .with_context(|| format!("invalid branch pattern: {}", config.branch_pattern))?;
        let limiter = TokenBucket::per_minute(config.max_api_calls_per_minute);
        Ok(Self {
            tracker,
            llm,
            config,
            branch_re,
            limiter,
            cache: tokio::sync::Mutex::new(HashMap::new()),
        })
    }

    /// Capture group 1 of the branch pattern at its first match.
    pub fn extract_identifier(&self, branch: &str) -> Option<String> {
        self.branch_re
            .captures(branch)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Resolve from a branch name alone (no session content available).
    pub async fn resolve_branch(&self, branch: &str) -> Result<Option<MatchResult>> {
        let identifier = match self.extract_identifier(branch) {
            Some(id) => id,
            None => return Ok(None),
        };
        let issue = match self.tracker.get_issue(&identifier).await? {
            Some(issue) => issue,
            None => return Ok(None),
        };
        Ok(Some(MatchResult {
            issue,
            confidence: 1.0,
            match_type: MatchType::Exact,
            keyword_score: 0.0,
            semantic_score: None,
            matched_keywords: Vec::new(),
            reasoning: None,
        }))
    }

    /// Resolve extracted session content to an issue, or nothing.
    pub async fn resolve(&self, content: &SessionContent) -> Result<Option<MatchResult>> {
        if !content.session_id.is_empty() {
            if let Some(cached) = self.cache.lock().await.get(&content.session_id) {
                return Ok(Some(cached.clone()));
            }
        }

        // 1. Exact branch hit wins outright; no tracker search, no LLM.
        if let Some(branch) = content.git_branch.as_deref() {
            if let Some(result) = self.resolve_branch(branch).await? {
                return Ok(Some(self.remember(content, result).await));
            }
        }

        // 2. Too little signal for fuzzy matching.
        if content.primary_request.chars().count() < MIN_PRIMARY_CHARS
            || content.entry_count < MIN_ENTRIES
        {
            return Ok(None);
        }

        // 3. Keyword candidates.
        self.limiter.acquire().await;
        let issues = self.gather_candidates(content).await;
        if issues.is_empty() {
            return Ok(None);
        }

        let mut candidates: Vec<Candidate> = issues
            .into_iter()
            .map(|issue| {
                let (kw, matched) = keyword_score(content, &issue);
                Candidate {
                    issue,
                    keyword_score: kw,
                    matched_keywords: matched,
                    semantic_score: None,
                    reasoning: None,
                }
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.keyword_score
                .partial_cmp(&a.keyword_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(self.config.max_candidates);

        // 4. Semantic ranking; any failure degrades to keyword-only.
        if self.config.enable_semantic && !candidates.is_empty() {
            self.limiter.acquire().await;
            let issues: Vec<Issue> = candidates.iter().map(|c| c.issue.clone()).collect();
            let prompt = semantic::build_match_prompt(content, &issues);
            if let Ok(ranked) = self.llm.match_issues(&prompt).await {
                for entry in ranked.matches {
                    if entry.relevance_score < MIN_SEMANTIC_SCORE {
                        continue;
                    }
                    if let Some(cand) = candidates
                        .iter_mut()
                        .find(|c| c.issue.id == entry.issue_id || c.issue.identifier == entry.issue_id)
                    {
                        cand.semantic_score = Some(entry.relevance_score);
                        cand.reasoning = entry.reasoning;
                    }
                }
            }
        }

        // 5. Combine and accept above threshold.
        let best = candidates
            .into_iter()
            .map(|c| self.combine(c))
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        match best {
            Some(result) if result.confidence >= self.config.confidence_threshold => {
                Ok(Some(self.remember(content, result).await))
            }
            _ => Ok(None),
        }
    }

    async fn remember(&self, content: &SessionContent, result: MatchResult) -> MatchResult {
        if !content.session_id.is_empty() {
            self.cache
                .lock()
                .await
                .insert(content.session_id.clone(), result.clone());
        }
        result
    }

    /// Up to three concurrent searches; merged by identifier. All-empty falls
    /// back to recently updated active issues. Search errors degrade to
    /// empty rather than failing the record.
    async fn gather_candidates(&self, content: &SessionContent) -> Vec<Issue> {
        let limit = self.config.max_candidates;

        let compact = {
            let mut parts: Vec<&str> = Vec::new();
            if !content.project_name.is_empty() {
                parts.push(content.project_name.as_str());
            }
            parts.extend(content.keywords.iter().take(5).map(|s| s.as_str()));
            parts.join(" ")
        };
        let primary = {
            let end = tether_core::text::floor_char_boundary(&content.primary_request, 100);
            content.primary_request[..end].to_string()
        };
        let project = content.project_name.clone();

        let (a, b, c) = tokio::join!(
            self.search_or_empty(&compact, limit),
            self.search_or_empty(&primary, limit),
            self.search_or_empty(&project, limit),
        );

        let mut merged: Vec<Issue> = Vec::new();
        for issue in a.into_iter().chain(b).chain(c) {
            if !merged.iter().any(|i| i.identifier == issue.identifier) {
                merged.push(issue);
            }
        }

        if merged.is_empty() {
            merged = self
                .tracker
                .recent_active_issues(limit)
                .await
                .unwrap_or_default();
        }
        merged
    }

    async fn search_or_empty(&self, query: &str, limit: usize) -> Vec<Issue> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        self.tracker
            .search_issues(query, limit)
            .await
            .unwrap_or_default()
    }

    fn combine(&self, cand: Candidate) -> MatchResult {
        let bonus = state_bonus(&cand.issue.state.name);
        let adjusted = (cand.keyword_score + 0.1 * bonus).min(1.0);

        let (confidence, match_type) = match cand.semantic_score {
            Some(sem) => {
                let denom = self.config.keyword_weight + self.config.semantic_weight;
                let conf = if denom > 0.0 {
                    adjusted * self.config.keyword_weight / denom
                        + sem * self.config.semantic_weight / denom
                } else {
                    adjusted
                };
                let mt = if cand.keyword_score > 0.3 {
                    MatchType::Hybrid
                } else {
                    MatchType::Semantic
                };
                (conf, mt)
            }
            None => (adjusted, MatchType::Keyword),
        };

        MatchResult {
            issue: cand.issue,
            confidence: confidence.min(1.0),
            match_type,
            keyword_score: cand.keyword_score,
            semantic_score: cand.semantic_score,
            matched_keywords: cand.matched_keywords,
            reasoning: cand.reasoning,
        }
    }
}
