use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tether_core::config::{DaemonConfig, MatcherConfig};
use tether_core::issue::{Label, Team, User, WorkflowState};
use tether_llm::Llm;
use tether_matcher::Matcher;
use tether_queue::{Payload, Queue, QueueRecord, Status};
use tether_tracker::Tracker;
use tokio_util::sync::CancellationToken;

/// Tracker metadata fetched once at startup. Sessions within one daemon
/// lifetime see a consistent view of labels and states.
pub struct Caches {
    pub viewer: User,
    /// Default assignee: the configured user when found, else the viewer.
    pub assignee: User,
    pub team: Option<Team>,
    pub labels: Vec<Label>,
    pub states: Vec<WorkflowState>,
}

impl Caches {
    /// First state whose name contains `in progress`, else one containing
    /// `started` (but not `unstarted`).
    pub fn in_progress_state(&self) -> Option<&WorkflowState> {
        self.state_containing("in progress").or_else(|| {
            self.states.iter().find(|s| {
                let n = s.name.to_lowercase();
                n.contains("started") && !n.contains("unstarted")
            })
        })
    }

    /// First state whose name contains `in review`, else `review`.
    pub fn review_state(&self) -> Option<&WorkflowState> {
        self.state_containing("in review")
            .or_else(|| self.state_containing("review"))
    }

    fn state_containing(&self, needle: &str) -> Option<&WorkflowState> {
        self.states
            .iter()
            .find(|s| s.name.to_lowercase().contains(needle))
    }
}

pub struct Processor {
    pub(crate) queue: Queue,
    pub(crate) tracker: Arc<dyn Tracker>,
    pub(crate) llm: Arc<dyn Llm>,
    pub(crate) matcher: Matcher,
    pub(crate) caches: Caches,
    pub(crate) config: DaemonConfig,
    draining: AtomicBool,
}

impl Processor {
    /// Authenticate and prefetch caches: viewer → team → labels → states.
    pub async fn start(
        queue: Queue,
        tracker: Arc<dyn Tracker>,
        llm: Arc<dyn Llm>,
        matcher_config: MatcherConfig,
        config: DaemonConfig,
    ) -> Result<Self> {
        let viewer = tracker
            .get_viewer()
            .await
            .context("tracker authentication failed")?;
        let assignee = if config.assignee.is_empty() {
            viewer.clone()
        } else {
            tracker
                .find_user(&config.assignee)
                .await?
                .unwrap_or_else(|| viewer.clone())
        };
        let team = tracker.list_teams().await?.into_iter().next();
        let (labels, states) = match &team {
            Some(team) => (
                tracker.list_labels(&team.id).await?,
                tracker.list_states(&team.id).await?,
            ),
            None => (Vec::new(), Vec::new()),
        };
        if team.is_none() {
            tracing::warn!("tracker reports no team; issue creation will fail");
        }
        tracing::info!(
            assignee = %assignee.name,
            labels = labels.len(),
            states = states.len(),
            "tracker caches primed"
        );

        let matcher = Matcher::new(tracker.clone(), llm.clone(), matcher_config)?;
        Ok(Self {
            queue,
            tracker,
            llm,
            matcher,
            caches: Caches {
                viewer,
                assignee,
                team,
                labels,
                states,
            },
            config,
            draining: AtomicBool::new(false),
        })
    }

    /// Watch the queue file and drain on change until cancelled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        tracing::info!(queue = %self.queue.path().display(), "processor started");
        if let Err(e) = self.drain().await {
            tracing::error!("initial drain failed: {e:#}");
        }

        let mut poll = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));
        let mut cleanup = tokio::time::interval(Duration::from_secs(3600));
        let mut last_seen = file_signature(self.queue.path());

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("shutdown signal; processor exiting");
                    break;
                }
                _ = poll.tick() => {
                    let sig = file_signature(self.queue.path());
                    if sig != last_seen {
                        last_seen = sig;
                        if let Err(e) = self.drain().await {
                            tracing::error!("drain failed: {e:#}");
                        }
                    }
                }
                _ = cleanup.tick() => {
                    match self.queue.cleanup_old(self.config.cleanup_hours) {
                        Ok(0) => {}
                        Ok(n) => tracing::info!("cleaned up {n} processed records"),
                        Err(e) => tracing::warn!("queue cleanup failed: {e:#}"),
                    }
                }
            }
        }
        Ok(())
    }

    /// One drain pass: pending records in file order, then retry-eligible
    /// failures (skipping records already attempted this pass). Non-reentrant;
    /// a pass already in flight makes this a no-op.
    pub async fn drain(&self) -> Result<()> {
        if self.draining.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let result = self.drain_inner().await;
        self.draining.store(false, Ordering::SeqCst);
        result
    }

    async fn drain_inner(&self) -> Result<()> {
        let mut attempted: Vec<String> = Vec::new();

        for record in self.queue.read_pending()? {
            attempted.push(record.id.clone());
            self.process_record(&record).await;
        }
        for record in self.queue.read_retryable(self.config.max_retries)? {
            if attempted.contains(&record.id) {
                continue;
            }
            self.process_record(&record).await;
        }
        Ok(())
    }

    /// Per-record boundary: mark processing, dispatch, then mark the outcome.
    /// Every handler error becomes a `failed` status, never a propagated
    /// panic or a poisoned drain.
    async fn process_record(&self, record: &QueueRecord) {
        tracing::info!(id = %record.id, kind = record.payload.kind(), "processing record");
        if let Err(e) = self.queue.update_status(&record.id, Status::Processing, None) {
            tracing::error!(id = %record.id, "failed to mark processing: {e:#}");
            return;
        }
        match self.dispatch(record).await {
            Ok(note) => {
                if let Some(note) = &note {
                    tracing::info!(id = %record.id, "processed: {note}");
                }
                if let Err(e) =
                    self.queue
                        .update_status(&record.id, Status::Processed, note.as_deref())
                {
                    tracing::error!(id = %record.id, "failed to mark processed: {e:#}");
                }
            }
            Err(e) => {
                let msg = format!("{e:#}");
                tracing::error!(id = %record.id, "record failed: {msg}");
                if let Err(e) = self.queue.update_status(&record.id, Status::Failed, Some(&msg)) {
                    tracing::error!(id = %record.id, "failed to mark failed: {e:#}");
                }
            }
        }
    }

    async fn dispatch(&self, record: &QueueRecord) -> Result<Option<String>> {
        match &record.payload {
            Payload::SessionStop {
                session_id,
                transcript_path,
                cwd,
            } => crate::session::handle_session_stop(self, session_id, transcript_path, cwd).await,
            Payload::PrCreated {
                session_id,
                pr_url,
                cwd,
            } => crate::pr::handle_pr_created(self, session_id, pr_url, cwd).await,
            // Hard failure: the failed-status path records the error and the
            // retry budget caps reprocessing.
            Payload::Unknown => anyhow::bail!("unknown queue record kind"),
        }
    }
}

/// Cheap change signature for the queue file: (mtime, length).
fn file_signature(path: &std::path::Path) -> Option<(std::time::SystemTime, u64)> {
    let meta = std::fs::metadata(path).ok()?;
    Some((meta.modified().ok()?, meta.len()))
}
