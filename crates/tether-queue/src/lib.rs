//! Durable work queue: append-only NDJSON on local disk.
//!
//! Producers (event hooks) append one line per record; the single consumer
//! (the daemon) rewrites the file to advance record status. Invalid lines are
//! skipped on read, so a torn producer write cannot poison the queue.

mod record;

pub use record::{Payload, QueueRecord, Status};

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Handle on the queue file. Cheap to clone paths around; holds no fd.
#[derive(Debug, Clone)]
pub struct Queue {
    path: PathBuf,
}

impl Queue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Queue at the per-user data home (`<data_home>/queue.jsonl`).
    pub fn open_default() -> Self {
        Self::new(tether_core::store::queue_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Assigns a fresh id and timestamp, status `pending`.
    ///
    /// The line (including trailing newline) goes out in a single write so
    /// that concurrent producer appends interleave at line granularity.
    pub fn append(&self, payload: Payload) -> Result<QueueRecord> {
        let record = QueueRecord {
            id: tether_core::new_record_id(),
            timestamp: tether_core::now_rfc3339(),
            status: Status::Pending,
            retry_count: 0,
            error: None,
            payload,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = format!("{}\n", serde_json::to_string(&record)?);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(record)
    }

    /// Load every parseable record, in file order. Blank and invalid lines
    /// are ignored. A missing file is an empty queue.
    ///
    /// "Invalid" means torn or non-record JSON. A well-formed record whose
    /// `kind` is unrecognized parses as [`Payload::Unknown`] and is kept, so
    /// it still shows up in listings and walks the failed/retry lifecycle.
    pub fn read_all(&self) -> Result<Vec<QueueRecord>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect())
    }

    pub fn read_pending(&self) -> Result<Vec<QueueRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.status == Status::Pending)
            .collect())
    }

    /// Failed records that have retry budget left.
    pub fn read_retryable(&self, max_retries: u32) -> Result<Vec<QueueRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.status == Status::Failed && r.retry_count < max_retries)
            .collect())
    }

    /// Rewrite the file with the target record's status changed.
    ///
    /// Moving to `failed` increments `retry_count` and stores `error`; moving
    /// to `pending` (explicit retry) leaves `retry_count` untouched and clears
    /// the error. Single-consumer discipline: only the daemon calls this.
    pub fn update_status(&self, id: &str, status: Status, error: Option<&str>) -> Result<()> {
        let mut records = self.read_all()?;
        let record = match records.iter_mut().find(|r| r.id == id) {
            Some(r) => r,
            None => bail!("queue record not found: {id}"),
        };
        match status {
            Status::Failed => {
                record.retry_count += 1;
                record.error = error.map(|e| e.to_string());
            }
            Status::Pending => {
                record.error = None;
            }
            _ => {
                record.error = error.map(|e| e.to_string());
            }
        }
        record.status = status;
        self.rewrite(&records)
    }

    /// Explicit retry: put a record back to `pending` regardless of its
    /// current status. Retry count is preserved.
    pub fn reset(&self, id: &str) -> Result<()> {
        self.update_status(id, Status::Pending, None)
    }

    /// Drop `processed` records older than `hours`. Returns how many were
    /// removed. Records with unparseable timestamps are kept.
    pub fn cleanup_old(&self, hours: u64) -> Result<usize> {
        let records = self.read_all()?;
        let before = records.len();
        let cutoff = time::OffsetDateTime::now_utc() - time::Duration::hours(hours as i64);
        let kept: Vec<QueueRecord> = records
            .into_iter()
            .filter(|r| {
                if r.status != Status::Processed {
                    return true;
                }
                match tether_core::parse_rfc3339(&r.timestamp) {
                    Some(ts) => ts > cutoff,
                    None => true,
                }
            })
            .collect();
        let removed = before.saturating_sub(kept.len());
        if removed > 0 {
            self.rewrite(&kept)?;
        }
        Ok(removed)
    }

    fn rewrite(&self, records: &[QueueRecord]) -> Result<()> {
        let mut out = String::new();
        for r in records {
            out.push_str(&serde_json::to_string(r)?);
            out.push('\n');
        }
        tether_core::store::write_atomic(&self.path, out.as_bytes())
    }
}
