use serde::{Deserialize, Serialize};

/// Record lifecycle. `processing` is transient: held only while the single
/// consumer owns the record during a drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Processing,
    Processed,
    Failed,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::Processing => "processing",
            Status::Processed => "processed",
            Status::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Kind-specific payload, internally tagged so the wire line stays flat:
/// `{"id":…,"kind":"session_stop","session_id":…,"transcript_path":…,…}`.
///
/// An unrecognized `kind` deserializes to `Unknown` instead of turning the
/// whole line into parse noise; the processor fails such records with a
/// descriptive error so they surface in inspection and retry accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    SessionStop {
        session_id: String,
        transcript_path: String,
        cwd: String,
    },
    PrCreated {
        session_id: String,
        pr_url: String,
        cwd: String,
    },
    #[serde(other)]
    Unknown,
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::SessionStop { .. } => "session_stop",
            Payload::PrCreated { .. } => "pr_created",
            Payload::Unknown => "unknown",
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Payload::SessionStop { session_id, .. } | Payload::PrCreated { session_id, .. } => {
                session_id
            }
            Payload::Unknown => "",
        }
    }

    pub fn cwd(&self) -> &str {
        match self {
            Payload::SessionStop { cwd, .. } | Payload::PrCreated { cwd, .. } => cwd,
            Payload::Unknown => "",
        }
    }
}

/// One line of `queue.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRecord {
    pub id: String,
    pub timestamp: String,
    pub status: Status,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Payload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_producer_sample_line() {
        let line = r#"{"id":"rec_01hxyz","kind":"session_stop","timestamp":"2025-01-01T00:00:00Z","status":"pending","session_id":"s1","transcript_path":"/t/s1.jsonl","cwd":"/w"}"#;
        let rec: QueueRecord = serde_json::from_str(line).unwrap();
        assert_eq!(rec.id, "rec_01hxyz");
        assert_eq!(rec.status, Status::Pending);
        assert_eq!(rec.retry_count, 0);
        assert_eq!(rec.payload.kind(), "session_stop");
        assert_eq!(rec.payload.session_id(), "s1");
    }

    #[test]
    fn status_display_matches_wire() {
        assert_eq!(Status::Pending.to_string(), "pending");
        assert_eq!(Status::Failed.to_string(), "failed");
    }

    #[test]
    fn unrecognized_kind_parses_as_unknown() {
        let line = r#"{"id":"rec_x","kind":"session_pause","timestamp":"2025-01-01T00:00:00Z","status":"pending","session_id":"s1"}"#;
        let rec: QueueRecord = serde_json::from_str(line).unwrap();
        assert!(matches!(rec.payload, Payload::Unknown));
        assert_eq!(rec.payload.kind(), "unknown");
        assert_eq!(rec.payload.session_id(), "");
        assert_eq!(rec.status, Status::Pending);
    }
}
