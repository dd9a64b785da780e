pub mod config;
pub mod issue;
pub mod store;
pub mod text;

/// Queue record ID format: `rec_<ulid>`
pub fn new_record_id() -> String {
    format!("rec_{}", ulid::Ulid::new().to_string().to_lowercase())
}

/// Current time as an RFC 3339 string (UTC).
pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

/// Parse an RFC 3339 timestamp. Returns `None` on malformed input.
pub fn parse_rfc3339(ts: &str) -> Option<time::OffsetDateTime> {
    time::OffsetDateTime::parse(ts, &time::format_description::well_known::Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_has_prefix_and_is_unique() {
        let a = new_record_id();
        let b = new_record_id();
        assert!(a.starts_with("rec_"));
        assert_ne!(a, b);
    }

    #[test]
    fn now_rfc3339_roundtrips() {
        let ts = now_rfc3339();
        assert!(parse_rfc3339(&ts).is_some());
    }

    #[test]
    fn parse_rfc3339_rejects_garbage() {
        assert!(parse_rfc3339("not-a-date").is_none());
        assert!(parse_rfc3339("").is_none());
    }
}
