/// Return the largest byte index `<= i` that is a valid char boundary.
/// Equivalent to `str::floor_char_boundary` (unstable nightly API).
pub fn floor_char_boundary(s: &str, i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    let mut pos = i;
    while pos > 0 && !s.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Truncate to at most `max_bytes`, appending `"..."` when cut.
/// Never splits a multi-byte character.
pub fn truncate_with_ellipsis(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let end = floor_char_boundary(s, max_bytes);
    format!("{}...", &s[..end])
}

/// Collapse runs of whitespace (including newlines) to single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_char_boundary_basic() {
        assert_eq!(floor_char_boundary("hello", 3), 3);
        assert_eq!(floor_char_boundary("hello", 100), 5);
        // '後' = 3 bytes
        let s = "ab後cd";
        assert_eq!(floor_char_boundary(s, 3), 2);
        assert_eq!(floor_char_boundary(s, 4), 2);
        assert_eq!(floor_char_boundary(s, 5), 5);
    }

    #[test]
    fn truncate_short_string_unchanged() {
        assert_eq!(truncate_with_ellipsis("short", 60), "short");
    }

    #[test]
    fn truncate_appends_ellipsis() {
        let long = "x".repeat(100);
        let out = truncate_with_ellipsis(&long, 60);
        assert_eq!(out.len(), 63);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn truncate_respects_char_boundary() {
        let s = format!("{}後後後", "x".repeat(58));
        let out = truncate_with_ellipsis(&s, 60);
        // byte 60 lands mid-'後' → backs up to 58
        assert!(out.starts_with(&"x".repeat(58)));
        assert!(out.ends_with("..."));
    }

    #[test]
    fn collapse_whitespace_flattens_newlines() {
        assert_eq!(
            collapse_whitespace("fix  the\nlogin\t\tbug "),
            "fix the login bug"
        );
    }
}
