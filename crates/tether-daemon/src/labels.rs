use regex::RegexBuilder;
use tether_core::issue::Label;

/// Ordered label-derivation rules: pattern over cwd + user text → label names.
const RULES: &[(&str, &[&str])] = &[
    (r"frontend|web|react|vue|next", &["Frontend"]),
    (r"backend|api|server|node", &["Backend"]),
    (r"mobile|ios|android|react-native", &["Mobile"]),
    (r"infra|devops|terraform|k8s|kubernetes", &["Infrastructure"]),
    (r"test|spec|e2e", &["Testing"]),
    (r"doc|readme|wiki", &["Documentation"]),
    (r"design|figma|ui|ux", &["Design"]),
    (r"bug|fix|hotfix", &["Bug"]),
    (r"feature|feat", &["Feature"]),
    (r"refactor|cleanup", &["Refactor"]),
];

/// Derive label ids for a session from its working directory and the
/// concatenated user messages. Names map to ids by case-insensitive equality
/// against the cached label set; unknown names are silently dropped.
pub fn derive_label_ids(cwd: &str, user_text: &str, cached: &[Label]) -> Vec<String> {
    let mut ids = Vec::new();
    for (pattern, names) in RULES {
        let re = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(re) => re,
            Err(_) => continue,
        };
        if !re.is_match(cwd) && !re.is_match(user_text) {
            continue;
        }
        for name in *names {
            let found = cached
                .iter()
                .find(|l| l.name.eq_ignore_ascii_case(name))
                .map(|l| l.id.clone());
            if let Some(id) = found {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached() -> Vec<Label> {
        [
            ("lbl-mobile", "Mobile"),
            ("lbl-bug", "Bug"),
            ("lbl-frontend", "Frontend"),
            ("lbl-testing", "Testing"),
        ]
        .iter()
        .map(|(id, name)| Label {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect()
    }

    #[test]
    fn cwd_and_text_both_contribute() {
        // cwd matches "mobile", message matches "fix" → Mobile + Bug
        let ids = derive_label_ids("/home/u/proj/mobile-app", "fix login crash", &cached());
        assert_eq!(ids, vec!["lbl-mobile".to_string(), "lbl-bug".to_string()]);
    }

    #[test]
    fn unknown_label_names_are_dropped() {
        // "api" matches the Backend rule, but Backend isn't cached
        let ids = derive_label_ids("/home/u/proj/api", "", &cached());
        assert!(ids.is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let ids = derive_label_ids("/home/u/PROJ/Mobile-App", "FIX the crash", &cached());
        assert!(ids.contains(&"lbl-mobile".to_string()));
        assert!(ids.contains(&"lbl-bug".to_string()));
    }

    #[test]
    fn no_match_yields_empty() {
        let ids = derive_label_ids("/home/u/proj/thing", "hello there", &cached());
        assert!(ids.is_empty());
    }

    #[test]
    fn rules_do_not_duplicate_ids() {
        let ids = derive_label_ids("/home/u/web", "frontend react web work", &cached());
        assert_eq!(
            ids.iter().filter(|i| i.as_str() == "lbl-frontend").count(),
            1
        );
    }
}
