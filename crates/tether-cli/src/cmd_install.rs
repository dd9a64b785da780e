use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

/// Hook events tether manages, with the command each one runs.
const HOOK_EVENTS: &[(&str, &str)] = &[
    ("Stop", "tether hook session-stop"),
    ("PostToolUse", "tether hook post-tool-use"),
];

fn settings_path(repo_root: &Path) -> PathBuf {
    repo_root.join(".claude").join("settings.local.json")
}

/// Check whether a matcher group is tether-managed.
fn group_is_tether(group: &serde_json::Value) -> bool {
    group
        .get("hooks")
        .and_then(|h| h.as_array())
        .map(|hooks| {
            hooks.iter().any(|hook| {
                hook.get("command")
                    .and_then(|c| c.as_str())
                    .is_some_and(|c| c.contains("tether hook"))
            })
        })
        .unwrap_or(false)
}

/// Register tether hooks in `.claude/settings.local.json`, preserving
/// unrelated settings and non-tether matcher groups. The prior file is
/// backed up next to it.
pub fn install(repo_root: &Path) -> Result<()> {
    let path = settings_path(repo_root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut settings: serde_json::Value = if path.exists() {
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).unwrap_or_else(|_| serde_json::json!({}))
    } else {
        serde_json::json!({})
    };

    if path.exists() {
        let ts = tether_core::now_rfc3339().replace(':', "-");
        fs::copy(&path, path.with_extension(format!("json.tether.bak.{ts}")))?;
    }

    let hooks = settings
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("settings is not an object"))?
        .entry("hooks")
        .or_insert_with(|| serde_json::json!({}));
    let hooks_obj = hooks
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("hooks is not an object"))?;

    for (event, command) in HOOK_EVENTS {
        let tether_group = serde_json::json!({
            "matcher": "",
            "hooks": [{ "type": "command", "command": command }]
        });
        let mut groups: Vec<serde_json::Value> = hooks_obj
            .get(*event)
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|g| !group_is_tether(g))
            .collect();
        groups.push(tether_group);
        hooks_obj.insert(event.to_string(), serde_json::Value::Array(groups));
    }

    fs::write(&path, serde_json::to_string_pretty(&settings)?)?;
    println!("installed tether hooks into {}", path.display());
    Ok(())
}

/// Remove tether-managed matcher groups; everything else stays.
pub fn uninstall(repo_root: &Path) -> Result<()> {
    let path = settings_path(repo_root);
    if !path.exists() {
        println!("nothing to uninstall ({} missing)", path.display());
        return Ok(());
    }
    let content = fs::read_to_string(&path)?;
    let mut settings: serde_json::Value =
        serde_json::from_str(&content).unwrap_or_else(|_| serde_json::json!({}));

    if let Some(hooks_obj) = settings.get_mut("hooks").and_then(|h| h.as_object_mut()) {
        for (event, _) in HOOK_EVENTS {
            if let Some(groups) = hooks_obj.get_mut(*event).and_then(|v| v.as_array_mut()) {
                groups.retain(|g| !group_is_tether(g));
            }
        }
        hooks_obj.retain(|_, v| !v.as_array().is_some_and(|a| a.is_empty()));
    }

    fs::write(&path, serde_json::to_string_pretty(&settings)?)?;
    println!("removed tether hooks from {}", path.display());
    Ok(())
}
