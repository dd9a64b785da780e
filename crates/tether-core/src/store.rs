use std::io::Write;
use std::path::{Path, PathBuf};

/// Return the per-user data home: `$TETHER_DATA_DIR`, the platform data dir
/// (`~/.local/share/tether`), or `~/.tether` as a last resort.
pub fn data_home() -> PathBuf {
    if let Ok(dir) = std::env::var("TETHER_DATA_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("tether")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".tether")
    } else {
        PathBuf::from(".tether")
    }
}

/// Path of the durable work queue.
pub fn queue_path() -> PathBuf {
    data_home().join("queue.jsonl")
}

/// Atomic write: write to a temp file in the same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.jsonl");
        write_atomic(&path, b"line\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line\n");
    }

    #[test]
    fn write_atomic_replaces_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.jsonl");
        write_atomic(&path, b"old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn data_home_is_not_empty() {
        assert!(!data_home().as_os_str().is_empty());
    }
}
