use anyhow::Result;
use tether_queue::Queue;

use crate::QueueCommand;

pub fn run(cmd: QueueCommand) -> Result<()> {
    let queue = Queue::open_default();
    match cmd {
        QueueCommand::List => list(&queue),
        QueueCommand::Retry { id } => {
            queue.reset(&id)?;
            println!("{id} → pending");
            Ok(())
        }
        QueueCommand::Cleanup { hours } => {
            let removed = queue.cleanup_old(hours)?;
            println!("removed {removed} processed record(s) older than {hours}h");
            Ok(())
        }
    }
}

fn list(queue: &Queue) -> Result<()> {
    let records = queue.read_all()?;
    if records.is_empty() {
        println!("queue is empty ({})", queue.path().display());
        return Ok(());
    }
    for r in records {
        let age = age_of(&r.timestamp).unwrap_or_else(|| "?".into());
        let error = r
            .error
            .as_deref()
            .map(|e| format!("  ({e})"))
            .unwrap_or_default();
        println!(
            "{}  {:12} {:10} retries={} age={age}{error}",
            r.id,
            r.payload.kind(),
            r.status.to_string(),
            r.retry_count,
        );
    }
    Ok(())
}

fn age_of(timestamp: &str) -> Option<String> {
    let ts = tether_core::parse_rfc3339(timestamp)?;
    let elapsed = time::OffsetDateTime::now_utc() - ts;
    let secs = elapsed.whole_seconds().max(0);
    Some(if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{}h", secs / 3600)
    })
}
