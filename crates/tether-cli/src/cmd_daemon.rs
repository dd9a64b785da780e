use std::sync::Arc;

use anyhow::{Context, Result};
use tether_core::config::{DaemonConfig, MatcherConfig};
use tether_daemon::Processor;
use tether_llm::CommandLlm;
use tether_queue::Queue;
use tether_tracker::HttpTracker;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Run the processor in the foreground until SIGINT/SIGTERM.
pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = DaemonConfig::from_env()?;
    let matcher_config = MatcherConfig::from_env();

    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    runtime.block_on(async move {
        let tracker = Arc::new(HttpTracker::new(
            config.tracker_url.clone(),
            &config.tracker_token,
        )?);
        let llm = Arc::new(CommandLlm::new(
            &config.llm_command,
            config.llm_timeout_secs,
        )?);
        let queue = Queue::open_default();

        let processor =
            Processor::start(queue, tracker, llm, matcher_config, config).await?;

        let cancel = CancellationToken::new();
        spawn_signal_handler(cancel.clone());
        processor.run(cancel).await
    })
}

/// Cancel on SIGINT or SIGTERM; the processor finishes its in-flight record.
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut term =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(term) => term,
                    Err(e) => {
                        tracing::warn!("failed to install SIGTERM handler: {e}");
                        let _ = ctrl_c.await;
                        cancel.cancel();
                        return;
                    }
                };
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        cancel.cancel();
    });
}
