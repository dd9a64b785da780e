mod cmd_daemon;
mod cmd_hook;
mod cmd_install;
mod cmd_queue;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tether", version, about = "Mirror coding-assistant sessions into the issue tracker")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Event hooks invoked by the coding-assistant host (stdin → stdout)
    Hook {
        #[command(subcommand)]
        hook: HookCommand,
    },
    /// Run the queue processor in the foreground
    Daemon,
    /// Inspect and manage the durable queue
    Queue {
        #[command(subcommand)]
        queue: QueueCommand,
    },
    /// Register tether hooks in .claude/settings.local.json
    Install,
    /// Remove tether-managed hook registrations
    Uninstall,
}

#[derive(Subcommand)]
pub enum HookCommand {
    /// Append a session_stop record
    SessionStop,
    /// Append a pr_created record when `gh pr create` just ran
    PostToolUse,
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// One line per record: id, kind, status, retries, age
    List,
    /// Put a failed record back to pending
    Retry { id: String },
    /// Drop processed records older than the threshold
    Cleanup {
        #[arg(long, default_value_t = 24)]
        hours: u64,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.cmd {
        // Hooks never fail the caller; they always exit 0.
        Command::Hook { hook } => {
            cmd_hook::run(hook);
            Ok(())
        }
        Command::Daemon => cmd_daemon::run(),
        Command::Queue { queue } => cmd_queue::run(queue),
        Command::Install => cmd_install::install(std::path::Path::new(".")),
        Command::Uninstall => cmd_install::uninstall(std::path::Path::new(".")),
    };
    if let Err(e) = result {
        eprintln!("tether: {e:#}");
        std::process::exit(1);
    }
}
