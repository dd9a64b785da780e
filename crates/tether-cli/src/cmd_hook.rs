use std::io::Read;

use tether_queue::Queue;

use crate::HookCommand;

/// Read the hook payload from stdin, append the queue record, answer with
/// the continue decision. Never fails: any error is already swallowed inside
/// the hook entrypoints, and an unreadable stdin is treated as empty input.
pub fn run(hook: HookCommand) {
    let mut stdin = String::new();
    let _ = std::io::stdin().read_to_string(&mut stdin);

    let queue = Queue::open_default();
    let decision = match hook {
        HookCommand::SessionStop => tether_hooks::handle_session_stop(&queue, &stdin),
        HookCommand::PostToolUse => tether_hooks::handle_post_tool_use(&queue, &stdin),
    };
    println!("{decision}");
}
