//! Shared CLI helpers — path expansion, streamed answer printing, banner.

use std::io::Write;
use std::path::PathBuf;

use colored::Colorize;
use tokio::sync::mpsc;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Part of `snapshot` not yet printed, given what was printed before.
///
/// Snapshots are cumulative, so normally this is a suffix. If the text was
/// somehow rewritten, the whole snapshot is returned.
pub fn unprinted<'a>(printed: &str, snapshot: &'a str) -> &'a str {
    snapshot.strip_prefix(printed).unwrap_or(snapshot)
}

/// Print an answer as its snapshots arrive.
///
/// Returns the final text.
pub async fn print_stream(mut snapshots: mpsc::UnboundedReceiver<String>) -> String {
    println!();
    println!("{}", "Relax".cyan().bold());
    print_thinking();

    let mut printed = String::new();
    let mut first = true;
    while let Some(snapshot) = snapshots.recv().await {
        if first {
            clear_thinking();
            first = false;
        }
        print!("{}", unprinted(&printed, &snapshot));
        let _ = std::io::stdout().flush();
        printed = snapshot;
    }

    if first {
        clear_thinking();
    }
    if printed.is_empty() {
        print!("{}", "(no response)".dimmed());
    }
    println!();
    println!();
    printed
}

/// Print the banner shown at REPL start.
pub fn print_banner(user: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "Relax".cyan().bold(), version.dimmed());
    println!(
        "{}",
        format!("Chatting as {user}. Type /clear to start over, or \"exit\" to quit.").dimmed()
    );
    println!();
}

/// Print a "thinking" placeholder until the first snapshot arrives.
pub fn print_thinking() {
    eprint!("{}", "thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

/// Check mark or cross for status output.
pub fn mark(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
