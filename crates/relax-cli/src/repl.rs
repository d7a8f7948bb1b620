//! Interactive REPL for `relax chat`.
//!
//! Uses `rustyline` for readline-style editing with persistent history.

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use relax_agent::Responder;

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// Commands that reset the conversation.
const CLEAR_COMMANDS: &[&str] = &["/clear", "/reset", "/new"];

/// Run the interactive REPL loop.
pub async fn run(responder: Responder, user: &str) -> Result<()> {
    helpers::print_banner(user);

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                // Ctrl-C — exit cleanly
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                // Ctrl-D — exit cleanly
                break;
            }
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        if is_exit_command(trimmed) {
            println!("\nGoodbye!");
            break;
        }

        let _ = editor.add_history_entry(&input);

        if is_clear_command(trimmed) {
            responder.clear_history(user);
            println!("\nConversation cleared.\n");
            continue;
        }

        debug!(user = user, input = trimmed, "processing input");

        match responder.respond(user, trimmed).await {
            Ok(snapshots) => {
                helpers::print_stream(snapshots).await;
            }
            Err(e) => {
                eprintln!("\nError: {e}\n");
            }
        }
    }

    save_history(&mut editor);

    Ok(())
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the history file.
fn history_path() -> std::path::PathBuf {
    relax_core::utils::get_data_path().join("history").join("chat_history")
}

fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

fn is_clear_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    CLEAR_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_commands() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("EXIT"));
        assert!(is_exit_command("/quit"));
        assert!(is_exit_command(":q"));
        assert!(!is_exit_command("hello"));
        assert!(!is_exit_command(""));
    }

    #[test]
    fn clear_commands() {
        assert!(is_clear_command("/clear"));
        assert!(is_clear_command("/RESET"));
        assert!(!is_clear_command("clear the table please"));
    }

    #[test]
    fn history_path_under_data_dir() {
        let path = history_path();
        assert!(path.to_string_lossy().contains(".relax"));
        assert!(path.to_string_lossy().contains("chat_history"));
    }
}
