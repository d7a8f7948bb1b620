//! `relax status` — show configuration status.
//!
//! - Config path, model and sampling parameters
//! - Session window and stream pacing
//! - Count store and team summary

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;

use relax_core::config::{get_config_path, Config};
use relax_review::selector::is_available;

use crate::helpers::mark;

/// Run the status command.
pub fn run(config: &Config, config_path: Option<PathBuf>) -> Result<()> {
    let config_path = config_path.unwrap_or_else(get_config_path);

    println!();
    println!("{}", "Relax Status".cyan().bold());
    println!();

    let config_exists = config_path.exists();
    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_exists {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );

    // AI
    println!("  {:<18} {}", "Model:".bold(), config.ai.model);
    println!("  {:<18} {}", "API base:".bold(), config.ai.api_base);
    println!(
        "  {:<18} {}",
        "API key:".bold(),
        if config.ai.is_configured() {
            format!("{} (key set)", mark(true))
        } else {
            format!("{}", "· not configured".dimmed())
        }
    );
    println!(
        "  {:<18} {}",
        "Parameters:".bold(),
        format!(
            "temp: {} | presence: {} | budget: {}",
            config.ai.temperature, config.ai.presence_penalty, config.ai.completion_budget
        )
        .dimmed(),
    );
    println!(
        "  {:<18} {}",
        "Sessions:".bold(),
        format!(
            "expire after {}s | updates every {}ms",
            config.ai.session_ttl_secs, config.ai.stream_interval_ms
        )
        .dimmed(),
    );

    // Reviews
    println!();
    println!(
        "  {:<18} {}",
        "Count store:".bold(),
        if config.kv.is_configured() {
            format!("{} {}", mark(true), config.kv.url)
        } else {
            format!("{}", "· in memory (kv not configured)".dimmed())
        }
    );

    let available = config.review.team.iter().filter(|m| is_available(m)).count();
    println!(
        "  {:<18} {} member(s), {} available",
        "Team:".bold(),
        config.review.team.len(),
        available
    );

    println!();

    Ok(())
}
