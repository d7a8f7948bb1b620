//! `relax reviewer`, `relax odds`, `relax profile` — reviewer selection commands.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::warn;

use relax_core::config::Config;
use relax_review::workflow::{random_reviewer_step, WorkflowOutcome};
use relax_review::{CountStore, FairnessSelector, KvStore, MemoryCountStore};

/// Build a selector over the configured count store.
///
/// Without `kv` settings counts live in memory and are gone when the command exits.
pub fn build_selector(config: &Config) -> Result<FairnessSelector> {
    let store: Arc<dyn CountStore> = if config.kv.is_configured() {
        Arc::new(KvStore::new(&config.kv).context("failed to create count store")?)
    } else {
        warn!("kv.url / kv.token not set, review counts will not be kept");
        Arc::new(MemoryCountStore::new())
    };
    Ok(FairnessSelector::new(store))
}

fn ensure_team(config: &Config) -> Result<()> {
    if config.review.team.is_empty() {
        anyhow::bail!("no team configured. Add members under review.team in the config file.");
    }
    Ok(())
}

/// Pick a reviewer and print who it is.
pub async fn run_reviewer(
    selector: &FairnessSelector,
    config: &Config,
    requester: &str,
) -> Result<()> {
    ensure_team(config)?;

    let (reviewer, count) = selector
        .pick_reviewer(&config.review.team, requester)
        .await
        .context("could not pick a reviewer")?;

    println!();
    println!(
        "  {} {} ({})",
        "Reviewer:".bold(),
        reviewer.name.cyan().bold(),
        reviewer.id.dimmed()
    );
    println!(
        "  {}",
        format!("{} has now been picked {} time(s).", reviewer.name, count).dimmed()
    );
    println!();
    Ok(())
}

/// Run the "random reviewer" workflow step and print its outcome as JSON.
pub async fn run_workflow_step(
    selector: &FairnessSelector,
    config: &Config,
    inputs: &HashMap<String, String>,
) -> Result<()> {
    let outcome = random_reviewer_step(selector, &config.review.team, inputs).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    match outcome {
        WorkflowOutcome::Success { .. } => Ok(()),
        WorkflowOutcome::Failure { message } => anyhow::bail!(message),
    }
}

/// Print every eligible member's chance of being picked for `requester`.
pub async fn run_odds(
    selector: &FairnessSelector,
    config: &Config,
    requester: &str,
) -> Result<()> {
    ensure_team(config)?;

    let odds = selector.odds_for(&config.review.team, requester).await?;

    println!();
    println!("{}", format!("Reviewer odds for {requester}").cyan().bold());
    println!();
    if odds.is_empty() {
        println!("  {}", "(nobody can review)".dimmed());
    }
    for (member, odds) in odds {
        println!("  {:<24} {:>3}%", member.name, odds.percent);
    }
    println!();
    Ok(())
}

/// Print one member's reviewer profile.
pub async fn run_profile(
    selector: &FairnessSelector,
    config: &Config,
    user: &str,
) -> Result<()> {
    ensure_team(config)?;

    let profile = selector.reviewer_profile(&config.review.team, user).await?;
    let names: HashMap<&str, &str> = config
        .review
        .team
        .iter()
        .map(|m| (m.id.as_str(), m.name.as_str()))
        .collect();

    println!();
    println!("{}", profile.member.name.cyan().bold());
    println!();
    println!(
        "  {:<18} {}",
        "Available:".bold(),
        crate::helpers::mark(profile.is_available)
    );
    println!("  {:<18} {}", "Reviews:".bold(), profile.review_count);
    println!();
    println!("  {}", "Chance of being picked by:".bold());
    for odds in &profile.odds {
        let name = names.get(odds.id.as_str()).copied().unwrap_or(odds.id.as_str());
        println!("    {:<22} {:>3}%", name, odds.percent);
    }
    println!();
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
