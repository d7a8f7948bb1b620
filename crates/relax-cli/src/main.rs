//! Relax CLI — entry point.
//!
//! # Commands
//!
//! - `relax chat [-m MESSAGE] [-u USER]` — talk to the assistant (single-shot or REPL)
//! - `relax reviewer --requester ID` — pick a code reviewer fairly
//! - `relax odds --requester ID` — everyone's current chance of being picked
//! - `relax profile --user ID` — one member's review count and odds
//! - `relax status` — show configuration status

mod helpers;
mod repl;
mod review_cmd;
mod status;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use relax_agent::Responder;
use relax_core::config::{load_config, Config};
use relax_core::session::SessionStore;
use relax_providers::HttpProvider;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Relax — a team chat assistant: conversations with memory and fair reviewer picks
#[derive(Parser)]
#[command(name = "relax", version, about, long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.relax/config.json
    #[arg(long, global = true)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, default_value_t = false)]
    logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant (single-shot or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Who is talking; each user has their own conversation
        #[arg(short, long, default_value = "cli")]
        user: String,
    },

    /// Pick a reviewer for a member's change
    Reviewer {
        /// Member asking for the review (never picked)
        #[arg(short, long)]
        requester: String,

        /// Print the workflow step outcome as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show each member's chance of being picked
    Odds {
        /// Member asking for the review
        #[arg(short, long)]
        requester: String,
    },

    /// Show one member's reviewer profile
    Profile {
        /// Member to describe
        #[arg(short, long)]
        user: String,
    },

    /// Show configuration status
    Status,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.logs);

    let config_path = cli.config.as_deref().map(helpers::expand_tilde);
    let config = load_config(config_path.as_deref());

    match cli.command {
        Commands::Chat { message, user } => run_chat(&config, message, user).await,
        Commands::Reviewer { requester, json } => {
            let selector = review_cmd::build_selector(&config)?;
            if json {
                let inputs = HashMap::from([(
                    relax_review::workflow::REVIEWEE_INPUT.to_string(),
                    requester,
                )]);
                review_cmd::run_workflow_step(&selector, &config, &inputs).await
            } else {
                review_cmd::run_reviewer(&selector, &config, &requester).await
            }
        }
        Commands::Odds { requester } => {
            let selector = review_cmd::build_selector(&config)?;
            review_cmd::run_odds(&selector, &config, &requester).await
        }
        Commands::Profile { user } => {
            let selector = review_cmd::build_selector(&config)?;
            review_cmd::run_profile(&selector, &config, &user).await
        }
        Commands::Status => status::run(&config, config_path),
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

async fn run_chat(config: &Config, message: Option<String>, user: String) -> Result<()> {
    let responder = build_responder(config)?;

    match message {
        Some(msg) => {
            // Single-shot mode
            info!(user = %user, "processing single message");
            let snapshots = responder
                .respond(&user, &msg)
                .await
                .context("chat request failed")?;
            helpers::print_stream(snapshots).await;
        }
        None => {
            // Interactive REPL mode
            repl::run(responder, &user).await?;
        }
    }

    Ok(())
}

/// Build a `Responder` from the loaded configuration.
pub fn build_responder(config: &Config) -> Result<Responder> {
    if !config.ai.is_configured() {
        anyhow::bail!(
            "no API key configured. Set OPENAI_TOKEN (or RELAX_AI__API_KEY), \
             or ai.apiKey in the config file."
        );
    }

    let provider = HttpProvider::new(&config.ai).context("failed to create LLM provider")?;
    let sessions = SessionStore::spawn(config.ai.session_settings());

    Ok(Responder::new(sessions, Arc::new(provider), config.ai.clone()))
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("relax=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
