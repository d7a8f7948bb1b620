//! Config loader — reads `~/.relax/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.relax/config.json`
//! 3. Legacy bot variables (`OPENAI_TOKEN`, `AI_CONTEXT`, `KV_URL`, `KV_TOKEN`)
//! 4. Environment variables `RELAX_<SECTION>__<FIELD>` (override everything)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `RELAX_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `RELAX_AI__MODEL`, `RELAX_AI__API_BASE`, `RELAX_AI__API_KEY`
/// - `RELAX_AI__SYSTEM_PROMPT`, `RELAX_AI__TEMPERATURE`, `RELAX_AI__PRESENCE_PENALTY`
/// - `RELAX_AI__COMPLETION_BUDGET`, `RELAX_AI__SESSION_TTL_SECS`, `RELAX_AI__STREAM_INTERVAL_MS`
/// - `RELAX_KV__URL`, `RELAX_KV__TOKEN`, `RELAX_KV__KEY_PREFIX`
fn apply_env_overrides(mut config: Config) -> Config {
    // Names the original bot read its secrets from
    if let Ok(val) = std::env::var("OPENAI_TOKEN") {
        config.ai.api_key = val;
    }
    if let Ok(val) = std::env::var("AI_CONTEXT") {
        config.ai.system_prompt = val;
    }
    if let Ok(val) = std::env::var("KV_URL") {
        config.kv.url = val;
    }
    if let Ok(val) = std::env::var("KV_TOKEN") {
        config.kv.token = val;
    }

    // AI
    if let Ok(val) = std::env::var("RELAX_AI__MODEL") {
        config.ai.model = val;
    }
    if let Ok(val) = std::env::var("RELAX_AI__API_BASE") {
        config.ai.api_base = val;
    }
    if let Ok(val) = std::env::var("RELAX_AI__API_KEY") {
        config.ai.api_key = val;
    }
    if let Ok(val) = std::env::var("RELAX_AI__SYSTEM_PROMPT") {
        config.ai.system_prompt = val;
    }
    if let Ok(val) = std::env::var("RELAX_AI__TEMPERATURE") {
        if let Ok(t) = val.parse::<f64>() {
            config.ai.temperature = t;
        }
    }
    if let Ok(val) = std::env::var("RELAX_AI__PRESENCE_PENALTY") {
        if let Ok(p) = val.parse::<f64>() {
            config.ai.presence_penalty = p;
        }
    }
    if let Ok(val) = std::env::var("RELAX_AI__COMPLETION_BUDGET") {
        if let Ok(n) = val.parse::<u32>() {
            config.ai.completion_budget = n;
        }
    }
    if let Ok(val) = std::env::var("RELAX_AI__SESSION_TTL_SECS") {
        if let Ok(n) = val.parse::<u64>() {
            config.ai.session_ttl_secs = n;
        }
    }
    if let Ok(val) = std::env::var("RELAX_AI__STREAM_INTERVAL_MS") {
        if let Ok(n) = val.parse::<u64>() {
            config.ai.stream_interval_ms = n;
        }
    }

    // KV
    if let Ok(val) = std::env::var("RELAX_KV__URL") {
        config.kv.url = val;
    }
    if let Ok(val) = std::env::var("RELAX_KV__TOKEN") {
        config.kv.token = val;
    }
    if let Ok(val) = std::env::var("RELAX_KV__KEY_PREFIX") {
        config.kv.key_prefix = val;
    }

    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
