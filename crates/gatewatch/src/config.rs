//! CLI-owned configuration: TOML file, env overrides, and translation to
//! `gatewatch_core::SessionConfig`.
//!
//! Core never sees these types -- it receives a pre-built `SessionConfig`.

use std::path::PathBuf;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use gatewatch_core::SessionConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── TOML config struct ───────────────────────────────────────────────

/// CLI-owned TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Stream endpoint used when --url is not given.
    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    /// Orchestrator base URL used when --orchestrator is not given.
    #[serde(default = "default_orchestrator_url")]
    pub orchestrator_url: String,

    /// Retained-event capacity for the live log.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stream_url: default_stream_url(),
            orchestrator_url: default_orchestrator_url(),
            log_capacity: default_log_capacity(),
        }
    }
}

fn default_stream_url() -> String {
    "ws://localhost:9001/stream".into()
}
fn default_orchestrator_url() -> String {
    "http://localhost:9000/".into()
}
fn default_log_capacity() -> usize {
    gatewatch_core::store::DEFAULT_CAPACITY
}

// ── Config file path ─────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "gatewatch", "gatewatch")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("gatewatch");
            p.push("config.toml");
            p
        })
}

// ── Config loading ───────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, CliError> {
    let path = config_path();

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("GATEWATCH_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Resolution to core types ─────────────────────────────────────────

/// Stream URL resolution: flag (and its env) wins over the config file.
pub fn resolve_stream_url(global: &GlobalOpts, config: &Config) -> String {
    global
        .url
        .clone()
        .unwrap_or_else(|| config.stream_url.clone())
}

/// Orchestrator URL resolution: flag wins over the config file.
pub fn resolve_orchestrator_url(global: &GlobalOpts, config: &Config) -> String {
    global
        .orchestrator
        .clone()
        .unwrap_or_else(|| config.orchestrator_url.clone())
}

/// Build the core session configuration from config + overrides.
///
/// This is the single boundary where CLI config types cross into core types.
pub fn session_config(config: &Config, capacity_override: Option<usize>) -> SessionConfig {
    SessionConfig {
        log_capacity: capacity_override.unwrap_or(config.log_capacity),
        ..SessionConfig::default()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn global(url: Option<&str>) -> GlobalOpts {
        GlobalOpts {
            url: url.map(ToString::to_string),
            orchestrator: None,
            timeout: 10,
            verbose: 0,
        }
    }

    #[test]
    fn flag_overrides_config_file_url() {
        let config = Config::default();
        let resolved = resolve_stream_url(&global(Some("ws://elsewhere:1/s")), &config);
        assert_eq!(resolved, "ws://elsewhere:1/s");
    }

    #[test]
    fn config_file_url_is_the_fallback() {
        let config = Config::default();
        let resolved = resolve_stream_url(&global(None), &config);
        assert_eq!(resolved, "ws://localhost:9001/stream");
    }

    #[test]
    fn capacity_override_wins() {
        let config = Config::default();
        assert_eq!(session_config(&config, Some(50)).log_capacity, 50);
        assert_eq!(session_config(&config, None).log_capacity, 200);
    }
}
