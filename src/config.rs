//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `speclens.toml` (optional — every field has a default) and
//! deserializes into strongly-typed structs. Secrets (the GitHub token)
//! are referenced by env-var name in the config and resolved at runtime
//! via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "speclens.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub index: IndexConfig,
    pub http: HttpConfig,
    pub lens: LensConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    /// Override for the database path. Defaults to `~/.speclens/index.db`.
    pub db_path: Option<String>,
    /// How long a cached repo HEAD is trusted before asking GitHub again.
    pub refresh_ttl_hours: i64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            refresh_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Env-var name holding a GitHub API token (raises the rate limit).
    pub github_token_env: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("speclens/{}", env!("CARGO_PKG_VERSION")),
            github_token_env: Some("GITHUB_TOKEN".to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LensConfig {
    /// Jaro-Winkler similarity below which a step comment counts as drifted.
    pub fuzzy_threshold: f64,
    /// Delay before re-analyzing a changed document in the language server.
    pub debounce_ms: u64,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.85,
            debounce_ms: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8740 }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Ok(AppConfig::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve the configured GitHub token, if any is set.
    pub fn github_token(&self) -> Option<String> {
        self.http
            .github_token_env
            .as_deref()
            .and_then(|env| std::env::var(env).ok())
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let cfg = AppConfig::load("/nonexistent/speclens.toml").unwrap();
        assert_eq!(cfg.index.refresh_ttl_hours, 24);
        assert_eq!(cfg.http.timeout_secs, 30);
        assert!((cfg.lens.fuzzy_threshold - 0.85).abs() < 1e-9);
        assert_eq!(cfg.lens.debounce_ms, 300);
        assert_eq!(cfg.server.port, 8740);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [lens]
            fuzzy_threshold = 0.9

            [server]
            port = 9000
            "#,
        )
        .unwrap();
        assert!((cfg.lens.fuzzy_threshold - 0.9).abs() < 1e-9);
        assert_eq!(cfg.server.port, 9000);
        // Untouched sections keep their defaults
        assert_eq!(cfg.index.refresh_ttl_hours, 24);
        assert_eq!(cfg.lens.debounce_ms, 300);
    }

    #[test]
    fn test_user_agent_carries_version() {
        let cfg = AppConfig::default();
        assert!(cfg.http.user_agent.starts_with("speclens/"));
    }
}
