//! Configuration loading
//!
//! Settings come from `config.toml` (under the platform config directory, or
//! an explicit `--config` path), then environment variables, then CLI flags.
//! Every field has a default so an empty file is valid.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

const APP_DIR: &str = "divtrack";
const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache root; defaults to `<cache_home>/divtrack`.
    pub cache_dir: Option<PathBuf>,
    /// Where the dashboard artifacts are written.
    pub output_dir: PathBuf,
    pub debug: bool,
    /// Serve every lookup from cache only.
    pub offline: bool,
    pub http_timeout_secs: u64,
    /// Order in which dividend yield sources are consulted.
    pub yield_sources: Vec<YieldSourceKind>,
    pub trading212: Trading212Config,
    pub finkio: FinkioConfig,
    pub stock_bot: StockBotConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum YieldSourceKind {
    StockBot,
    Finkio,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Trading212Config {
    pub base_url: String,
    /// Raw `Cookie` header copied from an authenticated browser session.
    pub cookie: Option<String>,
    pub max_pages: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FinkioConfig {
    pub base_url: String,
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StockBotConfig {
    pub host: String,
    pub key: Option<String>,
    pub dividend_ttl_hours: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: None,
            output_dir: PathBuf::from("dashboard"),
            debug: false,
            offline: false,
            http_timeout_secs: 30,
            yield_sources: vec![YieldSourceKind::StockBot, YieldSourceKind::Finkio],
            trading212: Trading212Config::default(),
            finkio: FinkioConfig::default(),
            stock_bot: StockBotConfig::default(),
        }
    }
}

impl Default for Trading212Config {
    fn default() -> Self {
        Self {
            base_url: "https://live.trading212.com".to_string(),
            cookie: None,
            max_pages: 500,
        }
    }
}

impl Default for FinkioConfig {
    fn default() -> Self {
        Self {
            base_url: "https://finki.io".to_string(),
            key: None,
        }
    }
}

impl Default for StockBotConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:3000".to_string(),
            key: None,
            dividend_ttl_hours: 24,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

impl Config {
    /// Load from `path`, or from the default location when it exists, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };
        config.apply_env_from(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Secrets and switches that are usually kept out of the config file.
    pub fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(cookie) = get("DIVTRACK_COOKIE") {
            self.trading212.cookie = Some(cookie);
        }
        if let Some(key) = get("DIVTRACK_FINKIO_KEY") {
            self.finkio.key = Some(key);
        }
        if let Some(key) = get("DIVTRACK_STOCK_BOT_KEY") {
            self.stock_bot.key = Some(key);
        }
        if let Some(offline) = get("DIVTRACK_OFFLINE") {
            self.offline = offline != "0";
        }
    }

    pub fn cache_root(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_home = std::env::var_os("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .or_else(dir_spec::cache_home)
            .ok_or_else(|| anyhow!("Could not determine cache directory"))?;
        Ok(cache_home.join(APP_DIR))
    }

    pub fn cookie(&self) -> Result<&str> {
        self.trading212
            .cookie
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::Config(
                    "set trading212.cookie in config or DIVTRACK_COOKIE".to_string(),
                )
                .into()
            })
    }

    pub fn finkio_key(&self) -> Result<&str> {
        non_empty(self.finkio.key.as_deref())
            .ok_or_else(|| PipelineError::Config("set finkio.key in config".to_string()).into())
    }

    pub fn stock_bot_key(&self) -> Result<&str> {
        non_empty(self.stock_bot.key.as_deref())
            .ok_or_else(|| PipelineError::Config("set stock_bot.key in config".to_string()).into())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.output_dir, PathBuf::from("dashboard"));
        assert_eq!(config.trading212.max_pages, 500);
        assert_eq!(config.stock_bot.dividend_ttl_hours, 24);
        assert_eq!(
            config.yield_sources,
            vec![YieldSourceKind::StockBot, YieldSourceKind::Finkio]
        );
        assert!(!config.offline);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            debug = true
            yield_sources = ["finkio"]

            [finkio]
            key = "abc"

            [trading212]
            max_pages = 3
            "#,
        )
        .unwrap();

        assert!(config.debug);
        assert_eq!(config.yield_sources, vec![YieldSourceKind::Finkio]);
        assert_eq!(config.finkio_key().unwrap(), "abc");
        assert_eq!(config.finkio.base_url, "https://finki.io");
        assert_eq!(config.trading212.max_pages, 3);
        assert_eq!(config.trading212.base_url, "https://live.trading212.com");
    }

    #[test]
    fn test_unknown_yield_source_is_rejected() {
        assert!(Config::from_toml(r#"yield_sources = ["dividendmax"]"#).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DIVTRACK_COOKIE", "LOGIN_TOKEN=abc"),
            ("DIVTRACK_STOCK_BOT_KEY", "secret"),
            ("DIVTRACK_OFFLINE", "1"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_from(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.cookie().unwrap(), "LOGIN_TOKEN=abc");
        assert_eq!(config.stock_bot_key().unwrap(), "secret");
        assert!(config.offline);
    }

    #[test]
    fn test_missing_secrets_are_config_errors() {
        let config = Config::default();
        let err = config.finkio_key().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Config(_))
        ));
        assert!(config.cookie().is_err());
    }

    #[test]
    fn test_explicit_cache_dir_wins() {
        let config = Config {
            cache_dir: Some(PathBuf::from("/tmp/divtrack-cache")),
            ..Config::default()
        };
        assert_eq!(
            config.cache_root().unwrap(),
            PathBuf::from("/tmp/divtrack-cache")
        );
    }
}
