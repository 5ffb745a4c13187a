// src/config/mod.rs
pub mod ai;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use ai::EnrichConfig;

const ENV_CONFIG_PATH: &str = "TOKEN_WATCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/token_watch.toml";

pub const DEFAULT_LISTING_URL: &str =
    "https://api.coingecko.com/api/v3/onchain/tokens/info_recently_updated";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ingest: IngestConfig,
    pub listing: ListingConfig,
    pub enrich: EnrichConfig,
    pub smtp: SmtpConfig,
    pub state: StateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    pub target_network: String,
    pub score_threshold: f64,
    pub max_new_per_run: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            target_network: "solana".to_string(),
            score_threshold: 60.0,
            max_new_per_run: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LISTING_URL.to_string(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Login and sender address.
    pub username: String,
    pub password: String,
    pub recipients: Vec<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            recipients: Vec::new(),
        }
    }
}

impl SmtpConfig {
    /// Email is only attempted once a sender account is configured.
    pub fn is_enabled(&self) -> bool {
        !self.username.trim().is_empty()
    }
}

/// When qualifying items enter the persisted catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogCommit {
    /// Qualifying items are catalogued only after their ledger entry is on disk.
    #[default]
    Deferred,
    /// Everything newly seen is catalogued before any notification goes out.
    Eager,
}

impl FromStr for CatalogCommit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deferred" => Ok(Self::Deferred),
            "eager" => Ok(Self::Eager),
            other => Err(anyhow!("unknown catalog commit policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub catalog_path: PathBuf,
    pub ledger_path: PathBuf,
    pub catalog_commit: CatalogCommit,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("solana_tokens.json"),
            ledger_path: PathBuf::from("processed_tokens.json"),
            catalog_commit: CatalogCommit::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the optional TOML file, then environment variables:
    /// 1) $TOKEN_WATCH_CONFIG (must exist)
    /// 2) config/token_watch.toml (if present)
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    bail!("{ENV_CONFIG_PATH} points to non-existent path");
                }
                Self::from_toml_file(&pb)?
            }
            Err(_) => {
                let default_p = Path::new(DEFAULT_CONFIG_PATH);
                if default_p.exists() {
                    Self::from_toml_file(default_p)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Override fields from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        env_string("TARGET_NETWORK", &mut self.ingest.target_network);
        env_parse("GT_SCORE_THRESHOLD", &mut self.ingest.score_threshold)?;
        env_parse("MAX_TOKENS_PER_CHECK", &mut self.ingest.max_new_per_run)?;

        env_string("LISTING_URL", &mut self.listing.url);
        env_string("API_KEY_COINGECKO", &mut self.listing.api_key);
        env_parse("HTTP_TIMEOUT_SECS", &mut self.listing.timeout_secs)?;

        env_parse("HTTP_TIMEOUT_SECS", &mut self.enrich.timeout_secs)?;
        self.enrich.apply_env()?;

        env_string("SMTP_HOST", &mut self.smtp.host);
        env_parse("SMTP_PORT", &mut self.smtp.port)?;
        env_string("EMAIL_ADDRESS", &mut self.smtp.username);
        env_string("EMAIL_PASSWORD", &mut self.smtp.password);
        if let Ok(list) = std::env::var("TO_EMAILS") {
            self.smtp.recipients = split_recipients(&list);
        }

        if let Ok(p) = std::env::var("CATALOG_PATH") {
            self.state.catalog_path = PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("LEDGER_PATH") {
            self.state.ledger_path = PathBuf::from(p);
        }
        env_parse("CATALOG_COMMIT", &mut self.state.catalog_commit)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.ingest.target_network.trim().is_empty() {
            bail!("target network must not be empty");
        }
        if !self.ingest.score_threshold.is_finite() {
            bail!("score threshold must be a finite number");
        }
        Ok(())
    }
}

/// Comma separated list; blanks dropped.
pub fn split_recipients(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn env_string(key: &str, slot: &mut String) {
    if let Ok(v) = std::env::var(key) {
        *slot = v;
    }
}

pub(crate) fn env_parse<T>(key: &str, slot: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = std::env::var(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {key}={raw:?}: {e}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    const KEYS: &[&str] = &[
        ENV_CONFIG_PATH,
        "TARGET_NETWORK",
        "GT_SCORE_THRESHOLD",
        "MAX_TOKENS_PER_CHECK",
        "TO_EMAILS",
        "CATALOG_COMMIT",
        "SMTP_PORT",
    ];

    fn clear_env() {
        for k in KEYS {
            env::remove_var(k);
        }
    }

    #[test]
    fn recipients_are_trimmed() {
        assert_eq!(
            split_recipients(" a@x.io, ,b@y.io,"),
            vec!["a@x.io".to_string(), "b@y.io".to_string()]
        );
    }

    #[test]
    fn commit_policy_parses() {
        assert_eq!("Eager".parse::<CatalogCommit>().unwrap(), CatalogCommit::Eager);
        assert!("later".parse::<CatalogCommit>().is_err());
    }

    #[serial_test::serial]
    #[test]
    fn file_then_env_overrides() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("watch.toml");
        fs::write(
            &p,
            r#"
            [ingest]
            target_network = "base"
            score_threshold = 75.0

            [state]
            catalog_commit = "eager"
            "#,
        )
        .unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        env::set_var("MAX_TOKENS_PER_CHECK", "5");
        env::set_var("TO_EMAILS", "a@x.io,b@y.io");

        let cfg = AppConfig::load().unwrap();
        assert_eq!(cfg.ingest.target_network, "base");
        assert_eq!(cfg.ingest.score_threshold, 75.0);
        assert_eq!(cfg.ingest.max_new_per_run, 5);
        assert_eq!(cfg.state.catalog_commit, CatalogCommit::Eager);
        assert_eq!(cfg.smtp.recipients.len(), 2);
        assert_eq!(cfg.smtp.port, 587);

        clear_env();
    }

    #[serial_test::serial]
    #[test]
    fn bad_number_is_an_error() {
        clear_env();
        env::set_var("GT_SCORE_THRESHOLD", "sixty");
        let mut cfg = AppConfig::default();
        assert!(cfg.apply_env().is_err());
        clear_env();
    }

    #[serial_test::serial]
    #[test]
    fn missing_explicit_path_is_an_error() {
        clear_env();
        env::set_var(ENV_CONFIG_PATH, "/definitely/not/here.toml");
        assert!(AppConfig::load().is_err());
        clear_env();
    }
}
