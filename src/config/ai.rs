// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::env;

use super::{env_parse, env_string};

pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";

fn default_base_url() -> String {
    DEFAULT_GEMINI_BASE.to_string()
}
fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichConfig {
    /// "ENV" means: read from API_KEY_GEMINI.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// "mock" swaps the remote call for a fixed answer.
    #[serde(default)]
    pub test_mode: Option<String>,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            test_mode: None,
        }
    }
}

impl EnrichConfig {
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        env_string("API_KEY_GEMINI", &mut self.api_key);
        env_string("GEMINI_MODEL", &mut self.model);
        env_string("GEMINI_BASE_URL", &mut self.base_url);
        env_parse("ENRICH_TIMEOUT_SECS", &mut self.timeout_secs)?;
        if let Ok(mode) = env::var("ENRICH_TEST_MODE") {
            self.test_mode = Some(mode);
        }

        // A TOML file may say api_key = "ENV" without the variable being set.
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = env::var("API_KEY_GEMINI").unwrap_or_default();
        }
        self.model = self.model.trim().to_string();
        Ok(())
    }

    pub fn is_mock(&self) -> bool {
        self.test_mode
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("mock"))
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_model() {
        let cfg = EnrichConfig {
            base_url: "http://localhost:9/v1beta/".into(),
            model: "m1".into(),
            ..Default::default()
        };
        assert_eq!(cfg.endpoint(), "http://localhost:9/v1beta/models/m1:generateContent");
    }

    #[serial_test::serial]
    #[test]
    fn env_placeholder_resolves_key() {
        env::set_var("API_KEY_GEMINI", "k-123");
        let mut cfg = EnrichConfig {
            api_key: "ENV".into(),
            ..Default::default()
        };
        cfg.apply_env().unwrap();
        assert_eq!(cfg.api_key, "k-123");
        env::remove_var("API_KEY_GEMINI");
    }
}
