// src/ingest/providers/coingecko.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::ListingConfig;
use crate::ingest::types::{Item, ListingProvider};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Vec<Value>,
}

/// Recently updated token info from the CoinGecko on-chain API.
pub struct CoinGeckoProvider {
    mode: Mode,
}

enum Mode {
    // Own copy so tests need no 'static input.
    Fixture(String),
    Http {
        url: String,
        api_key: String,
        client: reqwest::Client,
    },
}

impl CoinGeckoProvider {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_config(cfg: &ListingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("token-watch/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(cfg.timeout_secs.clamp(1, 10)))
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()
            .context("building listing http client")?;
        Ok(Self {
            mode: Mode::Http {
                url: cfg.url.clone(),
                api_key: cfg.api_key.clone(),
                client,
            },
        })
    }

    /// Decode the `{data: [...]}` envelope. Elements that are not valid items
    /// are skipped so one bad record does not cost the whole batch.
    pub fn parse_items_from_str(s: &str) -> Result<Vec<Item>> {
        let env: Envelope = serde_json::from_str(s).context("parsing listing envelope")?;
        let mut out = Vec::with_capacity(env.data.len());
        for raw in env.data {
            match serde_json::from_value::<Item>(raw) {
                Ok(it) => out.push(it),
                Err(e) => tracing::warn!(error = %e, "skipping malformed listing item"),
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl ListingProvider for CoinGeckoProvider {
    async fn fetch_latest(&self) -> Result<Vec<Item>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s),
            Mode::Http {
                url,
                api_key,
                client,
            } => {
                tracing::info!(url = %url, "fetching recently updated tokens");
                let resp = client
                    .get(url)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .header("x-cg-demo-api-key", api_key)
                    .send()
                    .await
                    .context("listing http get()")?;

                let status = resp.status();
                let body = resp.text().await.context("listing http .text()")?;
                if !status.is_success() {
                    bail!("listing returned {status}: {}", truncate(&body, 300));
                }
                Self::parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "coingecko"
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_skips_bad_elements() {
        let body = r#"{"data":[
            {"id":"solana_A","attributes":{"gt_score":80},"relationships":{"network":{"data":{"id":"solana"}}}},
            {"attributes":{"name":"no id"}},
            {"id":"eth_B"}
        ]}"#;
        let p = CoinGeckoProvider::from_fixture_str(body);
        let items = p.fetch_latest().await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["solana_A", "eth_B"]);
        assert_eq!(items[0].score(), 80.0);
    }

    #[tokio::test]
    async fn missing_data_is_empty_batch() {
        let p = CoinGeckoProvider::from_fixture_str("{}");
        assert!(p.fetch_latest().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn garbage_is_an_error() {
        let p = CoinGeckoProvider::from_fixture_str("<html>oops</html>");
        assert!(p.fetch_latest().await.is_err());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("žluťoučký", 3), "žlu");
        assert_eq!(truncate("ab", 5), "ab");
    }
}
