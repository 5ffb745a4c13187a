//! Enrichment: a short AI write-up for a token, behind a client trait so the
//! pipeline can run against a real model, a fixed mock, or nothing at all.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EnrichConfig;
use crate::ingest::types::Item;

/// Substituted whenever enrichment fails for any reason.
pub const ANALYSIS_UNAVAILABLE: &str = "Analysis unavailable.";

#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("enrichment disabled (no API key configured)")]
    Disabled,
    #[error("enrichment request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("enrichment service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("enrichment response had no text")]
    MissingText,
}

/// Trait object used by the notification pipeline.
pub trait Enricher: Send + Sync {
    fn analyze<'a>(
        &'a self,
        item: &'a Item,
    ) -> Pin<Box<dyn Future<Output = Result<String, EnrichError>> + Send + 'a>>;
    /// Provider name for logs.
    fn provider_name(&self) -> &'static str;
}

pub type DynEnricher = Arc<dyn Enricher>;

/// Factory:
/// * `test_mode = "mock"` → fixed answer, no network.
/// * empty API key → disabled client (every item gets the fallback text).
/// * otherwise the Gemini provider.
pub fn build_enricher(cfg: &EnrichConfig) -> anyhow::Result<DynEnricher> {
    if cfg.is_mock() {
        return Ok(Arc::new(MockEnricher::new("Neutral assessment (mock).")));
    }
    if cfg.api_key.trim().is_empty() {
        tracing::warn!("API_KEY_GEMINI not set, enrichment disabled");
        return Ok(Arc::new(DisabledEnricher));
    }
    Ok(Arc::new(GeminiProvider::new(cfg)?))
}

/// Prompt sent to the model for one token.
pub fn build_prompt(item: &Item) -> String {
    format!(
        "You are an experienced cryptocurrency analyst. Analyze the following token and give a brief, direct and professional assessment.\n\n\
         Token information:\n\
         - Name: {}\n\
         - Symbol: {}\n\
         - Description: {}\n\
         - Website: {}\n\
         - Twitter: @{}\n\
         - GT Score: {}\n\n\
         Based only on the information provided, what is your overall assessment of the project?",
        item.name(),
        item.symbol(),
        item.description(),
        item.website(),
        item.twitter(),
        format_score(item),
    )
}

pub(crate) fn format_score(item: &Item) -> String {
    match item.attr("gt_score") {
        None | Some(serde_json::Value::Null) => crate::ingest::types::NOT_AVAILABLE.to_string(),
        Some(v) => match v.as_f64() {
            Some(s) => format!("{s}"),
            None => v.as_str().map_or_else(|| v.to_string(), str::to_string),
        },
    }
}

// ------------------------------------------------------------
// Gemini
// ------------------------------------------------------------

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}
#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}
#[derive(Serialize)]
struct GenerateReq<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
struct GenerateResp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}
#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}
#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<RespPart>,
}
#[derive(Deserialize)]
struct RespPart {
    text: Option<String>,
}

/// `generateContent` call against the Generative Language API.
pub struct GeminiProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(cfg: &EnrichConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("token-watch/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(cfg.timeout_secs.clamp(1, 10)))
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint(),
            api_key: cfg.api_key.clone(),
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String, EnrichError> {
        let req = GenerateReq {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EnrichError::Status {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        let body: GenerateResp = resp.json().await?;
        extract_text(body).ok_or(EnrichError::MissingText)
    }
}

fn extract_text(body: GenerateResp) -> Option<String> {
    body.candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

impl Enricher for GeminiProvider {
    fn analyze<'a>(
        &'a self,
        item: &'a Item,
    ) -> Pin<Box<dyn Future<Output = Result<String, EnrichError>> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(id = %item.id(), "requesting enrichment");
            let prompt = build_prompt(item);
            self.generate(&prompt).await
        })
    }
    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

/// Always fails with `Disabled`; the pipeline substitutes the fallback text.
pub struct DisabledEnricher;

impl Enricher for DisabledEnricher {
    fn analyze<'a>(
        &'a self,
        _item: &'a Item,
    ) -> Pin<Box<dyn Future<Output = Result<String, EnrichError>> + Send + 'a>> {
        Box::pin(async { Err(EnrichError::Disabled) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed answer for tests/local runs.
#[derive(Clone)]
pub struct MockEnricher {
    pub fixed: String,
}

impl MockEnricher {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
        }
    }
}

impl Enricher for MockEnricher {
    fn analyze<'a>(
        &'a self,
        _item: &'a Item,
    ) -> Pin<Box<dyn Future<Output = Result<String, EnrichError>> + Send + 'a>> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
