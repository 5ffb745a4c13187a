// tests/common/mod.rs
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex};

use token_watch::enrich::{DynEnricher, MockEnricher};
use token_watch::ingest::types::{Item, ListingProvider};
use token_watch::notify::{Notifier, TokenAlert};
use token_watch::Collaborators;

/// Serves a fixed batch, or fails every fetch.
pub struct VecProvider {
    pub items: Vec<Item>,
    pub fail: bool,
}

#[async_trait::async_trait]
impl ListingProvider for VecProvider {
    async fn fetch_latest(&self) -> Result<Vec<Item>> {
        if self.fail {
            return Err(anyhow!("upstream returned 503"));
        }
        Ok(self.items.clone())
    }
    fn name(&self) -> &'static str {
        "vec"
    }
}

/// Records every delivery attempt; optionally fails them all.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub attempts: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn attempted_ids(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, alert: &TokenAlert) -> Result<()> {
        self.attempts.lock().unwrap().push(alert.item.id().to_string());
        if self.fail {
            return Err(anyhow!("535 authentication failed"));
        }
        Ok(())
    }
    fn channel_name(&self) -> &'static str {
        "recording"
    }
}

pub fn sol(id: &str, score: Option<f64>) -> Item {
    Item::new(id, "solana", score)
}

pub fn mock_enricher() -> DynEnricher {
    Arc::new(MockEnricher::new("Promising early-stage project."))
}

pub fn collab(items: Vec<Item>, notifier: &RecordingNotifier) -> Collaborators {
    Collaborators {
        provider: Box::new(VecProvider { items, fail: false }),
        enricher: mock_enricher(),
        notifier: Box::new(notifier.clone()),
    }
}
