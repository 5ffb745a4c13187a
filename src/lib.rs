// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod enrich;
pub mod ingest;
pub mod notify;
pub mod pipeline;
pub mod runner;
pub mod state;

pub use crate::config::AppConfig;
pub use crate::ingest::types::Item;
pub use crate::runner::{Collaborators, RunReport, Runner};
pub use crate::state::{Catalog, JsonFileStore, Ledger, LedgerEntry, MemoryStore, StateStore};

use anyhow::Result;

use crate::ingest::providers::coingecko::CoinGeckoProvider;

/// Wire the production collaborators and state files from `cfg`, then run once.
pub async fn run_from_config(cfg: &AppConfig) -> Result<RunReport> {
    let collab = Collaborators {
        provider: Box::new(CoinGeckoProvider::from_config(&cfg.listing)?),
        enricher: enrich::build_enricher(&cfg.enrich)?,
        notifier: notify::build_notifier(&cfg.smtp)?,
    };
    tracing::info!(
        enricher = collab.enricher.provider_name(),
        notifier = collab.notifier.channel_name(),
        network = %cfg.ingest.target_network,
        threshold = cfg.ingest.score_threshold,
        "collaborators ready"
    );
    let store = JsonFileStore::new(&cfg.state.catalog_path, &cfg.state.ledger_path);
    let mut runner = Runner::from_store(
        cfg.ingest.clone(),
        cfg.state.catalog_commit,
        store,
        collab,
    );
    runner.run_once().await
}
