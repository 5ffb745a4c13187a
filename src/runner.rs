//! Single-shot run: fetch → filter → persist catalog → notify each
//! qualifying item, persisting the ledger after every one.
//!
//! Precondition: at most one run against the same state files at a time.
//! Nothing here locks them.

use anyhow::{Context, Result};
use std::collections::HashSet;

use crate::config::{CatalogCommit, IngestConfig};
use crate::enrich::DynEnricher;
use crate::ingest::{self, types::ListingProvider, IngestOutcome};
use crate::notify::Notifier;
use crate::pipeline;
use crate::state::{Catalog, Ledger, StateStore};

/// External services a run talks to.
pub struct Collaborators {
    pub provider: Box<dyn ListingProvider>,
    pub enricher: DynEnricher,
    pub notifier: Box<dyn Notifier>,
}

/// Counters for one run, logged by the binary and asserted in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub scanned: usize,
    pub newly_seen: usize,
    pub catalogued: usize,
    pub qualifying: usize,
    pub notified: usize,
    pub enrich_fallbacks: usize,
    pub delivery_failures: usize,
    pub cap_reached: bool,
}

pub struct Runner<S: StateStore> {
    cfg: IngestConfig,
    commit: CatalogCommit,
    store: S,
    catalog: Catalog,
    ledger: Ledger,
    collab: Collaborators,
}

impl<S: StateStore> Runner<S> {
    pub fn new(
        cfg: IngestConfig,
        commit: CatalogCommit,
        store: S,
        catalog: Catalog,
        ledger: Ledger,
        collab: Collaborators,
    ) -> Self {
        Self {
            cfg,
            commit,
            store,
            catalog,
            ledger,
            collab,
        }
    }

    /// Load both sets from `store` and build a runner over them.
    pub fn from_store(
        cfg: IngestConfig,
        commit: CatalogCommit,
        store: S,
        collab: Collaborators,
    ) -> Self {
        let catalog = store.load_catalog();
        let ledger = store.load_ledger();
        tracing::info!(
            catalog = catalog.len(),
            ledger = ledger.len(),
            "state loaded"
        );
        Self::new(cfg, commit, store, catalog, ledger, collab)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// One full run. Only a failed state write is returned as an error.
    pub async fn run_once(&mut self) -> Result<RunReport> {
        let IngestOutcome {
            newly_seen,
            qualifying,
            stats,
        } = ingest::run_once(
            self.collab.provider.as_ref(),
            &self.catalog,
            &self.ledger,
            &self.cfg,
        )
        .await;

        let mut report = RunReport {
            scanned: stats.scanned,
            newly_seen: newly_seen.len(),
            qualifying: qualifying.len(),
            cap_reached: stats.cap_reached,
            ..Default::default()
        };

        // Deferred: qualifying ids reach the catalog only after their ledger entry.
        let held_back: HashSet<&str> = match self.commit {
            CatalogCommit::Deferred => qualifying.iter().map(|i| i.id()).collect(),
            CatalogCommit::Eager => HashSet::new(),
        };
        let added = self.catalog.extend(
            newly_seen
                .iter()
                .filter(|i| !held_back.contains(i.id()))
                .cloned(),
        );
        if added > 0 {
            self.store
                .persist_catalog(&self.catalog)
                .context("persisting catalog after ingest")?;
            tracing::info!(added, total = self.catalog.len(), "catalog saved");
        }
        report.catalogued = added;

        for item in qualifying {
            let outcome = pipeline::process_item(
                item.clone(),
                self.cfg.score_threshold,
                self.collab.enricher.as_ref(),
                self.collab.notifier.as_ref(),
                &mut self.ledger,
                &self.store,
            )
            .await?;

            if self.commit == CatalogCommit::Deferred && self.catalog.insert(item) {
                self.store
                    .persist_catalog(&self.catalog)
                    .with_context(|| format!("cataloguing {}", outcome.id))?;
                report.catalogued += 1;
            }

            report.notified += 1;
            if !outcome.enriched {
                report.enrich_fallbacks += 1;
            }
            if !outcome.delivered {
                report.delivery_failures += 1;
            }
        }

        tracing::info!(
            scanned = report.scanned,
            new = report.newly_seen,
            qualifying = report.qualifying,
            notified = report.notified,
            delivery_failures = report.delivery_failures,
            "run finished"
        );
        Ok(report)
    }
}
