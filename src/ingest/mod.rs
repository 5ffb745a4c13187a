// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::config::IngestConfig;
use crate::ingest::types::{Item, ListingProvider};
use crate::state::{Catalog, Ledger};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Raw items returned by the listing API.");
        describe_counter!("ingest_new_total", "Items accepted as newly seen.");
        describe_counter!(
            "ingest_qualifying_total",
            "Newly seen items above the score threshold and not yet notified."
        );
        describe_counter!(
            "ingest_cap_hits_total",
            "Runs that stopped scanning at the per-run cap."
        );
        describe_counter!("ingest_fetch_errors_total", "Listing fetch failures.");
    });
}

/// Drop counters for a single filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub scanned: usize,
    pub wrong_network: usize,
    pub already_seen: usize,
    pub cap_reached: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub newly_seen: Vec<Item>,
    /// Always a subset of `newly_seen`, same order.
    pub qualifying: Vec<Item>,
    pub stats: IngestStats,
}

/// Strict: a score equal to the threshold does not qualify.
pub fn is_above_threshold(item: &Item, threshold: f64) -> bool {
    item.score() > threshold
}

/// Partition a raw batch into newly seen and qualifying items.
///
/// Rules are applied per item in batch order: wrong network, then already
/// catalogued (including earlier in this batch), then the per-run cap which
/// stops the scan. Catalog and ledger are only read here; the caller decides
/// when to commit.
pub fn filter_batch(
    raw: Vec<Item>,
    catalog: &Catalog,
    ledger: &Ledger,
    cfg: &IngestConfig,
) -> IngestOutcome {
    let mut out = IngestOutcome::default();
    let mut seen_this_run: HashSet<String> = HashSet::new();

    for item in raw {
        out.stats.scanned += 1;

        if item.network_id() != Some(cfg.target_network.as_str()) {
            out.stats.wrong_network += 1;
            continue;
        }

        if catalog.contains(item.id()) || seen_this_run.contains(item.id()) {
            out.stats.already_seen += 1;
            continue;
        }

        if out.newly_seen.len() >= cfg.max_new_per_run {
            out.stats.cap_reached = true;
            tracing::info!(
                cap = cfg.max_new_per_run,
                "per-run cap reached, remaining items left for next run"
            );
            break;
        }

        seen_this_run.insert(item.id().to_string());
        if is_above_threshold(&item, cfg.score_threshold) && !ledger.contains(item.id()) {
            out.qualifying.push(item.clone());
        }
        out.newly_seen.push(item);
    }

    out
}

/// Fetch one batch and filter it. A fetch failure yields an empty outcome.
pub async fn run_once(
    provider: &dyn ListingProvider,
    catalog: &Catalog,
    ledger: &Ledger,
    cfg: &IngestConfig,
) -> IngestOutcome {
    ensure_metrics_described();

    let raw = match provider.fetch_latest().await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = ?e, provider = provider.name(), "listing fetch failed");
            counter!("ingest_fetch_errors_total").increment(1);
            Vec::new()
        }
    };
    counter!("ingest_items_total").increment(raw.len() as u64);

    let out = filter_batch(raw, catalog, ledger, cfg);

    counter!("ingest_new_total").increment(out.newly_seen.len() as u64);
    counter!("ingest_qualifying_total").increment(out.qualifying.len() as u64);
    if out.stats.cap_reached {
        counter!("ingest_cap_hits_total").increment(1);
    }

    tracing::info!(
        scanned = out.stats.scanned,
        wrong_network = out.stats.wrong_network,
        already_seen = out.stats.already_seen,
        new = out.newly_seen.len(),
        qualifying = out.qualifying.len(),
        "ingest pass finished"
    );

    out
}
