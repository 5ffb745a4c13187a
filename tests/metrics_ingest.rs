// tests/metrics_ingest.rs
// Own test binary: installs a global recorder.
mod common;

use common::RecordingNotifier;
use metrics_exporter_prometheus::PrometheusBuilder;
use token_watch::config::{CatalogCommit, IngestConfig};
use token_watch::enrich::DisabledEnricher;
use token_watch::{Collaborators, MemoryStore, Runner};

#[tokio::test]
async fn counters_exposed_after_run() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("recorder");

    let n = RecordingNotifier::failing();
    let collab = Collaborators {
        provider: Box::new(common::VecProvider {
            items: vec![common::sol("a", Some(99.0)), common::sol("b", Some(1.0))],
            fail: false,
        }),
        enricher: std::sync::Arc::new(DisabledEnricher),
        notifier: Box::new(n.clone()),
    };
    Runner::from_store(
        IngestConfig::default(),
        CatalogCommit::Deferred,
        MemoryStore::new(),
        collab,
    )
    .run_once()
    .await
    .unwrap();

    let out = handle.render();
    assert!(out.contains("ingest_items_total"));
    assert!(out.contains("ingest_new_total"));
    assert!(out.contains("ingest_qualifying_total"));
    assert!(out.contains("notify_enrich_fallback_total"));
    assert!(out.contains("notify_delivery_errors_total"));
    assert!(out.contains("ledger_writes_total"));
}
