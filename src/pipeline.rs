//! Per-item notification: enrich, deliver, record.
//!
//! The three steps always run in this order and the ledger write always
//! happens, whatever the first two did. Only a failed ledger write is an
//! error, because after it the at-most-once guarantee no longer holds.

use anyhow::{Context, Result};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::enrich::{Enricher, ANALYSIS_UNAVAILABLE};
use crate::ingest::types::Item;
use crate::notify::{Notifier, TokenAlert};
use crate::state::{Ledger, LedgerEntry, StateStore};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "notify_enrich_fallback_total",
            "Items whose enrichment failed and got the fallback text."
        );
        describe_counter!(
            "notify_delivery_errors_total",
            "Alert deliveries that failed (item still recorded)."
        );
        describe_counter!("ledger_writes_total", "Ledger persists after a processed item.");
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub id: String,
    /// False when the fallback text was used.
    pub enriched: bool,
    pub delivered: bool,
}

/// Enrichment text for `item`, or the fallback on any failure.
pub async fn enrich_or_fallback(enricher: &dyn Enricher, item: &Item) -> (String, bool) {
    match enricher.analyze(item).await {
        Ok(text) => (text, true),
        Err(e) => {
            tracing::warn!(
                id = %item.id(),
                provider = enricher.provider_name(),
                error = %e,
                "enrichment failed, using fallback"
            );
            counter!("notify_enrich_fallback_total").increment(1);
            (ANALYSIS_UNAVAILABLE.to_string(), false)
        }
    }
}

/// Run the three steps for one qualifying item and persist the ledger.
pub async fn process_item(
    item: Item,
    threshold: f64,
    enricher: &dyn Enricher,
    notifier: &dyn Notifier,
    ledger: &mut Ledger,
    store: &dyn StateStore,
) -> Result<NotifyOutcome> {
    ensure_metrics_described();
    let id = item.id().to_string();
    tracing::info!(id = %id, score = item.score(), "processing high-score token");

    let (analysis, enriched) = enrich_or_fallback(enricher, &item).await;

    let alert = TokenAlert {
        item,
        analysis,
        threshold,
    };
    let delivered = match notifier.send(&alert).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(
                id = %id,
                channel = notifier.channel_name(),
                error = ?e,
                "alert delivery failed, marking processed anyway"
            );
            counter!("notify_delivery_errors_total").increment(1);
            false
        }
    };

    let TokenAlert { item, analysis, .. } = alert;
    ledger.record(LedgerEntry::now(item, analysis));
    store
        .persist_ledger(ledger)
        .with_context(|| format!("recording {id} as processed"))?;
    counter!("ledger_writes_total").increment(1);
    tracing::info!(id = %id, "token marked as processed");

    Ok(NotifyOutcome {
        id,
        enriched,
        delivered,
    })
}
