// src/state/ledger.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ingest::types::Item;

/// `processed_at` format, UTC with a literal `Z`.
pub const PROCESSED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Terminal record for one notified item. Field names match the on-disk
/// format written by earlier versions of the watcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub processed_at: String,
    #[serde(rename = "token_info")]
    pub source_item: Item,
    #[serde(rename = "ai_analysis")]
    pub enrichment_result: String,
}

impl LedgerEntry {
    pub fn at(ts: DateTime<Utc>, source_item: Item, enrichment_result: String) -> Self {
        Self {
            processed_at: ts.format(PROCESSED_AT_FORMAT).to_string(),
            source_item,
            enrichment_result,
        }
    }

    pub fn now(source_item: Item, enrichment_result: String) -> Self {
        Self::at(Utc::now(), source_item, enrichment_result)
    }

    pub fn id(&self) -> &str {
        self.source_item.id()
    }
}

/// Ids that already triggered a notification. Presence is final.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&LedgerEntry> {
        self.entries.get(id)
    }

    /// First record wins; a second one for the same id is ignored.
    pub fn record(&mut self, entry: LedgerEntry) -> bool {
        if self.entries.contains_key(entry.id()) {
            return false;
        }
        self.entries.insert(entry.id().to_string(), entry);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Keyed as given; used when loading, where the file's map key is authoritative.
impl FromIterator<(String, LedgerEntry)> for Ledger {
    fn from_iter<I: IntoIterator<Item = (String, LedgerEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn entry_timestamp_format() {
        let ts = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 5).unwrap();
        let e = LedgerEntry::at(ts, Item::new("a", "solana", Some(90.0)), "ok".into());
        assert_eq!(e.processed_at, "2025-09-06T09:00:05Z");
    }

    #[test]
    fn serializes_as_object_keyed_by_id() {
        let mut l = Ledger::default();
        l.record(LedgerEntry::now(Item::new("a", "solana", None), "txt".into()));
        let v = serde_json::to_value(&l).unwrap();
        assert_eq!(v["a"]["ai_analysis"], "txt");
        assert_eq!(v["a"]["token_info"]["id"], "a");
    }

    #[test]
    fn first_record_wins() {
        let mut l = Ledger::default();
        assert!(l.record(LedgerEntry::now(Item::new("a", "solana", None), "one".into())));
        assert!(!l.record(LedgerEntry::now(Item::new("a", "solana", None), "two".into())));
        assert_eq!(l.get("a").unwrap().enrichment_result, "one");
    }
}
