//! Durable catalog + ledger.
//!
//! Both resources are rewritten wholesale on every persist. The JSON store
//! writes to a sibling `.tmp` file and renames it over the target so a crash
//! never leaves a truncated file behind.

pub mod catalog;
pub mod ledger;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub use catalog::Catalog;
pub use ledger::{Ledger, LedgerEntry};

use crate::ingest::types::Item;

/// Storage seam for the run driver.
///
/// Loads never fail: a missing or corrupt resource is an empty one.
/// Persists overwrite the whole resource and must surface I/O errors.
pub trait StateStore: Send + Sync {
    fn load_catalog(&self) -> Catalog;
    fn load_ledger(&self) -> Ledger;
    fn persist_catalog(&self, catalog: &Catalog) -> Result<()>;
    fn persist_ledger(&self, ledger: &Ledger) -> Result<()>;
}

/// Two pretty-printed JSON files.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    catalog_path: PathBuf,
    ledger_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(catalog_path: impl Into<PathBuf>, ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            ledger_path: ledger_path.into(),
        }
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }
}

impl StateStore for JsonFileStore {
    fn load_catalog(&self) -> Catalog {
        let raw: Vec<Value> = read_json_or_default(&self.catalog_path);
        let items = raw.into_iter().filter_map(|v| match serde_json::from_value::<Item>(v) {
            Ok(it) => Some(it),
            Err(e) => {
                tracing::warn!(path = %self.catalog_path.display(), error = %e, "skipping bad catalog entry");
                None
            }
        });
        Catalog::from_items(items.collect())
    }

    fn load_ledger(&self) -> Ledger {
        let raw: Map<String, Value> = read_json_or_default(&self.ledger_path);
        raw.into_iter()
            .filter_map(|(id, v)| match serde_json::from_value::<LedgerEntry>(v) {
                Ok(entry) => Some((id, entry)),
                Err(e) => {
                    tracing::warn!(path = %self.ledger_path.display(), %id, error = %e, "skipping bad ledger entry");
                    None
                }
            })
            .collect()
    }

    fn persist_catalog(&self, catalog: &Catalog) -> Result<()> {
        write_json_atomic(&self.catalog_path, catalog.items())
            .with_context(|| format!("writing catalog {}", self.catalog_path.display()))
    }

    fn persist_ledger(&self, ledger: &Ledger) -> Result<()> {
        write_json_atomic(&self.ledger_path, ledger)
            .with_context(|| format!("writing ledger {}", self.ledger_path.display()))
    }
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "state unreadable, starting empty");
            return T::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "state corrupt, starting empty");
            T::default()
        }
    }
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut f = fs::File::create(&tmp)?;
    f.write_all(&json)?;
    f.sync_all()?;
    drop(f);
    fs::rename(tmp, path)?;
    Ok(())
}

/// In-process store, for tests and dry runs. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    catalog: Vec<Item>,
    ledger: Ledger,
    catalog_writes: usize,
    ledger_writes: usize,
    /// Ledger writes allowed before every further one fails.
    ledger_write_budget: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every ledger write after the first `n` fail.
    pub fn fail_ledger_writes_after(&self, n: usize) {
        self.lock().ledger_write_budget = Some(n);
    }

    pub fn clear_failures(&self) {
        self.lock().ledger_write_budget = None;
    }

    pub fn catalog_ids(&self) -> Vec<String> {
        self.lock().catalog.iter().map(|i| i.id().to_string()).collect()
    }

    pub fn ledger(&self) -> Ledger {
        self.lock().ledger.clone()
    }

    pub fn catalog_writes(&self) -> usize {
        self.lock().catalog_writes
    }

    pub fn ledger_writes(&self) -> usize {
        self.lock().ledger_writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // A panicking test thread must not hide the state from the others.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl StateStore for MemoryStore {
    fn load_catalog(&self) -> Catalog {
        Catalog::from_items(self.lock().catalog.clone())
    }

    fn load_ledger(&self) -> Ledger {
        self.lock().ledger.clone()
    }

    fn persist_catalog(&self, catalog: &Catalog) -> Result<()> {
        let mut g = self.lock();
        g.catalog = catalog.items().to_vec();
        g.catalog_writes += 1;
        Ok(())
    }

    fn persist_ledger(&self, ledger: &Ledger) -> Result<()> {
        let mut g = self.lock();
        if let Some(budget) = g.ledger_write_budget {
            if g.ledger_writes >= budget {
                anyhow::bail!("ledger write rejected (simulated failure)");
            }
        }
        g.ledger = ledger.clone();
        g.ledger_writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> JsonFileStore {
        JsonFileStore::new(dir.join("tokens.json"), dir.join("state/processed.json"))
    }

    #[test]
    fn missing_files_load_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let s = store_in(tmp.path());
        assert!(s.load_catalog().is_empty());
        assert!(s.load_ledger().is_empty());
    }

    #[test]
    fn corrupt_files_load_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let s = store_in(tmp.path());
        fs::write(s.catalog_path(), "[{\"id\": ").unwrap();
        fs::create_dir_all(s.ledger_path().parent().unwrap()).unwrap();
        fs::write(s.ledger_path(), "not json").unwrap();
        assert!(s.load_catalog().is_empty());
        assert!(s.load_ledger().is_empty());
    }

    #[test]
    fn persist_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let s = store_in(tmp.path());

        let catalog = Catalog::from_items(vec![
            Item::new("a", "solana", Some(10.0)),
            Item::new("b", "solana", Some(90.0)),
        ]);
        let mut ledger = Ledger::default();
        ledger.record(LedgerEntry::now(Item::new("b", "solana", Some(90.0)), "nice".into()));

        s.persist_catalog(&catalog).unwrap();
        s.persist_ledger(&ledger).unwrap();

        let c2 = s.load_catalog();
        assert_eq!(c2.len(), 2);
        assert!(c2.contains("a") && c2.contains("b"));
        assert_eq!(s.load_ledger(), ledger);

        // Atomic replace leaves no temp files around.
        assert!(!tmp.path().join("tokens.json.tmp").exists());
        assert!(!tmp.path().join("state/processed.json.tmp").exists());
    }

    #[test]
    fn catalog_file_is_a_json_array_of_items() {
        let tmp = tempfile::tempdir().unwrap();
        let s = store_in(tmp.path());
        s.persist_catalog(&Catalog::from_items(vec![Item::new("a", "solana", None)]))
            .unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(s.catalog_path()).unwrap()).unwrap();
        assert_eq!(v[0]["id"], "a");
    }

    #[test]
    fn one_bad_entry_does_not_empty_the_state() {
        let tmp = tempfile::tempdir().unwrap();
        let s = store_in(tmp.path());
        fs::write(
            s.catalog_path(),
            r#"[{"id":"a"},{"id":42},"junk",{"id":"b","attributes":{"gt_score":"high"}}]"#,
        )
        .unwrap();
        fs::create_dir_all(s.ledger_path().parent().unwrap()).unwrap();
        fs::write(
            s.ledger_path(),
            r#"{
                "good": {"processed_at":"2024-01-01T00:00:00Z","token_info":{"id":"good"},"ai_analysis":"ok"},
                "odd": {"processed_at":"2024-01-01T00:00:00Z","token_info":{"id":"odd"},"ai_analysis":7},
                "bare": "legacy"
            }"#,
        )
        .unwrap();

        let c = s.load_catalog();
        assert_eq!(c.len(), 2);
        assert!(c.contains("a") && c.contains("b"));

        let l = s.load_ledger();
        assert_eq!(l.len(), 1);
        assert_eq!(l.get("good").unwrap().enrichment_result, "ok");
    }

    #[test]
    fn memory_store_can_reject_ledger_writes() {
        let m = MemoryStore::new();
        m.fail_ledger_writes_after(1);
        assert!(m.persist_ledger(&Ledger::default()).is_ok());
        assert!(m.persist_ledger(&Ledger::default()).is_err());
        assert_eq!(m.ledger_writes(), 1);
    }
}
