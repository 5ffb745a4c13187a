// src/ingest/types.rs
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Placeholder used for any missing display field.
pub const NOT_AVAILABLE: &str = "N/A";

/// One token record as returned by the listing API.
///
/// The upstream object is kept as-is and serializes back byte-for-byte
/// equivalent (nulls, integer scores, absent keys). The fields the watcher
/// needs are read from it on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    id: String,
    raw: Map<String, Value>,
}

impl Item {
    /// Minimal item, mostly for tests and fixtures.
    pub fn new(id: impl Into<String>, network: impl Into<String>, score: Option<f64>) -> Self {
        let id = id.into();
        let network: String = network.into();
        let mut raw = Map::new();
        raw.insert("id".into(), Value::String(id.clone()));
        raw.insert(
            "attributes".into(),
            json!({ "gt_score": score.map(Value::from).unwrap_or(Value::Null) }),
        );
        raw.insert(
            "relationships".into(),
            json!({ "network": { "data": { "id": network } } }),
        );
        Self { id, raw }
    }

    /// Wrap an upstream object. Fails only when `id` is missing or not a string.
    pub fn from_raw(raw: Map<String, Value>) -> Result<Self, String> {
        let id = match raw.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => return Err(format!("`id` must be a string, got {other}")),
            None => return Err("missing `id`".into()),
        };
        Ok(Self { id, raw })
    }

    /// Set `attributes.<key>`, creating the object if needed.
    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        let attrs = self
            .raw
            .entry("attributes")
            .or_insert_with(|| Value::Object(Map::new()));
        if !attrs.is_object() {
            *attrs = Value::Object(Map::new());
        }
        if let Value::Object(m) = attrs {
            m.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw `attributes.<key>`, `null` included.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.raw.get("attributes").and_then(|a| a.get(key))
    }

    fn attr_str(&self, key: &str) -> Option<&str> {
        self.attr(key).and_then(Value::as_str)
    }

    pub fn network_id(&self) -> Option<&str> {
        self.raw
            .get("relationships")
            .and_then(|r| r.pointer("/network/data/id"))
            .and_then(Value::as_str)
    }

    /// Missing, `null` or non-numeric score counts as 0.
    pub fn score(&self) -> f64 {
        self.attr("gt_score").and_then(Value::as_f64).unwrap_or(0.0)
    }

    pub fn name(&self) -> &str {
        self.attr_str("name").unwrap_or(NOT_AVAILABLE)
    }

    pub fn symbol(&self) -> &str {
        self.attr_str("symbol").unwrap_or(NOT_AVAILABLE)
    }

    pub fn address(&self) -> &str {
        self.attr_str("address").unwrap_or(NOT_AVAILABLE)
    }

    pub fn description(&self) -> &str {
        self.attr_str("description").unwrap_or(NOT_AVAILABLE)
    }

    /// First listed website.
    pub fn website(&self) -> &str {
        self.attr("websites")
            .and_then(Value::as_array)
            .and_then(|w| w.first())
            .and_then(Value::as_str)
            .unwrap_or(NOT_AVAILABLE)
    }

    pub fn twitter(&self) -> &str {
        self.attr_str("twitter_handle")
            .filter(|h| !h.is_empty())
            .unwrap_or(NOT_AVAILABLE)
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        Item::from_raw(raw).map_err(de::Error::custom)
    }
}

/// Source of raw listing batches.
#[async_trait::async_trait]
pub trait ListingProvider: Send + Sync {
    /// Latest batch in upstream order.
    async fn fetch_latest(&self) -> anyhow::Result<Vec<Item>>;
    fn name(&self) -> &'static str;
}
