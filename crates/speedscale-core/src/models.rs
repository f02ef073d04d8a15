//! Core data models shared by the backends, the orchestrator, and the ledger.
//!
//! Field names on the wire are camelCase to match the catalog API's JSON
//! (`inStock`, `imageUrl`, `createdAt`), and product identity arrives as
//! `_id`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A catalog item. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub created_at: String,
}

/// Response of `GET /api/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Free-text tier label, e.g. `"REDIS_CACHE"`.
    pub source: String,
    /// Latency with a unit suffix, e.g. `"12ms"`.
    pub time: String,
    pub cached: bool,
    pub count: usize,
    #[serde(default)]
    pub data: Vec<Product>,
}

impl SearchResult {
    pub fn latency_ms(&self) -> i64 {
        parse_latency_ms(&self.time)
    }
}

/// Response of `GET /api/products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEnvelope {
    pub data: Product,
    pub source: String,
    pub time: String,
    pub cached: bool,
}

impl ProductEnvelope {
    pub fn latency_ms(&self) -> i64 {
        parse_latency_ms(&self.time)
    }
}

/// Response of `GET /api/products/{id}/similar`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarEnvelope {
    #[serde(default)]
    pub data: Vec<Product>,
}

/// Response of `GET /health`. Replaced wholesale on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    /// Dependency name → reachable.
    #[serde(default)]
    pub connections: BTreeMap<String, bool>,
    /// Role → display label.
    #[serde(default)]
    pub servers: BTreeMap<String, String>,
}

impl HealthStatus {
    pub fn is_connected(&self, dependency: &str) -> bool {
        self.connections.get(dependency).copied().unwrap_or(false)
    }
}

/// One row of the history ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogEntry {
    pub id: String,
    pub timestamp: String,
    pub action: String,
    pub source: String,
    #[serde(alias = "latency")]
    pub latency_ms: i64,
    pub is_cache: bool,
}

impl AccessLogEntry {
    /// Build an entry stamped with a fresh id and the current time.
    pub fn new(
        action: impl Into<String>,
        source: impl Into<String>,
        latency_ms: i64,
        is_cache: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            action: action.into(),
            source: source.into(),
            latency_ms,
            is_cache,
        }
    }
}

/// Which screen currently consumes the fetched data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewState {
    #[default]
    Home,
    Results,
    Dashboard,
    Product,
}

/// Extract the leading integer from a latency string such as `"12ms"`.
///
/// Fractions are truncated (`"12.7ms"` → 12). Text without a leading number
/// yields 0.
pub fn parse_latency_ms(time: &str) -> i64 {
    let trimmed = time.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    match digits[..end].parse::<i64>() {
        Ok(v) if negative => -v,
        Ok(v) => v,
        Err(_) => 0,
    }
}
