//! Bounded, newest-first history of request outcomes.
//!
//! The ledger is the only ordered record of past requests. Consumers rely on
//! index 0 being the most recent entry and never sort.

use serde::{Deserialize, Serialize};

use crate::models::AccessLogEntry;

/// Hard cap on retained entries. Older entries are dropped silently.
pub const MAX_ENTRIES: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLedger {
    entries: Vec<AccessLogEntry>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `entry`, then truncate the tail to [`MAX_ENTRIES`].
    pub fn record(&mut self, entry: AccessLogEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_ENTRIES);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Newest first.
    pub fn entries(&self) -> &[AccessLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "[]".to_string())
    }

    /// Rehydrate from a persisted JSON array.
    ///
    /// Missing, corrupt, or non-array input yields an empty ledger. A
    /// persisted array longer than the cap keeps only its first
    /// [`MAX_ENTRIES`] items, which are the newest.
    pub fn from_json(raw: Option<&str>) -> Self {
        let mut entries: Vec<AccessLogEntry> = raw
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();
        entries.truncate(MAX_ENTRIES);
        Self { entries }
    }
}
