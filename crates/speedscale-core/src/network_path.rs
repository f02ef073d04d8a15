//! Network-path state machine.
//!
//! Derives the visualization signal for which tier served the most recent
//! request. The machine holds only the latest state; it is never a history
//! of tiers.
//!
//! ```text
//!            started / failed / navigated away
//!      ┌───────────────────────────────────────────┐
//!      ▼                                           │
//!   ┌──────┐  completed(cached)   ┌───────────┐    │
//!   │ IDLE │────────────────────▶│ CACHE_HIT │────┤
//!   └──────┘                     └───────────┘    │
//!      │     completed(!cached)  ┌───────────┐    │
//!      └────────────────────────▶│  DB_MISS  │────┘
//!                                └───────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::models::ViewState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkPath {
    #[default]
    Idle,
    CacheHit,
    DbMiss,
}

impl NetworkPath {
    /// Tier classification rule shared by searches and product views.
    pub fn from_cached(cached: bool) -> Self {
        if cached {
            NetworkPath::CacheHit
        } else {
            NetworkPath::DbMiss
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkPath::Idle => "IDLE",
            NetworkPath::CacheHit => "CACHE_HIT",
            NetworkPath::DbMiss => "DB_MISS",
        }
    }
}

impl std::fmt::Display for NetworkPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that drive [`NetworkPath`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEvent {
    /// A new request went in flight.
    RequestStarted,
    /// A search or product view completed; `cached` is the tier flag.
    Completed { cached: bool },
    /// The request failed.
    Failed,
    /// The user navigated to another view.
    Navigated(ViewState),
}

/// Apply one event to the current state.
pub fn transition(_current: NetworkPath, event: PathEvent) -> NetworkPath {
    match event {
        PathEvent::Completed { cached } => NetworkPath::from_cached(cached),
        PathEvent::RequestStarted | PathEvent::Failed | PathEvent::Navigated(_) => {
            NetworkPath::Idle
        }
    }
}
