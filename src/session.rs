//! Process-wide session state that survives restarts.
//!
//! A [`Session`] owns the two durable values, the configured endpoint and
//! the history ledger, plus the runtime-only demo flag and request epoch.
//! It is built once at startup from a [`KeyValueStore`], mutated through
//! its methods, and mirrors every mutation back to the store.
//!
//! # Lifecycle
//!
//! 1. [`Session::load`] reads both keys once. Read or parse failures fall
//!    back to the default endpoint and an empty ledger; startup never fails
//!    on bad persisted data.
//! 2. Mutations ([`set_endpoint`](Session::set_endpoint),
//!    [`record`](Session::record), [`clear_history`](Session::clear_history))
//!    apply in memory first, then write through to the store.
//! 3. Nothing is ever destroyed; the ledger is only truncated or cleared.
//!
//! Readers such as the HTTP backend and the poller go through
//! [`Session::endpoint_url`] on every call, so an endpoint change is picked
//! up by the next request without restarting anything.
//!
//! # Epoch
//!
//! Every endpoint change or demo-mode toggle bumps [`Session::epoch`].
//! Callers capture the epoch before issuing a request and drop the outcome
//! if it has moved by the time the response arrives.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use reqwest::Url;
use tracing::{debug, info, warn};

use speedscale_core::ledger::HistoryLedger;
use speedscale_core::models::AccessLogEntry;
use speedscale_core::store::{KeyValueStore, ENDPOINT_KEY, HISTORY_KEY};

use crate::config::ClientConfig;
use crate::error::FetchError;
use crate::sanitize::{sanitize, SanitizeReason, Sanitized};

pub struct Session {
    store: Arc<dyn KeyValueStore>,
    default_endpoint: String,
    origin: Url,
    endpoint: RwLock<String>,
    warning: RwLock<Option<SanitizeReason>>,
    demo: AtomicBool,
    epoch: AtomicU64,
    history: RwLock<HistoryLedger>,
    /// Serializes write-through so the last write carries the latest state.
    persist: tokio::sync::Mutex<()>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Session {
    /// Rehydrate the session from `store`.
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        client: &ClientConfig,
        demo: bool,
    ) -> Result<Self> {
        let origin = Url::parse(&client.origin)
            .with_context(|| format!("Invalid client.origin: {}", client.origin))?;

        let stored_endpoint = match store.get(ENDPOINT_KEY).await {
            Ok(value) => Some(value.unwrap_or_else(|| client.default_endpoint.clone())),
            Err(e) => {
                warn!(error = %e, "could not read stored endpoint; using default");
                None
            }
        };
        let Sanitized { value, reason } = match stored_endpoint {
            Some(raw) => sanitize(Some(&raw), &client.default_endpoint),
            None => Sanitized {
                value: sanitize(None, &client.default_endpoint).value,
                reason: None,
            },
        };
        if let Some(reason) = reason {
            warn!(reason = %reason, "stored endpoint rejected: {}", reason.warning());
        }

        let history = match store.get(HISTORY_KEY).await {
            Ok(raw) => HistoryLedger::from_json(raw.as_deref()),
            Err(e) => {
                warn!(error = %e, "could not read stored history; starting empty");
                HistoryLedger::new()
            }
        };
        debug!(endpoint = %value, entries = history.len(), "session loaded");

        let session = Self {
            store,
            default_endpoint: client.default_endpoint.clone(),
            origin,
            endpoint: RwLock::new(value),
            warning: RwLock::new(reason),
            demo: AtomicBool::new(demo),
            epoch: AtomicU64::new(0),
            history: RwLock::new(history),
            persist: tokio::sync::Mutex::new(()),
        };
        if let Err(e) = session.persist_endpoint().await {
            warn!(error = %e, "could not persist endpoint");
        }
        Ok(session)
    }

    /// The current endpoint as configured (absolute URL or root-relative path).
    pub fn endpoint(&self) -> String {
        read(&self.endpoint).clone()
    }

    /// Warning produced by the most recent sanitization, if it fell back.
    pub fn endpoint_warning(&self) -> Option<SanitizeReason> {
        *read(&self.warning)
    }

    pub fn default_endpoint(&self) -> &str {
        &self.default_endpoint
    }

    /// Sanitize `raw`, make it the current endpoint, and persist it.
    pub async fn set_endpoint(&self, raw: &str) -> Sanitized {
        let sanitized = sanitize(Some(raw), &self.default_endpoint);
        *write(&self.endpoint) = sanitized.value.clone();
        *write(&self.warning) = sanitized.reason;
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        info!(endpoint = %sanitized.value, epoch, "endpoint changed");

        if let Err(e) = self.persist_endpoint().await {
            warn!(error = %e, "could not persist endpoint");
        }
        sanitized
    }

    /// The current endpoint as an absolute URL.
    pub fn base_url(&self) -> Result<Url, FetchError> {
        self.endpoint_url(&[])
    }

    /// Absolute request URL for `segments` below the current endpoint.
    ///
    /// Root-relative endpoints resolve against the configured origin.
    /// Segments are percent-encoded.
    pub fn endpoint_url(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let endpoint = self.endpoint();
        let mut url = if endpoint.starts_with('/') {
            self.origin.join(&endpoint)
        } else {
            Url::parse(&endpoint)
        }
        .map_err(|e| FetchError::Request(format!("invalid endpoint '{}': {}", endpoint, e)))?;

        url.path_segments_mut()
            .map_err(|_| FetchError::Request(format!("endpoint '{}' cannot be a base", endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn demo_mode(&self) -> bool {
        self.demo.load(Ordering::SeqCst)
    }

    pub fn set_demo_mode(&self, enabled: bool) {
        if self.demo.swap(enabled, Ordering::SeqCst) != enabled {
            let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            info!(enabled, epoch, "demo mode toggled");
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Ledger snapshot, newest first.
    pub fn history(&self) -> Vec<AccessLogEntry> {
        read(&self.history).entries().to_vec()
    }

    /// Append to the ledger and persist. Persistence failures are logged.
    pub async fn record(&self, entry: AccessLogEntry) {
        debug!(
            action = %entry.action,
            latency_ms = entry.latency_ms,
            cache = entry.is_cache,
            "ledger append"
        );
        write(&self.history).record(entry);
        if let Err(e) = self.persist_history().await {
            warn!(error = %e, "could not persist history");
        }
    }

    /// Empty the ledger and persist the empty state.
    pub async fn clear_history(&self) -> Result<()> {
        write(&self.history).clear();
        self.persist_history().await
    }

    async fn persist_endpoint(&self) -> Result<()> {
        let _guard = self.persist.lock().await;
        let value = self.endpoint();
        self.store.put(ENDPOINT_KEY, &value).await
    }

    async fn persist_history(&self) -> Result<()> {
        let _guard = self.persist.lock().await;
        let json = read(&self.history).to_json();
        self.store.put(HISTORY_KEY, &json).await
    }
}
