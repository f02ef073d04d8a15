//! Periodic health and trending refresh.
//!
//! Two independent tasks run on `tokio` intervals from [`Poller::start`]
//! until the returned [`PollerHandle`] is shut down or dropped:
//!
//! | Task | Period | First call | Failure |
//! |------|--------|------------|---------|
//! | health | 5s | immediate, logs warnings | health set to `None` |
//! | trending | 10s | immediate | ignored, previous terms kept |
//!
//! Later health calls are silent: failures only update state and log at
//! `debug`. In demo mode the health task publishes the simulated healthy
//! status and the trending task does nothing.
//!
//! Results are published through `tokio::sync::watch` channels, so readers
//! can either sample the latest value or wait for the next change. Polling
//! failures never reach the orchestrator's visible error.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use speedscale_core::models::HealthStatus;

use crate::backend::Backend;
use crate::config::PollingConfig;
use crate::session::Session;

pub struct Poller {
    session: Arc<Session>,
    http: Arc<dyn Backend>,
    demo: Arc<dyn Backend>,
    config: PollingConfig,
    health: watch::Sender<Option<HealthStatus>>,
    trending: watch::Sender<Vec<String>>,
}

impl Poller {
    pub fn new(
        session: Arc<Session>,
        http: Arc<dyn Backend>,
        demo: Arc<dyn Backend>,
        config: PollingConfig,
    ) -> Self {
        Self {
            session,
            http,
            demo,
            config,
            health: watch::channel(None).0,
            trending: watch::channel(Vec::new()).0,
        }
    }

    /// Latest health snapshot. `None` means no recent successful check.
    pub fn health(&self) -> Option<HealthStatus> {
        self.health.borrow().clone()
    }

    pub fn trending(&self) -> Vec<String> {
        self.trending.borrow().clone()
    }

    pub fn subscribe_health(&self) -> watch::Receiver<Option<HealthStatus>> {
        self.health.subscribe()
    }

    pub fn subscribe_trending(&self) -> watch::Receiver<Vec<String>> {
        self.trending.subscribe()
    }

    /// Run one health check against the current endpoint.
    ///
    /// Never fails: timeouts and errors reset the health slice to `None`.
    /// With `silent` set, failures are logged at `debug` instead of `warn`.
    pub async fn check_health(&self, silent: bool) {
        let epoch = self.session.epoch();
        let backend = if self.session.demo_mode() {
            &self.demo
        } else {
            &self.http
        };

        let next = match tokio::time::timeout(self.config.health_timeout(), backend.health()).await
        {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                if silent {
                    debug!(error = %e, "health check failed");
                } else {
                    warn!(error = %e, "health check failed - backend unreachable");
                }
                None
            }
            Err(_) => {
                if silent {
                    debug!(timeout_ms = self.config.health_timeout_ms, "health check timed out");
                } else {
                    warn!(timeout_ms = self.config.health_timeout_ms, "health check timed out");
                }
                None
            }
        };

        if self.session.epoch() != epoch {
            info!("discarding health result issued against a previous endpoint");
            return;
        }
        self.health.send_replace(next);
    }

    /// Refresh trending terms: deduplicated, capped, best-effort.
    pub async fn refresh_trending(&self) {
        if self.session.demo_mode() {
            return;
        }
        let epoch = self.session.epoch();

        // best-effort: a failed refresh keeps the previous terms
        let terms = match self.http.trending().await {
            Ok(terms) => terms,
            Err(e) => {
                debug!(error = %e, "trending unavailable");
                return;
            }
        };

        if self.session.epoch() != epoch {
            info!("discarding trending result issued against a previous endpoint");
            return;
        }
        self.trending
            .send_replace(dedupe_capped(terms, self.config.trending_limit));
    }

    /// Spawn both polling tasks. Each ticks immediately, then periodically.
    pub fn start(self: Arc<Self>, token: CancellationToken) -> PollerHandle {
        let health = {
            let poller = self.clone();
            let token = token.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(poller.config.health_interval());
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                let mut silent = false;
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = interval.tick() => {}
                    }
                    // an in-flight check is abandoned on shutdown
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = poller.check_health(silent) => { silent = true; }
                    }
                }
                debug!("health poll stopped");
            })
        };

        let trending = {
            let poller = self;
            let token = token.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(poller.config.trending_interval());
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = interval.tick() => {}
                    }
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = poller.refresh_trending() => {}
                    }
                }
                debug!("trending poll stopped");
            })
        };

        info!("polling started");
        PollerHandle {
            token,
            tasks: vec![health, trending],
        }
    }
}

fn dedupe_capped(terms: Vec<String>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    terms
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .take(limit)
        .collect()
}

/// Owns the polling tasks. Dropping it cancels them.
pub struct PollerHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl PollerHandle {
    /// Cancel both tasks and wait for them to exit.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                warn!(error = %e, "polling task ended abnormally");
            }
        }
        info!("polling stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled() && self.tasks.iter().any(|t| !t.is_finished())
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
