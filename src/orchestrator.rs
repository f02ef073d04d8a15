//! Search and product-view orchestration.
//!
//! The [`Orchestrator`] executes searches and product lookups, picks the
//! real or demo backend per call, and reconciles every outcome into the
//! [`ViewModel`], the network-path state machine, and the session's history
//! ledger. Callers fire an operation and observe completion through
//! [`Orchestrator::snapshot`] and [`Orchestrator::is_loading`].
//!
//! # Outcome handling
//!
//! | Outcome | View model | Network path | Ledger |
//! |---------|------------|--------------|--------|
//! | success | result stored, error cleared | `CACHE_HIT` / `DB_MISS` | one entry |
//! | failure | error message stored, prior result kept | `IDLE` | unchanged |
//! | stale (epoch moved) | untouched | untouched | unchanged |
//!
//! The loading flag is released by a drop guard, so it is false once every
//! operation settles on any exit path, including cancellation and panics.
//!
//! Concurrent operations are not de-duplicated: each one appends its own
//! ledger entry and the last response to arrive wins the shared slices.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{error, info, warn};

use speedscale_core::models::{AccessLogEntry, Product, ProductEnvelope, SearchResult, ViewState};
use speedscale_core::network_path::{transition, NetworkPath, PathEvent};

use crate::backend::Backend;
use crate::session::Session;

/// Everything the presentation layer reads.
#[derive(Debug, Clone, Default)]
pub struct ViewModel {
    pub view: ViewState,
    /// Last submitted (trimmed) query.
    pub query: Option<String>,
    pub result: Option<SearchResult>,
    /// Visible error for the results or product view.
    pub error: Option<String>,
    pub network_path: NetworkPath,
    pub selected_product: Option<String>,
    pub product: Option<ProductEnvelope>,
    pub similar: Vec<Product>,
}

/// Holds the loading flag for the lifetime of one operation.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn acquire(in_flight: &'a AtomicUsize) -> Self {
        in_flight.fetch_add(1, Ordering::SeqCst);
        Self(in_flight)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Orchestrator {
    session: Arc<Session>,
    http: Arc<dyn Backend>,
    demo: Arc<dyn Backend>,
    state: RwLock<ViewModel>,
    in_flight: AtomicUsize,
}

impl Orchestrator {
    pub fn new(session: Arc<Session>, http: Arc<dyn Backend>, demo: Arc<dyn Backend>) -> Self {
        Self {
            session,
            http,
            demo,
            state: RwLock::new(ViewModel::default()),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn snapshot(&self) -> ViewModel {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn network_path(&self) -> NetworkPath {
        self.snapshot().network_path
    }

    /// True while any search or product fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    fn update<F: FnOnce(&mut ViewModel)>(&self, f: F) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state);
    }

    fn backend(&self) -> &Arc<dyn Backend> {
        if self.session.demo_mode() {
            &self.demo
        } else {
            &self.http
        }
    }

    fn is_stale(&self, epoch: u64, what: &str) -> bool {
        let stale = self.session.epoch() != epoch;
        if stale {
            info!(what, "discarding response issued against a previous endpoint");
        }
        stale
    }

    /// Run a search. Blank queries are ignored.
    pub async fn search(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }

        let _loading = LoadingGuard::acquire(&self.in_flight);
        let epoch = self.session.epoch();
        self.update(|vm| {
            vm.error = None;
            vm.network_path = transition(vm.network_path, PathEvent::RequestStarted);
            vm.query = Some(query.to_string());
            if vm.view != ViewState::Results {
                vm.view = ViewState::Results;
            }
        });

        let backend = self.backend();
        let outcome = backend.search(query).await;
        if self.is_stale(epoch, "search") {
            return;
        }

        match outcome {
            Ok(result) => {
                info!(
                    backend = backend.name(),
                    query,
                    source = %result.source,
                    time = %result.time,
                    cached = result.cached,
                    count = result.count,
                    "search completed"
                );
                let entry = AccessLogEntry::new(
                    format!("Search: \"{}\"", query),
                    result.source.clone(),
                    result.latency_ms(),
                    result.cached,
                );
                self.update(|vm| {
                    vm.network_path = transition(
                        vm.network_path,
                        PathEvent::Completed {
                            cached: result.cached,
                        },
                    );
                    vm.result = Some(result);
                });
                self.session.record(entry).await;
            }
            Err(e) => {
                error!(backend = backend.name(), query, error = %e, "search failed");
                self.update(|vm| {
                    vm.error = Some(e.to_string());
                    vm.network_path = transition(vm.network_path, PathEvent::Failed);
                });
            }
        }
    }

    /// Select a product and load its detail, then its similar items.
    pub async fn view_product(&self, id: &str) {
        let loading = LoadingGuard::acquire(&self.in_flight);
        let epoch = self.session.epoch();
        self.update(|vm| {
            vm.selected_product = Some(id.to_string());
            vm.view = ViewState::Product;
            vm.error = None;
            vm.product = None;
            vm.similar.clear();
            vm.network_path = transition(vm.network_path, PathEvent::RequestStarted);
        });

        let backend = self.backend();
        let outcome = backend.get_product(id).await;
        if self.is_stale(epoch, "product") {
            return;
        }

        let envelope = match outcome {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(
                    backend = backend.name(),
                    product_id = id,
                    error = %e,
                    "product fetch failed"
                );
                self.update(|vm| {
                    vm.error = Some(e.to_string());
                    vm.network_path = transition(vm.network_path, PathEvent::Failed);
                });
                return;
            }
        };

        info!(
            backend = backend.name(),
            product_id = id,
            source = %envelope.source,
            time = %envelope.time,
            cached = envelope.cached,
            "product loaded"
        );
        let entry = AccessLogEntry::new(
            format!("View: {}", envelope.data.name),
            envelope.source.clone(),
            envelope.latency_ms(),
            envelope.cached,
        );
        self.update(|vm| {
            vm.network_path = transition(
                vm.network_path,
                PathEvent::Completed {
                    cached: envelope.cached,
                },
            );
            vm.product = Some(envelope);
        });
        self.session.record(entry).await;
        drop(loading);

        // best-effort: a failed lookup leaves the list empty and no error
        let similar = backend.get_similar(id).await;
        if self.is_stale(epoch, "similar") {
            return;
        }
        match similar {
            Ok(items) => self.update(|vm| {
                if vm.selected_product.as_deref() == Some(id) {
                    vm.similar = items;
                }
            }),
            Err(e) => warn!(product_id = id, error = %e, "failed to load similar items"),
        }
    }

    /// Show `view` directly (header navigation). Resets the network path.
    pub fn navigate(&self, view: ViewState) {
        self.update(|vm| {
            vm.view = view;
            vm.network_path = transition(vm.network_path, PathEvent::Navigated(view));
        });
    }

    pub fn go_home(&self) {
        self.navigate(ViewState::Home);
    }

    pub fn go_dashboard(&self) {
        self.navigate(ViewState::Dashboard);
    }

    /// Search tab: results if a result is held, otherwise home.
    pub fn open_search(&self) {
        let target = if self.snapshot().result.is_some() {
            ViewState::Results
        } else {
            ViewState::Home
        };
        self.navigate(target);
    }

    /// Leave the product view.
    pub fn back(&self) {
        self.update(|vm| {
            vm.selected_product = None;
        });
        self.open_search();
    }

    /// Recovery action offered by the results view: switch to demo mode and
    /// rerun the last query.
    pub async fn retry_in_demo_mode(&self) {
        self.session.set_demo_mode(true);
        let last = self.snapshot().query;
        if let Some(query) = last {
            self.search(&query).await;
        }
    }
}
