//! Wiring of the client components.
//!
//! [`App`] builds the object graph once: store → [`Session`] → backends →
//! [`Orchestrator`] and [`Poller`]. Every component shares the same session,
//! so an endpoint change or demo toggle is seen by all of them at once.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use speedscale_core::store::KeyValueStore;

use crate::backend::{Backend, DemoBackend, HttpBackend};
use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::orchestrator::Orchestrator;
use crate::poller::Poller;
use crate::session::Session;
use crate::sqlite_store::SqliteStore;

pub struct App {
    pub session: Arc<Session>,
    pub orchestrator: Arc<Orchestrator>,
    pub poller: Arc<Poller>,
}

impl App {
    /// Open the SQLite store named in `config` and build the client on it.
    ///
    /// `demo` forces demo mode on in addition to `[demo].enabled`.
    pub async fn open(config: &Config, demo: bool) -> Result<Self> {
        let pool = db::connect(config).await.with_context(|| {
            format!(
                "Failed to open settings database: {}",
                config.storage.path.display()
            )
        })?;
        migrate::run_migrations(&pool).await?;
        Self::with_store(Arc::new(SqliteStore::new(pool)), config, demo).await
    }

    /// Build the client on an arbitrary key/value store.
    pub async fn with_store(
        store: Arc<dyn KeyValueStore>,
        config: &Config,
        demo: bool,
    ) -> Result<Self> {
        let demo = demo || config.demo.enabled;
        let session = Arc::new(Session::load(store, &config.client, demo).await?);

        let http: Arc<dyn Backend> = Arc::new(HttpBackend::new(session.clone())?);
        let simulated: Arc<dyn Backend> = Arc::new(DemoBackend::new(&config.demo));

        let orchestrator = Arc::new(Orchestrator::new(
            session.clone(),
            http.clone(),
            simulated.clone(),
        ));
        let poller = Arc::new(Poller::new(
            session.clone(),
            http,
            simulated,
            config.polling.clone(),
        ));

        info!(endpoint = %session.endpoint(), demo, "client ready");
        Ok(Self {
            session,
            orchestrator,
            poller,
        })
    }
}
