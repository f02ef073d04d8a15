//! Backend capability set and its two implementations.
//!
//! The orchestrator and the poller only ever talk to a [`Backend`]; whether
//! the answers come from the network or from the demo simulator is decided
//! per call by the session's demo flag.
//!
//! | Capability | HTTP route |
//! |------------|------------|
//! | [`search`](Backend::search) | `GET /api/search?query=<q>` |
//! | [`get_product`](Backend::get_product) | `GET /api/products/{id}` |
//! | [`get_similar`](Backend::get_similar) | `GET /api/products/{id}/similar` |
//! | [`health`](Backend::health) | `GET /health` |
//! | [`trending`](Backend::trending) | `GET /api/trending` |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use speedscale_core::models::{
    HealthStatus, Product, ProductEnvelope, SearchResult, SimilarEnvelope,
};
use speedscale_core::simulate;

use crate::config::DemoConfig;
use crate::error::FetchError;
use crate::session::Session;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Short label for logs (`"http"`, `"demo"`).
    fn name(&self) -> &str;

    async fn search(&self, query: &str) -> Result<SearchResult, FetchError>;

    async fn get_product(&self, id: &str) -> Result<ProductEnvelope, FetchError>;

    async fn get_similar(&self, id: &str) -> Result<Vec<Product>, FetchError>;

    async fn health(&self) -> Result<HealthStatus, FetchError>;

    async fn trending(&self) -> Result<Vec<String>, FetchError>;
}

// ============ HTTP Backend ============

/// Talks to the real catalog API at the session's current endpoint.
///
/// The endpoint is read from the [`Session`] on every call, never cached.
/// Search and product requests carry no explicit timeout and rely on the
/// transport; the poller bounds health checks itself.
pub struct HttpBackend {
    client: reqwest::Client,
    session: Arc<Session>,
}

impl HttpBackend {
    pub fn new(session: Arc<Session>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("speedscale/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { client, session })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Server {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn search(&self, query: &str) -> Result<SearchResult, FetchError> {
        let mut url = self.session.endpoint_url(&["api", "search"])?;
        url.query_pairs_mut().append_pair("query", query);
        self.get_json(url).await
    }

    async fn get_product(&self, id: &str) -> Result<ProductEnvelope, FetchError> {
        let url = self.session.endpoint_url(&["api", "products", id])?;
        match self.get_json(url).await {
            Err(FetchError::Server { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(FetchError::NotFound)
            }
            other => other,
        }
    }

    async fn get_similar(&self, id: &str) -> Result<Vec<Product>, FetchError> {
        let url = self.session.endpoint_url(&["api", "products", id, "similar"])?;
        let envelope: SimilarEnvelope = self.get_json(url).await?;
        Ok(envelope.data)
    }

    async fn health(&self) -> Result<HealthStatus, FetchError> {
        let url = self.session.endpoint_url(&["health"])?;
        self.get_json(url).await
    }

    async fn trending(&self) -> Result<Vec<String>, FetchError> {
        let url = self.session.endpoint_url(&["api", "trending"])?;
        self.get_json(url).await
    }
}

// ============ Demo Backend ============

/// Serves simulated data without touching the network.
///
/// Searches and product views sleep for the configured delay first so the
/// loading state is exercised exactly as on the real path. Never fails.
pub struct DemoBackend {
    search_delay: Duration,
    product_delay: Duration,
}

impl DemoBackend {
    pub fn new(config: &DemoConfig) -> Self {
        Self {
            search_delay: Duration::from_millis(config.search_delay_ms),
            product_delay: Duration::from_millis(config.product_delay_ms),
        }
    }
}

#[async_trait]
impl Backend for DemoBackend {
    fn name(&self) -> &str {
        "demo"
    }

    async fn search(&self, query: &str) -> Result<SearchResult, FetchError> {
        tokio::time::sleep(self.search_delay).await;
        Ok(simulate::simulate_search(query, &mut rand::thread_rng()))
    }

    async fn get_product(&self, id: &str) -> Result<ProductEnvelope, FetchError> {
        tokio::time::sleep(self.product_delay).await;
        Ok(simulate::simulate_product_envelope(id))
    }

    async fn get_similar(&self, id: &str) -> Result<Vec<Product>, FetchError> {
        Ok(simulate::simulate_similar(id))
    }

    async fn health(&self) -> Result<HealthStatus, FetchError> {
        Ok(simulate::simulate_health())
    }

    async fn trending(&self) -> Result<Vec<String>, FetchError> {
        Ok(Vec::new())
    }
}
