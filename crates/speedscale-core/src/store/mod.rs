//! Durable key/value storage abstraction.
//!
//! The [`KeyValueStore`] trait is the only persistence surface the session
//! needs: two string values (the endpoint and the serialized history ledger)
//! read once at startup and written back on every change. Implementations
//! must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

/// Key holding the user-approved endpoint URL.
pub const ENDPOINT_KEY: &str = "speedscale.api_url";

/// Key holding the history ledger as a JSON array, newest first.
pub const HISTORY_KEY: &str = "speedscale.history";

/// Abstract durable key/value store.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get`](KeyValueStore::get) | Read a value, `None` when absent |
/// | [`put`](KeyValueStore::put) | Insert or overwrite a value |
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn put(&self, key: &str, value: &str) -> Result<()>;
}
