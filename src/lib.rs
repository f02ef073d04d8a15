//! # SpeedScale
//!
//! A catalog search client that shows which backend tier served each
//! request: the fast cache tier or the slower storage tier.
//!
//! The client sanitizes and persists a configurable backend endpoint, polls
//! health and trending terms, falls back to a fully simulated demo mode when
//! the backend is unreachable, maps every completed request onto a network
//! path (`IDLE`, `CACHE_HIT`, `DB_MISS`), and keeps a bounded, persisted
//! ledger of every request with its latency and tier.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌─────────────┐
//! │   CLI    │──▶│ Orchestrator │──▶│   Backend   │──▶ HTTP API
//! │(speedscale)  │ + Poller     │   │ HTTP / Demo │
//! └──────────┘   └──────┬───────┘   └─────────────┘
//!                       │
//!                       ▼
//!                ┌─────────────┐   ┌──────────┐
//!                │   Session   │──▶│  SQLite  │
//!                │endpoint+ledger  │ settings │
//!                └─────────────┘   └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`telemetry`] | `tracing` subscriber setup |
//! | [`sanitize`] | Endpoint sanitizer |
//! | [`error`] | Request error taxonomy |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite key/value store |
//! | [`session`] | Persisted endpoint, ledger, demo flag, epoch |
//! | [`backend`] | HTTP and demo backends |
//! | [`poller`] | Health and trending polling |
//! | [`orchestrator`] | Search and product-view orchestration |
//! | [`stats`] | Dashboard statistics |
//! | [`app`] | Component wiring |
//!
//! Runtime-free types (models, network path, ledger, simulator, store
//! trait) live in the `speedscale-core` crate.

pub mod app;
pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod migrate;
pub mod orchestrator;
pub mod poller;
pub mod sanitize;
pub mod session;
pub mod sqlite_store;
pub mod stats;
pub mod telemetry;
