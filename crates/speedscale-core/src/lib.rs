//! # SpeedScale Core
//!
//! Runtime-free logic for the SpeedScale client: the data model, the
//! network-path state machine, the bounded history ledger, demo data
//! generation, and the key/value store abstraction.
//!
//! This crate contains no tokio, sqlx, or HTTP dependencies.

pub mod ledger;
pub mod models;
pub mod network_path;
pub mod simulate;
pub mod store;
