//! Demo data generation.
//!
//! Produces responses shaped exactly like the real backend's so callers
//! cannot tell the two apart except by content. Generation is pure apart
//! from the supplied RNG; the artificial network delay lives with the demo
//! backend, not here.
//!
//! # Policy
//!
//! | Quantity | Distribution |
//! |----------|--------------|
//! | cache hit | 60% |
//! | item count | uniform `[1, 8]` |
//! | price | uniform `[50, 1050)`, 2 decimals |
//! | rating | uniform `[3.0, 5.0]`, 1 decimal |
//! | in stock | 80% |
//! | hit latency | uniform `[5, 20)` ms |
//! | miss latency | uniform `[150, 450)` ms |
//!
//! The latency ranges are disjoint so a simulated hit is never mistaken for
//! a miss by its latency bucket.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

use crate::models::{HealthStatus, Product, ProductEnvelope, SearchResult};

pub const CACHE_HIT_PROBABILITY: f64 = 0.6;
pub const IN_STOCK_PROBABILITY: f64 = 0.8;
pub const HIT_LATENCY_MS: Range<u64> = 5..20;
pub const MISS_LATENCY_MS: Range<u64> = 150..450;
pub const PRICE_RANGE: Range<f64> = 50.0..1050.0;

pub const CACHE_SOURCE: &str = "REDIS_CACHE (Computer B)";
pub const DISK_SOURCE: &str = "MONGODB_DISK (Computer A)";
pub const DEMO_MEMORY_SOURCE: &str = "DEMO_MEMORY";

/// Prefix reserved for simulated ids. Real catalog ids are hex object ids
/// and never contain a dash.
pub const MOCK_ID_PREFIX: &str = "mock-";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A session-unique synthetic id: clock reading, monotonic sequence, and a
/// random suffix.
pub fn mock_id<R: Rng>(rng: &mut R) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let suffix: u32 = rng.gen();
    format!("{}{}-{}-{:08x}", MOCK_ID_PREFIX, millis, seq, suffix)
}

fn variant_name(index: usize) -> &'static str {
    match index {
        0 => "Pro",
        1 => "Lite",
        _ => "Plus",
    }
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Simulate `GET /api/search?query=...`.
pub fn simulate_search<R: Rng>(query: &str, rng: &mut R) -> SearchResult {
    let cached = rng.gen_bool(CACHE_HIT_PROBABILITY);
    let count = rng.gen_range(1..=8usize);
    let latency = if cached {
        rng.gen_range(HIT_LATENCY_MS)
    } else {
        rng.gen_range(MISS_LATENCY_MS)
    };

    let data = (0..count)
        .map(|i| {
            // floor keeps the rounded price strictly below the upper bound
            let price = (rng.gen_range(PRICE_RANGE) * 100.0).floor() / 100.0;
            let rating = (rng.gen_range(3.0..=5.0f64) * 10.0).round() / 10.0;
            Product {
                id: mock_id(&mut *rng),
                name: format!("{} {}", query, variant_name(i)),
                price,
                description: format!(
                    "This is a simulated product description for {}. In demo mode, \
                     random data is generated to exercise the client without backend connectivity.",
                    query
                ),
                category: "Demo Category".to_string(),
                brand: "SpeedScale Demo".to_string(),
                in_stock: rng.gen_bool(IN_STOCK_PROBABILITY),
                rating,
                image_url: format!("https://picsum.photos/seed/{}{}/400/300", query, i),
                created_at: now_iso(),
            }
        })
        .collect();

    SearchResult {
        source: if cached { CACHE_SOURCE } else { DISK_SOURCE }.to_string(),
        time: format!("{}ms", latency),
        cached,
        count,
        data,
    }
}

/// Simulate a single product record for `id`.
pub fn simulate_product(id: &str) -> Product {
    let tail: String = {
        let chars: Vec<char> = id.chars().collect();
        chars[chars.len().saturating_sub(4)..].iter().collect()
    };
    Product {
        id: id.to_string(),
        name: format!("SpeedScale Ultra {}", tail),
        price: 299.99,
        description: "Experience the power of distributed systems with this premium demo product. \
                      Features include high availability, fault tolerance, and eventual consistency."
            .to_string(),
        category: "Electronics".to_string(),
        brand: "SpeedScale Tech".to_string(),
        in_stock: true,
        rating: 4.8,
        image_url: format!("https://picsum.photos/seed/{}/800/600", id),
        created_at: now_iso(),
    }
}

/// Simulate `GET /api/products/{id}`. Demo product views always report a
/// cache hit from local memory.
pub fn simulate_product_envelope(id: &str) -> ProductEnvelope {
    ProductEnvelope {
        data: simulate_product(id),
        source: DEMO_MEMORY_SOURCE.to_string(),
        time: "12ms".to_string(),
        cached: true,
    }
}

/// Simulate `GET /api/products/{id}/similar`.
pub fn simulate_similar(id: &str) -> Vec<Product> {
    (0..4)
        .map(|i| simulate_product(&format!("sim-{}-{}", id, i)))
        .collect()
}

/// The always-healthy status reported while demo mode is active.
pub fn simulate_health() -> HealthStatus {
    HealthStatus {
        status: "healthy".to_string(),
        timestamp: now_iso(),
        connections: BTreeMap::from([
            ("mongodb".to_string(), true),
            ("redis".to_string(), true),
        ]),
        servers: BTreeMap::from([
            ("this_server".to_string(), "Demo Mode (Local)".to_string()),
            ("mongodb".to_string(), "Simulated".to_string()),
            ("redis".to_string(), "Simulated".to_string()),
        ]),
    }
}
