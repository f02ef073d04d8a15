//! Dashboard statistics over the history ledger.
//!
//! Summarises the ledger the way the dashboard view shows it: totals, the
//! cache hit rate, average latency per tier, and a latency bar chart of the
//! most recent requests. Used by `speedscale stats`.

use speedscale_core::models::AccessLogEntry;

use crate::session::Session;

/// Number of requests shown in the latency chart.
pub const CHART_WINDOW: usize = 20;

/// Latency that fills a bar completely.
const FULL_BAR_MS: f64 = 200.0;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Percentage of requests served from cache, 0 when the ledger is empty.
    pub hit_rate: f64,
    pub avg_cache_latency_ms: Option<f64>,
    pub avg_disk_latency_ms: Option<f64>,
    /// Chart bars, oldest first.
    pub bars: Vec<LatencyBar>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatencyBar {
    pub latency_ms: i64,
    pub is_cache: bool,
    /// Height as a percentage in `[10, 100]`.
    pub height_pct: f64,
}

pub fn bar_height(latency_ms: i64) -> f64 {
    (latency_ms as f64 / FULL_BAR_MS * 100.0).clamp(10.0, 100.0)
}

fn average(values: impl Iterator<Item = i64>) -> Option<f64> {
    let (sum, n) = values.fold((0i64, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum as f64 / n as f64)
    }
}

impl DashboardStats {
    /// Compute statistics from ledger entries, newest first.
    pub fn from_entries(entries: &[AccessLogEntry]) -> Self {
        let total = entries.len();
        let cache_hits = entries.iter().filter(|e| e.is_cache).count();
        let hit_rate = if total > 0 {
            cache_hits as f64 * 100.0 / total as f64
        } else {
            0.0
        };

        let bars = entries
            .iter()
            .take(CHART_WINDOW)
            .rev()
            .map(|e| LatencyBar {
                latency_ms: e.latency_ms,
                is_cache: e.is_cache,
                height_pct: bar_height(e.latency_ms),
            })
            .collect();

        Self {
            total,
            cache_hits,
            cache_misses: total - cache_hits,
            hit_rate,
            avg_cache_latency_ms: average(
                entries.iter().filter(|e| e.is_cache).map(|e| e.latency_ms),
            ),
            avg_disk_latency_ms: average(
                entries.iter().filter(|e| !e.is_cache).map(|e| e.latency_ms),
            ),
            bars,
        }
    }
}

/// Print the dashboard summary for the session's ledger.
pub fn print_stats(session: &Session) {
    let entries = session.history();
    let stats = DashboardStats::from_entries(&entries);

    println!("SpeedScale Dashboard");
    println!("====================");
    println!();
    println!("  Endpoint:    {}", session.endpoint());
    println!("  Requests:    {}", stats.total);
    println!(
        "  Cache hits:  {} / {} ({:.0}%)",
        stats.cache_hits, stats.total, stats.hit_rate
    );
    println!("  Disk reads:  {}", stats.cache_misses);
    println!(
        "  Avg latency: cache {}  disk {}",
        format_avg(stats.avg_cache_latency_ms),
        format_avg(stats.avg_disk_latency_ms)
    );

    if !stats.bars.is_empty() {
        println!();
        println!("  Latency (last {}, oldest first):", stats.bars.len());
        for bar in &stats.bars {
            let width = (bar.height_pct / 5.0).round() as usize;
            println!(
                "  {:>6}ms {} {}",
                bar.latency_ms,
                if bar.is_cache { "C" } else { "D" },
                "#".repeat(width)
            );
        }
    }

    if !entries.is_empty() {
        println!();
        println!("  Recent activity:");
        println!(
            "  {:<24} {:<36} {:>8}   {}",
            "TIME", "ACTION", "LATENCY", "SOURCE"
        );
        println!("  {}", "-".repeat(90));
        for e in entries.iter().take(10) {
            println!(
                "  {:<24} {:<36} {:>6}ms   {}",
                format_ts(&e.timestamp),
                truncate(&e.action, 36),
                e.latency_ms,
                e.source
            );
        }
    }
    println!();
}

fn format_avg(avg: Option<f64>) -> String {
    match avg {
        Some(ms) => format!("{:.1}ms", ms),
        None => "-".to_string(),
    }
}

/// Render an RFC 3339 timestamp as local `YYYY-MM-DD HH:MM:SS`.
pub fn format_ts(ts: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(ts)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|_| ts.to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
