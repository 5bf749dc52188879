// Prometheus metrics definitions for the joke battle backend.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Counters ─────────────────────────────────────────────────────

    /// Answers stored, by source (human, gemini, qwen).
    pub static ref ANSWERS_SUBMITTED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("jokebattle_answers_submitted_total", "Answers stored"),
        &["source"],
    )
    .unwrap();

    pub static ref BATTLES_CREATED_TOTAL: IntCounter = IntCounter::new(
        "jokebattle_battles_created_total",
        "Battles created",
    )
    .unwrap();

    /// Votes counted, by source of the winning answer.
    pub static ref VOTES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("jokebattle_votes_total", "Votes counted"),
        &["winner_source"],
    )
    .unwrap();

    pub static ref DUPLICATE_VOTES_TOTAL: IntCounter = IntCounter::new(
        "jokebattle_duplicate_votes_total",
        "Votes resubmitted with an already recorded id",
    )
    .unwrap();

    /// Strategy picks, by strategy and mode (explore/exploit).
    pub static ref STRATEGY_SELECTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("jokebattle_strategy_selections_total", "Strategy selections"),
        &["strategy", "mode"],
    )
    .unwrap();

    /// Generation calls that fell back to placeholder text, by strategy.
    pub static ref GENERATION_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("jokebattle_generation_failures_total", "Generation calls that failed"),
        &["strategy"],
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("jokebattle_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    pub static ref GENERATION_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "jokebattle_generation_duration_seconds",
            "Answer generation duration in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["strategy"],
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ANSWERS_SUBMITTED_TOTAL.clone()),
        Box::new(BATTLES_CREATED_TOTAL.clone()),
        Box::new(VOTES_TOTAL.clone()),
        Box::new(DUPLICATE_VOTES_TOTAL.clone()),
        Box::new(STRATEGY_SELECTIONS_TOTAL.clone()),
        Box::new(GENERATION_FAILURES_TOTAL.clone()),
        Box::new(API_REQUESTS_TOTAL.clone()),
        Box::new(GENERATION_DURATION_SECONDS.clone()),
    ];

    for c in collectors {
        if let Err(e) = REGISTRY.register(c) {
            if !matches!(e, prometheus::Error::AlreadyReg) {
                tracing::error!("Failed to register metric: {e}");
            }
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Normalize a URL path for metric labels: replace id segments (UUIDs or
/// numbers) with `:id` to prevent cardinality explosion.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.parse::<i64>().is_ok() || uuid::Uuid::parse_str(segment).is_ok() {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
