use lazy_static::lazy_static;
use prometheus::{register_histogram_vec, register_int_counter, register_int_counter_vec};
use prometheus::{HistogramVec, IntCounter, IntCounterVec};

lazy_static! {
    pub static ref PROFILE_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "influence_cache_requests_total",
        "Profile requests by query and outcome (cached, dispatched)",
        &["query", "outcome"]
    )
    .unwrap();

    pub static ref FETCH_SUCCESS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "influence_cache_fetch_success_total",
        "Fetch tasks that merged a response into the cache",
        &["query"]
    )
    .unwrap();

    pub static ref FETCH_FAILURE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "influence_cache_fetch_failure_total",
        "Fetch tasks that ended without touching the cache, by reason",
        &["query", "reason"]
    )
    .unwrap();

    pub static ref IDENTITY_RESOLUTIONS_TOTAL: IntCounter = register_int_counter!(
        "influence_cache_identity_resolutions_total",
        "Remote identifier lookups performed"
    )
    .unwrap();

    pub static ref FETCH_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "influence_cache_fetch_duration_seconds",
        "Time taken by a fetch task, including identity resolution",
        &["query"],
        vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();
}

/// Count a request served from the cache.
pub fn record_cache_hit(query: &str) {
    PROFILE_REQUESTS_TOTAL.with_label_values(&[query, "cached"]).inc();
}

/// Count a request handed to the worker pool.
pub fn record_dispatch(query: &str) {
    PROFILE_REQUESTS_TOTAL.with_label_values(&[query, "dispatched"]).inc();
}

pub fn record_fetch_success(query: &str) {
    FETCH_SUCCESS_TOTAL.with_label_values(&[query]).inc();
}

pub fn record_fetch_failure(query: &str, reason: &str) {
    FETCH_FAILURE_TOTAL.with_label_values(&[query, reason]).inc();
}

pub fn record_identity_resolution() {
    IDENTITY_RESOLUTIONS_TOTAL.inc();
}

/// Observe the duration of one fetch task.
pub fn observe_fetch_duration(query: &str, duration_secs: f64) {
    FETCH_DURATION_SECONDS
        .with_label_values(&[query])
        .observe(duration_secs);
}
