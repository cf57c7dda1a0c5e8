//! Prometheus metrics for the gateway request pipeline

use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

lazy_static! {
    /// Requests rejected before resolver execution, by error code
    pub static ref REQUESTS_REJECTED: IntCounterVec = register_int_counter_vec!(
        "notes_gateway_requests_rejected_total",
        "Total number of requests rejected before resolver execution",
        &["reason"]
    )
    .expect("Failed to register notes_gateway_requests_rejected_total");

    /// Requests that reached schema execution
    pub static ref REQUESTS_EXECUTED: IntCounter = register_int_counter!(
        "notes_gateway_requests_executed_total",
        "Total number of requests handed to the GraphQL executor"
    )
    .expect("Failed to register notes_gateway_requests_executed_total");

    /// Query guard analysis cache hits
    pub static ref GUARD_CACHE_HIT: IntCounter = register_int_counter!(
        "notes_gateway_query_guard_cache_hit_total",
        "Total number of query analyses served from cache"
    )
    .expect("Failed to register notes_gateway_query_guard_cache_hit_total");

    /// Query guard analysis cache misses
    pub static ref GUARD_CACHE_MISS: IntCounter = register_int_counter!(
        "notes_gateway_query_guard_cache_miss_total",
        "Total number of query analyses computed"
    )
    .expect("Failed to register notes_gateway_query_guard_cache_miss_total");
}

/// Render the default registry in the Prometheus text format
pub fn render() -> Result<String, prometheus::Error> {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
