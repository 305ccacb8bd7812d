//! Prometheus metrics.

use crate::error::StatsError;

use axum::{body::Body, http::Request, response::Response};
use lazy_static::lazy_static;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
};
use tracing::Span;

lazy_static! {
    // Registry for holding metric state
    pub static ref REGISTRY: Registry = Registry::new();
    // Simple request counter
    pub static ref INCOMING_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("incoming_requests", "The number of HTTP requests received"),
        &["http_method"]
    ).expect("valid metric");
    // Request counter by status code
    pub static ref RESPONSE_CODE_COLLECTOR: IntCounterVec = IntCounterVec::new(
        Opts::new("outgoing_response", "The number of responses sent."),
        &["status_code"]
    ).expect("valid metric");
    // Request histogram by response time
    pub static ref RESPONSE_TIME_COLLECTOR: HistogramVec = HistogramVec::new(
        HistogramOpts{
            common_opts: Opts::new("response_time", "The time taken to respond to each request"),
            buckets: prometheus::DEFAULT_BUCKETS.to_vec(),
        },
        &[],
    ).expect("valid metric");
    // Records read by in-process aggregations
    pub static ref RECORDS_SCANNED: IntCounter = IntCounter::new(
        "records_scanned", "The number of corpus records scanned by in-process aggregations"
    ).expect("valid metric");
    // Records skipped because they could not be decoded
    pub static ref MALFORMED_RECORDS: IntCounter = IntCounter::new(
        "malformed_records", "The number of malformed corpus records skipped"
    ).expect("valid metric");
}

/// Register all metrics with [REGISTRY].
pub fn register_metrics() -> Result<(), StatsError> {
    REGISTRY.register(Box::new(INCOMING_REQUESTS.clone()))?;
    REGISTRY.register(Box::new(RESPONSE_CODE_COLLECTOR.clone()))?;
    REGISTRY.register(Box::new(RESPONSE_TIME_COLLECTOR.clone()))?;
    REGISTRY.register(Box::new(RECORDS_SCANNED.clone()))?;
    REGISTRY.register(Box::new(MALFORMED_RECORDS.clone()))?;
    Ok(())
}

/// Render the registered metrics in the Prometheus text format.
pub async fn metrics_handler() -> Result<String, StatsError> {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Increments the prometheus counter on all incoming requests, labelled by http method
pub fn request_counter(request: &Request<Body>, _span: &Span) {
    INCOMING_REQUESTS
        .with_label_values(&[&request.method().to_string().to_ascii_uppercase()])
        .inc();
}

/// Increment the prometheus counter on all outgoing responses, labelled by status code
pub fn record_response_metrics<B>(
    response: &Response<B>,
    latency: std::time::Duration,
    _span: &Span,
) {
    RESPONSE_CODE_COLLECTOR
        .with_label_values(&[response.status().as_str()])
        .inc();

    RESPONSE_TIME_COLLECTOR
        .with_label_values(&[])
        .observe(latency.as_secs_f64());
}
