use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Metric name prefix for all MeterBoxd metrics
const PREFIX: &str = "meterboxd";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Outcome of every resolution, labelled by the tier that answered
    pub static ref RESOLUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_resolutions_total"), "Movie resolutions by outcome"),
        &["outcome"]
    ).expect("Failed to create resolutions_total metric");

    pub static ref EXTERNAL_LOOKUPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_external_lookups_total"), "External catalog lookups by result"),
        &["result"]
    ).expect("Failed to create external_lookups_total metric");

    pub static ref EXTERNAL_LOOKUP_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_external_lookup_duration_seconds"),
            "External catalog lookup duration in seconds"
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["result"]
    ).expect("Failed to create external_lookup_duration_seconds metric");

    pub static ref STORE_ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_store_errors_total"), "Persistent store failures by operation"),
        &["operation"]
    ).expect("Failed to create store_errors_total metric");

    pub static ref SKIPPED_ROWS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_skipped_rows_total"), "Input rows excluded from statistics"),
        &["reason"]
    ).expect("Failed to create skipped_rows_total metric");
}

/// Register all metrics with the registry. Safe to call more than once.
pub fn init_metrics() {
    let _ = REGISTRY.register(Box::new(RESOLUTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(EXTERNAL_LOOKUPS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(EXTERNAL_LOOKUP_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(STORE_ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SKIPPED_ROWS_TOTAL.clone()));

    tracing::debug!("Metrics registered");
}

pub fn record_resolution(outcome: &str) {
    RESOLUTIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_external_lookup(result: &str, duration: Duration) {
    EXTERNAL_LOOKUPS_TOTAL.with_label_values(&[result]).inc();
    EXTERNAL_LOOKUP_DURATION_SECONDS
        .with_label_values(&[result])
        .observe(duration.as_secs_f64());
}

pub fn record_store_error(operation: &str) {
    STORE_ERRORS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn record_skipped_row(reason: &str) {
    SKIPPED_ROWS_TOTAL.with_label_values(&[reason]).inc();
}

/// Renders every registered metric in the Prometheus text format.
pub fn render() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
