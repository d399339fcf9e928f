//! Metrics module for recurring-service.
//! Provides Prometheus metrics for batch runs and template outcomes.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter,
    register_int_counter_vec, Encoder, HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "recurring_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Batch runs counter
pub static BATCH_RUNS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Batch run duration histogram
pub static BATCH_RUN_DURATION: OnceLock<HistogramVec> = OnceLock::new();

/// Per-template outcome counter
pub static TEMPLATE_OUTCOMES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Invoices materialized from templates
pub static INVOICES_MATERIALIZED_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Invoices created whose template schedule could not be advanced
pub static SCHEDULE_ADVANCE_FAILURES_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    BATCH_RUNS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "recurring_batch_runs_total",
                "Total batch runs by trigger and status"
            ),
            &["trigger", "status"]
        )
        .expect("Failed to register BATCH_RUNS_TOTAL")
    });

    BATCH_RUN_DURATION.get_or_init(|| {
        register_histogram_vec!(
            histogram_opts!(
                "recurring_batch_run_duration_seconds",
                "Batch run duration",
                vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
            ),
            &["trigger"]
        )
        .expect("Failed to register BATCH_RUN_DURATION")
    });

    TEMPLATE_OUTCOMES_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "recurring_template_outcomes_total",
                "Templates evaluated per batch run by outcome"
            ),
            &["outcome"]
        )
        .expect("Failed to register TEMPLATE_OUTCOMES_TOTAL")
    });

    INVOICES_MATERIALIZED_TOTAL.get_or_init(|| {
        register_int_counter!(opts!(
            "recurring_invoices_materialized_total",
            "Invoices created from recurring templates"
        ))
        .expect("Failed to register INVOICES_MATERIALIZED_TOTAL")
    });

    SCHEDULE_ADVANCE_FAILURES_TOTAL.get_or_init(|| {
        register_int_counter!(opts!(
            "recurring_schedule_advance_failures_total",
            "Invoices created whose template schedule could not be advanced"
        ))
        .expect("Failed to register SCHEDULE_ADVANCE_FAILURES_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*DB_QUERY_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a finished batch run.
pub fn record_batch_run(trigger: &str, status: &str, duration_secs: f64) {
    if let Some(counter) = BATCH_RUNS_TOTAL.get() {
        counter.with_label_values(&[trigger, status]).inc();
    }
    if let Some(histogram) = BATCH_RUN_DURATION.get() {
        histogram.with_label_values(&[trigger]).observe(duration_secs);
    }
}

/// Record what happened to one template.
pub fn record_template_outcome(outcome: &str) {
    if let Some(counter) = TEMPLATE_OUTCOMES_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Record an invoice created from a template.
pub fn record_invoice_materialized() {
    if let Some(counter) = INVOICES_MATERIALIZED_TOTAL.get() {
        counter.inc();
    }
}

/// Record an invoice whose template schedule was left unadvanced.
pub fn record_schedule_advance_failure() {
    if let Some(counter) = SCHEDULE_ADVANCE_FAILURES_TOTAL.get() {
        counter.inc();
    }
}
