//! Prometheus metrics setup and metric definitions

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    // Quality-server round trips are slow compared to in-process work;
    // buckets run from 5ms up to a minute.
    let buckets = vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

    let handle = PrometheusBuilder::new()
        .set_buckets(&buckets)?
        .install_recorder()?;
    Ok(handle)
}

/// Register metric descriptions and emit initial zero values so Prometheus output
/// includes HELP/TYPE lines for all metrics from startup (not just after first use).
pub fn describe_metrics() {
    describe_counter!(
        "sonargate_webhook_events_total",
        "Inbound webhook deliveries by outcome (dispatched/dropped)"
    );
    describe_counter!(
        "sonargate_listener_failures_total",
        "Webhook listener invocations that returned an error or panicked"
    );
    describe_gauge!(
        "sonargate_listeners_registered",
        "Number of listeners currently registered for webhook events"
    );
    describe_counter!(
        "sonargate_resolutions_total",
        "Result resolutions by outcome and unresolved reason"
    );
    describe_histogram!(
        "sonargate_resolution_duration_seconds",
        "Time spent resolving one compute task"
    );

    counter!("sonargate_webhook_events_total", "outcome" => "dispatched").absolute(0);
    counter!("sonargate_webhook_events_total", "outcome" => "dropped").absolute(0);
    counter!("sonargate_listener_failures_total").absolute(0);
    counter!("sonargate_resolutions_total", "outcome" => "resolved", "reason" => "").absolute(0);
    histogram!("sonargate_resolution_duration_seconds").record(0.0);
    gauge!("sonargate_listeners_registered").set(0.0);
}

/// Record one resolution attempt; `unresolved_reason` is `None` on success.
pub fn record_resolution(unresolved_reason: Option<&'static str>, elapsed: Duration) {
    let (outcome, reason) = match unresolved_reason {
        Some(reason) => ("unresolved", reason),
        None => ("resolved", ""),
    };
    counter!("sonargate_resolutions_total", "outcome" => outcome, "reason" => reason).increment(1);
    histogram!("sonargate_resolution_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_webhook_event(dispatched: bool) {
    let outcome = if dispatched { "dispatched" } else { "dropped" };
    counter!("sonargate_webhook_events_total", "outcome" => outcome).increment(1);
}

pub fn record_listener_failures(failed: usize) {
    if failed > 0 {
        counter!("sonargate_listener_failures_total").increment(failed as u64);
    }
}

pub fn set_registered_listeners(count: usize) {
    gauge!("sonargate_listeners_registered").set(count as f64);
}
