//! Prometheus recorder for the `metrics` facade.
//!
//! Counters are emitted from the dispatcher and rendered at `/internal/metrics` when
//! `enable_metrics` is set.

use std::sync::OnceLock;

use metrics::{Unit, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global recorder once per process and return its handle.
///
/// If another recorder is already installed the returned handle renders nothing.
pub fn get_or_install_prometheus_handle() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = match PrometheusBuilder::new().install_recorder() {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install Prometheus recorder, metrics will be empty");
                    PrometheusBuilder::new().build_recorder().handle()
                }
            };
            describe_metrics();
            handle
        })
        .clone()
}

fn describe_metrics() {
    describe_counter!(
        "fwdhooks_webhook_deliveries_total",
        Unit::Count,
        "Finished webhook deliveries by outcome"
    );
    describe_counter!(
        "fwdhooks_webhook_deliveries_dropped_total",
        Unit::Count,
        "Deliveries dropped because the send queue was full"
    );
    describe_counter!(
        "fwdhooks_webhook_deliveries_abandoned_total",
        Unit::Count,
        "Queued or in-flight deliveries cut off by the shutdown grace period"
    );
    describe_counter!(
        "fwdhooks_webhook_events_dispatched_total",
        Unit::Count,
        "Events with at least one matching subscription"
    );
}
