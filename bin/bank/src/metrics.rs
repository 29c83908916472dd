//! Prometheus metrics for the bank client.
//!
//! All metrics are aggregated in the [`Metrics`] struct.

use indexer::ScanSummary;
use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Aggregated metrics for the bank client.
///
/// Metric descriptions are registered with the global registry on creation.
#[derive(Debug, Clone)]
pub struct Metrics {
    _private: (),
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::register_descriptions();
        Self { _private: () }
    }

    fn register_descriptions() {
        // Action metrics
        describe_counter!(
            "bank_action_success_total",
            "Total successful actions by action name"
        );
        describe_counter!(
            "bank_action_failure_total",
            "Total failed actions by action name and error kind"
        );
        describe_counter!(
            "bank_approvals_submitted_total",
            "Total ERC20 approvals submitted, by spender"
        );

        // Indexer metrics
        describe_counter!(
            "bank_entities_projected_total",
            "Total entities projected from bank events, by kind"
        );
        describe_counter!(
            "bank_projection_failures_total",
            "Total logs a handler rejected"
        );
        describe_gauge!(
            "bank_last_indexed_block",
            "Last block whose bank logs were projected"
        );
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Action metrics
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn record_action_success(&self, action: &str) {
        counter!("bank_action_success_total", "action" => action.to_string()).increment(1);
    }

    /// Record a failed action. `kind` is the flow error kind, or `other`.
    pub fn record_action_failure(&self, action: &str, kind: &str) {
        counter!(
            "bank_action_failure_total",
            "action" => action.to_string(),
            "kind" => kind.to_string()
        )
        .increment(1);
    }

    pub fn record_approval(&self, spender: &str) {
        counter!("bank_approvals_submitted_total", "spender" => spender.to_string()).increment(1);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Indexer metrics
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn record_scan(&self, summary: &ScanSummary) {
        for (kind, count) in &summary.by_kind {
            counter!("bank_entities_projected_total", "kind" => kind.as_str())
                .increment(*count as u64);
        }
        counter!("bank_projection_failures_total").increment(summary.failed as u64);
        gauge!("bank_last_indexed_block").set(summary.to as f64);
    }
}

/// Install the Prometheus metrics exporter and start the HTTP server.
pub fn install_prometheus_exporter(port: u16) -> eyre::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| eyre::eyre!("Failed to install Prometheus exporter: {}", e))?;

    Ok(())
}
