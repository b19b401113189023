//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `backoffice_documents_saved_total` - Documents written
//! - `backoffice_version_conflicts_total` - Compare-and-set writes rejected
//! - `backoffice_transitions_rejected_total` - Order status changes rejected
//! - `backoffice_ledger_rows_skipped_total` - Malformed ledger rows dropped on read or ignored by projection
//! - `backoffice_validation_failures_total` - Payloads rejected before persisting

use prometheus::{IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Documents written
    pub documents_saved: IntCounter,

    /// Stale compare-and-set writes
    pub version_conflicts: IntCounter,

    /// Rejected order status changes
    pub transitions_rejected: IntCounter,

    /// Ledger rows skipped during projection
    pub ledger_rows_skipped: IntCounter,

    /// Rejected payloads
    pub validation_failures: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("documents_saved", &self.documents_saved.get())
            .field("version_conflicts", &self.version_conflicts.get())
            .field("transitions_rejected", &self.transitions_rejected.get())
            .field("ledger_rows_skipped", &self.ledger_rows_skipped.get())
            .field("validation_failures", &self.validation_failures.get())
            .finish()
    }
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        Ok(Self {
            documents_saved: counter(
                &registry,
                "backoffice_documents_saved_total",
                "Total number of documents written",
            )?,
            version_conflicts: counter(
                &registry,
                "backoffice_version_conflicts_total",
                "Writes rejected because the stored version moved",
            )?,
            transitions_rejected: counter(
                &registry,
                "backoffice_transitions_rejected_total",
                "Order status changes rejected by the lifecycle",
            )?,
            ledger_rows_skipped: counter(
                &registry,
                "backoffice_ledger_rows_skipped_total",
                "Malformed ledger rows ignored by stock projection",
            )?,
            validation_failures: counter(
                &registry,
                "backoffice_validation_failures_total",
                "Payloads rejected before persisting",
            )?,
            registry,
        })
    }

    /// Record document write
    pub fn record_document_saved(&self) {
        self.documents_saved.inc();
    }

    /// Record stale write
    pub fn record_version_conflict(&self) {
        self.version_conflicts.inc();
    }

    /// Record lifecycle rejection
    pub fn record_transition_rejected(&self) {
        self.transitions_rejected.inc();
    }

    /// Record skipped ledger rows
    pub fn record_ledger_rows_skipped(&self, rows: usize) {
        self.ledger_rows_skipped.inc_by(rows as u64);
    }

    /// Record rejected payload
    pub fn record_validation_failure(&self) {
        self.validation_failures.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
