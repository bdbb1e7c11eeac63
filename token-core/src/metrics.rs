//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `ledger_actions_total` - Total number of committed actions
//! - `ledger_tokens_created_total` - Total number of tokens created
//! - `ledger_transfers_total` - Total number of committed transfers
//! - `ledger_fee_events_total` - Total number of fee audit records emitted

use prometheus::{IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total committed actions
    pub actions_total: IntCounter,

    /// Total tokens created
    pub tokens_created_total: IntCounter,

    /// Total committed transfers
    pub transfers_total: IntCounter,

    /// Total fee audit records
    pub fee_events_total: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let actions_total = IntCounter::new(
            "ledger_actions_total",
            "Total number of committed actions",
        )?;
        registry.register(Box::new(actions_total.clone()))?;

        let tokens_created_total = IntCounter::new(
            "ledger_tokens_created_total",
            "Total number of tokens created",
        )?;
        registry.register(Box::new(tokens_created_total.clone()))?;

        let transfers_total = IntCounter::new(
            "ledger_transfers_total",
            "Total number of committed transfers",
        )?;
        registry.register(Box::new(transfers_total.clone()))?;

        let fee_events_total = IntCounter::new(
            "ledger_fee_events_total",
            "Total number of fee audit records emitted",
        )?;
        registry.register(Box::new(fee_events_total.clone()))?;

        Ok(Self {
            actions_total,
            tokens_created_total,
            transfers_total,
            fee_events_total,
            registry,
        })
    }

    /// Record a committed action
    pub fn record_action(&self) {
        self.actions_total.inc();
    }

    /// Record a token creation
    pub fn record_token_created(&self) {
        self.tokens_created_total.inc();
    }

    /// Record a committed transfer
    pub fn record_transfer(&self) {
        self.transfers_total.inc();
    }

    /// Record a fee audit event
    pub fn record_fee_event(&self) {
        self.fee_events_total.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("actions_total", &self.actions_total.get())
            .field("transfers_total", &self.transfers_total.get())
            .finish()
    }
}
