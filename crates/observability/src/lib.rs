//! Tracing and logging setup shared by every process that hosts the pricing
//! engine (quote API, shipment workflow workers, test harnesses).

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::LogFormat;
