#![warn(missing_debug_implementations)]
#![deny(unused_must_use, rust_2018_idioms, unreachable_pub)]

//! Process metrics (ambient addition, not in spec.md's closed module list):
//! thin `metrics`-crate recorder registration for the execution queue, the
//! sync engine, and the automation integration layer.
//!
//! Grounded on the teacher's `reth-metrics` crate, which pairs a derive
//! macro (`reth_metrics_derive::Metrics`) with hand-registered
//! `Counter`/`Gauge`/`Histogram` fields per subsystem. The derive macro's
//! source wasn't available to carry forward, so each metrics struct below
//! is the equivalent hand-expansion: a plain struct of `metrics` facade
//! handles, built once via `::new()` and called from the owning crate.

mod automation;
mod queue;
mod sync;

pub use automation::AutomationMetrics;
pub use queue::QueueMetrics;
pub use sync::SyncMetrics;

/// Registers human-readable descriptions for every metric name this crate
/// emits, so a Prometheus `/metrics` scrape carries `# HELP` text. Call
/// once at process startup, after installing a recorder.
pub fn describe_all() {
    queue::describe();
    sync::describe();
    automation::describe();
}
