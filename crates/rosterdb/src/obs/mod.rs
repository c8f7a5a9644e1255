//! Observability seam for the engine.
//!
//! Executors and sessions MUST NOT touch `obs::metrics` directly; all
//! instrumentation flows through [`MetricsEvent`] and [`MetricsSink`].
//! `sink` is the only bridge between execution logic and counter state.

pub mod metrics;
pub mod sink;

pub use sink::{
    ExecKind, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink,
};

pub(crate) use sink::{Span, record};
