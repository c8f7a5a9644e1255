use crate::{obs::metrics, traits::EntityKind};
use std::{cell::RefCell, marker::PhantomData, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Vec<Rc<dyn MetricsSink>>> = const { RefCell::new(Vec::new()) };
}

///
/// ExecKind
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    Aggregate,
    Delete,
    Load,
    Patch,
    Save,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent {
    ExecStart {
        kind: ExecKind,
        entity_path: &'static str,
    },
    ExecFinish {
        kind: ExecKind,
        entity_path: &'static str,
        rows_touched: u64,
    },
    RowsScanned {
        entity_path: &'static str,
        rows_scanned: u64,
    },
    SessionFlush {
        writes: u64,
    },
    SessionClear,
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default thread-local sink that writes into global counter state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ExecStart { kind, entity_path } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        ExecKind::Load => m.ops.load_calls = m.ops.load_calls.saturating_add(1),
                        ExecKind::Save => m.ops.save_calls = m.ops.save_calls.saturating_add(1),
                        ExecKind::Delete => {
                            m.ops.delete_calls = m.ops.delete_calls.saturating_add(1);
                        }
                        ExecKind::Patch => m.ops.patch_calls = m.ops.patch_calls.saturating_add(1),
                        ExecKind::Aggregate => {
                            m.ops.aggregate_calls = m.ops.aggregate_calls.saturating_add(1);
                        }
                    }

                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    match kind {
                        ExecKind::Load => entry.load_calls = entry.load_calls.saturating_add(1),
                        ExecKind::Save => entry.save_calls = entry.save_calls.saturating_add(1),
                        ExecKind::Delete => {
                            entry.delete_calls = entry.delete_calls.saturating_add(1);
                        }
                        ExecKind::Patch => entry.patch_calls = entry.patch_calls.saturating_add(1),
                        ExecKind::Aggregate => {
                            entry.aggregate_calls = entry.aggregate_calls.saturating_add(1);
                        }
                    }
                });
            }

            MetricsEvent::ExecFinish {
                kind,
                entity_path,
                rows_touched,
            } => {
                metrics::with_state_mut(|m| {
                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    match kind {
                        ExecKind::Load => {
                            m.ops.rows_loaded = m.ops.rows_loaded.saturating_add(rows_touched);
                            entry.rows_loaded = entry.rows_loaded.saturating_add(rows_touched);
                        }
                        ExecKind::Delete => {
                            m.ops.rows_deleted = m.ops.rows_deleted.saturating_add(rows_touched);
                            entry.rows_deleted = entry.rows_deleted.saturating_add(rows_touched);
                        }
                        ExecKind::Patch => {
                            m.ops.rows_patched = m.ops.rows_patched.saturating_add(rows_touched);
                            entry.rows_patched = entry.rows_patched.saturating_add(rows_touched);
                        }
                        // Saved and aggregated rows are already counted at
                        // start/scan time.
                        ExecKind::Save | ExecKind::Aggregate => {}
                    }
                });
            }

            MetricsEvent::RowsScanned {
                entity_path,
                rows_scanned,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.rows_scanned = m.ops.rows_scanned.saturating_add(rows_scanned);
                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    entry.rows_scanned = entry.rows_scanned.saturating_add(rows_scanned);
                });
            }

            MetricsEvent::SessionFlush { writes } => {
                metrics::with_state_mut(|m| {
                    m.ops.session_flushes = m.ops.session_flushes.saturating_add(1);
                    m.ops.session_flushed_writes =
                        m.ops.session_flushed_writes.saturating_add(writes);
                });
            }

            MetricsEvent::SessionClear => {
                metrics::with_state_mut(|m| {
                    m.ops.session_clears = m.ops.session_clears.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) fn record(event: MetricsEvent) {
    // Clone the Rc out of the slot first so a sink that records again does
    // not re-borrow the cell.
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().last().cloned());
    match sink {
        Some(sink) => sink.record(event),
        None => GlobalMetricsSink.record(event),
    }
}

/// Snapshot the current counter state for endpoint/test plumbing.
#[must_use]
pub fn metrics_report() -> metrics::EventState {
    metrics::with_state(Clone::clone)
}

/// Reset all counter state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override. Overrides nest;
/// each scope restores the previous sink on exit, including unwinds.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard;

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                cell.borrow_mut().pop();
            });
        }
    }

    SINK_OVERRIDE.with(|cell| cell.borrow_mut().push(sink));
    let _guard = Guard;

    f()
}

/// Span
/// RAII guard that emits start/finish events for one executor call.
/// Ensures finish accounting happens even on unwind.

pub(crate) struct Span<E: EntityKind> {
    kind: ExecKind,
    rows: u64,
    _marker: PhantomData<E>,
}

impl<E: EntityKind> Span<E> {
    /// Start a metrics span for a specific entity and executor kind.
    #[must_use]
    pub(crate) fn new(kind: ExecKind) -> Self {
        record(MetricsEvent::ExecStart {
            kind,
            entity_path: E::PATH,
        });

        Self {
            kind,
            rows: 0,
            _marker: PhantomData,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }
}

impl<E: EntityKind> Drop for Span<E> {
    fn drop(&mut self) {
        record(MetricsEvent::ExecFinish {
            kind: self.kind,
            entity_path: E::PATH,
            rows_touched: self.rows,
        });
    }
}

///
/// TESTS
///
