//! Debug tracing hook for worklist traffic.
//!
//! A [`crate::compiler::Worklist`] reports every `add`, `remove`, `pop` and `replace` to its
//! tracer. The default [`NoopTracer`] reports itself as disabled, so the worklist skips building
//! the trace arguments entirely. [`EventLog`] implements the trait and stores each operation as
//! an [`EventKind`] trace event.

use std::fmt;

use crate::compiler::events::{EventKind, EventLog};

/// A worklist operation as seen by a tracer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorklistOp {
    /// An element became pending.
    Add,
    /// A pending element was dropped.
    Remove,
    /// The next pending element was handed out.
    Pop,
    /// A pending element was swapped for another.
    Replace,
}

impl WorklistOp {
    /// The event kind this operation is logged as.
    #[must_use]
    pub fn event_kind(self) -> EventKind {
        match self {
            WorklistOp::Add => EventKind::WorklistAdd,
            WorklistOp::Remove => EventKind::WorklistRemove,
            WorklistOp::Pop => EventKind::WorklistPop,
            WorklistOp::Replace => EventKind::WorklistReplace,
        }
    }
}

impl fmt::Display for WorklistOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_kind().description())
    }
}

/// Receiver of worklist trace records.
pub trait WorklistTracer {
    /// Whether the worklist should report to this tracer at all.
    fn enabled(&self) -> bool {
        true
    }

    /// Records one operation on the worklist named `worklist`.
    fn trace(&self, op: WorklistOp, worklist: &str, element: &dyn fmt::Debug);
}

/// Tracer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl WorklistTracer for NoopTracer {
    #[inline]
    fn enabled(&self) -> bool {
        false
    }

    #[inline]
    fn trace(&self, _op: WorklistOp, _worklist: &str, _element: &dyn fmt::Debug) {}
}

impl WorklistTracer for EventLog {
    fn trace(&self, op: WorklistOp, worklist: &str, element: &dyn fmt::Debug) {
        self.record(op.event_kind())
            .source(worklist)
            .element(format!("{element:?}"));
    }
}

impl<T: WorklistTracer + ?Sized> WorklistTracer for &T {
    #[inline]
    fn enabled(&self) -> bool {
        (**self).enabled()
    }

    #[inline]
    fn trace(&self, op: WorklistOp, worklist: &str, element: &dyn fmt::Debug) {
        (**self).trace(op, worklist, element);
    }
}

/// `None` behaves like [`NoopTracer`]; lets callers switch tracing on at runtime.
impl<T: WorklistTracer> WorklistTracer for Option<T> {
    #[inline]
    fn enabled(&self) -> bool {
        self.as_ref().is_some_and(|tracer| tracer.enabled())
    }

    fn trace(&self, op: WorklistOp, worklist: &str, element: &dyn fmt::Debug) {
        if let Some(tracer) = self {
            tracer.trace(op, worklist, element);
        }
    }
}
