//! Worklist-driven rewriting to a fixpoint.
//!
//! A rewrite takes a set of elements (instructions, expressions, graph nodes) and keeps applying
//! a local [`RewriteRule`] to them until no rule application changes anything. Rewriting one
//! element can invalidate or create others, so the elements still to be looked at are kept in a
//! [`Worklist`] that never holds the same element twice.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       Rewrite Pipeline                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  UnitScheduler                One driver per compilation unit     │
//! │    └─ rayon + DashMap          (units rewritten in parallel)     │
//! │                                                                  │
//! │  RewriteDriver                Pop → rewrite → fold back          │
//! │    ├─ RewriteConfig            (iteration limit, tracing)        │
//! │    ├─ RewriteRule              initialize / rewrite / finalize   │
//! │    └─ RewriteContext           arena access, revisit queue       │
//! │                                                                  │
//! │  Worklist                     Deduplicating FIFO of handles      │
//! │    └─ WorklistTracer           NoopTracer or EventLog            │
//! │                                                                  │
//! │  Arena / Handle               Generation-checked storage         │
//! │                                                                  │
//! │  EventLog                     Change tracking and diagnostics    │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod arena;
mod driver;
mod events;
mod scheduler;
mod trace;
mod worklist;

pub use arena::{Arena, Handle};
pub use driver::{
    RewriteAction, RewriteConfig, RewriteContext, RewriteDriver, RewriteRule, RewriteStats,
};
pub use events::{Event, EventBuilder, EventKind, EventLog};
pub use scheduler::UnitScheduler;
pub use trace::{NoopTracer, WorklistOp, WorklistTracer};
pub use worklist::Worklist;
