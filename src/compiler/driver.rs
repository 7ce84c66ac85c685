//! Fixpoint rewrite driver.
//!
//! [`RewriteDriver::run`] seeds a [`Worklist`] with the elements of interest, then keeps popping
//! elements and handing them to a [`RewriteRule`] until nothing is pending. The rule answers with
//! a [`RewriteAction`] and may queue neighbours it affected through
//! [`RewriteContext::revisit`]; the driver folds both back into the arena and the worklist.
//!
//! # Example
//!
//! ```rust
//! use optcore::compiler::{
//!     Arena, Handle, RewriteAction, RewriteConfig, RewriteContext, RewriteDriver, RewriteRule,
//! };
//!
//! /// Deletes zero constants.
//! struct DropZeros;
//!
//! impl RewriteRule<i64> for DropZeros {
//!     fn name(&self) -> &'static str {
//!         "drop-zeros"
//!     }
//!
//!     fn rewrite(
//!         &mut self,
//!         handle: Handle,
//!         ctx: &mut RewriteContext<'_, i64>,
//!     ) -> optcore::Result<RewriteAction> {
//!         Ok(match ctx.get(handle) {
//!             Some(0) => RewriteAction::Deleted,
//!             _ => RewriteAction::Unchanged,
//!         })
//!     }
//! }
//!
//! let mut arena = Arena::new();
//! let seeds: Vec<Handle> = [4, 0, 0, 7].into_iter().map(|v| arena.insert(v)).collect();
//!
//! let driver = RewriteDriver::new(RewriteConfig::default());
//! let stats = driver.run(&mut arena, seeds, &mut DropZeros)?;
//!
//! assert_eq!(stats.deleted, 2);
//! assert_eq!(arena.len(), 2);
//! # Ok::<(), optcore::Error>(())
//! ```

use std::fmt;

use crate::{
    compiler::{
        arena::{Arena, Handle},
        events::{EventKind, EventLog},
        worklist::Worklist,
    },
    Error, Result,
};

/// Outcome of rewriting a single element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteAction {
    /// The element is already in its final form.
    Unchanged,
    /// The element was superseded by the given elements.
    ///
    /// The driver erases the old element. The new elements must be live (usually created with
    /// [`RewriteContext::insert`]); they are queued in order.
    Replaced(Vec<Handle>),
    /// The element is gone. The driver erases it from the arena and the worklist.
    Deleted,
}

/// A local rewrite applied to elements until a fixpoint is reached.
///
/// Rules run on one thread at a time and may keep per-run state in `self`. The lifecycle is:
///
/// 1. [`initialize`](RewriteRule::initialize) once before the first element
/// 2. [`rewrite`](RewriteRule::rewrite) for every popped element
/// 3. [`finalize`](RewriteRule::finalize) once after the worklist drains
pub trait RewriteRule<T> {
    /// Unique name, used as the worklist name and as the event source.
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str {
        self.name()
    }

    /// Called once before the first element is rewritten.
    ///
    /// # Errors
    ///
    /// An error aborts the run before any element is rewritten.
    fn initialize(&mut self, _ctx: &RewriteContext<'_, T>) -> Result<()> {
        Ok(())
    }

    /// Rewrites the element behind `handle`.
    ///
    /// `handle` is always live when this is called.
    ///
    /// # Errors
    ///
    /// Any error aborts the run and is returned from [`RewriteDriver::run`].
    fn rewrite(&mut self, handle: Handle, ctx: &mut RewriteContext<'_, T>)
        -> Result<RewriteAction>;

    /// Called once after the worklist has drained.
    ///
    /// # Errors
    ///
    /// An error is returned from [`RewriteDriver::run`] in place of the statistics; the
    /// rewrites already applied stay in the arena.
    fn finalize(&mut self, _ctx: &RewriteContext<'_, T>, _stats: &RewriteStats) -> Result<()> {
        Ok(())
    }
}

/// The view of a run a [`RewriteRule`] works through.
pub struct RewriteContext<'a, T> {
    arena: &'a mut Arena<T>,
    events: &'a EventLog,
    source: &'static str,
    revisit: Vec<Handle>,
}

impl<'a, T> RewriteContext<'a, T> {
    fn new(arena: &'a mut Arena<T>, events: &'a EventLog, source: &'static str) -> Self {
        RewriteContext {
            arena,
            events,
            source,
            revisit: Vec::new(),
        }
    }

    /// Returns the element behind `handle`, or `None` if it no longer exists.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.arena.get(handle)
    }

    /// Mutable counterpart of [`RewriteContext::get`].
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.arena.get_mut(handle)
    }

    /// Returns `true` if `handle` is live.
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.arena.contains(handle)
    }

    /// Stores a new element, typically a replacement.
    pub fn insert(&mut self, value: T) -> Handle {
        self.arena.insert(value)
    }

    /// Read access to the whole arena, for rules that look at neighbours.
    #[must_use]
    pub fn arena(&self) -> &Arena<T> {
        self.arena
    }

    /// Queues `handle` to be rewritten again after the current element.
    pub fn revisit(&mut self, handle: Handle) {
        debug_assert!(
            self.arena.contains(handle),
            "{}: revisit of stale handle {handle:?}",
            self.source
        );
        self.revisit.push(handle);
    }

    /// The event log of the run.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        self.events
    }
}

/// Configuration for a [`RewriteDriver`].
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    /// Maximum number of elements a single run may rewrite (default: 1,000,000).
    pub max_iterations: usize,

    /// Record every worklist operation into the event log (default: false).
    pub trace_worklist: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        RewriteConfig {
            max_iterations: 1_000_000,
            trace_worklist: false,
        }
    }
}

impl RewriteConfig {
    /// Sets [`RewriteConfig::max_iterations`].
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets [`RewriteConfig::trace_worklist`].
    #[must_use]
    pub fn with_trace_worklist(mut self, enabled: bool) -> Self {
        self.trace_worklist = enabled;
        self
    }
}

/// Counters collected by a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Elements handed to the rule.
    pub visited: usize,
    /// Elements superseded by new elements.
    pub replaced: usize,
    /// Elements erased.
    pub deleted: usize,
    /// Elements left as they were.
    pub unchanged: usize,
}

impl RewriteStats {
    /// Number of visits that changed something.
    #[must_use]
    pub fn changes(&self) -> usize {
        self.replaced + self.deleted
    }

    /// Adds the counters of `other` to `self`.
    pub fn merge(&mut self, other: &RewriteStats) {
        self.visited += other.visited;
        self.replaced += other.replaced;
        self.deleted += other.deleted;
        self.unchanged += other.unchanged;
    }
}

impl fmt::Display for RewriteStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} visited, {} replaced, {} deleted, {} unchanged",
            self.visited, self.replaced, self.deleted, self.unchanged
        )
    }
}

/// Runs [`RewriteRule`]s to a fixpoint.
#[derive(Debug, Default)]
pub struct RewriteDriver {
    config: RewriteConfig,
    events: EventLog,
}

impl RewriteDriver {
    /// Creates a driver with the given configuration and an empty event log.
    #[must_use]
    pub fn new(config: RewriteConfig) -> Self {
        RewriteDriver {
            config,
            events: EventLog::new(),
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Events recorded by all runs so far.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Takes the recorded events, leaving an empty log behind.
    pub fn take_events(&mut self) -> EventLog {
        std::mem::take(&mut self.events)
    }

    /// Rewrites `seeds` and everything they cause to be queued until nothing is pending.
    ///
    /// Seeds are queued in order with duplicates dropped. Stale seeds are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `rule`, or [`Error::IterationLimit`] if more than
    /// [`RewriteConfig::max_iterations`] elements would be rewritten. The arena keeps every
    /// change made before the failure.
    pub fn run<T, R>(
        &self,
        arena: &mut Arena<T>,
        seeds: impl IntoIterator<Item = Handle>,
        rule: &mut R,
    ) -> Result<RewriteStats>
    where
        R: RewriteRule<T> + ?Sized,
    {
        let name = rule.name();
        let tracer = self.config.trace_worklist.then_some(&self.events);
        let mut worklist = Worklist::with_tracer(name, tracer);

        let initialized = rule.initialize(&RewriteContext::new(arena, &self.events, name));
        self.check(name, None, initialized)?;

        worklist.add_initial_group(seeds.into_iter().filter(|&seed| {
            debug_assert!(arena.contains(seed), "{name}: stale seed {seed:?}");
            arena.contains(seed)
        }));

        self.events
            .record(EventKind::RewriteStarted)
            .source(name)
            .message(format!("{} seeds", worklist.len()));

        let mut stats = RewriteStats::default();

        while let Some(handle) = worklist.pop() {
            if !arena.contains(handle) {
                continue;
            }
            if stats.visited == self.config.max_iterations {
                self.events
                    .record(EventKind::Error)
                    .source(name)
                    .message(format!("no fixpoint after {} rewrites", stats.visited));
                return Err(Error::IterationLimit(self.config.max_iterations));
            }
            stats.visited += 1;

            let mut ctx = RewriteContext::new(arena, &self.events, name);
            let rewritten = rule.rewrite(handle, &mut ctx);
            let revisit = ctx.revisit;
            let action = self.check(name, Some(handle), rewritten)?;

            match action {
                RewriteAction::Unchanged => {
                    stats.unchanged += 1;
                    if self.config.trace_worklist {
                        self.events
                            .record(EventKind::ElementUnchanged)
                            .source(name)
                            .element(handle.to_string());
                    }
                }
                RewriteAction::Replaced(replacements) => {
                    stats.replaced += 1;
                    arena.remove(handle);

                    let mut live = replacements.iter().copied().filter(|&new| {
                        debug_assert!(
                            arena.contains(new),
                            "{name}: {handle:?} replaced by stale {new:?}"
                        );
                        arena.contains(new)
                    });
                    match live.next() {
                        Some(first) => {
                            worklist.replace(handle, first);
                            for new in live {
                                worklist.add(new);
                            }
                        }
                        None => {
                            worklist.remove(handle);
                        }
                    }

                    self.events
                        .record(EventKind::ElementReplaced)
                        .source(name)
                        .element(handle.to_string())
                        .message(format!("{handle} -> {}", join_handles(&replacements)));
                }
                RewriteAction::Deleted => {
                    stats.deleted += 1;
                    arena.remove(handle);
                    worklist.remove(handle);

                    self.events
                        .record(EventKind::ElementDeleted)
                        .source(name)
                        .element(handle.to_string());
                }
            }

            // The element just rewritten may have been revisited by itself before being erased
            for neighbour in revisit {
                if arena.contains(neighbour) {
                    worklist.add(neighbour);
                }
            }
        }

        let finalized = rule.finalize(&RewriteContext::new(arena, &self.events, name), &stats);
        self.check(name, None, finalized)?;

        self.events
            .record(EventKind::RewriteCompleted)
            .source(name)
            .message(stats.to_string());

        Ok(stats)
    }

    /// Records a failed rule callback as an `Error` event before handing the result back.
    fn check<V>(
        &self,
        source: &'static str,
        element: Option<Handle>,
        result: Result<V>,
    ) -> Result<V> {
        if let Err(error) = &result {
            let builder = self.events.record(EventKind::Error).source(source);
            let builder = match element {
                Some(handle) => builder.element(handle.to_string()),
                None => builder,
            };
            builder.message(error.to_string());
        }
        result
    }
}

fn join_handles(handles: &[Handle]) -> String {
    if handles.is_empty() {
        return "[]".to_string();
    }
    handles
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
