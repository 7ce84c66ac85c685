//! Event logging for rewrite runs.
//!
//! Every interesting thing that happens while a rewrite drains its worklist can be recorded as
//! an [`Event`]: worklist traffic (when tracing is enabled), rewrites applied by rules, and
//! driver-level diagnostics. Events are collected in an [`EventLog`], which is append-only and
//! can be shared by reference between threads.
//!
//! # Example
//!
//! ```rust
//! use optcore::compiler::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::ElementReplaced)
//!     .source("fold-constants")
//!     .element("%3")
//!     .message("add 1, 2 -> 3");
//! log.info("rewrite started");
//!
//! assert_eq!(log.count_kind(EventKind::ElementReplaced), 1);
//! assert_eq!(log.summary(), "1 element replaced");
//! ```

use std::{collections::HashMap, fmt};

use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// Categories of events that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum EventKind {
    /// An element was queued on a worklist.
    WorklistAdd,
    /// A pending element was dropped from a worklist.
    WorklistRemove,
    /// An element was taken off a worklist for processing.
    WorklistPop,
    /// A pending element was swapped for another one.
    WorklistReplace,

    /// A rule replaced an element with new elements.
    ElementReplaced,
    /// A rule deleted an element.
    ElementDeleted,
    /// A rule left an element as it was. Recorded only while worklist tracing is on.
    ElementUnchanged,

    /// A rewrite run started.
    RewriteStarted,
    /// A rewrite run reached its fixpoint.
    RewriteCompleted,
    /// A scheduler finished one compilation unit.
    UnitCompleted,

    /// Informational message.
    Info,
    /// Warning (something unexpected but recoverable).
    Warning,
    /// Error (something failed).
    Error,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            // Worklist traffic
            Self::WorklistAdd => "ADD",
            Self::WorklistRemove => "REMOVE",
            Self::WorklistPop => "POP",
            Self::WorklistReplace => "REPLACE",
            // Transformations
            Self::ElementReplaced => "element replaced",
            Self::ElementDeleted => "element deleted",
            Self::ElementUnchanged => "element unchanged",
            // Driver
            Self::RewriteStarted => "rewrite started",
            Self::RewriteCompleted => "rewrite completed",
            Self::UnitCompleted => "unit completed",
            // Diagnostic
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Returns true if this event is worklist traffic.
    #[must_use]
    pub fn is_trace(&self) -> bool {
        matches!(
            self,
            Self::WorklistAdd | Self::WorklistRemove | Self::WorklistPop | Self::WorklistReplace
        )
    }

    /// Returns true if this event represents a change to the rewritten program.
    #[must_use]
    pub fn is_transformation(&self) -> bool {
        matches!(self, Self::ElementReplaced | Self::ElementDeleted)
    }

    /// Returns true if this is a diagnostic event (info/warning/error).
    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Info | Self::Warning | Self::Error)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single logged event.
#[derive(Debug, Clone)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// Worklist or rule that produced the event.
    pub source: Option<String>,
    /// Rendering of the element involved, if any.
    pub element: Option<String>,
    /// Compilation unit the event belongs to, if any.
    pub unit: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl Event {
    fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            source: None,
            element: None,
            unit: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, &self.element) {
            (Some(source), Some(element)) => {
                write!(f, "[{source}] {} {element}", self.kind)?;
                if self.message != self.kind.description() {
                    write!(f, ": {}", self.message)?;
                }
                Ok(())
            }
            (Some(source), None) => write!(f, "[{source}] {}", self.message),
            _ => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Builder for creating events with a fluent API.
///
/// Created by [`EventLog::record`]. The event is added to the log when the builder is dropped.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    source: Option<String>,
    element: Option<String>,
    unit: Option<String>,
    message: Option<String>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            source: None,
            element: None,
            unit: None,
            message: None,
        }
    }

    /// Sets the worklist or rule that produced the event.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the element the event is about.
    pub fn element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    /// Sets the compilation unit.
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets a custom message describing the event.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        self.log.events.push(Event {
            kind: self.kind,
            source: self.source.take(),
            element: self.element.take(),
            unit: self.unit.take(),
            message,
        });
    }
}

/// Collection of events from one or more rewrite runs.
///
/// This type is thread-safe: events can be appended concurrently from multiple threads using
/// shared references (`&self`).
#[derive(Debug, Default)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        let new_log = Self::new();
        new_log.merge(self);
        new_log
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }

    /// Returns true if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts building a new event of the given kind.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Records an informational message.
    pub fn info(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Info, message));
    }

    /// Records a warning message.
    pub fn warn(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Warning, message));
    }

    /// Records an error message.
    pub fn error(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Error, message));
    }

    /// Appends copies of all events of `other`.
    pub fn merge(&self, other: &EventLog) {
        for (_, event) in &other.events {
            self.events.push(event.clone());
        }
    }

    /// Appends copies of all events of `other`, tagging them with `unit`.
    pub fn merge_unit(&self, other: &EventLog, unit: &str) {
        for (_, event) in &other.events {
            let mut event = event.clone();
            event.unit.get_or_insert_with(|| unit.to_string());
            self.events.push(event);
        }
    }

    /// Returns true if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.events.iter().any(|(_, e)| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|(_, e)| e.kind == kind).count()
    }

    /// Returns an iterator over all events.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Returns an iterator over events of a specific kind.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.kind == kind)
    }

    /// Returns an iterator over worklist traffic only.
    pub fn traces(&self) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(|e| e.kind.is_trace())
    }

    /// Returns an iterator over warning events.
    pub fn warnings(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Warning)
    }

    /// Returns an iterator over error events.
    pub fn errors(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Error)
    }

    /// Counts events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::with_capacity(EventKind::COUNT);
        for (_, event) in self.events.iter() {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Generates a human-readable summary of the transformations recorded.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let counts = self.count_by_kind();
        let parts: Vec<String> = EventKind::iter()
            .filter(EventKind::is_transformation)
            .filter_map(|kind| {
                counts
                    .get(&kind)
                    .map(|count| format!("{} {}", count, kind.description()))
            })
            .collect();

        if parts.is_empty() {
            return format!("{} events", self.len());
        }

        parts.join(", ")
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = Box<dyn Iterator<Item = &'a Event> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl FromIterator<Event> for EventLog {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        let log = Self::new();
        for event in iter {
            log.events.push(event);
        }
        log
    }
}
