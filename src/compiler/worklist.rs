//! Deduplicating FIFO worklist for fixpoint rewriting.
//!
//! A [`Worklist`] holds the elements still waiting to be rewritten. Each element is pending at
//! most once: adding an element that is already pending does nothing, so an element touched by
//! many neighbours in one round is still only visited once. Elements come out in the order they
//! first became pending.
//!
//! Internally the worklist keeps a sequence of `(ticket, element)` entries and a membership map
//! from element to its live ticket. Removing an element only drops it from the map; the stale
//! entry left in the sequence is skipped when it reaches the front. Once stale entries outnumber
//! live ones the sequence is rebuilt, so its length stays proportional to the pending count and
//! every operation is O(1) amortized.
//!
//! # Examples
//!
//! ```rust
//! use optcore::compiler::Worklist;
//!
//! let mut worklist = Worklist::new("simplify");
//! worklist.add_initial_group([1, 2, 3, 2]);
//! assert_eq!(worklist.len(), 3);
//!
//! worklist.replace(2, 20);
//! worklist.remove(1);
//!
//! let order: Vec<_> = std::iter::from_fn(|| worklist.pop()).collect();
//! assert_eq!(order, vec![3, 20]);
//! assert!(worklist.is_empty());
//! ```

use std::{
    collections::{HashMap, VecDeque},
    fmt,
    hash::Hash,
};

use crate::compiler::trace::{NoopTracer, WorklistOp, WorklistTracer};

/// Stale entries tolerated on top of twice the pending count before the sequence is rebuilt.
const COMPACT_SLACK: usize = 16;

/// Deduplicating FIFO of pending elements with an optional trace hook.
pub struct Worklist<H, T = NoopTracer> {
    name: String,
    sequence: VecDeque<(u64, H)>,
    pending: HashMap<H, u64>,
    next_ticket: u64,
    tracer: T,
}

impl<H> Worklist<H, NoopTracer>
where
    H: Copy + Eq + Hash + fmt::Debug,
{
    /// Creates an empty, untraced worklist.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_tracer(name, NoopTracer)
    }
}

impl<H, T> Worklist<H, T>
where
    H: Copy + Eq + Hash + fmt::Debug,
    T: WorklistTracer,
{
    /// Creates an empty worklist reporting its traffic to `tracer`.
    pub fn with_tracer(name: impl Into<String>, tracer: T) -> Self {
        Worklist {
            name: name.into(),
            sequence: VecDeque::new(),
            pending: HashMap::new(),
            next_ticket: 0,
            tracer,
        }
    }

    /// Label used in trace records.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of pending elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns `true` if `element` is pending.
    #[must_use]
    pub fn contains(&self, element: H) -> bool {
        self.pending.contains_key(&element)
    }

    /// Queues `element` unless it is already pending.
    ///
    /// Returns `true` if the element was newly queued.
    pub fn add(&mut self, element: H) -> bool {
        if !self.enqueue(element) {
            return false;
        }
        self.emit(WorklistOp::Add, &element);
        true
    }

    /// Queues every element of `elements` in order, skipping duplicates.
    pub fn add_initial_group<I>(&mut self, elements: I)
    where
        I: IntoIterator<Item = H>,
    {
        let elements = elements.into_iter();
        let (lower, _) = elements.size_hint();
        self.sequence.reserve(lower);
        self.pending.reserve(lower);

        for element in elements {
            self.add(element);
        }
    }

    /// Drops `element` if it is pending. Returns `true` if it was.
    pub fn remove(&mut self, element: H) -> bool {
        if self.pending.remove(&element).is_none() {
            return false;
        }
        self.emit(WorklistOp::Remove, &element);
        self.compact();
        true
    }

    /// Takes the oldest pending element, or `None` once the worklist is drained.
    pub fn pop(&mut self) -> Option<H> {
        while let Some((ticket, element)) = self.sequence.pop_front() {
            if self.is_live(ticket, &element) {
                self.pending.remove(&element);
                self.emit(WorklistOp::Pop, &element);
                return Some(element);
            }
        }
        None
    }

    /// Drops `old` and queues `new` in one step.
    ///
    /// Equivalent to [`Worklist::remove`] followed by [`Worklist::add`]: `new` goes to the back
    /// unless it was already pending, in which case it keeps its place. `replace(x, x)` leaves `x`
    /// pending at the back.
    pub fn replace(&mut self, old: H, new: H) {
        let removed = self.pending.remove(&old).is_some();
        let added = self.enqueue(new);

        if self.tracer.enabled() && (removed || added) {
            self.tracer.trace(
                WorklistOp::Replace,
                &self.name,
                &format_args!("{old:?} -> {new:?}"),
            );
        }
        self.compact();
    }

    /// Drops every pending element.
    pub fn clear(&mut self) {
        self.sequence.clear();
        self.pending.clear();
    }

    /// Pending elements in the order [`Worklist::pop`] would return them.
    pub fn iter(&self) -> impl Iterator<Item = H> + '_ {
        self.sequence
            .iter()
            .filter(|(ticket, element)| self.is_live(*ticket, element))
            .map(|&(_, element)| element)
    }

    /// The tracer this worklist reports to.
    pub fn tracer(&self) -> &T {
        &self.tracer
    }

    fn enqueue(&mut self, element: H) -> bool {
        if self.pending.contains_key(&element) {
            return false;
        }
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending.insert(element, ticket);
        self.sequence.push_back((ticket, element));
        true
    }

    fn is_live(&self, ticket: u64, element: &H) -> bool {
        self.pending.get(element) == Some(&ticket)
    }

    // Keeps the front of the sequence live and at most half of it stale
    fn compact(&mut self) {
        while let Some(&(ticket, element)) = self.sequence.front() {
            if self.is_live(ticket, &element) {
                break;
            }
            self.sequence.pop_front();
        }
        if self.pending.is_empty() {
            self.sequence.clear();
        } else if self.sequence.len() > 2 * self.pending.len() + COMPACT_SLACK {
            let pending = &self.pending;
            self.sequence
                .retain(|(ticket, element)| pending.get(element) == Some(ticket));
        }
    }

    #[inline]
    fn emit(&self, op: WorklistOp, element: &H) {
        if self.tracer.enabled() {
            self.tracer.trace(op, &self.name, element);
        }
    }
}

impl<H, T> fmt::Debug for Worklist<H, T>
where
    H: Copy + Eq + Hash + fmt::Debug,
    T: WorklistTracer,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worklist")
            .field("name", &self.name)
            .field("pending", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{EventKind, EventLog};

    fn drain<H, T>(worklist: &mut Worklist<H, T>) -> Vec<H>
    where
        H: Copy + Eq + Hash + fmt::Debug,
        T: WorklistTracer,
    {
        std::iter::from_fn(|| worklist.pop()).collect()
    }

    #[test]
    fn duplicates_are_dequeued_once() {
        let mut worklist = Worklist::new("w");
        assert!(worklist.add(5));
        for _ in 0..10 {
            assert!(!worklist.add(5));
        }
        assert_eq!(worklist.len(), 1);
        assert_eq!(drain(&mut worklist), vec![5]);
        assert_eq!(worklist.pop(), None);
    }

    #[test]
    fn fifo_order() {
        let mut worklist = Worklist::new("w");
        worklist.add_initial_group([3, 1, 4, 1, 5, 9, 2, 6]);
        assert_eq!(
            worklist.iter().collect::<Vec<_>>(),
            vec![3, 1, 4, 5, 9, 2, 6]
        );
        assert_eq!(drain(&mut worklist), vec![3, 1, 4, 5, 9, 2, 6]);
    }

    #[test]
    fn readd_after_pop() {
        let mut worklist = Worklist::new("w");
        worklist.add(1);
        worklist.add(2);
        assert_eq!(worklist.pop(), Some(1));
        assert!(worklist.add(1));
        assert_eq!(drain(&mut worklist), vec![2, 1]);
    }

    #[test]
    fn remove_skips_element() {
        let mut worklist = Worklist::new("w");
        worklist.add_initial_group(0..5);
        assert!(worklist.remove(2));
        assert!(!worklist.remove(2));
        assert!(!worklist.remove(42));
        assert!(!worklist.contains(2));
        assert_eq!(worklist.len(), 4);
        assert_eq!(drain(&mut worklist), vec![0, 1, 3, 4]);
    }

    #[test]
    fn remove_then_add_goes_to_back() {
        let mut worklist = Worklist::new("w");
        worklist.add_initial_group([1, 2, 3]);
        worklist.remove(1);
        worklist.add(1);
        assert_eq!(drain(&mut worklist), vec![2, 3, 1]);
    }

    #[test]
    fn replace_swaps_membership() {
        let mut worklist = Worklist::new("w");
        worklist.add_initial_group([1, 2]);
        worklist.replace(1, 10);
        assert!(!worklist.contains(1));
        assert!(worklist.contains(10));
        assert_eq!(drain(&mut worklist), vec![2, 10]);
    }

    #[test]
    fn replace_with_self_stays_pending() {
        let mut worklist = Worklist::new("w");
        worklist.add_initial_group([7, 8]);
        worklist.replace(7, 7);
        assert!(worklist.contains(7));
        assert_eq!(worklist.len(), 2);
        assert_eq!(drain(&mut worklist), vec![8, 7]);
    }

    #[test]
    fn replace_onto_pending_element() {
        let mut worklist = Worklist::new("w");
        worklist.add_initial_group([1, 2, 3]);
        worklist.replace(3, 1);
        assert_eq!(drain(&mut worklist), vec![1, 2]);
    }

    #[test]
    fn replace_non_pending_adds_new() {
        let mut worklist = Worklist::new("w");
        worklist.replace(1, 2);
        assert_eq!(drain(&mut worklist), vec![2]);
    }

    #[test]
    fn clear_and_reuse() {
        let mut worklist = Worklist::new("w");
        worklist.add_initial_group(0..100);
        worklist.clear();
        assert!(worklist.is_empty());
        assert_eq!(worklist.pop(), None);
        worklist.add(3);
        assert_eq!(drain(&mut worklist), vec![3]);
    }

    #[test]
    fn churn_drains_exactly_the_survivors() {
        let mut worklist = Worklist::new("w");
        let mut expected = Vec::new();
        for i in 0..1000u32 {
            worklist.add(i);
            if i % 3 == 0 {
                worklist.remove(i);
            } else {
                expected.push(i);
            }
        }
        assert_eq!(drain(&mut worklist), expected);
    }

    #[test]
    fn churn_behind_a_pending_head_stays_bounded() {
        let mut worklist = Worklist::new("w");
        worklist.add(0u32);
        for _ in 0..100_000 {
            worklist.add(1);
            worklist.remove(1);
        }
        assert_eq!(worklist.len(), 1);
        assert!(worklist.sequence.len() <= 2 * worklist.len() + COMPACT_SLACK + 1);

        for i in 1..=50 {
            worklist.add(i);
        }
        for i in (2..=50).step_by(2) {
            worklist.remove(i);
        }
        assert!(worklist.sequence.len() <= 2 * worklist.len() + COMPACT_SLACK + 1);
        let expected: Vec<u32> = std::iter::once(0).chain((1..=50).step_by(2)).collect();
        assert_eq!(drain(&mut worklist), expected);
    }

    #[test]
    fn tracer_sees_every_operation() {
        let log = EventLog::new();
        let mut worklist = Worklist::with_tracer("fold", &log);
        worklist.add(1);
        worklist.add(1);
        worklist.add(2);
        worklist.remove(2);
        worklist.replace(1, 3);
        worklist.pop();
        worklist.pop();

        let trace: Vec<_> = log.iter().map(ToString::to_string).collect();
        assert_eq!(
            trace,
            vec![
                "[fold] ADD 1",
                "[fold] ADD 2",
                "[fold] REMOVE 2",
                "[fold] REPLACE 1 -> 3",
                "[fold] POP 3",
            ]
        );
        assert_eq!(log.count_kind(EventKind::WorklistAdd), 2);
        assert_eq!(worklist.name(), "fold");
    }

    #[test]
    fn debug_lists_pending() {
        let mut worklist = Worklist::new("dbg");
        worklist.add_initial_group([4, 5]);
        worklist.remove(4);
        assert_eq!(
            format!("{worklist:?}"),
            "Worklist { name: \"dbg\", pending: [5] }"
        );
    }
}
