//! Synchronization utilities for lazily built, process-lifetime state.
//!
//! # Key Components
//!
//! - [`OnceGuard`] - Runs an initializer exactly once across all threads
//! - [`run_once`] - Free-function form taking an explicit context argument
//! - [`LazyGlobal`] - A value built on first access under a [`OnceGuard`]
//!
//! # Design Principles
//!
//! - **Single execution**: exactly one caller becomes the runner; all others block until it is
//!   done, then return without running anything
//! - **Visibility**: completion is published with release ordering and observed with acquire
//!   ordering, so everything the initializer wrote is visible to every caller that returns
//! - **No recovery**: an initializer that panics, or that re-enters its own guard, leaves the
//!   guard faulted and takes the fatal path of [`crate::utils::fatal`]. A partially initialized
//!   global is never handed out
//! - **No timeouts**: waiting is unconditional
//!
//! # Examples
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use optcore::{run_once, OnceGuard};
//!
//! static TOKEN: OnceGuard = OnceGuard::new();
//! static BUILT: AtomicUsize = AtomicUsize::new(0);
//!
//! fn build(counter: &AtomicUsize) {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! }
//!
//! run_once(&TOKEN, build, &BUILT);
//! run_once(&TOKEN, build, &BUILT);
//! assert_eq!(BUILT.load(Ordering::Relaxed), 1);
//! assert!(TOKEN.is_completed());
//! ```

use std::{
    any::Any,
    cell::UnsafeCell,
    fmt,
    mem::MaybeUninit,
    ops::Deref,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, ThreadId},
};

use crate::utils::fatal::{fatal_error_with, fatal_handler, FatalFlags, FatalHandler};

const UNSTARTED: u8 = 0;
const IN_PROGRESS: u8 = 1;
const DONE: u8 = 2;
const FAULTED: u8 = 3;

/// Observable state of a [`OnceGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnceState {
    /// No caller has claimed the guard yet.
    Unstarted,
    /// A runner is executing the initializer.
    InProgress,
    /// The initializer completed.
    Done,
    /// The initializer did not complete. Every later caller takes the fatal path.
    Faulted,
}

/// A once-initialization token.
///
/// The guard is an explicit object rather than hidden language-level state: create it (usually
/// as a `static`, [`OnceGuard::new`] is `const`) and pass it by reference to whoever needs the
/// lazily built data.
///
/// State transitions are `Unstarted → InProgress → Done` on success and
/// `Unstarted → InProgress → Faulted` when the initializer panics. The first transition is a
/// compare-and-swap, so exactly one caller becomes the runner. Callers that lose the race wait
/// on a condition variable until the state is terminal.
pub struct OnceGuard {
    /// One of `UNSTARTED`, `IN_PROGRESS`, `DONE`, `FAULTED`
    state: AtomicU8,
    /// Thread currently running the initializer; also the condvar's mutex
    runner: Mutex<Option<ThreadId>>,
    /// Wakes waiters once the state becomes terminal
    condvar: Condvar,
    /// Handler used instead of the process-wide one, if set
    handler: Option<Arc<dyn FatalHandler>>,
}

impl OnceGuard {
    /// Creates an unstarted guard that reports failures through the process-wide handler.
    #[must_use]
    pub const fn new() -> Self {
        OnceGuard {
            state: AtomicU8::new(UNSTARTED),
            runner: Mutex::new(None),
            condvar: Condvar::new(),
            handler: None,
        }
    }

    /// Creates an unstarted guard that reports failures through `handler`.
    #[must_use]
    pub fn with_fatal_handler(handler: Arc<dyn FatalHandler>) -> Self {
        OnceGuard {
            handler: Some(handler),
            ..Self::new()
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> OnceState {
        match self.state.load(Ordering::Acquire) {
            UNSTARTED => OnceState::Unstarted,
            IN_PROGRESS => OnceState::InProgress,
            DONE => OnceState::Done,
            _ => OnceState::Faulted,
        }
    }

    /// Returns `true` once the initializer has completed successfully.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state.load(Ordering::Acquire) == DONE
    }

    /// Runs `initializer` if no caller has run it yet, and returns once it has completed.
    ///
    /// Every call, including the one that ran the initializer, returns only after the
    /// initializer finished, and observes all memory it wrote.
    ///
    /// # Fatal conditions
    ///
    /// The call does not return (the guard's fatal handler terminates) when:
    /// - the initializer panics; the guard becomes [`OnceState::Faulted`] and waiters are woken
    ///   so they can take the same path
    /// - the guard is already faulted
    /// - the initializer calls back into this guard on the same thread
    pub fn run_once<F>(&self, initializer: F)
    where
        F: FnOnce(),
    {
        if self.state.load(Ordering::Acquire) == DONE {
            return;
        }

        match self.state.compare_exchange(
            UNSTARTED,
            IN_PROGRESS,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => self.run_initializer(initializer),
            Err(_) => self.wait_for_runner(),
        }
    }

    fn run_initializer<F: FnOnce()>(&self, initializer: F) {
        *self.lock_runner() = Some(thread::current().id());

        let outcome = panic::catch_unwind(AssertUnwindSafe(initializer));
        let terminal = if outcome.is_ok() { DONE } else { FAULTED };

        {
            let mut runner = self.lock_runner();
            *runner = None;
            self.state.store(terminal, Ordering::Release);
            self.condvar.notify_all();
        }

        if let Err(payload) = outcome {
            self.fatal(&format!(
                "once initializer did not complete: {}",
                panic_message(payload.as_ref())
            ));
        }
    }

    fn wait_for_runner(&self) {
        let mut runner = self.lock_runner();
        loop {
            match self.state.load(Ordering::Acquire) {
                DONE => return,
                FAULTED => {
                    drop(runner);
                    self.fatal("once initializer previously failed; lazy state is unusable");
                }
                _ => {
                    if *runner == Some(thread::current().id()) {
                        drop(runner);
                        self.fatal("once initializer re-entered its own guard");
                    }
                    runner = self
                        .condvar
                        .wait(runner)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    fn lock_runner(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.runner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fatal(&self, message: &str) -> ! {
        match &self.handler {
            Some(handler) => fatal_error_with(handler.as_ref(), FatalFlags::empty(), message),
            None => fatal_error_with(fatal_handler().as_ref(), FatalFlags::empty(), message),
        }
    }
}

impl Default for OnceGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OnceGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceGuard")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "initializer panicked"
    }
}

/// Runs `initializer(context)` exactly once for `token`.
///
/// This is the free-function form of [`OnceGuard::run_once`] for initializers that take their
/// input explicitly instead of capturing it.
pub fn run_once<C: ?Sized, F>(token: &OnceGuard, initializer: F, context: &C)
where
    F: FnOnce(&C),
{
    token.run_once(|| initializer(context));
}

/// A value built on first access and shared for the rest of the process.
///
/// ```rust
/// use optcore::LazyGlobal;
///
/// static OPCODES: LazyGlobal<Vec<&'static str>> = LazyGlobal::new(|| vec!["add", "mul"]);
///
/// assert_eq!(OPCODES.len(), 2);
/// assert!(OPCODES.get_if_initialized().is_some());
/// ```
pub struct LazyGlobal<T> {
    guard: OnceGuard,
    init: fn() -> T,
    value: UnsafeCell<MaybeUninit<T>>,
}

// SAFETY: the slot is written only by the guard's single runner before `DONE` is published, and
// only read after `DONE` was observed with acquire ordering. Shared access hands out `&T`.
unsafe impl<T: Send + Sync> Sync for LazyGlobal<T> {}
// SAFETY: moving the cell moves the `T` it may contain.
unsafe impl<T: Send> Send for LazyGlobal<T> {}

impl<T> LazyGlobal<T> {
    /// Creates an unbuilt value with the given initializer.
    #[must_use]
    pub const fn new(init: fn() -> T) -> Self {
        LazyGlobal {
            guard: OnceGuard::new(),
            init,
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Returns the value, building it first if needed.
    pub fn get(&self) -> &T {
        self.guard.run_once(|| {
            let value = (self.init)();
            // SAFETY: only the runner of `guard` reaches this point, once, and no reader exists
            // before `DONE` is published.
            unsafe {
                (*self.value.get()).write(value);
            }
        });

        // SAFETY: `run_once` only returns when the guard is `DONE`, so the slot was written and
        // the write happens-before this read.
        unsafe { (*self.value.get()).assume_init_ref() }
    }

    /// Returns the value if it has already been built.
    #[must_use]
    pub fn get_if_initialized(&self) -> Option<&T> {
        if self.guard.is_completed() {
            // SAFETY: see `get`.
            Some(unsafe { (*self.value.get()).assume_init_ref() })
        } else {
            None
        }
    }

    /// Returns the state of the underlying guard.
    #[must_use]
    pub fn state(&self) -> OnceState {
        self.guard.state()
    }
}

impl<T> Deref for LazyGlobal<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.get()
    }
}

impl<T> Drop for LazyGlobal<T> {
    fn drop(&mut self) {
        if self.guard.is_completed() {
            // SAFETY: the slot was initialized and `&mut self` guarantees no outstanding borrow.
            unsafe { self.value.get_mut().assume_init_drop() }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for LazyGlobal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get_if_initialized() {
            Some(value) => f.debug_tuple("LazyGlobal").field(value).finish(),
            None => f.write_str("LazyGlobal(<unbuilt>)"),
        }
    }
}
