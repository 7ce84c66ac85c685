//! Fatal-error reporting with a replaceable termination strategy.
//!
//! Some failures leave the process in a state where continuing would silently produce wrong
//! results, a lazily built global that never finished initializing being the typical case. Those
//! failures are not returned as [`crate::Error`] values; they are reported and the process is
//! terminated through a [`FatalHandler`].
//!
//! The handler is a strategy object. [`AbortHandler`] (the default) prints the message to stderr
//! and aborts. [`PanicHandler`] prints the message and then panics, which lets embedders that
//! supervise worker threads, and test suites, observe the failure instead of losing the process.
//! A process-wide handler is installed with [`set_fatal_handler`]; individual
//! [`crate::OnceGuard`]s may carry their own.
//!
//! # Examples
//!
//! ```rust
//! use optcore::utils::fatal::{fatal_error_with, FatalFlags, PanicHandler};
//!
//! let result = std::panic::catch_unwind(|| {
//!     fatal_error_with(&PanicHandler, FatalFlags::empty(), "lazy table corrupted")
//! });
//! assert!(result.is_err());
//! ```

use std::{
    backtrace::Backtrace,
    fmt,
    io::Write,
    sync::{Arc, PoisonError, RwLock},
};

use bitflags::bitflags;

bitflags! {
    /// Options controlling how a fatal error or warning is reported.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FatalFlags: u32 {
        /// Capture and print a backtrace along with the message.
        const REPORT_BACKTRACE = 1 << 0;
    }
}

/// Strategy for reporting fatal errors and terminating.
pub trait FatalHandler: Send + Sync {
    /// Reports a fatal error without terminating.
    ///
    /// The default writes `fatal error: <message>` to stderr, followed by a backtrace when
    /// [`FatalFlags::REPORT_BACKTRACE`] is set.
    fn report(&self, flags: FatalFlags, message: &str) {
        write_report("fatal error", flags, message);
    }

    /// Reports a non-fatal warning.
    fn warn(&self, flags: FatalFlags, message: &str) {
        write_report("warning", flags, message);
    }

    /// Terminates after [`FatalHandler::report`] has run. Must not return.
    fn terminate(&self, message: &str) -> !;
}

/// Reports to stderr and aborts the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbortHandler;

impl FatalHandler for AbortHandler {
    fn terminate(&self, _message: &str) -> ! {
        std::process::abort()
    }
}

/// Reports to stderr and panics with the message.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicHandler;

impl FatalHandler for PanicHandler {
    fn terminate(&self, message: &str) -> ! {
        panic!("fatal error: {message}")
    }
}

static FATAL_HANDLER: RwLock<Option<Arc<dyn FatalHandler>>> = RwLock::new(None);

fn write_report(prefix: &str, flags: FatalFlags, message: &str) {
    let mut stderr = std::io::stderr().lock();
    // Nothing sensible can be done if stderr itself is gone
    let _ = writeln!(stderr, "{prefix}: {message}");
    if flags.contains(FatalFlags::REPORT_BACKTRACE) {
        let _ = writeln!(stderr, "{}", Backtrace::force_capture());
    }
    let _ = stderr.flush();
}

/// Installs the process-wide fatal handler and returns the previous one.
pub fn set_fatal_handler(handler: Arc<dyn FatalHandler>) -> Arc<dyn FatalHandler> {
    let mut slot = FATAL_HANDLER
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    slot.replace(handler)
        .unwrap_or_else(|| Arc::new(AbortHandler) as Arc<dyn FatalHandler>)
}

/// Returns the process-wide fatal handler, [`AbortHandler`] unless replaced.
#[must_use]
pub fn fatal_handler() -> Arc<dyn FatalHandler> {
    let slot = FATAL_HANDLER.read().unwrap_or_else(PoisonError::into_inner);
    match slot.as_ref() {
        Some(handler) => Arc::clone(handler),
        None => Arc::new(AbortHandler),
    }
}

/// Reports `message` through `handler` and terminates.
pub fn fatal_error_with(handler: &dyn FatalHandler, flags: FatalFlags, message: &str) -> ! {
    handler.report(flags, message);
    handler.terminate(message)
}

/// Reports a formatted message through the process-wide handler and terminates.
///
/// ```rust,no_run
/// use optcore::utils::fatal::{fatal_error, FatalFlags};
///
/// let slot = 3;
/// fatal_error(FatalFlags::REPORT_BACKTRACE, format_args!("slot {slot} initialized twice"));
/// ```
pub fn fatal_error(flags: FatalFlags, args: fmt::Arguments<'_>) -> ! {
    let message = fmt::format(args);
    let handler = fatal_handler();
    fatal_error_with(handler.as_ref(), flags, &message)
}

/// Formats a message and terminates through the process-wide fatal handler.
///
/// ```rust,no_run
/// let slot = 3;
/// optcore::fatal_error!("slot {slot} initialized twice");
/// ```
#[macro_export]
macro_rules! fatal_error {
    ($($arg:tt)*) => {
        $crate::utils::fatal::fatal_error(
            $crate::utils::fatal::FatalFlags::empty(),
            format_args!($($arg)*),
        )
    };
}

/// Reports a fatal-class error through the process-wide handler without terminating.
pub fn report_error(flags: FatalFlags, message: &str) {
    fatal_handler().report(flags, message);
}

/// Reports a warning through the process-wide handler.
pub fn warning(message: &str) {
    fatal_handler().warn(FatalFlags::empty(), message);
}

#[cfg(test)]
mod tests {
    use std::{
        panic,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    struct CountingHandler {
        reports: AtomicUsize,
        warnings: AtomicUsize,
    }

    impl FatalHandler for CountingHandler {
        fn report(&self, _flags: FatalFlags, _message: &str) {
            self.reports.fetch_add(1, Ordering::SeqCst);
        }

        fn warn(&self, _flags: FatalFlags, _message: &str) {
            self.warnings.fetch_add(1, Ordering::SeqCst);
        }

        fn terminate(&self, message: &str) -> ! {
            panic!("terminated: {message}")
        }
    }

    #[test]
    fn panic_handler_carries_message() {
        let result = panic::catch_unwind(|| {
            fatal_error_with(&PanicHandler, FatalFlags::empty(), "broken invariant")
        });
        let payload = result.unwrap_err();
        let message = payload.downcast_ref::<String>().unwrap();
        assert_eq!(message, "fatal error: broken invariant");
    }

    #[test]
    fn report_runs_before_terminate() {
        let handler = CountingHandler {
            reports: AtomicUsize::new(0),
            warnings: AtomicUsize::new(0),
        };
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            fatal_error_with(&handler, FatalFlags::REPORT_BACKTRACE, "boom")
        }));
        assert!(result.is_err());
        assert_eq!(handler.reports.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn global_handler_is_replaceable() {
        let counting = Arc::new(CountingHandler {
            reports: AtomicUsize::new(0),
            warnings: AtomicUsize::new(0),
        });
        let previous = set_fatal_handler(counting.clone());

        report_error(FatalFlags::empty(), "reported");
        warning("careful");
        let result = panic::catch_unwind(|| fatal_error!("code {}", 7));

        set_fatal_handler(previous);

        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<String>().unwrap(), "terminated: code 7");
        assert_eq!(counting.reports.load(Ordering::SeqCst), 2);
        assert_eq!(counting.warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn flags() {
        let flags = FatalFlags::REPORT_BACKTRACE;
        assert!(flags.contains(FatalFlags::REPORT_BACKTRACE));
        assert!(!FatalFlags::empty().contains(FatalFlags::REPORT_BACKTRACE));
    }
}
