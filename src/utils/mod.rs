//! Process-level utilities: fatal-error reporting and once-initialization.

pub mod fatal;
pub mod synchronization;

pub use fatal::{FatalFlags, FatalHandler};
pub use synchronization::{run_once, LazyGlobal, OnceGuard, OnceState};
