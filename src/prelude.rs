//! # optcore Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits of the
//! library. Import it to get the rewrite engine, the once-guard and the binary reader in one go.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all optcore operations
pub use crate::Error;

/// The result type used throughout optcore
pub use crate::Result;

// ================================================================================================
// Rewriting
// ================================================================================================

/// Element storage and handles
pub use crate::compiler::{Arena, Handle};

/// Worklist and its trace hook
pub use crate::compiler::{NoopTracer, Worklist, WorklistOp, WorklistTracer};

/// Rules, the driver and its configuration
pub use crate::compiler::{
    RewriteAction, RewriteConfig, RewriteContext, RewriteDriver, RewriteRule, RewriteStats,
};

/// Parallel execution over compilation units
pub use crate::compiler::UnitScheduler;

/// Change tracking
pub use crate::compiler::{Event, EventKind, EventLog};

// ================================================================================================
// Initialization
// ================================================================================================

/// Once-only initialization
pub use crate::utils::{run_once, LazyGlobal, OnceGuard, OnceState};

/// Fatal-error strategy
pub use crate::utils::{FatalFlags, FatalHandler};

// ================================================================================================
// Decoding
// ================================================================================================

/// Serialized module input
pub use crate::file::File;

/// Byte order and the decoding cursor
pub use crate::file::{
    io::{ByteIO, ByteOrder},
    reader::Reader,
};
