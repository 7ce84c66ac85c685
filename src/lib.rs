// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
// - 'file/physical.rs' uses mmap to map a file into memory
// - 'utils/synchronization.rs' stores the lazily built value in an `UnsafeCell`

//! # optcore
//!
//! Core building blocks of an optimizing compiler back end: a worklist-driven rewrite engine,
//! a once-only initialization primitive for lazily built global state, and an endian-safe
//! binary reader for serialized modules.
//!
//! ## Features
//!
//! - **Fixpoint rewriting** - Deduplicating worklist, rule driver and parallel unit scheduler
//! - **Once-only initialization** - Exactly-once initializers with a pluggable fatal-error path
//! - **Endian-safe decoding** - Bounds-checked reads in either byte order, from memory or mmap
//! - **Change tracking** - Every rewrite and, on request, every worklist operation is logged
//!
//! ## Quick Start
//!
//! ```rust
//! use optcore::prelude::*;
//!
//! struct Negate;
//!
//! impl RewriteRule<i32> for Negate {
//!     fn name(&self) -> &'static str {
//!         "negate"
//!     }
//!
//!     fn rewrite(&mut self, handle: Handle, ctx: &mut RewriteContext<'_, i32>) -> Result<RewriteAction> {
//!         match ctx.get(handle).copied() {
//!             Some(v) if v < 0 => {
//!                 let positive = ctx.insert(-v);
//!                 Ok(RewriteAction::Replaced(vec![positive]))
//!             }
//!             _ => Ok(RewriteAction::Unchanged),
//!         }
//!     }
//! }
//!
//! // Decode the elements from a serialized little-endian buffer
//! let file = File::from_mem(vec![0xFE, 0xFF, 0xFF, 0xFF, 0x03, 0x00, 0x00, 0x00], ByteOrder::Little)?;
//! let mut reader = file.reader();
//! let mut arena = Arena::new();
//! while reader.has_more_data() {
//!     arena.insert(reader.read_next::<i32>()?);
//! }
//!
//! let seeds = arena.handles();
//! let driver = RewriteDriver::new(RewriteConfig::default());
//! let stats = driver.run(&mut arena, seeds, &mut Negate)?;
//!
//! assert_eq!(stats.replaced, 1);
//! assert!(arena.iter().all(|(_, v)| *v > 0));
//! # Ok::<(), optcore::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`compiler`] - Worklist, rewrite driver, unit scheduler, event log
//! - [`utils`] - Once-guard, lazily built globals, fatal-error reporting
//! - [`file`] - Serialized module input, byte-order handling, decoding cursor
//!
//! ## Error Handling
//!
//! Recoverable failures are returned as [`Error`]. Failures that leave the process in a state
//! where continuing would produce wrong output, such as a global whose initializer panicked, go
//! through [`utils::fatal`] instead and terminate.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use optcore::prelude::*;
///
/// let mut worklist = Worklist::new("example");
/// worklist.add(1);
/// assert_eq!(worklist.pop(), Some(1));
/// ```
pub mod prelude;

/// Worklist-driven rewriting to a fixpoint.
///
/// # Key Types
///
/// - [`compiler::Worklist`] - Deduplicating FIFO of pending elements
/// - [`compiler::RewriteDriver`] - Applies a [`compiler::RewriteRule`] until nothing is pending
/// - [`compiler::UnitScheduler`] - Rewrites independent units in parallel
/// - [`compiler::Arena`] - Generation-checked element storage
/// - [`compiler::EventLog`] - Record of everything a rewrite did
pub mod compiler;

/// Serialized module input and endian-safe decoding.
///
/// # Key Types
///
/// - [`file::File`] - Loaded module bytes with their declared byte order
/// - [`file::reader::Reader`] - Bounds-checked decoding cursor
/// - [`file::io::ByteOrder`] - Little or big endian
pub mod file;

/// Once-only initialization and fatal-error reporting.
///
/// # Key Types
///
/// - [`utils::OnceGuard`] - Exactly-once initializer gate
/// - [`utils::LazyGlobal`] - Value built on first access
/// - [`utils::fatal::FatalHandler`] - Replaceable fatal-error strategy
pub mod utils;

/// `optcore` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `optcore` Error type
///
/// The main error type for all operations in this crate.
///
/// # Example
///
/// ```rust
/// use optcore::{Error, Reader};
///
/// let mut reader = Reader::new(&[0x01]);
/// match reader.read_next::<u16>() {
///     Err(Error::TruncatedInput { needed, available }) => println!("need {needed}, have {available}"),
///     Err(e) => println!("Error: {e}"),
///     Ok(v) => println!("value {v}"),
/// }
/// ```
pub use error::Error;

/// Low-level decoding utilities.
///
/// # Example
///
/// ```rust
/// use optcore::{ByteOrder, Reader};
///
/// let mut reader = Reader::with_order(&[0x12, 0x34], ByteOrder::Big);
/// assert_eq!(reader.read_next::<u16>()?, 0x1234);
/// # Ok::<(), optcore::Error>(())
/// ```
pub use file::{io::ByteOrder, reader::Reader, Backend, File};

/// Once-only initialization.
pub use utils::{run_once, LazyGlobal, OnceGuard, OnceState};

/// Fixpoint rewriting.
pub use compiler::{
    Arena, Handle, RewriteAction, RewriteConfig, RewriteDriver, RewriteRule, UnitScheduler,
    Worklist,
};
