//! Serialized module input and safe binary decoding.
//!
//! This module supplies the bytes a deserializer works on and the primitives it decodes them
//! with. It abstracts over where the bytes live (an owned buffer or a memory-mapped file) and
//! pairs them with the byte order the module was written in, so that every decoder sees the same
//! values regardless of the host's native order.
//!
//! # Key Components
//!
//! ## Core Types
//! - [`crate::file::File`] - A loaded serialized module plus its declared byte order
//! - [`crate::file::Backend`] - Trait for different data sources
//!
//! ## Decoding Infrastructure
//! - [`crate::file::reader::Reader`] - Forward-only decoding cursor
//! - [`crate::file::io`] - Endian-aware primitive reads and writes
//!
//! ## Backend Implementations
//! - `Physical` - Memory-mapped file backend
//! - `Memory` - Owned in-memory buffer backend
//!
//! # Examples
//!
//! ```rust
//! use optcore::{ByteOrder, File};
//!
//! let file = File::from_mem(vec![0x00, 0x00, 0x00, 0x2A, 0x07], ByteOrder::Big)?;
//! let mut reader = file.reader();
//! assert_eq!(reader.read_next::<u32>()?, 42);
//!
//! let mut tail = file.reader_at(4)?;
//! assert_eq!(tail.read_next::<u8>()?, 7);
//! # Ok::<(), optcore::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! [`File`] is `Send + Sync` and can be shared between threads; each thread creates its own
//! [`crate::file::reader::Reader`].

pub mod io;
pub mod reader;

mod physical;

use std::path::Path;

use crate::{Error, Result};
use io::ByteOrder;
use physical::Physical;
use reader::Reader;

/// Backend trait for file data sources.
///
/// All implementations must be thread-safe.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidOffset`] if `offset + len` overflows, or
    /// [`crate::Error::TruncatedInput`] if the range extends past the end of the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// Returns `data[offset..offset + len]`, failing instead of panicking when the range is not
/// inside `data`.
fn bounded_slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let end = offset.checked_add(len).ok_or(Error::InvalidOffset)?;
    data.get(offset..end).ok_or(Error::TruncatedInput {
        needed: len,
        available: data.len().saturating_sub(offset),
    })
}

/// Module bytes owned in memory, as handed to [`File::from_mem`].
#[derive(Debug)]
struct Memory(Vec<u8>);

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        bounded_slice(&self.0, offset, len)
    }

    fn data(&self) -> &[u8] {
        &self.0
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

/// A loaded serialized module.
///
/// Holds the module bytes and the byte order declared by whoever produced them. Decoding is
/// done through [`File::reader`] and [`File::reader_at`].
pub struct File {
    data: Box<dyn Backend>,
    order: ByteOrder,
}

impl File {
    /// Maps a module from disk.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::FileError`] if the file cannot be opened or mapped
    /// - [`crate::Error::Empty`] if the file has no content
    pub fn from_file(path: impl AsRef<Path>, order: ByteOrder) -> Result<File> {
        let path = path.as_ref();
        if std::fs::metadata(path)?.len() == 0 {
            return Err(Error::Empty);
        }

        let input = Physical::new(path)?;
        Self::load(Box::new(input), order)
    }

    /// Wraps a module already held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Empty`] if `data` is empty.
    pub fn from_mem(data: Vec<u8>, order: ByteOrder) -> Result<File> {
        Self::load(Box::new(Memory(data)), order)
    }

    fn load(data: Box<dyn Backend>, order: ByteOrder) -> Result<File> {
        if data.len() == 0 {
            return Err(Error::Empty);
        }

        Ok(File { data, order })
    }

    /// Returns the declared byte order.
    #[must_use]
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Returns the size of the module in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`; empty modules are rejected at load time.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Returns the raw module bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Returns `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidOffset`] or [`crate::Error::TruncatedInput`] if the range
    /// is not inside the module.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, len)
    }

    /// Creates a reader over the whole module in its declared byte order.
    #[must_use]
    pub fn reader(&self) -> Reader<'_> {
        Reader::with_order(self.data.data(), self.order)
    }

    /// Creates a reader over the bytes from `offset` to the end of the module.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidOffset`] if `offset` is past the end of the module.
    pub fn reader_at(&self, offset: usize) -> Result<Reader<'_>> {
        let data = self.data.data();
        if offset > data.len() {
            return Err(Error::InvalidOffset);
        }

        Ok(Reader::with_order(&data[offset..], self.order))
    }
}
