//! Memory-mapped backend for serialized modules on disk.
//!
//! The file is mapped read-only and shared; pages are faulted in as decoders touch them.

use memmap2::Mmap;
use std::{fs, path::Path};

use super::{bounded_slice, Backend};
use crate::Result;

/// A backend that maps a file on disk into memory.
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Maps the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path)?;
        Self::from_std_file(&file)
    }

    /// Maps an already opened file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if mapping fails.
    pub fn from_std_file(file: &fs::File) -> Result<Physical> {
        // SAFETY: the mapping is read-only. Concurrent truncation of the file by another process
        // is outside what this crate can defend against, as with any mmap-based reader.
        let data = unsafe { Mmap::map(file) }?;
        Ok(Physical { data })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        bounded_slice(&self.data, offset, len)
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, path::PathBuf};

    use super::*;
    use crate::Error;

    fn temp_module(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "optcore-physical-{}-{}.bin",
            std::process::id(),
            name
        ));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn physical() {
        let path = temp_module("basic", &[0x4F, 0x50, 0x54, 0x00, 0x2A]);
        let physical = Physical::new(&path).unwrap();

        assert_eq!(physical.len(), 5);
        assert_eq!(physical.data()[0], 0x4F);
        assert_eq!(physical.data_slice(3, 2).unwrap(), &[0x00, 0x2A]);
        assert!(physical.data_slice(4, 2).is_err());
        assert!(physical.data_slice(usize::MAX, 1).is_err());

        drop(physical);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file() {
        let result = Physical::new("/this/path/does/not/exist.bin");
        assert!(matches!(result, Err(Error::FileError(_))));
    }
}
