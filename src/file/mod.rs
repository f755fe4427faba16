//! File abstraction for loading class bytes from disk or memory.
//!
//! The core engine consumes plain byte buffers; this module is the supplied
//! collaborator for callers that start from a path. Physical files are
//! memory-mapped so large classes are not copied twice, while in-memory
//! buffers are owned directly.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use classpatch::File;
//!
//! let file = File::from_file("Hello.class".as_ref())?;
//! let bytes = file.data().to_vec();
//! # Ok::<(), classpatch::Error>(())
//! ```

pub(crate) mod io;
pub(crate) mod parser;

use std::path::Path;

use memmap2::Mmap;

use crate::Result;

/// A loaded class file, backed either by a memory map or an owned buffer.
///
/// Use [`File::from_file`] for on-disk classes and [`File::from_mem`] for
/// bytes that arrived some other way (network payload, embedded resource).
/// Either way, [`File::data`] exposes the raw bytes for parsing.
pub enum File {
    /// Memory-mapped view of an on-disk file
    Physical(Mmap),
    /// Owned in-memory buffer
    Memory(Vec<u8>),
}

impl File {
    /// Memory-map a class file from disk.
    ///
    /// # Arguments
    /// * `path` - Path of the file to load
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;

        // Safety: the mapping is read-only and the file handle lives only for
        // the duration of the map call; mutation of the underlying file by
        // another process is outside this library's control, as with any mmap.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(File::Physical(mmap))
    }

    /// Wrap an in-memory byte buffer.
    #[must_use]
    pub fn from_mem(data: Vec<u8>) -> Self {
        File::Memory(data)
    }

    /// The raw bytes of the file.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        match self {
            File::Physical(mmap) => mmap,
            File::Memory(data) => data,
        }
    }

    /// Returns the length of the file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the file holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }
}
