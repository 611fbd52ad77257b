//! Size-bounded, ownership-scoped byte storage for fetched and transcoded media.
//!
//! A [`ByteStore`] starts in memory and spills into a named temporary file once
//! it grows past the spill threshold, or when a caller needs a real path (the
//! video engine works on files). Writes are only accepted before the first
//! [`ByteStore::rewind`]; reads are only accepted after it. Dropping the store
//! releases its memory and deletes any backing file.

use std::{
    fmt,
    io::{self, Cursor, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use {tempfile::NamedTempFile, tracing::debug, webp2u_config::MediaConfig};

use crate::{Error, Result};

/// Ceiling and spill point shared by every store of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    pub max_bytes: u64,
    pub spill_threshold: usize,
}

impl StoreLimits {
    #[must_use]
    pub fn from_config(config: &MediaConfig) -> Self {
        Self {
            max_bytes: config.max_bytes,
            spill_threshold: config.spill_threshold_bytes,
        }
    }
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self::from_config(&MediaConfig::default())
    }
}

enum Backing {
    Memory(Cursor<Vec<u8>>),
    Disk(NamedTempFile),
}

pub struct ByteStore {
    backing: Backing,
    len: u64,
    limits: StoreLimits,
    sealed: bool,
    suffix: &'static str,
}

impl fmt::Debug for ByteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStore")
            .field("len", &self.len)
            .field("sealed", &self.sealed)
            .field("path", &self.path())
            .finish_non_exhaustive()
    }
}

impl ByteStore {
    /// Empty in-memory store.
    #[must_use]
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            backing: Backing::Memory(Cursor::new(Vec::new())),
            len: 0,
            limits,
            sealed: false,
            suffix: ".bin",
        }
    }

    /// File suffix used if the store ever moves to disk.
    #[must_use]
    pub fn with_suffix(mut self, suffix: &'static str) -> Self {
        self.suffix = suffix;
        self
    }

    /// Change the suffix for a later move to disk. No effect once on disk.
    pub fn set_suffix(&mut self, suffix: &'static str) {
        self.suffix = suffix;
    }

    #[must_use]
    pub fn max_bytes(&self) -> u64 {
        self.limits.max_bytes
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Path of the backing file, if the store lives on disk.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::Memory(_) => None,
            Backing::Disk(file) => Some(file.path()),
        }
    }

    /// Append a chunk, spilling to disk past the threshold.
    ///
    /// Fails with [`Error::TooLarge`] once the ceiling would be exceeded and
    /// with [`Error::StoreSealed`] after [`ByteStore::rewind`].
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        if self.sealed {
            return Err(Error::StoreSealed);
        }
        let new_len = self.len + chunk.len() as u64;
        if new_len > self.limits.max_bytes {
            return Err(Error::TooLarge {
                limit: self.limits.max_bytes,
            });
        }
        if matches!(self.backing, Backing::Memory(_))
            && new_len > self.limits.spill_threshold as u64
        {
            self.spill()?;
        }
        match &mut self.backing {
            Backing::Memory(cursor) => cursor.write_all(chunk)?,
            Backing::Disk(file) => file.write_all(chunk)?,
        }
        self.len = new_len;
        Ok(())
    }

    /// Seal the store for reading and move the cursor to the start.
    pub fn rewind(&mut self) -> Result<()> {
        self.sealed = true;
        match &mut self.backing {
            Backing::Memory(cursor) => cursor.set_position(0),
            Backing::Disk(file) => {
                file.flush()?;
                file.seek(SeekFrom::Start(0))?;
            },
        }
        Ok(())
    }

    /// Make sure the content lives in a file and return its path.
    pub fn persist_to_disk(&mut self) -> Result<PathBuf> {
        self.spill()?;
        if self.sealed {
            self.rewind()?;
        }
        self.path()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::from(io::Error::other("byte store has no backing file")))
    }

    /// Pick up content that an external process wrote to [`ByteStore::path`],
    /// enforce the ceiling on it, and seal the store for reading.
    pub fn adopt_external_write(&mut self) -> Result<()> {
        let Backing::Disk(file) = &mut self.backing else {
            return Err(io::Error::other("external writes need a disk-backed store").into());
        };
        let len = file.as_file().metadata()?.len();
        if len > self.limits.max_bytes {
            return Err(Error::TooLarge {
                limit: self.limits.max_bytes,
            });
        }
        self.len = len;
        self.rewind()
    }

    /// Read the whole content. The store must have been rewound.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        if !self.sealed {
            return Err(Error::StoreNotRewound);
        }
        let capacity = usize::try_from(self.len).unwrap_or_default();
        let mut bytes = Vec::with_capacity(capacity);
        self.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn spill(&mut self) -> Result<()> {
        let Backing::Memory(cursor) = &self.backing else {
            return Ok(());
        };
        let mut file = tempfile::Builder::new()
            .prefix("webp2u-")
            .suffix(self.suffix)
            .tempfile()?;
        file.write_all(cursor.get_ref())?;
        debug!(bytes = self.len, path = %file.path().display(), "byte store moved to disk");
        self.backing = Backing::Disk(file);
        Ok(())
    }

    fn ensure_readable(&self) -> io::Result<()> {
        if self.sealed {
            Ok(())
        } else {
            Err(io::Error::other(Error::StoreNotRewound))
        }
    }
}

impl Read for ByteStore {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.ensure_readable()?;
        match &mut self.backing {
            Backing::Memory(cursor) => cursor.read(buf),
            Backing::Disk(file) => file.read(buf),
        }
    }
}

impl Seek for ByteStore {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.ensure_readable()?;
        match &mut self.backing {
            Backing::Memory(cursor) => cursor.seek(pos),
            Backing::Disk(file) => file.seek(pos),
        }
    }
}

impl Write for ByteStore {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_chunk(buf).map_err(|e| match e {
            Error::Io(io) => io,
            other => io::Error::other(other),
        })?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.backing {
            Backing::Memory(_) => Ok(()),
            Backing::Disk(file) => file.flush(),
        }
    }
}
