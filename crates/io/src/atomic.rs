//! Write-then-rename output files.
//!
//! Data goes to a temporary file next to the destination and only replaces
//! it on `commit()`. Dropping an uncommitted `AtomicFile` deletes the
//! temporary, so a failed run never leaves a truncated output behind.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::IoError;

pub struct AtomicFile {
    writer: BufWriter<NamedTempFile>,
    final_path: PathBuf,
}

impl AtomicFile {
    /// Create the temporary in `final_path`'s directory (same filesystem, so
    /// the final rename is atomic).
    pub fn create(final_path: impl AsRef<Path>) -> Result<Self, IoError> {
        let final_path = final_path.as_ref().to_path_buf();
        let parent = match final_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = NamedTempFile::new_in(&parent).map_err(|e| IoError::from_io(&parent, e))?;
        Ok(Self {
            writer: BufWriter::new(temp),
            final_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.final_path
    }

    /// Flush and move the temporary over the destination.
    pub fn commit(self) -> Result<PathBuf, IoError> {
        let final_path = self.final_path;
        let temp = self
            .writer
            .into_inner()
            .map_err(|e| IoError::from_io(&final_path, e.into_error()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| IoError::from_io(&final_path, e))?;
        temp.persist(&final_path)
            .map_err(|e| IoError::from_io(&final_path, e.error))?;
        Ok(final_path)
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Write a complete buffer atomically.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<PathBuf, IoError> {
    let mut file = AtomicFile::create(path)?;
    file.write_all(bytes).map_err(|e| IoError::from_io(path, e))?;
    file.commit()
}
