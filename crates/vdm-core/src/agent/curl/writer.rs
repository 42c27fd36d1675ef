//! Offset writer for `.part` files.

use std::fs::File;
use std::io;
use std::path::Path;
#[cfg(unix)]
use std::os::unix::fs::FileExt;

/// Writer for a temp download file.
pub struct PartWriter {
    file: File,
}

impl PartWriter {
    /// Create a new temp file, truncating any previous content.
    pub fn create(temp_path: &Path) -> io::Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)?;
        Ok(Self { file })
    }

    /// Open an existing temp file for resume (no truncation). Returns the writer and
    /// the number of bytes already present.
    pub fn open_existing(temp_path: &Path) -> io::Result<(Self, u64)> {
        let file = File::options().read(true).write(true).open(temp_path)?;
        let len = file.metadata()?.len();
        Ok((Self { file }, len))
    }

    /// Write `data` at `offset`.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.write_all_at(data, offset)
    }

    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = self.file.try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)
    }

    /// Drop all content (server ignored our Range request).
    pub fn truncate(&self) -> io::Result<()> {
        self.file.set_len(0)
    }

    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }
}
