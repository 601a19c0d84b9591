//! Sequential writer for the temp archive file.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const BUF_SIZE: usize = 64 * 1024;

/// The archive as it ended up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArchive {
    pub path: PathBuf,
    pub bytes: u64,
    /// SHA-256 of the archive, lowercase hex.
    pub sha256: String,
}

/// `Write` sink for one download. Bytes go to the `.part` file; `commit`
/// publishes it under the final name. Dropping without commit deletes the
/// temp file.
pub struct ArchiveWriter {
    file: Option<BufWriter<File>>,
    temp_path: PathBuf,
    final_path: PathBuf,
    hasher: Sha256,
    written: u64,
}

impl ArchiveWriter {
    /// Create (or truncate) the temp file for `final_path`.
    pub fn create(final_path: &Path) -> io::Result<Self> {
        let temp_path = super::temp_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        Ok(Self {
            file: Some(BufWriter::with_capacity(BUF_SIZE, file)),
            temp_path,
            final_path: final_path.to_path_buf(),
            hasher: Sha256::new(),
            written: 0,
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Flush, fsync, close, and rename the temp file over the final path.
    /// Any existing file at the final path is replaced.
    pub fn commit(mut self) -> io::Result<SavedArchive> {
        let Some(buffered) = self.file.take() else {
            return Err(io::Error::new(io::ErrorKind::Other, "archive writer already closed"));
        };
        let published = buffered
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all())
            .and_then(|()| std::fs::rename(&self.temp_path, &self.final_path));
        if let Err(e) = published {
            let _ = std::fs::remove_file(&self.temp_path);
            return Err(e);
        }
        let sha256 = hex::encode(std::mem::take(&mut self.hasher).finalize());
        Ok(SavedArchive {
            path: self.final_path.clone(),
            bytes: self.written,
            sha256,
        })
    }
}

impl Write for ArchiveWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "archive writer closed"))?;
        let n = file.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for ArchiveWriter {
    fn drop(&mut self) {
        // `file` is only `None` after a successful rename.
        if let Some(file) = self.file.take() {
            drop(file);
            if let Err(e) = std::fs::remove_file(&self.temp_path) {
                tracing::debug!(
                    "could not remove temp archive {}: {}",
                    self.temp_path.display(),
                    e
                );
            }
        }
    }
}
