//! Archive file lifecycle.
//!
//! The download streams into `<archive>.part` next to the final path. Only a
//! fully written, synced temp file is renamed over the final name, so a failed
//! or rejected download never leaves a half-written archive under that name
//! and never disturbs a previous archive.

mod writer;

pub use writer::{ArchiveWriter, SavedArchive};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `backup.zip` → `backup.zip.part`).
pub fn temp_path(final_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    std::path::PathBuf::from(o)
}
