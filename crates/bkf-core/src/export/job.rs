use std::path::PathBuf;

/// The remote export job as seen by one run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    task_id: String,
    progress: Option<u8>,
    result_location: Option<String>,
    polls: u32,
}

impl ExportJob {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            progress: None,
            result_location: None,
            polls: 0,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Last observed progress. Not assumed monotonic.
    pub fn progress(&self) -> Option<u8> {
        self.progress
    }

    /// Only ever `Some` once progress has been observed at 100.
    pub fn result_location(&self) -> Option<&str> {
        self.result_location.as_deref()
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub(crate) fn count_poll(&mut self) {
        self.polls += 1;
    }

    /// Record an unfinished progress value (< 100).
    pub(crate) fn observe(&mut self, progress: u8) {
        debug_assert!(progress < 100);
        self.progress = Some(progress);
        self.result_location = None;
    }

    /// Record completion together with the location reported in the same response.
    pub(crate) fn finish(&mut self, location: String) {
        self.progress = Some(100);
        self.result_location = Some(location);
    }
}

/// Where the archive ends up: `<dir>/<archive_file_name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    dir: PathBuf,
    archive_file_name: String,
}

impl DownloadTarget {
    /// `archive_file_name` must be a plain file name, not a path.
    pub fn new(
        dir: impl Into<PathBuf>,
        archive_file_name: impl Into<String>,
    ) -> Result<Self, super::SetupError> {
        let archive_file_name = archive_file_name.into();
        let plain = !archive_file_name.is_empty()
            && archive_file_name != "."
            && archive_file_name != ".."
            && !archive_file_name.contains(['/', '\\']);
        if !plain {
            return Err(super::SetupError::BadArchiveName(archive_file_name));
        }
        Ok(Self {
            dir: dir.into(),
            archive_file_name,
        })
    }

    pub fn final_path(&self) -> PathBuf {
        self.dir.join(&self.archive_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_only_with_full_progress() {
        let mut job = ExportJob::new("10023");
        assert_eq!(job.progress(), None);
        job.observe(40);
        assert_eq!(job.progress(), Some(40));
        assert!(job.result_location().is_none());
        job.finish("export/download/?fileId=abc".into());
        assert_eq!(job.progress(), Some(100));
        assert_eq!(job.result_location(), Some("export/download/?fileId=abc"));
    }

    #[test]
    fn progress_may_go_backwards() {
        let mut job = ExportJob::new("1");
        job.observe(60);
        job.observe(20);
        assert_eq!(job.progress(), Some(20));
    }

    #[test]
    fn target_joins_dir_and_name() {
        let t = DownloadTarget::new("/var/backups", "backup.zip").unwrap();
        assert_eq!(t.final_path(), PathBuf::from("/var/backups/backup.zip"));
    }

    #[test]
    fn target_rejects_paths_as_names() {
        for bad in ["", ".", "..", "a/b.zip", "..\\x.zip"] {
            assert!(DownloadTarget::new(".", bad).is_err(), "{bad:?} accepted");
        }
    }
}
