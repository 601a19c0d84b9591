//! URLs of the export service for one instance.

use url::Url;

const RUN_BACKUP_PATH: &str = "rest/backup/1/export/runbackup";
const PROGRESS_PATH: &str = "rest/backup/1/export/getProgress";
const DOWNLOAD_PREFIX: &str = "plugins/servlet/";

/// Endpoint builder. The instance may be a bare host (`acme.atlassian.net`,
/// HTTPS is assumed) or a full base URL (`http://127.0.0.1:8080/jira/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(instance: &str) -> Result<Self, url::ParseError> {
        let instance = instance.trim();
        let mut base = if instance.contains("://") {
            Url::parse(instance)?
        } else {
            Url::parse(&format!("https://{}", instance))?
        };
        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(url::ParseError::EmptyHost);
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);
        Ok(Self { base })
    }

    /// Value of the `origin` header (scheme, host and port).
    pub fn origin(&self) -> String {
        self.base.origin().ascii_serialization()
    }

    pub fn run_backup(&self) -> Result<Url, url::ParseError> {
        self.base.join(RUN_BACKUP_PATH)
    }

    pub fn progress(&self, task_id: &str) -> Result<Url, url::ParseError> {
        let mut url = self.base.join(PROGRESS_PATH)?;
        url.query_pairs_mut().append_pair("taskId", task_id);
        Ok(url)
    }

    /// Download URL for a result location such as `export/download/?fileId=…`.
    /// The fragment is appended verbatim below `plugins/servlet/`.
    pub fn download(&self, location: &str) -> Result<Url, url::ParseError> {
        let raw = format!(
            "{}{}{}",
            self.base,
            DOWNLOAD_PREFIX,
            location.trim().trim_start_matches('/')
        );
        Url::parse(&raw)
    }
}
