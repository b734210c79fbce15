//! Per-category text logs for a harvest run.
//!
//! Every failure category gets its own append-only file so a human can
//! review, say, all quota errors of a run in one place. Each run starts by
//! appending a session banner to every category file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::FailureClass;

/// Which log file an entry belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogCategory {
    /// Start/end tag counts disagreed while scanning a response
    XmlMismatch,
    /// Request failed; one file per failure class
    Fetch(FailureClass),
    /// Response parsed but violated an expectation (counts, formats, lengths)
    Data,
    /// URLs of batches that failed in the given pass
    ProblemUrls { pass: u8 },
}

impl LogCategory {
    pub fn file_name(self) -> String {
        match self {
            Self::XmlMismatch => "xml_mismatch.txt".to_string(),
            Self::Fetch(FailureClass::NotFound) => "http_404_invalid_query.txt".to_string(),
            Self::Fetch(FailureClass::QuotaExceeded) => "http_400_quota_exceeded.txt".to_string(),
            Self::Fetch(FailureClass::ServerError) => "http_500_server_error.txt".to_string(),
            Self::Fetch(FailureClass::OtherHttp) => "http_other.txt".to_string(),
            Self::Fetch(FailureClass::NonHttp) => "network_error.txt".to_string(),
            Self::Data => "data_error.txt".to_string(),
            Self::ProblemUrls { pass } => format!("problem_urls_pass{pass}.txt"),
        }
    }

    /// Categories that receive a banner at the start of a run
    pub fn all() -> Vec<LogCategory> {
        let mut all = vec![Self::XmlMismatch];
        all.extend(FailureClass::ALL.into_iter().map(Self::Fetch));
        all.push(Self::Data);
        all.push(Self::ProblemUrls { pass: 1 });
        all.push(Self::ProblemUrls { pass: 2 });
        all
    }
}

/// Handle to the log directory of one run
#[derive(Debug, Clone)]
pub struct RunLog {
    dir: PathBuf,
}

impl RunLog {
    /// Create the directory and append a session banner to every category file.
    pub fn open(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let log = Self {
            dir: dir.to_path_buf(),
        };
        let banner = format!(
            "\n======== NEW RECORDS: {} ========\n",
            chrono::Local::now().format("%Y%m%d_%H:%M:%S")
        );
        for category in LogCategory::all() {
            append(&log.dir.join(category.file_name()), &banner)?;
        }
        Ok(log)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append a timestamped entry. Write failures are logged, never fatal.
    pub fn record(&self, category: LogCategory, entry: impl AsRef<str>) {
        let line = format!(
            "{} - {}",
            chrono::Local::now().format("%H:%M:%S"),
            entry.as_ref()
        );
        self.append_raw(&category.file_name(), &line);
    }

    /// Append a line as-is to an arbitrary file in the log directory.
    pub fn append_raw(&self, file_name: &str, line: &str) {
        let path = self.dir.join(file_name);
        if let Err(e) = append(&path, line) {
            log::warn!("Cannot write {}: {e}", path.display());
        }
    }
}

fn append(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}
