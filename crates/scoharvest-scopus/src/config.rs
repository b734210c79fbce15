//! Harvest run configuration

use std::path::PathBuf;

use scoharvest_core::Backoff;

use crate::kind::RecordKind;
use crate::query::{DEFAULT_BASE_URL, MAX_PAGE_SIZE};

/// Runtime configuration for one harvest run
#[derive(Debug, Clone)]
pub struct Config {
    pub kind: RecordKind,
    /// Identifier list, one per line
    pub input: PathBuf,
    /// Directory for CSV files, id lists and `logs/`
    pub output_dir: PathBuf,
    pub api_key: String,
    /// Search API base URL; the kind's endpoint is appended
    pub base_url: String,
    /// Identifiers per request (1..=25)
    pub page_size: usize,
    /// Scan attempts before a tag mismatch fails the batch
    pub extraction_attempts: u32,
    pub backoff: Backoff,
    /// Re-run failed identifiers in a second pass
    pub second_pass: bool,
    /// Replay batches that failed in the second pass once more
    pub replay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kind: RecordKind::Authors,
            input: PathBuf::from("ids.txt"),
            output_dir: PathBuf::from("output"),
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: MAX_PAGE_SIZE,
            extraction_attempts: 5,
            backoff: Backoff::default(),
            second_pass: true,
            replay: true,
        }
    }
}

impl Config {
    /// Reject settings the API cannot serve.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.trim().is_empty() {
            anyhow::bail!("No API key: set scopus.api_key in the config file, SCOPUS_API_KEY, or --api-key");
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            anyhow::bail!(
                "page size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            );
        }
        Ok(())
    }

    pub fn log_dir(&self) -> PathBuf {
        self.output_dir.join("logs")
    }
}
