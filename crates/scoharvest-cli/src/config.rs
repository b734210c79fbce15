//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use scoharvest_core::{Backoff, HttpSettings};
use serde::Deserialize;

/// Global configuration for scoharvest
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scopus: ScopusConfig,
    pub output: OutputConfig,
    pub http: HttpConfig,
    pub backoff: BackoffConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScopusConfig {
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub api_key: Option<String>,
    pub page_size: usize,
}

impl Default for ScopusConfig {
    fn default() -> Self {
        Self {
            base_url: scoharvest_scopus::query::DEFAULT_BASE_URL.to_string(),
            api_key: std::env::var("SCOPUS_API_KEY").ok(),
            page_size: scoharvest_scopus::query::MAX_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_dir: PathBuf::from("./harvest"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request deadline in seconds
    pub request_timeout: u64,
    pub connect_timeout: u64,
    pub proxy: Option<String>,
    /// Tag scan attempts before a mismatch fails the batch
    pub extraction_attempts: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: 60,
            connect_timeout: 30,
            proxy: None,
            extraction_attempts: 5,
        }
    }
}

impl HttpConfig {
    pub fn settings(&self) -> HttpSettings {
        HttpSettings {
            request_timeout: Duration::from_secs(self.request_timeout),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            proxy: self.proxy.clone(),
            ..Default::default()
        }
    }
}

/// Pause in seconds after each failure class
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub not_found: u64,
    pub quota_exceeded: u64,
    pub server_error: u64,
    pub other_http: u64,
    pub non_http: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        let b = Backoff::default();
        Self {
            not_found: b.not_found.as_secs(),
            quota_exceeded: b.quota_exceeded.as_secs(),
            server_error: b.server_error.as_secs(),
            other_http: b.other_http.as_secs(),
            non_http: b.non_http.as_secs(),
        }
    }
}

impl BackoffConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff {
            not_found: Duration::from_secs(self.not_found),
            quota_exceeded: Duration::from_secs(self.quota_exceeded),
            server_error: Duration::from_secs(self.server_error),
            other_http: Duration::from_secs(self.other_http),
            non_http: Duration::from_secs(self.non_http),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

/// Environment variable naming a config file, checked before the search path
pub const CONFIG_ENV: &str = "SCOHARVEST_CONFIG";

impl Config {
    /// Files tried in order when neither `--config` nor `SCOHARVEST_CONFIG`
    /// is given: `./scoharvest.toml`, then `config.toml` in the platform
    /// config directory.
    fn search_path() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("scoharvest.toml")];
        if let Some(dirs) = directories::ProjectDirs::from("", "", "scoharvest") {
            paths.push(dirs.config_dir().join("config.toml"));
        }
        paths
    }

    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path))
                .with_context(|| format!("{CONFIG_ENV} names an unusable config file"));
        }
        Self::load_first(&Self::search_path())
    }

    /// First existing file of `candidates`, or built-in defaults.
    fn load_first(candidates: &[PathBuf]) -> Result<Self> {
        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => Self::from_file(path),
            None => {
                log::debug!(
                    "no config among {} candidate paths, using built-in defaults",
                    candidates.len()
                );
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("{} is not a valid scoharvest config", path.display()))?;
        config
            .check()
            .with_context(|| format!("{} has out-of-range settings", path.display()))?;
        log::debug!("config: {}", path.display());
        Ok(config)
    }

    /// Range checks serde cannot express
    fn check(&self) -> Result<()> {
        let max = scoharvest_scopus::query::MAX_PAGE_SIZE;
        if !(1..=max).contains(&self.scopus.page_size) {
            anyhow::bail!("scopus.page_size must be 1-{max}, got {}", self.scopus.page_size);
        }
        if self.http.extraction_attempts == 0 {
            anyhow::bail!("http.extraction_attempts must be at least 1");
        }
        Ok(())
    }
}
