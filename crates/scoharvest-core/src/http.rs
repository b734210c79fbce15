//! Blocking HTTP fetch over a shared async runtime.
//!
//! Uses async reqwest internally with tokio::time::timeout as a hard deadline,
//! but presents a sync interface: the harvester issues one request at a time.

use std::sync::LazyLock;
use std::time::Duration;

use crate::error::FetchError;

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Anything that can turn a request URL into a response body.
///
/// The batch loop is written against this trait so tests can script
/// responses without a network.
pub trait Fetch {
    fn fetch(&mut self, url: &str) -> Result<String, FetchError>;
}

/// Client settings
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Deadline for a whole request (connect + headers + body)
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Optional proxy for all schemes (e.g. `http://proxy.example:8080`)
    pub proxy: Option<String>,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` when no explicit proxy is set
    pub system_proxy: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
            proxy: None,
            system_proxy: true,
        }
    }
}

/// Sync HTTP client returning response bodies as text.
pub struct HttpClient {
    client: reqwest::Client,
    request_timeout: Duration,
    requests: u64,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .pool_max_idle_per_host(2);
        if let Some(proxy) = &settings.proxy {
            let proxy = reqwest::Proxy::all(proxy).map_err(FetchError::from_reqwest)?;
            builder = builder.proxy(proxy);
        } else if !settings.system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(FetchError::from_reqwest)?;
        Ok(Self {
            client,
            request_timeout: settings.request_timeout,
            requests: 0,
        })
    }

    /// Number of requests sent so far (each one counts against the API key quota).
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// HTTP GET → status check → body text
    pub fn get_text(&mut self, url: &str) -> Result<String, FetchError> {
        self.requests += 1;
        let client = &self.client;
        let timeout = self.request_timeout;
        SHARED_RUNTIME.handle().block_on(async {
            let request = async {
                let response = client
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(FetchError::from_reqwest)?;
                response.text().await.map_err(FetchError::from_reqwest)
            };

            match tokio::time::timeout(timeout, request).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Network {
                    message: format!("request timed out after {}s", timeout.as_secs()),
                }),
            }
        })
    }
}

impl Fetch for HttpClient {
    fn fetch(&mut self, url: &str) -> Result<String, FetchError> {
        self.get_text(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = HttpSettings::default();
        assert_eq!(settings.request_timeout, Duration::from_secs(60));
        assert_eq!(settings.connect_timeout, Duration::from_secs(30));
        assert!(settings.proxy.is_none());
        assert!(settings.system_proxy);
    }

    #[test]
    fn client_with_proxy_builds() {
        let settings = HttpSettings {
            proxy: Some("http://127.0.0.1:3128".to_string()),
            ..Default::default()
        };
        let client = HttpClient::new(&settings).unwrap();
        assert_eq!(client.requests(), 0);
    }
}
