//! Fetch error taxonomy for batch harvesting

/// Error from a single API request.
///
/// Either the server answered with a non-success status, or the request never
/// produced a response (DNS, TLS, connection reset, timeout, body decode).
#[derive(Debug)]
pub enum FetchError {
    /// Server answered with a non-2xx status
    Http { status: u16, message: String },
    /// No usable response
    Network { message: String },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http { status, message } => write!(f, "HTTP {status}: {message}"),
            Self::Network { message } => write!(f, "network error: {message}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Build from a reqwest error, keeping the status when there is one.
    ///
    /// The message is taken without the URL so API keys in query strings
    /// never reach the logs.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        let status = e.status();
        let message = e.without_url().to_string();
        match status {
            Some(status) => Self::Http {
                status: status.as_u16(),
                message,
            },
            None => Self::Network { message },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network { .. } => None,
        }
    }

    pub fn class(&self) -> FailureClass {
        match self.status() {
            Some(404) => FailureClass::NotFound,
            // Scopus reports an exhausted service level as 400; 429 is the
            // standard throttling answer.
            Some(400 | 429) => FailureClass::QuotaExceeded,
            Some(500..=599) => FailureClass::ServerError,
            Some(_) => FailureClass::OtherHttp,
            None => FailureClass::NonHttp,
        }
    }
}

/// Failure category of a batch request.
///
/// Each class has its own log file and its own pause before the harvester
/// moves on to the next batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// 404: invalid identifier or malformed query
    NotFound,
    /// 400/429: request quota for the API key exhausted
    QuotaExceeded,
    /// 5xx: failure inside the upstream service
    ServerError,
    /// Any other HTTP status
    OtherHttp,
    /// Transport error without a status
    NonHttp,
}

impl FailureClass {
    pub const ALL: [FailureClass; 5] = [
        Self::NotFound,
        Self::QuotaExceeded,
        Self::ServerError,
        Self::OtherHttp,
        Self::NonHttp,
    ];

    /// Short human-readable description used in logs.
    pub fn describe(self) -> &'static str {
        match self {
            Self::NotFound => "invalid identifier or query",
            Self::QuotaExceeded => "request quota exceeded for the service level",
            Self::ServerError => "failure within the upstream service",
            Self::OtherHttp => "HTTP error of unknown cause",
            Self::NonHttp => "non-HTTP error of unknown cause",
        }
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotFound => "not-found",
            Self::QuotaExceeded => "quota-exceeded",
            Self::ServerError => "server-error",
            Self::OtherHttp => "other-http",
            Self::NonHttp => "non-http",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_err(status: u16) -> FetchError {
        FetchError::Http {
            status,
            message: "test".to_string(),
        }
    }

    #[test]
    fn classify_404_not_found() {
        assert_eq!(http_err(404).class(), FailureClass::NotFound);
    }

    #[test]
    fn classify_400_quota() {
        assert_eq!(http_err(400).class(), FailureClass::QuotaExceeded);
    }

    #[test]
    fn classify_429_quota() {
        assert_eq!(http_err(429).class(), FailureClass::QuotaExceeded);
    }

    #[test]
    fn classify_5xx_server() {
        assert_eq!(http_err(500).class(), FailureClass::ServerError);
        assert_eq!(http_err(503).class(), FailureClass::ServerError);
    }

    #[test]
    fn classify_other_http() {
        assert_eq!(http_err(401).class(), FailureClass::OtherHttp);
        assert_eq!(http_err(403).class(), FailureClass::OtherHttp);
    }

    #[test]
    fn classify_network() {
        let err = FetchError::Network {
            message: "connection refused".to_string(),
        };
        assert_eq!(err.class(), FailureClass::NonHttp);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn display_http() {
        assert_eq!(format!("{}", http_err(404)), "HTTP 404: test");
    }

    #[test]
    fn display_network() {
        let err = FetchError::Network {
            message: "timeout".to_string(),
        };
        assert_eq!(format!("{err}"), "network error: timeout");
    }

    #[test]
    fn class_display_names_distinct() {
        let mut names: Vec<String> = FailureClass::ALL.iter().map(|c| c.to_string()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), FailureClass::ALL.len());
    }
}
