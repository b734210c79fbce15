//! Batch query URLs

use std::fmt;

use reqwest::Url;

use crate::kind::RecordKind;

/// Largest page the search API returns in one response
pub const MAX_PAGE_SIZE: usize = 25;

pub const DEFAULT_BASE_URL: &str = "https://api.elsevier.com/content/search/";

const API_KEY_PARAM: &str = "apiKey";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    EmptyBatch,
    BatchTooLarge { len: usize, max: usize },
    InvalidBaseUrl { url: String, reason: String },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBatch => write!(f, "cannot build a query for an empty batch"),
            Self::BatchTooLarge { len, max } => {
                write!(f, "batch of {len} identifiers exceeds the page size of {max}")
            }
            Self::InvalidBaseUrl { url, reason } => write!(f, "invalid base URL '{url}': {reason}"),
        }
    }
}

impl std::error::Error for QueryError {}

/// Build the disjunctive search URL for one batch.
///
/// ```text
/// {base}{endpoint}?query=%28+au-id%28A%29+OR+au-id%28B%29+%29[&view=COMPLETE]&httpAccept=application%2Fxml&apiKey={key}
/// ```
///
/// Identifiers and the key are form-encoded.
pub fn build_query_url(
    base_url: &str,
    kind: RecordKind,
    ids: &[String],
    page_size: usize,
    api_key: &str,
) -> Result<String, QueryError> {
    if ids.is_empty() {
        return Err(QueryError::EmptyBatch);
    }
    if ids.len() > page_size {
        return Err(QueryError::BatchTooLarge {
            len: ids.len(),
            max: page_size,
        });
    }

    let field = kind.query_field();
    let terms: Vec<String> = ids.iter().map(|id| format!("{field}({id})")).collect();
    let query = format!("( {} )", terms.join(" OR "));

    let mut params = vec![("query", query.as_str())];
    if let Some(view) = kind.view() {
        params.push(("view", view));
    }
    params.push(("httpAccept", "application/xml"));
    params.push((API_KEY_PARAM, api_key));

    let endpoint = format!("{}/{}", base_url.trim_end_matches('/'), kind.endpoint());
    Url::parse_with_params(&endpoint, &params)
        .map(String::from)
        .map_err(|e| QueryError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })
}

/// Replace the `apiKey` value so URLs can be written to logs.
///
/// Strings that do not parse as URLs or carry no key are returned unchanged.
pub fn redact_api_key(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if !parsed
        .query_pairs()
        .any(|(k, v)| k == API_KEY_PARAM && !v.is_empty())
    {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == API_KEY_PARAM {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.into()
}
