//! scoharvest Scopus - batch harvest of author and publication records
//!
//! Queries the Scopus search API with up to 25 identifiers per request,
//! scans the XML responses for known tags and writes one CSV row per
//! harvested identifier. Failed identifiers get a second pass; whatever is
//! still missing afterwards is listed for manual checking.
//!
//! # Example
//!
//! ```ignore
//! use scoharvest_core::{HttpClient, HttpSettings, ProgressContext};
//! use scoharvest_scopus::{Config, RecordKind, run};
//!
//! let config = Config {
//!     kind: RecordKind::Publications,
//!     input: "eids.txt".into(),
//!     api_key: std::env::var("SCOPUS_API_KEY")?,
//!     ..Default::default()
//! };
//! let mut client = HttpClient::new(&HttpSettings::default())?;
//! let summary = run(&config, &mut client, &ProgressContext::new())?;
//! println!("{} rows, {} unresolved", summary.rows_written, summary.unresolved);
//! ```

pub mod config;
pub mod extract;
pub mod input;
pub mod kind;
pub mod ledger;
pub mod output;
pub mod query;
pub mod record;
pub mod runner;
pub mod summary;

// Re-exports
pub use config::Config;
pub use kind::RecordKind;
pub use runner::run;
pub use summary::{PassStats, Summary};
