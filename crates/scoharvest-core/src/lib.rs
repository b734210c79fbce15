//! scoharvest core - common infrastructure for batch API harvesting
//!
//! Blocking HTTP over a shared runtime, failure classification with fixed
//! per-class pauses, per-category run logs, console logging and progress.

pub mod error;
pub mod http;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod run_log;
pub mod shutdown;

// Re-exports for convenience
pub use error::{FailureClass, FetchError};
pub use http::{Fetch, HttpClient, HttpSettings, SHARED_RUNTIME};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use retry::{Backoff, retry_attempts};
pub use run_log::{LogCategory, RunLog};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, request_shutdown, reset_shutdown};
