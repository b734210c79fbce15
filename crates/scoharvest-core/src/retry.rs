//! Fixed per-class pauses and bounded retry of local operations

use std::time::Duration;

use crate::error::FailureClass;

/// Pause applied after a failed request, chosen by failure class.
///
/// The harvester does not re-issue the request; the pause only gives the
/// service time to recover before the next batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub not_found: Duration,
    pub quota_exceeded: Duration,
    pub server_error: Duration,
    pub other_http: Duration,
    pub non_http: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            not_found: Duration::from_secs(5),
            quota_exceeded: Duration::from_secs(5),
            server_error: Duration::from_secs(10),
            other_http: Duration::from_secs(5),
            non_http: Duration::from_secs(5),
        }
    }
}

impl Backoff {
    /// No pauses at all (tests, dry runs against local fixtures)
    pub const fn none() -> Self {
        Self {
            not_found: Duration::ZERO,
            quota_exceeded: Duration::ZERO,
            server_error: Duration::ZERO,
            other_http: Duration::ZERO,
            non_http: Duration::ZERO,
        }
    }

    pub fn pause_for(&self, class: FailureClass) -> Duration {
        match class {
            FailureClass::NotFound => self.not_found,
            FailureClass::QuotaExceeded => self.quota_exceeded,
            FailureClass::ServerError => self.server_error,
            FailureClass::OtherHttp => self.other_http,
            FailureClass::NonHttp => self.non_http,
        }
    }

    /// Sleep for the class's pause (no-op for zero durations)
    pub fn pause(&self, class: FailureClass) {
        let d = self.pause_for(class);
        if !d.is_zero() {
            log::debug!("{class}: pausing {}s before next batch", d.as_secs());
            std::thread::sleep(d);
        }
    }
}

/// Retry a local operation up to `max_attempts` times without sleeping.
///
/// `on_failure` sees the attempt number (1-based) and the error of every
/// failed attempt, including the last one. Returns the first `Ok`, or the
/// final `Err` once attempts are exhausted.
pub fn retry_attempts<T, E>(
    max_attempts: u32,
    mut attempt_fn: impl FnMut() -> Result<T, E>,
    mut on_failure: impl FnMut(u32, &E),
) -> Result<T, E> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) => {
                on_failure(attempt, &e);
                if attempt >= max_attempts {
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pauses() {
        let b = Backoff::default();
        assert_eq!(b.pause_for(FailureClass::NotFound), Duration::from_secs(5));
        assert_eq!(
            b.pause_for(FailureClass::QuotaExceeded),
            Duration::from_secs(5)
        );
        assert_eq!(
            b.pause_for(FailureClass::ServerError),
            Duration::from_secs(10)
        );
        assert_eq!(b.pause_for(FailureClass::OtherHttp), Duration::from_secs(5));
        assert_eq!(b.pause_for(FailureClass::NonHttp), Duration::from_secs(5));
    }

    #[test]
    fn none_is_all_zero() {
        let b = Backoff::none();
        for class in FailureClass::ALL {
            assert!(b.pause_for(class).is_zero());
        }
    }

    #[test]
    fn retry_succeeds_first_time() {
        let mut failures = 0;
        let r: Result<u32, &str> = retry_attempts(5, || Ok(7), |_, _| failures += 1);
        assert_eq!(r, Ok(7));
        assert_eq!(failures, 0);
    }

    #[test]
    fn retry_succeeds_after_failures() {
        let mut calls = 0;
        let mut seen = Vec::new();
        let r: Result<u32, String> = retry_attempts(
            5,
            || {
                calls += 1;
                if calls < 3 {
                    Err(format!("fail {calls}"))
                } else {
                    Ok(calls)
                }
            },
            |attempt, _| seen.push(attempt),
        );
        assert_eq!(r, Ok(3));
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn retry_exhausts() {
        let mut calls = 0;
        let mut seen = Vec::new();
        let r: Result<(), &str> = retry_attempts(
            5,
            || {
                calls += 1;
                Err("mismatch")
            },
            |attempt, _| seen.push(attempt),
        );
        assert_eq!(r, Err("mismatch"));
        assert_eq!(calls, 5);
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn retry_zero_attempts_runs_once() {
        let mut calls = 0;
        let _: Result<(), ()> = retry_attempts(
            0,
            || {
                calls += 1;
                Err(())
            },
            |_, _| {},
        );
        assert_eq!(calls, 1);
    }
}
