//! Per-pass success/failure bookkeeping

use rustc_hash::FxHashSet;

/// Identifiers that succeeded or were explicitly marked failed in one pass.
#[derive(Debug, Default, Clone)]
pub struct PassLedger {
    succeeded: FxHashSet<String>,
    failed: FxHashSet<String>,
}

impl PassLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.failed.remove(id);
            self.succeeded.insert(id.to_string());
        }
    }

    /// Mark identifiers failed; a success recorded earlier in the pass wins.
    pub fn record_failure<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            if !self.succeeded.contains(id) {
                self.failed.insert(id.to_string());
            }
        }
    }

    pub fn is_success(&self, id: &str) -> bool {
        self.succeeded.contains(id)
    }

    /// Successes among `input`; identifiers the service returned unasked
    /// are not counted.
    pub fn successes_within(&self, input: &[String]) -> usize {
        input
            .iter()
            .collect::<FxHashSet<_>>()
            .into_iter()
            .filter(|id| self.succeeded.contains(id.as_str()))
            .count()
    }

    /// Sorted successes
    pub fn successes(&self) -> Vec<String> {
        sorted(self.succeeded.iter())
    }

    /// Identifiers of `input` to retry: explicitly failed ones plus those that
    /// appear in neither list (the service never returned them). Sorted, unique.
    pub fn failures_against(&self, input: &[String]) -> Vec<String> {
        let missed = input
            .iter()
            .filter(|id| !self.succeeded.contains(id.as_str()));
        let explicit = self
            .failed
            .iter()
            .filter(|id| !self.succeeded.contains(id.as_str()));
        let all: FxHashSet<&String> = missed.chain(explicit).collect();
        sorted(all.into_iter())
    }
}

/// Input identifiers no pass succeeded on, sorted.
pub fn unresolved(input: &[String], passes: &[&PassLedger]) -> Vec<String> {
    let mut left: Vec<String> = input
        .iter()
        .filter(|id| !passes.iter().any(|p| p.is_success(id)))
        .cloned()
        .collect();
    left.sort();
    left.dedup();
    left
}

fn sorted<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut v: Vec<String> = ids.cloned().collect();
    v.sort();
    v
}
