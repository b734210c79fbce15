//! Identifier list loading

use std::path::Path;

use anyhow::{Context, Result};

/// Identifiers shorter than this are dropped (the `2-s2.0-` EID prefix alone is 7)
pub const MIN_ID_LEN: usize = 8;

/// Normalized identifier list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputIds {
    /// Sorted, unique identifiers
    pub ids: Vec<String>,
    /// Identifiers accepted before de-duplication
    pub raw_count: usize,
    /// Non-blank lines dropped for being too short
    pub too_short: usize,
}

/// Trim, drop short entries, de-duplicate and sort.
pub fn normalize_ids<'a>(lines: impl IntoIterator<Item = &'a str>) -> InputIds {
    let mut ids = Vec::new();
    let mut too_short = 0;
    for line in lines {
        let id = line.trim();
        if id.is_empty() {
            continue;
        }
        if id.len() < MIN_ID_LEN {
            too_short += 1;
            continue;
        }
        ids.push(id.to_string());
    }
    let raw_count = ids.len();
    ids.sort();
    ids.dedup();
    InputIds {
        ids,
        raw_count,
        too_short,
    }
}

/// Read one identifier per line from `path`.
pub fn read_ids(path: &Path) -> Result<InputIds> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read identifier list {}", path.display()))?;
    let input = normalize_ids(content.lines());
    if input.too_short > 0 {
        log::warn!(
            "{}: skipped {} identifiers shorter than {MIN_ID_LEN} characters",
            path.display(),
            input.too_short
        );
    }
    Ok(input)
}
