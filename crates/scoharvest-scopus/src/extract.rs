//! Literal start/end tag scanner for search responses
//!
//! The responses are scanned as text, not parsed as a tree: values are the
//! slices between the i-th start tag and the i-th end tag. A differing number
//! of start and end tags means the slice pairing cannot be trusted, so the
//! scan is reported as a mismatch instead of guessing.

use std::borrow::Cow;
use std::fmt;

use regex::Regex;
use scoharvest_core::{LogCategory, RunLog, retry_attempts};

use crate::kind::{FieldSpec, RecordKind, SubField};

/// Start and end tag counts disagree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMismatch {
    pub start_tag: String,
    pub end_tag: String,
    pub starts: usize,
    pub ends: usize,
}

impl fmt::Display for TagMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mismatch in number of XML tags: {} {} but {} {}",
            self.starts, self.start_tag, self.ends, self.end_tag
        )
    }
}

impl std::error::Error for TagMismatch {}

/// Compiled scanner for one tag pair.
#[derive(Debug, Clone)]
pub struct TagScanner {
    start_tag: String,
    end_tag: String,
    start: Regex,
    end: Regex,
    /// Start pattern stops inside the tag (`<author seq=`): skip to its `>`
    open_start: bool,
}

impl TagScanner {
    pub fn new(start_tag: &str, end_tag: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            start_tag: start_tag.to_string(),
            end_tag: end_tag.to_string(),
            start: Regex::new(&regex::escape(start_tag))?,
            end: Regex::new(&regex::escape(end_tag))?,
            open_start: !start_tag.ends_with('>'),
        })
    }

    /// One scan over `text`. Values are entity-unescaped.
    pub fn scan(&self, text: &str) -> Result<Vec<String>, TagMismatch> {
        let starts: Vec<usize> = self.start.find_iter(text).map(|m| m.end()).collect();
        let ends: Vec<usize> = self.end.find_iter(text).map(|m| m.start()).collect();
        if starts.len() != ends.len() {
            return Err(TagMismatch {
                start_tag: self.start_tag.clone(),
                end_tag: self.end_tag.clone(),
                starts: starts.len(),
                ends: ends.len(),
            });
        }

        Ok(starts
            .into_iter()
            .zip(ends)
            .map(|(from, to)| {
                let from = if self.open_start {
                    text[from..].find('>').map_or(from, |i| from + i + 1)
                } else {
                    from
                };
                let raw = text.get(from..to).unwrap_or("");
                unescape(raw).into_owned()
            })
            .collect())
    }
}

/// Unescape XML entities, keeping the raw text if it holds a malformed one.
fn unescape(raw: &str) -> Cow<'_, str> {
    quick_xml::escape::unescape(raw).unwrap_or(Cow::Borrowed(raw))
}

/// A field with its compiled scanners
#[derive(Debug, Clone)]
pub struct CompiledField {
    pub spec: FieldSpec,
    pub scanner: TagScanner,
    /// Sub-field scanners; empty unless the field has a detail table
    pub subs: Vec<(SubField, TagScanner)>,
}

/// Every scanner a record kind needs, compiled once per run.
#[derive(Debug, Clone)]
pub struct KindScanners {
    pub total_results: TagScanner,
    pub entry: TagScanner,
    pub id: TagScanner,
    pub fields: Vec<CompiledField>,
}

impl KindScanners {
    pub fn new(kind: RecordKind) -> Result<Self, regex::Error> {
        let (id_start, id_end) = kind.id_tags();
        let mut fields = Vec::with_capacity(kind.fields().len());
        for spec in kind.fields() {
            let subs = match spec.detail {
                Some(table) => table
                    .sub_fields()
                    .iter()
                    .map(|sub| TagScanner::new(sub.start, sub.end).map(|scanner| (*sub, scanner)))
                    .collect::<Result<Vec<_>, regex::Error>>()?,
                None => Vec::new(),
            };
            fields.push(CompiledField {
                spec: *spec,
                scanner: TagScanner::new(spec.start, spec.end)?,
                subs,
            });
        }
        Ok(Self {
            total_results: TagScanner::new(
                "<opensearch:totalResults>",
                "</opensearch:totalResults>",
            )?,
            entry: TagScanner::new("<entry>", "</entry>")?,
            id: TagScanner::new(id_start, id_end)?,
            fields,
        })
    }
}

/// Scans with bounded retry, logging each mismatch to the run log.
pub struct Extractor<'a> {
    attempts: u32,
    log: &'a RunLog,
}

impl<'a> Extractor<'a> {
    pub fn new(attempts: u32, log: &'a RunLog) -> Self {
        Self {
            attempts: attempts.max(1),
            log,
        }
    }

    /// Scan `text`, retrying up to the configured attempt count on mismatch.
    ///
    /// `context` names what is being scanned (batch label or identifier plus
    /// field) for the log lines.
    pub fn extract(
        &self,
        scanner: &TagScanner,
        text: &str,
        context: &str,
    ) -> Result<Vec<String>, TagMismatch> {
        let attempts = self.attempts;
        let result = retry_attempts(
            attempts,
            || scanner.scan(text),
            |attempt, mismatch| {
                log::debug!("{context}: {mismatch} (attempt {attempt}/{attempts})");
                self.log.record(
                    LogCategory::XmlMismatch,
                    format!(
                        "{context} - {mismatch}. Attempt {attempt}, {} left",
                        attempts - attempt
                    ),
                );
            },
        );
        if let Err(mismatch) = &result {
            log::warn!("{context}: {mismatch}, failed {attempts} times");
            self.log.record(
                LogCategory::XmlMismatch,
                format!("FAILED {attempts} TIMES for {context}"),
            );
        }
        result
    }
}
