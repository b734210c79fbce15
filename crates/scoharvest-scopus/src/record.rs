//! Row assembly: one search response → CSV rows for the batch
//!
//! A batch is all-or-nothing. Any violated expectation (empty result, entry
//! or identifier counts, tag mismatches, row length) discards every row of
//! the batch, and the runner marks all of its identifiers failed.

use std::fmt;

use scoharvest_core::{LogCategory, RunLog};

use crate::extract::{CompiledField, Extractor, KindScanners, TagMismatch};
use crate::kind::{DetailTable, FieldFormat, RecordKind, placeholder};

/// Separator joining several values in one cell
pub const MULTI_VALUE_SEPARATOR: &str = "_||_";

/// Why a response could not be turned into rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// `opensearch:totalResults` missing, unparsable or zero
    EmptyResult,
    /// Scan failed after all attempts; `id` is set for field-level scans
    Mismatch {
        context: String,
        id: Option<String>,
        mismatch: TagMismatch,
    },
    EntryCount { count: usize, max: usize },
    /// An entry did not hold exactly one identifier tag
    IdCount { entry: usize, count: usize },
    RowLength { id: String, len: usize, expected: usize },
}

impl BatchError {
    /// Log file this error belongs in
    pub fn category(&self) -> LogCategory {
        match self {
            Self::Mismatch { .. } => LogCategory::XmlMismatch,
            _ => LogCategory::Data,
        }
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyResult => write!(f, "search returned no results"),
            Self::Mismatch { context, mismatch, .. } => write!(f, "{context}: {mismatch}"),
            Self::EntryCount { count, max } => {
                write!(f, "{count} entries in response (expected 1 to {max})")
            }
            Self::IdCount { entry, count } => {
                write!(f, "entry {entry} holds {count} identifier tags (expected 1)")
            }
            Self::RowLength { id, len, expected } => {
                write!(f, "row for {id} has {len} fields, header has {expected}")
            }
        }
    }
}

impl std::error::Error for BatchError {}

/// Rows harvested from one response
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchRows {
    /// Main CSV rows, identifier first
    pub rows: Vec<Vec<String>>,
    /// Detail rows by table, not yet de-duplicated
    pub details: Vec<(DetailTable, Vec<String>)>,
    /// `(file name, line)` entries for the per-identifier lists in the log
    /// directory, held back until the batch is written
    pub id_lists: Vec<(String, String)>,
}

impl BatchRows {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().filter_map(|r| r.first().map(String::as_str))
    }

    /// Append the held-back list entries (missing fields, invalid ISSNs).
    pub fn write_id_lists(&self, log: &RunLog) {
        for (file, line) in &self.id_lists {
            log.append_raw(file, line);
        }
    }
}

/// Turns response bodies into rows for one record kind.
pub struct RowAssembler<'a> {
    kind: RecordKind,
    scanners: &'a KindScanners,
    extractor: Extractor<'a>,
    log: &'a RunLog,
    page_size: usize,
    header_len: usize,
}

impl<'a> RowAssembler<'a> {
    pub fn new(
        kind: RecordKind,
        scanners: &'a KindScanners,
        log: &'a RunLog,
        page_size: usize,
        extraction_attempts: u32,
    ) -> Self {
        Self {
            kind,
            scanners,
            extractor: Extractor::new(extraction_attempts, log),
            log,
            page_size,
            header_len: kind.header().len(),
        }
    }

    /// Assemble every row of a batch response.
    ///
    /// `label` names the batch in log lines (e.g. `entries 26-50`).
    pub fn assemble(&self, body: &str, label: &str) -> Result<BatchRows, BatchError> {
        let total = self
            .extractor
            .extract(&self.scanners.total_results, body, label)
            .map_err(|mismatch| batch_mismatch(label, mismatch))?;
        let total: u64 = total
            .first()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);
        if total == 0 {
            return Err(BatchError::EmptyResult);
        }

        let entries = self
            .extractor
            .extract(&self.scanners.entry, body, label)
            .map_err(|mismatch| batch_mismatch(label, mismatch))?;
        if entries.is_empty() || entries.len() > self.page_size {
            return Err(BatchError::EntryCount {
                count: entries.len(),
                max: self.page_size,
            });
        }
        log::debug!(
            "{label}: {} entries of at most {}",
            entries.len(),
            self.page_size
        );

        let mut out = BatchRows::default();
        for (i, entry) in entries.iter().enumerate() {
            let id = self.entry_id(entry, i + 1, label)?;
            let row = self.assemble_row(&id, entry, &mut out)?;
            if row.len() != self.header_len {
                return Err(BatchError::RowLength {
                    id,
                    len: row.len(),
                    expected: self.header_len,
                });
            }
            out.rows.push(row);
        }
        Ok(out)
    }

    fn entry_id(&self, entry: &str, position: usize, label: &str) -> Result<String, BatchError> {
        let context = format!("{label} entry {position} identifier");
        let ids = self
            .extractor
            .extract(&self.scanners.id, entry, &context)
            .map_err(|mismatch| batch_mismatch(&context, mismatch))?;
        match ids.as_slice() {
            [id] => {
                let id = id.trim();
                Ok(id.strip_prefix(self.kind.id_prefix()).unwrap_or(id).to_string())
            }
            _ => Err(BatchError::IdCount {
                entry: position,
                count: ids.len(),
            }),
        }
    }

    fn assemble_row(
        &self,
        id: &str,
        entry: &str,
        out: &mut BatchRows,
    ) -> Result<Vec<String>, BatchError> {
        let mut row = Vec::with_capacity(self.header_len);
        row.push(id.to_string());
        for field in &self.scanners.fields {
            let context = format!("{id} {}", field.spec.name);
            let values = self
                .extractor
                .extract(&field.scanner, entry, &context)
                .map_err(|mismatch| BatchError::Mismatch {
                    context,
                    id: Some(id.to_string()),
                    mismatch,
                })?;
            row.push(self.cell(id, field, &values, out)?);
        }
        Ok(row)
    }

    fn cell(
        &self,
        id: &str,
        field: &CompiledField,
        values: &[String],
        out: &mut BatchRows,
    ) -> Result<String, BatchError> {
        let spec = &field.spec;
        if values.is_empty() {
            if spec.track_missing {
                out.id_lists.push((
                    format!("#{}_with_no_{}.txt", self.kind.id_plural(), spec.name),
                    id.to_string(),
                ));
            }
            return Ok(spec.placeholder());
        }

        if let Some(table) = spec.detail {
            return self.detail_cell(id, field, table, values, out);
        }

        if values.len() > 1 {
            log::debug!("{id}: {} has {} values", spec.name, values.len());
            self.log.record(
                LogCategory::Data,
                format!("{} for {id} has multiple values", spec.name),
            );
        }
        let mut formatted = Vec::with_capacity(values.len());
        for value in values {
            formatted.push(self.format_value(id, spec.name, spec.format, value, out));
        }
        Ok(formatted.join(MULTI_VALUE_SEPARATOR))
    }

    /// Expand each value into a detail row and keep the first sub-value of
    /// the distinct rows for the main cell.
    fn detail_cell(
        &self,
        id: &str,
        field: &CompiledField,
        table: DetailTable,
        values: &[String],
        out: &mut BatchRows,
    ) -> Result<String, BatchError> {
        let mut distinct: Vec<Vec<String>> = Vec::new();
        for value in values {
            let mut parts = Vec::with_capacity(field.subs.len());
            for (sub, scanner) in &field.subs {
                let context = format!("{id} {} {}", field.spec.name, sub.name);
                let found = self
                    .extractor
                    .extract(scanner, value, &context)
                    .map_err(|mismatch| BatchError::Mismatch {
                        context,
                        id: Some(id.to_string()),
                        mismatch,
                    })?;
                parts.push(if found.is_empty() {
                    placeholder(sub.name)
                } else {
                    found.join(MULTI_VALUE_SEPARATOR)
                });
            }

            let mut detail_row = Vec::with_capacity(parts.len() + 2);
            detail_row.push(id.to_string());
            detail_row.extend(parts.iter().cloned());
            if let Some(label) = field.spec.label {
                detail_row.push(label.to_string());
            }
            if table == DetailTable::PublicationAuthors {
                out.details.extend(
                    author_affiliation_pairs(&detail_row)
                        .into_iter()
                        .map(|pair| (DetailTable::AuthorAffiliationPairs, pair)),
                );
            }
            out.details.push((table, detail_row));

            if !distinct.contains(&parts) {
                distinct.push(parts);
            }
        }

        let firsts: Vec<&str> = distinct
            .iter()
            .filter_map(|parts| parts.first().map(String::as_str))
            .collect();
        Ok(firsts.join(MULTI_VALUE_SEPARATOR))
    }

    fn format_value(
        &self,
        id: &str,
        name: &str,
        format: FieldFormat,
        value: &str,
        out: &mut BatchRows,
    ) -> String {
        match format {
            FieldFormat::Plain => value.to_string(),
            FieldFormat::Issn => {
                if value.chars().count() != 8 {
                    log::debug!("{id}: invalid {name} '{value}'");
                    self.log
                        .record(LogCategory::Data, format!("Invalid {name} for {id}: {value}"));
                    out.id_lists.push((
                        format!("#{}_with_invalid_issn.txt", self.kind.id_plural()),
                        format!("{id}: {value}"),
                    ));
                }
                format_issn(value)
            }
        }
    }
}

/// Split an author detail row's affiliation IDs into one
/// `[EID, AuthorID, AfilliationID]` row per ID.
fn author_affiliation_pairs(author_row: &[String]) -> Vec<Vec<String>> {
    let [eid, _name, author_id, _orcid, afids, ..] = author_row else {
        return Vec::new();
    };
    afids
        .split(MULTI_VALUE_SEPARATOR)
        .map(|afid| vec![eid.clone(), author_id.clone(), afid.to_string()])
        .collect()
}

fn batch_mismatch(context: &str, mismatch: TagMismatch) -> BatchError {
    BatchError::Mismatch {
        context: context.to_string(),
        id: None,
        mismatch,
    }
}

/// Insert a hyphen after the fourth character: `12345678` → `1234-5678`.
pub fn format_issn(raw: &str) -> String {
    let split = raw.char_indices().nth(4).map_or(raw.len(), |(i, _)| i);
    format!("{}-{}", &raw[..split], &raw[split..])
}
