use csv::{ReaderBuilder, StringRecord};
use einzug_core::{parse_amount, Transaction};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::dialect::{Dialect, Registry};
use crate::record;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("file is empty")]
    EmptyFile,
    /// Generic-dialect files must carry a recognizable Date header; without
    /// it no row can be normalized, so the whole file is rejected.
    #[error("no Date column found in header: {0:?}")]
    MissingDateColumn(Vec<String>),
    #[error("no data rows")]
    NoDataRows,
    /// Data rows were present but every one was rejected. Distinct from
    /// [`ParseError::NoDataRows`]: the file is not structurally empty, the
    /// rows just failed normalization.
    #[error("all {0} data rows were skipped")]
    AllRowsSkipped(usize),
}

/// Result of parsing one file.
#[derive(Debug)]
pub struct ParseOutcome {
    pub transactions: Vec<Transaction>,
    /// Name of the matched dialect, `None` for the generic fallback.
    pub dialect: Option<String>,
    /// Rows that failed normalization and were skipped.
    pub rows_skipped: usize,
}

/// File-level orchestration: filename → dialect → rows → transactions.
///
/// Holds only a shared reference to the read-only registry; every call is
/// otherwise self-contained, so one parser may serve concurrent callers.
pub struct Parser<'a> {
    registry: &'a Registry,
}

impl<'a> Parser<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Parser { registry }
    }

    /// Parse a statement file into normalized transactions.
    ///
    /// `original_name` overrides the on-disk name for dialect matching, for
    /// callers that staged the upload under a temporary name.
    pub fn parse(
        &self,
        path: &Path,
        original_name: Option<&str>,
    ) -> Result<ParseOutcome, ParseError> {
        let content = read_file(path)?;
        let filename = effective_filename(path, original_name);

        match self.registry.match_filename(&filename) {
            Some(dialect) => {
                debug!(file = %filename, dialect = %dialect.name, "dialect matched");
                parse_with_dialect(&content, dialect)
            }
            None => {
                debug!(file = %filename, "no dialect matched, using generic fallback");
                parse_generic(&content)
            }
        }
    }

    /// Cheap structural pre-check: would `parse` fail fatally on this file?
    pub fn validate_structure(
        &self,
        path: &Path,
        original_name: Option<&str>,
    ) -> Result<(), ParseError> {
        let content = read_file(path)?;
        let filename = effective_filename(path, original_name);

        match self.registry.match_filename(&filename) {
            Some(dialect) => {
                let data_rows = content
                    .lines()
                    .count()
                    .saturating_sub(dialect.header_rows + dialect.footer_rows);
                if data_rows == 0 {
                    return Err(ParseError::NoDataRows);
                }
            }
            None => {
                let mut reader = ReaderBuilder::new()
                    .has_headers(true)
                    .flexible(true)
                    .from_reader(content.as_bytes());
                let headers = reader.headers()?.clone();
                find_date_column(&headers)?;
                if reader.records().next().is_none() {
                    return Err(ParseError::NoDataRows);
                }
            }
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Read {
        path: path.display().to_string(),
        source,
    })?;
    if content.trim().is_empty() {
        return Err(ParseError::EmptyFile);
    }
    Ok(content)
}

// Staged upload names look like `prefix-f3a91c2e07-statement.csv`: a short
// marker, a random hex token, then the name the user actually uploaded.
// Dialect patterns are anchored to the original name, so recover it.
fn staged_name_re() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"^\w+-[0-9a-f]{6,}-(.+)$").expect("invalid regex"))
}

/// The filename used for dialect matching: the caller-supplied original name
/// when present, else the path's base name with any staging prefix stripped.
pub fn effective_filename(path: &Path, original_name: Option<&str>) -> String {
    if let Some(name) = original_name {
        return name.to_string();
    }
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    match staged_name_re().captures(base) {
        Some(caps) => caps[1].to_string(),
        None => base.to_string(),
    }
}

fn parse_with_dialect(content: &str, dialect: &Dialect) -> Result<ParseOutcome, ParseError> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() <= dialect.header_rows + dialect.footer_rows {
        return Err(ParseError::NoDataRows);
    }
    let body = lines[dialect.header_rows..lines.len() - dialect.footer_rows].join("\n");

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(dialect.delimiter)
        .from_reader(body.as_bytes());

    let mut transactions = Vec::new();
    let mut skipped = 0usize;
    for (idx, result) in reader.records().enumerate() {
        let row_no = dialect.header_rows + idx + 1;
        let rec = match result {
            Ok(rec) => rec,
            Err(e) => {
                warn!(row = row_no, "skipping unreadable row: {e}");
                skipped += 1;
                continue;
            }
        };
        if is_blank(&rec) {
            continue;
        }
        match record::normalize_row(&rec, &dialect.columns, dialect.date_format.as_deref()) {
            Ok(tx) => transactions.push(tx),
            Err(e) => {
                warn!(row = row_no, "skipping row: {e}");
                skipped += 1;
            }
        }
    }

    if transactions.is_empty() {
        return Err(empty_outcome(skipped));
    }
    Ok(ParseOutcome {
        transactions,
        dialect: Some(dialect.name.clone()),
        rows_skipped: skipped,
    })
}

// ── Generic fallback dialect ─────────────────────────────────────────────────
// Header-driven, comma-delimited: `Date, Payee, Category, Memo, Outflow,
// Inflow`, matched case-insensitively. Only this path knows about a header
// row; descriptor-driven parsing is purely positional.

fn find_date_column(headers: &StringRecord) -> Result<usize, ParseError> {
    headers
        .iter()
        .position(|h| h.trim().to_ascii_lowercase().contains("date"))
        .ok_or_else(|| {
            ParseError::MissingDateColumn(headers.iter().map(|h| h.trim().to_string()).collect())
        })
}

fn parse_generic(content: &str) -> Result<ParseOutcome, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };

    // Substring check, so e.g. "Booking Date" also qualifies.
    let date_col = find_date_column(&headers)?;
    let payee_col = find("payee");
    let category_col = find("category");
    let memo_col = find("memo");
    let amount_col = find("amount");
    let outflow_col = find("outflow");
    let inflow_col = find("inflow");

    let get = |rec: &StringRecord, col: Option<usize>| -> String {
        col.and_then(|c| rec.get(c)).unwrap_or_default().to_string()
    };

    let mut transactions = Vec::new();
    let mut skipped = 0usize;
    for (idx, result) in reader.records().enumerate() {
        let row_no = idx + 2; // 1-based, after the header
        let rec = match result {
            Ok(rec) => rec,
            Err(e) => {
                warn!(row = row_no, "skipping unreadable row: {e}");
                skipped += 1;
                continue;
            }
        };
        if is_blank(&rec) {
            continue;
        }

        let token = get(&rec, Some(date_col));
        let token = token.trim();
        if token.is_empty() {
            warn!(row = row_no, "skipping row: no date value");
            skipped += 1;
            continue;
        }
        let iso = crate::date::normalize(token, None);
        if !crate::date::is_iso(&iso) {
            warn!(row = row_no, "skipping row: unrecognized date '{token}'");
            skipped += 1;
            continue;
        }

        let amount = if outflow_col.is_some() || inflow_col.is_some() {
            parse_amount(&get(&rec, inflow_col)) - parse_amount(&get(&rec, outflow_col))
        } else {
            parse_amount(&get(&rec, amount_col))
        };

        transactions.push(Transaction::new(
            iso,
            payee_col.and_then(|c| rec.get(c)),
            category_col.and_then(|c| rec.get(c)),
            memo_col.and_then(|c| rec.get(c)),
            amount,
        ));
    }

    if transactions.is_empty() {
        return Err(empty_outcome(skipped));
    }
    Ok(ParseOutcome {
        transactions,
        dialect: None,
        rows_skipped: skipped,
    })
}

fn empty_outcome(skipped: usize) -> ParseError {
    if skipped > 0 {
        ParseError::AllRowsSkipped(skipped)
    } else {
        ParseError::NoDataRows
    }
}

fn is_blank(rec: &StringRecord) -> bool {
    rec.iter().all(|f| f.trim().is_empty())
}
