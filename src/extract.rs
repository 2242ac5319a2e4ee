//! Extraction tasks: fixed projections of the dataset tables into flat CSVs.
//!
//! Each source table is an NDJSON export (one JSON object per line). Every
//! output column copies one source field; absent fields and nulls become
//! empty strings.

use crate::constants;
use crate::error::{ReportError, Result};
use crate::metrics::ExtractMetrics;
use crate::sink::CsvFileWriter;
use crate::sources::ensure_input;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// How a source value is turned into a CSV field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTransform {
    Verbatim,
    /// Keep printable ASCII only.
    PrintableAscii,
}

/// One output column and the source field it is copied from.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMapping {
    pub column: &'static str,
    pub source_field: &'static str,
    pub transform: FieldTransform,
}

const fn col(column: &'static str, source_field: &'static str) -> ColumnMapping {
    ColumnMapping {
        column,
        source_field,
        transform: FieldTransform::Verbatim,
    }
}

const PULL_REQUEST_COLUMNS: &[ColumnMapping] = &[
    col(constants::PR_TITLE, "title"),
    col(constants::PR_ID, "id"),
    col(constants::PR_AGENT, "agent"),
    col(constants::PR_BODY, "body"),
    col(constants::PR_REPO_ID, "repo_id"),
    col(constants::PR_REPO_URL, "repo_url"),
];

const REPOSITORY_COLUMNS: &[ColumnMapping] = &[
    col("REPOID", "id"),
    col("LANG", "language"),
    col("STARS", "stars"),
    col("REPOURL", "url"),
];

const TASK_TYPE_COLUMNS: &[ColumnMapping] = &[
    col(constants::TT_ID, "id"),
    col(constants::TT_TITLE, "title"),
    col(constants::TT_REASON, "reason"),
    col(constants::TT_TYPE, "type"),
    col(constants::TT_CONFIDENCE, "confidence"),
];

const COMMIT_DETAIL_COLUMNS: &[ColumnMapping] = &[
    col("PRID", "pr_id"),
    col("PRSHA", "sha"),
    col("PRCOMMITMESSAGE", "message"),
    col("PRFILE", "filename"),
    col("PRSTATUS", "status"),
    col("PRADDS", "additions"),
    col("PRDELSS", "deletions"),
    col("PRCHANGECOUNT", "changes"),
    ColumnMapping {
        column: "PRDIFF",
        source_field: "patch",
        transform: FieldTransform::PrintableAscii,
    },
];

/// The four dataset tables that can be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    PullRequests,
    Repositories,
    TaskTypes,
    CommitDetails,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::PullRequests,
        Table::Repositories,
        Table::TaskTypes,
        Table::CommitDetails,
    ];

    /// Dataset table name; also the stem of the source and output files.
    pub fn table_name(&self) -> &'static str {
        match self {
            Table::PullRequests => constants::PULL_REQUESTS_TABLE,
            Table::Repositories => constants::REPOSITORIES_TABLE,
            Table::TaskTypes => constants::TASK_TYPES_TABLE,
            Table::CommitDetails => constants::COMMIT_DETAILS_TABLE,
        }
    }

    pub fn columns(&self) -> &'static [ColumnMapping] {
        match self {
            Table::PullRequests => PULL_REQUEST_COLUMNS,
            Table::Repositories => REPOSITORY_COLUMNS,
            Table::TaskTypes => TASK_TYPE_COLUMNS,
            Table::CommitDetails => COMMIT_DETAIL_COLUMNS,
        }
    }

    pub fn header(&self) -> Vec<&'static str> {
        self.columns().iter().map(|c| c.column).collect()
    }

    pub fn source_path(&self, source_dir: &Path) -> PathBuf {
        source_dir.join(format!("{}.ndjson", self.table_name()))
    }

    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.csv", self.table_name()))
    }
}

impl FromStr for Table {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "pull-requests" | constants::PULL_REQUESTS_TABLE => Ok(Table::PullRequests),
            "repositories" | constants::REPOSITORIES_TABLE => Ok(Table::Repositories),
            "task-types" | constants::TASK_TYPES_TABLE => Ok(Table::TaskTypes),
            "commit-details" | constants::COMMIT_DETAILS_TABLE => Ok(Table::CommitDetails),
            other => Err(ReportError::Config(format!("Unknown table '{other}'"))),
        }
    }
}

/// Result of one extraction task.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractResult {
    pub table: String,
    pub rows_written: u64,
    /// Non-blank lines that were not JSON objects.
    pub rejected_lines: u64,
    pub output_path: PathBuf,
}

/// Drop every character outside printable ASCII (letters, digits,
/// punctuation and whitespace).
pub fn clean_patch(patch: &str) -> String {
    patch
        .chars()
        .filter(|c| matches!(c, ' '..='~' | '\t' | '\n' | '\r' | '\x0b' | '\x0c'))
        .collect()
}

/// Text form of a JSON value for a CSV field.
fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn project(row: &Map<String, Value>, columns: &[ColumnMapping]) -> Vec<String> {
    columns
        .iter()
        .map(|mapping| {
            let text = field_text(row.get(mapping.source_field));
            match mapping.transform {
                FieldTransform::Verbatim => text,
                FieldTransform::PrintableAscii => clean_patch(&text),
            }
        })
        .collect()
}

/// Extract one table from `source` into the CSV at `output`.
#[instrument(skip_all, fields(table = table.table_name()))]
pub fn extract_table(
    table: Table,
    source: &Path,
    output: &Path,
    progress_every: u64,
) -> Result<ExtractResult> {
    ensure_input(source)?;
    let file = File::open(source).map_err(|e| ReportError::missing_input(source, e))?;
    let reader = BufReader::new(file);

    let started = Instant::now();
    let columns = table.columns();
    let mut sink = CsvFileWriter::create(output, &table.header())?;
    let mut rejected = 0u64;

    for (line_idx, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        let text = String::from_utf8_lossy(&line);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(row)) => {
                sink.write_row(project(&row, columns))?;
                let count = sink.rows();
                if progress_every > 0 && count % progress_every == 0 {
                    info!("Processed {} rows...", count);
                }
            }
            Ok(_) => {
                rejected += 1;
                warn!(line = line_idx + 1, "Skipping source line that is not a JSON object");
            }
            Err(e) => {
                rejected += 1;
                warn!(line = line_idx + 1, error = %e, "Skipping malformed source line");
            }
        }
    }

    let rows_written = sink.rows();
    let output_path = sink.commit()?;
    ExtractMetrics::record(
        table.table_name(),
        rows_written,
        rejected,
        started.elapsed().as_secs_f64(),
    );

    info!(
        rows = rows_written,
        rejected = rejected,
        path = %output_path.display(),
        "Extraction of {} complete. Wrote {} rows",
        table.table_name(),
        rows_written
    );

    Ok(ExtractResult {
        table: table.table_name().to_string(),
        rows_written,
        rejected_lines: rejected,
        output_path,
    })
}

/// Extract each table from `<source_dir>/<table>.ndjson` to `<output_dir>/<table>.csv`.
///
/// All sources are checked up front so a missing one fails before any CSV is written.
pub fn extract_tables(
    tables: &[Table],
    source_dir: &Path,
    output_dir: &Path,
    progress_every: u64,
) -> Result<Vec<ExtractResult>> {
    for table in tables {
        ensure_input(&table.source_path(source_dir))?;
    }

    tables
        .iter()
        .map(|table| {
            extract_table(
                *table,
                &table.source_path(source_dir),
                &table.output_path(output_dir),
                progress_every,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_patch_keeps_printable_ascii() {
        assert_eq!(clean_patch("+ let x = 1;\n-\ty\r\n"), "+ let x = 1;\n-\ty\r\n");
        assert_eq!(clean_patch("caf\u{e9} \u{1f600}\u{0}ok\u{7f}"), "caf ok");
        assert_eq!(clean_patch(""), "");
    }

    #[test]
    fn test_field_text() {
        assert_eq!(field_text(None), "");
        assert_eq!(field_text(Some(&Value::Null)), "");
        assert_eq!(field_text(Some(&json!("a,b"))), "a,b");
        assert_eq!(field_text(Some(&json!(42))), "42");
        assert_eq!(field_text(Some(&json!(0.85))), "0.85");
        assert_eq!(field_text(Some(&json!(true))), "true");
        assert_eq!(field_text(Some(&json!(["x"]))), "[\"x\"]");
    }

    #[test]
    fn test_project_pull_request_columns() {
        let row = json!({
            "id": 123,
            "title": "Fix race",
            "agent": "Codex",
            "body": null,
            "repo_id": 7,
            "repo_url": "https://api.github.com/repos/a/b",
            "extra": "ignored"
        });
        let fields = project(row.as_object().unwrap(), Table::PullRequests.columns());
        assert_eq!(
            fields,
            vec!["Fix race", "123", "Codex", "", "7", "https://api.github.com/repos/a/b"]
        );
    }

    #[test]
    fn test_commit_patch_is_cleaned() {
        let row = json!({"pr_id": 1, "patch": "@@ -1 +1 @@\n-a\u{2028}\n+b"});
        let fields = project(row.as_object().unwrap(), Table::CommitDetails.columns());
        assert_eq!(fields[8], "@@ -1 +1 @@\n-a\n+b");
        assert_eq!(fields[1], "");
    }

    #[test]
    fn test_headers() {
        assert_eq!(
            Table::PullRequests.header(),
            vec!["TITLE", "ID", "AGENTNAME", "BODYSTRING", "REPOID", "REPOURL"]
        );
        assert_eq!(Table::Repositories.header(), vec!["REPOID", "LANG", "STARS", "REPOURL"]);
        assert_eq!(
            Table::TaskTypes.header(),
            vec!["PRID", "PRTITLE", "PRREASON", "PRTYPE", "CONFIDENCE"]
        );
        assert_eq!(Table::CommitDetails.header().len(), 9);
    }

    #[test]
    fn test_table_from_str() {
        assert_eq!("task-types".parse::<Table>().unwrap(), Table::TaskTypes);
        assert_eq!("all_repository".parse::<Table>().unwrap(), Table::Repositories);
        assert!("bogus".parse::<Table>().is_err());
    }
}
