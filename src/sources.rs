//! Streaming CSV readers for the pull request and task type tables.
//!
//! Rows are read as raw bytes and decoded lossily, short rows are padded with
//! empty fields and a column absent from the header yields empty values. The
//! only errors surfaced while iterating are genuine read failures.

use crate::config::ColumnConfig;
use crate::error::{ReportError, Result};
use crate::types::{LookupRecord, PrimaryRecord};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Fail with `MissingInput` unless `path` is an existing regular file.
pub fn ensure_input(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(ReportError::missing_input(path, "not a regular file")),
        Err(e) => Err(ReportError::missing_input(path, e)),
    }
}

/// A CSV file read row by row, projecting a fixed list of columns.
pub struct TableReader {
    path: PathBuf,
    rows: csv::ByteRecordsIntoIter<File>,
    positions: Vec<Option<usize>>,
    rows_read: u64,
    rows_repaired: u64,
}

impl TableReader {
    pub fn open(path: &Path, wanted: &[&str]) -> Result<Self> {
        ensure_input(path)?;
        let file = File::open(path).map_err(|e| ReportError::missing_input(path, e))?;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim().to_string())
            .collect();

        let positions = wanted
            .iter()
            .map(|name| {
                let pos = headers.iter().position(|h| h == name);
                if pos.is_none() {
                    warn!(
                        path = %path.display(),
                        column = %name,
                        "Column not found in header; every row will use an empty value"
                    );
                }
                pos
            })
            .collect();

        debug!(path = %path.display(), columns = ?headers, "Opened table");

        Ok(Self {
            path: path.to_path_buf(),
            rows: reader.into_byte_records(),
            positions,
            rows_read: 0,
            rows_repaired: 0,
        })
    }

    /// Next row as the wanted fields, in the order they were requested.
    pub fn next_row(&mut self) -> Option<Result<Vec<String>>> {
        let record = match self.rows.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };
        self.rows_read += 1;

        let mut repaired = false;
        let fields = self
            .positions
            .iter()
            .map(|pos| match pos.map(|p| record.get(p)) {
                Some(Some(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
                Some(None) => {
                    repaired = true;
                    String::new()
                }
                None => String::new(),
            })
            .collect();

        if repaired {
            self.rows_repaired += 1;
            debug!(
                path = %self.path.display(),
                row = self.rows_read,
                "Short row padded with empty fields"
            );
        }

        Some(Ok(fields))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Rows that were shorter than the header and had fields filled in.
    pub fn rows_repaired(&self) -> u64 {
        self.rows_repaired
    }
}

/// Pull request rows from the primary CSV.
pub struct PrimaryReader {
    table: TableReader,
}

impl PrimaryReader {
    pub fn open(path: &Path, columns: &ColumnConfig) -> Result<Self> {
        let wanted = [
            columns.primary_id.as_str(),
            columns.primary_agent.as_str(),
            columns.primary_title.as_str(),
            columns.primary_body.as_str(),
        ];
        Ok(Self {
            table: TableReader::open(path, &wanted)?,
        })
    }

    pub fn table(&self) -> &TableReader {
        &self.table
    }
}

impl Iterator for PrimaryReader {
    type Item = Result<PrimaryRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.table.next_row()?.map(|fields| {
            let [id, agent_label, title_text, body_text]: [String; 4] =
                fields.try_into().unwrap_or_default();
            PrimaryRecord {
                id,
                agent_label,
                title_text,
                body_text,
            }
        }))
    }
}

/// Task type rows from the lookup CSV.
pub struct LookupReader {
    table: TableReader,
}

impl LookupReader {
    pub fn open(path: &Path, columns: &ColumnConfig) -> Result<Self> {
        let wanted = [
            columns.lookup_id.as_str(),
            columns.lookup_class.as_str(),
            columns.lookup_confidence.as_str(),
        ];
        Ok(Self {
            table: TableReader::open(path, &wanted)?,
        })
    }

    pub fn table(&self) -> &TableReader {
        &self.table
    }
}

impl Iterator for LookupReader {
    type Item = Result<LookupRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.table.next_row()?.map(|fields| {
            let [id, class_label, confidence_value]: [String; 3] =
                fields.try_into().unwrap_or_default();
            LookupRecord {
                id,
                class_label,
                confidence_value,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn test_reads_primary_rows_by_header_name() {
        let file = create_test_csv(
            b"TITLE,ID,AGENTNAME,BODYSTRING,REPOID,REPOURL\n\
              Fix race,1,Codex,details,10,https://x/r\n\
              Docs,2,Devin,,11,https://x/s\n",
        );
        let rows: Vec<PrimaryRecord> = PrimaryReader::open(file.path(), &ColumnConfig::default())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "1");
        assert_eq!(rows[0].agent_label, "Codex");
        assert_eq!(rows[0].title_text, "Fix race");
        assert_eq!(rows[0].body_text, "details");
        assert_eq!(rows[1].body_text, "");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let file = create_test_csv(b"PRID,PRTITLE,PRREASON,PRTYPE,CONFIDENCE\n5,t,r\n6,t,r,fix,0.8\n");
        let mut reader = LookupReader::open(file.path(), &ColumnConfig::default()).unwrap();

        let first = reader.next().unwrap().unwrap();
        assert_eq!(first.id, "5");
        assert_eq!(first.class_label, "");
        assert_eq!(first.confidence_value, "");

        let second = reader.next().unwrap().unwrap();
        assert_eq!(second.class_label, "fix");
        assert_eq!(second.confidence_value, "0.8");

        assert!(reader.next().is_none());
        assert_eq!(reader.table().rows_read(), 2);
        assert_eq!(reader.table().rows_repaired(), 1);
    }

    #[test]
    fn test_missing_column_yields_empty_values() {
        let file = create_test_csv(b"ID,TITLE\n9,hello\n");
        let rows: Vec<PrimaryRecord> = PrimaryReader::open(file.path(), &ColumnConfig::default())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "9");
        assert_eq!(rows[0].title_text, "hello");
        assert_eq!(rows[0].agent_label, "");
        assert_eq!(rows[0].body_text, "");
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let file = create_test_csv(b"ID,TITLE\n1,bad \xff byte\n");
        let row = PrimaryReader::open(file.path(), &ColumnConfig::default())
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(row.title_text, "bad \u{fffd} byte");
    }

    #[test]
    fn test_quoted_multiline_body() {
        let file = create_test_csv(b"ID,BODYSTRING\n1,\"line one\nline, two\"\n2,x\n");
        let rows: Vec<PrimaryRecord> = PrimaryReader::open(file.path(), &ColumnConfig::default())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].body_text, "line one\nline, two");
    }

    #[test]
    fn test_missing_file_is_missing_input() {
        let err = PrimaryReader::open(Path::new("/nonexistent/prs.csv"), &ColumnConfig::default())
            .err()
            .unwrap();
        assert!(err.is_missing_input());
    }

    #[test]
    fn test_directory_is_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = ensure_input(dir.path()).unwrap_err();
        assert!(err.is_missing_input());
    }
}
