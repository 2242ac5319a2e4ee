//! LookupIndex - O(1) point lookups from pull request id to task type.

use crate::error::Result;
use crate::types::LookupRecord;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Fields carried for one pull request id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupEntry {
    pub class_label: String,
    pub confidence_value: String,
}

/// Counters collected while the index was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LookupStats {
    /// Rows consumed from the secondary stream.
    pub rows: u64,
    /// Rows dropped because their id was empty.
    pub skipped: u64,
    /// Rows whose id was already present and replaced the earlier entry.
    pub collisions: u64,
}

/// Read-only id -> (class label, confidence) map.
#[derive(Debug, Default)]
pub struct LookupIndex {
    entries: HashMap<String, LookupEntry>,
    stats: LookupStats,
}

impl LookupIndex {
    pub fn get(&self, id: &str) -> Option<&LookupEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> LookupStats {
        self.stats
    }
}

/// What happened to a row handed to [`LookupIndexBuilder::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// An entry with the same id existed and was overwritten.
    Replaced,
    /// Empty id, row ignored.
    Skipped,
}

/// Accumulates lookup rows into a [`LookupIndex`].
///
/// Collision policy is last-write-wins: when several rows share an id, the
/// row that arrives last in stream order is the one kept. Every replacement is
/// counted so duplicate ids are visible in the run summary.
#[derive(Debug, Default)]
pub struct LookupIndexBuilder {
    entries: HashMap<String, LookupEntry>,
    stats: LookupStats,
}

impl LookupIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: LookupRecord) -> InsertOutcome {
        self.stats.rows += 1;

        if record.id.is_empty() {
            self.stats.skipped += 1;
            return InsertOutcome::Skipped;
        }

        let entry = LookupEntry {
            class_label: record.class_label,
            confidence_value: record.confidence_value,
        };

        match self.entries.insert(record.id, entry) {
            None => InsertOutcome::Inserted,
            Some(_) => {
                self.stats.collisions += 1;
                InsertOutcome::Replaced
            }
        }
    }

    /// Consume the whole secondary stream. Any read error aborts the build;
    /// no partially built index is returned.
    pub fn build<I>(mut self, records: I) -> Result<LookupIndex>
    where
        I: IntoIterator<Item = Result<LookupRecord>>,
    {
        for record in records {
            let record = record?;
            let id = record.id.clone();
            if self.insert(record) == InsertOutcome::Replaced {
                debug!(id = %id, "Duplicate lookup id; later row wins");
            }
        }
        Ok(self.finish())
    }

    pub fn finish(self) -> LookupIndex {
        let stats = self.stats;
        info!(
            rows = stats.rows,
            entries = self.entries.len(),
            skipped = stats.skipped,
            collisions = stats.collisions,
            "Built lookup index"
        );
        if stats.collisions > 0 {
            warn!(
                collisions = stats.collisions,
                "Lookup table has duplicate ids; kept the last row for each"
            );
        }
        LookupIndex {
            entries: self.entries,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;

    fn rec(id: &str, class: &str, conf: &str) -> LookupRecord {
        LookupRecord {
            id: id.to_string(),
            class_label: class.to_string(),
            confidence_value: conf.to_string(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let index = LookupIndexBuilder::new()
            .build(vec![Ok(rec("1", "fix", "0.9")), Ok(rec("2", "docs", "0.4"))])
            .unwrap();

        assert_eq!(index.len(), 2);
        let one = index.get("1").unwrap();
        assert_eq!(one.class_label, "fix");
        assert_eq!(one.confidence_value, "0.9");
        assert!(index.get("3").is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let mut builder = LookupIndexBuilder::new();
        assert_eq!(builder.insert(rec("1", "fix", "0.9")), InsertOutcome::Inserted);
        assert_eq!(builder.insert(rec("1", "feat", "0.5")), InsertOutcome::Replaced);
        assert_eq!(builder.insert(rec("1", "chore", "0.1")), InsertOutcome::Replaced);
        let index = builder.finish();

        assert_eq!(index.len(), 1);
        let entry = index.get("1").unwrap();
        assert_eq!(entry.class_label, "chore");
        assert_eq!(entry.confidence_value, "0.1");
        assert_eq!(index.stats().collisions, 2);
    }

    #[test]
    fn test_empty_ids_are_skipped() {
        let index = LookupIndexBuilder::new()
            .build(vec![Ok(rec("", "fix", "0.9")), Ok(rec("4", "test", "0.7"))])
            .unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.get("").is_none());
        assert_eq!(
            index.stats(),
            LookupStats {
                rows: 2,
                skipped: 1,
                collisions: 0
            }
        );
    }

    #[test]
    fn test_confidence_is_opaque_text() {
        let index = LookupIndexBuilder::new()
            .build(vec![Ok(rec("1", "fix", "0.90")), Ok(rec("2", "fix", "high"))])
            .unwrap();
        assert_eq!(index.get("1").unwrap().confidence_value, "0.90");
        assert_eq!(index.get("2").unwrap().confidence_value, "high");
    }

    #[test]
    fn test_read_error_aborts_build() {
        let rows: Vec<Result<LookupRecord>> = vec![
            Ok(rec("1", "fix", "0.9")),
            Err(ReportError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "truncated",
            ))),
        ];
        assert!(LookupIndexBuilder::new().build(rows).is_err());
    }

    #[test]
    fn test_empty_stream_builds_empty_index() {
        let index = LookupIndexBuilder::new()
            .build(Vec::<Result<LookupRecord>>::new())
            .unwrap();
        assert!(index.is_empty());
    }
}
