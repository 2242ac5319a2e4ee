use crate::classifier::KeywordClassifier;
use crate::error::Result;
use crate::lookup::LookupIndex;
use crate::types::{OutputRecord, PrimaryRecord, RecordSink};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, instrument};

/// Counts from one pass over the primary stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    pub rows_written: u64,
    pub lookup_matches: u64,
    pub security_flagged: u64,
}

/// Streams pull requests through the classifier and the lookup index.
///
/// One output row per input row, in input order. A row without a lookup entry
/// is still emitted with empty class label and confidence.
pub struct JoinEmitPipeline<'a> {
    index: &'a LookupIndex,
    classifier: &'a KeywordClassifier,
    progress_every: u64,
}

impl<'a> JoinEmitPipeline<'a> {
    pub fn new(index: &'a LookupIndex, classifier: &'a KeywordClassifier) -> Self {
        Self {
            index,
            classifier,
            progress_every: 0,
        }
    }

    /// Log a progress line every `every` records; zero turns it off.
    pub fn with_progress_every(mut self, every: u64) -> Self {
        self.progress_every = every;
        self
    }

    /// Classify and join a single record.
    pub fn join(&self, record: PrimaryRecord) -> OutputRecord {
        self.join_with_match(record).0
    }

    fn join_with_match(&self, record: PrimaryRecord) -> (OutputRecord, bool) {
        let security_flag = self.classifier.classify(&record.combined_text());
        let entry = self.index.get(&record.id);
        let (class_label, confidence_value) = match entry {
            Some(entry) => (entry.class_label.clone(), entry.confidence_value.clone()),
            None => (String::new(), String::new()),
        };

        let output = OutputRecord {
            id: record.id,
            agent_label: record.agent_label,
            class_label,
            confidence_value,
            security_flag,
        };
        (output, entry.is_some())
    }

    /// Single pass over `records`, emitting each joined row before the next is read.
    #[instrument(skip_all)]
    pub fn run<I, S>(&self, records: I, sink: &mut S) -> Result<JoinStats>
    where
        I: IntoIterator<Item = Result<PrimaryRecord>>,
        S: RecordSink + ?Sized,
    {
        let started = Instant::now();
        let mut stats = JoinStats::default();

        for record in records {
            let (output, matched) = self.join_with_match(record?);

            sink.emit(&output)?;

            stats.rows_written += 1;
            if matched {
                stats.lookup_matches += 1;
            }
            if output.security_flag {
                stats.security_flagged += 1;
            }

            if self.progress_every > 0 && stats.rows_written % self.progress_every == 0 {
                info!(
                    rows = stats.rows_written,
                    flagged = stats.security_flagged,
                    "Processed {} pull requests...",
                    stats.rows_written
                );
            }
        }

        info!(
            rows = stats.rows_written,
            lookup_matches = stats.lookup_matches,
            flagged = stats.security_flagged,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Join finished"
        );

        Ok(stats)
    }
}
