//! Run metrics.
//!
//! Counters are recorded through the `metrics` facade. When a snapshot file is
//! requested a Prometheus recorder is installed up front and rendered to text
//! once the command finishes, in the format a node-exporter textfile
//! collector picks up.

use crate::error::{ReportError, Result};
use crate::lookup::LookupStats;
use ::metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder and describe every metric.
pub fn init() -> Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ReportError::Metrics(format!("Failed to install Prometheus recorder: {e}")))?;

    if METRICS_HANDLE.set(handle).is_err() {
        return Err(ReportError::Metrics("Metrics system already initialized".into()));
    }

    ReportMetrics::register();
    ExtractMetrics::register();
    Ok(())
}

/// Current metrics in Prometheus text format, if a recorder is installed.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

pub fn write_snapshot(path: &Path) -> Result<()> {
    let body = render()
        .ok_or_else(|| ReportError::Metrics("Metrics system not initialized".into()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, body)?;
    info!(path = %path.display(), "Wrote metrics snapshot");
    Ok(())
}

pub struct ReportMetrics;

impl ReportMetrics {
    fn register() {
        describe_counter!("aidev_report_rows_total", "Summary rows written");
        describe_counter!(
            "aidev_report_security_flagged_total",
            "Summary rows whose title or body mentioned a security keyword"
        );
        describe_counter!(
            "aidev_report_lookup_matches_total",
            "Summary rows that found a task type entry"
        );
        describe_counter!("aidev_lookup_rows_total", "Task type rows read into the lookup index");
        describe_counter!("aidev_lookup_skipped_total", "Task type rows dropped for an empty id");
        describe_counter!(
            "aidev_lookup_collisions_total",
            "Task type rows that replaced an earlier row with the same id"
        );
        describe_gauge!("aidev_lookup_entries", "Distinct ids in the lookup index");
        describe_histogram!("aidev_report_duration_seconds", "Wall time of a report run");
    }

    pub fn record_lookup(stats: LookupStats, entries: usize) {
        counter!("aidev_lookup_rows_total").increment(stats.rows);
        counter!("aidev_lookup_skipped_total").increment(stats.skipped);
        counter!("aidev_lookup_collisions_total").increment(stats.collisions);
        gauge!("aidev_lookup_entries").set(entries as f64);
    }

    pub fn record_join(rows: u64, flagged: u64, matched: u64) {
        counter!("aidev_report_rows_total").increment(rows);
        counter!("aidev_report_security_flagged_total").increment(flagged);
        counter!("aidev_report_lookup_matches_total").increment(matched);
    }

    pub fn record_duration(duration_secs: f64) {
        histogram!("aidev_report_duration_seconds").record(duration_secs);
    }
}

pub struct ExtractMetrics;

impl ExtractMetrics {
    fn register() {
        describe_counter!("aidev_extract_rows_total", "Rows written by an extraction task");
        describe_counter!(
            "aidev_extract_rejected_lines_total",
            "Source lines skipped because they were not JSON objects"
        );
        describe_histogram!("aidev_extract_duration_seconds", "Wall time of an extraction task");
    }

    pub fn record(table: &str, rows: u64, rejected: u64, duration_secs: f64) {
        counter!("aidev_extract_rows_total", "table" => table.to_string()).increment(rows);
        counter!("aidev_extract_rejected_lines_total", "table" => table.to_string())
            .increment(rejected);
        histogram!("aidev_extract_duration_seconds", "table" => table.to_string())
            .record(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        ReportMetrics::record_join(3, 1, 2);
        ReportMetrics::record_lookup(LookupStats::default(), 0);
        ExtractMetrics::record("all_repository", 5, 0, 0.1);
    }

    #[test]
    fn test_snapshot_requires_init() {
        if render().is_none() {
            let dir = tempfile::tempdir().unwrap();
            assert!(write_snapshot(&dir.path().join("m.prom")).is_err());
        }
    }
}
